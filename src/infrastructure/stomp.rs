// STOMP 1.2 frame codec for the push channel
//
// Frames are carried one per WebSocket message. A message holding only an
// end-of-line is a heart-beat.
use crate::error::DecodeError;
use bytes::{BufMut, Bytes, BytesMut};
use std::time::Duration;

pub const ACCEPT_VERSION: &str = "1.2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Stomp,
    Connected,
    Send,
    Subscribe,
    Unsubscribe,
    Ack,
    Nack,
    Begin,
    Commit,
    Abort,
    Disconnect,
    Message,
    Receipt,
    Error,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Stomp => "STOMP",
            Command::Connected => "CONNECTED",
            Command::Send => "SEND",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Ack => "ACK",
            Command::Nack => "NACK",
            Command::Begin => "BEGIN",
            Command::Commit => "COMMIT",
            Command::Abort => "ABORT",
            Command::Disconnect => "DISCONNECT",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let command = match raw {
            "CONNECT" => Command::Connect,
            "STOMP" => Command::Stomp,
            "CONNECTED" => Command::Connected,
            "SEND" => Command::Send,
            "SUBSCRIBE" => Command::Subscribe,
            "UNSUBSCRIBE" => Command::Unsubscribe,
            "ACK" => Command::Ack,
            "NACK" => Command::Nack,
            "BEGIN" => Command::Begin,
            "COMMIT" => Command::Commit,
            "ABORT" => Command::Abort,
            "DISCONNECT" => Command::Disconnect,
            "MESSAGE" => Command::Message,
            "RECEIPT" => Command::Receipt,
            "ERROR" => Command::Error,
            _ => return None,
        };
        Some(command)
    }

    // CONNECT and CONNECTED headers are sent verbatim.
    fn escapes_headers(self) -> bool {
        !matches!(self, Command::Connect | Command::Connected)
    }
}

/// Heart-beat intervals in milliseconds; zero disables a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeartBeat {
    pub outgoing_ms: u64,
    pub incoming_ms: u64,
}

impl HeartBeat {
    pub fn new(outgoing_ms: u64, incoming_ms: u64) -> Self {
        Self {
            outgoing_ms,
            incoming_ms,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let (out, inc) = raw.split_once(',')?;
        Some(Self {
            outgoing_ms: out.trim().parse().ok()?,
            incoming_ms: inc.trim().parse().ok()?,
        })
    }

    pub fn header_value(&self) -> String {
        format!("{},{}", self.outgoing_ms, self.incoming_ms)
    }

    /// Effective (outgoing, incoming) intervals once the broker's CONNECTED header is known.
    pub fn negotiate(&self, server: HeartBeat) -> (Option<Duration>, Option<Duration>) {
        let pick = |ours: u64, theirs: u64| {
            if ours == 0 || theirs == 0 {
                None
            } else {
                Some(Duration::from_millis(ours.max(theirs)))
            }
        };
        (
            pick(self.outgoing_ms, server.incoming_ms),
            pick(self.incoming_ms, server.outgoing_ms),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of a header; repeated headers keep the first occurrence.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn connect(host: &str, heartbeat: HeartBeat) -> Self {
        Frame::new(Command::Connect)
            .header("accept-version", ACCEPT_VERSION)
            .header("host", host)
            .header("heart-beat", heartbeat.header_value())
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Frame::new(Command::Subscribe)
            .header("id", id)
            .header("destination", destination)
            .header("ack", "auto")
    }

    pub fn unsubscribe(id: &str) -> Self {
        Frame::new(Command::Unsubscribe).header("id", id)
    }

    pub fn disconnect() -> Self {
        Frame::new(Command::Disconnect)
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(64 + self.body.len());
        buf.put_slice(self.command.as_str().as_bytes());
        buf.put_u8(b'\n');
        let escape = self.command.escapes_headers();
        for (name, value) in &self.headers {
            if escape {
                buf.put_slice(escape_header(name).as_bytes());
                buf.put_u8(b':');
                buf.put_slice(escape_header(value).as_bytes());
            } else {
                buf.put_slice(name.as_bytes());
                buf.put_u8(b':');
                buf.put_slice(value.as_bytes());
            }
            buf.put_u8(b'\n');
        }
        if !self.body.is_empty() && self.get("content-length").is_none() {
            buf.put_slice(format!("content-length:{}\n", self.body.len()).as_bytes());
        }
        buf.put_u8(b'\n');
        buf.put_slice(&self.body);
        buf.put_u8(0);
        buf.freeze()
    }
}

pub fn heartbeat() -> Bytes {
    Bytes::from_static(b"\n")
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    HeartBeat,
    Frame(Frame),
}

pub fn decode(data: &[u8]) -> Result<Inbound, DecodeError> {
    let start = data
        .iter()
        .position(|b| *b != b'\n' && *b != b'\r')
        .unwrap_or(data.len());
    let data = &data[start..];
    if data.is_empty() || data == [0] {
        return Ok(Inbound::HeartBeat);
    }

    let header_end = find_blank_line(data).ok_or(DecodeError::UnterminatedBody)?;
    let head = std::str::from_utf8(&data[..header_end.0]).map_err(|_| DecodeError::NotUtf8)?;
    let rest = &data[header_end.1..];

    let mut lines = head.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));
    let command_line = lines.next().ok_or(DecodeError::EmptyFrame)?;
    let command = Command::parse(command_line)
        .ok_or_else(|| DecodeError::UnknownCommand(command_line.to_string()))?;

    let mut frame = Frame::new(command);
    for line in lines.filter(|l| !l.is_empty()) {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| DecodeError::MalformedHeader(line.to_string()))?;
        if command.escapes_headers() {
            frame
                .headers
                .push((unescape_header(name)?, unescape_header(value)?));
        } else {
            frame.headers.push((name.to_string(), value.to_string()));
        }
    }

    let body = match frame.get("content-length").and_then(|v| v.parse::<usize>().ok()) {
        Some(len) if len < rest.len() && rest[len] == 0 => &rest[..len],
        Some(_) => return Err(DecodeError::UnterminatedBody),
        None => {
            let nul = rest
                .iter()
                .position(|b| *b == 0)
                .ok_or(DecodeError::UnterminatedBody)?;
            &rest[..nul]
        }
    };
    frame.body = Bytes::copy_from_slice(body);
    Ok(Inbound::Frame(frame))
}

/// (end of header block, start of body)
fn find_blank_line(data: &[u8]) -> Option<(usize, usize)> {
    for i in 0..data.len() {
        if data[i] != b'\n' {
            continue;
        }
        if data.get(i + 1) == Some(&b'\n') {
            return Some((i, i + 2));
        }
        if data.get(i + 1) == Some(&b'\r') && data.get(i + 2) == Some(&b'\n') {
            return Some((i, i + 3));
        }
    }
    None
}

fn escape_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(raw: &str) -> Result<String, DecodeError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => return Err(DecodeError::InvalidEscape(raw.to_string())),
        }
    }
    Ok(out)
}
