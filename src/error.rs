// Error taxonomy for the live path and the REST queries
use thiserror::Error;

/// Failure of the push transport. Recovered by reconnecting, never handed to subscribers.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("could not connect to push endpoint: {0}")]
    Connect(String),

    #[error("transport i/o error: {0}")]
    Io(String),

    #[error("transport closed by peer")]
    Closed,

    #[error("no heartbeat received within the negotiated interval")]
    HeartbeatTimeout,

    #[error("handshake did not complete in time")]
    HandshakeTimeout,

    #[error("broker rejected the session: {0}")]
    Rejected(String),

    #[error("protocol violation: {0}")]
    Protocol(#[from] DecodeError),
}

/// A frame or payload that could not be understood. Dropped where it is found.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("frame is empty")]
    EmptyFrame,

    #[error("unknown frame command `{0}`")]
    UnknownCommand(String),

    #[error("malformed header line `{0}`")]
    MalformedHeader(String),

    #[error("invalid escape sequence in header `{0}`")]
    InvalidEscape(String),

    #[error("frame body is not NUL-terminated")]
    UnterminatedBody,

    #[error("frame is not valid UTF-8")]
    NotUtf8,

    #[error("payload is not a device message: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Failure of a history or prediction query. Surfaced to the caller, never retried.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid time range: start {start} is not before end {end}")]
    InvalidRange { start: String, end: String },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("server returned {status} for {url}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl QueryError {
    /// Short message for an inline error banner.
    pub fn banner(&self) -> String {
        match self {
            QueryError::InvalidRange { .. } => "Start time must be before end time".to_string(),
            QueryError::Status { status, .. } if *status == 404 => "Device not found".to_string(),
            QueryError::Status { status, .. } => format!("Server error ({})", status),
            QueryError::Request { .. } => "Could not reach the server".to_string(),
            QueryError::Decode { .. } => "Unexpected response from the server".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_messages() {
        let err = QueryError::Status {
            url: "http://localhost/api/history/query".to_string(),
            status: 500,
            body: String::new(),
        };
        assert_eq!(err.banner(), "Server error (500)");

        let err = QueryError::InvalidRange {
            start: "2024-01-02".to_string(),
            end: "2024-01-01".to_string(),
        };
        assert_eq!(err.banner(), "Start time must be before end time");
        assert!(err.to_string().contains("2024-01-02"));
    }

    #[test]
    fn test_decode_error_converts_to_transport_error() {
        let err: TransportError = DecodeError::UnknownCommand("BOGUS".to_string()).into();
        assert!(matches!(err, TransportError::Protocol(DecodeError::UnknownCommand(_))));
    }
}
