// Byte-level transport underneath the STOMP session
use crate::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt, future};
use std::pin::Pin;
use tokio_tungstenite::{connect_async, tungstenite::Message};

pub type FrameSink = Pin<Box<dyn Sink<Bytes, Error = TransportError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// One established physical connection. Each item is one transport message.
pub struct Transport {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self) -> Result<Transport, TransportError>;
}

pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self) -> Result<Transport, TransportError> {
        let (ws, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| TransportError::Connect(format!("{}: {}", self.url, e)))?;
        tracing::debug!("WebSocket connected to {}", self.url);

        let (write, read) = ws.split();

        let sink = write
            .sink_map_err(|e| TransportError::Io(e.to_string()))
            .with(|frame: Bytes| {
                future::ready(Ok::<_, TransportError>(Message::Text(
                    String::from_utf8_lossy(&frame).into_owned(),
                )))
            });

        let stream = read.filter_map(|message| {
            future::ready(match message {
                Ok(Message::Text(text)) => Some(Ok(Bytes::from(text))),
                Ok(Message::Binary(data)) => Some(Ok(Bytes::from(data))),
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => None,
                Ok(Message::Close(frame)) => {
                    tracing::debug!("WebSocket closed by peer: {:?}", frame);
                    Some(Err(TransportError::Closed))
                }
                Err(e) => Some(Err(TransportError::Io(e.to_string()))),
            })
        });

        Ok(Transport {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }
}
