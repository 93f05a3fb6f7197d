use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use snafu::{IntoError, ResultExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        Error as WsError,
        protocol::{CloseFrame, Message, frame::coding::CloseCode},
    },
};
use tracing::debug;
use url::Url;

use crate::error::{
    Error, Result,
    error::{ConnectionRefusedSnafu, InvalidUrlSnafu, WebSocketSnafu},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Frame(Frame),
    Error(String),
    /// The peer closed the connection, `None` when it went away without a close frame.
    Closed(Option<u16>),
}

/// An open connection to the feed.
#[async_trait]
pub trait FeedSocket: Send {
    async fn send(&mut self, text: String) -> Result<()>;
    /// Must be cancel safe, it is polled from a `select!` loop.
    async fn recv(&mut self) -> SocketEvent;
    async fn close(&mut self, code: u16);
}

#[async_trait]
pub trait FeedTransport: Send + Sync + 'static {
    async fn open(&self) -> Result<Box<dyn FeedSocket>>;
}

#[derive(Debug, Clone)]
pub struct AisStreamTransport {
    url: Url,
}

pub struct AisStreamSocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl AisStreamTransport {
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url).context(InvalidUrlSnafu { url })?;
        Ok(Self { url })
    }
}

#[async_trait]
impl FeedTransport for AisStreamTransport {
    async fn open(&self) -> Result<Box<dyn FeedSocket>> {
        let (stream, response) = connect_async(self.url.as_str())
            .await
            .map_err(handshake_error)?;
        debug!(status = %response.status(), "websocket handshake completed");
        Ok(Box::new(AisStreamSocket { stream }))
    }
}

/// A handshake answered with an http status, such as a rejected api key,
/// is a refusal rather than a transport failure.
fn handshake_error(error: WsError) -> Error {
    match error {
        WsError::Http(response) => ConnectionRefusedSnafu {
            reason: format!("handshake rejected with status {}", response.status()),
        }
        .build(),
        error => WebSocketSnafu.into_error(error),
    }
}

#[async_trait]
impl FeedSocket for AisStreamSocket {
    async fn send(&mut self, text: String) -> Result<()> {
        self.stream
            .send(Message::Text(text))
            .await
            .context(WebSocketSnafu)
    }

    async fn recv(&mut self) -> SocketEvent {
        loop {
            let event = match self.stream.next().await {
                Some(Ok(message)) => socket_event(message),
                Some(Err(e)) => Some(SocketEvent::Error(e.to_string())),
                None => Some(SocketEvent::Closed(None)),
            };
            if let Some(event) = event {
                return event;
            }
        }
    }

    async fn close(&mut self, code: u16) {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: "".into(),
        };
        if let Err(e) = self.stream.close(Some(frame)).await {
            debug!("websocket did not close cleanly: {e}");
        }
    }
}

/// Control frames yield `None`, tungstenite answers pings on its own.
fn socket_event(message: Message) -> Option<SocketEvent> {
    match message {
        Message::Text(text) => Some(SocketEvent::Frame(Frame::Text(text))),
        Message::Binary(data) => Some(SocketEvent::Frame(Frame::Binary(data))),
        Message::Close(frame) => Some(SocketEvent::Closed(frame.map(|f| u16::from(f.code)))),
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => None,
    }
}
