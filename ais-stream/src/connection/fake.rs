use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{FeedSocket, FeedTransport, Frame, SocketEvent};
use crate::error::{Result, error::ConnectionRefusedSnafu};

/// In-process transport whose server side is driven by the test.
#[derive(Debug, Clone, Default)]
pub struct FakeTransport {
    inner: Arc<Mutex<FakeInner>>,
}

#[derive(Debug, Default)]
struct FakeInner {
    opens: usize,
    failing_opens: usize,
    server: Option<mpsc::UnboundedSender<SocketEvent>>,
    sent: Vec<String>,
    close_codes: Vec<u16>,
}

struct FakeSocket {
    events: mpsc::UnboundedReceiver<SocketEvent>,
    inner: Arc<Mutex<FakeInner>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` open attempts fail.
    pub fn fail_next_opens(&self, n: usize) {
        self.inner.lock().unwrap().failing_opens = n;
    }

    pub fn open_count(&self) -> usize {
        self.inner.lock().unwrap().opens
    }

    /// Every text the client has sent, across connections.
    pub fn sent(&self) -> Vec<String> {
        self.inner.lock().unwrap().sent.clone()
    }

    pub fn sent_json(&self) -> Vec<serde_json::Value> {
        self.sent()
            .iter()
            .map(|s| serde_json::from_str(s).unwrap())
            .collect()
    }

    /// Close codes sent by the client.
    pub fn close_codes(&self) -> Vec<u16> {
        self.inner.lock().unwrap().close_codes.clone()
    }

    pub fn push_text(&self, text: impl Into<String>) -> bool {
        self.push(SocketEvent::Frame(Frame::Text(text.into())))
    }

    pub fn push_json(&self, value: &serde_json::Value) -> bool {
        self.push_text(value.to_string())
    }

    pub fn push_binary(&self, data: Vec<u8>) -> bool {
        self.push(SocketEvent::Frame(Frame::Binary(data)))
    }

    pub fn server_close(&self, code: Option<u16>) -> bool {
        self.push(SocketEvent::Closed(code))
    }

    pub fn server_error(&self, error: &str) -> bool {
        self.push(SocketEvent::Error(error.to_owned()))
    }

    fn push(&self, event: SocketEvent) -> bool {
        match &self.inner.lock().unwrap().server {
            Some(server) => server.send(event).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl FeedTransport for FakeTransport {
    async fn open(&self) -> Result<Box<dyn FeedSocket>> {
        let mut inner = self.inner.lock().unwrap();
        inner.opens += 1;
        if inner.failing_opens > 0 {
            inner.failing_opens -= 1;
            return ConnectionRefusedSnafu {
                reason: "fake transport configured to fail",
            }
            .fail();
        }

        let (tx, rx) = mpsc::unbounded_channel();
        inner.server = Some(tx);
        Ok(Box::new(FakeSocket {
            events: rx,
            inner: self.inner.clone(),
        }))
    }
}

#[async_trait]
impl FeedSocket for FakeSocket {
    async fn send(&mut self, text: String) -> Result<()> {
        self.inner.lock().unwrap().sent.push(text);
        Ok(())
    }

    async fn recv(&mut self) -> SocketEvent {
        self.events.recv().await.unwrap_or(SocketEvent::Closed(None))
    }

    async fn close(&mut self, code: u16) {
        let mut inner = self.inner.lock().unwrap();
        inner.close_codes.push(code);
        inner.server = None;
    }
}
