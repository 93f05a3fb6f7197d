use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::connection::ConnectionHandle;

/// Host application state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, strum::Display)]
pub enum AppState {
    Active,
    Inactive,
    Background,
}

/// Forces a reconnect when the host returns to the foreground.
#[derive(Debug)]
pub struct LifecycleWatcher {
    current: AppState,
}

impl LifecycleWatcher {
    pub fn new(initial: AppState) -> Self {
        Self { current: initial }
    }

    pub fn current(&self) -> AppState {
        self.current
    }

    /// Records `next` and returns true on a background or inactive to active edge.
    pub fn observe(&mut self, next: AppState) -> bool {
        let resumed = matches!(self.current, AppState::Background | AppState::Inactive)
            && next == AppState::Active;
        self.current = next;
        resumed
    }

    #[instrument(skip_all)]
    pub async fn run<S>(mut self, mut states: S, connection: ConnectionHandle)
    where
        S: Stream<Item = AppState> + Unpin,
    {
        while let Some(state) = states.next().await {
            debug!(%state, "app state changed");
            if self.observe(state) {
                info!("app resumed, reconnecting");
                connection.reconnect();
            }
        }
    }
}
