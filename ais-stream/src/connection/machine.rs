use std::time::Duration;

use tokio::time::Instant;
use tracing::warn;

use super::{Backoff, ConnectionSettings, NORMAL_CLOSURE, ReconnectPolicy, TRY_AGAIN_LATER};
use crate::normalizer::FeedFault;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closing,
    ReconnectScheduled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Normal,
    TryAgainLater,
}

impl CloseReason {
    pub fn code(self) -> u16 {
        match self {
            CloseReason::Normal => NORMAL_CLOSURE,
            CloseReason::TryAgainLater => TRY_AGAIN_LATER,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connect,
    Opened { at: Instant },
    Message { at: Instant },
    Fault(FeedFault),
    Error,
    /// `code` is `None` for a failed open or a dropped connection.
    Closed { code: Option<u16> },
    HeartbeatTick { at: Instant },
    ForceReconnect,
    ReconnectTimerFired,
    SubscribeTimerFired,
    Cleanup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Open,
    Close(CloseReason),
    ScheduleReconnect(Duration),
    CancelReconnect,
    ScheduleSubscribe(Duration),
    CancelSubscribe,
    Subscribe,
}

/// Connection transition table, free of I/O and timers.
#[derive(Debug)]
pub struct ConnectionMachine {
    state: ConnectionState,
    backoff: Backoff,
    policy: ReconnectPolicy,
    subscribe_delay: Duration,
    stale_after: Duration,
    last_message: Option<Instant>,
    subscription_sent: bool,
    reopen_after_close: bool,
    running: bool,
}

impl ConnectionMachine {
    pub fn new(settings: &ConnectionSettings) -> Self {
        Self {
            state: ConnectionState::Idle,
            backoff: Backoff::new(settings.base_delay, settings.max_delay),
            policy: settings.reconnect_policy,
            subscribe_delay: settings.subscribe_delay,
            stale_after: settings.stale_after,
            last_message: None,
            subscription_sent: false,
            reopen_after_close: false,
            running: true,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    pub fn subscription_sent(&self) -> bool {
        self.subscription_sent
    }

    /// False once cleanup has been requested.
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn handle(&mut self, event: Event) -> Vec<Action> {
        use ConnectionState::*;

        if !self.running {
            if let Event::Closed { .. } = event {
                self.state = Idle;
            }
            return vec![];
        }

        match event {
            Event::Connect => match self.state {
                Connecting | Open => vec![],
                Closing => {
                    self.reopen_after_close = true;
                    vec![]
                }
                Idle => self.open(),
                ReconnectScheduled => self.reopen_now(),
            },
            Event::Opened { at } => {
                if self.state != Connecting {
                    return vec![];
                }
                self.state = Open;
                self.backoff.reset();
                self.last_message = Some(at);
                self.subscription_sent = false;
                vec![Action::ScheduleSubscribe(self.subscribe_delay)]
            }
            Event::Message { at } => {
                if self.state == Open {
                    self.last_message = Some(at);
                }
                vec![]
            }
            Event::Fault(FeedFault::TooManyConnections) => {
                self.backoff.penalize();
                if self.state == Open {
                    self.state = Closing;
                    vec![
                        Action::CancelSubscribe,
                        Action::Close(CloseReason::TryAgainLater),
                    ]
                } else {
                    vec![]
                }
            }
            Event::Fault(FeedFault::Other(_)) | Event::Error => vec![],
            Event::Closed { code } => self.closed(code),
            Event::HeartbeatTick { at } => {
                let stale = self.state == Open
                    && self
                        .last_message
                        .is_some_and(|last| at.saturating_duration_since(last) >= self.stale_after);
                if stale {
                    warn!("no messages received within {:?}", self.stale_after);
                    self.force_reconnect()
                } else {
                    vec![]
                }
            }
            Event::ForceReconnect => self.force_reconnect(),
            Event::ReconnectTimerFired => {
                if self.state == ReconnectScheduled {
                    self.open()
                } else {
                    vec![]
                }
            }
            Event::SubscribeTimerFired => {
                if self.state == Open && !self.subscription_sent {
                    self.subscription_sent = true;
                    vec![Action::Subscribe]
                } else {
                    vec![]
                }
            }
            Event::Cleanup => {
                self.running = false;
                self.reopen_after_close = false;
                let mut actions = vec![Action::CancelReconnect, Action::CancelSubscribe];
                match self.state {
                    Open => {
                        self.state = Closing;
                        actions.push(Action::Close(CloseReason::Normal));
                    }
                    Closing => {}
                    Idle | Connecting | ReconnectScheduled => self.state = Idle,
                }
                actions
            }
        }
    }

    fn open(&mut self) -> Vec<Action> {
        self.state = ConnectionState::Connecting;
        self.subscription_sent = false;
        vec![Action::Open]
    }

    fn reopen_now(&mut self) -> Vec<Action> {
        let mut actions = vec![Action::CancelReconnect];
        actions.extend(self.open());
        actions
    }

    fn force_reconnect(&mut self) -> Vec<Action> {
        use ConnectionState::*;

        match self.state {
            Open => {
                self.state = Closing;
                self.reopen_after_close = true;
                vec![Action::CancelSubscribe, Action::Close(CloseReason::Normal)]
            }
            Closing => {
                self.reopen_after_close = true;
                vec![]
            }
            Connecting => vec![],
            Idle => self.open(),
            ReconnectScheduled => self.reopen_now(),
        }
    }

    fn closed(&mut self, code: Option<u16>) -> Vec<Action> {
        use ConnectionState::*;

        let previous = self.state;
        self.subscription_sent = false;
        self.last_message = None;

        if previous == ReconnectScheduled {
            return vec![];
        }

        self.state = Idle;
        let mut actions = vec![Action::CancelSubscribe];

        if std::mem::take(&mut self.reopen_after_close) {
            actions.extend(self.open());
            return actions;
        }

        if code == Some(NORMAL_CLOSURE) {
            return actions;
        }

        if let ReconnectPolicy::Bounded { max_attempts } = self.policy {
            if self.backoff.attempt() >= max_attempts {
                warn!(max_attempts, "giving up reconnecting");
                self.backoff.reset();
                return actions;
            }
        }

        self.state = ReconnectScheduled;
        actions.push(Action::ScheduleReconnect(self.backoff.next_delay()));
        actions
    }
}
