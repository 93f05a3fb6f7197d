use std::{collections::VecDeque, future::pending};

use serde::Serialize;
use tokio::{
    sync::{mpsc, oneshot, watch},
    time::{Instant, MissedTickBehavior, interval_at, timeout},
};
use tracing::{debug, error, info, instrument, warn};
use tracker_core::Timer;

use super::{
    Action, ConnectionMachine, ConnectionSettings, ConnectionState, Event, FeedSocket,
    FeedTransport, SocketEvent,
};
use crate::{
    batcher::BatcherHandle,
    normalizer::{Normalized, normalize},
    settings::StreamSettings,
    subscription::SubscriptionSet,
};

enum Command {
    Connect,
    Reconnect,
    Send {
        text: String,
        reply: oneshot::Sender<bool>,
    },
    UpdateVessels(SubscriptionSet),
    Cleanup,
}

/// Handle to a running [`ConnectionManager`], cheap to clone.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    vessels: watch::Receiver<SubscriptionSet>,
}

/// Owns the feed socket and applies [`ConnectionMachine`] actions to it.
pub struct ConnectionManager<T> {
    transport: T,
    settings: ConnectionSettings,
    stream: StreamSettings,
    machine: ConnectionMachine,
    socket: Option<Box<dyn FeedSocket>>,
    vessels: watch::Sender<SubscriptionSet>,
    batcher: BatcherHandle,
    commands: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<ConnectionState>,
    reconnect: Timer,
    subscribe: Timer,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Connect => f.write_str("Connect"),
            Command::Reconnect => f.write_str("Reconnect"),
            Command::Send { .. } => f.write_str("Send"),
            Command::UpdateVessels(v) => write!(f, "UpdateVessels({})", v.len()),
            Command::Cleanup => f.write_str("Cleanup"),
        }
    }
}

impl ConnectionHandle {
    /// Opens the connection unless it is already connecting or open.
    pub fn connect(&self) -> bool {
        self.commands.send(Command::Connect).is_ok()
    }

    /// Reconnects immediately, skipping any scheduled backoff.
    pub fn reconnect(&self) -> bool {
        self.commands.send(Command::Reconnect).is_ok()
    }

    /// Replaces the subscribed vessels, resubscribing if already subscribed.
    pub fn update_vessels(&self, vessels: SubscriptionSet) -> bool {
        self.commands.send(Command::UpdateVessels(vessels)).is_ok()
    }

    /// Closes the connection and stops the manager, safe to call repeatedly.
    pub fn cleanup(&self) {
        let _ = self.commands.send(Command::Cleanup);
    }

    /// Returns whether the payload was written to an open connection.
    pub async fn send<P: Serialize>(&self, payload: &P) -> bool {
        let text = match serde_json::to_string(payload) {
            Ok(text) => text,
            Err(e) => {
                error!("failed to serialize payload: {e:?}");
                return false;
            }
        };

        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Send { text, reply }).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// The vessel set positions are currently accepted for.
    pub fn vessels(&self) -> SubscriptionSet {
        self.vessels.borrow().clone()
    }

    /// Returns false if the manager stopped before reaching `target`.
    pub async fn wait_for_state(&self, target: ConnectionState) -> bool {
        let mut state = self.state.clone();
        state.wait_for(|s| *s == target).await.is_ok()
    }
}

impl<T: FeedTransport> ConnectionManager<T> {
    /// `vessels` is published on every update, positions for vessels outside
    /// the current set are dropped.
    pub fn new(
        transport: T,
        settings: ConnectionSettings,
        stream: StreamSettings,
        vessels: watch::Sender<SubscriptionSet>,
        batcher: BatcherHandle,
    ) -> (ConnectionManager<T>, ConnectionHandle) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
        let vessels_rx = vessels.subscribe();

        let manager = ConnectionManager {
            transport,
            machine: ConnectionMachine::new(&settings),
            settings,
            stream,
            socket: None,
            vessels,
            batcher,
            commands: commands_rx,
            state: state_tx,
            reconnect: Timer::new(),
            subscribe: Timer::new(),
        };

        (
            manager,
            ConnectionHandle {
                commands: commands_tx,
                state: state_rx,
                vessels: vessels_rx,
            },
        )
    }

    /// Runs until cleanup, either requested or because every handle was dropped.
    #[instrument(skip_all)]
    pub async fn run(mut self) {
        let period = self.settings.heartbeat_interval;
        let mut heartbeat = interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.machine.is_running() {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => self.dispatch(Event::Cleanup).await,
                },
                event = next_socket_event(&mut self.socket) => self.handle_socket_event(event).await,
                _ = self.reconnect.fired() => self.dispatch(Event::ReconnectTimerFired).await,
                _ = self.subscribe.fired() => self.dispatch(Event::SubscribeTimerFired).await,
                _ = heartbeat.tick() => self.dispatch(Event::HeartbeatTick { at: Instant::now() }).await,
            }
        }

        info!("connection manager stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect => self.dispatch(Event::Connect).await,
            Command::Reconnect => {
                info!("forcing reconnect");
                self.dispatch(Event::ForceReconnect).await
            }
            Command::Send { text, reply } => {
                let sent = self.send_text(text).await;
                let _ = reply.send(sent);
            }
            Command::UpdateVessels(vessels) => {
                info!(num_vessels = vessels.len(), "vessel set updated");
                self.vessels.send_replace(vessels);
                if self.machine.subscription_sent() {
                    self.send_subscription().await;
                }
            }
            Command::Cleanup => self.dispatch(Event::Cleanup).await,
        }
    }

    async fn handle_socket_event(&mut self, event: SocketEvent) {
        match event {
            SocketEvent::Frame(frame) => {
                self.dispatch(Event::Message { at: Instant::now() }).await;
                match normalize(&frame) {
                    Normalized::Position(mmsi, position) => {
                        let tracked = self.vessels.borrow().contains(&mmsi);
                        if !tracked {
                            debug!(%mmsi, "dropping position for untracked vessel");
                        } else if !self.batcher.push(mmsi, position) {
                            warn!("update batcher has stopped, dropping position");
                        }
                    }
                    Normalized::Fault(fault) => {
                        warn!(%fault, "feed reported an error");
                        self.dispatch(Event::Fault(fault)).await;
                    }
                    Normalized::Discarded(reason) => debug!(%reason, "discarded feed message"),
                }
            }
            SocketEvent::Error(e) => {
                error!("connection error: {e}");
                self.dispatch(Event::Error).await;
                self.socket = None;
                self.dispatch(Event::Closed { code: None }).await;
            }
            SocketEvent::Closed(code) => {
                info!(?code, "connection closed by server");
                self.socket = None;
                self.dispatch(Event::Closed { code }).await;
            }
        }
    }

    async fn dispatch(&mut self, event: Event) {
        let mut events = VecDeque::from([event]);
        while let Some(event) = events.pop_front() {
            for action in self.machine.handle(event) {
                self.publish_state();
                if let Some(next) = self.apply(action).await {
                    events.push_back(next);
                }
            }
        }
        self.publish_state();
    }

    fn publish_state(&self) {
        let state = self.machine.state();
        self.state.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
    }

    async fn apply(&mut self, action: Action) -> Option<Event> {
        match action {
            Action::Open => Some(self.open().await),
            Action::Close(reason) => {
                if let Some(mut socket) = self.socket.take() {
                    socket.close(reason.code()).await;
                }
                Some(Event::Closed {
                    code: Some(reason.code()),
                })
            }
            Action::ScheduleReconnect(delay) => {
                info!(
                    ?delay,
                    attempt = self.machine.backoff().attempt(),
                    "reconnect scheduled"
                );
                self.reconnect.schedule(delay);
                None
            }
            Action::CancelReconnect => {
                self.reconnect.cancel();
                None
            }
            Action::ScheduleSubscribe(delay) => {
                self.subscribe.schedule(delay);
                None
            }
            Action::CancelSubscribe => {
                self.subscribe.cancel();
                None
            }
            Action::Subscribe => {
                self.send_subscription().await;
                None
            }
        }
    }

    async fn open(&mut self) -> Event {
        info!("connecting to ais stream");
        match timeout(self.settings.connect_timeout, self.transport.open()).await {
            Ok(Ok(socket)) => {
                info!("connected to ais stream");
                self.socket = Some(socket);
                Event::Opened { at: Instant::now() }
            }
            Ok(Err(e)) => {
                error!("failed to connect: {e:?}");
                Event::Closed { code: None }
            }
            Err(_) => {
                error!(timeout = ?self.settings.connect_timeout, "connection attempt timed out");
                Event::Closed { code: None }
            }
        }
    }

    async fn send_text(&mut self, text: String) -> bool {
        if self.machine.state() != ConnectionState::Open {
            return false;
        }
        let Some(socket) = self.socket.as_mut() else {
            return false;
        };
        match socket.send(text).await {
            Ok(()) => true,
            Err(e) => {
                error!("failed to send message: {e:?}");
                false
            }
        }
    }

    async fn send_subscription(&mut self) {
        let (messages, num_vessels) = {
            let vessels = self.vessels.borrow();
            let messages = vessels.messages(
                &self.stream.api_key,
                &self.stream.bounding_boxes,
                self.stream.subscription_batch_size,
            );
            (messages, vessels.len())
        };
        if messages.is_empty() {
            warn!("no vessels to subscribe to");
            return;
        }

        for message in messages {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    error!("failed to serialize subscription: {e:?}");
                    return;
                }
            };
            if !self.send_text(text).await {
                error!("failed to send subscription");
                return;
            }
        }
        info!(num_vessels, "subscribed to vessel positions");
    }
}

async fn next_socket_event(socket: &mut Option<Box<dyn FeedSocket>>) -> SocketEvent {
    match socket {
        Some(socket) => socket.recv().await,
        None => pending().await,
    }
}
