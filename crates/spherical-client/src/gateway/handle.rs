//! Cloneable handle to a gateway connection running on its own task.
//!
//! The connection is confined to one driver task. Every consumer call is
//! marshalled to it as a [`Command`], so frames, timers and handler
//! registration never interleave.

use std::future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use spherical_proto::Payload;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::debug;

use crate::error::ClientError;

use super::connection::{DisconnectHandlerId, GatewayConnection, ReadyHandlerId};
use super::state::{AtomicConnectionState, ConnectionState};
use super::transport::ConnectionEvents;

type ReadyHandler = Box<dyn FnMut() + Send>;
type DisconnectHandler = Box<dyn Fn(bool) + Send + Sync>;

enum Command {
    Start,
    Shutdown,
    Send {
        payload: Payload,
        reply: oneshot::Sender<Result<(), ClientError>>,
    },
    JoinGuild {
        hostname: String,
        invite_code: String,
        reply: oneshot::Sender<Result<String, ClientError>>,
    },
    AddReady {
        handler: ReadyHandler,
        reply: oneshot::Sender<ReadyHandlerId>,
    },
    RemoveReady(ReadyHandlerId),
    AddDisconnect {
        handler: DisconnectHandler,
        reply: oneshot::Sender<DisconnectHandlerId>,
    },
    RemoveDisconnect(DisconnectHandlerId),
    HeartbeatInterval(oneshot::Sender<Option<Duration>>),
}

/// A registered ready handler. Pass it back to
/// [`GatewayHandle::remove_ready_handler`] to unregister.
#[derive(Debug)]
pub struct ReadySubscription {
    id: ReadyHandlerId,
    live: Arc<AtomicBool>,
}

/// A registered disconnect handler. Pass it back to
/// [`GatewayHandle::remove_disconnect_handler`] to unregister.
#[derive(Debug)]
pub struct DisconnectSubscription {
    id: DisconnectHandlerId,
    live: Arc<AtomicBool>,
}

/// Handle to a running [`GatewayConnection`].
#[derive(Debug, Clone)]
pub struct GatewayHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: Arc<AtomicConnectionState>,
}

impl GatewayHandle {
    /// Move `connection` onto a new task and return a handle to it.
    ///
    /// The task runs until every handle is dropped, then shuts the
    /// connection down. Must be called from within a Tokio runtime.
    pub fn spawn(connection: GatewayConnection, events: ConnectionEvents) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let state = connection.shared_state();
        tokio::spawn(drive(connection, events, rx));
        Self { commands, state }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.load()
    }

    /// Open a transport unless one already exists.
    pub fn start(&self) -> Result<(), ClientError> {
        self.dispatch(Command::Start)
    }

    /// Close the transport and cancel pending retries.
    pub fn shutdown(&self) -> Result<(), ClientError> {
        self.dispatch(Command::Shutdown)
    }

    /// Send a payload on the current transport.
    pub async fn send(&self, payload: Payload) -> Result<(), ClientError> {
        self.request(|reply| Command::Send { payload, reply }).await?
    }

    /// Ask to join a guild. Returns the request's correlation id.
    pub async fn join_guild(
        &self,
        hostname: impl Into<String>,
        invite_code: impl Into<String>,
    ) -> Result<String, ClientError> {
        let hostname = hostname.into();
        let invite_code = invite_code.into();
        self.request(|reply| Command::JoinGuild {
            hostname,
            invite_code,
            reply,
        })
        .await?
    }

    /// Heartbeat interval announced by the server for the current session.
    pub async fn heartbeat_interval(&self) -> Result<Option<Duration>, ClientError> {
        self.request(Command::HeartbeatInterval).await
    }

    /// Register a handler run each time the session becomes ready.
    pub async fn add_ready_handler<F>(&self, mut handler: F) -> Result<ReadySubscription, ClientError>
    where
        F: FnMut() + Send + 'static,
    {
        let live = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&live);
        let handler: ReadyHandler = Box::new(move || {
            if flag.load(Ordering::Acquire) {
                handler();
            }
        });
        let id = self
            .request(|reply| Command::AddReady { handler, reply })
            .await?;
        Ok(ReadySubscription { id, live })
    }

    /// Unregister a ready handler. It will not run again once this returns.
    pub fn remove_ready_handler(&self, subscription: ReadySubscription) {
        subscription.live.store(false, Ordering::Release);
        let _ = self.dispatch(Command::RemoveReady(subscription.id));
    }

    /// Register a handler run on disconnect. It receives `true` when the
    /// server asked the client to reconnect.
    pub async fn add_disconnect_handler<F>(
        &self,
        handler: F,
    ) -> Result<DisconnectSubscription, ClientError>
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let live = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&live);
        let handler: DisconnectHandler = Box::new(move |reconnect| {
            if flag.load(Ordering::Acquire) {
                handler(reconnect);
            }
        });
        let id = self
            .request(|reply| Command::AddDisconnect { handler, reply })
            .await?;
        Ok(DisconnectSubscription { id, live })
    }

    /// Unregister a disconnect handler. It will not run again once this returns.
    pub fn remove_disconnect_handler(&self, subscription: DisconnectSubscription) {
        subscription.live.store(false, Ordering::Release);
        let _ = self.dispatch(Command::RemoveDisconnect(subscription.id));
    }

    fn dispatch(&self, command: Command) -> Result<(), ClientError> {
        self.commands
            .send(command)
            .map_err(|_| ClientError::GatewayStopped)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.dispatch(command(reply))?;
        rx.await.map_err(|_| ClientError::GatewayStopped)
    }
}

async fn drive(
    mut connection: GatewayConnection,
    mut events: ConnectionEvents,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    debug!("gateway driver started");
    loop {
        let deadline = connection.next_deadline();
        tokio::select! {
            biased;

            Some(event) = events.recv() => {
                connection.handle_event(event, Instant::now());
            }

            command = commands.recv() => match command {
                Some(command) => apply(&mut connection, command),
                None => {
                    connection.shutdown();
                    break;
                }
            },

            () = wait_until(deadline) => {
                connection.poll_timers(Instant::now());
            }
        }
    }
    debug!("gateway driver stopped");
}

fn apply(connection: &mut GatewayConnection, command: Command) {
    match command {
        Command::Start => connection.start(),
        Command::Shutdown => connection.shutdown(),
        Command::Send { payload, reply } => {
            let _ = reply.send(connection.send(&payload));
        }
        Command::JoinGuild {
            hostname,
            invite_code,
            reply,
        } => {
            let _ = reply.send(connection.join_guild(hostname, invite_code));
        }
        Command::AddReady { handler, reply } => {
            let id = connection.add_ready_handler(handler);
            // A dropped reply leaves a handler nobody can remove; take it back out.
            if reply.send(id).is_err() {
                connection.remove_ready_handler(id);
            }
        }
        Command::RemoveReady(id) => connection.remove_ready_handler(id),
        Command::AddDisconnect { handler, reply } => {
            let id = connection.add_disconnect_handler(handler);
            if reply.send(id).is_err() {
                connection.remove_disconnect_handler(id);
            }
        }
        Command::RemoveDisconnect(id) => connection.remove_disconnect_handler(id),
        Command::HeartbeatInterval(reply) => {
            let _ = reply.send(connection.heartbeat_interval());
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}
