//! Reconnecting session client
//!
//! The client is either disconnected or connected. Every connect mints a new
//! token, opens the transport, performs the STOMP handshake and subscribes
//! to the full topic set. Any failure closes what is left of the session and
//! schedules exactly one reconnect timer with capped exponential backoff.
//!
//! `epoch` changes on every `connect()`/`disconnect()`. Tasks started for an
//! older epoch discard their results instead of touching the session.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use secrecy::SecretString;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::AgentError;
use crate::session::attendance::{parse_payload, AttendanceSink};
use crate::session::greeting::Greeting;
use crate::session::stomp::{Command, Frame};
use crate::session::token::SessionTokenSource;
use crate::session::topics::Topics;
use crate::session::transport::{SessionLink, SessionTransport};
use crate::utils::{calc_exp_backoff, CooldownOptions};

/// Session client options
#[derive(Debug, Clone)]
pub struct Options {
    /// Reconnect backoff
    pub backoff: CooldownOptions,

    /// Time allowed for the CONNECTED acknowledgment
    pub connect_timeout: Duration,

    /// Time allowed for DISCONNECT to be flushed
    pub disconnect_timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            backoff: CooldownOptions::default(),
            connect_timeout: Duration::from_secs(15),
            disconnect_timeout: Duration::from_secs(2),
        }
    }
}

/// Snapshot of the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub active: bool,
    pub connected: bool,
    pub attempt: u32,
    pub subscriptions: Vec<String>,
}

#[derive(Debug, Clone)]
struct Identity {
    primary: String,
    secondary: Option<String>,
}

#[derive(Default)]
struct SessionState {
    identity: Option<Identity>,
    token: Option<SecretString>,
    active: bool,
    connected: bool,
    attempt: u32,
    subscriptions: Vec<String>,
    outbound: Option<mpsc::UnboundedSender<Frame>>,
    pending_reconnect: Option<JoinHandle<()>>,
    pump: Option<JoinHandle<()>>,
    epoch: u64,
}

struct Inner {
    options: Options,
    tokens: Arc<dyn SessionTokenSource>,
    transport: Arc<dyn SessionTransport>,
    sink: Arc<dyn AttendanceSink>,
    greeting: Greeting,
    state: Mutex<SessionState>,
}

/// Reconnecting publish/subscribe session
#[derive(Clone)]
pub struct SessionClient {
    inner: Arc<Inner>,
}

impl SessionClient {
    pub fn new(
        options: Options,
        tokens: Arc<dyn SessionTokenSource>,
        transport: Arc<dyn SessionTransport>,
        sink: Arc<dyn AttendanceSink>,
        greeting: Greeting,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                options,
                tokens,
                transport,
                sink,
                greeting,
                state: Mutex::new(SessionState::default()),
            }),
        }
    }

    /// Start the session and run the first connect attempt.
    ///
    /// A failed attempt is not returned; it schedules a reconnect. Calling
    /// this while the session is active does nothing.
    pub async fn connect(&self, primary_id: &str, secondary_id: Option<&str>) {
        let epoch = {
            let mut state = self.inner.state.lock().await;
            if state.active {
                info!("Session already active, ignoring connect");
                return;
            }
            state.active = true;
            state.attempt = 0;
            state.identity = Some(Identity {
                primary: primary_id.to_string(),
                secondary: secondary_id.map(str::to_string),
            });
            state.epoch += 1;
            state.epoch
        };

        Inner::attempt(self.inner.clone(), epoch).await;
    }

    /// End the session and cancel any pending reconnect
    pub async fn disconnect(&self) {
        let (outbound, pump) = {
            let mut state = self.inner.state.lock().await;
            if let Some(timer) = state.pending_reconnect.take() {
                timer.abort();
            }
            state.epoch += 1;
            state.active = false;
            state.connected = false;
            state.token = None;
            state.subscriptions.clear();
            (state.outbound.take(), state.pump.take())
        };

        if let Some(outbound) = outbound {
            let _ = outbound.send(Frame::disconnect("bye"));
        }

        if let Some(mut pump) = pump {
            if tokio::time::timeout(self.inner.options.disconnect_timeout, &mut pump)
                .await
                .is_err()
            {
                pump.abort();
            }
        }
        info!("Session disconnected");
    }

    /// Send a heartbeat if connected; returns whether one was queued
    pub async fn heartbeat(&self) -> bool {
        let state = self.inner.state.lock().await;
        let Some(outbound) = state.outbound.as_ref().filter(|_| state.connected) else {
            debug!("Session not connected, skipping heartbeat");
            return false;
        };

        let ping = serde_json::json!({
            "type": "ping",
            "at": chrono::Utc::now().to_rfc3339(),
        });
        outbound.send(Frame::send_json(Topics::PING, &ping)).is_ok()
    }

    pub async fn status(&self) -> SessionStatus {
        let state = self.inner.state.lock().await;
        SessionStatus {
            active: state.active,
            connected: state.connected,
            attempt: state.attempt,
            subscriptions: state.subscriptions.clone(),
        }
    }

    /// Whether a reconnect timer is waiting
    pub async fn reconnect_pending(&self) -> bool {
        self.inner.state.lock().await.pending_reconnect.is_some()
    }
}

impl Inner {
    /// One connect attempt. Boxed because a failed attempt schedules the next.
    fn attempt(inner: Arc<Inner>, epoch: u64) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            let identity = {
                let mut state = inner.state.lock().await;
                if state.epoch != epoch || !state.active {
                    return;
                }
                state.pending_reconnect = None;
                match state.identity.clone() {
                    Some(identity) => identity,
                    None => return,
                }
            };

            if let Err(e) = Inner::establish(&inner, epoch, &identity).await {
                warn!("Session connect failed: {}", e);
                inner.connection_lost(epoch).await;
            }
        })
    }

    async fn establish(inner: &Arc<Inner>, epoch: u64, identity: &Identity) -> Result<(), AgentError> {
        let token = inner.tokens.mint().await?;
        let mut link = inner.transport.open(&token).await?;

        let subscriptions = match inner.handshake(link.as_mut(), &token, epoch, identity).await {
            Ok(subscriptions) => subscriptions,
            Err(e) => {
                link.close().await;
                return Err(e);
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = inner.state.lock().await;
        if state.epoch != epoch || !state.active {
            drop(state);
            debug!("Session ended during connect, dropping the new link");
            link.close().await;
            return Ok(());
        }

        state.connected = true;
        state.token = Some(token);
        state.subscriptions = subscriptions;
        state.outbound = Some(tx);
        state.pump = Some(tokio::spawn(Inner::pump(inner.clone(), epoch, link, rx)));
        info!("Session connected");
        Ok(())
    }

    async fn handshake(
        &self,
        link: &mut dyn SessionLink,
        token: &SecretString,
        epoch: u64,
        identity: &Identity,
    ) -> Result<Vec<String>, AgentError> {
        link.send(&Frame::connect(&self.transport.host(), token)).await?;

        tokio::time::timeout(self.options.connect_timeout, await_connected(link))
            .await
            .map_err(|_| AgentError::SessionError("timed out waiting for CONNECTED".to_string()))??;

        {
            let mut state = self.state.lock().await;
            if state.epoch != epoch {
                return Err(AgentError::SessionError("session ended during connect".to_string()));
            }
            state.attempt = 0;
        }

        let topics = Topics::subscriptions(&identity.primary, identity.secondary.as_deref());
        for (index, topic) in topics.iter().enumerate() {
            link.send(&Frame::subscribe(&format!("sub-{}", index), topic)).await?;
        }

        let hello = self
            .greeting
            .message(&identity.primary, identity.secondary.as_deref());
        link.send(&Frame::send_json(Topics::HELLO, &hello)).await?;

        Ok(topics)
    }

    async fn pump(
        inner: Arc<Inner>,
        epoch: u64,
        mut link: Box<dyn SessionLink>,
        mut outbound: mpsc::UnboundedReceiver<Frame>,
    ) {
        loop {
            tokio::select! {
                frame = outbound.recv() => match frame {
                    Some(frame) => {
                        let closing = frame.command == Command::Disconnect;
                        if let Err(e) = link.send(&frame).await {
                            warn!("Session send failed: {}", e);
                            break;
                        }
                        if closing {
                            break;
                        }
                    }
                    None => break,
                },
                incoming = link.recv() => match incoming {
                    Some(Ok(frame)) => {
                        if frame.command == Command::Error {
                            warn!(
                                "Session error from server: {}",
                                frame.header("message").unwrap_or(frame.body.as_str())
                            );
                            break;
                        }
                        inner.dispatch(frame).await;
                    }
                    Some(Err(e)) => {
                        warn!("Session transport error: {}", e);
                        break;
                    }
                    None => {
                        info!("Session closed by server");
                        break;
                    }
                },
            }
        }

        link.close().await;
        inner.connection_lost(epoch).await;
    }

    async fn dispatch(&self, frame: Frame) {
        if frame.command != Command::Message {
            debug!("Ignoring {} frame", frame.command);
            return;
        }

        let destination = frame.header("destination").unwrap_or_default();
        match Topics::parse_attendance_id(destination) {
            Some(id) => self.sink.record(id, parse_payload(&frame.body)).await,
            None => match destination {
                Topics::HEARTBEAT => debug!("Heartbeat echo received"),
                _ => info!("Message on {}: {}", destination, frame.body),
            },
        }
    }

    /// Clear the live session and schedule the next attempt
    async fn connection_lost(self: &Arc<Self>, epoch: u64) {
        let mut state = self.state.lock().await;
        if state.epoch != epoch || !state.active {
            return;
        }

        state.connected = false;
        state.token = None;
        state.subscriptions.clear();
        state.outbound = None;
        state.pump = None;

        let delay = calc_exp_backoff(&self.options.backoff, state.attempt);
        state.attempt = state.attempt.saturating_add(1);

        if let Some(previous) = state.pending_reconnect.take() {
            previous.abort();
        }

        let inner = self.clone();
        state.pending_reconnect = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            Inner::attempt(inner, epoch).await;
        }));
        info!("Reconnecting in {:?} (attempt {})", delay, state.attempt);
    }
}

async fn await_connected(link: &mut dyn SessionLink) -> Result<(), AgentError> {
    loop {
        match link.recv().await {
            Some(Ok(frame)) => match frame.command {
                Command::Connected => return Ok(()),
                Command::Error => {
                    return Err(AgentError::AuthError(
                        frame
                            .header("message")
                            .unwrap_or("session rejected")
                            .to_string(),
                    ))
                }
                other => debug!("Ignoring {} before CONNECTED", other),
            },
            Some(Err(e)) => return Err(e),
            None => {
                return Err(AgentError::SessionError(
                    "transport closed before CONNECTED".to_string(),
                ))
            }
        }
    }
}
