//! Realtime event engine.
//!
//! Keeps one server-sent-event subscription alive per login, decodes each
//! `data:` line and hands the result to a [`RealtimeHandler`] on the read
//! task, in arrival order.
//!
//! ```text
//! Disconnected -> MetaScraped -> Streaming
//!      ^                             |
//!      +---------- Backoff <---------+   (EOF, transport error, silence)
//!
//! any state -> TokenInvalidated        (logout indicator, repeated 401/403)
//! ```

pub mod event;
pub mod sse;

pub use event::{DecoratedEvent, RealtimeEvent, StreamEvent, TopicKind};

use crate::client::endpoints;
use crate::client::Client;
use crate::config::RealtimeConfig;
use crate::error::{LinkedInError, Result};
use futures::StreamExt;
use reqwest::Method;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    MetaScraped,
    Streaming,
    Backoff,
    TokenInvalidated,
}

/// Callbacks invoked from the read task. Implementations should hand work
/// off quickly; the next event is not read until a callback returns.
pub trait RealtimeHandler: Send + Sync {
    fn on_heartbeat(&self) {}

    fn on_client_connection(&self, _id: &str) {}

    fn on_decorated_event(&self, _event: DecoratedEvent) {}

    fn on_transient_disconnect(&self, _error: &LinkedInError) {}

    fn on_bad_credentials(&self, _error: &LinkedInError) {}

    fn on_unknown_error(&self, _error: &LinkedInError) {}
}

#[derive(Debug, Default)]
pub struct RealtimeStats {
    heartbeats: AtomicU64,
    events: AtomicU64,
    decode_errors: AtomicU64,
    unknown_topics: AtomicU64,
    ignored: AtomicU64,
    reconnects: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub heartbeats: u64,
    pub events: u64,
    pub decode_errors: u64,
    pub unknown_topics: u64,
    pub ignored: u64,
    pub reconnects: u64,
}

impl RealtimeStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            heartbeats: self.heartbeats.load(Ordering::Relaxed),
            events: self.events.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            unknown_topics: self.unknown_topics.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// How a healthy stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamEnd {
    Eof,
    HeartbeatTimeout,
}

#[derive(Debug, Default)]
struct Attempts {
    failures: u32,
    unauthorized: u32,
}

pub struct RealtimeEngine {
    client: Client,
    config: RealtimeConfig,
    handler: Arc<dyn RealtimeHandler>,
    state: watch::Sender<ConnectionState>,
    stats: Arc<RealtimeStats>,
}

impl RealtimeEngine {
    pub fn new(client: Client, config: RealtimeConfig, handler: Arc<dyn RealtimeHandler>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            client,
            config,
            handler,
            state,
            stats: Arc::new(RealtimeStats::default()),
        }
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    /// Run until canceled or the session is invalidated.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut attempts = Attempts::default();
        info!("realtime engine started");

        loop {
            self.set_state(ConnectionState::Disconnected);
            let outcome = tokio::select! {
                _ = cancel.cancelled() => break,
                outcome = self.connect_and_stream(&mut attempts) => outcome,
            };

            match outcome {
                Ok(StreamEnd::Eof) => {
                    let err = LinkedInError::other("event stream closed by server");
                    debug!("{err}");
                    self.handler.on_transient_disconnect(&err);
                }
                Ok(StreamEnd::HeartbeatTimeout) => {
                    let err = LinkedInError::other(format!(
                        "no heartbeat for {}s",
                        self.config.heartbeat_timeout().as_secs()
                    ));
                    warn!("{err}");
                    self.handler.on_transient_disconnect(&err);
                }
                Err(err @ LinkedInError::TokenInvalidated { .. }) => {
                    self.invalidate(&err);
                    return;
                }
                Err(err) if err.is_unauthorized() => {
                    attempts.unauthorized += 1;
                    if attempts.unauthorized >= self.config.max_unauthorized.max(1) {
                        let err = LinkedInError::token_invalidated(format!(
                            "{} consecutive unauthorized responses: {err}",
                            attempts.unauthorized
                        ));
                        self.invalidate(&err);
                        return;
                    }
                    warn!(error = %err, attempt = attempts.unauthorized, "realtime request unauthorized");
                    self.handler.on_transient_disconnect(&err);
                }
                Err(err) if err.is_transient() || matches!(err, LinkedInError::MalformedEvent(_)) => {
                    warn!(error = %err, "realtime connection dropped");
                    self.handler.on_transient_disconnect(&err);
                }
                Err(err) => {
                    error!(error = %err, "realtime connection failed");
                    self.handler.on_unknown_error(&err);
                }
            }

            self.set_state(ConnectionState::Backoff);
            RealtimeStats::bump(&self.stats.reconnects);
            let delay = self.config.backoff(attempts.failures);
            attempts.failures = attempts.failures.saturating_add(1);
            debug!(delay_secs = delay.as_secs(), "reconnecting after backoff");
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.set_state(ConnectionState::Disconnected);
        info!("realtime engine stopped");
    }

    async fn connect_and_stream(&self, attempts: &mut Attempts) -> Result<StreamEnd> {
        self.client.page_meta().await?;
        self.set_state(ConnectionState::MetaScraped);

        let response = self
            .client
            .request(Method::GET, endpoints::REALTIME_CONNECT)
            .with_query_param("rc", "1")
            .with_csrf()
            .with_realtime_headers()
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LinkedInError::api(status, "unexpected realtime connect status"));
        }

        *attempts = Attempts::default();
        self.set_state(ConnectionState::Streaming);
        info!("realtime stream connected");

        let timeout = self.config.heartbeat_timeout();
        let mut deadline = Instant::now() + timeout;
        let lines = sse::lines(response);
        tokio::pin!(lines);

        loop {
            let line = match tokio::time::timeout_at(deadline, lines.next()).await {
                Err(_) => return Ok(StreamEnd::HeartbeatTimeout),
                Ok(None) => return Ok(StreamEnd::Eof),
                Ok(Some(line)) => line?,
            };
            let Some(data) = sse::data_payload(&line) else {
                continue;
            };
            if self.dispatch(data) {
                deadline = Instant::now() + timeout;
            }
        }
    }

    /// Decode and deliver one payload. Returns `true` when it proves the
    /// connection is alive.
    fn dispatch(&self, data: &str) -> bool {
        match event::decode_event(data) {
            Ok(StreamEvent::Heartbeat) => {
                RealtimeStats::bump(&self.stats.heartbeats);
                self.handler.on_heartbeat();
                true
            }
            Ok(StreamEvent::ClientConnection { id }) => {
                debug!(%id, "realtime client connection established");
                self.handler.on_client_connection(&id);
                true
            }
            Ok(StreamEvent::Decorated(event)) => {
                if matches!(event.event, RealtimeEvent::Ignored) {
                    RealtimeStats::bump(&self.stats.ignored);
                } else {
                    RealtimeStats::bump(&self.stats.events);
                    self.handler.on_decorated_event(event);
                }
                false
            }
            Err(LinkedInError::UnknownTopic(topic)) => {
                RealtimeStats::bump(&self.stats.unknown_topics);
                warn!(%topic, "dropping event for unknown topic");
                false
            }
            Err(err) => {
                RealtimeStats::bump(&self.stats.decode_errors);
                warn!(error = %err, "dropping undecodable realtime event");
                false
            }
        }
    }

    fn invalidate(&self, err: &LinkedInError) {
        error!(error = %err, "LinkedIn session invalidated");
        self.set_state(ConnectionState::TokenInvalidated);
        self.client.session().clear_cookies();
        self.handler.on_bad_credentials(err);
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            debug!(from = ?*current, to = ?state, "realtime state change");
            *current = state;
            true
        });
    }
}
