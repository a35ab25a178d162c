//! The network adapter a host bridge framework drives for one login.
//!
//! Inbound, realtime callbacks are forwarded over an unbounded channel to a
//! dispatcher task that turns them into [`RemoteEvent`]s. Outbound, the
//! `handle_matrix_*` methods map host actions onto [`Client`] calls.

pub mod backfill;
pub mod convert;
pub mod host;
pub mod inbound;
pub mod login;
pub mod outbound;

pub use backfill::{FetchMessagesParams, FetchMessagesResponse};
pub use host::{
    Attachment, AttachmentKind, BridgeState, ChatInfo, ChatMember, ConvertedMessage, EventSender,
    HostBridge, RemoteEvent, StoredMessage,
};
pub use login::{login_with_cookies, LoginOutcome};
pub use outbound::{MatrixMessage, MediaUpload, ResolvedIdentifier, SendResponse};

use crate::attributed::{DefaultHtmlConverter, HtmlConverter};
use crate::client::Client;
use crate::config::BridgeConfig;
use crate::error::{LinkedInError, Result};
use crate::model::Conversation;
use crate::realtime::{ConnectionState, RealtimeEngine, StatsSnapshot};
use crate::session::{LoginSession, UserLoginMetadata};
use crate::urn::Urn;
use inbound::{Dispatcher, ForwardingHandler};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

struct Running {
    cancel: CancellationToken,
    engine: Arc<RealtimeEngine>,
    tasks: Vec<JoinHandle<()>>,
}

impl Running {
    fn invalidated(&self) -> bool {
        self.engine.state() == ConnectionState::TokenInvalidated
    }

    async fn stop(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(err) = task.await {
                warn!(error = %err, "bridge task ended abnormally");
            }
        }
    }
}

pub struct LinkedInBridge {
    config: BridgeConfig,
    session: Arc<LoginSession>,
    client: Client,
    host: Arc<dyn HostBridge>,
    converter: Arc<dyn HtmlConverter>,
    running: Mutex<Option<Running>>,
}

impl LinkedInBridge {
    pub fn new(
        config: BridgeConfig,
        metadata: &UserLoginMetadata,
        host: Arc<dyn HostBridge>,
    ) -> Result<Self> {
        let session = Arc::new(LoginSession::from_metadata(metadata));
        let client = Client::new(session.clone(), config.linkedin.clone())?;
        Ok(Self {
            config,
            session,
            client,
            host,
            converter: Arc::new(DefaultHtmlConverter),
            running: Mutex::new(None),
        })
    }

    pub fn with_converter(mut self, converter: Arc<dyn HtmlConverter>) -> Self {
        self.converter = converter;
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn session(&self) -> &Arc<LoginSession> {
        &self.session
    }

    /// True while the realtime loop runs on a session LinkedIn still accepts.
    pub fn is_connected(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|running| !running.invalidated())
    }

    pub fn realtime_stats(&self) -> Option<StatsSnapshot> {
        self.running.lock().as_ref().map(|r| r.engine.stats())
    }

    /// Start the realtime loop, the inbound dispatcher and, when enabled,
    /// the bulk conversation sync. Calling it while connected is a no-op;
    /// a loop stopped by an invalidated session is torn down and rebuilt.
    pub async fn connect(&self) -> Result<()> {
        let stale = {
            let mut running = self.running.lock();
            if running.as_ref().is_some_and(|current| !current.invalidated()) {
                debug!("already connected");
                return Ok(());
            }
            running.take()
        };
        if let Some(stale) = stale {
            debug!("replacing realtime loop of an invalidated session");
            stale.stop().await;
        }
        self.host.update_state(BridgeState::Connecting).await;

        let own = match self.client.mailbox_urn().await {
            Ok(own) => own,
            Err(err @ LinkedInError::TokenInvalidated { .. }) => {
                self.session.clear_cookies();
                self.host.save_login(&self.session.metadata()).await;
                self.host
                    .update_state(BridgeState::BadCredentials(err.to_string()))
                    .await;
                return Err(err);
            }
            Err(err) => {
                self.host
                    .update_state(BridgeState::UnknownError(err.to_string()))
                    .await;
                return Err(err);
            }
        };

        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Arc::new(RealtimeEngine::new(
            self.client.clone(),
            self.config.realtime.clone(),
            Arc::new(ForwardingHandler::new(tx)),
        ));

        let dispatcher = Dispatcher::new(
            self.client.clone(),
            self.host.clone(),
            self.converter.clone(),
            own.clone(),
        );
        let mut tasks = vec![
            engine.clone().spawn(cancel.child_token()),
            tokio::spawn(dispatcher.run(rx, cancel.child_token())),
        ];
        if self.config.sync.on_connect {
            tasks.push(tokio::spawn(sync_conversations(
                self.client.clone(),
                self.host.clone(),
                own.clone(),
                self.config.sync.page_size,
                self.config.sync.max_conversations,
                cancel.child_token(),
            )));
        }

        info!(user = %own, "linkedin bridge connected");
        *self.running.lock() = Some(Running {
            cancel,
            engine,
            tasks,
        });
        Ok(())
    }

    /// Stop every background task. Nothing is reported to the host.
    pub async fn disconnect(&self) {
        let Some(running) = self.running.lock().take() else {
            return;
        };
        running.stop().await;
        info!("linkedin bridge disconnected");
    }

    /// Swap in refreshed credentials and rebuild the realtime loop on them.
    pub async fn refresh_login(&self, metadata: &UserLoginMetadata) -> Result<()> {
        self.disconnect().await;
        self.session.replace_cookies(metadata.cookies.clone());
        if let Some(urn) = &metadata.fsd_profile_urn {
            self.session.set_fsd_profile_urn(urn.clone());
        }
        info!("linkedin credentials refreshed");
        self.connect().await
    }

    /// Log out server-side and persist the cleared login.
    pub async fn logout(&self) -> Result<()> {
        self.disconnect().await;
        let result = self.client.logout().await;
        self.host.save_login(&self.session.metadata()).await;
        result
    }

    pub fn get_chat_info(&self, conversation: &Conversation) -> Result<ChatInfo> {
        let own = self
            .session
            .fsd_profile_urn()
            .ok_or_else(|| LinkedInError::other("signed-in profile is not known yet"))?;
        Ok(convert::chat_info(conversation, &own))
    }
}

/// Page through every conversation and resync the ones still visible.
async fn sync_conversations(
    client: Client,
    host: Arc<dyn HostBridge>,
    own: Urn,
    page_size: usize,
    max_conversations: usize,
    cancel: CancellationToken,
) {
    let mut pager = client.conversation_pager(page_size);
    let mut synced = 0usize;
    loop {
        let page = tokio::select! {
            _ = cancel.cancelled() => return,
            page = pager.next_page() => page,
        };
        let conversations = match page {
            Ok(Some(conversations)) => conversations,
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, synced, "conversation sync failed");
                return;
            }
        };
        for conversation in conversations {
            if max_conversations > 0 && synced >= max_conversations {
                info!(synced, "conversation sync reached its limit");
                return;
            }
            if conversation.is_spam() || !conversation.has_participant(&own) {
                continue;
            }
            host.queue_remote_event(RemoteEvent::ChatResync {
                conversation: conversation.entity_urn.clone(),
                info: Some(convert::chat_info(&conversation, &own)),
            })
            .await;
            synced += 1;
        }
    }
    info!(synced, "conversation sync finished");
}
