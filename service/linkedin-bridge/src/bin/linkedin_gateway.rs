//! LinkedIn gateway that signs in with browser cookies, follows the
//! realtime stream and logs every bridged event until Ctrl-C.

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use linkedin_bridge::{
    login_with_cookies, BridgeConfig, BridgeState, HostBridge, LinkedInBridge, RemoteEvent,
    StoredMessage, Urn, UserLoginMetadata,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Parser)]
#[command(author, version, about = "LinkedIn Messaging gateway")]
struct Cli {
    /// Cookie header copied from a signed-in browser session
    #[arg(long, env = "LINKEDIN_COOKIES", hide_env_values = true)]
    cookies: String,

    /// Optional TOML configuration file
    #[arg(long, env = "LINKEDIN_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Skip the conversation sync on connect
    #[arg(long, env = "LINKEDIN_SKIP_SYNC", default_value_t = false)]
    skip_sync: bool,
}

/// Keeps bridged messages in memory so receipts and reactions resolve.
#[derive(Default)]
struct LoggingHost {
    messages: Mutex<HashMap<Urn, StoredMessage>>,
    dms: Mutex<HashMap<Urn, Urn>>,
}

#[async_trait]
impl HostBridge for LoggingHost {
    async fn queue_remote_event(&self, event: RemoteEvent) {
        match &event {
            RemoteEvent::Message {
                conversation,
                message,
            } => {
                info!(
                    %conversation,
                    sender = %message.sender.sender,
                    text = %message.text,
                    attachments = message.attachments.len(),
                    "message"
                );
                self.messages.lock().insert(
                    message.id.clone(),
                    StoredMessage {
                        id: message.id.clone(),
                        conversation: conversation.clone(),
                        sender: message.sender.sender.clone(),
                        timestamp: message.timestamp,
                        text: Some(message.text.clone()),
                    },
                );
            }
            RemoteEvent::ChatResync {
                conversation,
                info: Some(info),
            } => {
                if !info.is_group {
                    if let Some(other) = info.members.iter().find(|m| !m.is_from_me) {
                        self.dms.lock().insert(other.id.clone(), conversation.clone());
                    }
                }
                info!(%conversation, name = ?info.name, members = info.members.len(), "chat resync");
            }
            other => info!(kind = other.kind(), ?other, "remote event"),
        }
    }

    async fn get_message(&self, id: &Urn) -> Option<StoredMessage> {
        self.messages.lock().get(id).cloned()
    }

    async fn find_dm_chat(&self, user: &Urn) -> Option<Urn> {
        self.dms.lock().get(user).cloned()
    }

    async fn update_state(&self, state: BridgeState) {
        match &state {
            BridgeState::BadCredentials(_) | BridgeState::UnknownError(_) => {
                warn!(?state, "bridge state")
            }
            _ => info!(?state, "bridge state"),
        }
    }

    async fn save_login(&self, metadata: &UserLoginMetadata) {
        debug!(
            cookies = metadata.cookies.iter().count(),
            user = ?metadata.fsd_profile_urn,
            "login metadata updated"
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    linkedin_bridge::init_tracing();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => BridgeConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => BridgeConfig::default(),
    };
    if cli.skip_sync {
        config.sync.on_connect = false;
    }

    let login = login_with_cookies(&config, &cli.cookies)
        .await
        .context("cookie login failed")?;
    info!(login_id = %login.login_id, name = %login.remote_name(), "signed in");

    let host: Arc<dyn HostBridge> = Arc::new(LoggingHost::default());
    let bridge = LinkedInBridge::new(config, &login.metadata, host)
        .context("failed to build the bridge")?;
    bridge.connect().await.context("failed to connect")?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutting down");
    bridge.disconnect().await;
    Ok(())
}
