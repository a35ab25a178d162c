//! The contract between this adapter and the host bridge framework.

use crate::session::UserLoginMetadata;
use crate::urn::Urn;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Connection status reported to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeState {
    Connecting,
    Connected,
    TransientDisconnect(String),
    BadCredentials(String),
    UnknownError(String),
}

/// Who an inbound event is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSender {
    pub sender: Urn,
    pub is_from_me: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Video,
    File,
    Link,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub url: String,
    pub name: Option<String>,
    pub mime_type: Option<String>,
    pub size: Option<u64>,
}

/// A LinkedIn message translated for the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedMessage {
    pub id: Urn,
    pub timestamp: DateTime<Utc>,
    pub sender: EventSender,
    pub text: String,
    /// Present when the body carries formatting.
    pub html: Option<String>,
    pub attachments: Vec<Attachment>,
    pub reply_to: Option<Urn>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMember {
    pub id: Urn,
    pub name: String,
    pub avatar_url: Option<String>,
    pub profile_url: Option<String>,
    pub is_from_me: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatInfo {
    pub conversation: Urn,
    pub name: Option<String>,
    pub is_group: bool,
    pub members: Vec<ChatMember>,
    pub unread: bool,
    pub last_activity_at: Option<DateTime<Utc>>,
}

/// Events queued into the host, one per remote change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEvent {
    ChatResync {
        conversation: Urn,
        info: Option<ChatInfo>,
    },
    ChatDelete {
        conversation: Urn,
    },
    Message {
        conversation: Urn,
        message: ConvertedMessage,
    },
    Edit {
        conversation: Urn,
        target: Urn,
        message: ConvertedMessage,
    },
    MessageRemove {
        conversation: Urn,
        target: Urn,
        sender: EventSender,
    },
    Typing {
        conversation: Urn,
        sender: EventSender,
        timeout: Duration,
    },
    ReadReceipt {
        conversation: Urn,
        sender: EventSender,
        target: Urn,
        read_at: DateTime<Utc>,
    },
    Reaction {
        conversation: Option<Urn>,
        target: Urn,
        sender: EventSender,
        emoji: String,
    },
    ReactionRemove {
        conversation: Option<Urn>,
        target: Urn,
        sender: EventSender,
        emoji: String,
    },
}

impl RemoteEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            RemoteEvent::ChatResync { .. } => "chat_resync",
            RemoteEvent::ChatDelete { .. } => "chat_delete",
            RemoteEvent::Message { .. } => "message",
            RemoteEvent::Edit { .. } => "edit",
            RemoteEvent::MessageRemove { .. } => "message_remove",
            RemoteEvent::Typing { .. } => "typing",
            RemoteEvent::ReadReceipt { .. } => "read_receipt",
            RemoteEvent::Reaction { .. } => "reaction",
            RemoteEvent::ReactionRemove { .. } => "reaction_remove",
        }
    }
}

/// A message the host already bridged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: Urn,
    pub conversation: Urn,
    pub sender: Urn,
    pub timestamp: DateTime<Utc>,
    pub text: Option<String>,
}

#[async_trait]
pub trait HostBridge: Send + Sync {
    async fn queue_remote_event(&self, event: RemoteEvent);

    async fn get_message(&self, id: &Urn) -> Option<StoredMessage>;

    async fn find_dm_chat(&self, user: &Urn) -> Option<Urn>;

    async fn update_state(&self, state: BridgeState);

    async fn save_login(&self, metadata: &UserLoginMetadata);
}
