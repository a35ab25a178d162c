//! Wire types for the LinkedIn messenger API.
//!
//! Unions on the wire are single-key objects (`{"member": {...}}`). Keys this
//! client does not know decode to an `Unknown` variant instead of failing,
//! so new server-side kinds do not break whole pages.

pub mod conversation;
pub mod message;
pub mod profile;
pub mod realtime;

pub use conversation::{
    Conversation, ConversationPage, MemberParticipant, MessagingParticipant,
    OrganizationParticipant, ParticipantType,
};
pub use message::{
    ConversationRef, ExternalMedia, FileAttachment, ImageAttachment, Message, MessagePage,
    MessageSentInfo, RenderContent, RenderFormat, RepliedMessage, VideoAttachment,
};
pub use profile::{MiniProfile, UserProfile, VectorImage};
pub use realtime::{ConversationDelete, ReactionSummary, SeenReceipt, TypingIndicator};

use serde::Deserialize;
use serde_json::{Map, Value};

/// GraphQL collection wrapper: `{elements, metadata}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection<T> {
    #[serde(default = "Vec::new")]
    pub elements: Vec<T>,
    #[serde(default)]
    pub metadata: CollectionMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionMetadata {
    #[serde(default)]
    pub new_sync_token: Option<String>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub prev_cursor: Option<String>,
}

/// Populated branches of a wire union, skipping explicit nulls.
pub(crate) fn union_branches(union: &Map<String, Value>) -> impl Iterator<Item = (&str, &Value)> {
    union
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| (key.as_str(), value))
}

/// The `text` of a `{"text": ...}` wrapper, as used for names and titles.
pub(crate) fn text_of(value: Option<&Value>) -> String {
    value
        .and_then(|v| v.get("text"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
