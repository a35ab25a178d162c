//! Payloads carried by decorated realtime events.

use super::conversation::MessagingParticipant;
use super::message::ConversationRef;
use crate::urn::Urn;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDelete {
    pub entity_urn: Urn,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenReceipt {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub seen_at: DateTime<Utc>,
    pub message: MessageRef,
    pub seen_by_participant: MessagingParticipant,
}

impl SeenReceipt {
    pub fn message_urn(&self) -> &Urn {
        &self.message.entity_urn
    }

    pub fn seen_by(&self) -> Option<&Urn> {
        self.seen_by_participant.identity()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub entity_urn: Urn,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionSummary {
    pub reaction_added: bool,
    pub actor_urn: Urn,
    pub message_urn: Urn,
    pub reaction_summary: ReactionCount,
}

impl ReactionSummary {
    pub fn emoji(&self) -> &str {
        &self.reaction_summary.emoji
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionCount {
    pub emoji: String,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub viewer_reacted: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingIndicator {
    pub typing_participant: MessagingParticipant,
    pub conversation: ConversationRef,
}

impl TypingIndicator {
    pub fn typist(&self) -> Option<&Urn> {
        self.typing_participant.identity()
    }

    pub fn conversation_urn(&self) -> &Urn {
        &self.conversation.entity_urn
    }
}
