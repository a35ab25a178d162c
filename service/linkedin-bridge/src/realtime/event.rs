//! Decoding of realtime `data:` payloads.

use crate::error::{LinkedInError, Result};
use crate::model::{ConversationDelete, Message, ReactionSummary, SeenReceipt, TypingIndicator};
use crate::urn::Urn;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicKind {
    Conversations,
    ConversationDeletes,
    Messages,
    MessageSeenReceipts,
    MessageReactionSummaries,
    TypingIndicators,
    MessagingDataSync,
    Unknown(String),
}

impl TopicKind {
    /// The first URN component from index 2 onward that names a topic, so
    /// both `urn:li-realtime:messagesTopic:...` and nested forms resolve.
    pub fn of(topic: &Urn) -> Self {
        let Some(name) = topic.components().skip(2).find(|c| c.ends_with("Topic")) else {
            return TopicKind::Unknown(topic.to_string());
        };
        match name {
            "conversationsTopic" => TopicKind::Conversations,
            "conversationDeletesTopic" => TopicKind::ConversationDeletes,
            "messagesTopic" => TopicKind::Messages,
            "messageSeenReceiptsTopic" => TopicKind::MessageSeenReceipts,
            "messageReactionSummariesTopic" => TopicKind::MessageReactionSummaries,
            "typingIndicatorsTopic" => TopicKind::TypingIndicators,
            "messagingDataSyncTopic" => TopicKind::MessagingDataSync,
            other => TopicKind::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum RealtimeEvent {
    ConversationsChanged,
    ConversationDeleted(Urn),
    Message(Box<Message>),
    SeenReceipt(SeenReceipt),
    ReactionSummary(ReactionSummary),
    TypingIndicator(TypingIndicator),
    Ignored,
}

#[derive(Debug, Clone)]
pub struct DecoratedEvent {
    pub id: String,
    pub topic: Urn,
    pub left_server_at: Option<DateTime<Utc>>,
    pub event: RealtimeEvent,
}

/// One decoded `data:` line.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Heartbeat,
    ClientConnection { id: String },
    Decorated(DecoratedEvent),
}

#[derive(Deserialize)]
enum Envelope {
    #[serde(rename = "com.linkedin.realtimefrontend.Heartbeat")]
    Heartbeat {},
    #[serde(rename = "com.linkedin.realtimefrontend.ClientConnection")]
    ClientConnection { id: String },
    #[serde(rename = "com.linkedin.realtimefrontend.DecoratedEvent")]
    DecoratedEvent(WireDecoratedEvent),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDecoratedEvent {
    #[serde(default)]
    id: String,
    topic: Urn,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    left_server_at: Option<DateTime<Utc>>,
    #[serde(default)]
    payload: Option<WirePayload>,
}

#[derive(Deserialize)]
struct WirePayload {
    #[serde(default)]
    data: DecorationData,
}

#[derive(Deserialize)]
struct Decoration<T> {
    result: T,
}

#[derive(Default, Deserialize)]
struct DecorationData {
    #[serde(default, rename = "doDecorateConversationDeleteMessengerRealtimeDecoration")]
    conversation_delete: Option<Decoration<ConversationDelete>>,
    #[serde(default, rename = "doDecorateMessageMessengerRealtimeDecoration")]
    message: Option<Decoration<Message>>,
    #[serde(default, rename = "doDecorateSeenReceiptMessengerRealtimeDecoration")]
    seen_receipt: Option<Decoration<SeenReceipt>>,
    #[serde(default, rename = "doDecorateRealtimeReactionSummaryMessengerRealtimeDecoration")]
    reaction_summary: Option<Decoration<ReactionSummary>>,
    #[serde(default, rename = "doDecorateTypingIndicatorMessengerRealtimeDecoration")]
    typing_indicator: Option<Decoration<TypingIndicator>>,
}

impl DecorationData {
    fn populated(&self) -> usize {
        [
            self.conversation_delete.is_some(),
            self.message.is_some(),
            self.seen_receipt.is_some(),
            self.reaction_summary.is_some(),
            self.typing_indicator.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }

    /// The single decoration, which must belong to `kind`.
    fn into_event(self, kind: &TopicKind) -> Result<RealtimeEvent> {
        let populated = self.populated();
        if populated != 1 {
            return Err(LinkedInError::MalformedEvent(format!(
                "expected exactly one decoration for {kind:?}, found {populated}"
            )));
        }
        let event = match kind {
            TopicKind::ConversationDeletes => self
                .conversation_delete
                .map(|d| RealtimeEvent::ConversationDeleted(d.result.entity_urn)),
            TopicKind::Messages => self
                .message
                .map(|d| RealtimeEvent::Message(Box::new(d.result))),
            TopicKind::MessageSeenReceipts => {
                self.seen_receipt.map(|d| RealtimeEvent::SeenReceipt(d.result))
            }
            TopicKind::MessageReactionSummaries => self
                .reaction_summary
                .map(|d| RealtimeEvent::ReactionSummary(d.result)),
            TopicKind::TypingIndicators => self
                .typing_indicator
                .map(|d| RealtimeEvent::TypingIndicator(d.result)),
            _ => None,
        };
        event.ok_or_else(|| {
            LinkedInError::MalformedEvent(format!("decoration does not match topic {kind:?}"))
        })
    }
}

/// Decode one `data:` payload. Topics this client does not handle surface
/// as [`LinkedInError::UnknownTopic`].
pub fn decode_event(data: &str) -> Result<StreamEvent> {
    let envelope: Envelope =
        serde_json::from_str(data).map_err(|err| LinkedInError::MalformedEvent(err.to_string()))?;

    let wire = match envelope {
        Envelope::Heartbeat {} => return Ok(StreamEvent::Heartbeat),
        Envelope::ClientConnection { id } => return Ok(StreamEvent::ClientConnection { id }),
        Envelope::DecoratedEvent(wire) => wire,
    };

    let kind = TopicKind::of(&wire.topic);
    let data = wire.payload.map(|p| p.data).unwrap_or_default();
    let event = match &kind {
        TopicKind::Conversations => RealtimeEvent::ConversationsChanged,
        TopicKind::MessagingDataSync => RealtimeEvent::Ignored,
        TopicKind::Unknown(_) => return Err(LinkedInError::UnknownTopic(wire.topic.to_string())),
        _ => data.into_event(&kind)?,
    };

    Ok(StreamEvent::Decorated(DecoratedEvent {
        id: wire.id,
        topic: wire.topic,
        left_server_at: wire.left_server_at,
        event,
    }))
}
