use super::conversation::MessagingParticipant;
use super::profile::VectorImage;
use super::union_branches;
use crate::attributed::AttributedText;
use crate::urn::Urn;
use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub entity_urn: Urn,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub delivered_at: DateTime<Utc>,
    #[serde(default)]
    pub body: AttributedText,
    pub sender: MessagingParticipant,
    #[serde(default)]
    pub message_body_render_format: RenderFormat,
    #[serde(default)]
    pub render_content: Vec<RenderContent>,
    #[serde(default)]
    pub conversation: Option<ConversationRef>,
}

impl Message {
    pub fn conversation_urn(&self) -> Option<&Urn> {
        self.conversation.as_ref().map(|c| &c.entity_urn)
    }

    pub fn sender_urn(&self) -> Option<&Urn> {
        self.sender.identity()
    }

    /// The quoted message, when this message is a reply.
    pub fn replied_message(&self) -> Option<&RepliedMessage> {
        self.render_content.iter().find_map(|content| match content {
            RenderContent::RepliedMessage(reply) => Some(reply),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRef {
    pub entity_urn: Urn,
}

/// A page of messages, newest first, and the cursor to the page before it.
#[derive(Debug, Clone, Default)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub prev_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSentInfo {
    pub message_urn: Urn,
    pub delivered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum RenderFormat {
    #[default]
    Default,
    Edited,
    Recalled,
    System,
    Unknown(String),
}

impl RenderFormat {
    pub fn as_str(&self) -> &str {
        match self {
            RenderFormat::Default => "DEFAULT",
            RenderFormat::Edited => "EDITED",
            RenderFormat::Recalled => "RECALLED",
            RenderFormat::System => "SYSTEM",
            RenderFormat::Unknown(other) => other,
        }
    }
}

impl From<String> for RenderFormat {
    fn from(value: String) -> Self {
        match value.as_str() {
            "DEFAULT" => RenderFormat::Default,
            "EDITED" => RenderFormat::Edited,
            "RECALLED" => RenderFormat::Recalled,
            "SYSTEM" => RenderFormat::System,
            _ => RenderFormat::Unknown(value),
        }
    }
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RenderFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RenderFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(RenderFormat::from(String::deserialize(deserializer)?))
    }
}

/// One entry of `renderContent`.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderContent {
    File(FileAttachment),
    Image(ImageAttachment),
    ExternalMedia(ExternalMedia),
    Video(VideoAttachment),
    RepliedMessage(RepliedMessage),
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAttachment {
    pub asset_urn: Urn,
    #[serde(default)]
    pub byte_size: u64,
    #[serde(default)]
    pub media_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAttachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digitalmedia_asset: Option<Urn>,
    #[serde(flatten)]
    pub image: VectorImage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalMedia {
    #[serde(default)]
    pub title: Option<String>,
    pub media: ExternalMediaSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalMediaSource {
    pub url: String,
    #[serde(default)]
    pub original_width: Option<u32>,
    #[serde(default)]
    pub original_height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAttachment {
    #[serde(default)]
    pub progressive_streams: Vec<ProgressiveStream>,
    #[serde(default)]
    pub thumbnail: Option<VectorImage>,
}

impl VideoAttachment {
    pub fn best_stream(&self) -> Option<(&ProgressiveStream, &str)> {
        self.progressive_streams
            .iter()
            .max_by_key(|s| u64::from(s.width) * u64::from(s.height))
            .and_then(|s| s.streaming_locations.first().map(|l| (s, l.url.as_str())))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressiveStream {
    #[serde(default)]
    pub streaming_locations: Vec<StreamingLocation>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub media_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingLocation {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepliedMessage {
    pub original_message_urn: Urn,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_sender_urn: Option<Urn>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_send_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message_body: AttributedText,
}

impl RenderContent {
    fn wire_key(&self) -> Option<&'static str> {
        match self {
            RenderContent::File(_) => Some("file"),
            RenderContent::Image(_) => Some("vectorImage"),
            RenderContent::ExternalMedia(_) => Some("externalMedia"),
            RenderContent::Video(_) => Some("video"),
            RenderContent::RepliedMessage(_) => Some("repliedMessageContent"),
            RenderContent::Unknown => None,
        }
    }
}

impl Serialize for RenderContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let inner = match self {
            RenderContent::File(file) => serde_json::to_value(file),
            RenderContent::Image(image) => serde_json::to_value(image),
            RenderContent::ExternalMedia(media) => serde_json::to_value(media),
            RenderContent::Video(video) => serde_json::to_value(video),
            RenderContent::RepliedMessage(reply) => serde_json::to_value(reply),
            RenderContent::Unknown => Ok(Value::Null),
        }
        .map_err(serde::ser::Error::custom)?;
        let mut union = Map::new();
        if let Some(key) = self.wire_key() {
            union.insert(key.to_string(), inner);
        }
        Value::Object(union).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RenderContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let union = Map::<String, Value>::deserialize(deserializer)?;
        for (key, value) in union_branches(&union) {
            let decoded = match key {
                "file" => serde_json::from_value(value.clone()).map(RenderContent::File),
                "vectorImage" => serde_json::from_value(value.clone()).map(RenderContent::Image),
                "externalMedia" => {
                    serde_json::from_value(value.clone()).map(RenderContent::ExternalMedia)
                }
                "video" => serde_json::from_value(value.clone()).map(RenderContent::Video),
                "repliedMessageContent" => {
                    serde_json::from_value(value.clone()).map(RenderContent::RepliedMessage)
                }
                _ => continue,
            };
            // A branch this client cannot read is treated like an unknown one.
            return Ok(decoded.unwrap_or(RenderContent::Unknown));
        }
        Ok(RenderContent::Unknown)
    }
}
