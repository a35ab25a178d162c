use super::message::Message;
use super::profile::VectorImage;
use super::{text_of, union_branches, Collection};
use crate::urn::Urn;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

pub const SPAM_CATEGORY: &str = "SPAM";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub entity_urn: Urn,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub group_chat: bool,
    #[serde(default)]
    pub conversation_participants: Vec<MessagingParticipant>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_activity_at: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_read_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub messages: Option<Collection<Message>>,
}

impl Conversation {
    pub fn is_spam(&self) -> bool {
        self.categories.iter().any(|c| c == SPAM_CATEGORY)
    }

    pub fn has_participant(&self, identity: &Urn) -> bool {
        self.conversation_participants
            .iter()
            .any(|p| p.identity() == Some(identity))
    }

    /// Participants other than `own_identity`.
    pub fn other_participants<'a>(
        &'a self,
        own_identity: &'a Urn,
    ) -> impl Iterator<Item = &'a MessagingParticipant> {
        self.conversation_participants
            .iter()
            .filter(move |p| p.identity() != Some(own_identity))
    }

    pub fn latest_messages(&self) -> &[Message] {
        self.messages
            .as_ref()
            .map(|c| c.elements.as_slice())
            .unwrap_or_default()
    }
}

/// A page of conversations plus the token to resume a sync from.
#[derive(Debug, Clone, Default)]
pub struct ConversationPage {
    pub conversations: Vec<Conversation>,
    pub sync_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagingParticipant {
    #[serde(default)]
    pub entity_urn: Option<Urn>,
    /// The fsd profile (or organization) this participant stands for.
    #[serde(default)]
    pub host_identity_urn: Option<Urn>,
    #[serde(default)]
    pub participant_type: ParticipantType,
}

impl MessagingParticipant {
    /// The profile this participant stands for, falling back to the
    /// participant's own URN when the host identity is not decorated.
    pub fn identity(&self) -> Option<&Urn> {
        self.host_identity_urn.as_ref().or(self.entity_urn.as_ref())
    }

    pub fn display_name(&self) -> String {
        match &self.participant_type {
            ParticipantType::Member(member) => member.display_name(),
            ParticipantType::Organization(org) => org.name.clone(),
            ParticipantType::Unknown => String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ParticipantType {
    Member(MemberParticipant),
    Organization(OrganizationParticipant),
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberParticipant {
    pub first_name: String,
    pub last_name: String,
    pub profile_url: Option<String>,
    pub picture: Option<VectorImage>,
    pub headline: Option<String>,
}

impl MemberParticipant {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrganizationParticipant {
    pub name: String,
    pub logo: Option<VectorImage>,
    pub page_url: Option<String>,
}

impl<'de> Deserialize<'de> for ParticipantType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let union = Map::<String, Value>::deserialize(deserializer)?;
        for (key, value) in union_branches(&union) {
            match key {
                "member" => {
                    return Ok(ParticipantType::Member(MemberParticipant {
                        first_name: text_of(value.get("firstName")),
                        last_name: text_of(value.get("lastName")),
                        profile_url: string_field(value, "profileUrl"),
                        picture: image_field(value, "profilePicture"),
                        headline: value
                            .get("headline")
                            .map(|h| text_of(Some(h)))
                            .filter(|h| !h.is_empty()),
                    }))
                }
                "organization" => {
                    return Ok(ParticipantType::Organization(OrganizationParticipant {
                        name: text_of(value.get("name")),
                        logo: image_field(value, "logo"),
                        page_url: string_field(value, "pageUrl"),
                    }))
                }
                _ => {}
            }
        }
        Ok(ParticipantType::Unknown)
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn image_field(value: &Value, key: &str) -> Option<VectorImage> {
    value
        .get(key)
        .filter(|v| !v.is_null())
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn conversation_json() -> Value {
        json!({
            "entityUrn": "urn:li:msg_conversation:(urn:li:fsd_profile:ME,2-abc)",
            "groupChat": false,
            "read": false,
            "categories": ["INBOX", "PRIMARY_INBOX"],
            "lastActivityAt": 1_700_000_000_000i64,
            "conversationParticipants": [
                {
                    "hostIdentityUrn": "urn:li:fsd_profile:ME",
                    "participantType": { "member": { "firstName": { "text": "Me" }, "lastName": { "text": "Self" } } }
                },
                {
                    "hostIdentityUrn": "urn:li:fsd_profile:ADA",
                    "participantType": {
                        "member": {
                            "firstName": { "text": "Ada" },
                            "lastName": { "text": "Lovelace" },
                            "profileUrl": "https://www.linkedin.com/in/ada",
                            "headline": { "text": "Analyst" }
                        }
                    }
                },
                {
                    "hostIdentityUrn": "urn:li:fsd_company:1",
                    "participantType": { "organization": { "name": { "text": "Engines Ltd" } } }
                },
                { "participantType": { "bot": {} } }
            ]
        })
    }

    #[test]
    fn decodes_participant_unions() {
        let conversation: Conversation = serde_json::from_value(conversation_json()).unwrap();
        let names: Vec<String> = conversation
            .conversation_participants
            .iter()
            .map(MessagingParticipant::display_name)
            .collect();
        assert_eq!(names, vec!["Me Self", "Ada Lovelace", "Engines Ltd", ""]);
        assert_eq!(
            conversation.last_activity_at.map(|t| t.timestamp_millis()),
            Some(1_700_000_000_000)
        );
        assert!(conversation.latest_messages().is_empty());
    }

    #[test]
    fn membership_and_spam_checks() {
        let mut conversation: Conversation = serde_json::from_value(conversation_json()).unwrap();
        let me = Urn::fsd_profile("ME");
        assert!(conversation.has_participant(&me));
        assert!(!conversation.has_participant(&Urn::fsd_profile("STRANGER")));
        assert_eq!(conversation.other_participants(&me).count(), 3);
        assert!(!conversation.is_spam());
        conversation.categories.push(SPAM_CATEGORY.into());
        assert!(conversation.is_spam());
    }
}
