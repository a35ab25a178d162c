use super::endpoints::{self, entity_path};
use super::graphql::{
    extract_collection, Variables, MESSAGES, MESSAGES_BY_ANCHOR, MESSAGES_BY_ANCHOR_TIMESTAMP,
    MESSAGES_BY_CONVERSATION,
};
use super::{expect_status, Client};
use crate::attributed::AttributedText;
use crate::error::{LinkedInError, Result};
use crate::model::{Message, MessagePage, MessageSentInfo, RenderContent};
use crate::urn::Urn;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateMessageRequest<'a> {
    message: OutgoingMessage<'a>,
    mailbox_urn: &'a Urn,
    tracking_id: String,
    dedupe_by_client_generated_token: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    host_recipient_urns: Option<&'a [Urn]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    conversation_title: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutgoingMessage<'a> {
    body: &'a AttributedText,
    render_content_unions: &'a [RenderContent],
    #[serde(skip_serializing_if = "Option::is_none")]
    conversation_urn: Option<&'a Urn>,
    origin_token: String,
}

#[derive(Deserialize)]
struct CreateMessageResponse {
    value: CreatedMessage,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedMessage {
    #[serde(default)]
    entity_urn: Option<Urn>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    delivered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    conversation_urn: Option<Urn>,
}

#[derive(Deserialize)]
struct BatchPatchResponse {
    #[serde(default)]
    results: HashMap<String, BatchPatchResult>,
}

#[derive(Deserialize)]
struct BatchPatchResult {
    status: u16,
}

fn tracking_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

impl Client {
    /// Up to `count` messages delivered before `before`, newest first.
    pub async fn get_messages_before(
        &self,
        conversation: &Urn,
        before: DateTime<Utc>,
        count: usize,
    ) -> Result<MessagePage> {
        let variables = Variables::new()
            .with("deliveredAt", before.timestamp_millis())
            .with("conversationUrn", conversation)
            .with("countBefore", count)
            .with("countAfter", 0usize);
        let response: Value = self
            .request(Method::GET, endpoints::GRAPHQL)
            .with_csrf()
            .with_graphql_query(MESSAGES_BY_ANCHOR, &variables.encode())
            .send_json()
            .await?;
        let collection = extract_collection::<Message>(response, MESSAGES_BY_ANCHOR_TIMESTAMP)?;
        let mut messages = collection.elements;
        messages.retain(|m| m.delivered_at < before);
        messages.sort_by(|a, b| b.delivered_at.cmp(&a.delivered_at));
        messages.truncate(count);
        Ok(MessagePage {
            messages,
            prev_cursor: collection.metadata.prev_cursor,
        })
    }

    /// The page before `prev_cursor`. An empty page means the start of the
    /// conversation was reached.
    pub async fn get_messages_with_prev_cursor(
        &self,
        conversation: &Urn,
        prev_cursor: &str,
        count: usize,
    ) -> Result<MessagePage> {
        let variables = Variables::new()
            .with("conversationUrn", conversation)
            .with("count", count)
            .with("prevCursor", prev_cursor);
        let response: Value = self
            .request(Method::GET, endpoints::GRAPHQL)
            .with_csrf()
            .with_graphql_query(MESSAGES.select(true, false), &variables.encode())
            .send_json()
            .await?;
        let collection = extract_collection::<Message>(response, MESSAGES_BY_CONVERSATION)?;
        let mut messages = collection.elements;
        messages.sort_by(|a, b| b.delivered_at.cmp(&a.delivered_at));
        Ok(MessagePage {
            messages,
            prev_cursor: collection.metadata.prev_cursor,
        })
    }

    pub async fn send_message(
        &self,
        conversation: &Urn,
        body: &AttributedText,
        render_content: &[RenderContent],
    ) -> Result<MessageSentInfo> {
        let mailbox = self.mailbox_urn().await?;
        let request = CreateMessageRequest {
            message: OutgoingMessage {
                body,
                render_content_unions: render_content,
                conversation_urn: Some(conversation),
                origin_token: Uuid::new_v4().to_string(),
            },
            mailbox_urn: &mailbox,
            tracking_id: tracking_id(),
            dedupe_by_client_generated_token: true,
            host_recipient_urns: None,
            conversation_title: None,
        };
        let created = self.create_message(&request).await?;

        let message_urn = created
            .entity_urn
            .ok_or_else(|| LinkedInError::other("createMessage response has no entityUrn"))?;
        debug!(%conversation, %message_urn, "sent message");
        Ok(MessageSentInfo {
            message_urn,
            delivered_at: created.delivered_at.unwrap_or_else(Utc::now),
        })
    }

    /// Start a conversation with `participants`, returning its URN.
    pub async fn new_chat(&self, title: &str, participants: &[Urn]) -> Result<Urn> {
        let mailbox = self.mailbox_urn().await?;
        let body = AttributedText::default();
        let request = CreateMessageRequest {
            message: OutgoingMessage {
                body: &body,
                render_content_unions: &[],
                conversation_urn: None,
                origin_token: Uuid::new_v4().to_string(),
            },
            mailbox_urn: &mailbox,
            tracking_id: tracking_id(),
            dedupe_by_client_generated_token: true,
            host_recipient_urns: Some(participants),
            conversation_title: Some(title),
        };
        let created = self.create_message(&request).await?;
        created
            .conversation_urn
            .ok_or_else(|| LinkedInError::other("createMessage response has no conversationUrn"))
    }

    async fn create_message(&self, request: &CreateMessageRequest<'_>) -> Result<CreatedMessage> {
        let response: CreateMessageResponse = self
            .request(Method::POST, endpoints::MESSENGER_MESSAGES)
            .with_query_param("action", endpoints::ACTION_CREATE_MESSAGE)
            .with_csrf()
            .with_json_body(request)?
            .send_json()
            .await?;
        Ok(response.value)
    }

    pub async fn edit_message(&self, message: &Urn, body: &AttributedText) -> Result<()> {
        let patch = json!({ "patch": { "$set": { "body": body } } });
        let response = self
            .request(
                Method::POST,
                &entity_path(endpoints::MESSENGER_MESSAGES, message.as_str()),
            )
            .with_csrf()
            .with_json_body(&patch)?
            .send()
            .await?;
        expect_status("edit_message", response.status(), 204)
    }

    /// Unsend a message for every participant.
    pub async fn recall_message(&self, message: &Urn) -> Result<()> {
        let response = self
            .request(
                Method::DELETE,
                &entity_path(endpoints::MESSENGER_MESSAGES, message.as_str()),
            )
            .with_csrf()
            .send()
            .await?;
        expect_status("recall_message", response.status(), 204)
    }

    pub async fn send_reaction(&self, message: &Urn, emoji: &str) -> Result<()> {
        self.react(endpoints::ACTION_REACT, message, emoji).await
    }

    pub async fn remove_reaction(&self, message: &Urn, emoji: &str) -> Result<()> {
        self.react(endpoints::ACTION_UNREACT, message, emoji).await
    }

    async fn react(&self, action: &'static str, message: &Urn, emoji: &str) -> Result<()> {
        let response = self
            .request(Method::POST, endpoints::MESSENGER_MESSAGES)
            .with_query_param("action", action)
            .with_csrf()
            .with_json_body(&json!({ "messageUrn": message, "emoji": emoji }))?
            .send()
            .await?;
        expect_status(action, response.status(), 204)
    }

    pub async fn mark_conversations_read(&self, conversations: &[Urn]) -> Result<HashMap<Urn, u16>> {
        self.set_conversations_read(conversations, true).await
    }

    /// Batch-patch the `read` flag. Returns the per-conversation status the
    /// server reported.
    pub async fn set_conversations_read(
        &self,
        conversations: &[Urn],
        read: bool,
    ) -> Result<HashMap<Urn, u16>> {
        if conversations.is_empty() {
            return Ok(HashMap::new());
        }

        let ids = conversations
            .iter()
            .map(|urn| urlencoding::encode(urn.as_str()).into_owned())
            .collect::<Vec<_>>()
            .join(",");
        let mut entities = Map::new();
        for urn in conversations {
            entities.insert(
                urn.to_string(),
                json!({ "patch": { "$set": { "read": read } } }),
            );
        }

        let response: BatchPatchResponse = self
            .request(Method::POST, endpoints::MESSENGER_CONVERSATIONS)
            .with_raw_query(format!("ids=List({ids})"))
            .with_csrf()
            .with_json_body(&json!({ "entities": entities }))?
            .send_json()
            .await?;

        response
            .results
            .into_iter()
            .map(|(urn, result)| Ok((Urn::parse(&urn)?, result.status)))
            .collect()
    }

    pub async fn start_typing(&self, conversation: &Urn) -> Result<()> {
        let response = self
            .request(Method::POST, endpoints::MESSENGER_CONVERSATIONS)
            .with_query_param("action", endpoints::ACTION_TYPING)
            .with_csrf()
            .with_json_body(&json!({ "conversationUrn": conversation }))?
            .send()
            .await?;
        expect_status("start_typing", response.status(), 202)
    }
}
