use super::endpoints;
use super::graphql::{
    extract_collection, Variables, CONVERSATIONS, CONVERSATIONS_BY_CATEGORY,
    CONVERSATIONS_BY_SYNC_TOKEN,
};
use super::Client;
use crate::error::Result;
use crate::model::{Conversation, ConversationPage};
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

impl Client {
    /// The most recent conversations, plus a sync token for later deltas.
    pub async fn get_conversations(&self) -> Result<ConversationPage> {
        self.conversations_by_sync_token(None).await
    }

    /// Conversations changed since `sync_token` was issued.
    pub async fn get_conversations_with_sync_token(
        &self,
        sync_token: &str,
    ) -> Result<ConversationPage> {
        self.conversations_by_sync_token(Some(sync_token)).await
    }

    async fn conversations_by_sync_token(
        &self,
        sync_token: Option<&str>,
    ) -> Result<ConversationPage> {
        let mailbox = self.mailbox_urn().await?;
        let variables = Variables::new()
            .with("mailboxUrn", &mailbox)
            .with_opt("syncToken", sync_token);
        let query_id = CONVERSATIONS.select(false, sync_token.is_some());

        let response: Value = self
            .request(Method::GET, endpoints::GRAPHQL)
            .with_csrf()
            .with_graphql_query(query_id, &variables.encode())
            .send_json()
            .await?;
        let collection = extract_collection::<Conversation>(response, CONVERSATIONS_BY_SYNC_TOKEN)?;
        Ok(ConversationPage {
            conversations: collection.elements,
            sync_token: collection.metadata.new_sync_token,
        })
    }

    /// Up to `count` conversations whose last activity is before `before`.
    pub async fn get_conversations_updated_before(
        &self,
        before: DateTime<Utc>,
        count: usize,
    ) -> Result<ConversationPage> {
        let mailbox = self.mailbox_urn().await?;
        let variables = Variables::new()
            .with(
                "query",
                Variables::new().with(
                    "predicateUnions",
                    vec![Variables::new().with(
                        "conversationCategoryPredicate",
                        Variables::new().with("category", "PRIMARY_INBOX"),
                    )],
                ),
            )
            .with("count", count)
            .with("mailboxUrn", &mailbox)
            .with("lastUpdatedBefore", before.timestamp_millis());

        let response: Value = self
            .request(Method::GET, endpoints::GRAPHQL)
            .with_csrf()
            .with_graphql_query(CONVERSATIONS.select(true, false), &variables.encode())
            .send_json()
            .await?;
        let collection = extract_collection::<Conversation>(response, CONVERSATIONS_BY_CATEGORY)?;
        Ok(ConversationPage {
            conversations: collection.elements,
            sync_token: collection.metadata.new_sync_token,
        })
    }

    pub fn conversation_pager(&self, page_size: usize) -> ConversationPager {
        ConversationPager::new(self.clone(), page_size)
    }
}

/// Walks the inbox from newest to oldest, one page at a time.
///
/// Each page is requested with the oldest `lastActivityAt` seen so far. The
/// walk ends on an empty page or when that timestamp stops moving.
pub struct ConversationPager {
    client: Client,
    page_size: usize,
    before: DateTime<Utc>,
    done: bool,
}

impl ConversationPager {
    pub fn new(client: Client, page_size: usize) -> Self {
        Self {
            client,
            page_size,
            before: Utc::now(),
            done: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub async fn next_page(&mut self) -> Result<Option<Vec<Conversation>>> {
        if self.done {
            return Ok(None);
        }

        let page = self
            .client
            .get_conversations_updated_before(self.before, self.page_size)
            .await?;
        if page.conversations.is_empty() {
            self.done = true;
            return Ok(None);
        }

        let oldest = page
            .conversations
            .iter()
            .filter_map(|c| c.last_activity_at)
            .min();
        match oldest {
            Some(oldest) if oldest != self.before => self.before = oldest,
            _ => self.done = true,
        }
        debug!(
            count = page.conversations.len(),
            before = %self.before,
            done = self.done,
            "fetched conversation page"
        );
        Ok(Some(page.conversations))
    }
}
