//! History backfill.

use super::convert::convert_message;
use super::host::ConvertedMessage;
use super::LinkedInBridge;
use crate::error::Result;
use crate::model::{Message, RenderFormat};
use crate::urn::Urn;
use chrono::{DateTime, Utc};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FetchMessagesParams {
    pub conversation: Urn,
    /// Forward fills the gap after `anchor`; backward pages further into
    /// the past.
    pub forward: bool,
    pub anchor: Option<DateTime<Utc>>,
    pub cursor: Option<String>,
    /// Falls back to `backfill.default_count` when zero.
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct FetchMessagesResponse {
    /// Oldest first.
    pub messages: Vec<ConvertedMessage>,
    pub cursor: Option<String>,
    pub has_more: bool,
    pub forward: bool,
}

/// Apply the anchor to a page sorted newest first and return what survives,
/// oldest first.
pub fn select_messages(
    mut page: Vec<Message>,
    forward: bool,
    anchor: Option<DateTime<Utc>>,
) -> Vec<Message> {
    page.sort_by(|a, b| b.delivered_at.cmp(&a.delivered_at));
    let mut selected = match anchor {
        None => page,
        Some(anchor) if forward => page
            .into_iter()
            .take_while(|m| m.delivered_at > anchor)
            .collect(),
        Some(anchor) => page
            .into_iter()
            .filter(|m| m.delivered_at < anchor)
            .collect(),
    };
    selected.reverse();
    selected
}

impl LinkedInBridge {
    pub async fn fetch_messages(&self, params: FetchMessagesParams) -> Result<FetchMessagesResponse> {
        let count = if params.count == 0 {
            self.config.backfill.default_count
        } else {
            params.count
        };
        let page = match &params.cursor {
            Some(cursor) => {
                self.client
                    .get_messages_with_prev_cursor(&params.conversation, cursor, count)
                    .await?
            }
            None => {
                self.client
                    .get_messages_before(&params.conversation, Utc::now(), count)
                    .await?
            }
        };

        let own = self.client.mailbox_urn().await?;
        let messages: Vec<ConvertedMessage> =
            select_messages(page.messages, params.forward, params.anchor)
                .iter()
                .filter(|m| !matches!(m.message_body_render_format, RenderFormat::System))
                .filter_map(|m| convert_message(m, &own, self.converter.as_ref()))
                .collect();
        debug!(
            conversation = %params.conversation,
            forward = params.forward,
            count = messages.len(),
            "backfilled messages"
        );

        Ok(FetchMessagesResponse {
            has_more: !messages.is_empty(),
            messages,
            cursor: page.prev_cursor,
            forward: params.forward,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn message(id: &str, millis: i64) -> Message {
        serde_json::from_value(json!({
            "entityUrn": format!("urn:li:msg_message:(urn:li:fsd_profile:ME,{id})"),
            "deliveredAt": millis,
            "body": { "text": id },
            "sender": { "hostIdentityUrn": "urn:li:fsd_profile:ADA" }
        }))
        .unwrap()
    }

    fn ids(messages: &[Message]) -> Vec<String> {
        messages.iter().map(|m| m.body.text.clone()).collect()
    }

    fn page() -> Vec<Message> {
        vec![
            message("m4", 4_000),
            message("m3", 3_000),
            message("m2", 2_000),
            message("m1", 1_000),
        ]
    }

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    #[test]
    fn without_anchor_everything_oldest_first() {
        assert_eq!(ids(&select_messages(page(), false, None)), ["m1", "m2", "m3", "m4"]);
    }

    #[test]
    fn forward_stops_at_anchor() {
        assert_eq!(ids(&select_messages(page(), true, Some(at(2_000)))), ["m3", "m4"]);
    }

    #[test]
    fn unsorted_pages_are_ordered_first() {
        let mut messages = page();
        messages.push(message("m5", 5_000));
        let selected = select_messages(messages, true, Some(at(3_000)));
        assert_eq!(ids(&selected), ["m4", "m5"]);
    }

    #[test]
    fn backward_skips_messages_at_or_after_anchor() {
        assert_eq!(ids(&select_messages(page(), false, Some(at(3_000)))), ["m1", "m2"]);
    }

    #[test]
    fn nothing_surfaces_past_the_edges() {
        assert!(select_messages(page(), true, Some(at(4_000))).is_empty());
        assert!(select_messages(page(), false, Some(at(1_000))).is_empty());
        assert!(select_messages(Vec::new(), false, None).is_empty());
    }
}
