//! GraphQL plumbing: persisted query ids and the Rest.li variable syntax.

use crate::error::{LinkedInError, Result};
use crate::model::Collection;
use crate::urn::Urn;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Persisted query ids for one operation, by which resume point the call
/// carries.
#[derive(Debug, Clone, Copy)]
pub struct QueryIds {
    pub plain: &'static str,
    pub with_cursor: &'static str,
    pub with_sync_token: &'static str,
}

impl QueryIds {
    pub fn select(&self, cursor: bool, sync_token: bool) -> &'static str {
        if sync_token {
            self.with_sync_token
        } else if cursor {
            self.with_cursor
        } else {
            self.plain
        }
    }
}

pub const CONVERSATIONS: QueryIds = QueryIds {
    plain: "messengerConversations.0d5e6781bbee71c3e51c8843c6519f48",
    with_cursor: "messengerConversations.8656fb361a8ad0c178e8d3ff1a84ce26",
    with_sync_token: "messengerConversations.277103fa0741e804ec5f21e6f64cb598",
};

pub const MESSAGES: QueryIds = QueryIds {
    plain: "messengerMessages.d1b494ac18c24c8be71ea07b5bd1f831",
    with_cursor: "messengerMessages.d1b494ac18c24c8be71ea07b5bd1f831",
    with_sync_token: "messengerMessages.5846eeb71c981f11e0134cb6626cc314",
};

pub const MESSAGES_BY_ANCHOR: &str = "messengerMessages.4088d03bc70c91c3fa68965cb42336de";

pub const CONVERSATIONS_BY_SYNC_TOKEN: &str = "messengerConversationsBySyncToken";
pub const CONVERSATIONS_BY_CATEGORY: &str = "messengerConversationsByCategoryQuery";
pub const MESSAGES_BY_ANCHOR_TIMESTAMP: &str = "messengerMessagesByAnchorTimestamp";
pub const MESSAGES_BY_CONVERSATION: &str = "messengerMessagesByConversation";
pub const MESSAGES_BY_SYNC_TOKEN: &str = "messengerMessagesBySyncToken";

/// A value in the Rest.li variable syntax.
#[derive(Debug, Clone, PartialEq)]
pub enum VarValue {
    Str(String),
    Int(i64),
    Bool(bool),
    List(Vec<VarValue>),
    Record(Variables),
}

impl VarValue {
    fn encode_into(&self, out: &mut String) {
        match self {
            VarValue::Str(value) => out.push_str(&urlencoding::encode(value)),
            VarValue::Int(value) => out.push_str(&value.to_string()),
            VarValue::Bool(value) => out.push_str(if *value { "true" } else { "false" }),
            VarValue::List(items) => {
                out.push_str("List(");
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        out.push(',');
                    }
                    item.encode_into(out);
                }
                out.push(')');
            }
            VarValue::Record(record) => record.encode_into(out),
        }
    }
}

impl From<&str> for VarValue {
    fn from(value: &str) -> Self {
        VarValue::Str(value.to_string())
    }
}

impl From<String> for VarValue {
    fn from(value: String) -> Self {
        VarValue::Str(value)
    }
}

impl From<&Urn> for VarValue {
    fn from(value: &Urn) -> Self {
        VarValue::Str(value.to_string())
    }
}

impl From<i64> for VarValue {
    fn from(value: i64) -> Self {
        VarValue::Int(value)
    }
}

impl From<usize> for VarValue {
    fn from(value: usize) -> Self {
        VarValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<bool> for VarValue {
    fn from(value: bool) -> Self {
        VarValue::Bool(value)
    }
}

impl From<Variables> for VarValue {
    fn from(value: Variables) -> Self {
        VarValue::Record(value)
    }
}

impl<T: Into<VarValue>> From<Vec<T>> for VarValue {
    fn from(items: Vec<T>) -> Self {
        VarValue::List(items.into_iter().map(Into::into).collect())
    }
}

/// Ordered `(key:value,...)` record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variables {
    entries: Vec<(String, VarValue)>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<VarValue>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    pub fn with_opt(self, key: impl Into<String>, value: Option<impl Into<VarValue>>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    pub fn encode(&self) -> String {
        let mut out = String::new();
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut String) {
        out.push('(');
        for (idx, (key, value)) in self.entries.iter().enumerate() {
            if idx > 0 {
                out.push(',');
            }
            out.push_str(key);
            out.push(':');
            value.encode_into(out);
        }
        out.push(')');
    }
}

/// Pull `data.<key>` out of a GraphQL response as a collection.
pub fn extract_collection<T: DeserializeOwned>(response: Value, key: &str) -> Result<Collection<T>> {
    let Value::Object(mut envelope) = response else {
        return Err(LinkedInError::other("GraphQL response is not an object"));
    };
    let data = envelope.remove("data").and_then(|mut data| data.get_mut(key).map(Value::take));
    match data {
        Some(collection) if !collection.is_null() => Ok(serde_json::from_value(collection)?),
        _ => {
            let errors = envelope
                .get("errors")
                .map(Value::to_string)
                .unwrap_or_else(|| "no data".to_string());
            Err(LinkedInError::other(format!(
                "GraphQL response is missing `{key}`: {errors}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encodes_restli_variables() {
        let vars = Variables::new()
            .with("mailboxUrn", &Urn::fsd_profile("ACoAAB"))
            .with("count", 20usize)
            .with(
                "query",
                Variables::new().with("predicateUnions", vec![Variables::new().with(
                    "conversationCategoryPredicate",
                    Variables::new().with("category", "PRIMARY_INBOX"),
                )]),
            )
            .with_opt("syncToken", None::<String>)
            .with("read", true);
        assert_eq!(
            vars.encode(),
            "(mailboxUrn:urn%3Ali%3Afsd_profile%3AACoAAB,count:20,query:(predicateUnions:List((conversationCategoryPredicate:(category:PRIMARY_INBOX)))),read:true)"
        );
    }

    #[test]
    fn escapes_string_values() {
        let vars = Variables::new().with("prevCursor", "a b/c==");
        assert_eq!(vars.encode(), "(prevCursor:a%20b%2Fc%3D%3D)");
    }

    #[test]
    fn selects_query_ids() {
        assert_eq!(CONVERSATIONS.select(false, false), CONVERSATIONS.plain);
        assert_eq!(CONVERSATIONS.select(true, false), CONVERSATIONS.with_cursor);
        assert_eq!(CONVERSATIONS.select(true, true), CONVERSATIONS.with_sync_token);
    }

    #[test]
    fn extracts_named_collection() {
        let response = json!({
            "data": {
                "messengerConversationsBySyncToken": {
                    "elements": [1, 2],
                    "metadata": { "newSyncToken": "tok" }
                }
            }
        });
        let collection: Collection<u32> =
            extract_collection(response, CONVERSATIONS_BY_SYNC_TOKEN).unwrap();
        assert_eq!(collection.elements, vec![1, 2]);
        assert_eq!(collection.metadata.new_sync_token.as_deref(), Some("tok"));
    }

    #[test]
    fn missing_collection_reports_errors() {
        let response = json!({ "data": null, "errors": [{ "message": "boom" }] });
        let err = extract_collection::<u32>(response, MESSAGES_BY_CONVERSATION).unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
