use super::endpoints;
use super::Client;
use crate::error::Result;
use crate::urn::{Urn, FSD_PROFILE_PREFIX};
use reqwest::Method;
use serde_json::Value;

const TYPEAHEAD_TYPES: &str = "List(CONNECTIONS,GROUP_THREADS,PEOPLE)";

/// A person returned by the messaging typeahead.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub profile_urn: Urn,
    pub first_name: String,
    pub last_name: String,
    pub public_identifier: Option<String>,
}

impl SearchHit {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

impl Client {
    /// Profile URNs of people matching `keywords`.
    pub async fn search(&self, keywords: &str) -> Result<Vec<Urn>> {
        Ok(self
            .search_hits(keywords)
            .await?
            .into_iter()
            .map(|hit| hit.profile_urn)
            .collect())
    }

    pub async fn search_hits(&self, keywords: &str) -> Result<Vec<SearchHit>> {
        let query = format!(
            "keyword={}&q=typeaheadKeyword&types={TYPEAHEAD_TYPES}",
            urlencoding::encode(keywords)
        );
        let response: Value = self
            .request(Method::GET, endpoints::TYPEAHEAD_HITS)
            .with_csrf()
            .with_raw_query(query)
            .send_json()
            .await?;
        Ok(parse_typeahead(&response))
    }
}

/// Typeahead hits nest the mini profile under a type-keyed `hitInfo` union.
/// Group threads and hits without a profile are skipped.
fn parse_typeahead(response: &Value) -> Vec<SearchHit> {
    let Some(elements) = response.get("elements").and_then(Value::as_array) else {
        return Vec::new();
    };

    elements
        .iter()
        .filter_map(|element| element.get("hitInfo")?.as_object())
        .flat_map(|union| union.values())
        .filter_map(|hit| {
            let profile = hit.get("miniProfile")?;
            let entity = Urn::parse(profile.get("entityUrn")?.as_str()?).ok()?;
            let field = |name: &str| {
                profile
                    .get(name)
                    .and_then(Value::as_str)
                    .map(str::to_string)
            };
            Some(SearchHit {
                profile_urn: entity.with_prefix(&FSD_PROFILE_PREFIX),
                first_name: field("firstName").unwrap_or_default(),
                last_name: field("lastName").unwrap_or_default(),
                public_identifier: field("publicIdentifier"),
            })
        })
        .collect()
}
