//! LinkedIn Messaging API client.
//!
//! One `Client` per login. All calls go through the shared [`Requester`], so
//! they carry the session cookies and page headers and refresh the jar from
//! responses.

pub mod conversations;
pub mod endpoints;
pub mod graphql;
pub mod media;
pub mod messages;
pub mod profile;
pub mod push;
pub mod search;

pub use conversations::ConversationPager;
pub use media::{Download, MediaUploadType};
pub use search::SearchHit;

use crate::config::LinkedInConfig;
use crate::error::{LinkedInError, Result};
use crate::http::{AuthedRequest, Requester};
use crate::meta::PageMeta;
use crate::session::LoginSession;
use crate::urn::Urn;
use reqwest::Method;
use std::sync::Arc;

#[derive(Clone)]
pub struct Client {
    requester: Requester,
}

impl Client {
    pub fn new(session: Arc<LoginSession>, config: LinkedInConfig) -> Result<Self> {
        Ok(Self {
            requester: Requester::new(session, config)?,
        })
    }

    pub fn session(&self) -> &Arc<LoginSession> {
        self.requester.session()
    }

    pub fn config(&self) -> &LinkedInConfig {
        self.requester.config()
    }

    pub fn request(&self, method: Method, path_or_url: &str) -> AuthedRequest<'_> {
        self.requester.request(method, path_or_url)
    }

    pub async fn page_meta(&self) -> Result<&PageMeta> {
        self.requester.page_meta().await
    }

    /// The signed-in user's fsd-profile URN, fetching the profile when the
    /// session does not know it yet.
    pub async fn mailbox_urn(&self) -> Result<Urn> {
        if let Some(urn) = self.session().fsd_profile_urn() {
            return Ok(urn);
        }
        let profile = self.get_current_user_profile().await?;
        let urn = profile.fsd_profile_urn();
        self.session().set_fsd_profile_urn(urn.clone());
        Ok(urn)
    }
}

/// Require a 2xx status, logging other success codes the caller did not
/// expect.
pub(crate) fn expect_status(
    operation: &'static str,
    status: reqwest::StatusCode,
    expected: u16,
) -> Result<()> {
    if !status.is_success() {
        return Err(LinkedInError::api(status, format!("{operation} failed")));
    }
    if status.as_u16() != expected {
        tracing::warn!(operation, %status, expected, "unexpected success status");
    }
    Ok(())
}
