//! Cookie-based login.

use crate::client::Client;
use crate::config::BridgeConfig;
use crate::cookies::{CookieJar, JSESSIONID, LI_AT};
use crate::error::{LinkedInError, Result};
use crate::model::UserProfile;
use crate::session::{LoginSession, UserLoginMetadata};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// The member id from the mini profile's object URN.
    pub login_id: String,
    pub metadata: UserLoginMetadata,
    pub profile: UserProfile,
}

impl LoginOutcome {
    pub fn remote_name(&self) -> String {
        self.profile.display_name()
    }
}

/// Validate a browser cookie header by fetching the signed-in profile.
pub async fn login_with_cookies(config: &BridgeConfig, cookie_header: &str) -> Result<LoginOutcome> {
    let cookies = CookieJar::parse_header(cookie_header)?;
    if !cookies.contains(JSESSIONID) {
        return Err(LinkedInError::MissingCookie(JSESSIONID));
    }
    if !cookies.contains(LI_AT) {
        warn!("cookie header has no li_at; the login will likely be rejected");
    }

    let session = Arc::new(LoginSession::new(cookies));
    let client = Client::new(session.clone(), config.linkedin.clone())?;
    let profile = client.get_current_user_profile().await?;
    let login_id = profile.login_id()?.to_string();
    info!(%login_id, name = %profile.display_name(), "logged in with cookies");

    Ok(LoginOutcome {
        login_id,
        metadata: session.metadata(),
        profile,
    })
}
