use super::endpoints;
use super::Client;
use crate::error::{LinkedInError, Result};
use crate::model::UserProfile;
use reqwest::Method;
use tracing::{info, warn};

impl Client {
    pub async fn get_current_user_profile(&self) -> Result<UserProfile> {
        let profile: UserProfile = self
            .request(Method::GET, endpoints::ME)
            .with_csrf()
            .send_json()
            .await?;
        self.session().set_fsd_profile_urn(profile.fsd_profile_urn());
        Ok(profile)
    }

    /// Log the session out server-side and forget its cookies.
    ///
    /// The cookies are cleared even when the server call fails.
    pub async fn logout(&self) -> Result<()> {
        let csrf = self.session().csrf_token();
        let result = self
            .request(Method::GET, endpoints::LOGOUT)
            .with_query_param("csrfToken", csrf)
            .with_csrf()
            .send()
            .await;
        self.session().clear_cookies();

        match result {
            Ok(_) | Err(LinkedInError::TokenInvalidated { .. }) => {
                info!("logged out of LinkedIn");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "server-side logout failed; cookies cleared anyway");
                Err(err)
            }
        }
    }
}
