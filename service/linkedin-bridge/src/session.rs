//! Per-login state shared between the requester, the realtime engine and the
//! bridge adapter.

use crate::cookies::{CookieJar, JSESSIONID};
use crate::meta::PageMeta;
use crate::urn::Urn;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use uuid::Uuid;

/// What the host persists for a user login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLoginMetadata {
    pub cookies: CookieJar,
    #[serde(default)]
    pub fsd_profile_urn: Option<Urn>,
}

#[derive(Debug)]
pub struct LoginSession {
    cookies: RwLock<CookieJar>,
    fsd_profile_urn: RwLock<Option<Urn>>,
    meta: OnceCell<PageMeta>,
    realtime_session_id: Uuid,
}

impl LoginSession {
    pub fn new(cookies: CookieJar) -> Self {
        Self {
            cookies: RwLock::new(cookies),
            fsd_profile_urn: RwLock::new(None),
            meta: OnceCell::new(),
            realtime_session_id: Uuid::new_v4(),
        }
    }

    pub fn from_metadata(metadata: &UserLoginMetadata) -> Self {
        let session = Self::new(metadata.cookies.clone());
        *session.fsd_profile_urn.write() = metadata.fsd_profile_urn.clone();
        session
    }

    pub fn metadata(&self) -> UserLoginMetadata {
        UserLoginMetadata {
            cookies: self.cookies(),
            fsd_profile_urn: self.fsd_profile_urn(),
        }
    }

    pub fn cookies(&self) -> CookieJar {
        self.cookies.read().clone()
    }

    pub fn cookie_header(&self) -> String {
        self.cookies.read().to_header_string()
    }

    /// The CSRF token LinkedIn expects: the unquoted `JSESSIONID` value.
    pub fn csrf_token(&self) -> String {
        self.cookies.read().get(JSESSIONID).to_string()
    }

    pub fn has_cookie(&self, name: &str) -> bool {
        self.cookies.read().contains(name)
    }

    pub fn replace_cookies(&self, jar: CookieJar) {
        *self.cookies.write() = jar;
    }

    pub fn clear_cookies(&self) {
        self.cookies.write().clear();
    }

    /// Returns `true` when the header deleted a cookie.
    pub fn apply_set_cookie(&self, header: &str) -> bool {
        self.cookies.write().apply_set_cookie(header)
    }

    pub fn fsd_profile_urn(&self) -> Option<Urn> {
        self.fsd_profile_urn.read().clone()
    }

    pub fn set_fsd_profile_urn(&self, urn: Urn) {
        *self.fsd_profile_urn.write() = Some(urn);
    }

    pub fn realtime_session_id(&self) -> Uuid {
        self.realtime_session_id
    }

    pub(crate) fn meta_cell(&self) -> &OnceCell<PageMeta> {
        &self.meta
    }

    pub fn page_meta(&self) -> Option<&PageMeta> {
        self.meta.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_round_trips_through_json() {
        let metadata = UserLoginMetadata {
            cookies: CookieJar::parse_header("JSESSIONID=\"ajax:1\"; li_at=xyz").unwrap(),
            fsd_profile_urn: Some(Urn::fsd_profile("ACoAAB")),
        };
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["cookies"], "JSESSIONID=\"ajax:1\"; li_at=xyz");
        assert_eq!(json["fsd_profile_urn"], "urn:li:fsd_profile:ACoAAB");

        let session = LoginSession::from_metadata(&serde_json::from_value(json).unwrap());
        assert_eq!(session.metadata(), metadata);
        assert_eq!(session.csrf_token(), "ajax:1");
    }

    #[test]
    fn fsd_profile_is_optional() {
        let metadata: UserLoginMetadata =
            serde_json::from_str(r#"{"cookies":"li_at=xyz"}"#).unwrap();
        assert_eq!(metadata.fsd_profile_urn, None);
    }

    #[test]
    fn clearing_cookies_empties_csrf() {
        let session = LoginSession::new(CookieJar::parse_header("JSESSIONID=abc").unwrap());
        session.clear_cookies();
        assert_eq!(session.csrf_token(), "");
        assert_eq!(session.cookie_header(), "");
    }
}
