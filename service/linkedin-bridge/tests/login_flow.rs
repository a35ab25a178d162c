mod common;

use common::{MockLinkedIn, COOKIES, OWN};
use linkedin_bridge::cookies::{JSESSIONID, LI_AT};
use linkedin_bridge::{login_with_cookies, LinkedInError};
use pretty_assertions::assert_eq;
use std::sync::atomic::Ordering;

#[tokio::test]
async fn cookie_login_fetches_profile() {
    let mock = MockLinkedIn::start().await;

    let outcome = login_with_cookies(&mock.config(), COOKIES).await.unwrap();

    assert_eq!(outcome.login_id, "123");
    assert_eq!(outcome.remote_name(), "Grace Hopper");
    assert_eq!(
        outcome.metadata.fsd_profile_urn.as_ref().map(|u| u.as_str()),
        Some(OWN)
    );
    assert_eq!(outcome.metadata.cookies.get(LI_AT), "AQEDAT");

    let requests = mock.state.requests();
    let paths: Vec<&str> = requests.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, ["/messaging/", "/voyager/api/me"]);
    assert_eq!(requests[1].csrf.as_deref(), Some("ajax:123"));
}

#[tokio::test]
async fn login_requires_jsessionid() {
    let mock = MockLinkedIn::start().await;

    let err = login_with_cookies(&mock.config(), "li_at=AQEDAT")
        .await
        .unwrap_err();

    assert!(matches!(err, LinkedInError::MissingCookie(name) if name == JSESSIONID));
    assert!(mock.state.requests().is_empty());
}

#[tokio::test]
async fn malformed_cookie_header_is_rejected() {
    let mock = MockLinkedIn::start().await;

    let err = login_with_cookies(&mock.config(), "JSESSIONID").await.unwrap_err();

    assert!(matches!(err, LinkedInError::InvalidCookie(_)));
}

#[tokio::test]
async fn rejected_session_is_reported_as_invalidated() {
    let mock = MockLinkedIn::start().await;
    mock.state.reject_session.store(true, Ordering::SeqCst);

    let err = login_with_cookies(&mock.config(), COOKIES).await.unwrap_err();

    assert!(matches!(err, LinkedInError::TokenInvalidated { .. }));
}

#[tokio::test]
async fn refreshed_cookies_end_up_in_metadata() {
    let mock = MockLinkedIn::start().await;
    mock.state.refresh_cookie.store(true, Ordering::SeqCst);

    let outcome = login_with_cookies(&mock.config(), COOKIES).await.unwrap();

    assert_eq!(outcome.metadata.cookies.get(LI_AT), "AQEREFRESHED");
    assert_eq!(outcome.metadata.cookies.get(JSESSIONID), "ajax:123");
}
