//! Cookie-authenticated requests against the LinkedIn web API.
//!
//! Every request replays the browser session (`Cookie`, `csrf-token`) and the
//! page headers scraped once from the messaging page. Redirects are never
//! followed: a redirect to the login wall is how LinkedIn reports a dead
//! session.

use crate::config::LinkedInConfig;
use crate::cookies::{DELETED_COOKIE_VALUE, LI_AT};
use crate::error::{LinkedInError, Result};
use crate::meta::{parse_page_meta, PageMeta, MESSAGING_PAGE_PATH};
use crate::session::LoginSession;
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE, USER_AGENT};
use reqwest::{redirect, Body, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

pub const ACCEPT_JSON: &str = "application/json";
pub const ACCEPT_GRAPHQL: &str = "application/graphql";
pub const ACCEPT_EVENT_STREAM: &str = "text/event-stream";
pub const ACCEPT_NORMALIZED: &str = "application/vnd.linkedin.normalized+json+2.1";
pub const CONTENT_TYPE_PLAIN_TEXT: &str = "text/plain;charset=UTF-8";

const RESTLI_PROTOCOL_VERSION: &str = "2.0.0";

const RECIPE_MAP: &str = include_str!("../resources/recipe_map.json");
const QUERY_MAP: &str = include_str!("../resources/query_map.json");

/// Response body fragments LinkedIn uses when it rejects a session.
const LOGOUT_MARKERS: &[&str] = &[
    "CSRF check failed",
    "INVALID_SESSION",
    "SESSION_EXPIRED",
    "\"status\":401",
];

/// Redirect targets that mean the cookies no longer authenticate.
const LOGIN_REDIRECT_MARKERS: &[&str] = &["/login", "/authwall", "/uas/login", "/checkpoint"];

/// Shared HTTP plumbing for one login. Cheap to clone.
#[derive(Clone)]
pub struct Requester {
    session: Arc<LoginSession>,
    config: Arc<LinkedInConfig>,
    http: reqwest::Client,
    stream_http: reqwest::Client,
}

impl Requester {
    pub fn new(session: Arc<LoginSession>, config: LinkedInConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .build()?;
        // Long-lived SSE bodies are supervised by the heartbeat watchdog, not
        // by a request timeout.
        let stream_http = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self {
            session,
            config: Arc::new(config),
            http,
            stream_http,
        })
    }

    pub fn session(&self) -> &Arc<LoginSession> {
        &self.session
    }

    pub fn config(&self) -> &LinkedInConfig {
        &self.config
    }

    pub fn url(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            return path_or_url.to_string();
        }
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path_or_url.trim_start_matches('/')
        )
    }

    /// Whether `url` points at the configured LinkedIn origin. Session
    /// cookies and page headers are only ever sent there.
    pub fn is_first_party(&self, url: &str) -> bool {
        let (Ok(target), Ok(base)) = (Url::parse(url), Url::parse(&self.config.base_url)) else {
            return false;
        };
        target.scheme() == base.scheme()
            && target.host_str() == base.host_str()
            && target.port_or_known_default() == base.port_or_known_default()
    }

    pub fn request(&self, method: Method, path_or_url: &str) -> AuthedRequest<'_> {
        AuthedRequest::new(self, method, self.url(path_or_url))
    }

    /// The page meta for this login, scraped on first use.
    pub async fn page_meta(&self) -> Result<&PageMeta> {
        self.session
            .meta_cell()
            .get_or_try_init(|| self.scrape_meta())
            .await
    }

    async fn scrape_meta(&self) -> Result<PageMeta> {
        let url = self.url(MESSAGING_PAGE_PATH);
        debug!(%url, "scraping messaging page meta");
        let response = self
            .http
            .get(&url)
            .header(COOKIE, self.session.cookie_header())
            .header(USER_AGENT, &self.config.user_agent)
            .header(ACCEPT, "text/html")
            .send()
            .await?;
        let logged_out = self.absorb_cookies(response.headers());

        let status = response.status();
        let response = check_status(response, logged_out).await?;
        if status.is_redirection() {
            let location = redirect_location(&response);
            return Err(LinkedInError::api(
                status,
                format!("unexpected redirect to {location}"),
            ));
        }
        let html = response.text().await?;
        let meta = parse_page_meta(&html, &self.config.track);
        debug!(
            page_instance = %meta.client_page_instance_id,
            service_version = %meta.service_version,
            "scraped page meta"
        );
        Ok(meta)
    }

    async fn session_headers(&self, builder: RequestBuilder, csrf: bool) -> Result<RequestBuilder> {
        let meta = self.page_meta().await?;
        let mut builder = builder
            .header(COOKIE, self.session.cookie_header())
            .header("x-restli-protocol-version", RESTLI_PROTOCOL_VERSION)
            .header("x-li-lang", &meta.i18n_locale)
            .header("x-li-track", &meta.x_li_track)
            .header("x-li-page-instance", meta.page_instance());
        if csrf {
            builder = builder.header("csrf-token", self.session.csrf_token());
        }
        Ok(builder)
    }

    /// Fold `Set-Cookie` headers into the jar. Returns `true` when LinkedIn
    /// deleted the `li_at` session cookie.
    fn absorb_cookies(&self, headers: &HeaderMap) -> bool {
        let mut logged_out = false;
        for value in headers.get_all(SET_COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            logged_out |= is_session_deletion(value);
            self.session.apply_set_cookie(value);
        }
        logged_out
    }
}

/// Builder for one authenticated request.
pub struct AuthedRequest<'a> {
    requester: &'a Requester,
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    raw_query: Option<String>,
    body: Option<Body>,
    content_type: Option<String>,
    accept: String,
    csrf: bool,
    realtime: bool,
}

impl<'a> AuthedRequest<'a> {
    fn new(requester: &'a Requester, method: Method, url: String) -> Self {
        Self {
            requester,
            method,
            url,
            headers: Vec::new(),
            query: Vec::new(),
            raw_query: None,
            body: None,
            content_type: None,
            accept: ACCEPT_JSON.to_string(),
            csrf: false,
            realtime: false,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Append an already escaped query string verbatim.
    pub fn with_raw_query(mut self, raw: impl Into<String>) -> Self {
        self.raw_query = Some(raw.into());
        self
    }

    /// Serialize `body` as JSON. The messaging endpoints only accept JSON
    /// bodies labelled `text/plain;charset=UTF-8`, so that is the default.
    pub fn with_json_body<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Some(Body::from(serde_json::to_vec(body)?));
        if self.content_type.is_none() {
            self.content_type = Some(CONTENT_TYPE_PLAIN_TEXT.to_string());
        }
        Ok(self)
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = accept.into();
        self
    }

    pub fn with_csrf(mut self) -> Self {
        self.csrf = true;
        self
    }

    /// Headers for the realtime SSE subscription. Also switches the request
    /// onto the client without a total timeout.
    pub fn with_realtime_headers(mut self) -> Self {
        let session_id = self.requester.session.realtime_session_id().to_string();
        self.realtime = true;
        self.accept = ACCEPT_EVENT_STREAM.to_string();
        self.with_header("x-li-realtime-session", session_id)
            .with_header("x-li-recipe-accept", ACCEPT_NORMALIZED)
            .with_header("x-li-query-accept", ACCEPT_GRAPHQL)
            .with_header("x-li-accept", ACCEPT_NORMALIZED)
            .with_header("x-li-recipe-map", RECIPE_MAP.trim())
            .with_header("x-li-query-map", QUERY_MAP.trim())
    }

    pub fn with_graphql_query(self, query_id: &str, variables: &str) -> Self {
        self.with_accept(ACCEPT_GRAPHQL)
            .with_raw_query(format!("queryId={query_id}&variables={variables}"))
    }

    /// Send the request and map error statuses. Redirects come back as-is.
    ///
    /// Requests to other hosts (media CDNs, upload slots) go out without the
    /// session cookies, the CSRF token or the page headers.
    pub async fn send(self) -> Result<Response> {
        let requester = self.requester;

        let mut url = self.url;
        if let Some(raw) = &self.raw_query {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(raw);
        }

        let client = if self.realtime {
            &requester.stream_http
        } else {
            &requester.http
        };
        let first_party = requester.is_first_party(&url);
        let mut builder = client
            .request(self.method.clone(), &url)
            .header(USER_AGENT, &requester.config.user_agent)
            .header(ACCEPT, self.accept);
        if first_party {
            builder = requester.session_headers(builder, self.csrf).await?;
        } else {
            debug!(%url, "sending request to foreign host without session headers");
        }
        if let Some(content_type) = self.content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        for (name, value) in self.headers {
            builder = builder.header(name, value);
        }
        if !self.query.is_empty() {
            builder = builder.query(&self.query);
        }
        if let Some(body) = self.body {
            builder = builder.body(body);
        }

        debug!(method = %self.method, %url, "sending request");
        let response = builder.send().await?;
        let logged_out = first_party && requester.absorb_cookies(response.headers());
        check_status(response, logged_out).await
    }

    pub async fn send_json<T: DeserializeOwned>(self) -> Result<T> {
        let response = self.send().await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

async fn check_status(response: Response, logged_out: bool) -> Result<Response> {
    let status = response.status();
    if status.is_redirection() {
        let location = redirect_location(&response);
        if logged_out || is_login_redirect(&location) {
            return Err(LinkedInError::token_invalidated(format!(
                "redirected to {location}"
            )));
        }
    }
    if status.as_u16() < 400 {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        if logged_out {
            return Err(LinkedInError::token_invalidated(
                "session cookie was deleted by the server",
            ));
        }
        if let Some(marker) = LOGOUT_MARKERS.iter().find(|m| body.contains(**m)) {
            return Err(LinkedInError::token_invalidated(format!(
                "{status}: {marker}"
            )));
        }
    }
    warn!(%status, body = %truncate(&body, 256), "LinkedIn request failed");
    Err(LinkedInError::api(status, body))
}

fn redirect_location(response: &Response) -> String {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn is_session_deletion(set_cookie: &str) -> bool {
    let first = set_cookie.split(';').next().unwrap_or_default().trim();
    match first.split_once('=') {
        Some((name, value)) => {
            name.trim() == LI_AT && value.trim().trim_matches('"') == DELETED_COOKIE_VALUE
        }
        None => false,
    }
}

fn is_login_redirect(location: &str) -> bool {
    LOGIN_REDIRECT_MARKERS
        .iter()
        .any(|marker| location.contains(marker))
}

fn truncate(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}
