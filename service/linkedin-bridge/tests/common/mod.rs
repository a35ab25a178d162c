#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use futures::StreamExt;
use linkedin_bridge::{
    BridgeConfig, BridgeState, HostBridge, RemoteEvent, StoredMessage, Urn, UserLoginMetadata,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const COOKIES: &str = "JSESSIONID=\"ajax:123\"; li_at=AQEDAT";
pub const OWN: &str = "urn:li:fsd_profile:ME";
pub const OTHER: &str = "urn:li:fsd_profile:ADA";
pub const CONVERSATION: &str = "urn:li:msg_conversation:(urn:li:fsd_profile:ME,2-abc)";
pub const SPAM_CONVERSATION: &str = "urn:li:msg_conversation:(urn:li:fsd_profile:ME,2-spam)";
pub const SENT_MESSAGE: &str = "urn:li:msg_message:(urn:li:fsd_profile:ME,2-NEW)";
pub const NEW_CHAT: &str = "urn:li:msg_conversation:(urn:li:fsd_profile:ME,2-NEWCHAT)";

const MESSAGING_PAGE: &str = r#"<!DOCTYPE html><html><head>
<meta name="clientPageInstanceId" content="11111111-2222-3333-4444-555555555555">
<meta name="serviceVersion" content="1.13.9000">
<meta name="i18nLocale" content="en_US">
</head><body></body></html>"#;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: String,
    pub body: String,
    pub raw_body: Vec<u8>,
    pub csrf: Option<String>,
    pub cookie: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Default)]
pub struct MockState {
    pub requests: Mutex<Vec<Recorded>>,
    /// Conversation read flags as patched by clients.
    pub read: Mutex<HashMap<String, bool>>,
    /// Lines served on the first realtime connection.
    pub sse_lines: Mutex<Vec<String>>,
    pub realtime_connections: AtomicUsize,
    /// Answer every API call with a logged-out 401.
    pub reject_session: AtomicBool,
    /// Refresh `li_at` on the profile response.
    pub refresh_cookie: AtomicBool,
    /// Element arrays served, in order, to updated-before conversation
    /// queries. The default inbox is served once they run out.
    pub conversation_pages: Mutex<VecDeque<Value>>,
    /// Upload slot handed out by the upload preflight. Defaults to a path on
    /// this server.
    pub upload_url: Mutex<Option<String>>,
    pub base_url: Mutex<String>,
}

impl MockState {
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    pub fn realtime_connections(&self) -> usize {
        self.realtime_connections.load(Ordering::SeqCst)
    }
}

pub struct MockLinkedIn {
    pub base_url: String,
    pub state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockLinkedIn {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new().fallback(handle).with_state(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        *state.base_url.lock() = format!("http://{addr}");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            base_url: format!("http://{addr}"),
            state,
            handle,
        }
    }

    pub fn config(&self) -> BridgeConfig {
        let mut config = BridgeConfig::default();
        config.linkedin.base_url = self.base_url.clone();
        config.sync.on_connect = false;
        config
    }

    pub fn push_sse(&self, data: Value) {
        self.push_sse_line(format!("data: {data}"));
    }

    /// Queue a raw event-stream line exactly as given.
    pub fn push_sse_line(&self, line: impl Into<String>) {
        self.state.sse_lines.lock().push(line.into());
    }
}

impl Drop for MockLinkedIn {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn urn(raw: &str) -> Urn {
    Urn::parse(raw).unwrap()
}

pub fn decorated(topic: &str, data: Value) -> Value {
    json!({
        "com.linkedin.realtimefrontend.DecoratedEvent": {
            "id": format!("evt-{topic}"),
            "topic": format!("urn:li-realtime:{topic}:urn:li-realtime:myself"),
            "leftServerAt": 1_700_000_000_000i64,
            "payload": { "data": data }
        }
    })
}

pub fn message_json(id: &str, sender: &str, format: &str) -> Value {
    json!({
        "entityUrn": format!("urn:li:msg_message:(urn:li:fsd_profile:ME,{id})"),
        "deliveredAt": 1_700_000_000_000i64,
        "body": { "text": format!("text of {id}") },
        "sender": {
            "hostIdentityUrn": sender,
            "participantType": { "member": { "firstName": { "text": "Ada" } } }
        },
        "messageBodyRenderFormat": format,
        "conversation": { "entityUrn": CONVERSATION }
    })
}

/// A primary-inbox conversation between the signed-in user and Ada.
pub fn inbox_conversation(id: &str, last_activity_at: i64) -> Value {
    json!({
        "entityUrn": format!("urn:li:msg_conversation:(urn:li:fsd_profile:ME,{id})"),
        "groupChat": false,
        "read": true,
        "lastActivityAt": last_activity_at,
        "categories": ["INBOX", "PRIMARY_INBOX"],
        "conversationParticipants": [
            { "hostIdentityUrn": OWN },
            { "hostIdentityUrn": OTHER }
        ]
    })
}

fn conversations_json() -> Value {
    let participant = |urn: &str, name: &str| {
        json!({
            "hostIdentityUrn": urn,
            "participantType": { "member": { "firstName": { "text": name } } }
        })
    };
    json!([
        {
            "entityUrn": CONVERSATION,
            "groupChat": false,
            "read": true,
            "lastActivityAt": 1_700_000_000_000i64,
            "categories": ["INBOX", "PRIMARY_INBOX"],
            "conversationParticipants": [participant(OWN, "Me"), participant(OTHER, "Ada")]
        },
        {
            "entityUrn": SPAM_CONVERSATION,
            "groupChat": false,
            "read": false,
            "lastActivityAt": 1_699_000_000_000i64,
            "categories": ["SPAM"],
            "conversationParticipants": [participant(OWN, "Me"), participant(OTHER, "Ada")]
        }
    ])
}

fn profile_json() -> Value {
    json!({
        "plainId": 123,
        "miniProfile": {
            "firstName": "Grace",
            "lastName": "Hopper",
            "publicIdentifier": "grace",
            "objectUrn": "urn:li:member:123",
            "entityUrn": "urn:li:fs_miniProfile:ME"
        }
    })
}

fn json_response(status: StatusCode, body: Value) -> Response {
    (status, [("content-type", "application/json")], body.to_string()).into_response()
}

const MESSAGES_PATH: &str = "/voyager/api/voyagerMessagingDashMessengerMessages";
const CONVERSATIONS_PATH: &str = "/voyager/api/voyagerMessagingDashMessengerConversations";
const MEDIA_PATH: &str = "/voyager/api/voyagerVideoDashMediaUploadMetadata";
const PUSH_PATH: &str = "/voyager/api/voyagerNotificationsDashPushRegistration";
pub const UPLOADED_ASSET: &str = "urn:li:digitalmediaAsset:UP1";

async fn handle(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    raw_body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let query = uri.query().unwrap_or_default().to_string();
    let body = String::from_utf8_lossy(&raw_body).into_owned();
    state.requests.lock().push(Recorded {
        method: method.clone(),
        path: path.clone(),
        query: query.clone(),
        body: body.clone(),
        raw_body: raw_body.to_vec(),
        csrf: header(&headers, "csrf-token"),
        cookie: header(&headers, "cookie"),
        content_type: header(&headers, "content-type"),
    });

    if path == "/messaging/" {
        return (
            StatusCode::OK,
            [("content-type", "text/html")],
            MESSAGING_PAGE,
        )
            .into_response();
    }
    if state.reject_session.load(Ordering::SeqCst) {
        return (StatusCode::UNAUTHORIZED, "CSRF check failed").into_response();
    }

    match (method.as_str(), path.as_str()) {
        ("GET", "/voyager/api/me") => {
            let mut response = json_response(StatusCode::OK, profile_json());
            if state.refresh_cookie.load(Ordering::SeqCst) {
                response.headers_mut().append(
                    "set-cookie",
                    "li_at=AQEREFRESHED; Path=/; Domain=.linkedin.com".parse().unwrap(),
                );
            }
            response
        }
        ("GET", "/uas/logout") => StatusCode::OK.into_response(),
        ("GET", "/voyager/api/voyagerMessagingGraphQL/graphql") => graphql(&state, &query),
        ("GET", "/realtime/connect") => realtime(&state),
        ("POST", MESSAGES_PATH) => messages_action(&query),
        ("POST", CONVERSATIONS_PATH) if query.starts_with("ids=") => batch_read(&state, &body),
        ("POST", CONVERSATIONS_PATH) if query.contains("action=typing") => {
            StatusCode::ACCEPTED.into_response()
        }
        ("POST", p) | ("DELETE", p) if p.starts_with(MESSAGES_PATH) => {
            StatusCode::NO_CONTENT.into_response()
        }
        ("POST", MEDIA_PATH) => media_action(&state, &query),
        ("PUT", p) if p.starts_with("/dms-uploads/") => StatusCode::CREATED.into_response(),
        ("GET", p) if p.starts_with("/media/") => {
            (StatusCode::OK, [("content-type", "image/png")], "meow").into_response()
        }
        ("POST", PUSH_PATH) => StatusCode::OK.into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn graphql(state: &MockState, query: &str) -> Response {
    if query.contains("queryId=messengerConversations") {
        let elements = if query.contains("lastUpdatedBefore") {
            state.conversation_pages.lock().pop_front()
        } else {
            None
        };
        let collection = json!({
            "elements": elements.unwrap_or_else(conversations_json),
            "metadata": { "newSyncToken": "sync-1" }
        });
        return json_response(
            StatusCode::OK,
            json!({ "data": {
                "messengerConversationsBySyncToken": collection.clone(),
                "messengerConversationsByCategoryQuery": collection
            } }),
        );
    }
    if query.contains("queryId=messengerMessages") {
        let collection = json!({
            "elements": [
                message_json("2-m1", OTHER, "DEFAULT"),
            ],
            "metadata": { "prevCursor": "cursor-1" }
        });
        return json_response(
            StatusCode::OK,
            json!({ "data": {
                "messengerMessagesByAnchorTimestamp": collection.clone(),
                "messengerMessagesByConversation": collection
            } }),
        );
    }
    StatusCode::NOT_FOUND.into_response()
}

fn messages_action(query: &str) -> Response {
    if query.contains("action=createMessage") {
        return json_response(
            StatusCode::OK,
            json!({ "value": {
                "entityUrn": SENT_MESSAGE,
                "deliveredAt": 1_700_000_123_000i64,
                "conversationUrn": NEW_CHAT
            } }),
        );
    }
    StatusCode::NO_CONTENT.into_response()
}

fn media_action(state: &MockState, query: &str) -> Response {
    if query.contains("action=upload") {
        let url = state
            .upload_url
            .lock()
            .clone()
            .unwrap_or_else(|| format!("{}/dms-uploads/UP1", state.base_url.lock()));
        return json_response(
            StatusCode::OK,
            json!({ "value": {
                "urn": UPLOADED_ASSET,
                "singleUploadUrl": url,
                "singleUploadHeaders": { "x-upload-slot": "UP1" }
            } }),
        );
    }
    StatusCode::OK.into_response()
}

fn batch_read(state: &MockState, body: &str) -> Response {
    let request: Value = serde_json::from_str(body).unwrap_or_default();
    let mut results = serde_json::Map::new();
    if let Some(entities) = request.get("entities").and_then(Value::as_object) {
        for (urn, patch) in entities {
            let read = patch["patch"]["$set"]["read"].as_bool().unwrap_or(false);
            state.read.lock().insert(urn.clone(), read);
            results.insert(urn.clone(), json!({ "status": 204 }));
        }
    }
    json_response(StatusCode::OK, json!({ "results": results, "errors": {} }))
}

fn realtime(state: &MockState) -> Response {
    let first = state.realtime_connections.fetch_add(1, Ordering::SeqCst) == 0;
    let mut lines = vec![format!(
        "data: {}",
        json!({ "com.linkedin.realtimefrontend.ClientConnection": { "id": "conn-1" } })
    )];
    if first {
        lines.extend(state.sse_lines.lock().drain(..));
    }
    let chunks = lines
        .into_iter()
        .map(|line| Ok::<_, io::Error>(Bytes::from(format!("{line}\n\n"))));
    let stream = futures::stream::iter(chunks).chain(futures::stream::pending());
    (
        StatusCode::OK,
        [("content-type", "text/event-stream")],
        Body::from_stream(stream),
    )
        .into_response()
}

/// Host double that records everything the bridge reports.
#[derive(Default)]
pub struct RecordingHost {
    pub events: Mutex<Vec<RemoteEvent>>,
    pub states: Mutex<Vec<BridgeState>>,
    pub saved_logins: Mutex<Vec<UserLoginMetadata>>,
    pub stored: Mutex<HashMap<Urn, StoredMessage>>,
    pub dms: Mutex<HashMap<Urn, Urn>>,
}

impl RecordingHost {
    pub fn events(&self) -> Vec<RemoteEvent> {
        self.events.lock().clone()
    }

    pub fn store(&self, message: StoredMessage) {
        self.stored.lock().insert(message.id.clone(), message);
    }

    /// Poll until `done` holds for the recorded events, or give up after a
    /// few seconds.
    pub async fn wait_for(&self, done: impl Fn(&[RemoteEvent]) -> bool) -> Vec<RemoteEvent> {
        for _ in 0..200 {
            let events = self.events();
            if done(&events) {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("timed out waiting for events; got {:#?}", self.events());
    }
}

#[async_trait]
impl HostBridge for RecordingHost {
    async fn queue_remote_event(&self, event: RemoteEvent) {
        self.events.lock().push(event);
    }

    async fn get_message(&self, id: &Urn) -> Option<StoredMessage> {
        self.stored.lock().get(id).cloned()
    }

    async fn find_dm_chat(&self, user: &Urn) -> Option<Urn> {
        self.dms.lock().get(user).cloned()
    }

    async fn update_state(&self, state: BridgeState) {
        self.states.lock().push(state);
    }

    async fn save_login(&self, metadata: &UserLoginMetadata) {
        self.saved_logins.lock().push(metadata.clone());
    }
}
