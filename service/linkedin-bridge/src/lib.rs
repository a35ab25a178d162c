//! LinkedIn Messaging Bridge Library
//!
//! Speaks LinkedIn's web messaging protocol on behalf of one signed-in user
//! and exposes it to a chat bridge host.
//!
//! ## Key Components
//!
//! - **Client**: authenticated HTTP calls against the Voyager REST and
//!   GraphQL messaging endpoints (conversations, messages, reactions, media)
//! - **RealtimeEngine**: the server-sent-event subscription with heartbeat
//!   supervision, reconnect backoff and session invalidation
//! - **LinkedInBridge**: the adapter a host drives; turns realtime events
//!   into [`RemoteEvent`]s and host actions into API calls
//! - **Attributed text**: conversion between LinkedIn's offset-annotated
//!   bodies and HTML
//!
//! ## Usage
//!
//! ```rust,ignore
//! use linkedin_bridge::{login_with_cookies, BridgeConfig, LinkedInBridge};
//!
//! # async fn example(host: std::sync::Arc<dyn linkedin_bridge::HostBridge>) -> anyhow::Result<()> {
//! let config = BridgeConfig::default();
//! let login = login_with_cookies(&config, "JSESSIONID=\"ajax:1\"; li_at=AQE").await?;
//! let bridge = LinkedInBridge::new(config, &login.metadata, host)?;
//! bridge.connect().await?;
//! # Ok(())
//! # }
//! ```

pub mod attributed;
pub mod bridge;
pub mod client;
pub mod config;
pub mod cookies;
pub mod error;
pub mod http;
pub mod logging;
pub mod meta;
pub mod model;
pub mod realtime;
pub mod session;
pub mod urn;

pub use attributed::{
    parse_html, render_html, Attribute, AttributeKind, AttributedText, DefaultHtmlConverter,
    HtmlConverter,
};
pub use bridge::{
    login_with_cookies, BridgeState, ChatInfo, ChatMember, ConvertedMessage, EventSender,
    FetchMessagesParams, FetchMessagesResponse, HostBridge, LinkedInBridge, LoginOutcome,
    MatrixMessage, MediaUpload, RemoteEvent, ResolvedIdentifier, SendResponse, StoredMessage,
};
pub use client::{Client, ConversationPager, MediaUploadType, SearchHit};
pub use config::{BackfillConfig, BridgeConfig, LinkedInConfig, RealtimeConfig, SyncConfig, TrackProfile};
pub use cookies::CookieJar;
pub use error::{LinkedInError, Result};
pub use logging::init_tracing;
pub use realtime::{ConnectionState, RealtimeEngine, RealtimeHandler};
pub use session::{LoginSession, UserLoginMetadata};
pub use urn::Urn;
