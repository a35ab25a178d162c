//! Paths and content types of the LinkedIn web API, relative to the base URL.

pub const ME: &str = "/voyager/api/me";
pub const LOGOUT: &str = "/uas/logout";

pub const GRAPHQL: &str = "/voyager/api/voyagerMessagingGraphQL/graphql";
pub const MESSENGER_MESSAGES: &str = "/voyager/api/voyagerMessagingDashMessengerMessages";
pub const MESSENGER_CONVERSATIONS: &str =
    "/voyager/api/voyagerMessagingDashMessengerConversations";
pub const MEDIA_UPLOAD_METADATA: &str = "/voyager/api/voyagerVideoDashMediaUploadMetadata";
pub const TYPEAHEAD_HITS: &str = "/voyager/api/voyagerMessagingTypeaheadHits";
pub const PUSH_REGISTRATION: &str = "/voyager/api/voyagerNotificationsDashPushRegistration";

pub const REALTIME_CONNECT: &str = "/realtime/connect";

pub const ACTION_CREATE_MESSAGE: &str = "createMessage";
pub const ACTION_REACT: &str = "reactWithEmoji";
pub const ACTION_UNREACT: &str = "unreactWithEmoji";
pub const ACTION_TYPING: &str = "typing";
pub const ACTION_UPLOAD: &str = "upload";
pub const ACTION_CONFIRM_UPLOAD: &str = "confirmUpload";
pub const ACTION_REGISTER: &str = "register";

/// Symbol table revision the push registration body is encoded against.
pub const PUSH_SYMBOL_TABLE: &str = "voyager-20404";

pub fn push_content_type() -> String {
    format!(
        "application/vnd.linkedin.deduped+x-protobuf; symbol-table={PUSH_SYMBOL_TABLE}; charset=UTF-8"
    )
}

/// `<collection>/<escaped urn>` for entity-addressed REST calls.
pub fn entity_path(collection: &str, urn: &str) -> String {
    format!("{collection}/{}", urlencoding::encode(urn))
}
