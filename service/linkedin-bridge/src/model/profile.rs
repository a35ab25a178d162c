use crate::error::Result;
use crate::urn::{Urn, FSD_PROFILE_PREFIX};
use serde::{Deserialize, Serialize};

/// Response of `/voyager/api/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub plain_id: Option<i64>,
    pub mini_profile: MiniProfile,
}

impl UserProfile {
    /// The member id used as the host login id.
    pub fn login_id(&self) -> Result<&str> {
        self.mini_profile.object_urn.id()
    }

    /// `urn:li:fsd_profile:<id>`, the identity used as mailbox and sender.
    pub fn fsd_profile_urn(&self) -> Urn {
        self.mini_profile.entity_urn.with_prefix(&FSD_PROFILE_PREFIX)
    }

    pub fn display_name(&self) -> String {
        self.mini_profile.display_name()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniProfile {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub public_identifier: Option<String>,
    /// `urn:li:member:<numeric id>`.
    pub object_urn: Urn,
    /// `urn:li:fs_miniProfile:<id>`.
    pub entity_urn: Urn,
    #[serde(default)]
    pub picture: Option<ProfilePicture>,
}

impl MiniProfile {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn picture_url(&self) -> Option<String> {
        self.picture
            .as_ref()
            .and_then(|p| p.vector_image.as_ref())
            .and_then(VectorImage::largest_url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfilePicture {
    #[serde(rename = "com.linkedin.common.VectorImage", default)]
    pub vector_image: Option<VectorImage>,
}

/// Image published as a root URL plus size-specific path segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorImage {
    #[serde(default)]
    pub root_url: String,
    #[serde(default)]
    pub artifacts: Vec<ImageArtifact>,
}

impl VectorImage {
    pub fn largest_url(&self) -> Option<String> {
        self.artifacts
            .iter()
            .max_by_key(|a| u64::from(a.width) * u64::from(a.height))
            .map(|a| format!("{}{}", self.root_url, a.file_identifying_url_path_segment))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageArtifact {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    pub file_identifying_url_path_segment: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_me_response() {
        let profile: UserProfile = serde_json::from_value(json!({
            "plainId": 123456,
            "miniProfile": {
                "firstName": "Ada",
                "lastName": "Lovelace",
                "publicIdentifier": "ada",
                "objectUrn": "urn:li:member:123456",
                "entityUrn": "urn:li:fs_miniProfile:ACoAAB",
                "picture": {
                    "com.linkedin.common.VectorImage": {
                        "rootUrl": "https://media.licdn.com/dms/image/",
                        "artifacts": [
                            { "width": 100, "height": 100, "fileIdentifyingUrlPathSegment": "small" },
                            { "width": 400, "height": 400, "fileIdentifyingUrlPathSegment": "large" }
                        ]
                    }
                }
            }
        }))
        .unwrap();

        assert_eq!(profile.login_id().unwrap(), "123456");
        assert_eq!(profile.fsd_profile_urn().as_str(), "urn:li:fsd_profile:ACoAAB");
        assert_eq!(profile.display_name(), "Ada Lovelace");
        assert_eq!(
            profile.mini_profile.picture_url().as_deref(),
            Some("https://media.licdn.com/dms/image/large")
        );
    }
}
