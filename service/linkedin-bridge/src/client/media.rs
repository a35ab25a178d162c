use super::endpoints;
use super::Client;
use crate::error::{LinkedInError, Result};
use crate::urn::Urn;
use futures::TryStreamExt;
use reqwest::header::HeaderMap;
use reqwest::{Body, Method};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use tokio::io::AsyncRead;
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MediaUploadType {
    #[serde(rename = "MESSAGING_PHOTO_ATTACHMENT")]
    Photo,
    #[serde(rename = "MESSAGING_FILE_ATTACHMENT")]
    File,
    #[serde(rename = "MESSAGING_VIDEO_ATTACHMENT")]
    Video,
    #[serde(rename = "VOICE_MESSAGE")]
    Voice,
}

impl MediaUploadType {
    pub fn for_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            MediaUploadType::Photo
        } else if mime.starts_with("video/") {
            MediaUploadType::Video
        } else {
            MediaUploadType::File
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadRequest<'a> {
    media_upload_type: MediaUploadType,
    file_size: u64,
    filename: &'a str,
}

#[derive(Deserialize)]
struct UploadResponse {
    value: UploadMetadata,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadMetadata {
    urn: Urn,
    single_upload_url: String,
    #[serde(default)]
    single_upload_headers: HashMap<String, String>,
}

/// A streaming download: response headers and a reader over the body.
pub struct Download {
    pub headers: HeaderMap,
    pub reader: Pin<Box<dyn AsyncRead + Send>>,
}

impl Client {
    /// Upload `size` bytes from `reader` and return the asset URN to attach
    /// to a message.
    pub async fn upload_media<R>(
        &self,
        upload_type: MediaUploadType,
        filename: &str,
        mime: &str,
        size: u64,
        reader: R,
    ) -> Result<Urn>
    where
        R: AsyncRead + Send + Sync + 'static,
    {
        let preflight: UploadResponse = self
            .request(Method::POST, endpoints::MEDIA_UPLOAD_METADATA)
            .with_query_param("action", endpoints::ACTION_UPLOAD)
            .with_csrf()
            .with_json_body(&UploadRequest {
                media_upload_type: upload_type,
                file_size: size,
                filename,
            })?
            .send_json()
            .await?;
        let metadata = preflight.value;
        debug!(asset = %metadata.urn, size, "upload slot reserved");

        let mut put = self
            .request(Method::PUT, &metadata.single_upload_url)
            .with_csrf()
            .with_content_type(mime)
            .with_header("content-length", size.to_string())
            .with_body(Body::wrap_stream(ReaderStream::new(reader)));
        for (name, value) in &metadata.single_upload_headers {
            put = put.with_header(name.clone(), value.clone());
        }
        let uploaded = put.send().await?;
        if !uploaded.status().is_success() {
            return Err(LinkedInError::api(
                uploaded.status(),
                "media upload was not accepted",
            ));
        }

        self.request(Method::POST, endpoints::MEDIA_UPLOAD_METADATA)
            .with_query_param("action", endpoints::ACTION_CONFIRM_UPLOAD)
            .with_csrf()
            .with_json_body(&json!({ "urn": metadata.urn }))?
            .send()
            .await?;
        debug!(asset = %metadata.urn, "upload confirmed");
        Ok(metadata.urn)
    }

    /// Stream a media URL. Session cookies are attached only when the URL
    /// is on the LinkedIn origin.
    pub async fn download(&self, url: &str) -> Result<Download> {
        let response = self
            .request(Method::GET, url)
            .with_accept("*/*")
            .send()
            .await?;
        let headers = response.headers().clone();
        let stream = response
            .bytes_stream()
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err));
        Ok(Download {
            headers,
            reader: Box::pin(StreamReader::new(stream)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_upload_type_from_mime() {
        assert_eq!(MediaUploadType::for_mime("image/png"), MediaUploadType::Photo);
        assert_eq!(MediaUploadType::for_mime("video/mp4"), MediaUploadType::Video);
        assert_eq!(MediaUploadType::for_mime("application/pdf"), MediaUploadType::File);
    }

    #[test]
    fn upload_request_uses_wire_names() {
        let body = serde_json::to_value(UploadRequest {
            media_upload_type: MediaUploadType::Photo,
            file_size: 42,
            filename: "cat.png",
        })
        .unwrap();
        assert_eq!(
            body,
            json!({ "mediaUploadType": "MESSAGING_PHOTO_ATTACHMENT", "fileSize": 42, "filename": "cat.png" })
        );
    }
}
