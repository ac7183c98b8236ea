//! Microsoft Graph API client for profile and photo calls.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::endpoint::EndpointResolver;
use super::models::{PhotoMetadata, PhotoResult};
use super::transport::{GraphRequest, GraphResponse, GraphTransport};
use crate::error::ApiError;

/// Suffix that selects the binary content of a photo resource.
const VALUE_SUFFIX: &str = "/$value";

/// Microsoft Graph API client.
///
/// Every operation is a single blocking-style call: one request in flight,
/// no retries, no caching.
pub struct GraphClient<T> {
    transport: T,
    endpoints: EndpointResolver,
}

impl<T: GraphTransport> GraphClient<T> {
    pub fn new(transport: T, endpoints: EndpointResolver) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    pub fn endpoints(&self) -> &EndpointResolver {
        &self.endpoints
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub(crate) async fn send(&self, request: GraphRequest) -> Result<GraphResponse, ApiError> {
        debug!("{} {}", request.method, request.url);
        let response = self.transport.send(request).await?;
        debug!(
            "<- HTTP {} ({} bytes)",
            response.status,
            response.bytes_returned()
        );
        Ok(response)
    }

    /// Fetch the signed-in user's profile (`me`).
    ///
    /// The raw response is returned; decode it into
    /// [`UserProfile`](super::models::UserProfile) after checking the status.
    pub async fn get_profile(&self) -> Result<GraphResponse, ApiError> {
        self.send(GraphRequest::get(self.endpoints.resolve("me")))
            .await
    }

    /// Get a profile photo, and optionally save a local copy.
    ///
    /// `user_id` is a Graph user id or `"me"`. `save_as` must not carry an
    /// extension; it is derived from the photo's content type.
    pub async fn get_profile_photo(
        &self,
        user_id: &str,
        save_as: Option<&Path>,
    ) -> Result<PhotoResult, ApiError> {
        let endpoint = if user_id == "me" {
            "me/photo/$value".to_string()
        } else {
            format!("users/{}/$value", user_id)
        };

        let photo = self
            .send(GraphRequest::get(self.endpoints.resolve(&endpoint)))
            .await?;
        if !photo.is_success() {
            warn!("Photo request failed: HTTP {}", photo.status);
            return Ok(PhotoResult::failed(photo.status));
        }

        let metadata_endpoint = endpoint.trim_end_matches(VALUE_SUFFIX);
        let metadata = self
            .send(GraphRequest::get(self.endpoints.resolve(metadata_endpoint)))
            .await?;
        let content_type = if metadata.is_success() {
            metadata
                .json::<PhotoMetadata>()
                .map(|m| m.media_content_type)
                .unwrap_or_default()
        } else {
            warn!("Photo metadata request failed: HTTP {}", metadata.status);
            String::new()
        };

        let saved_as = match save_as {
            Some(base) if !photo.body.is_empty() && !content_type.is_empty() => {
                let path = photo_file_name(base, &content_type);
                tokio::fs::write(&path, &photo.body)
                    .await
                    .map_err(|e| ApiError::local_file(&path, e))?;
                debug!("Saved photo to {}", path.display());
                Some(path)
            }
            _ => None,
        };

        Ok(PhotoResult {
            status: photo.status,
            bytes: photo.body,
            content_type,
            saved_as,
        })
    }
}

/// `<base>.<subtype>` for a content type such as `image/jpeg`.
fn photo_file_name(base: &Path, content_type: &str) -> PathBuf {
    let extension = content_type
        .split(';')
        .next()
        .and_then(|essence| essence.split('/').nth(1))
        .map(str::trim)
        .filter(|subtype| !subtype.is_empty())
        .unwrap_or("bin");

    let mut name = base.as_os_str().to_os_string();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::{mock_client, MockTransport};
    use reqwest::Method;

    #[test]
    fn test_photo_file_name() {
        assert_eq!(photo_file_name(Path::new("me"), "image/jpeg"), PathBuf::from("me.jpeg"));
        assert_eq!(
            photo_file_name(Path::new("out/me"), "image/png; charset=binary"),
            PathBuf::from("out/me.png")
        );
        assert_eq!(photo_file_name(Path::new("me"), "garbage"), PathBuf::from("me.bin"));
    }

    #[tokio::test]
    async fn test_photo_not_found() {
        let transport = MockTransport::new().on(
            Method::GET,
            "me/photo/$value",
            GraphResponse::new(404, r#"{"error":{"code":"ImageNotFound"}}"#),
        );
        let client = mock_client(transport);
        let dir = tempfile::tempdir().unwrap();

        let result = client
            .get_profile_photo("me", Some(&dir.path().join("me")))
            .await
            .unwrap();

        assert_eq!(result.status, 404);
        assert!(result.bytes.is_empty());
        assert_eq!(result.content_type, "");
        assert_eq!(result.saved_as, None);
        assert!(!result.is_success());
        // No metadata request after a failed download.
        assert_eq!(client.transport().requests().len(), 1);
        assert!(!dir.path().join("me.jpeg").exists());
    }

    #[tokio::test]
    async fn test_photo_saved_with_extension() {
        let jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46];
        let transport = MockTransport::new()
            .on(
                Method::GET,
                "me/photo/$value",
                GraphResponse::new(200, jpeg.clone()),
            )
            .on(
                Method::GET,
                "me/photo",
                GraphResponse::new(200, r#"{"@odata.mediaContentType":"image/jpeg","id":"48X48"}"#),
            );
        let client = mock_client(transport);
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("me");

        let result = client.get_profile_photo("me", Some(&base)).await.unwrap();

        let expected = dir.path().join("me.jpeg");
        assert_eq!(result.status, 200);
        assert_eq!(result.bytes, jpeg);
        assert_eq!(result.content_type, "image/jpeg");
        assert_eq!(result.saved_as.as_deref(), Some(expected.as_path()));
        assert_eq!(std::fs::read(&expected).unwrap(), jpeg);

        let urls: Vec<String> = client
            .transport()
            .requests()
            .into_iter()
            .map(|r| r.url)
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://graph.microsoft.com/beta/me/photo/$value",
                "https://graph.microsoft.com/beta/me/photo",
            ]
        );
    }

    #[tokio::test]
    async fn test_photo_without_save() {
        let transport = MockTransport::new()
            .on(Method::GET, "users/42/$value", GraphResponse::new(200, vec![1, 2, 3]))
            .on(
                Method::GET,
                "users/42",
                GraphResponse::new(200, r#"{"@odata.mediaContentType":"image/png"}"#),
            );
        let client = mock_client(transport);

        let result = client.get_profile_photo("42", None).await.unwrap();

        assert!(result.is_success());
        assert_eq!(result.bytes, vec![1, 2, 3]);
        assert_eq!(result.content_type, "image/png");
        assert_eq!(result.saved_as, None);
    }

    #[tokio::test]
    async fn test_get_profile_hits_me() {
        let transport = MockTransport::new().on(
            Method::GET,
            "me",
            GraphResponse::new(200, r#"{"displayName":"Adele","mail":"adele@contoso.com"}"#),
        );
        let client = mock_client(transport);

        let response = client.get_profile().await.unwrap();

        assert!(response.is_success());
        assert_eq!(
            client.transport().requests()[0].url,
            "https://graph.microsoft.com/beta/me"
        );
    }
}
