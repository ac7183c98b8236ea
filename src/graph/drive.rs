//! OneDrive uploads and sharing links.

use std::path::Path;

use tracing::{debug, info, warn};

use super::client::GraphClient;
use super::models::{CreateLinkRequest, LinkPermission, LinkType, SharingLink};
use super::transport::{GraphRequest, GraphResponse, GraphTransport};
use crate::error::ApiError;

impl<T: GraphTransport> GraphClient<T> {
    /// Upload a local file to OneDrive.
    ///
    /// `folder` is a path below the drive root, `None` for the root itself.
    /// An existing file is overwritten and a missing folder is created by the
    /// service.
    pub async fn upload_file(
        &self,
        path: &Path,
        folder: Option<&str>,
    ) -> Result<GraphResponse, ApiError> {
        let name = file_name(path)?;
        let endpoint = upload_endpoint(&name, folder);
        let content_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .to_string();
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| ApiError::local_file(path, e))?;

        debug!("Uploading {} ({} bytes, {})", name, data.len(), content_type);

        self.send(GraphRequest::put_bytes(
            self.endpoints().resolve(&endpoint),
            data,
            &content_type,
        ))
        .await
    }

    /// Create (or fetch the existing) sharing link for a drive item.
    ///
    /// 201 means a new link was created and 200 that an existing one was
    /// returned; both count as success.
    pub async fn create_sharing_link(
        &self,
        item_id: &str,
        link_type: LinkType,
    ) -> Result<SharingLink, ApiError> {
        let endpoint = format!("me/drive/items/{}/createLink", item_id);
        let body = serde_json::to_value(CreateLinkRequest { link_type })
            .map_err(|e| ApiError::ParseFailed(e.to_string()))?;

        let response = self
            .send(GraphRequest::post_json(self.endpoints().resolve(&endpoint), body))
            .await?;

        if !response.is_success() {
            warn!("createLink failed for item {}: HTTP {}", item_id, response.status);
            return Ok(SharingLink {
                response,
                web_url: None,
            });
        }

        let permission: LinkPermission = response.json()?;
        info!("Sharing link ready for item {} (type={})", item_id, link_type);
        Ok(SharingLink {
            web_url: Some(permission.link.web_url),
            response,
        })
    }
}

fn file_name(path: &Path) -> Result<String, ApiError> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            ApiError::local_file(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
            )
        })
}

/// Path-addressed upload endpoint.
pub(crate) fn upload_endpoint(name: &str, folder: Option<&str>) -> String {
    match folder.map(|f| f.trim_matches('/')).filter(|f| !f.is_empty()) {
        Some(folder) => format!("me/drive/root:/{}/{}:/content", folder, name),
        None => format!("me/drive/root/children/{}/content", name),
    }
}
