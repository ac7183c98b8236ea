//! Microsoft Graph payload types.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::transport::GraphResponse;

/// User profile from Microsoft Graph /me endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Unique identifier for the user.
    #[serde(default)]
    pub id: String,

    /// User's display name.
    pub display_name: Option<String>,

    /// User's email address.
    pub mail: Option<String>,

    /// User Principal Name (typically email-like format).
    pub user_principal_name: Option<String>,
}

impl UserProfile {
    /// Get the best available display name.
    pub fn display_name_or_upn(&self) -> String {
        self.display_name
            .clone()
            .or_else(|| self.user_principal_name.clone())
            .unwrap_or_else(|| "Unknown User".to_string())
    }

    /// Get the best available email.
    pub fn email(&self) -> String {
        self.mail
            .clone()
            .or_else(|| self.user_principal_name.clone())
            .unwrap_or_default()
    }
}

/// Photo metadata from `me/photo`.
#[derive(Debug, Deserialize)]
pub(crate) struct PhotoMetadata {
    #[serde(rename = "@odata.mediaContentType", default)]
    pub media_content_type: String,
}

/// Outcome of a profile photo download.
#[derive(Debug, Clone)]
pub struct PhotoResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// Local copy, present only when a save was requested and succeeded.
    pub saved_as: Option<PathBuf>,
}

impl PhotoResult {
    pub(crate) fn failed(status: u16) -> Self {
        Self {
            status,
            bytes: Vec::new(),
            content_type: String::new(),
            saved_as: None,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

/// File or folder in OneDrive.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
}

/// Kind of sharing link to create.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    #[default]
    View,
    Edit,
    /// OneDrive Personal only.
    Embed,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::View => "view",
            Self::Edit => "edit",
            Self::Embed => "embed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateLinkRequest {
    #[serde(rename = "type")]
    pub link_type: LinkType,
}

/// `permission` returned by createLink.
#[derive(Debug, Deserialize)]
pub(crate) struct LinkPermission {
    pub link: SharingLinkDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SharingLinkDetails {
    pub web_url: String,
}

/// Result of a createLink call.
#[derive(Debug, Clone)]
pub struct SharingLink {
    pub response: GraphResponse,
    /// Link URL; `None` when the request failed.
    pub web_url: Option<String>,
}

/// Body format of an outgoing message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum BodyType {
    #[default]
    #[serde(rename = "HTML")]
    Html,
    Text,
}

/// A message to send from the signed-in user's mailbox.
#[derive(Debug, Clone, Default)]
pub struct MailMessage {
    pub subject: String,
    pub recipients: Vec<String>,
    pub body: String,
    pub body_type: BodyType,
    /// Local files to attach.
    pub attachments: Vec<PathBuf>,
}

impl MailMessage {
    pub fn new(subject: impl Into<String>, recipients: Vec<String>) -> Self {
        Self {
            subject: subject.into(),
            recipients,
            ..Self::default()
        }
    }

    pub fn body(mut self, body: impl Into<String>, body_type: BodyType) -> Self {
        self.body = body.into();
        self.body_type = body_type;
        self
    }

    pub fn attach(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachments.push(path.into());
        self
    }
}

// sendMail wire format. Graph accepts PascalCase property names here.

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SendMailRequest {
    pub message: MessagePayload,
    pub save_to_sent_items: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct MessagePayload {
    pub subject: String,
    pub body: ItemBody,
    pub to_recipients: Vec<Recipient>,
    pub attachments: Vec<FileAttachment>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ItemBody {
    pub content_type: BodyType,
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct Recipient {
    pub email_address: EmailAddress,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct EmailAddress {
    pub address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct FileAttachment {
    #[serde(rename = "@odata.type")]
    pub odata_type: &'static str,
    pub content_bytes: String,
    pub content_type: String,
    pub name: String,
}
