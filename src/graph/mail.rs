//! Sending mail as the signed-in user.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::debug;

use super::client::GraphClient;
use super::models::{
    EmailAddress, FileAttachment, ItemBody, MailMessage, MessagePayload, Recipient,
    SendMailRequest,
};
use super::transport::{GraphRequest, GraphResponse, GraphTransport};
use crate::error::ApiError;

const FILE_ATTACHMENT_TYPE: &str = "#microsoft.graph.fileAttachment";

impl<T: GraphTransport> GraphClient<T> {
    /// Send `message` from the current user's mailbox.
    ///
    /// The response is returned whatever its status; the caller decides what a
    /// failure means. Attachments are read before anything is sent.
    pub async fn send_mail(&self, message: &MailMessage) -> Result<GraphResponse, ApiError> {
        let payload = build_send_mail_payload(message).await?;
        let body = serde_json::to_value(&payload)
            .map_err(|e| ApiError::ParseFailed(e.to_string()))?;

        self.send(GraphRequest::post_json(
            self.endpoints().resolve("me/microsoft.graph.sendMail"),
            body,
        ))
        .await
    }
}

async fn build_send_mail_payload(message: &MailMessage) -> Result<SendMailRequest, ApiError> {
    let to_recipients = message
        .recipients
        .iter()
        .map(|address| Recipient {
            email_address: EmailAddress {
                address: address.clone(),
            },
        })
        .collect();

    let mut attachments = Vec::with_capacity(message.attachments.len());
    for path in &message.attachments {
        attachments.push(load_attachment(path).await?);
    }

    Ok(SendMailRequest {
        message: MessagePayload {
            subject: message.subject.clone(),
            body: ItemBody {
                content_type: message.body_type,
                content: message.body.clone(),
            },
            to_recipients,
            attachments,
        },
        save_to_sent_items: true,
    })
}

async fn load_attachment(path: &Path) -> Result<FileAttachment, ApiError> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| ApiError::local_file(path, e))?;
    let content_type = mime_guess::from_path(path)
        .first()
        .map(|mime| mime.to_string())
        .unwrap_or_default();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    debug!("Attaching {} ({} bytes, {})", name, data.len(), content_type);

    Ok(FileAttachment {
        odata_type: FILE_ATTACHMENT_TYPE,
        content_bytes: STANDARD.encode(&data),
        content_type,
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::models::BodyType;
    use crate::graph::test_support::{mock_client, MockTransport};
    use reqwest::Method;

    #[tokio::test]
    async fn test_send_mail_payload() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("me.jpeg");
        let notes = dir.path().join("notes.unknownext");
        std::fs::write(&photo, [0xFFu8, 0xD8, 0xFF]).unwrap();
        std::fs::write(&notes, b"hello").unwrap();

        let transport = MockTransport::new().on(
            Method::POST,
            "me/microsoft.graph.sendMail",
            GraphResponse::new(202, ""),
        );
        let client = mock_client(transport);

        let message = MailMessage::new(
            "hello",
            vec!["b@contoso.com".into(), "a@contoso.com".into()],
        )
        .body("<p>hi</p>", BodyType::Html)
        .attach(&photo)
        .attach(&notes);

        let response = client.send_mail(&message).await.unwrap();
        assert_eq!(response.status, 202);

        let requests = client.transport().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].content_type.as_deref(), Some("application/json"));
        let body = requests[0].json().unwrap();

        let msg = &body["Message"];
        assert_eq!(msg["Subject"], "hello");
        assert_eq!(msg["Body"]["ContentType"], "HTML");
        assert_eq!(msg["Body"]["Content"], "<p>hi</p>");
        assert_eq!(body["SaveToSentItems"], true);

        let recipients = msg["ToRecipients"].as_array().unwrap();
        assert_eq!(recipients.len(), 2);
        assert_eq!(recipients[0]["EmailAddress"]["Address"], "b@contoso.com");
        assert_eq!(recipients[1]["EmailAddress"]["Address"], "a@contoso.com");

        let attachments = msg["Attachments"].as_array().unwrap();
        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments[0]["@odata.type"], FILE_ATTACHMENT_TYPE);
        assert_eq!(attachments[0]["Name"], "me.jpeg");
        assert_eq!(attachments[0]["ContentType"], "image/jpeg");
        assert_eq!(attachments[0]["ContentBytes"], STANDARD.encode([0xFFu8, 0xD8, 0xFF]));
        assert_eq!(attachments[1]["ContentType"], "");
    }

    #[tokio::test]
    async fn test_missing_attachment_sends_nothing() {
        let client = mock_client(MockTransport::new());
        let message = MailMessage::new("hello", vec!["a@contoso.com".into()])
            .attach("/definitely/not/here.png");

        let result = client.send_mail(&message).await;

        assert!(matches!(result, Err(ApiError::LocalFile { .. })));
        assert!(client.transport().requests().is_empty());
    }

    #[tokio::test]
    async fn test_failure_status_is_returned() {
        let transport = MockTransport::new().on(
            Method::POST,
            "me/microsoft.graph.sendMail",
            GraphResponse::new(400, r#"{"error":{"code":"ErrorInvalidRecipients"}}"#),
        );
        let client = mock_client(transport);

        let response = client
            .send_mail(&MailMessage::new("hello", vec!["not-an-address".into()]))
            .await
            .unwrap();

        assert_eq!(response.status, 400);
        assert!(!response.is_success());
    }
}
