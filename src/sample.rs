//! The send-mail sample: profile, photo, upload, sharing link, mail.
//!
//! A linear chain where every stage feeds the next. The first failed stage
//! prints the error body and ends the run; earlier stages are not undone.

use std::fmt;
use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::SampleConfig;
use crate::graph::drive::upload_endpoint;
use crate::graph::{
    BodyType, DriveItem, GraphClient, GraphResponse, GraphTransport, LinkType, MailMessage,
    UserProfile,
};

/// Column where response summaries line up under the endpoint arrows.
const INDENT: usize = 28;

/// Stages of the sample, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Profile,
    Photo,
    Upload,
    SharingLink,
    SendMail,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Profile => "get user profile",
            Self::Photo => "get profile photo",
            Self::Upload => "upload to OneDrive",
            Self::SharingLink => "create sharing link",
            Self::SendMail => "send mail",
        };
        f.write_str(s)
    }
}

/// How a sample run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleOutcome {
    /// All stages ran; `status` is the send-mail status.
    Completed { status: u16 },
    /// `stage` failed with `status`; later stages were skipped.
    Aborted { stage: Stage, status: u16 },
}

impl SampleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Runs the sample against a Graph client, talking to the user over `input`/`output`.
pub struct SampleRunner<'a, T, R, W> {
    graph: &'a GraphClient<T>,
    config: &'a SampleConfig,
    input: R,
    output: W,
}

impl<'a, T, R, W> SampleRunner<'a, T, R, W>
where
    T: GraphTransport,
    R: BufRead,
    W: Write,
{
    pub fn new(graph: &'a GraphClient<T>, config: &'a SampleConfig, input: R, output: W) -> Self {
        Self {
            graph,
            config,
            input,
            output,
        }
    }

    pub async fn run(&mut self) -> Result<SampleOutcome> {
        // 1. profile
        self.announce("Get user profile", "me", true)?;
        let response = self.graph.get_profile().await?;
        self.summary(&response, true)?;
        if !response.is_success() {
            return self.abort(Stage::Profile, &response);
        }
        let profile: UserProfile = response.json()?;
        let display_name = profile.display_name_or_upn();
        let email = profile.email();

        writeln!(self.output, "Your name ----------------> {}", display_name)?;
        writeln!(self.output, "Your email ---------------> {}", email)?;
        let recipients = self.prompt_recipients(&email)?;

        // 2. photo
        self.announce("Get profile photo", "me/photo/$value", true)?;
        let photo = self
            .graph
            .get_profile_photo("me", Some(Path::new(&self.config.photo_name)))
            .await?;
        let saved_label = photo
            .saved_as
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        writeln!(
            self.output,
            "{}<Response [{}]> bytes returned: {}, saved as: {}",
            " ".repeat(INDENT),
            photo.status,
            photo.bytes.len(),
            saved_label
        )?;
        let photo_path = match (&photo.saved_as, photo.is_success()) {
            (Some(path), true) => path.clone(),
            _ => {
                warn!("Stage '{}' failed: HTTP {}", Stage::Photo, photo.status);
                return Ok(SampleOutcome::Aborted {
                    stage: Stage::Photo,
                    status: photo.status,
                });
            }
        };

        // 3. upload
        let photo_file = photo_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let upload_endpoint = upload_endpoint(&photo_file, self.config.upload_folder());
        self.announce("Upload to OneDrive", &upload_endpoint, false)?;
        let upload = self
            .graph
            .upload_file(&photo_path, self.config.upload_folder())
            .await?;
        self.summary(&upload, false)?;
        if !upload.is_success() {
            return self.abort(Stage::Upload, &upload);
        }
        let item: DriveItem = upload.json()?;
        info!(
            "Uploaded {} as item {} ({})",
            item.name.as_deref().unwrap_or(&photo_file),
            item.id,
            item.web_url.as_deref().unwrap_or("no web url")
        );

        // 4. sharing link
        self.announce("Create sharing link", "me/drive/items/{id}/createLink", false)?;
        let link = self.graph.create_sharing_link(&item.id, LinkType::View).await?;
        self.summary(&link.response, true)?;
        let link_url = match link.web_url {
            Some(url) if link.response.is_success() => url,
            _ => return self.abort(Stage::SharingLink, &link.response),
        };

        // 5. send mail
        self.announce("Send mail", "me/microsoft.graph.sendMail", false)?;
        let template = tokio::fs::read_to_string(&self.config.template_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to read mail template {}",
                    self.config.template_path.display()
                )
            })?;
        let body = render_template(&template, &display_name, &link_url);
        let message = MailMessage::new(self.config.subject.clone(), recipients)
            .body(body, BodyType::Html)
            .attach(&photo_path);
        let sent = self.graph.send_mail(&message).await?;
        self.summary(&sent, false)?;
        if !sent.is_success() {
            return self.abort(Stage::SendMail, &sent);
        }

        writeln!(
            self.output,
            "\nSample complete: mail sent to {} with a link to {}",
            message.recipients.join("; "),
            link_url
        )?;
        info!("Sample completed");
        Ok(SampleOutcome::Completed { status: sent.status })
    }

    fn announce(&mut self, label: &str, path: &str, leading_blank: bool) -> Result<()> {
        let arrow_len = (INDENT - 2).saturating_sub(label.len() + 1);
        writeln!(
            self.output,
            "{}{} {}> {}",
            if leading_blank { "\n" } else { "" },
            label,
            "-".repeat(arrow_len),
            self.graph.endpoints().resolve(path)
        )?;
        Ok(())
    }

    fn summary(&mut self, response: &GraphResponse, with_bytes: bool) -> Result<()> {
        if with_bytes {
            writeln!(
                self.output,
                "{}<Response [{}]> bytes returned: {}",
                " ".repeat(INDENT),
                response.status,
                response.bytes_returned()
            )?;
        } else {
            writeln!(self.output, "{}<Response [{}]>", " ".repeat(INDENT), response.status)?;
        }
        Ok(())
    }

    fn abort(&mut self, stage: Stage, response: &GraphResponse) -> Result<SampleOutcome> {
        warn!("Stage '{}' failed: HTTP {}", stage, response.status);
        writeln!(self.output, "{}", response.pretty_body())?;
        Ok(SampleOutcome::Aborted {
            stage,
            status: response.status,
        })
    }

    /// Ask for recipients; an empty answer sends to `default`.
    fn prompt_recipients(&mut self, default: &str) -> Result<Vec<String>> {
        write!(self.output, "Send-to (ENTER=self) -----> ")?;
        self.output.flush()?;

        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(parse_recipients(&line, default))
    }
}

/// Split `;`-separated addresses, falling back to `default` when none are given.
pub fn parse_recipients(input: &str, default: &str) -> Vec<String> {
    let recipients: Vec<String> = input
        .split(';')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect();

    if recipients.is_empty() {
        vec![default.to_string()]
    } else {
        recipients
    }
}

/// Fill the `{name}` and `{link_url}` placeholders of the mail template.
pub fn render_template(template: &str, name: &str, link_url: &str) -> String {
    template
        .replace("{name}", name)
        .replace("{link_url}", link_url)
}
