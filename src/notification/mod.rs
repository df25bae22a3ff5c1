mod email;
mod outbox;

use std::{fs, path::PathBuf};

use anyhow::{bail, Context};
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    Message,
};

pub use email::{SmtpMailer, SmtpSettings};
pub use outbox::OutboxMailer;

const ATTACHMENT_CONTENT_TYPE: &str = "application/pdf";

/// Anything able to deliver an [`OutgoingMail`], one message at a time
pub trait MailTransport {
    /// Blocks until the message has been handed off
    fn send(&mut self, mail: &OutgoingMail) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailBody {
    Html(String),
    Plain(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: MailBody,

    /// Files attached in this order
    pub attachments: Vec<PathBuf>,
}

/// Splits a recipient cell like `pagos@acme.com; contabilidad@acme.com` into mailboxes
fn parse_recipients(to: &str) -> anyhow::Result<Vec<Mailbox>> {
    let mut result = Vec::new();
    for part in to.split([';', ',']).map(str::trim).filter(|part| !part.is_empty()) {
        let mailbox = part
            .parse()
            .with_context(|| format!("Invalid recipient address {part:?} in {to:?}"))?;
        result.push(mailbox);
    }
    if result.is_empty() {
        bail!("No recipient address in {to:?}");
    }
    Ok(result)
}

/// Builds the MIME message for `mail`, reading every attachment from disk
fn build_message(from: &Mailbox, mail: &OutgoingMail) -> anyhow::Result<Message> {
    let body = match &mail.body {
        MailBody::Html(html) => SinglePart::html(html.clone()),
        MailBody::Plain(text) => SinglePart::plain(text.clone()),
    };
    let mut builder = Message::builder()
        .from(from.clone())
        .subject(mail.subject.as_str());
    for to in parse_recipients(&mail.to)? {
        builder = builder.to(to);
    }

    if mail.attachments.is_empty() {
        return builder
            .singlepart(body)
            .context("Failed to build email");
    }

    let content_type = ContentType::parse(ATTACHMENT_CONTENT_TYPE)
        .context("Failed to parse attachment content type")?;
    let mut parts = MultiPart::mixed().singlepart(body);
    for path in &mail.attachments {
        let contents =
            fs::read(path).with_context(|| format!("Failed to read attachment {path:?}"))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .with_context(|| format!("Attachment {path:?} has no file name"))?;
        parts = parts.singlepart(Attachment::new(filename).body(contents, content_type.clone()));
    }
    builder.multipart(parts).context("Failed to build email")
}
