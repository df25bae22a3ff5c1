use std::{
    fs::create_dir_all,
    path::{Path, PathBuf},
};

use anyhow::Context;
use lettre::{message::Mailbox, FileTransport, Transport};
use log::{debug, info};

use super::{build_message, MailTransport, OutgoingMail};

/// Writes every message as an `.eml` file instead of delivering it
pub struct OutboxMailer {
    from: Mailbox,
    dir: PathBuf,
    transport: FileTransport,
}

impl OutboxMailer {
    pub fn new(dir: &Path, from: Mailbox) -> anyhow::Result<Self> {
        debug!("Creating outbox in {dir:?}");
        create_dir_all(dir).with_context(|| format!("Failed to create outbox directory {dir:?}"))?;
        Ok(Self {
            from,
            dir: dir.to_path_buf(),
            transport: FileTransport::new(dir),
        })
    }
}

impl MailTransport for OutboxMailer {
    fn send(&mut self, mail: &OutgoingMail) -> anyhow::Result<()> {
        let message = build_message(&self.from, mail)?;
        let id = self
            .transport
            .send(&message)
            .with_context(|| format!("Failed to write email to outbox {:?}", self.dir))?;
        info!("EMAIL WRITTEN: {:?} -> {} as {id}.eml", mail.subject, mail.to);
        Ok(())
    }
}
