use std::env;

use anyhow::Context;
use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, SmtpTransport, Transport,
};
use log::{debug, info};
use serde::Deserialize;

use super::{build_message, MailTransport, OutgoingMail};

/// Overrides the password from the config file when set
pub const PASSWORD_ENV_VAR: &str = "CERT_MAILER_SMTP_PASSWORD";

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpSettings {
    pub host: String,

    #[serde(default = "SmtpSettings::default_port")]
    pub port: u16,

    pub username: Option<String>,

    pub password: Option<String>,

    /// When false connects without TLS, only meant for local relays
    #[serde(default = "SmtpSettings::default_starttls")]
    pub starttls: bool,
}

impl SmtpSettings {
    fn default_port() -> u16 {
        587
    }

    fn default_starttls() -> bool {
        true
    }

    fn password(&self) -> Option<String> {
        env::var(PASSWORD_ENV_VAR).ok().or_else(|| self.password.clone())
    }
}

/// Delivers mail through an SMTP relay
pub struct SmtpMailer {
    from: Mailbox,
    transport: SmtpTransport,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings, from: Mailbox) -> anyhow::Result<Self> {
        debug!(
            "Creating SMTP transport for {}:{} (starttls: {})",
            settings.host, settings.port, settings.starttls
        );
        let builder = if settings.starttls {
            SmtpTransport::starttls_relay(&settings.host)
                .with_context(|| format!("Failed to create SMTP relay for {:?}", settings.host))?
        } else {
            SmtpTransport::builder_dangerous(&settings.host)
        };
        let mut builder = builder.port(settings.port);

        if let Some(username) = &settings.username {
            let password = settings
                .password()
                .with_context(|| format!("No SMTP password in config nor in {PASSWORD_ENV_VAR}"))?;
            builder = builder.credentials(Credentials::new(username.clone(), password));
        }

        Ok(Self {
            from,
            transport: builder.build(),
        })
    }
}

impl MailTransport for SmtpMailer {
    fn send(&mut self, mail: &OutgoingMail) -> anyhow::Result<()> {
        let message = build_message(&self.from, mail)?;
        self.transport
            .send(&message)
            .with_context(|| format!("Failed to send email to {:?} via SMTP", mail.to))?;
        info!("EMAIL SENT: {:?} -> {}", mail.subject, mail.to);
        Ok(())
    }
}
