mod cli;
mod clock;
mod config;
mod dispatch;
mod documents;
mod logging;
mod normalize;
mod notification;
mod report;
mod templates;
mod units;
mod utils;
mod vendors;

pub use cli::{Cli, LogLevel};
pub use clock::{Clock, Pause, SystemClock, ThreadPause};
pub use config::{Config, PacingInterval, TransportSettings};
pub use dispatch::{Advisor, Anomaly, DispatchPlan, Dispatcher, Outcome, RunSummary};
pub use documents::{find_documents, DocumentLocator};
pub use logging::init_logging;
pub use normalize::normalize;
pub use notification::{
    MailBody, MailTransport, OutboxMailer, OutgoingMail, SmtpMailer, SmtpSettings,
};
pub use report::{build_report, send_report};
pub use templates::{fill_template, load_templates, pick, Picker, RandomPicker};
pub use units::{CutoffTime, Seconds};
pub use vendors::{load_vendors, VendorRecord};

use anyhow::Context;
use lettre::message::Mailbox;
use log::{debug, info};

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load_from(&cli.get_config_path()).context("Failed to load config")?;

    // Everything the loop needs is loaded before the first message goes out
    let plan = DispatchPlan {
        advisor: config.load_advisor().context("Failed to load advisor")?,
        subjects: config.load_subjects().context("Failed to load subjects")?,
        templates: load_templates(&config.templates_dir).context("Failed to load templates")?,
        documents: DocumentLocator::scan(&config.documents_dir)
            .context("Failed to scan documents")?,
        cutoff: config.cutoff,
        pacing: config.pacing,
    };
    let vendors = load_vendors(&config.vendors_file).context("Failed to load vendors")?;
    info!(
        "Loaded {} vendors, {} templates and {} subjects",
        vendors.len(),
        plan.templates.len(),
        plan.subjects.len()
    );

    let mut transport = build_transport(&config, &cli)?;
    let mut pause = ThreadPause;
    let mut picker = RandomPicker::new(rand::thread_rng());
    let summary = Dispatcher::new(
        &plan,
        transport.as_mut(),
        &SystemClock,
        &mut pause,
        &mut picker,
    )
    .run(&vendors);

    send_report(
        transport.as_mut(),
        summary,
        &config.report_recipient,
        &config.report_subject,
    )?;
    info!("Completed");
    Ok(())
}

fn build_transport(config: &Config, cli: &Cli) -> anyhow::Result<Box<dyn MailTransport>> {
    let from: Mailbox = config
        .sender
        .parse()
        .with_context(|| format!("Invalid sender address {:?}", config.sender))?;

    if let Some(dir) = &cli.outbox {
        debug!("Outbox {dir:?} given on command line, nothing will be delivered");
        return Ok(Box::new(OutboxMailer::new(dir, from)?));
    }
    let result: Box<dyn MailTransport> = match &config.transport {
        TransportSettings::Smtp(settings) => Box::new(SmtpMailer::new(settings, from)?),
        TransportSettings::Outbox { dir } => Box::new(OutboxMailer::new(dir, from)?),
    };
    Ok(result)
}
