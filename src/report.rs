use std::fmt::Display;

use anyhow::Context;
use log::info;

use crate::{
    dispatch::RunSummary,
    notification::{MailBody, MailTransport, OutgoingMail},
};

const TITLE: &str = "REPORTE ENVÍO CORREOS RETENCIONES";
const ANOMALIES_HEADING: &str = "NOVEDADES DETECTADAS:";
const NO_ANOMALIES: &str = "No se presentaron novedades.";
const CLOSING: &str = "El proceso de envío ha finalizado correctamente.";

/// Plain-text summary of a run, anomalies listed one per bullet in the order given
pub fn build_report<A: Display>(sent_count: usize, anomalies: &[A]) -> String {
    let mut lines = vec![
        format!("{TITLE}\n"),
        format!("Correos enviados correctamente: {sent_count}\n"),
    ];
    if anomalies.is_empty() {
        lines.push(NO_ANOMALIES.to_string());
    } else {
        lines.push(ANOMALIES_HEADING.to_string());
        lines.extend(anomalies.iter().map(|anomaly| format!("- {anomaly}")));
    }
    lines.push(format!("\n{CLOSING}"));
    lines.join("\n")
}

/// Sends the summary of `summary` to the operator
pub fn send_report(
    transport: &mut dyn MailTransport,
    summary: RunSummary,
    recipient: &str,
    subject: &str,
) -> anyhow::Result<()> {
    let mail = OutgoingMail {
        to: recipient.to_string(),
        subject: subject.to_string(),
        body: MailBody::Plain(build_report(summary.sent_count, &summary.anomalies)),
        attachments: Vec::new(),
    };
    transport
        .send(&mail)
        .with_context(|| format!("Failed to send report to {recipient:?}"))?;
    info!("Report sent to {recipient}");
    Ok(())
}
