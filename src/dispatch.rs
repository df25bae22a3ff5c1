use std::{fmt::Display, path::PathBuf, time::Duration};

use log::{debug, info, warn};

use crate::{
    clock::{Clock, Pause},
    config::PacingInterval,
    documents::DocumentLocator,
    normalize::normalize,
    notification::{MailBody, MailTransport, OutgoingMail},
    templates::{fill_template, pick, Picker},
    units::CutoffTime,
    utils::make_single_line,
    vendors::VendorRecord,
};

/// A non-fatal condition recorded during a run and listed in the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    InvalidEmail { vendor: String },
    NoDocuments { vendor: String },
    MultipleDocuments { vendor: String, count: usize },
    SendFailed { vendor: String, reason: String },
    CutoffReached { cutoff: CutoffTime },
}

impl Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anomaly::InvalidEmail { vendor } => write!(f, "{vendor}: no tiene correo válido."),
            Anomaly::NoDocuments { vendor } => {
                write!(f, "{vendor}: no tiene documentos PDF para enviar.")
            }
            Anomaly::MultipleDocuments { vendor, count } => {
                write!(f, "{vendor}: se enviaron {count} documentos PDF.")
            }
            Anomaly::SendFailed { vendor, reason } => {
                write!(f, "{vendor}: fallo el envío del correo ({reason}).")
            }
            Anomaly::CutoffReached { cutoff } => {
                write!(f, "Proceso detenido por límite horario ({cutoff}).")
            }
        }
    }
}

/// What happened to a single vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    SkippedInvalidEmail,
    SkippedNoDocuments,
    Sent { attachments: usize },
    SendFailed,
}

impl Outcome {
    /// True when a message was handed (or attempted to be handed) to the transport
    fn attempted_send(&self) -> bool {
        matches!(self, Outcome::Sent { .. } | Outcome::SendFailed)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub sent_count: usize,
    pub anomalies: Vec<Anomaly>,
}

/// Who the messages are sent on behalf of
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advisor {
    pub name: String,
    pub email: String,
}

/// Everything loaded before the run that the loop only reads
#[derive(Debug, Clone)]
pub struct DispatchPlan {
    pub advisor: Advisor,
    pub subjects: Vec<String>,
    pub templates: Vec<String>,
    pub documents: DocumentLocator,
    pub cutoff: CutoffTime,
    pub pacing: PacingInterval,
}

/// Sends one message per vendor, collecting anomalies along the way
pub struct Dispatcher<'a> {
    plan: &'a DispatchPlan,
    transport: &'a mut dyn MailTransport,
    clock: &'a dyn Clock,
    pause: &'a mut dyn Pause,
    picker: &'a mut dyn Picker,
    sent_count: usize,
    anomalies: Vec<Anomaly>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        plan: &'a DispatchPlan,
        transport: &'a mut dyn MailTransport,
        clock: &'a dyn Clock,
        pause: &'a mut dyn Pause,
        picker: &'a mut dyn Picker,
    ) -> Self {
        Self {
            plan,
            transport,
            clock,
            pause,
            picker,
            sent_count: 0,
            anomalies: Vec::new(),
        }
    }

    /// Processes `vendors` in order until the list is exhausted or the cutoff has passed
    pub fn run(mut self, vendors: &[VendorRecord]) -> RunSummary {
        info!("Starting dispatch for {} vendors", vendors.len());
        let mut remaining = vendors.iter().peekable();
        while let Some(vendor) = remaining.next() {
            let outcome = self.process_vendor(vendor);
            debug!("{}: {outcome:?}", make_single_line(&vendor.name));
            if !outcome.attempted_send() {
                continue;
            }

            let now = self.clock.now();
            if self.plan.cutoff.has_passed(now) {
                info!("Cutoff {} passed at {now}, stopping", self.plan.cutoff);
                self.record(Anomaly::CutoffReached {
                    cutoff: self.plan.cutoff,
                });
                break;
            }

            if remaining.peek().is_some() {
                let wait = self.wait_time();
                info!("Waiting {:.1} seconds...", wait.as_secs_f64());
                self.pause.pause(wait);
            }
        }
        info!(
            "Dispatch finished: {} sent, {} anomalies",
            self.sent_count,
            self.anomalies.len()
        );
        RunSummary {
            sent_count: self.sent_count,
            anomalies: self.anomalies,
        }
    }

    fn process_vendor(&mut self, vendor: &VendorRecord) -> Outcome {
        let name = &vendor.name;
        if vendor.email.is_empty() || !vendor.email.contains('@') {
            self.record(Anomaly::InvalidEmail {
                vendor: name.clone(),
            });
            return Outcome::SkippedInvalidEmail;
        }

        let key = normalize(name);
        if key.is_empty() {
            warn!(
                "{}: name has no ASCII letters left after normalizing, every PDF will match",
                make_single_line(name)
            );
        }
        let attachments = self.plan.documents.locate(&key);
        if attachments.is_empty() {
            self.record(Anomaly::NoDocuments {
                vendor: name.clone(),
            });
            return Outcome::SkippedNoDocuments;
        }
        let count = attachments.len();

        let mail = self.compose(vendor, attachments);
        if let Err(e) = self.transport.send(&mail) {
            self.record(Anomaly::SendFailed {
                vendor: name.clone(),
                reason: format!("{e:#}"),
            });
            return Outcome::SendFailed;
        }
        self.sent_count += 1;
        info!("Sent to: {} -> {}", make_single_line(name), vendor.email);
        info!("PDFs attached: {count}");

        if count > 1 {
            self.record(Anomaly::MultipleDocuments {
                vendor: name.clone(),
                count,
            });
        }
        Outcome::Sent { attachments: count }
    }

    fn compose(&mut self, vendor: &VendorRecord, attachments: Vec<PathBuf>) -> OutgoingMail {
        let plan = self.plan;
        let template = pick(&mut *self.picker, &plan.templates).map_or("", String::as_str);
        let subject = pick(&mut *self.picker, &plan.subjects).map_or("", String::as_str);
        let html = fill_template(
            template,
            &vendor.name,
            &plan.advisor.name,
            &plan.advisor.email,
        );
        OutgoingMail {
            to: vendor.email.clone(),
            subject: subject.to_string(),
            body: MailBody::Html(html),
            attachments,
        }
    }

    fn wait_time(&mut self) -> Duration {
        let PacingInterval { min, max } = self.plan.pacing;
        self.picker.duration(min.into(), max.into())
    }

    fn record(&mut self, anomaly: Anomaly) {
        warn!("{}", make_single_line(&anomaly.to_string()));
        self.anomalies.push(anomaly);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::path::Path;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Vec<OutgoingMail>,
        refuse: Vec<String>,
    }

    impl MailTransport for RecordingTransport {
        fn send(&mut self, mail: &OutgoingMail) -> anyhow::Result<()> {
            if self.refuse.contains(&mail.to) {
                bail!("connection refused");
            }
            self.sent.push(mail.clone());
            Ok(())
        }
    }

    struct FixedClock(NaiveDateTime);

    impl Clock for FixedClock {
        fn now(&self) -> NaiveDateTime {
            self.0
        }
    }

    #[derive(Default)]
    struct RecordingPause {
        waits: Vec<Duration>,
    }

    impl Pause for RecordingPause {
        fn pause(&mut self, duration: Duration) {
            self.waits.push(duration);
        }
    }

    /// Always the first element and the shortest wait
    struct FirstPicker;

    impl Picker for FirstPicker {
        fn index(&mut self, _len: usize) -> usize {
            0
        }

        fn duration(&mut self, low: Duration, _high: Duration) -> Duration {
            low
        }
    }

    fn at(h: u32, m: u32) -> FixedClock {
        FixedClock(
            NaiveDate::from_ymd_opt(2024, 3, 15)
                .unwrap()
                .and_hms_opt(h, m, 0)
                .unwrap(),
        )
    }

    fn plan(listing: &[&str]) -> DispatchPlan {
        DispatchPlan {
            advisor: Advisor {
                name: "Ana Gómez".to_string(),
                email: "ana@example.com".to_string(),
            },
            subjects: vec!["Certificado de retenciones".to_string(), "Otro".to_string()],
            templates: vec![
                "Hola {{ cliente }}, atte {{ asesor }} <{{ correoAsesor }}>".to_string(),
                "unused".to_string(),
            ],
            documents: DocumentLocator::from_listing(
                Path::new("/docs"),
                listing.iter().map(|s| s.to_string()).collect(),
            ),
            cutoff: CutoffTime::default(),
            pacing: PacingInterval {
                min: 3.into(),
                max: 6.into(),
            },
        }
    }

    struct Harness {
        transport: RecordingTransport,
        pause: RecordingPause,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                transport: RecordingTransport::default(),
                pause: RecordingPause::default(),
            }
        }

        fn run(
            &mut self,
            plan: &DispatchPlan,
            clock: &FixedClock,
            vendors: &[VendorRecord],
        ) -> RunSummary {
            let mut picker = FirstPicker;
            Dispatcher::new(plan, &mut self.transport, clock, &mut self.pause, &mut picker)
                .run(vendors)
        }

        fn outcome(&mut self, plan: &DispatchPlan, vendor: &VendorRecord) -> Outcome {
            let mut picker = FirstPicker;
            let clock = at(9, 0);
            let mut dispatcher =
                Dispatcher::new(plan, &mut self.transport, &clock, &mut self.pause, &mut picker);
            dispatcher.process_vendor(vendor)
        }
    }

    #[test]
    fn invalid_email_is_skipped() {
        // Arrange
        let plan = plan(&["NOTANEMAIL.pdf"]);
        let mut harness = Harness::new();

        // Act
        let actual = harness.outcome(&plan, &VendorRecord::new("Not An Email", "not-an-email"));

        // Assert
        assert_eq!(actual, Outcome::SkippedInvalidEmail);
        assert!(harness.transport.sent.is_empty());
    }

    #[test]
    fn vendor_without_documents_is_skipped() {
        let plan = plan(&["OTHER.pdf"]);
        let mut harness = Harness::new();
        let actual = harness.outcome(&plan, &VendorRecord::new("ACME", "acme@example.com"));
        assert_eq!(actual, Outcome::SkippedNoDocuments);
        assert!(harness.transport.sent.is_empty());
    }

    #[test]
    fn multiple_documents_sent_in_one_message() {
        // Arrange
        let plan = plan(&["ACME_2024.PDF", "acme_recibo.pdf", "OTHER.PDF"]);
        let vendors = [VendorRecord::new("Acme", "acme@example.com")];
        let mut harness = Harness::new();

        // Act
        let summary = harness.run(&plan, &at(9, 0), &vendors);

        // Assert
        assert_eq!(summary.sent_count, 1);
        assert_eq!(harness.transport.sent.len(), 1);
        assert_eq!(
            harness.transport.sent[0].attachments,
            vec![
                Path::new("/docs").join("ACME_2024.PDF"),
                Path::new("/docs").join("acme_recibo.pdf"),
            ]
        );
        assert_eq!(
            summary.anomalies,
            vec![Anomaly::MultipleDocuments {
                vendor: "Acme".to_string(),
                count: 2
            }]
        );
        assert!(summary.anomalies[0].to_string().contains('2'));
    }

    #[test]
    fn message_is_composed_from_picked_template() {
        let plan = plan(&["JUANPEREZ.pdf"]);
        let mut harness = Harness::new();

        harness.run(&plan, &at(9, 0), &[VendorRecord::new("Juan Pérez", "juan@example.com")]);

        let expected = OutgoingMail {
            to: "juan@example.com".to_string(),
            subject: "Certificado de retenciones".to_string(),
            body: MailBody::Html(
                "Hola Juan Pérez, atte Ana Gómez <ana@example.com>".to_string(),
            ),
            attachments: vec![Path::new("/docs").join("JUANPEREZ.pdf")],
        };
        assert_eq!(harness.transport.sent, vec![expected]);
    }

    #[test]
    fn mixed_run_counts_and_orders_anomalies() {
        // Arrange
        let plan = plan(&["VENDORA.pdf"]);
        let vendors = [
            VendorRecord::new("Vendor A", "a@example.com"),
            VendorRecord::new("Vendor B", "not-an-email"),
            VendorRecord::new("Vendor C", "c@example.com"),
        ];
        let mut harness = Harness::new();

        // Act
        let summary = harness.run(&plan, &at(9, 0), &vendors);

        // Assert
        assert_eq!(summary.sent_count, 1);
        assert_eq!(
            summary.anomalies,
            vec![
                Anomaly::InvalidEmail {
                    vendor: "Vendor B".to_string()
                },
                Anomaly::NoDocuments {
                    vendor: "Vendor C".to_string()
                },
            ]
        );
        assert_eq!(harness.pause.waits, vec![Duration::from_secs(3)]);
    }

    #[test]
    fn cutoff_halts_after_first_send() {
        // Arrange
        let plan = plan(&["VENDORA.pdf", "VENDORB.pdf"]);
        let vendors = [
            VendorRecord::new("Vendor A", "a@example.com"),
            VendorRecord::new("Vendor B", "b@example.com"),
            VendorRecord::new("Vendor C", ""),
        ];
        let mut harness = Harness::new();

        // Act
        let summary = harness.run(&plan, &at(17, 31), &vendors);

        // Assert
        assert_eq!(summary.sent_count, 1);
        assert_eq!(harness.transport.sent.len(), 1);
        assert_eq!(
            summary.anomalies,
            vec![Anomaly::CutoffReached {
                cutoff: CutoffTime::default()
            }]
        );
        assert!(harness.pause.waits.is_empty());
    }

    #[test]
    fn skipped_vendors_do_not_check_cutoff() {
        let plan = plan(&[]);
        let vendors = [
            VendorRecord::new("Vendor A", "a@example.com"),
            VendorRecord::new("Vendor B", "b@example.com"),
        ];
        let mut harness = Harness::new();

        let summary = harness.run(&plan, &at(23, 0), &vendors);

        assert_eq!(summary.sent_count, 0);
        assert_eq!(summary.anomalies.len(), 2);
        assert!(summary
            .anomalies
            .iter()
            .all(|a| matches!(a, Anomaly::NoDocuments { .. })));
    }

    #[test]
    fn pauses_between_sends_but_not_after_last() {
        let plan = plan(&["A.pdf", "B.pdf", "C.pdf"]);
        let vendors = [
            VendorRecord::new("A", "a@example.com"),
            VendorRecord::new("B", "b@example.com"),
            VendorRecord::new("C", "c@example.com"),
        ];
        let mut harness = Harness::new();

        let summary = harness.run(&plan, &at(9, 0), &vendors);

        assert_eq!(summary.sent_count, 3);
        assert_eq!(harness.pause.waits, vec![Duration::from_secs(3); 2]);
    }

    #[test]
    fn transport_failure_is_recorded_and_run_continues() {
        // Arrange
        let plan = plan(&["A.pdf", "B.pdf"]);
        let vendors = [
            VendorRecord::new("A", "a@example.com"),
            VendorRecord::new("B", "b@example.com"),
        ];
        let mut harness = Harness::new();
        harness.transport.refuse.push("a@example.com".to_string());

        // Act
        let summary = harness.run(&plan, &at(9, 0), &vendors);

        // Assert
        assert_eq!(summary.sent_count, 1);
        assert_eq!(harness.transport.sent[0].to, "b@example.com");
        assert_eq!(
            summary.anomalies,
            vec![Anomaly::SendFailed {
                vendor: "A".to_string(),
                reason: "connection refused".to_string()
            }]
        );
    }

    #[test]
    fn duplicate_vendors_processed_independently() {
        let plan = plan(&["ACME.pdf"]);
        let vendors = [
            VendorRecord::new("ACME", "one@example.com"),
            VendorRecord::new("ACME", "two@example.com"),
        ];
        let mut harness = Harness::new();

        let summary = harness.run(&plan, &at(9, 0), &vendors);

        assert_eq!(summary.sent_count, 2);
        let recipients: Vec<_> = harness.transport.sent.iter().map(|m| m.to.as_str()).collect();
        assert_eq!(recipients, vec!["one@example.com", "two@example.com"]);
    }

    #[test]
    fn name_without_ascii_letters_matches_every_document() {
        // Arrange
        let plan = plan(&["ACME.pdf", "JUANPEREZ.pdf", "notes.txt"]);
        let vendors = [VendorRecord::new("日本商事", "nihon@example.com")];
        let mut harness = Harness::new();

        // Act
        let summary = harness.run(&plan, &at(9, 0), &vendors);

        // Assert
        assert_eq!(normalize("日本商事"), "");
        assert_eq!(harness.transport.sent[0].attachments.len(), 2);
        assert_eq!(
            summary.anomalies,
            vec![Anomaly::MultipleDocuments {
                vendor: "日本商事".to_string(),
                count: 2
            }]
        );
    }

    #[test]
    fn anomaly_texts() {
        assert_eq!(
            Anomaly::InvalidEmail { vendor: "B".into() }.to_string(),
            "B: no tiene correo válido."
        );
        assert_eq!(
            Anomaly::CutoffReached {
                cutoff: CutoffTime::default()
            }
            .to_string(),
            "Proceso detenido por límite horario (17:30)."
        );
    }
}
