use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use log::debug;
use serde::{de::DeserializeOwned, Deserialize};

use crate::{dispatch::Advisor, notification::SmtpSettings, CutoffTime, Seconds};

const DEFAULT_REPORT_SUBJECT: &str = "reporte envio correo de retenciones";

#[derive(Debug, Deserialize)]
pub struct Config {
    /// JSON file with the advisor's name and email
    pub advisor_file: PathBuf,

    /// JSON file with the pool of subject lines
    pub subjects_file: PathBuf,

    /// Directory of HTML body templates
    pub templates_dir: PathBuf,

    /// Workbook listing the vendors
    pub vendors_file: PathBuf,

    /// Directory searched for the per vendor PDF documents
    pub documents_dir: PathBuf,

    /// Address every message is sent from
    pub sender: String,

    /// Operator that receives the summary report
    pub report_recipient: String,

    #[serde(default = "Config::default_report_subject")]
    pub report_subject: String,

    /// No further sends once this time of day has passed
    #[serde(default)]
    pub cutoff: CutoffTime,

    /// Bounds of the random wait between sends
    #[serde(default)]
    pub pacing: PacingInterval,

    pub transport: TransportSettings,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct PacingInterval {
    pub min: Seconds,
    pub max: Seconds,
}

impl Default for PacingInterval {
    fn default() -> Self {
        Self {
            min: 3.into(),
            max: 6.into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransportSettings {
    Smtp(SmtpSettings),
    Outbox { dir: PathBuf },
}

#[derive(Debug, Deserialize)]
struct AdvisorFile {
    #[serde(rename = "asesor", alias = "advisorName")]
    name: String,

    #[serde(rename = "correoAsesor", alias = "advisorEmail")]
    email: String,
}

#[derive(Debug, Deserialize)]
struct SubjectsFile {
    subjects: Vec<String>,
}

impl Config {
    pub fn load_from(config_path: &Path) -> anyhow::Result<Config> {
        debug!("Loading Config from: {config_path:?}");
        let mut result: Config = read_json(config_path)?;
        let base = config_path.parent().unwrap_or(Path::new(""));
        result.resolve_paths(base);
        result.validate()?;
        Ok(result)
    }

    fn default_report_subject() -> String {
        DEFAULT_REPORT_SUBJECT.to_string()
    }

    /// Makes relative paths relative to the directory holding the config file
    fn resolve_paths(&mut self, base: &Path) {
        for path in [
            &mut self.advisor_file,
            &mut self.subjects_file,
            &mut self.templates_dir,
            &mut self.vendors_file,
            &mut self.documents_dir,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        if let TransportSettings::Outbox { dir } = &mut self.transport {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.pacing.min > self.pacing.max {
            bail!(
                "pacing min ({}s) is greater than pacing max ({}s)",
                self.pacing.min,
                self.pacing.max
            );
        }
        if !self.report_recipient.contains('@') {
            bail!("report_recipient {:?} is not an email address", self.report_recipient);
        }
        Ok(())
    }

    pub fn load_advisor(&self) -> anyhow::Result<Advisor> {
        let AdvisorFile { name, email } = read_json(&self.advisor_file)?;
        Ok(Advisor { name, email })
    }

    pub fn load_subjects(&self) -> anyhow::Result<Vec<String>> {
        let SubjectsFile { subjects } = read_json(&self.subjects_file)?;
        if subjects.is_empty() {
            bail!("No subjects found in {:?}", self.subjects_file);
        }
        Ok(subjects)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file_contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read contents of {path:?}"))?;
    let result = serde_json::from_str(&file_contents)
        .with_context(|| format!("Failed to parse contents of {path:?}"))?;
    Ok(result)
}
