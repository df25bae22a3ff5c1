// Rolling file setup based on https://github.com/estk/log4rs/pull/295

use std::path::Path;

use anyhow::Context;
use log::LevelFilter;
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        rolling_file::{
            policy::compound::{
                roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger, CompoundPolicy,
            },
            RollingFileAppender,
        },
    },
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Handle,
};

const LOG_DIR: &str = "log";
const LOG_FILE_SIZE: u64 = 2 * 1024 * 1024;
const LOG_ARCHIVES: u32 = 10;

/// Logs to stderr at `level` and everything at `level` to a rolling file under `log/`
pub fn init_logging(level: LevelFilter) -> anyhow::Result<Handle> {
    let config = build_config(level, Path::new(LOG_DIR))?;
    let handle = log4rs::init_config(config).context("Failed to init_config")?;
    Ok(handle)
}

fn build_config(level: LevelFilter, dir: &Path) -> anyhow::Result<Config> {
    let file_path = dir.join("cert_mailer.log");
    let archive_pattern = dir.join("cert_mailer_{}.log");
    let archive_pattern = archive_pattern
        .to_str()
        .with_context(|| format!("Log directory {dir:?} is not valid UTF-8"))?;

    // Sends are reported on the console as they happen, so keep it short there
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S)} {h({l})} {m}{n}")))
        .build();

    let roller = FixedWindowRoller::builder()
        .build(archive_pattern, LOG_ARCHIVES)
        .context("Failed to create FixedWindowRoller")?;
    let policy = CompoundPolicy::new(
        Box::new(SizeTrigger::new(LOG_FILE_SIZE)),
        Box::new(roller),
    );
    let log_file = RollingFileAppender::builder()
        // Pattern: https://docs.rs/log4rs/*/log4rs/encode/pattern/index.html
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} {l} {t} - {m}{n}",
        )))
        .build(&file_path, Box::new(policy))
        .with_context(|| format!("Failed to create log file at {file_path:?}"))?;

    Config::builder()
        .appender(Appender::builder().build("log_file", Box::new(log_file)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(level)))
                .build("stderr", Box::new(stderr)),
        )
        .build(
            Root::builder()
                .appender("log_file")
                .appender("stderr")
                .build(level),
        )
        .context("Failed to configure logging")
}
