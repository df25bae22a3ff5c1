use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context};
use log::debug;
use rand::{rngs::ThreadRng, Rng};

pub const VENDOR_PLACEHOLDER: &str = "{{ cliente }}";
pub const ADVISOR_PLACEHOLDER: &str = "{{ asesor }}";
pub const ADVISOR_EMAIL_PLACEHOLDER: &str = "{{ correoAsesor }}";

/// Source of the random choices made during a run
pub trait Picker {
    /// An index in `0..len`, `len` is never zero
    fn index(&mut self, len: usize) -> usize;

    /// A duration in `low..=high`
    fn duration(&mut self, low: Duration, high: Duration) -> Duration;
}

/// Picks one element of `pool`, `None` only if the pool is empty
pub fn pick<'a, T>(picker: &mut dyn Picker, pool: &'a [T]) -> Option<&'a T> {
    if pool.is_empty() {
        return None;
    }
    pool.get(picker.index(pool.len()))
}

/// Uniform choices backed by a `rand` generator
#[derive(Debug, Default)]
pub struct RandomPicker<R = ThreadRng> {
    rng: R,
}

impl<R: Rng> RandomPicker<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> Picker for RandomPicker<R> {
    fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    fn duration(&mut self, low: Duration, high: Duration) -> Duration {
        if low >= high {
            return low;
        }
        self.rng.gen_range(low..=high)
    }
}

/// Reads every `.html` file of `dir` in filename order
pub fn load_templates(dir: &Path) -> anyhow::Result<Vec<String>> {
    debug!("Loading templates from: {dir:?}");
    let mut paths = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("Failed to read template directory {dir:?}"))?
    {
        let path = entry
            .with_context(|| format!("Failed to read entry in {dir:?}"))?
            .path();
        let is_html = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("html"));
        if is_html && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut result = Vec::with_capacity(paths.len());
    for path in paths {
        debug!("Loading template: {path:?}");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read template {path:?}"))?;
        result.push(contents);
    }
    if result.is_empty() {
        bail!("No .html templates found in {dir:?}");
    }
    Ok(result)
}

/// Replaces the literal placeholders of `template`, unknown placeholders are kept as is
pub fn fill_template(
    template: &str,
    vendor_name: &str,
    advisor_name: &str,
    advisor_email: &str,
) -> String {
    template
        .replace(VENDOR_PLACEHOLDER, vendor_name)
        .replace(ADVISOR_PLACEHOLDER, advisor_name)
        .replace(ADVISOR_EMAIL_PLACEHOLDER, advisor_email)
}
