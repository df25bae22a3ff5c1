use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use log::{debug, warn};

const DOCUMENT_EXTENSION: &str = ".PDF";

/// Returns the filenames in `listing` that are PDFs and start with `normalized_key`
///
/// Both checks are done on the upper-cased filename. The key is a prefix, so "ACME"
/// matches "ACME.PDF" as well as "ACMECORP_2024.PDF". Result is sorted by filename.
pub fn find_documents<S: AsRef<str>>(normalized_key: &str, listing: &[S]) -> BTreeSet<String> {
    listing
        .iter()
        .map(|filename| -> &str { filename.as_ref() })
        .filter(|filename| {
            let upper = filename.to_uppercase();
            upper.ends_with(DOCUMENT_EXTENSION) && upper.starts_with(normalized_key)
        })
        .map(str::to_string)
        .collect()
}

/// Snapshot of the document directory taken once at the start of a run
#[derive(Debug, Clone)]
pub struct DocumentLocator {
    dir: PathBuf,
    listing: Vec<String>,
}

impl DocumentLocator {
    pub fn scan(dir: &Path) -> anyhow::Result<Self> {
        debug!("Scanning document directory: {dir:?}");
        let entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to read document directory {dir:?}"))?;

        let mut listing = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| format!("Failed to read entry in {dir:?}"))?;
            let file_type = entry
                .file_type()
                .with_context(|| format!("Failed to get file type of {:?}", entry.path()))?;
            if file_type.is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => listing.push(name),
                Err(name) => warn!("Ignoring document with non UTF-8 name: {name:?}"),
            }
        }
        listing.sort();
        debug!("Found {} files in {dir:?}", listing.len());
        Ok(Self::from_listing(dir, listing))
    }

    pub fn from_listing(dir: &Path, listing: Vec<String>) -> Self {
        Self {
            dir: dir.to_path_buf(),
            listing,
        }
    }

    /// Full paths of the documents matching `normalized_key`, sorted by filename
    pub fn locate(&self, normalized_key: &str) -> Vec<PathBuf> {
        find_documents(normalized_key, &self.listing)
            .into_iter()
            .map(|filename| self.dir.join(filename))
            .collect()
    }
}
