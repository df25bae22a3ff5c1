use std::path::Path;

use anyhow::{bail, Context};
use calamine::{open_workbook_auto, Data, Reader};
use log::debug;

const NAME_HEADER: &str = "proveedor";
const EMAIL_HEADER: &str = "correo";

/// A recipient of a withholding certificate as read from the vendor sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorRecord {
    pub name: String,

    /// May be empty when the sheet has no email for this vendor
    pub email: String,
}

impl VendorRecord {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Reads vendor records from the first worksheet of the workbook at `path`
pub fn load_vendors(path: &Path) -> anyhow::Result<Vec<VendorRecord>> {
    debug!("Loading vendors from: {path:?}");
    let mut workbook =
        open_workbook_auto(path).with_context(|| format!("Failed to open workbook {path:?}"))?;
    let range = workbook
        .worksheet_range_at(0)
        .with_context(|| format!("Workbook {path:?} has no worksheets"))?
        .with_context(|| format!("Failed to read first worksheet of {path:?}"))?;

    let rows = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    let result = records_from_rows(rows).with_context(|| format!("Invalid vendor sheet {path:?}"))?;
    debug!("Loaded {} vendors from {path:?}", result.len());
    Ok(result)
}

/// Builds vendor records from a header row followed by data rows
///
/// Header cells are matched trimmed and case-insensitively. Rows without a vendor
/// name are dropped, a missing email is kept as an empty string.
pub fn records_from_rows<I>(rows: I) -> anyhow::Result<Vec<VendorRecord>>
where
    I: IntoIterator<Item = Vec<Option<String>>>,
{
    let mut rows = rows.into_iter();
    let Some(header) = rows.next() else {
        bail!("sheet is empty, expected a header row");
    };

    let column_of = |wanted: &str| {
        header.iter().position(|cell| {
            cell.as_deref()
                .is_some_and(|text| text.trim().to_lowercase() == wanted)
        })
    };
    let Some(name_col) = column_of(NAME_HEADER) else {
        bail!("no {NAME_HEADER:?} column in header {header:?}");
    };
    let Some(email_col) = column_of(EMAIL_HEADER) else {
        bail!("no {EMAIL_HEADER:?} column in header {header:?}");
    };

    let result = rows
        .filter_map(|mut row| {
            let name = row.get_mut(name_col).and_then(Option::take)?;
            let email = row.get_mut(email_col).and_then(Option::take);
            Some(VendorRecord::new(name, email.unwrap_or_default()))
        })
        .collect();
    Ok(result)
}

/// Trimmed text of a cell, `None` for empty, blank or error cells
fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty | Data::Error(_) => return None,
        Data::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
