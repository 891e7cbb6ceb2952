//! CSV export of a draw for record keeping.
//!
//! Only receiver names are written, never who gives to whom, so the file can
//! be kept or printed without spoiling the draw.

use anyhow::{Context, Result};
use std::path::Path;

use super::draw::Pairing;

const HEADER: &str = "Receiver";

/// Characters that make spreadsheet software treat a cell as a formula.
const FORMULA_PREFIXES: [char; 4] = ['=', '+', '-', '@'];

/// Escape a single CSV field.
///
/// Formula-looking fields get a leading `'`; fields with separators, quotes
/// or line breaks are quoted with inner quotes doubled.
pub fn escape_field(field: &str) -> String {
    let mut value = String::with_capacity(field.len() + 3);
    if field.starts_with(FORMULA_PREFIXES) {
        value.push('\'');
    }
    value.push_str(field);

    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value
    }
}

pub fn receivers_csv(pairings: &[Pairing]) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for pairing in pairings {
        out.push_str(&escape_field(&pairing.receiver.name));
        out.push('\n');
    }
    out
}

pub fn write_receivers_csv(path: &Path, pairings: &[Pairing]) -> Result<()> {
    std::fs::write(path, receivers_csv(pairings))
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), rows = pairings.len(), "exported receivers");
    Ok(())
}
