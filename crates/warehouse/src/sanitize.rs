//! Column name sanitization for warehouse tables.
//!
//! Warehouse column names may only contain ASCII letters, digits and
//! underscores and must not start with a digit.

use crate::error::UploadError;
use std::collections::HashSet;
use std::path::Path;

/// Maps a column name onto the warehouse naming rules.
///
/// Disallowed characters become `_`, letters are lower-cased, a leading
/// digit gets a `_` prefix, and an empty name becomes `column`.
#[must_use]
pub fn sanitize_column_name(name: &str) -> String {
    let mut out: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();

    if out.is_empty() {
        out.push_str("column");
    } else if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Sanitizes a whole header. Names that collide after sanitization get
/// `_2`, `_3`, ... suffixes in order of appearance.
#[must_use]
pub fn sanitize_header<S: AsRef<str>>(columns: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    columns
        .iter()
        .map(|c| {
            let base = sanitize_column_name(c.as_ref());
            let mut candidate = base.clone();
            let mut n = 2;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{base}_{n}");
                n += 1;
            }
            candidate
        })
        .collect()
}

/// A table re-encoded for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTable {
    /// CSV text with a sanitized header
    pub csv: String,
    pub rows: usize,
    pub columns: Vec<String>,
}

/// Reads `content` as CSV and re-encodes it with a sanitized header.
///
/// # Errors
/// [`UploadError::Io`] if the content is not valid CSV.
pub fn prepare_csv(path: &Path, content: &str) -> Result<PreparedTable, UploadError> {
    let io_err = |e: csv::Error| UploadError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let header: Vec<String> = reader
        .headers()
        .map_err(io_err)?
        .iter()
        .map(str::to_string)
        .collect();
    let columns = sanitize_header(&header);

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&columns).map_err(io_err)?;

    let mut rows = 0;
    for record in reader.records() {
        writer.write_record(&record.map_err(io_err)?).map_err(io_err)?;
        rows += 1;
    }

    let bytes = writer.into_inner().map_err(|e| UploadError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let csv = String::from_utf8(bytes).map_err(|e| UploadError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    Ok(PreparedTable { csv, rows, columns })
}
