//! Destination naming helpers.
//!
//! The engine requires a destination that nothing else is writing to; callers
//! use [`resolve_unique_path`] to pick one before constructing a transfer.

use std::path::{Path, PathBuf};

/// Sanitizes a filename for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        return "download.bin".to_string();
    }
    sanitized
}

/// Resolves a destination path in `dir` that does not exist yet.
///
/// `report.pdf` becomes `report (1).pdf`, then `report (2).pdf`, and so on.
#[must_use]
pub fn resolve_unique_path(dir: &Path, filename: &str) -> PathBuf {
    let filename = sanitize_filename(filename);
    let base_path = dir.join(&filename);
    if !base_path.exists() {
        return base_path;
    }

    // A leading dot is a hidden file, not an extension.
    let (stem, ext) = match filename.rfind('.') {
        Some(pos) if pos > 0 => (&filename[..pos], &filename[pos..]),
        _ => (filename.as_str(), ""),
    };

    let mut counter: u64 = 1;
    loop {
        let candidate = dir.join(format!("{stem} ({counter}){ext}"));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}
