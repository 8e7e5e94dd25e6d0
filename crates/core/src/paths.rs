//! Centralized path functions for library and cut storage locations.
//!
//! Single source of truth for where uploads live, where cuts land, and how a
//! user-supplied name is turned into a path without escaping its root.

use std::path::{Component, Path, PathBuf};

use chrono::NaiveDate;

use crate::error::LibraryError;

/// Default storage root: `~/.local/share/audiocut/` (Linux) or the platform equivalent.
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("audiocut"))
}

/// Default audio library root: `<app_data_dir>/library/`.
pub fn default_library_dir() -> Option<PathBuf> {
    app_data_dir().map(|d| d.join("library"))
}

/// Default cut output root: `<app_data_dir>/cuts/`.
pub fn default_output_dir() -> Option<PathBuf> {
    app_data_dir().map(|d| d.join("cuts"))
}

/// Folder name a cut made on `date` is grouped under (`yyyy-MM-dd`).
pub fn date_folder(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// File name of the cut produced from `source_file_name`.
pub fn cut_file_name(source_file_name: &str) -> String {
    format!("cut_{source_file_name}")
}

/// Check that `name` is a single plain path component.
///
/// Rejects empty names, `.`/`..`, absolute paths and anything containing a
/// separator, so joining the result onto a root can never leave that root.
pub fn safe_component(name: &str) -> Result<&str, LibraryError> {
    let invalid = || LibraryError::InvalidName {
        name: name.to_string(),
    };
    if name.is_empty() || name.contains('/') || name.contains('\\') {
        return Err(invalid());
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => Err(invalid()),
    }
}

/// `root/<a>/<b>/...` with every part checked by [`safe_component`].
pub fn join_safe(root: &Path, parts: &[&str]) -> Result<PathBuf, LibraryError> {
    let mut path = root.to_path_buf();
    for part in parts {
        path.push(safe_component(part)?);
    }
    Ok(path)
}
