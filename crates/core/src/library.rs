// crates/core/src/library.rs
//! Filesystem view of the audio library and the produced cuts.
//!
//! Layout:
//! - `<library_dir>/<collection>/<file>`: uploaded or recorded audio
//! - `<output_dir>/<yyyy-MM-dd>/cut_<file>`: cuts grouped by the day they were made
//!
//! Everything here is synchronous. The listings walk whole directories and
//! belong in `tokio::task::spawn_blocking`; the `resolve_*` lookups stat a
//! single path and are cheap enough to call inline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::LibraryError;
use crate::paths::{join_safe, safe_component};
use crate::types::SourceRef;

#[derive(Debug, Clone)]
pub struct AudioLibrary {
    library_dir: PathBuf,
    output_dir: PathBuf,
}

impl AudioLibrary {
    pub fn new(library_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            library_dir: library_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn library_dir(&self) -> &Path {
        &self.library_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Names of the collection folders directly under the library root.
    pub fn collections(&self) -> Result<Vec<String>, LibraryError> {
        entries_at_depth_one(&self.library_dir, EntryKind::Dir)
    }

    /// Files directly inside one collection.
    pub fn collection_files(&self, collection: &str) -> Result<Vec<String>, LibraryError> {
        let dir = join_safe(&self.library_dir, &[collection])?;
        if !dir.is_dir() {
            return Err(LibraryError::not_found(dir));
        }
        entries_at_depth_one(&dir, EntryKind::File)
    }

    /// Every file in the library, as `/`-separated paths relative to the root.
    pub fn all_files(&self) -> Result<Vec<String>, LibraryError> {
        if !self.library_dir.is_dir() {
            return Err(LibraryError::not_found(&self.library_dir));
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.library_dir).min_depth(1) {
            let entry = entry.map_err(|e| walk_error(&self.library_dir, e))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(&self.library_dir) {
                let parts: Vec<String> = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                files.push(parts.join("/"));
            }
        }
        files.sort();
        Ok(files)
    }

    /// Produced cuts keyed by date folder.
    pub fn cuts(&self) -> Result<BTreeMap<String, Vec<String>>, LibraryError> {
        let mut cuts = BTreeMap::new();
        if !self.output_dir.is_dir() {
            return Ok(cuts);
        }
        for folder in entries_at_depth_one(&self.output_dir, EntryKind::Dir)? {
            let files = entries_at_depth_one(&self.output_dir.join(&folder), EntryKind::File)?;
            cuts.insert(folder, files);
        }
        Ok(cuts)
    }

    /// Path of an existing source file.
    pub fn resolve_source(&self, source: &SourceRef) -> Result<PathBuf, LibraryError> {
        let path = match &source.collection {
            Some(collection) => join_safe(&self.library_dir, &[collection, &source.file_name])?,
            None => join_safe(&self.library_dir, &[&source.file_name])?,
        };
        if !path.is_file() {
            return Err(LibraryError::not_found(path));
        }
        Ok(path)
    }

    /// Path of an existing cut.
    pub fn resolve_cut(&self, date_folder: &str, file_name: &str) -> Result<PathBuf, LibraryError> {
        let path = join_safe(&self.output_dir, &[date_folder, file_name])?;
        if !path.is_file() {
            return Err(LibraryError::not_found(path));
        }
        Ok(path)
    }

    /// Destination for an upload, creating the collection folder if needed.
    pub fn upload_path(
        &self,
        collection: Option<&str>,
        file_name: &str,
    ) -> Result<PathBuf, LibraryError> {
        let dir = match collection {
            Some(c) => join_safe(&self.library_dir, &[c])?,
            None => self.library_dir.clone(),
        };
        std::fs::create_dir_all(&dir).map_err(|e| LibraryError::io(&dir, e))?;
        Ok(dir.join(safe_component(file_name)?))
    }

    /// Output reference relative to the cuts root (`yyyy-MM-dd/cut_<file>`).
    pub fn output_ref(&self, output: &Path) -> String {
        output
            .strip_prefix(&self.output_dir)
            .map(|rel| {
                rel.components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_else(|_| output.to_string_lossy().into_owned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Dir,
    File,
}

fn entries_at_depth_one(dir: &Path, kind: EntryKind) -> Result<Vec<String>, LibraryError> {
    if !dir.is_dir() {
        return Err(LibraryError::not_found(dir));
    }
    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| walk_error(dir, e))?;
        let matches = match kind {
            EntryKind::Dir => entry.file_type().is_dir(),
            EntryKind::File => entry.file_type().is_file(),
        };
        if matches {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

fn walk_error(root: &Path, err: walkdir::Error) -> LibraryError {
    let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
    match err.into_io_error() {
        Some(io) => LibraryError::io(path, io),
        None => LibraryError::Io {
            path,
            source: std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop"),
        },
    }
}
