// SPDX-License-Identifier: MIT OR Apache-2.0
//! Search paths and library loading.

use crate::document::Document;
use crate::error::CoreError;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Extension of library and document files
pub const LIBRARY_EXTENSION: &str = "ron";

/// Environment variable holding extra search roots
pub const SEARCH_PATH_ENV: &str = "ORDOPLAY_MATERIALX_SEARCH_PATH";

/// Ordered list of directories used to resolve relative file names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSearchPath {
    paths: Vec<PathBuf>,
}

impl FileSearchPath {
    /// Create an empty search path
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a search path from a platform path list in an environment
    /// variable. An unset variable yields an empty search path.
    pub fn from_env(var: &str) -> Self {
        let paths = std::env::var_os(var)
            .map(|value| std::env::split_paths(&value).collect())
            .unwrap_or_default();
        Self { paths }
    }

    /// Add a root at the end
    pub fn append(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    /// Add a root at the front
    pub fn prepend(&mut self, path: impl Into<PathBuf>) {
        self.paths.insert(0, path.into());
    }

    /// Add every root of another search path at the end
    pub fn extend(&mut self, other: &FileSearchPath) {
        self.paths.extend(other.paths.iter().cloned());
    }

    /// Registered roots
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Whether no roots are registered
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Resolve a file or directory name.
    ///
    /// Absolute paths are returned when they exist; relative paths are
    /// tried against each root in order, then against the working
    /// directory.
    pub fn find(&self, name: impl AsRef<Path>) -> Result<PathBuf, CoreError> {
        let name = name.as_ref();
        if name.is_absolute() {
            return if name.exists() {
                Ok(name.to_path_buf())
            } else {
                Err(CoreError::FileNotFound(name.to_path_buf()))
            };
        }

        self.paths
            .iter()
            .map(|root| root.join(name))
            .find(|candidate| candidate.exists())
            .or_else(|| name.exists().then(|| name.to_path_buf()))
            .ok_or_else(|| CoreError::FileNotFound(name.to_path_buf()))
    }

    /// Read a file resolved through the search path
    pub fn read_to_string(&self, name: impl AsRef<Path>) -> Result<String, CoreError> {
        let path = self.find(name)?;
        std::fs::read_to_string(&path).map_err(|source| CoreError::Io { path, source })
    }
}

/// Outcome of loading libraries into a document
#[derive(Debug, Clone, Default)]
pub struct LibraryLoadReport {
    /// Files imported
    pub loaded: Vec<PathBuf>,
    /// Skipped elements whose name was already present
    pub conflicts: Vec<String>,
    /// Per-file failures
    pub errors: Vec<String>,
}

impl LibraryLoadReport {
    /// Whether every file loaded without conflicts
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty() && self.errors.is_empty()
    }
}

/// Documents loaded from a directory tree
#[derive(Debug, Clone, Default)]
pub struct DocumentBatch {
    /// Loaded documents with their paths
    pub documents: Vec<(PathBuf, Document)>,
    /// Per-file failures
    pub errors: Vec<String>,
}

fn library_files(root: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e: Result<walkdir::DirEntry, walkdir::Error>| e.ok())
        .filter(|e: &walkdir::DirEntry| e.file_type().is_file())
        .filter(|e| e.path().extension() == Some(OsStr::new(LIBRARY_EXTENSION)))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Load named libraries into a document.
///
/// Each name is resolved through the search path and scanned recursively
/// for library files. Elements that conflict with ones already present
/// are skipped and reported; files that fail to load are reported and the
/// remaining files are still loaded.
pub fn load_libraries(names: &[&str], search_path: &FileSearchPath, document: &mut Document) -> LibraryLoadReport {
    let mut report = LibraryLoadReport::default();

    for name in names {
        let root = match search_path.find(name) {
            Ok(root) => root,
            Err(e) => {
                tracing::warn!("Library not found: {}", name);
                report.errors.push(format!("Failed to load: {name}. Error: {e}"));
                continue;
            }
        };

        for file in library_files(&root) {
            match Document::load(&file) {
                Ok(library) => {
                    let conflicts = document.import_library(&library);
                    for conflict in &conflicts {
                        tracing::warn!("Skipped conflicting {} from {:?}", conflict, file);
                    }
                    report.conflicts.extend(conflicts);
                    tracing::debug!("Loaded library file {:?}", file);
                    report.loaded.push(file);
                }
                Err(e) => {
                    tracing::warn!("Failed to load library file {:?}: {}", file, e);
                    report
                        .errors
                        .push(format!("Failed to load: {}. Error: {e}", file.display()));
                }
            }
        }
    }

    tracing::info!(
        "Loaded {} library files ({} conflicts, {} errors)",
        report.loaded.len(),
        report.conflicts.len(),
        report.errors.len()
    );
    report
}

/// Load every document under a directory, skipping files whose name is in
/// `skip_files`. Failures are collected and loading continues.
pub fn load_documents(root: &Path, skip_files: &[&str]) -> DocumentBatch {
    let mut batch = DocumentBatch::default();

    for file in library_files(root) {
        let skipped = file
            .file_name()
            .and_then(OsStr::to_str)
            .is_some_and(|name| skip_files.contains(&name));
        if skipped {
            continue;
        }
        match Document::load(&file) {
            Ok(doc) => batch.documents.push((file, doc)),
            Err(e) => {
                tracing::warn!("Failed to load document {:?}: {}", file, e);
                batch
                    .errors
                    .push(format!("Failed to load: {}. Error: {e}", file.display()));
            }
        }
    }

    batch
}
