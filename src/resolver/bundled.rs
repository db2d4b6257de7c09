//! Bundled asset store
//!
//! Read-only models shipped next to the executable (`assets/models/`).
//! Reads never change anything, so opening the same path twice yields the
//! same bytes.

use super::{ResolveError, Resolver};
use std::path::{Component, Path, PathBuf};

/// Default directory of bundled models
pub const DEFAULT_BUNDLED_DIR: &str = "assets/models";

/// Manifest written by the build script (one relative path per line)
pub const MANIFEST_FILE: &str = "manifest.txt";

/// Resolver for `bundled://` identifiers
#[derive(Debug, Clone)]
pub struct BundledResolver {
    base_dir: PathBuf,
}

impl Default for BundledResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl BundledResolver {
    pub fn new() -> Self {
        Self::with_dir(DEFAULT_BUNDLED_DIR)
    }

    pub fn with_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve a relative asset path, refusing anything that leaves the store
    fn resolve(&self, path: &str) -> Result<PathBuf, ResolveError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || path.is_empty() {
            return Err(ResolveError::NotFound(path.to_string()));
        }
        Ok(self.base_dir.join(relative))
    }

    /// List bundled files as paths relative to the store
    ///
    /// Uses the build-time manifest when present, otherwise walks the
    /// directory. Manifest lines starting with '#' are comments.
    pub fn list(&self) -> Result<Vec<String>, ResolveError> {
        let manifest = self.base_dir.join(MANIFEST_FILE);
        if manifest.is_file() {
            let contents = std::fs::read_to_string(&manifest)
                .map_err(|e| ResolveError::from_io(MANIFEST_FILE, e))?;
            return Ok(contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string)
                .collect());
        }

        let mut files = Vec::new();
        let mut pending = vec![PathBuf::new()];
        while let Some(relative) = pending.pop() {
            let dir = self.base_dir.join(&relative);
            let entries = std::fs::read_dir(&dir)
                .map_err(|e| ResolveError::from_io(&dir.to_string_lossy(), e))?;

            for entry in entries.filter_map(|e| e.ok()) {
                let child = relative.join(entry.file_name());
                let path = entry.path();
                if path.is_dir() {
                    pending.push(child);
                } else if path.is_file() && entry.file_name() != MANIFEST_FILE {
                    // Identifiers always use forward slashes
                    let name: Vec<String> = child
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    files.push(name.join("/"));
                }
            }
        }

        files.sort();
        Ok(files)
    }
}

impl Resolver for BundledResolver {
    fn open(&self, path: &str) -> Result<Vec<u8>, ResolveError> {
        let full_path = self.resolve(path)?;
        std::fs::read(&full_path).map_err(|e| ResolveError::from_io(path, e))
    }
}
