//! Local filesystem resolver
//!
//! Reads `local://` identifiers from the filesystem. Relative paths are
//! resolved against a base directory; absolute paths are used as-is.
//! All operations complete immediately (synchronous).

use super::{ResolveError, Resolver};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Runtime permission to read the filesystem
///
/// Cloned handles share one flag. Asking the user and calling `grant`
/// happens out-of-band; the resolver only checks the flag.
#[derive(Debug, Clone)]
pub struct StorageGrant {
    granted: Arc<AtomicBool>,
}

impl StorageGrant {
    /// A grant that is already given
    pub fn granted() -> Self {
        Self {
            granted: Arc::new(AtomicBool::new(true)),
        }
    }

    /// A grant that still has to be requested
    pub fn pending() -> Self {
        Self {
            granted: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn grant(&self) {
        self.granted.store(true, Ordering::SeqCst);
    }

    pub fn revoke(&self) {
        self.granted.store(false, Ordering::SeqCst);
    }

    pub fn is_granted(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }
}

/// Resolver for `local://` identifiers
#[derive(Debug, Clone)]
pub struct LocalResolver {
    /// Base directory for relative paths (usually current working directory)
    base_dir: PathBuf,
    grant: Option<StorageGrant>,
}

impl Default for LocalResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalResolver {
    /// Create a resolver rooted at the current directory
    pub fn new() -> Self {
        Self::with_base_dir(".")
    }

    /// Create a resolver with a custom base directory
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            grant: None,
        }
    }

    /// Require `grant` before any read
    pub fn with_grant(mut self, grant: StorageGrant) -> Self {
        self.grant = Some(grant);
        self
    }

    /// Resolve a path relative to the base directory
    fn resolve(&self, path: &str) -> PathBuf {
        self.base_dir.join(path)
    }

    /// Check if a file exists (ignores the grant)
    pub fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }
}

impl Resolver for LocalResolver {
    fn open(&self, path: &str) -> Result<Vec<u8>, ResolveError> {
        if let Some(grant) = &self.grant {
            if !grant.is_granted() {
                return Err(ResolveError::PermissionRequired(path.to_string()));
            }
        }

        let full_path = self.resolve(path);
        if full_path.is_dir() {
            return Err(ResolveError::Unreadable(format!("{}: is a directory", path)));
        }

        std::fs::read(&full_path).map_err(|e| ResolveError::from_io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_dir() -> (TempDir, LocalResolver) {
        let dir = TempDir::new().unwrap();
        let resolver = LocalResolver::with_base_dir(dir.path());
        (dir, resolver)
    }

    #[test]
    fn test_read_relative() {
        let (dir, resolver) = setup_test_dir();
        std::fs::write(dir.path().join("model.obj"), b"v 0 0 0").unwrap();

        assert_eq!(resolver.open("model.obj").unwrap(), b"v 0 0 0");
        assert!(resolver.exists("model.obj"));
    }

    #[test]
    fn test_read_absolute() {
        let (dir, _) = setup_test_dir();
        let path = dir.path().join("abs.stl");
        std::fs::write(&path, b"solid").unwrap();

        // Base directory is ignored for absolute paths
        let resolver = LocalResolver::with_base_dir("/nonexistent-base");
        assert_eq!(resolver.open(&path.to_string_lossy()).unwrap(), b"solid");
    }

    #[test]
    fn test_read_not_found() {
        let (_dir, resolver) = setup_test_dir();

        let result = resolver.open("nonexistent.obj");
        assert!(matches!(result, Err(ResolveError::NotFound(_))));
        assert!(!resolver.exists("nonexistent.obj"));
    }

    #[test]
    fn test_directory_is_unreadable() {
        let (dir, resolver) = setup_test_dir();
        std::fs::create_dir(dir.path().join("subdir")).unwrap();

        assert!(matches!(resolver.open("subdir"), Err(ResolveError::Unreadable(_))));
    }

    #[test]
    fn test_grant_required() {
        let (dir, resolver) = setup_test_dir();
        std::fs::write(dir.path().join("model.obj"), b"v 0 0 0").unwrap();

        let grant = StorageGrant::pending();
        let resolver = resolver.with_grant(grant.clone());

        assert_eq!(
            resolver.open("model.obj"),
            Err(ResolveError::PermissionRequired("model.obj".to_string()))
        );

        grant.grant();
        assert_eq!(resolver.open("model.obj").unwrap(), b"v 0 0 0");

        grant.revoke();
        assert!(matches!(
            resolver.open("model.obj"),
            Err(ResolveError::PermissionRequired(_))
        ));
    }
}
