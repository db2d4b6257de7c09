//! Resolver Registry
//!
//! Scheme-based dispatch from a `ScopedIdentifier` to the bytes it names:
//! - `bundled://*` → read-only asset directory shipped with the application
//! - `local://*` → mounted filesystem (optionally behind a runtime grant)
//! - `external://*` → content handed over by an external picker
//!
//! The registry is built once and never changes afterwards. It holds no
//! per-resource state: each `open` is exactly one attempt by one resolver.

pub mod async_ops;
pub mod bundled;
pub mod external;
pub mod local;

use crate::config::IntakeConfig;
use crate::identifier::{ScopedIdentifier, BUNDLED_SCHEME, EXTERNAL_SCHEME, LOCAL_SCHEME};
use bundled::BundledResolver;
use external::{ExternalResolver, ProvidedDocuments};
use local::{LocalResolver, StorageGrant};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub use async_ops::{open_async, OpenResult, PendingOpen};

/// Resolution failures
///
/// Everything except `UnsupportedScheme` comes from a resolver and is passed
/// through the registry unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No resolver is registered for the scheme
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),
    /// The resource does not exist
    #[error("not found: {0}")]
    NotFound(String),
    /// The source refused access
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// Access needs a runtime grant the caller has to obtain first
    #[error("permission required: {0}")]
    PermissionRequired(String),
    /// The resource exists but could not be read
    #[error("unreadable: {0}")]
    Unreadable(String),
}

impl ResolveError {
    /// Map an I/O failure on `path` to a resolution error by kind
    pub fn from_io(path: &str, e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => ResolveError::NotFound(path.to_string()),
            std::io::ErrorKind::PermissionDenied => {
                ResolveError::PermissionDenied(format!("{}: {}", path, e))
            }
            _ => ResolveError::Unreadable(format!("{}: {}", path, e)),
        }
    }
}

/// Turns the path of a scheme-qualified identifier into bytes
pub trait Resolver: Send + Sync {
    fn open(&self, path: &str) -> Result<Vec<u8>, ResolveError>;
}

/// Read-only table from scheme tag to resolver
pub struct ResolverRegistry {
    resolvers: HashMap<String, Arc<dyn Resolver>>,
}

impl fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

impl ResolverRegistry {
    pub fn builder() -> ResolverRegistryBuilder {
        ResolverRegistryBuilder::default()
    }

    /// Read the resource named by `identifier`
    ///
    /// Fails with `UnsupportedScheme` without touching any resolver when the
    /// scheme is unknown; otherwise returns whatever the resolver returns.
    pub fn open(&self, identifier: &ScopedIdentifier) -> Result<Vec<u8>, ResolveError> {
        let Some(resolver) = self.resolvers.get(identifier.scheme()) else {
            log::debug!("open {}: no resolver for scheme", identifier);
            return Err(ResolveError::UnsupportedScheme(identifier.scheme().to_string()));
        };

        let result = resolver.open(identifier.path());
        match &result {
            Ok(data) => log::debug!("open {}: {} bytes", identifier, data.len()),
            Err(e) => log::debug!("open {}: {}", identifier, e),
        }
        result
    }

    /// Check whether a resolver is registered for `scheme`
    pub fn supports(&self, scheme: &str) -> bool {
        self.resolvers.contains_key(&scheme.to_ascii_lowercase())
    }

    /// Registered scheme tags, sorted
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.resolvers.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }
}

/// Collects resolvers before the registry is frozen
#[derive(Default)]
pub struct ResolverRegistryBuilder {
    resolvers: HashMap<String, Arc<dyn Resolver>>,
}

impl ResolverRegistryBuilder {
    /// Register a resolver for `scheme`, replacing any earlier one
    pub fn register(self, scheme: &str, resolver: impl Resolver + 'static) -> Self {
        self.register_shared(scheme, Arc::new(resolver))
    }

    /// Register a resolver that is also held elsewhere
    pub fn register_shared(mut self, scheme: &str, resolver: Arc<dyn Resolver>) -> Self {
        let scheme = scheme.to_ascii_lowercase();
        if self.resolvers.insert(scheme.clone(), resolver).is_some() {
            log::warn!("Resolver for scheme '{}' registered twice, keeping the last one", scheme);
        }
        self
    }

    pub fn build(self) -> ResolverRegistry {
        ResolverRegistry {
            resolvers: self.resolvers,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Standard sources
// ─────────────────────────────────────────────────────────────────────────────

/// The three standard sources wired into one registry
///
/// Keeps handles to the pieces the presentation layer still needs after
/// start-up: the bundled store (for listing), the provided-documents table
/// (to hand over picked files) and the storage grant.
pub struct Sources {
    registry: Arc<ResolverRegistry>,
    bundled: Arc<BundledResolver>,
    documents: Arc<ProvidedDocuments>,
    storage_grant: StorageGrant,
}

impl Sources {
    pub fn from_config(config: &IntakeConfig) -> Self {
        let bundled = Arc::new(BundledResolver::with_dir(&config.bundled_dir));
        let documents = Arc::new(ProvidedDocuments::new());
        let storage_grant = if config.require_storage_grant {
            StorageGrant::pending()
        } else {
            StorageGrant::granted()
        };

        let local = LocalResolver::with_base_dir(&config.local_base_dir)
            .with_grant(storage_grant.clone());
        let external = ExternalResolver::new(documents.clone());

        let registry = ResolverRegistry::builder()
            .register_shared(BUNDLED_SCHEME, bundled.clone())
            .register(LOCAL_SCHEME, local)
            .register(EXTERNAL_SCHEME, external)
            .build();

        log::info!(
            "Resolver registry ready: {} (bundled dir {})",
            registry.schemes().join(", "),
            config.bundled_dir.display()
        );

        Self {
            registry: Arc::new(registry),
            bundled,
            documents,
            storage_grant,
        }
    }

    pub fn registry(&self) -> Arc<ResolverRegistry> {
        self.registry.clone()
    }

    pub fn bundled(&self) -> &BundledResolver {
        &self.bundled
    }

    pub fn documents(&self) -> &ProvidedDocuments {
        &self.documents
    }

    pub fn storage_grant(&self) -> &StorageGrant {
        &self.storage_grant
    }
}

lazy_static::lazy_static! {
    static ref GLOBAL: Sources = Sources::from_config(&IntakeConfig::load_or_default());
}

/// Process-wide sources, built from the user configuration on first use
pub fn global() -> &'static Sources {
    &GLOBAL
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Resolver that counts its calls and always returns the same bytes
    struct CountingResolver {
        calls: Arc<AtomicUsize>,
    }

    impl Resolver for CountingResolver {
        fn open(&self, path: &str) -> Result<Vec<u8>, ResolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if path == "missing" {
                return Err(ResolveError::NotFound(path.to_string()));
            }
            Ok(path.as_bytes().to_vec())
        }
    }

    fn counting_registry() -> (ResolverRegistry, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = ResolverRegistry::builder()
            .register(
                "bundled",
                CountingResolver {
                    calls: calls.clone(),
                },
            )
            .build();
        (registry, calls)
    }

    #[test]
    fn test_unsupported_scheme_never_reaches_a_resolver() {
        let (registry, calls) = counting_registry();

        let result = registry.open(&ScopedIdentifier::new("ftp", "model.obj").unwrap());
        assert_eq!(result, Err(ResolveError::UnsupportedScheme("ftp".to_string())));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_resolver_errors_pass_through() {
        let (registry, calls) = counting_registry();

        let result = registry.open(&ScopedIdentifier::bundled("missing"));
        assert_eq!(result, Err(ResolveError::NotFound("missing".to_string())));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_each_open_is_one_attempt() {
        let (registry, calls) = counting_registry();
        let id = ScopedIdentifier::bundled("cube.obj");

        assert_eq!(registry.open(&id).unwrap(), b"cube.obj");
        assert_eq!(registry.open(&id).unwrap(), b"cube.obj");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_schemes_are_case_insensitive() {
        let (registry, _) = counting_registry();
        assert!(registry.supports("BUNDLED"));
        assert!(!registry.supports("local"));
        assert_eq!(registry.schemes(), vec!["bundled"]);
    }

    #[test]
    fn test_io_error_mapping() {
        let e = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(
            ResolveError::from_io("a.obj", e),
            ResolveError::NotFound("a.obj".to_string())
        );

        let e = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no");
        assert!(matches!(
            ResolveError::from_io("a.obj", e),
            ResolveError::PermissionDenied(_)
        ));

        let e = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad");
        assert!(matches!(
            ResolveError::from_io("a.obj", e),
            ResolveError::Unreadable(_)
        ));
    }

    #[test]
    fn test_standard_sources_from_config() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("part.stl"), b"solid part").unwrap();

        let config = IntakeConfig {
            bundled_dir: dir.path().to_path_buf(),
            local_base_dir: dir.path().to_path_buf(),
            require_storage_grant: true,
        };
        let sources = Sources::from_config(&config);
        let registry = sources.registry();

        assert_eq!(registry.schemes(), vec!["bundled", "external", "local"]);
        assert_eq!(
            registry.open(&ScopedIdentifier::bundled("part.stl")).unwrap(),
            b"solid part"
        );

        // Local reads wait for the grant
        let local = ScopedIdentifier::local("part.stl");
        assert!(matches!(
            registry.open(&local),
            Err(ResolveError::PermissionRequired(_))
        ));
        sources.storage_grant().grant();
        assert_eq!(registry.open(&local).unwrap(), b"solid part");

        // Picked documents become readable through the registry
        let id = sources.documents().provide_bytes("thing", b"<COLLADA/>".to_vec());
        assert_eq!(registry.open(&id).unwrap(), b"<COLLADA/>");
    }
}
