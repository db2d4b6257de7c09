//! Externally-provided content
//!
//! Content that only exists because the user picked it through an external
//! picker. The picker integration hands each pick to a `ContentProvider` and
//! gets back an opaque `external://` identifier. Tokens carry no file
//! extension, so the format of such a root usually has to be asked for.

use super::{ResolveError, Resolver};
use crate::identifier::ScopedIdentifier;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Prefix of every token handed out by `ProvidedDocuments`
const DOCUMENTS_PREFIX: &str = "documents/";

/// Source of bytes for opaque external tokens
pub trait ContentProvider: Send + Sync {
    fn read(&self, token: &str) -> Result<Vec<u8>, ResolveError>;
}

/// Resolver for `external://` identifiers
pub struct ExternalResolver {
    provider: Arc<dyn ContentProvider>,
}

impl ExternalResolver {
    pub fn new(provider: Arc<dyn ContentProvider>) -> Self {
        Self { provider }
    }
}

impl Resolver for ExternalResolver {
    fn open(&self, path: &str) -> Result<Vec<u8>, ResolveError> {
        self.provider.read(path)
    }
}

/// Where the bytes of a provided document live
#[derive(Debug, Clone)]
enum DocumentSource {
    File(PathBuf),
    Bytes(Arc<[u8]>),
}

#[derive(Debug, Clone)]
struct ProvidedDocument {
    display_name: String,
    source: DocumentSource,
}

/// Table of documents the user handed over during this process
#[derive(Debug, Default)]
pub struct ProvidedDocuments {
    next_id: AtomicU64,
    entries: Mutex<HashMap<String, ProvidedDocument>>,
}

impl ProvidedDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic elsewhere never leaves the table half-written, so a poisoned
    // lock still holds usable data
    fn entries(&self) -> MutexGuard<'_, HashMap<String, ProvidedDocument>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn insert(&self, display_name: String, source: DocumentSource) -> ScopedIdentifier {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let token = format!("{}{}", DOCUMENTS_PREFIX, id);
        log::debug!("Provided document {} as {}", display_name, token);

        self.entries().insert(
            token.clone(),
            ProvidedDocument {
                display_name,
                source,
            },
        );
        ScopedIdentifier::external(token)
    }

    /// Hand over a picked file; it is read lazily on `open`
    pub fn provide_file(&self, path: impl Into<PathBuf>) -> ScopedIdentifier {
        let path = path.into();
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        self.insert(display_name, DocumentSource::File(path))
    }

    /// Hand over content that is already in memory
    pub fn provide_bytes(&self, display_name: &str, data: Vec<u8>) -> ScopedIdentifier {
        self.insert(display_name.to_string(), DocumentSource::Bytes(data.into()))
    }

    /// Name the picker reported for a provided document
    pub fn display_name(&self, identifier: &ScopedIdentifier) -> Option<String> {
        self.entries()
            .get(identifier.path())
            .map(|doc| doc.display_name.clone())
    }

    /// Forget every provided document
    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl ContentProvider for ProvidedDocuments {
    fn read(&self, token: &str) -> Result<Vec<u8>, ResolveError> {
        // Clone out so the lock is not held during file I/O
        let source = self
            .entries()
            .get(token)
            .map(|doc| doc.source.clone())
            .ok_or_else(|| ResolveError::NotFound(token.to_string()))?;

        match source {
            DocumentSource::Bytes(data) => Ok(data.to_vec()),
            DocumentSource::File(path) => {
                std::fs::read(&path).map_err(|e| ResolveError::from_io(token, e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::EXTERNAL_SCHEME;

    #[test]
    fn test_tokens_are_opaque_and_distinct() {
        let docs = ProvidedDocuments::new();
        let a = docs.provide_bytes("model.obj", b"a".to_vec());
        let b = docs.provide_bytes("model.obj", b"b".to_vec());

        assert_eq!(a.scheme(), EXTERNAL_SCHEME);
        assert_ne!(a, b);
        assert!(!a.file_name().contains('.'));
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn test_read_through_resolver() {
        let docs = Arc::new(ProvidedDocuments::new());
        let id = docs.provide_bytes("scene.mtl", b"map_Kd wood.png".to_vec());
        let resolver = ExternalResolver::new(docs.clone());

        assert_eq!(resolver.open(id.path()).unwrap(), b"map_Kd wood.png");
        assert_eq!(docs.display_name(&id).as_deref(), Some("scene.mtl"));
    }

    #[test]
    fn test_provided_file_is_read_lazily() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("later.obj");
        let docs = ProvidedDocuments::new();
        let id = docs.provide_file(&path);

        assert!(matches!(docs.read(id.path()), Err(ResolveError::NotFound(_))));
        std::fs::write(&path, b"v 1 2 3").unwrap();
        assert_eq!(docs.read(id.path()).unwrap(), b"v 1 2 3");
        assert_eq!(docs.display_name(&id).as_deref(), Some("later.obj"));
    }

    #[test]
    fn test_clear_forgets_documents() {
        let docs = ProvidedDocuments::new();
        let id = docs.provide_bytes("thing", b"x".to_vec());
        docs.clear();

        assert!(docs.is_empty());
        assert_eq!(
            docs.read(id.path()),
            Err(ResolveError::NotFound(id.path().to_string()))
        );
    }
}
