//! Background opens
//!
//! `open_async` runs one registry `open` on its own thread and hands back a
//! `PendingOpen` for the caller to poll between other work.

use super::{ResolveError, ResolverRegistry};
use crate::identifier::ScopedIdentifier;
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

pub type OpenResult = Result<Vec<u8>, ResolveError>;

/// An open running on a background thread
pub struct PendingOpen {
    identifier: ScopedIdentifier,
    receiver: Receiver<OpenResult>,
    result: Option<OpenResult>,
}

impl PendingOpen {
    pub fn identifier(&self) -> &ScopedIdentifier {
        &self.identifier
    }

    /// Check for completion without blocking. Stays true once finished.
    pub fn poll(&mut self) -> bool {
        if self.result.is_some() {
            return true;
        }

        match self.receiver.try_recv() {
            Ok(result) => self.result = Some(result),
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => {
                // The open thread died before answering
                self.result = Some(Err(ResolveError::Unreadable(format!(
                    "{}: open did not finish",
                    self.identifier
                ))));
            }
        }
        true
    }

    /// The finished result, `None` while still running
    pub fn finish(mut self) -> Option<(ScopedIdentifier, OpenResult)> {
        if !self.poll() {
            return None;
        }
        let result = self.result.take()?;
        Some((self.identifier, result))
    }
}

/// Start `registry.open(identifier)` on a background thread
pub fn open_async(registry: Arc<ResolverRegistry>, identifier: ScopedIdentifier) -> PendingOpen {
    let (sender, receiver) = channel();
    let target = identifier.clone();

    thread::spawn(move || {
        let _ = sender.send(registry.open(&target));
    });

    PendingOpen {
        identifier,
        receiver,
        result: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::bundled::BundledResolver;
    use std::time::Duration;

    fn poll_until_complete(open: &mut PendingOpen) {
        for _ in 0..500 {
            if open.poll() {
                return;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("open did not complete");
    }

    #[test]
    fn test_open_async_completes() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("part.stl"), b"solid part").unwrap();
        let registry = Arc::new(
            ResolverRegistry::builder()
                .register("bundled", BundledResolver::with_dir(dir.path()))
                .build(),
        );

        let mut pending = open_async(registry, ScopedIdentifier::bundled("part.stl"));
        poll_until_complete(&mut pending);
        assert!(pending.poll());

        let (identifier, result) = pending.finish().unwrap();
        assert_eq!(identifier.path(), "part.stl");
        assert_eq!(result.unwrap(), b"solid part");
    }

    #[test]
    fn test_open_async_reports_errors() {
        let registry = Arc::new(ResolverRegistry::builder().build());

        let mut pending = open_async(registry, ScopedIdentifier::local("model.obj"));
        poll_until_complete(&mut pending);

        let (_, result) = pending.finish().unwrap();
        assert_eq!(
            result,
            Err(ResolveError::UnsupportedScheme("local".to_string()))
        );
    }
}
