//! Resolution session state
//!
//! Everything collected during one load attempt. A session lives from
//! `start_load` until a request is resolved or the user walks away; it is
//! never reused.

use super::request::{AuxiliaryFile, AuxiliaryRole, ResolvedLoadRequest, SourceKind};
use crate::identifier::ScopedIdentifier;
use crate::model::ModelFormat;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for correlation tags, unique for the whole process
static TAG_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Matches a response to the suspension that asked for it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationTag(u64);

impl CorrelationTag {
    fn next() -> Self {
        Self(TAG_COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CorrelationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What the workflow is waiting for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuspensionKind {
    /// Pick a root model from `source`
    RootSelection { source: SourceKind },
    /// Say which format an unrecognized root is in
    FormatChoice,
    /// Supply or decline the material library `name`
    MaterialChoice { name: String },
    /// Supply or decline the texture `name`
    TextureChoice { name: String },
}

impl SuspensionKind {
    /// Name of the dependency being asked for, if any
    pub fn dependency_name(&self) -> Option<&str> {
        match self {
            SuspensionKind::MaterialChoice { name } | SuspensionKind::TextureChoice { name } => {
                Some(name)
            }
            SuspensionKind::RootSelection { .. } | SuspensionKind::FormatChoice => None,
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            SuspensionKind::RootSelection { .. } => "root selection",
            SuspensionKind::FormatChoice => "format choice",
            SuspensionKind::MaterialChoice { .. } => "material choice",
            SuspensionKind::TextureChoice { .. } => "texture choice",
        }
    }
}

/// An outstanding question to the external actor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suspension {
    pub tag: CorrelationTag,
    pub kind: SuspensionKind,
}

/// Mutable state of one load attempt
#[derive(Debug, Default)]
pub struct ResolutionSession {
    source: Option<SourceKind>,
    root: Option<ScopedIdentifier>,
    format: Option<ModelFormat>,
    pending: Option<Suspension>,
    answered: Option<Suspension>,
    auxiliaries: BTreeMap<AuxiliaryRole, AuxiliaryFile>,
    suspensions_issued: usize,
}

impl ResolutionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&self) -> Option<SourceKind> {
        self.source
    }

    pub fn root(&self) -> Option<&ScopedIdentifier> {
        self.root.as_ref()
    }

    pub fn format(&self) -> Option<ModelFormat> {
        self.format
    }

    pub fn pending(&self) -> Option<&Suspension> {
        self.pending.as_ref()
    }

    /// The most recently answered suspension
    pub fn answered(&self) -> Option<&Suspension> {
        self.answered.as_ref()
    }

    /// Name of the dependency currently waited for
    pub fn pending_dependency(&self) -> Option<&str> {
        self.pending.as_ref().and_then(|s| s.kind.dependency_name())
    }

    /// Number of suspensions issued so far, root selection included
    pub fn suspensions_issued(&self) -> usize {
        self.suspensions_issued
    }

    pub fn auxiliary(&self, role: AuxiliaryRole) -> Option<&AuxiliaryFile> {
        self.auxiliaries.get(&role)
    }

    pub(crate) fn set_source(&mut self, source: SourceKind) {
        self.source = Some(source);
    }

    pub(crate) fn set_root(&mut self, root: ScopedIdentifier) {
        self.root = Some(root);
    }

    pub(crate) fn set_format(&mut self, format: ModelFormat) {
        self.format = Some(format);
    }

    /// Start waiting for `kind` under a fresh correlation tag
    pub(crate) fn suspend(&mut self, kind: SuspensionKind) -> Suspension {
        let suspension = Suspension {
            tag: CorrelationTag::next(),
            kind,
        };
        self.pending = Some(suspension.clone());
        self.suspensions_issued += 1;
        suspension
    }

    /// Take the pending suspension if `tag` answers it and it is of the
    /// expected kind. Anything else leaves the session untouched.
    pub(crate) fn take_pending(
        &mut self,
        tag: CorrelationTag,
        expected: fn(&SuspensionKind) -> bool,
    ) -> Option<Suspension> {
        let answers = self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.tag == tag && expected(&pending.kind));
        if answers {
            self.pending.take()
        } else {
            None
        }
    }

    pub(crate) fn set_answered(&mut self, suspension: Suspension) {
        self.answered = Some(suspension);
    }

    pub(crate) fn record(
        &mut self,
        role: AuxiliaryRole,
        name: String,
        identifier: ScopedIdentifier,
    ) {
        self.auxiliaries
            .insert(role, AuxiliaryFile { name, identifier });
    }

    /// Close the session. `None` when no root was ever selected.
    pub(crate) fn into_request(self) -> Option<ResolvedLoadRequest> {
        Some(ResolvedLoadRequest::new(
            self.root?,
            self.source?,
            self.format?,
            self.auxiliaries,
        ))
    }
}
