//! Dependency Resolution Workflow
//!
//! Turns "the user wants to load a model" into a `ResolvedLoadRequest`:
//!
//! 1. Source choice → the presentation layer is asked to pick a root
//! 2. Root picked → format from the file name, or one question if unclear
//! 3. Wavefront only: material library declared? → ask for it
//! 4. Material supplied and it declares a texture? → ask for that too
//! 5. Resolved
//!
//! Every question is a `Suspension` tagged with a `CorrelationTag`; the
//! workflow does nothing until the matching `respond_*` call arrives.
//! Declining and read failures are ordinary answers: they shorten the
//! request, they never abort it.

pub mod notify;
pub mod request;
pub mod session;


pub use notify::Notification;
pub use request::{AuxiliaryFile, AuxiliaryRole, RequestError, ResolvedLoadRequest, SourceKind};
pub use session::{CorrelationTag, ResolutionSession, Suspension, SuspensionKind};

use crate::identifier::ScopedIdentifier;
use crate::model::{DependencyInspector, ModelFormat};
use crate::resolver::ResolveError;
use thiserror::Error;

/// Where the workflow currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    /// No session
    Idle,
    AwaitingSourceChoice,
    AwaitingRootSelection,
    AwaitingFormatChoice,
    /// Transient while dependencies are inspected
    FormatKnown,
    AwaitingMaterialChoice,
    AwaitingTextureChoice,
    /// The last session produced a request
    Resolved,
}

/// Answer to a root selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootSelection {
    Picked(ScopedIdentifier),
    Abandoned,
}

/// Answer to a material or texture question
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Supply {
    Supplied(ScopedIdentifier),
    Declined,
}

/// Result of driving the workflow one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Waiting for the external actor
    Suspended(Suspension),
    /// Done; hand this to the renderer
    Resolved(ResolvedLoadRequest),
    /// The user walked away; the session is gone
    Abandoned,
    /// The response did not answer the pending question
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// Loads must be serialized by the caller
    #[error("a load is already in progress")]
    SessionActive,
}

/// The resolution state machine. At most one session at a time.
pub struct LoadWorkflow {
    inspector: Box<dyn DependencyInspector>,
    session: Option<ResolutionSession>,
    state: WorkflowState,
    notifications: Vec<Notification>,
}

impl LoadWorkflow {
    pub fn new(inspector: impl DependencyInspector + 'static) -> Self {
        Self {
            inspector: Box::new(inspector),
            session: None,
            state: WorkflowState::Idle,
            notifications: Vec::new(),
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn session(&self) -> Option<&ResolutionSession> {
        self.session.as_ref()
    }

    /// The question currently waiting for an answer
    pub fn pending(&self) -> Option<&Suspension> {
        self.session.as_ref().and_then(|s| s.pending())
    }

    /// Drain notifications queued since the last call
    pub fn notifications(&mut self) -> impl Iterator<Item = Notification> + '_ {
        self.notifications.drain(..)
    }

    /// Open a session that waits for a source choice
    pub fn begin(&mut self) -> Result<(), WorkflowError> {
        if self.session.is_some() {
            return Err(WorkflowError::SessionActive);
        }
        self.session = Some(ResolutionSession::new());
        self.transition(WorkflowState::AwaitingSourceChoice);
        Ok(())
    }

    /// Choose the source and ask for a root model from it
    pub fn start_load(&mut self, source: SourceKind) -> Result<Suspension, WorkflowError> {
        if self.session.is_none() {
            self.begin()?;
        } else if self.state != WorkflowState::AwaitingSourceChoice {
            return Err(WorkflowError::SessionActive);
        }

        let mut session = self.session.take().unwrap_or_default();
        log::info!("Loading model from {}", source.label());
        session.set_source(source);
        let suspension = session.suspend(SuspensionKind::RootSelection { source });
        self.park(session, WorkflowState::AwaitingRootSelection);
        Ok(suspension)
    }

    pub fn respond_root_selection(&mut self, tag: CorrelationTag, selection: RootSelection) -> Outcome {
        let Some(mut session) =
            self.take_answered(tag, |k| matches!(k, SuspensionKind::RootSelection { .. }))
        else {
            return Outcome::Ignored;
        };

        let root = match selection {
            RootSelection::Picked(root) => root,
            RootSelection::Abandoned => {
                log::info!("Root selection abandoned");
                self.transition(WorkflowState::Idle);
                return Outcome::Abandoned;
            }
        };

        let format = ModelFormat::from_name(root.file_name());
        log::debug!("Root {} looks like {:?}", root, format);
        session.set_root(root);

        if format == ModelFormat::Unrecognized {
            let suspension = session.suspend(SuspensionKind::FormatChoice);
            self.park(session, WorkflowState::AwaitingFormatChoice);
            return Outcome::Suspended(suspension);
        }

        self.format_known(session, format)
    }

    /// Only the formats in `ModelFormat::CHOICES` answer the question;
    /// anything else is ignored and the question stays pending.
    pub fn respond_format_choice(&mut self, tag: CorrelationTag, format: ModelFormat) -> Outcome {
        if !ModelFormat::CHOICES.contains(&format) {
            log::debug!("Ignoring format answer {:?} to {}", format, tag);
            return Outcome::Ignored;
        }

        let Some(session) = self.take_answered(tag, |k| matches!(k, SuspensionKind::FormatChoice))
        else {
            return Outcome::Ignored;
        };

        log::debug!("Format chosen: {:?}", format);
        self.format_known(session, format)
    }

    pub fn respond_material_choice(&mut self, tag: CorrelationTag, supply: Supply) -> Outcome {
        let Some(mut session) =
            self.take_answered(tag, |k| matches!(k, SuspensionKind::MaterialChoice { .. }))
        else {
            return Outcome::Ignored;
        };

        let Supply::Supplied(material) = supply else {
            log::info!("Material declined");
            return self.finish(session);
        };

        let name = Self::answered_name(&session);
        session.record(AuxiliaryRole::Material, name, material.clone());

        match self.inspector.texture_reference(&material) {
            Ok(Some(texture)) => {
                let suspension = session.suspend(SuspensionKind::TextureChoice { name: texture });
                self.park(session, WorkflowState::AwaitingTextureChoice);
                Outcome::Suspended(suspension)
            }
            Ok(None) => self.finish(session),
            Err(e) => {
                self.report(&material, e);
                self.finish(session)
            }
        }
    }

    pub fn respond_texture_choice(&mut self, tag: CorrelationTag, supply: Supply) -> Outcome {
        let Some(mut session) =
            self.take_answered(tag, |k| matches!(k, SuspensionKind::TextureChoice { .. }))
        else {
            return Outcome::Ignored;
        };

        match supply {
            Supply::Supplied(texture) => {
                let name = Self::answered_name(&session);
                session.record(AuxiliaryRole::Texture, name, texture);
            }
            Supply::Declined => log::info!("Texture declined"),
        }
        self.finish(session)
    }

    /// Drop the live session, whatever it was waiting for
    pub fn abandon(&mut self) -> Outcome {
        if self.session.take().is_none() {
            return Outcome::Ignored;
        }
        log::info!("Load abandoned");
        self.transition(WorkflowState::Idle);
        Outcome::Abandoned
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    /// Take the session out if `tag` answers its pending suspension.
    /// The answered suspension is kept as the session's last question.
    fn take_answered(
        &mut self,
        tag: CorrelationTag,
        expected: fn(&SuspensionKind) -> bool,
    ) -> Option<ResolutionSession> {
        let session = self.session.as_mut()?;
        match session.take_pending(tag, expected) {
            Some(answered) => {
                log::debug!("Answer {} to {}", tag, answered.kind.label());
                let mut session = self.session.take()?;
                session.set_answered(answered);
                Some(session)
            }
            None => {
                log::debug!("Ignoring response {} in state {:?}", tag, self.state);
                None
            }
        }
    }

    /// Dependency name of the question just answered
    fn answered_name(session: &ResolutionSession) -> String {
        session
            .answered()
            .and_then(|s| s.kind.dependency_name())
            .unwrap_or_default()
            .to_string()
    }

    fn format_known(&mut self, mut session: ResolutionSession, format: ModelFormat) -> Outcome {
        session.set_format(format);
        self.transition(WorkflowState::FormatKnown);

        if !format.has_dependencies() {
            // Collada could reference textures, but those are not followed
            return self.finish(session);
        }

        let Some(root) = session.root().cloned() else {
            return self.finish(session);
        };

        match self.inspector.material_reference(&root) {
            Ok(Some(material)) => {
                let suspension = session.suspend(SuspensionKind::MaterialChoice { name: material });
                self.park(session, WorkflowState::AwaitingMaterialChoice);
                Outcome::Suspended(suspension)
            }
            Ok(None) => self.finish(session),
            Err(e) => {
                self.report(&root, e);
                self.finish(session)
            }
        }
    }

    fn park(&mut self, session: ResolutionSession, state: WorkflowState) {
        self.session = Some(session);
        self.transition(state);
    }

    fn finish(&mut self, session: ResolutionSession) -> Outcome {
        match session.into_request() {
            Some(request) => {
                log::info!(
                    "Resolved {} as {} with {} auxiliary file(s)",
                    request.root(),
                    request.format().label(),
                    request.auxiliaries().count()
                );
                self.transition(WorkflowState::Resolved);
                Outcome::Resolved(request)
            }
            None => {
                log::warn!("Session ended before a root was selected");
                self.transition(WorkflowState::Idle);
                Outcome::Abandoned
            }
        }
    }

    fn report(&mut self, identifier: &ScopedIdentifier, error: ResolveError) {
        log::warn!("Skipping dependencies of {}: {}", identifier, error);
        self.notifications
            .push(Notification::from_error(identifier, error));
    }

    fn transition(&mut self, state: WorkflowState) {
        if self.state != state {
            log::debug!("Workflow {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }
}
