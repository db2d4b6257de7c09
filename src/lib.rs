//! Model intake: turns "load a model" into a fully resolved load request
//!
//! - `identifier`: `scheme://path` references to byte-bearing resources
//! - `resolver`: scheme → resolver dispatch (bundled, local, external)
//! - `model`: format detection and material/texture reference lookup
//! - `workflow`: the suspend/resume state machine that asks the user for
//!   the root model and every file it depends on

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod identifier;
pub mod model;
pub mod resolver;
pub mod workflow;

pub use config::{ConfigError, IntakeConfig};
pub use identifier::{IdentifierError, ScopedIdentifier};
pub use model::{DependencyInspector, ModelFormat, WavefrontInspector};
pub use resolver::{ResolveError, Resolver, ResolverRegistry, Sources};
pub use workflow::{
    LoadWorkflow, Notification, Outcome, ResolvedLoadRequest, RootSelection, SourceKind, Supply,
    Suspension, SuspensionKind, WorkflowError, WorkflowState,
};
