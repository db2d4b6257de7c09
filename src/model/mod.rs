//! Model formats
//!
//! Which 3D format a root file is in, derived from its trailing name only.
//! Nothing here parses geometry.

pub mod inspect;

pub use inspect::{DependencyInspector, WavefrontInspector};

use serde::{Deserialize, Serialize};

/// Declared format of a model file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFormat {
    /// `.obj`, may reference a material library which may reference a texture
    Wavefront,
    /// `.stl`, never references other files
    Stereolithography,
    /// `.dae`, references are not followed
    Collada,
    /// No known suffix; the user has to say what it is
    Unrecognized,
}

impl ModelFormat {
    /// Formats a user can pick when the name does not tell
    pub const CHOICES: [ModelFormat; 3] = [
        ModelFormat::Wavefront,
        ModelFormat::Stereolithography,
        ModelFormat::Collada,
    ];

    /// File extensions of loadable models (lowercase, without dot)
    pub const SUPPORTED_EXTENSIONS: &'static [&'static str] = &["obj", "stl", "dae"];

    /// Derive the format from a file name by case-insensitive suffix
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        Self::CHOICES
            .into_iter()
            .find(|format| {
                format
                    .extension()
                    .is_some_and(|ext| lower.ends_with(&format!(".{}", ext)))
            })
            .unwrap_or(ModelFormat::Unrecognized)
    }

    pub fn extension(&self) -> Option<&'static str> {
        match self {
            ModelFormat::Wavefront => Some("obj"),
            ModelFormat::Stereolithography => Some("stl"),
            ModelFormat::Collada => Some("dae"),
            ModelFormat::Unrecognized => None,
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            ModelFormat::Wavefront => "Wavefront (*.obj)",
            ModelFormat::Stereolithography => "Stereolithography (*.stl)",
            ModelFormat::Collada => "Collada (*.dae)",
            ModelFormat::Unrecognized => "Unrecognized",
        }
    }

    /// Whether the workflow follows references declared by this format
    pub fn has_dependencies(&self) -> bool {
        matches!(self, ModelFormat::Wavefront)
    }

    /// Check a file name against the loadable model extensions
    pub fn is_supported_file(name: &str) -> bool {
        Self::from_name(name) != ModelFormat::Unrecognized
    }
}
