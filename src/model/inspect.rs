//! Dependency inspection
//!
//! Finds the name of the file a model (or material library) points at,
//! without parsing anything else. Wavefront is the only format with an
//! implementation: OBJ `mtllib` for the material library and MTL `map_Kd`
//! for the diffuse texture.

use crate::identifier::ScopedIdentifier;
use crate::resolver::{ResolveError, ResolverRegistry};
use std::sync::Arc;

/// Answers "which file does this file reference?"
pub trait DependencyInspector {
    /// Material library declared by a root model
    fn material_reference(&self, root: &ScopedIdentifier) -> Result<Option<String>, ResolveError>;

    /// Texture declared by a material library
    fn texture_reference(
        &self,
        material: &ScopedIdentifier,
    ) -> Result<Option<String>, ResolveError>;
}

/// Reads OBJ/MTL statements through the resolver registry
pub struct WavefrontInspector {
    registry: Arc<ResolverRegistry>,
}

impl WavefrontInspector {
    pub fn new(registry: Arc<ResolverRegistry>) -> Self {
        Self { registry }
    }

    fn read_text(&self, identifier: &ScopedIdentifier) -> Result<String, ResolveError> {
        let bytes = self.registry.open(identifier)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// First `mtllib` statement of an OBJ file
    pub fn parse_material_library(contents: &str) -> Option<String> {
        first_statement(contents, "mtllib")
    }

    /// First `map_Kd` statement of an MTL file
    ///
    /// Map options (`-s 1 1 1`, `-clamp on`, ...) come before the file name,
    /// so when options are present the last token is taken.
    pub fn parse_texture_map(contents: &str) -> Option<String> {
        let value = first_statement(contents, "map_Kd")?;
        if value.starts_with('-') {
            value.split_whitespace().last().map(str::to_string)
        } else {
            Some(value)
        }
    }
}

impl DependencyInspector for WavefrontInspector {
    fn material_reference(&self, root: &ScopedIdentifier) -> Result<Option<String>, ResolveError> {
        let contents = self.read_text(root)?;
        Ok(Self::parse_material_library(&contents))
    }

    fn texture_reference(
        &self,
        material: &ScopedIdentifier,
    ) -> Result<Option<String>, ResolveError> {
        let contents = self.read_text(material)?;
        Ok(Self::parse_texture_map(&contents))
    }
}

/// Value of the first `keyword value` line, rest of line trimmed
fn first_statement(contents: &str, keyword: &str) -> Option<String> {
    for line in contents.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((head, rest)) = line.split_once(char::is_whitespace) else {
            continue;
        };
        if head == keyword {
            let value = rest.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}
