//! Resolved load requests
//!
//! The only thing handed to the renderer: the root, its format, where it came
//! from, and every auxiliary file the user supplied.

use crate::identifier::{ScopedIdentifier, BUNDLED_SCHEME, EXTERNAL_SCHEME, LOCAL_SCHEME};
use crate::model::ModelFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Where the root model is picked from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// Models shipped with the application
    Bundled,
    /// The mounted filesystem
    Filesystem,
    /// An external content provider reached through a picker
    ExternalProvider,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [
        SourceKind::Bundled,
        SourceKind::Filesystem,
        SourceKind::ExternalProvider,
    ];

    /// Scheme of identifiers picked from this source
    pub fn scheme(&self) -> &'static str {
        match self {
            SourceKind::Bundled => BUNDLED_SCHEME,
            SourceKind::Filesystem => LOCAL_SCHEME,
            SourceKind::ExternalProvider => EXTERNAL_SCHEME,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Bundled => "Embedded Models",
            SourceKind::Filesystem => "External Storage",
            SourceKind::ExternalProvider => "Content Provider",
        }
    }
}

/// Role an auxiliary file plays for the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AuxiliaryRole {
    Material,
    Texture,
}

impl AuxiliaryRole {
    pub fn label(&self) -> &'static str {
        match self {
            AuxiliaryRole::Material => "material",
            AuxiliaryRole::Texture => "texture",
        }
    }
}

/// An auxiliary file: the name the referencing file uses, and what the user
/// supplied for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxiliaryFile {
    pub name: String,
    pub identifier: ScopedIdentifier,
}

/// A request read back from text that breaks the request invariants
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("request has a texture but no material")]
    TextureWithoutMaterial,
}

/// Same fields as `ResolvedLoadRequest`, before validation
#[derive(Deserialize)]
struct RequestFields {
    root: ScopedIdentifier,
    source: SourceKind,
    format: ModelFormat,
    #[serde(default)]
    auxiliaries: BTreeMap<AuxiliaryRole, AuxiliaryFile>,
}

impl TryFrom<RequestFields> for ResolvedLoadRequest {
    type Error = RequestError;

    fn try_from(fields: RequestFields) -> Result<Self, Self::Error> {
        let auxiliaries = fields.auxiliaries;
        if auxiliaries.contains_key(&AuxiliaryRole::Texture)
            && !auxiliaries.contains_key(&AuxiliaryRole::Material)
        {
            return Err(RequestError::TextureWithoutMaterial);
        }
        Ok(Self::new(fields.root, fields.source, fields.format, auxiliaries))
    }
}

/// Fully resolved input for the renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RequestFields")]
pub struct ResolvedLoadRequest {
    root: ScopedIdentifier,
    source: SourceKind,
    format: ModelFormat,
    auxiliaries: BTreeMap<AuxiliaryRole, AuxiliaryFile>,
}

impl ResolvedLoadRequest {
    pub(crate) fn new(
        root: ScopedIdentifier,
        source: SourceKind,
        format: ModelFormat,
        mut auxiliaries: BTreeMap<AuxiliaryRole, AuxiliaryFile>,
    ) -> Self {
        // A texture is only ever asked for because a material declared it
        if !auxiliaries.contains_key(&AuxiliaryRole::Material) {
            debug_assert!(!auxiliaries.contains_key(&AuxiliaryRole::Texture));
            auxiliaries.remove(&AuxiliaryRole::Texture);
        }

        Self {
            root,
            source,
            format,
            auxiliaries,
        }
    }

    pub fn root(&self) -> &ScopedIdentifier {
        &self.root
    }

    pub fn source(&self) -> SourceKind {
        self.source
    }

    pub fn format(&self) -> ModelFormat {
        self.format
    }

    pub fn auxiliary(&self, role: AuxiliaryRole) -> Option<&AuxiliaryFile> {
        self.auxiliaries.get(&role)
    }

    pub fn material(&self) -> Option<&AuxiliaryFile> {
        self.auxiliary(AuxiliaryRole::Material)
    }

    pub fn texture(&self) -> Option<&AuxiliaryFile> {
        self.auxiliary(AuxiliaryRole::Texture)
    }

    /// Auxiliary files in role order (material before texture)
    pub fn auxiliaries(&self) -> impl Iterator<Item = (AuxiliaryRole, &AuxiliaryFile)> {
        self.auxiliaries.iter().map(|(role, file)| (*role, file))
    }

    /// Every identifier the renderer will read, root first
    pub fn identifiers(&self) -> impl Iterator<Item = &ScopedIdentifier> {
        std::iter::once(&self.root).chain(self.auxiliaries.values().map(|f| &f.identifier))
    }

    /// Pretty RON form for handing over to another process
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Read a request written by `to_ron`
    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aux(name: &str, id: ScopedIdentifier) -> AuxiliaryFile {
        AuxiliaryFile {
            name: name.to_string(),
            identifier: id,
        }
    }

    #[test]
    fn test_source_schemes() {
        assert_eq!(SourceKind::Bundled.scheme(), "bundled");
        assert_eq!(SourceKind::Filesystem.scheme(), "local");
        assert_eq!(SourceKind::ExternalProvider.scheme(), "external");
    }

    #[test]
    fn test_identifiers_root_first() {
        let mut auxiliaries = BTreeMap::new();
        auxiliaries.insert(
            AuxiliaryRole::Texture,
            aux("wood.png", ScopedIdentifier::external("documents/2")),
        );
        auxiliaries.insert(
            AuxiliaryRole::Material,
            aux("scene.mtl", ScopedIdentifier::external("documents/1")),
        );
        let request = ResolvedLoadRequest::new(
            ScopedIdentifier::external("documents/0"),
            SourceKind::ExternalProvider,
            ModelFormat::Wavefront,
            auxiliaries,
        );

        let paths: Vec<&str> = request.identifiers().map(|id| id.path()).collect();
        assert_eq!(paths, vec!["documents/0", "documents/1", "documents/2"]);
        assert_eq!(request.material().unwrap().name, "scene.mtl");
        assert_eq!(request.texture().unwrap().name, "wood.png");
    }

    #[test]
    fn test_from_ron_reads_back_to_ron() {
        let mut auxiliaries = BTreeMap::new();
        auxiliaries.insert(
            AuxiliaryRole::Material,
            aux("scene.mtl", ScopedIdentifier::local("/models/My Scene.mtl")),
        );
        auxiliaries.insert(
            AuxiliaryRole::Texture,
            aux("wood.png", ScopedIdentifier::local("/models/wood.png")),
        );
        let request = ResolvedLoadRequest::new(
            ScopedIdentifier::local("/models/model.obj"),
            SourceKind::Filesystem,
            ModelFormat::Wavefront,
            auxiliaries,
        );

        let text = request.to_ron().unwrap();
        assert_eq!(ResolvedLoadRequest::from_ron(&text).unwrap(), request);
    }

    #[test]
    fn test_from_ron_rejects_texture_without_material() {
        let text = r#"(
            root: "bundled://demo/model.obj",
            source: Bundled,
            format: Wavefront,
            auxiliaries: {
                Texture: (name: "wood.png", identifier: "bundled://demo/wood.png"),
            },
        )"#;
        let err = ResolvedLoadRequest::from_ron(text).unwrap_err();
        assert!(err.to_string().contains("texture but no material"), "{}", err);
    }

    #[test]
    fn test_from_ron_without_auxiliaries() {
        let text = r#"(root: "external://documents/0", source: ExternalProvider, format: Collada)"#;
        let request = ResolvedLoadRequest::from_ron(text).unwrap();
        assert_eq!(request.format(), ModelFormat::Collada);
        assert_eq!(request.auxiliaries().count(), 0);
    }

    #[test]
    fn test_to_ron_names_roles() {
        let mut auxiliaries = BTreeMap::new();
        auxiliaries.insert(
            AuxiliaryRole::Material,
            aux("scene.mtl", ScopedIdentifier::bundled("demo/scene.mtl")),
        );
        let request = ResolvedLoadRequest::new(
            ScopedIdentifier::bundled("demo/model.obj"),
            SourceKind::Bundled,
            ModelFormat::Wavefront,
            auxiliaries,
        );

        let text = request.to_ron().unwrap();
        assert!(text.contains("\"bundled://demo/model.obj\""));
        assert!(text.contains("Wavefront"));
        assert!(text.contains("Material"));
        assert!(!text.contains("Texture"));
    }
}
