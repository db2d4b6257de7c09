//! Scoped Identifiers
//!
//! A `ScopedIdentifier` names a byte-bearing resource as a scheme tag plus an
//! opaque path, written `scheme://path`. The scheme decides which resolver
//! reads it; nothing else in the crate looks at where a file comes from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Scheme of the read-only bundled asset store
pub const BUNDLED_SCHEME: &str = "bundled";

/// Scheme of the mounted filesystem
pub const LOCAL_SCHEME: &str = "local";

/// Scheme of content handed over by an external picker
pub const EXTERNAL_SCHEME: &str = "external";

const SEPARATOR: &str = "://";

/// Errors raised while building or parsing an identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("identifier is empty")]
    Empty,
    #[error("identifier '{0}' has no scheme (expected scheme://path)")]
    MissingScheme(String),
    #[error("identifier '{0}' has an empty scheme")]
    EmptyScheme(String),
    #[error("identifier '{0}' has a malformed scheme")]
    InvalidScheme(String),
    #[error("identifier '{0}' has an empty path")]
    EmptyPath(String),
    #[error("identifier '{0}' has a path that does not decode to UTF-8")]
    InvalidEncoding(String),
}

/// A scheme-qualified reference to a resource
///
/// Immutable once built. The path is kept decoded; the textual form
/// percent-encodes every path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScopedIdentifier {
    scheme: String,
    path: String,
}

impl ScopedIdentifier {
    /// Build an identifier from a scheme tag and a decoded path
    ///
    /// The scheme must be non-empty and made of ASCII letters, digits, `+`,
    /// `-` or `.`; the path must be non-empty. Anything built here displays
    /// as text that parses back to the same identifier.
    pub fn new(scheme: impl Into<String>, path: impl Into<String>) -> Result<Self, IdentifierError> {
        let scheme = scheme.into();
        let path = path.into();
        let text = || format!("{}{}{}", scheme, SEPARATOR, path);

        if scheme.is_empty() {
            return Err(IdentifierError::EmptyScheme(text()));
        }
        if !scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        {
            return Err(IdentifierError::InvalidScheme(text()));
        }
        if path.is_empty() {
            return Err(IdentifierError::EmptyPath(text()));
        }

        Ok(Self::from_parts(scheme.to_ascii_lowercase(), path))
    }

    /// `scheme` must already be valid and lowercase
    fn from_parts(scheme: String, path: String) -> Self {
        debug_assert!(!path.is_empty(), "identifier paths are never empty");
        Self { scheme, path }
    }

    /// `bundled://path`; `path` must be non-empty
    pub fn bundled(path: impl Into<String>) -> Self {
        Self::from_parts(BUNDLED_SCHEME.to_string(), path.into())
    }

    /// `local://path`; `path` must be non-empty
    pub fn local(path: impl Into<String>) -> Self {
        Self::from_parts(LOCAL_SCHEME.to_string(), path.into())
    }

    /// `external://path`; `path` must be non-empty
    pub fn external(path: impl Into<String>) -> Self {
        Self::from_parts(EXTERNAL_SCHEME.to_string(), path.into())
    }

    /// Scheme tag (always lowercase)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Decoded path, interpreted only by the scheme's resolver
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Trailing name of the path (everything after the last '/')
    pub fn file_name(&self) -> &str {
        let trimmed = self.path.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(idx) => &trimmed[idx + 1..],
            None => trimmed,
        }
    }
}

impl fmt::Display for ScopedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded: Vec<String> = self
            .path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        write!(f, "{}{}{}", self.scheme, SEPARATOR, encoded.join("/"))
    }
}

impl FromStr for ScopedIdentifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(IdentifierError::Empty);
        }

        let (scheme, raw_path) = s
            .split_once(SEPARATOR)
            .ok_or_else(|| IdentifierError::MissingScheme(s.to_string()))?;

        if raw_path.is_empty() {
            return Err(IdentifierError::EmptyPath(s.to_string()));
        }

        let path = urlencoding::decode(raw_path)
            .map_err(|_| IdentifierError::InvalidEncoding(s.to_string()))?;

        Self::new(scheme, path.into_owned()).map_err(|e| match e {
            // Report the text as written, not as rebuilt
            IdentifierError::EmptyScheme(_) => IdentifierError::EmptyScheme(s.to_string()),
            IdentifierError::InvalidScheme(_) => IdentifierError::InvalidScheme(s.to_string()),
            other => other,
        })
    }
}

impl TryFrom<String> for ScopedIdentifier {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ScopedIdentifier> for String {
    fn from(id: ScopedIdentifier) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let id: ScopedIdentifier = "bundled://models/cube.obj".parse().unwrap();
        assert_eq!(id.scheme(), "bundled");
        assert_eq!(id.path(), "models/cube.obj");
        assert_eq!(id.to_string(), "bundled://models/cube.obj");
    }

    #[test]
    fn test_path_is_percent_decoded() {
        let id: ScopedIdentifier = "local:///home/me/My%20Model.obj".parse().unwrap();
        assert_eq!(id.path(), "/home/me/My Model.obj");
        assert_eq!(id.file_name(), "My Model.obj");
        assert_eq!(id.to_string(), "local:///home/me/My%20Model.obj");
    }

    #[test]
    fn test_scheme_is_lowercased() {
        let id: ScopedIdentifier = "EXTERNAL://documents/7".parse().unwrap();
        assert_eq!(id.scheme(), EXTERNAL_SCHEME);
    }

    #[test]
    fn test_file_name_without_directories() {
        assert_eq!(ScopedIdentifier::external("thing").file_name(), "thing");
        assert_eq!(ScopedIdentifier::bundled("a/b/part.stl").file_name(), "part.stl");
        assert_eq!(ScopedIdentifier::local("dir/").file_name(), "dir");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<ScopedIdentifier>(), Err(IdentifierError::Empty));
        assert!(matches!(
            "model.obj".parse::<ScopedIdentifier>(),
            Err(IdentifierError::MissingScheme(_))
        ));
        assert!(matches!(
            "://model.obj".parse::<ScopedIdentifier>(),
            Err(IdentifierError::EmptyScheme(_))
        ));
        assert!(matches!(
            "local://".parse::<ScopedIdentifier>(),
            Err(IdentifierError::EmptyPath(_))
        ));
    }

    #[test]
    fn test_new_rejects_what_cannot_be_parsed_back() {
        assert!(matches!(
            ScopedIdentifier::new("local", ""),
            Err(IdentifierError::EmptyPath(_))
        ));
        assert!(matches!(
            ScopedIdentifier::new("", "model.obj"),
            Err(IdentifierError::EmptyScheme(_))
        ));
        assert!(matches!(
            ScopedIdentifier::new("a://b", "model.obj"),
            Err(IdentifierError::InvalidScheme(_))
        ));
        assert!(matches!(
            ScopedIdentifier::new(" local", "model.obj"),
            Err(IdentifierError::InvalidScheme(_))
        ));

        let id = ScopedIdentifier::new("Git+SSH", "repo/model.obj").unwrap();
        assert_eq!(id.scheme(), "git+ssh");
    }

    #[test]
    fn test_undecodable_path_is_rejected() {
        assert_eq!(
            "local://%FF.obj".parse::<ScopedIdentifier>(),
            Err(IdentifierError::InvalidEncoding("local://%FF.obj".to_string()))
        );
    }

    #[test]
    fn test_text_form_round_trips() {
        let paths = [
            "/home/me/My Model%.obj",
            "textures/ü wood #2.png",
            "a%2Fb/c?d=e.mtl",
            "%FF.obj",
            "trailing/",
        ];
        for path in paths {
            let id = ScopedIdentifier::local(path);
            let back: ScopedIdentifier = id.to_string().parse().unwrap();
            assert_eq!(back, id, "{}", id);

            let text = ron::ser::to_string(&id).unwrap();
            let back: ScopedIdentifier = ron::de::from_str(&text).unwrap();
            assert_eq!(back, id);
        }
    }

    #[test]
    fn test_serializes_as_text() {
        let id = ScopedIdentifier::bundled("demo/part.stl");
        let text = ron::ser::to_string(&id).unwrap();
        assert_eq!(text, "\"bundled://demo/part.stl\"");
        let back: ScopedIdentifier = ron::de::from_str(&text).unwrap();
        assert_eq!(back, id);
    }
}
