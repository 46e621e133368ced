//! Error types for annotation resolution.
//!
//! Only the doc-scope lookups (`Resolver::class_annotation` and friends)
//! surface these to callers; the bulk collection operations catch them at
//! their boundary, log a warning and return an empty result instead.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// What kind of class member a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Constant,
    Method,
    Property,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Constant => "constant",
            TargetKind::Method => "method",
            TargetKind::Property => "property",
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// The requested class is not present in the registry.
    #[error("class '{0}' not found")]
    ClassNotFound(String),

    /// A named member of a known class is not present in its metadata.
    #[error("{kind} '{name}' not found in class '{class}'")]
    ReflectionTargetNotFound {
        kind: TargetKind,
        name: String,
        class: String,
    },

    /// A doc block contained a declared annotation with a malformed body.
    #[error("malformed annotation '@{annotation}': {reason}")]
    MetadataParse { annotation: String, reason: String },
}

impl Error {
    pub(crate) fn member_not_found(
        kind: TargetKind,
        name: impl Into<String>,
        class: impl Into<String>,
    ) -> Self {
        Error::ReflectionTargetNotFound {
            kind,
            name: name.into(),
            class: class.into(),
        }
    }
}
