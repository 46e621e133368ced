//! Annotation type declarations.
//!
//! Annotation types are declared explicitly instead of being discovered by
//! reflection: each declaration names the type, its optional parent type,
//! the fields it carries, and (optionally) which field is the default
//! payload. Structural type matching ("is the same type or a descendant")
//! is an ancestry walk over the declared parents, and payload inference
//! replaces the "take the only public field" reflection trick with an
//! explicit declaration plus a single-declared-field fallback.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Declaration of one annotation type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationDecl {
    pub name: String,
    /// Parent type name for single-inheritance matching.
    #[serde(default)]
    pub parent: Option<String>,
    /// Fields this type declares, in declaration order.
    #[serde(default)]
    pub fields: Vec<String>,
    /// The field holding the default payload when a query names no field.
    #[serde(default)]
    pub payload: Option<String>,
}

impl AnnotationDecl {
    pub fn new(name: impl Into<String>) -> Self {
        AnnotationDecl {
            name: name.into(),
            parent: None,
            fields: Vec::new(),
            payload: None,
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.fields.push(name.into());
        self
    }

    /// Declare a field and mark it as the default payload.
    pub fn payload(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.fields.contains(&name) {
            self.fields.push(name.clone());
        }
        self.payload = Some(name);
        self
    }
}

/// The set of declared annotation types.
///
/// The parser only recognizes tags declared here; everything else in a doc
/// block (`@param`, `@see`, prose tags) is skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotationSchema {
    types: IndexMap<String, AnnotationDecl>,
}

impl AnnotationSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, decl: AnnotationDecl) -> &mut Self {
        self.types.insert(decl.name.clone(), decl);
        self
    }

    /// Builder-style variant of [`declare`](Self::declare).
    pub fn with(mut self, decl: AnnotationDecl) -> Self {
        self.declare(decl);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&AnnotationDecl> {
        self.types.get(name)
    }

    /// Whether `concrete` names the `requested` type or one of its
    /// descendants. Unknown types match only by exact name.
    pub fn is_same_or_descendant(&self, concrete: &str, requested: &str) -> bool {
        let mut current = concrete;
        // Bounded by the type count so a declared parent cycle cannot spin.
        for _ in 0..=self.types.len() {
            if current == requested {
                return true;
            }
            match self.types.get(current).and_then(|d| d.parent.as_deref()) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }

    /// All fields of a type, own before inherited, without duplicates.
    pub fn effective_fields(&self, name: &str) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        let mut current = Some(name);
        for _ in 0..=self.types.len() {
            let Some(decl) = current.and_then(|n| self.types.get(n)) else {
                break;
            };
            for field in &decl.fields {
                if !fields.contains(&field.as_str()) {
                    fields.push(field);
                }
            }
            current = decl.parent.as_deref();
        }
        fields
    }

    /// The field to read when a query names none: the nearest explicit
    /// payload declaration along the ancestry, or the single effective
    /// field if the type carries exactly one. `None` means no inference
    /// is possible and the annotation does not qualify for the query.
    pub fn payload_field(&self, name: &str) -> Option<&str> {
        let mut current = Some(name);
        for _ in 0..=self.types.len() {
            let decl = current.and_then(|n| self.types.get(n))?;
            if let Some(payload) = &decl.payload {
                return Some(payload.as_str());
            }
            current = decl.parent.as_deref();
        }
        None
    }

    /// [`payload_field`](Self::payload_field) with the single-field fallback.
    pub fn inferred_field(&self, name: &str) -> Option<&str> {
        if let Some(payload) = self.payload_field(name) {
            return Some(payload);
        }
        match self.effective_fields(name).as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lang_schema() -> AnnotationSchema {
        AnnotationSchema::new()
            .with(AnnotationDecl::new("Lang").payload("content"))
            .with(AnnotationDecl::new("Rus").extends("Lang"))
            .with(AnnotationDecl::new("Eng").extends("Lang"))
    }

    #[test]
    fn test_exact_match() {
        let schema = lang_schema();
        assert!(schema.is_same_or_descendant("Lang", "Lang"));
    }

    #[test]
    fn test_descendant_matches_ancestor() {
        let schema = lang_schema();
        assert!(schema.is_same_or_descendant("Rus", "Lang"));
        assert!(!schema.is_same_or_descendant("Lang", "Rus"));
    }

    #[test]
    fn test_siblings_do_not_match() {
        let schema = lang_schema();
        assert!(!schema.is_same_or_descendant("Rus", "Eng"));
    }

    #[test]
    fn test_unknown_type_matches_by_name_only() {
        let schema = lang_schema();
        assert!(schema.is_same_or_descendant("Mystery", "Mystery"));
        assert!(!schema.is_same_or_descendant("Mystery", "Lang"));
    }

    #[test]
    fn test_parent_cycle_terminates() {
        let schema = AnnotationSchema::new()
            .with(AnnotationDecl::new("A").extends("B"))
            .with(AnnotationDecl::new("B").extends("A"));
        assert!(!schema.is_same_or_descendant("A", "C"));
    }

    #[test]
    fn test_payload_inherited() {
        let schema = lang_schema();
        assert_eq!(schema.inferred_field("Rus"), Some("content"));
    }

    #[test]
    fn test_single_field_inferred_without_payload() {
        let schema =
            AnnotationSchema::new().with(AnnotationDecl::new("Note").field("text"));
        assert_eq!(schema.inferred_field("Note"), Some("text"));
    }

    #[test]
    fn test_no_inference_for_zero_or_many_fields() {
        let schema = AnnotationSchema::new()
            .with(AnnotationDecl::new("Marker"))
            .with(AnnotationDecl::new("Pair").field("a").field("b"));
        assert_eq!(schema.inferred_field("Marker"), None);
        assert_eq!(schema.inferred_field("Pair"), None);
    }

    #[test]
    fn test_effective_fields_include_inherited() {
        let schema = AnnotationSchema::new()
            .with(AnnotationDecl::new("Base").field("id"))
            .with(AnnotationDecl::new("Child").extends("Base").field("label"));
        assert_eq!(schema.effective_fields("Child"), vec!["label", "id"]);
    }
}
