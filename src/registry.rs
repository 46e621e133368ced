//! Class metadata registry.
//!
//! The introspection side of resolution: which constants a class declares,
//! and the doc comments attached to the class, its constants, methods and
//! properties. Classes are registered explicitly (or deserialized from
//! data) instead of being discovered by runtime reflection.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, TargetKind};
use crate::value::ConstValue;

/// One class constant: name, value and the raw doc comment attached to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantDescriptor {
    pub name: String,
    pub value: ConstValue,
    #[serde(default)]
    pub doc: String,
}

/// Metadata for one class: its own doc comment, constants in declaration
/// order, and doc comments for named methods and properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMeta {
    pub name: String,
    #[serde(default)]
    pub doc: String,
    #[serde(default)]
    pub constants: Vec<ConstantDescriptor>,
    #[serde(default)]
    pub methods: IndexMap<String, String>,
    #[serde(default)]
    pub properties: IndexMap<String, String>,
}

impl ClassMeta {
    pub fn new(name: impl Into<String>) -> Self {
        ClassMeta {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    pub fn constant(
        mut self,
        name: impl Into<String>,
        value: impl Into<ConstValue>,
        doc: impl Into<String>,
    ) -> Self {
        self.constants.push(ConstantDescriptor {
            name: name.into(),
            value: value.into(),
            doc: doc.into(),
        });
        self
    }

    pub fn method(mut self, name: impl Into<String>, doc: impl Into<String>) -> Self {
        self.methods.insert(name.into(), doc.into());
        self
    }

    pub fn property(mut self, name: impl Into<String>, doc: impl Into<String>) -> Self {
        self.properties.insert(name.into(), doc.into());
        self
    }

    /// Constants whose name starts with `prefix`, in declaration order.
    /// The empty prefix enumerates everything.
    pub fn constants_with_prefix<'a, 'p>(
        &'a self,
        prefix: &'p str,
    ) -> impl Iterator<Item = &'a ConstantDescriptor> + use<'a, 'p> {
        self.constants
            .iter()
            .filter(move |c| c.name.starts_with(prefix))
    }

    pub fn constant_named(&self, name: &str) -> Option<&ConstantDescriptor> {
        self.constants.iter().find(|c| c.name == name)
    }

    /// Name of the first prefixed constant whose value loosely matches
    /// `value` (both sides coerced to integer).
    pub fn constant_name_by_value(&self, value: &ConstValue, prefix: &str) -> Option<&str> {
        self.constants_with_prefix(prefix)
            .find(|c| c.value.loosely_eq(value))
            .map(|c| c.name.as_str())
    }
}

/// Registry of all known classes, keyed by class name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassRegistry {
    classes: IndexMap<String, ClassMeta>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, meta: ClassMeta) -> &mut Self {
        self.classes.insert(meta.name.clone(), meta);
        self
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with(mut self, meta: ClassMeta) -> Self {
        self.register(meta);
        self
    }

    pub fn class(&self, name: &str) -> Result<&ClassMeta> {
        self.classes
            .get(name)
            .ok_or_else(|| Error::ClassNotFound(name.to_string()))
    }

    pub fn constant_doc(&self, class: &str, constant: &str) -> Result<&str> {
        let meta = self.class(class)?;
        meta.constant_named(constant)
            .map(|c| c.doc.as_str())
            .ok_or_else(|| Error::member_not_found(TargetKind::Constant, constant, class))
    }

    pub fn method_doc(&self, class: &str, method: &str) -> Result<&str> {
        let meta = self.class(class)?;
        meta.methods
            .get(method)
            .map(String::as_str)
            .ok_or_else(|| Error::member_not_found(TargetKind::Method, method, class))
    }

    pub fn property_doc(&self, class: &str, property: &str) -> Result<&str> {
        let meta = self.class(class)?;
        meta.properties
            .get(property)
            .map(String::as_str)
            .ok_or_else(|| Error::member_not_found(TargetKind::Property, property, class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_class() -> ClassMeta {
        ClassMeta::new("Status")
            .doc("/** Status codes. */")
            .constant("STATUS_ACTIVE", 1, "/** active */")
            .constant("STATUS_INACTIVE", 2, "")
            .constant("LEGACY", "5", "")
            .method("save", "/** @Audit */")
            .property("state", "")
    }

    #[test]
    fn test_prefix_filter() {
        let meta = status_class();
        let names: Vec<&str> = meta
            .constants_with_prefix("STATUS_")
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["STATUS_ACTIVE", "STATUS_INACTIVE"]);
    }

    #[test]
    fn test_empty_prefix_enumerates_all() {
        let meta = status_class();
        assert_eq!(meta.constants_with_prefix("").count(), 3);
    }

    #[test]
    fn test_constant_name_by_value_is_loose() {
        let meta = status_class();
        assert_eq!(
            meta.constant_name_by_value(&ConstValue::Int(5), ""),
            Some("LEGACY")
        );
        assert_eq!(
            meta.constant_name_by_value(&ConstValue::from("2"), "STATUS_"),
            Some("STATUS_INACTIVE")
        );
        assert_eq!(meta.constant_name_by_value(&ConstValue::Int(9), ""), None);
    }

    #[test]
    fn test_registry_lookups() {
        let registry = ClassRegistry::new().with(status_class());
        assert!(registry.class("Status").is_ok());
        assert_eq!(registry.method_doc("Status", "save").unwrap(), "/** @Audit */");
        assert_eq!(registry.property_doc("Status", "state").unwrap(), "");
        assert_eq!(
            registry.constant_doc("Status", "STATUS_ACTIVE").unwrap(),
            "/** active */"
        );
    }

    #[test]
    fn test_unknown_targets_error() {
        let registry = ClassRegistry::new().with(status_class());
        assert!(matches!(
            registry.class("Missing"),
            Err(Error::ClassNotFound(_))
        ));
        assert!(matches!(
            registry.method_doc("Status", "missing"),
            Err(Error::ReflectionTargetNotFound {
                kind: TargetKind::Method,
                ..
            })
        ));
        assert!(matches!(
            registry.constant_doc("Status", "MISSING"),
            Err(Error::ReflectionTargetNotFound {
                kind: TargetKind::Constant,
                ..
            })
        ));
        assert!(matches!(
            registry.property_doc("Status", "missing"),
            Err(Error::ReflectionTargetNotFound {
                kind: TargetKind::Property,
                ..
            })
        ));
    }
}
