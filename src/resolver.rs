//! Annotation resolution.
//!
//! The query engine over [`ClassRegistry`] and [`DocParser`]: find the
//! description annotation attached to a constant's doc comment and build
//! name- or value-keyed description maps for a whole class.
//!
//! Two failure contracts coexist:
//! - the bulk and by-value lookups are best-effort: any failure is logged
//!   and collapsed to an empty result, never surfaced;
//! - the doc-scope lookups (`class_annotation` and friends) propagate
//!   unknown-target and parse errors.

use indexmap::IndexMap;

use crate::error::Result;
use crate::parser::{Annotation, DocParser};
use crate::registry::ClassRegistry;
use crate::schema::AnnotationSchema;
use crate::value::ConstValue;

/// Resolves annotation values for documented constants.
///
/// Holds no interior mutability; all queries take `&self`, so one
/// instance can be shared across threads behind `OnceLock` or `Arc`.
#[derive(Debug, Clone)]
pub struct Resolver {
    registry: ClassRegistry,
    schema: AnnotationSchema,
    parser: DocParser,
    default_type: String,
}

impl Resolver {
    pub fn new(registry: ClassRegistry, schema: AnnotationSchema, parser: DocParser) -> Self {
        Resolver {
            registry,
            schema,
            parser,
            default_type: "Description".to_string(),
        }
    }

    /// Set the annotation type used by the `describe_*` convenience
    /// queries. Defaults to `Description`.
    pub fn with_default_type(mut self, name: impl Into<String>) -> Self {
        self.default_type = name.into();
        self
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    pub fn schema(&self) -> &AnnotationSchema {
        &self.schema
    }

    /// The core matching routine. Scans `annotations` in parse order for
    /// the first object of the requested type (or a descendant) that
    /// yields a value:
    ///
    /// - with an explicit `field`, the first matching object carrying
    ///   that field wins; objects lacking it are passed over without
    ///   giving up the field constraint;
    /// - without one, the field is inferred from the matched object's
    ///   type declaration (explicit payload, or the single declared
    ///   field) and then locked in for the rest of this scan; objects
    ///   whose type declares zero or several fields and no payload do
    ///   not qualify.
    pub fn extract_value(
        &self,
        annotations: &[Annotation],
        requested_type: &str,
        field: Option<&str>,
    ) -> Option<String> {
        let mut field: Option<String> = field.map(str::to_string);

        for annotation in annotations {
            if !self
                .schema
                .is_same_or_descendant(&annotation.type_name, requested_type)
            {
                continue;
            }

            let name = match field.clone() {
                Some(name) => name,
                None => match self.schema.inferred_field(&annotation.type_name) {
                    Some(inferred) => {
                        field = Some(inferred.to_string());
                        inferred.to_string()
                    }
                    None => continue,
                },
            };

            if let Some(value) = annotation.field(&name) {
                return Some(value.to_string());
            }
        }

        None
    }

    /// First annotation in `annotations` whose type is `requested_type`
    /// or a descendant of it.
    pub fn find_annotation<'a>(
        &self,
        annotations: &'a [Annotation],
        requested_type: &str,
    ) -> Option<&'a Annotation> {
        annotations.iter().find(|a| {
            self.schema
                .is_same_or_descendant(&a.type_name, requested_type)
        })
    }

    /// Description for the first prefixed constant of `class` whose value
    /// loosely matches `value` (both sides coerced to integer). Only that
    /// first match is considered. Best-effort: failures are logged and
    /// yield `None`.
    pub fn comment_by_value(
        &self,
        class: &str,
        requested_type: &str,
        value: &ConstValue,
        field: Option<&str>,
        prefix: &str,
    ) -> Option<String> {
        self.best_effort(class, || {
            let meta = self.registry.class(class)?;
            for constant in meta.constants_with_prefix(prefix) {
                if constant.value.loosely_eq(value) {
                    let annotations = self.parser.parse(&constant.doc, &self.schema)?;
                    return Ok(self.extract_value(&annotations, requested_type, field));
                }
            }
            Ok(None)
        })
        .flatten()
    }

    /// Map of constant name to resolved description for every prefixed
    /// constant of `class`. Constants with no matching annotation are
    /// present with a `None` value. Best-effort and all-or-nothing: any
    /// failure is logged and the whole call returns an empty map.
    pub fn collect_by_name(
        &self,
        class: &str,
        prefix: &str,
        requested_type: &str,
        field: Option<&str>,
        strip_prefix: bool,
    ) -> IndexMap<String, Option<String>> {
        self.best_effort(class, || {
            let meta = self.registry.class(class)?;
            let mut result = IndexMap::new();
            for constant in meta.constants_with_prefix(prefix) {
                let key = if strip_prefix {
                    constant.name.strip_prefix(prefix).unwrap_or(&constant.name)
                } else {
                    &constant.name
                };
                let annotations = self.parser.parse(&constant.doc, &self.schema)?;
                result.insert(
                    key.to_string(),
                    self.extract_value(&annotations, requested_type, field),
                );
            }
            Ok(result)
        })
        .unwrap_or_default()
    }

    /// Map of constant value to resolved description for every prefixed
    /// constant of `class`. Constants with no matching annotation are
    /// present with an explicit empty string, a deliberately different
    /// convention from [`collect_by_name`](Self::collect_by_name).
    /// Best-effort and all-or-nothing like it.
    pub fn collect_by_value(
        &self,
        class: &str,
        prefix: &str,
        requested_type: &str,
        field: Option<&str>,
    ) -> IndexMap<ConstValue, String> {
        self.best_effort(class, || {
            let meta = self.registry.class(class)?;
            let mut result = IndexMap::new();
            for constant in meta.constants_with_prefix(prefix) {
                let annotations = self.parser.parse(&constant.doc, &self.schema)?;
                let comment = self
                    .extract_value(&annotations, requested_type, field)
                    .unwrap_or_default();
                result.insert(constant.value.clone(), comment);
            }
            Ok(result)
        })
        .unwrap_or_default()
    }

    /// Value-keyed descriptions for every prefixed constant, using the
    /// resolver's default annotation type, with the constant's own name
    /// substituted wherever no annotation resolved. Every entry gets a
    /// non-empty display string as long as a constant with that value
    /// exists.
    pub fn describe_all(&self, class: &str, prefix: &str) -> IndexMap<ConstValue, String> {
        let collected = self.collect_by_value(class, prefix, &self.default_type, None);
        let mut result = IndexMap::with_capacity(collected.len());
        for (value, comment) in collected {
            let display = if comment.is_empty() {
                self.registry
                    .class(class)
                    .ok()
                    .and_then(|meta| meta.constant_name_by_value(&value, prefix))
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string())
            } else {
                comment
            };
            result.insert(value, display);
        }
        result
    }

    /// [`describe_all`](Self::describe_all) filtered to the given values,
    /// preserving the enumeration order of the full map. Filtering is
    /// strict equality, not the loose integer match.
    pub fn describe_subset(
        &self,
        values: &[ConstValue],
        class: &str,
        prefix: &str,
    ) -> IndexMap<ConstValue, String> {
        self.describe_all(class, prefix)
            .into_iter()
            .filter(|(value, _)| values.contains(value))
            .collect()
    }

    /// Description for a single constant value with fallback to the
    /// constant's name: the default annotation type's payload if one
    /// resolves, else the name of the first constant loosely matching
    /// `value`, else `None`.
    pub fn describe_value(
        &self,
        value: &ConstValue,
        class: &str,
        prefix: &str,
    ) -> Option<String> {
        let field = self.schema.inferred_field(&self.default_type);
        self.comment_by_value(class, &self.default_type, value, field, prefix)
            .or_else(|| {
                self.registry
                    .class(class)
                    .ok()
                    .and_then(|meta| meta.constant_name_by_value(value, prefix))
                    .map(str::to_string)
            })
    }

    /// First matching annotation on the class's own doc comment.
    /// Propagates unknown-class and parse errors.
    pub fn class_annotation(&self, class: &str, requested_type: &str) -> Result<Option<Annotation>> {
        let doc = self.registry.class(class)?.doc.clone();
        self.annotation_of_doc(&doc, requested_type)
    }

    /// First matching annotation on a named method's doc comment.
    pub fn method_annotation(
        &self,
        class: &str,
        method: &str,
        requested_type: &str,
    ) -> Result<Option<Annotation>> {
        let doc = self.registry.method_doc(class, method)?.to_string();
        self.annotation_of_doc(&doc, requested_type)
    }

    /// First matching annotation on a named property's doc comment.
    pub fn property_annotation(
        &self,
        class: &str,
        property: &str,
        requested_type: &str,
    ) -> Result<Option<Annotation>> {
        let doc = self.registry.property_doc(class, property)?.to_string();
        self.annotation_of_doc(&doc, requested_type)
    }

    /// First matching annotation on a named constant's doc comment.
    pub fn constant_annotation(
        &self,
        class: &str,
        constant: &str,
        requested_type: &str,
    ) -> Result<Option<Annotation>> {
        let doc = self.registry.constant_doc(class, constant)?.to_string();
        self.annotation_of_doc(&doc, requested_type)
    }

    /// Extracted annotation value from the class's own doc comment.
    /// Propagating, unlike the constant-scope lookups.
    pub fn class_annotation_value(
        &self,
        class: &str,
        requested_type: &str,
        field: Option<&str>,
    ) -> Result<Option<String>> {
        let doc = self.registry.class(class)?.doc.clone();
        let annotations = self.parser.parse(&doc, &self.schema)?;
        Ok(self.extract_value(&annotations, requested_type, field))
    }

    /// Extracted annotation value from a named method's doc comment.
    pub fn method_annotation_value(
        &self,
        class: &str,
        method: &str,
        requested_type: &str,
        field: Option<&str>,
    ) -> Result<Option<String>> {
        let doc = self.registry.method_doc(class, method)?.to_string();
        let annotations = self.parser.parse(&doc, &self.schema)?;
        Ok(self.extract_value(&annotations, requested_type, field))
    }

    fn annotation_of_doc(&self, doc: &str, requested_type: &str) -> Result<Option<Annotation>> {
        let annotations = self.parser.parse(doc, &self.schema)?;
        Ok(self.find_annotation(&annotations, requested_type).cloned())
    }

    /// Run an operation under the best-effort contract: `Err` becomes a
    /// logged warning naming the source class, and `None`.
    fn best_effort<T>(&self, class: &str, op: impl FnOnce() -> Result<T>) -> Option<T> {
        match op() {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("failed to collect constant comments in class {class}: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AnnotationDecl;

    fn schema() -> AnnotationSchema {
        AnnotationSchema::new()
            .with(AnnotationDecl::new("Description").payload("content"))
            .with(AnnotationDecl::new("Rus").extends("Description"))
            .with(AnnotationDecl::new("Note").field("text"))
            .with(AnnotationDecl::new("Pair").field("a").field("b"))
            .with(AnnotationDecl::new("Marker"))
    }

    fn resolver() -> Resolver {
        Resolver::new(ClassRegistry::new(), schema(), DocParser::new())
    }

    fn ann(type_name: &str, fields: &[(&str, &str)]) -> Annotation {
        fields
            .iter()
            .fold(Annotation::new(type_name), |a, (k, v)| a.with_field(*k, *v))
    }

    #[test]
    fn test_extract_explicit_field() {
        let r = resolver();
        let anns = vec![ann("Description", &[("content", "hello")])];
        assert_eq!(
            r.extract_value(&anns, "Description", Some("content")),
            Some("hello".to_string())
        );
    }

    #[test]
    fn test_extract_skips_non_matching_types() {
        let r = resolver();
        let anns = vec![
            ann("Note", &[("text", "wrong")]),
            ann("Description", &[("content", "right")]),
        ];
        assert_eq!(
            r.extract_value(&anns, "Description", Some("content")),
            Some("right".to_string())
        );
    }

    #[test]
    fn test_extract_descendant_matches() {
        let r = resolver();
        let anns = vec![ann("Rus", &[("content", "привет")])];
        assert_eq!(
            r.extract_value(&anns, "Description", None),
            Some("привет".to_string())
        );
    }

    #[test]
    fn test_extract_first_match_wins() {
        let r = resolver();
        let first = ann("Description", &[("content", "one")]);
        let second = ann("Description", &[("content", "two")]);

        let forward = r.extract_value(&[first.clone(), second.clone()], "Description", None);
        let reversed = r.extract_value(&[second, first], "Description", None);
        assert_eq!(forward, Some("one".to_string()));
        assert_eq!(reversed, Some("two".to_string()));
    }

    #[test]
    fn test_extract_missing_explicit_field_keeps_scanning() {
        let r = resolver();
        let anns = vec![
            ann("Description", &[("other", "nope")]),
            ann("Description", &[("content", "found")]),
        ];
        assert_eq!(
            r.extract_value(&anns, "Description", Some("content")),
            Some("found".to_string())
        );
    }

    #[test]
    fn test_extract_inference_by_field_count() {
        let r = resolver();
        // Zero declared fields: does not qualify.
        assert_eq!(r.extract_value(&[ann("Marker", &[])], "Marker", None), None);
        // One declared field: inferred.
        assert_eq!(
            r.extract_value(&[ann("Note", &[("text", "v")])], "Note", None),
            Some("v".to_string())
        );
        // Two declared fields, no payload: skipped.
        assert_eq!(
            r.extract_value(&[ann("Pair", &[("a", "1"), ("b", "2")])], "Pair", None),
            None
        );
    }

    #[test]
    fn test_extract_unqualified_object_does_not_stop_scan() {
        let r = resolver();
        let anns = vec![
            ann("Pair", &[("a", "1"), ("b", "2")]),
            ann("Note", &[("text", "v")]),
        ];
        assert_eq!(r.extract_value(&anns, "Pair", None), None);
        assert_eq!(r.extract_value(&anns, "Note", None), Some("v".to_string()));
    }

    #[test]
    fn test_extract_inferred_field_locked_for_scan() {
        let schema = AnnotationSchema::new()
            .with(AnnotationDecl::new("Base"))
            .with(AnnotationDecl::new("ChildX").extends("Base").payload("x"))
            .with(AnnotationDecl::new("ChildY").extends("Base").payload("y"));
        let r = Resolver::new(ClassRegistry::new(), schema, DocParser::new());

        // The first matching object infers "x"; the second carries only
        // "y", which no longer qualifies once the field is locked in.
        let anns = vec![ann("ChildX", &[]), ann("ChildY", &[("y", "val")])];
        assert_eq!(r.extract_value(&anns, "Base", None), None);

        // Without the lock the second object would have resolved.
        let anns = vec![ann("ChildY", &[("y", "val")])];
        assert_eq!(r.extract_value(&anns, "Base", None), Some("val".to_string()));
    }

    #[test]
    fn test_find_annotation_structural() {
        let r = resolver();
        let anns = vec![ann("Note", &[]), ann("Rus", &[("content", "x")])];
        let found = r.find_annotation(&anns, "Description").unwrap();
        assert_eq!(found.type_name, "Rus");
        assert!(r.find_annotation(&anns, "Pair").is_none());
    }
}
