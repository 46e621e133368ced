//! Enumdoc - description resolution for documented constants
//!
//! Enumdoc resolves human-readable descriptions for enum-like class
//! constants from typed annotations in their doc comments. Given a class
//! whose constants carry doc blocks like `/** @Description("Active") */`,
//! it builds lookup tables mapping constant names or values to description
//! strings, falling back to the constant's own name when no annotation
//! matches.
//!
//! ## Module Structure
//!
//! - `error`: Error types for the propagating lookups
//! - `parser`: Doc-block annotation parsing
//! - `registry`: Class metadata (constants, method/property doc comments)
//! - `resolver`: The resolution engine and its query shapes
//! - `schema`: Explicit annotation type declarations
//! - `value`: Constant values and loose integer matching
//!
//! ## Example
//!
//! ```
//! use enumdoc::{
//!     AnnotationDecl, AnnotationSchema, ClassMeta, ClassRegistry, ConstValue, DocParser,
//!     Resolver,
//! };
//!
//! let schema = AnnotationSchema::new()
//!     .with(AnnotationDecl::new("Description").payload("content"));
//!
//! let registry = ClassRegistry::new().with(
//!     ClassMeta::new("OrderStatus")
//!         .constant("STATUS_NEW", 1, r#"/** @Description("Freshly placed") */"#)
//!         .constant("STATUS_SHIPPED", 2, ""),
//! );
//!
//! let resolver = Resolver::new(registry, schema, DocParser::new());
//! let descriptions = resolver.describe_all("OrderStatus", "STATUS_");
//!
//! assert_eq!(descriptions[&ConstValue::Int(1)], "Freshly placed");
//! assert_eq!(descriptions[&ConstValue::Int(2)], "STATUS_SHIPPED");
//! ```

pub mod error;
pub mod parser;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod value;

pub use error::{Error, Result, TargetKind};
pub use parser::{Annotation, DocParser};
pub use registry::{ClassMeta, ClassRegistry, ConstantDescriptor};
pub use resolver::Resolver;
pub use schema::{AnnotationDecl, AnnotationSchema};
pub use value::ConstValue;
