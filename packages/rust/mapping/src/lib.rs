//! Schema/mapping composer for IndexSync.
//!
//! A type's schema is declared once as a tree of [`FieldNode`]s under a
//! single [`RootField`], then rendered to the engine's mappings document
//! with [`RootField::mappings_hash`] and evaluated per document with the
//! `compose_*` methods. Declaration is single-writer (`&mut` builders);
//! after the definition phase the tree is immutable and safe to share
//! across document-processing threads.

pub mod field;
pub mod root;
pub mod template;

pub use field::{AttrReader, FieldNode, ValueExtractor};
pub use root::{ParentConfig, RootField, RoutingConfig};
pub use template::{DynamicTemplate, DynamicTemplateRule, TemplateMatcher};
