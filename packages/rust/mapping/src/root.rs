//! Root of a type's field tree: schema assembly and per-document
//! identity/parent/routing extraction.

use serde_json::{Map, Value};

use indexsync_shared::Result;

use crate::field::{FieldNode, ValueExtractor};
use crate::template::{DynamicTemplate, DynamicTemplateRule, TemplateMatcher};

// ---------------------------------------------------------------------------
// Parent / routing configuration
// ---------------------------------------------------------------------------

/// Declared parent relation for a type.
#[derive(Debug, Clone)]
pub enum ParentConfig {
    /// A bare relation name; rendered wrapped as `{"type": <name>}`.
    Literal(String),
    /// A structured relation object; rendered as-is.
    Structured(Map<String, Value>),
}

/// Declared routing configuration for a type.
///
/// Only the declarative `options` reach the schema; the value extractor is
/// behavioral and is applied per document, never serialized.
pub enum RoutingConfig {
    /// Shorthand: route on one attribute of the object.
    Attribute(String),
    /// Full form: declarative metadata plus an optional value extractor.
    Structured {
        options: Map<String, Value>,
        value: Option<ValueExtractor>,
    },
}

impl std::fmt::Debug for RoutingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Attribute(name) => f.debug_tuple("Attribute").field(name).finish(),
            Self::Structured { options, value } => f
                .debug_struct("Structured")
                .field("options", options)
                .field("value", &value.is_some())
                .finish(),
        }
    }
}

impl RoutingConfig {
    /// The declarative metadata that belongs in the schema.
    fn schema_options(&self) -> Map<String, Value> {
        match self {
            Self::Attribute(_) => Map::new(),
            Self::Structured { options, .. } => options.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// RootField
// ---------------------------------------------------------------------------

/// The single root of an indexed type's field declaration tree.
///
/// Holds the field tree, the identity/parent/routing extractors, and the
/// owned dynamic-template list. Exactly one `RootField` exists per indexed
/// type; it is assembled during the definition phase and read-only
/// afterwards, so concurrent `mappings_hash`/`compose_*` calls are safe.
#[derive(Debug)]
pub struct RootField {
    node: FieldNode,
    id: Option<ValueExtractor>,
    parent: Option<ParentConfig>,
    parent_id: Option<ValueExtractor>,
    routing: Option<RoutingConfig>,
    templates: Vec<DynamicTemplate>,
}

impl RootField {
    /// Create a root for the type named `name` with its root-level mapping
    /// options. A `type` option is discarded: the root is never typed.
    pub fn new(name: impl Into<String>, mut options: Map<String, Value>) -> Self {
        options.remove("type");
        let mut node = FieldNode::new(name);
        node.options_mut().extend(options);
        Self {
            node,
            id: None,
            parent: None,
            parent_id: None,
            routing: None,
            templates: Vec::new(),
        }
    }

    // --- definition-phase builders ---

    pub fn with_field(mut self, field: FieldNode) -> Self {
        self.node.push_child(field);
        self
    }

    pub fn with_id(mut self, extractor: ValueExtractor) -> Self {
        self.id = Some(extractor);
        self
    }

    pub fn with_parent(mut self, parent: ParentConfig) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_parent_id(mut self, extractor: ValueExtractor) -> Self {
        self.parent_id = Some(extractor);
        self
    }

    pub fn with_routing(mut self, routing: RoutingConfig) -> Self {
        self.routing = Some(routing);
        self
    }

    /// Append a field in place (definition phase).
    pub fn push_field(&mut self, field: FieldNode) {
        self.node.push_child(field);
    }

    /// Declare a structured dynamic template.
    ///
    /// The rule is auto-named `template_<n>` where `n` is the 1-based count
    /// of templates registered so far (raw entries included); names are
    /// assigned once at registration and never reused. Pattern kind and
    /// path-vs-name targeting are inferred from `matcher`; a malformed regex
    /// source is rejected here, at definition time.
    pub fn dynamic_template(
        &mut self,
        matcher: TemplateMatcher,
        match_mapping_type: Option<&str>,
        mapping: Map<String, Value>,
    ) -> Result<()> {
        let name = format!("template_{}", self.templates.len() + 1);
        let rule = DynamicTemplateRule::new(name, matcher, match_mapping_type, mapping)?;
        tracing::debug!(
            type_name = self.node.name(),
            template = rule.name(),
            pattern = rule.pattern(),
            "registered dynamic template"
        );
        self.templates.push(DynamicTemplate::Rule(rule));
        Ok(())
    }

    /// Append an already-fully-formed template object verbatim.
    pub fn dynamic_template_raw(&mut self, rule: Value) {
        self.templates.push(DynamicTemplate::Raw(rule));
    }

    // --- read accessors ---

    pub fn name(&self) -> &str {
        self.node.name()
    }

    pub fn templates(&self) -> &[DynamicTemplate] {
        &self.templates
    }

    pub fn fields(&self) -> &[FieldNode] {
        self.node.children()
    }

    // --- schema assembly ---

    /// Render the full schema document for this type:
    /// `{<typeName>: {properties, dynamic_templates?, _parent?, _routing?}}`.
    ///
    /// `dynamic_templates`, `_parent` and `_routing` appear only when
    /// configured; `type` never appears at the document root.
    pub fn mappings_hash(&self) -> Value {
        let mut root = self.node.mappings_body();
        root.remove("type");

        if !self.templates.is_empty() {
            let rendered: Vec<Value> = self.templates.iter().map(DynamicTemplate::to_wire).collect();
            root.insert("dynamic_templates".into(), Value::Array(rendered));
        }

        if let Some(parent) = &self.parent {
            let clause = match parent {
                ParentConfig::Literal(name) => {
                    let mut wrapped = Map::new();
                    wrapped.insert("type".into(), Value::String(name.clone()));
                    Value::Object(wrapped)
                }
                ParentConfig::Structured(options) => Value::Object(options.clone()),
            };
            root.insert("_parent".into(), clause);
        }

        if let Some(routing) = &self.routing {
            root.insert("_routing".into(), Value::Object(routing.schema_options()));
        }

        let mut hash = Map::new();
        hash.insert(self.node.name().to_string(), Value::Object(root));
        Value::Object(hash)
    }

    // --- per-document composition ---

    /// The document identity for `object`.
    ///
    /// Evaluates the configured id extractor; without one, falls back to the
    /// object's own `"id"` attribute when present. Identity ultimately
    /// belongs to the collaborator that builds object references — the
    /// fallback only mirrors the most common attribute layout.
    pub fn compose_id(&self, object: &Value) -> Option<Value> {
        match &self.id {
            Some(extractor) => Some(extractor.extract(object)),
            None => object.get("id").cloned(),
        }
    }

    /// The parent-document identity for `object`, from the parent-id
    /// extractor. `None` when no parent-id extraction is configured.
    pub fn compose_parent(&self, object: &Value) -> Option<Value> {
        self.parent_id.as_ref().map(|extractor| extractor.extract(object))
    }

    /// The routing value for `object`. `None` when routing is unconfigured
    /// or carries no value extractor.
    pub fn compose_routing(&self, object: &Value) -> Option<Value> {
        match &self.routing {
            None => None,
            Some(RoutingConfig::Attribute(name)) => object.get(name).cloned(),
            Some(RoutingConfig::Structured { value, .. }) => {
                value.as_ref().map(|extractor| extractor.extract(object))
            }
        }
    }

    /// Compose the full index document for `object` from the field tree.
    pub fn compose_document(&self, object: &Value) -> Value {
        self.node.compose(object)
    }
}
