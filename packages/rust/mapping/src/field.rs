//! Field declaration tree: value extractors and [`FieldNode`].

use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Extractors
// ---------------------------------------------------------------------------

/// Read accessor bound to one object's attribute document.
///
/// This is the capability handed to [`ValueExtractor::Bound`] extractors:
/// they read the object's own fields through it without receiving the object
/// itself, mirroring a zero-parameter extractor evaluated in the object's
/// context.
#[derive(Debug, Clone, Copy)]
pub struct AttrReader<'a> {
    object: &'a Value,
}

impl<'a> AttrReader<'a> {
    pub fn new(object: &'a Value) -> Self {
        Self { object }
    }

    /// Value of an attribute, or `Null` when absent.
    pub fn get(&self, name: &str) -> Value {
        self.object.get(name).cloned().unwrap_or(Value::Null)
    }

    /// The whole attribute document.
    pub fn object(&self) -> &Value {
        self.object
    }
}

/// How a field's value is derived from a source object.
///
/// The two closure variants are the two extractor calling conventions:
/// `Bound` is the zero-parameter form (the object is implicit, reachable
/// through an [`AttrReader`]); `WithObject` is the explicit one-parameter
/// form. The variant is fixed at configuration time, so no arity inspection
/// happens at call time.
pub enum ValueExtractor {
    /// Pass the source object through unchanged.
    Identity,
    /// Zero-parameter convention: reads the object via a bound accessor.
    Bound(Box<dyn Fn(&AttrReader<'_>) -> Value + Send + Sync>),
    /// One-parameter convention: receives the object explicitly.
    WithObject(Box<dyn Fn(&Value) -> Value + Send + Sync>),
}

impl ValueExtractor {
    pub fn bound(f: impl Fn(&AttrReader<'_>) -> Value + Send + Sync + 'static) -> Self {
        Self::Bound(Box::new(f))
    }

    pub fn with_object(f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        Self::WithObject(Box::new(f))
    }

    /// Shorthand for an extractor reading one attribute by name.
    pub fn attribute(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::bound(move |attrs| attrs.get(&name))
    }

    /// Evaluate the extractor against `object` using its calling convention.
    pub fn extract(&self, object: &Value) -> Value {
        match self {
            Self::Identity => object.clone(),
            Self::Bound(f) => f(&AttrReader::new(object)),
            Self::WithObject(f) => f(object),
        }
    }
}

impl std::fmt::Debug for ValueExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Identity => f.write_str("Identity"),
            Self::Bound(_) => f.write_str("Bound(..)"),
            Self::WithObject(_) => f.write_str("WithObject(..)"),
        }
    }
}

// ---------------------------------------------------------------------------
// FieldNode
// ---------------------------------------------------------------------------

/// One node of a field declaration tree.
///
/// Carries the field name, its mapping options (rendered verbatim into the
/// schema), a value extractor for document composition, and ordered child
/// fields. Built during the definition phase; read-only afterwards.
#[derive(Debug)]
pub struct FieldNode {
    name: String,
    options: Map<String, Value>,
    value: ValueExtractor,
    children: Vec<FieldNode>,
}

impl FieldNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Map::new(),
            value: ValueExtractor::Identity,
            children: Vec::new(),
        }
    }

    /// Add one mapping option (e.g. `type: "string"`).
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Replace the value extractor (defaults to [`ValueExtractor::Identity`]).
    pub fn with_value(mut self, extractor: ValueExtractor) -> Self {
        self.value = extractor;
        self
    }

    /// Append a child field.
    pub fn with_child(mut self, child: FieldNode) -> Self {
        self.children.push(child);
        self
    }

    /// Append a child field in place (definition phase).
    pub fn push_child(&mut self, child: FieldNode) {
        self.children.push(child);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[FieldNode] {
        &self.children
    }

    pub(crate) fn options_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.options
    }

    /// Render this field's mappings fragment: `{name: {..options, properties}}`.
    pub fn mappings_hash(&self) -> Value {
        let mut hash = Map::new();
        hash.insert(self.name.clone(), Value::Object(self.mappings_body()));
        Value::Object(hash)
    }

    /// The fragment body without the name key; the root composer edits this
    /// before wrapping.
    pub(crate) fn mappings_body(&self) -> Map<String, Value> {
        let mut mapping = self.options.clone();

        if !self.children.is_empty() {
            let mut properties = Map::new();
            for child in &self.children {
                properties.insert(child.name.clone(), Value::Object(child.mappings_body()));
            }
            mapping.insert("properties".into(), Value::Object(properties));
        }

        mapping
    }

    /// Compose this field's document value from a source object.
    ///
    /// Leaf fields yield the extracted value directly. Fields with children
    /// compose each child over the extracted value; arrays compose per
    /// element, preserving order.
    pub fn compose(&self, object: &Value) -> Value {
        let extracted = self.value.extract(object);
        if self.children.is_empty() {
            return extracted;
        }

        match &extracted {
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.compose_children(item)).collect())
            }
            other => self.compose_children(other),
        }
    }

    fn compose_children(&self, object: &Value) -> Value {
        if object.is_null() {
            return Value::Null;
        }
        let mut doc = Map::new();
        for child in &self.children {
            doc.insert(child.name.clone(), child.compose(object));
        }
        Value::Object(doc)
    }
}
