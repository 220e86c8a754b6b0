//! Core domain types shared by the strategy engine and the mapping composer.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TypeName
// ---------------------------------------------------------------------------

/// Identifier for an indexed type, in `"index"` or `"index#doc_type"` form.
///
/// The identifier names the unit a schema is composed for and the routing key
/// for update dispatch. When the doc-type segment is absent the index segment
/// doubles as the document type, which is the common single-type case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Full identifier string, e.g. `"cities#city"`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Index segment, e.g. `"cities"`.
    pub fn index(&self) -> &str {
        self.0.split_once('#').map_or(self.0.as_str(), |(i, _)| i)
    }

    /// Document-type segment; falls back to the index segment.
    pub fn doc_type(&self) -> &str {
        self.0.split_once('#').map_or(self.0.as_str(), |(_, t)| t)
    }
}

impl std::fmt::Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TypeName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ---------------------------------------------------------------------------
// ObjectRef
// ---------------------------------------------------------------------------

/// Opaque reference to a mutated domain object.
///
/// Mutation-tracking collaborators hand these to the strategy engine; the
/// engine never inspects `payload`, only forwards it to the index client.
/// `id` is the object's identity for deduplication purposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Stable object identity within its type.
    pub id: String,
    /// The object's attribute document, as composed for indexing.
    pub payload: serde_json::Value,
}

impl ObjectRef {
    pub fn new(id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            payload,
        }
    }
}
