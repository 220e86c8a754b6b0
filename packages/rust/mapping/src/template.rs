//! Dynamic template rules: schema directives that auto-assign a mapping to
//! fields matching a name pattern.

use indexsync_shared::{IndexSyncError, Result};
use regex::Regex;
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Matchers
// ---------------------------------------------------------------------------

/// The pattern a dynamic template is declared with.
#[derive(Debug, Clone)]
pub enum TemplateMatcher {
    /// A literal field-name pattern; `*` wildcards are allowed.
    Literal(String),
    /// A regular-expression source.
    Pattern(String),
}

impl TemplateMatcher {
    pub fn literal(pattern: impl Into<String>) -> Self {
        Self::Literal(pattern.into())
    }

    pub fn regex(source: impl Into<String>) -> Self {
        Self::Pattern(source.into())
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// One structured dynamic-template rule.
///
/// Whether the rule targets the full dotted field path (`path_match`) or the
/// final name segment (`match`) is inferred from the declared pattern: a
/// literal containing `.`, or a regex source containing `\.`, targets paths.
#[derive(Debug, Clone)]
pub struct DynamicTemplateRule {
    name: String,
    pattern: String,
    path_match: bool,
    regex: Option<Regex>,
    match_mapping_type: Option<String>,
    mapping: Map<String, Value>,
}

impl DynamicTemplateRule {
    /// Build a rule from a declared matcher.
    ///
    /// Regex sources are compiled here, so a malformed source fails at
    /// definition time, not during later matching or rendering.
    pub fn new(
        name: impl Into<String>,
        matcher: TemplateMatcher,
        match_mapping_type: Option<&str>,
        mapping: Map<String, Value>,
    ) -> Result<Self> {
        let (pattern, regex) = match matcher {
            TemplateMatcher::Literal(pattern) => (pattern, None),
            TemplateMatcher::Pattern(source) => {
                let compiled = Regex::new(&source).map_err(|e| {
                    IndexSyncError::validation(format!("invalid template pattern /{source}/: {e}"))
                })?;
                (source, Some(compiled))
            }
        };

        // Path separator: a literal dot in plain patterns, an escaped dot in
        // regex sources.
        let separator = if regex.is_some() { "\\." } else { "." };
        let path_match = pattern.contains(separator);

        Ok(Self {
            name: name.into(),
            pattern,
            path_match,
            regex,
            match_mapping_type: match_mapping_type.map(str::to_string),
            mapping,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_path_match(&self) -> bool {
        self.path_match
    }

    pub fn is_regex(&self) -> bool {
        self.regex.is_some()
    }

    /// Render the rule to its wire shape:
    /// `{name: {match|path_match, match_pattern?, match_mapping_type?, mapping}}`.
    pub fn to_wire(&self) -> Value {
        let mut body = Map::new();

        let match_key = if self.path_match { "path_match" } else { "match" };
        body.insert(match_key.into(), Value::String(self.pattern.clone()));

        if self.regex.is_some() {
            body.insert("match_pattern".into(), Value::String("regexp".into()));
        }
        if let Some(filter) = &self.match_mapping_type {
            body.insert("match_mapping_type".into(), Value::String(filter.clone()));
        }
        body.insert("mapping".into(), Value::Object(self.mapping.clone()));

        let mut wire = Map::new();
        wire.insert(self.name.clone(), Value::Object(body));
        Value::Object(wire)
    }

    /// Whether this rule applies to a field at `field_path` (dotted) whose
    /// detected mapping type is `detected_type`.
    ///
    /// Plain rules match the final path segment, path rules the full path;
    /// regex rules use the compiled expression, literal rules support `*`
    /// wildcards. A `match_mapping_type` filter must agree when present.
    pub fn matches(&self, field_path: &str, detected_type: Option<&str>) -> bool {
        if let Some(filter) = &self.match_mapping_type {
            if detected_type != Some(filter.as_str()) {
                return false;
            }
        }

        let target = if self.path_match {
            field_path
        } else {
            field_path.rsplit('.').next().unwrap_or(field_path)
        };

        match &self.regex {
            Some(regex) => regex.is_match(target),
            None => wildcard_match(&self.pattern, target),
        }
    }
}

/// Match a literal pattern with `*` wildcards against a whole string.
fn wildcard_match(pattern: &str, target: &str) -> bool {
    let anchored = format!("^{}$", regex::escape(pattern).replace("\\*", ".*"));
    match Regex::new(&anchored) {
        Ok(regex) => regex.is_match(target),
        Err(_) => false,
    }
}

// ---------------------------------------------------------------------------
// Template list entries
// ---------------------------------------------------------------------------

/// One entry of a type's dynamic-template list.
///
/// `Raw` is the no-matcher declaration convention: the caller supplies an
/// already-fully-formed rule object and it is appended verbatim.
#[derive(Debug, Clone)]
pub enum DynamicTemplate {
    Rule(DynamicTemplateRule),
    Raw(Value),
}

impl DynamicTemplate {
    pub fn to_wire(&self) -> Value {
        match self {
            Self::Rule(rule) => rule.to_wire(),
            Self::Raw(value) => value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn string_mapping() -> Map<String, Value> {
        let mut mapping = Map::new();
        mapping.insert("type".into(), json!("string"));
        mapping
    }

    #[test]
    fn dotted_literal_is_path_match() {
        let rule = DynamicTemplateRule::new(
            "template_1",
            TemplateMatcher::literal("foo.bar"),
            None,
            string_mapping(),
        )
        .expect("rule");

        assert!(rule.is_path_match());
        assert_eq!(
            rule.to_wire(),
            json!({"template_1": {"path_match": "foo.bar", "mapping": {"type": "string"}}})
        );
    }

    #[test]
    fn plain_literal_is_name_match() {
        let rule = DynamicTemplateRule::new(
            "template_1",
            TemplateMatcher::literal("foo"),
            None,
            string_mapping(),
        )
        .expect("rule");

        assert!(!rule.is_path_match());
        assert_eq!(
            rule.to_wire(),
            json!({"template_1": {"match": "foo", "mapping": {"type": "string"}}})
        );
    }

    #[test]
    fn regex_matcher_sets_match_pattern() {
        let rule = DynamicTemplateRule::new(
            "template_1",
            TemplateMatcher::regex("^foo"),
            None,
            string_mapping(),
        )
        .expect("rule");

        assert!(rule.is_regex());
        assert!(!rule.is_path_match());
        assert_eq!(
            rule.to_wire(),
            json!({
                "template_1": {
                    "match": "^foo",
                    "match_pattern": "regexp",
                    "mapping": {"type": "string"}
                }
            })
        );
    }

    #[test]
    fn regex_with_escaped_dot_is_path_match() {
        let rule = DynamicTemplateRule::new(
            "template_1",
            TemplateMatcher::regex(r"^attachments\.(title|body)$"),
            None,
            string_mapping(),
        )
        .expect("rule");

        assert!(rule.is_path_match());
        let wire = rule.to_wire();
        assert_eq!(wire["template_1"]["path_match"], r"^attachments\.(title|body)$");
    }

    #[test]
    fn malformed_regex_fails_at_declaration() {
        let result = DynamicTemplateRule::new(
            "template_1",
            TemplateMatcher::regex("(unclosed"),
            None,
            string_mapping(),
        );
        assert!(matches!(result, Err(IndexSyncError::Validation { .. })));
    }

    #[test]
    fn mapping_type_filter_is_rendered() {
        let rule = DynamicTemplateRule::new(
            "named",
            TemplateMatcher::literal("*_count"),
            Some("long"),
            Map::new(),
        )
        .expect("rule");

        assert_eq!(
            rule.to_wire(),
            json!({
                "named": {
                    "match": "*_count",
                    "match_mapping_type": "long",
                    "mapping": {}
                }
            })
        );
    }

    #[test]
    fn plain_rule_matches_final_segment() {
        let rule = DynamicTemplateRule::new(
            "t",
            TemplateMatcher::literal("title"),
            None,
            Map::new(),
        )
        .expect("rule");

        assert!(rule.matches("title", None));
        assert!(rule.matches("book.title", None));
        assert!(!rule.matches("book.subtitle", None));
    }

    #[test]
    fn path_rule_matches_full_path() {
        let rule = DynamicTemplateRule::new(
            "t",
            TemplateMatcher::literal("book.title"),
            None,
            Map::new(),
        )
        .expect("rule");

        assert!(rule.matches("book.title", None));
        assert!(!rule.matches("title", None));
    }

    #[test]
    fn wildcard_rule_matches_by_glob() {
        let rule = DynamicTemplateRule::new(
            "t",
            TemplateMatcher::literal("*_count"),
            None,
            Map::new(),
        )
        .expect("rule");

        assert!(rule.matches("word_count", None));
        assert!(!rule.matches("count_words", None));
    }

    #[test]
    fn regex_rule_matches_by_expression() {
        let rule = DynamicTemplateRule::new(
            "t",
            TemplateMatcher::regex("^foo"),
            None,
            Map::new(),
        )
        .expect("rule");

        assert!(rule.matches("foobar", None));
        assert!(!rule.matches("barfoo", None));
    }

    #[test]
    fn mapping_type_filter_gates_matching() {
        let rule = DynamicTemplateRule::new(
            "t",
            TemplateMatcher::literal("*"),
            Some("string"),
            Map::new(),
        )
        .expect("rule");

        assert!(rule.matches("anything", Some("string")));
        assert!(!rule.matches("anything", Some("long")));
        assert!(!rule.matches("anything", None));
    }

    #[test]
    fn raw_template_passes_through() {
        let raw = json!({"custom": {"match": "x", "mapping": {"type": "keyword"}}});
        let template = DynamicTemplate::Raw(raw.clone());
        assert_eq!(template.to_wire(), raw);
    }
}
