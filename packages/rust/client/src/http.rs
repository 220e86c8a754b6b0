//! Blocking HTTP implementation of [`IndexClient`] for
//! Elasticsearch-compatible engines.
//!
//! Single updates go to the document endpoint, batched updates to `_bulk`
//! with NDJSON action/source pairs. Index names are prefixed with the
//! configured prefix so one cluster can host several environments.

use std::time::Duration;

use indexsync_shared::{AppConfig, IndexSyncError, ObjectRef, Result, TypeName};
use serde_json::Value;
use url::Url;

use crate::IndexClient;

/// Connection settings for [`HttpClient`].
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL of the search-engine HTTP endpoint.
    pub base_url: String,
    /// Prefix prepended to every index name (empty disables prefixing).
    pub prefix: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Cluster status to wait for in [`HttpClient::wait_for_status`].
    pub wait_for_status: Option<String>,
}

impl From<&AppConfig> for HttpClientConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.connection.url.clone(),
            prefix: config.index.prefix.clone(),
            timeout: Duration::from_secs(config.connection.timeout_secs),
            wait_for_status: config.connection.wait_for_status.clone(),
        }
    }
}

/// Elasticsearch-compatible HTTP index client.
pub struct HttpClient {
    http: reqwest::blocking::Client,
    base_url: Url,
    prefix: String,
    wait_for_status: Option<String>,
}

impl HttpClient {
    /// Build a client from connection settings.
    pub fn new(config: &HttpClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            IndexSyncError::config(format!("invalid connection URL '{}': {e}", config.base_url))
        })?;

        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("IndexSync/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| IndexSyncError::Transport(format!("client build: {e}")))?;

        Ok(Self {
            http,
            base_url,
            prefix: config.prefix.clone(),
            wait_for_status: config.wait_for_status.clone(),
        })
    }

    /// The on-cluster index name for a type: `<prefix>_<index>`, or the bare
    /// index name when the prefix is empty.
    pub fn index_name(&self, type_name: &TypeName) -> String {
        prefixed_index(&self.prefix, type_name.index())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| IndexSyncError::config("connection URL cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn check_response(response: reqwest::blocking::Response) -> Result<Value> {
        let status = response.status();
        let body: Value = response
            .json()
            .map_err(|e| IndexSyncError::Transport(format!("response body: {e}")))?;

        if !status.is_success() {
            return Err(IndexSyncError::Index(format!("HTTP {status}: {body}")));
        }
        Ok(body)
    }

    /// Check that the engine answers on the configured endpoint.
    pub fn ping(&self) -> Result<Value> {
        let response = self
            .http
            .get(self.base_url.clone())
            .send()
            .map_err(|e| IndexSyncError::Transport(format!("{}: {e}", self.base_url)))?;
        Self::check_response(response)
    }

    /// Register a composed mappings document for a type.
    ///
    /// `mappings` is the full schema produced by the mapping composer,
    /// keyed by doc type; only that type's fragment is sent.
    pub fn put_mapping(&self, type_name: &TypeName, mappings: &Value) -> Result<()> {
        let index = self.index_name(type_name);
        let doc_type = type_name.doc_type();
        let fragment = mappings.get(doc_type).unwrap_or(mappings);

        let url = self.endpoint(&[&index, "_mapping", doc_type])?;
        tracing::info!(%type_name, index = %index, "registering mapping");

        let response = self
            .http
            .put(url)
            .json(fragment)
            .send()
            .map_err(|e| IndexSyncError::Transport(format!("put_mapping {type_name}: {e}")))?;
        Self::check_response(response).map(|_| ())
    }

    /// Current cluster health document.
    pub fn cluster_health(&self) -> Result<Value> {
        let url = self.endpoint(&["_cluster", "health"])?;
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|e| IndexSyncError::Transport(format!("cluster health: {e}")))?;
        Self::check_response(response)
    }

    /// Wait for the configured cluster status. No-op when unconfigured.
    pub fn wait_for_status(&self) -> Result<()> {
        let Some(status) = &self.wait_for_status else {
            return Ok(());
        };

        let mut url = self.endpoint(&["_cluster", "health"])?;
        url.query_pairs_mut().append_pair("wait_for_status", status);

        tracing::info!(status = %status, "waiting for cluster status");
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|e| IndexSyncError::Transport(format!("cluster health: {e}")))?;
        Self::check_response(response).map(|_| ())
    }

    /// Delete every index under the configured prefix.
    ///
    /// Refuses to run with an empty prefix — a bare `*` would take the whole
    /// cluster with it.
    pub fn delete_all(&self) -> Result<()> {
        if self.prefix.is_empty() {
            return Err(IndexSyncError::validation(
                "refusing to delete all indexes without a configured prefix",
            ));
        }

        let pattern = format!("{}_*", self.prefix);
        let url = self.endpoint(&[&pattern])?;

        tracing::warn!(pattern = %pattern, "deleting all prefixed indexes");
        let response = self
            .http
            .delete(url)
            .send()
            .map_err(|e| IndexSyncError::Transport(format!("delete {pattern}: {e}")))?;
        Self::check_response(response)?;
        self.wait_for_status()
    }
}

impl IndexClient for HttpClient {
    fn single_update(&self, type_name: &TypeName, object: &ObjectRef) -> Result<()> {
        let index = self.index_name(type_name);
        let url = self.endpoint(&[&index, type_name.doc_type(), &object.id])?;

        tracing::debug!(%type_name, id = %object.id, "single update");
        let response = self
            .http
            .put(url)
            .json(&object.payload)
            .send()
            .map_err(|e| IndexSyncError::Transport(format!("update {type_name}: {e}")))?;
        Self::check_response(response).map(|_| ())
    }

    fn bulk_update(&self, type_name: &TypeName, objects: &[ObjectRef]) -> Result<()> {
        if objects.is_empty() {
            return Ok(());
        }

        let body = bulk_body(&self.index_name(type_name), type_name.doc_type(), objects);
        let url = self.endpoint(&["_bulk"])?;

        tracing::debug!(%type_name, count = objects.len(), "bulk update");
        let response = self
            .http
            .post(url)
            .header("content-type", "application/x-ndjson")
            .body(body)
            .send()
            .map_err(|e| IndexSyncError::Transport(format!("bulk {type_name}: {e}")))?;

        let result = Self::check_response(response)?;
        if result.get("errors").and_then(Value::as_bool) == Some(true) {
            return Err(IndexSyncError::Index(format!(
                "bulk update for {type_name} reported item failures: {result}"
            )));
        }
        Ok(())
    }
}

/// Render the NDJSON body for a `_bulk` request: one action line and one
/// source line per object, newline-terminated.
fn bulk_body(index: &str, doc_type: &str, objects: &[ObjectRef]) -> String {
    let mut body = String::new();
    for object in objects {
        let action = serde_json::json!({
            "index": { "_index": index, "_type": doc_type, "_id": object.id }
        });
        body.push_str(&action.to_string());
        body.push('\n');
        body.push_str(&object.payload.to_string());
        body.push('\n');
    }
    body
}

/// Join prefix and index name with `_`; an empty prefix leaves the name bare.
fn prefixed_index(prefix: &str, index: &str) -> String {
    if prefix.is_empty() {
        index.to_string()
    } else {
        format!("{prefix}_{index}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_client(prefix: &str) -> HttpClient {
        HttpClient::new(&HttpClientConfig {
            base_url: "http://localhost:9200".into(),
            prefix: prefix.into(),
            timeout: Duration::from_secs(5),
            wait_for_status: None,
        })
        .expect("build client")
    }

    #[test]
    fn index_names_are_prefixed() {
        let client = test_client("staging");
        assert_eq!(client.index_name(&TypeName::new("cities#city")), "staging_cities");

        let bare = test_client("");
        assert_eq!(bare.index_name(&TypeName::new("cities#city")), "cities");
    }

    #[test]
    fn bulk_body_pairs_action_and_source() {
        let objects = vec![
            ObjectRef::new("1", json!({"name": "Lisbon"})),
            ObjectRef::new("2", json!({"name": "Porto"})),
        ];
        let body = bulk_body("staging_cities", "city", &objects);

        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 4);

        let action: Value = serde_json::from_str(lines[0]).expect("action line");
        assert_eq!(action["index"]["_index"], "staging_cities");
        assert_eq!(action["index"]["_type"], "city");
        assert_eq!(action["index"]["_id"], "1");

        let source: Value = serde_json::from_str(lines[1]).expect("source line");
        assert_eq!(source["name"], "Lisbon");

        assert!(body.ends_with('\n'));
    }

    #[test]
    fn delete_all_refuses_empty_prefix() {
        let client = test_client("");
        let err = client.delete_all().expect_err("must refuse");
        assert!(err.to_string().contains("prefix"));
    }

    #[test]
    fn wait_for_status_noop_when_unconfigured() {
        let client = test_client("staging");
        client.wait_for_status().expect("no-op");
    }

    #[test]
    fn config_from_app_config() {
        let app = AppConfig::default();
        let config = HttpClientConfig::from(&app);
        assert_eq!(config.base_url, "http://localhost:9200");
        assert_eq!(config.prefix, "indexsync");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn invalid_url_is_config_error() {
        let result = HttpClient::new(&HttpClientConfig {
            base_url: "not a url".into(),
            prefix: "x".into(),
            timeout: Duration::from_secs(5),
            wait_for_status: None,
        });
        assert!(result.is_err());
    }
}
