//! In-memory [`IndexClient`] implementations for tests and dry runs.

use std::sync::Mutex;

use indexsync_shared::{IndexSyncError, ObjectRef, Result, TypeName};

use crate::IndexClient;

/// One dispatched request, as observed by [`RecordingClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// A single-object update request.
    Single { type_name: TypeName, id: String },
    /// A batched update request with the ids in dispatch order.
    Bulk { type_name: TypeName, ids: Vec<String> },
}

/// Records every dispatched request instead of talking to an engine.
#[derive(Debug, Default)]
pub struct RecordingClient {
    log: Mutex<Vec<Dispatch>>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all dispatches so far, in order.
    pub fn dispatches(&self) -> Vec<Dispatch> {
        self.log.lock().expect("dispatch log poisoned").clone()
    }

    /// Drop all recorded dispatches.
    pub fn clear(&self) {
        self.log.lock().expect("dispatch log poisoned").clear();
    }
}

impl IndexClient for RecordingClient {
    fn single_update(&self, type_name: &TypeName, object: &ObjectRef) -> Result<()> {
        self.log.lock().expect("dispatch log poisoned").push(Dispatch::Single {
            type_name: type_name.clone(),
            id: object.id.clone(),
        });
        Ok(())
    }

    fn bulk_update(&self, type_name: &TypeName, objects: &[ObjectRef]) -> Result<()> {
        self.log.lock().expect("dispatch log poisoned").push(Dispatch::Bulk {
            type_name: type_name.clone(),
            ids: objects.iter().map(|o| o.id.clone()).collect(),
        });
        Ok(())
    }
}

/// Fails every request, for exercising dispatch-failure paths.
#[derive(Debug, Default)]
pub struct FailingClient;

impl IndexClient for FailingClient {
    fn single_update(&self, type_name: &TypeName, _object: &ObjectRef) -> Result<()> {
        Err(IndexSyncError::Transport(format!(
            "injected failure for {type_name}"
        )))
    }

    fn bulk_update(&self, type_name: &TypeName, _objects: &[ObjectRef]) -> Result<()> {
        Err(IndexSyncError::Transport(format!(
            "injected failure for {type_name}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn records_in_dispatch_order() {
        let client = RecordingClient::new();
        let cities = TypeName::new("cities#city");

        client
            .single_update(&cities, &ObjectRef::new("1", json!({})))
            .expect("single");
        client
            .bulk_update(
                &cities,
                &[
                    ObjectRef::new("2", json!({})),
                    ObjectRef::new("3", json!({})),
                ],
            )
            .expect("bulk");

        assert_eq!(
            client.dispatches(),
            vec![
                Dispatch::Single {
                    type_name: cities.clone(),
                    id: "1".into()
                },
                Dispatch::Bulk {
                    type_name: cities,
                    ids: vec!["2".into(), "3".into()]
                },
            ]
        );

        client.clear();
        assert!(client.dispatches().is_empty());
    }

    #[test]
    fn failing_client_fails() {
        let client = FailingClient;
        let result = client.single_update(&TypeName::new("users"), &ObjectRef::new("1", json!({})));
        assert!(result.is_err());
    }
}
