//! Update policies: how one strategy frame turns notifications into index
//! requests.

use std::collections::HashMap;

use indexmap::IndexMap;
use indexsync_client::IndexClient;
use indexsync_shared::{IndexSyncError, ObjectRef, Result, TypeName};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Per-frame update policy.
///
/// `handle` receives every notification delivered while the owning frame is
/// on top of the stack; `flush_on_pop` runs once when the frame leaves the
/// stack. Policies never retry — client failures surface to the caller.
pub trait UpdatePolicy: Send {
    /// Policy name as used in the registry and `current()` introspection.
    fn name(&self) -> &'static str;

    /// React to a change notification for `objects` of type `type_name`.
    fn handle(
        &mut self,
        client: &dyn IndexClient,
        type_name: &TypeName,
        objects: &[ObjectRef],
    ) -> Result<()>;

    /// Flush any pending state when the owning frame is popped.
    fn flush_on_pop(&mut self, client: &dyn IndexClient) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Built-in policies
// ---------------------------------------------------------------------------

/// Discards every notification; no index traffic is ever produced.
#[derive(Debug, Default)]
pub struct Bypass;

impl UpdatePolicy for Bypass {
    fn name(&self) -> &'static str {
        "bypass"
    }

    fn handle(
        &mut self,
        _client: &dyn IndexClient,
        type_name: &TypeName,
        objects: &[ObjectRef],
    ) -> Result<()> {
        tracing::trace!(%type_name, count = objects.len(), "bypassing update");
        Ok(())
    }

    fn flush_on_pop(&mut self, _client: &dyn IndexClient) -> Result<()> {
        Ok(())
    }
}

/// Dispatches one request per notification, synchronously, in call order.
#[derive(Debug, Default)]
pub struct Urgent;

impl UpdatePolicy for Urgent {
    fn name(&self) -> &'static str {
        "urgent"
    }

    fn handle(
        &mut self,
        client: &dyn IndexClient,
        type_name: &TypeName,
        objects: &[ObjectRef],
    ) -> Result<()> {
        match objects {
            [] => Ok(()),
            [object] => client.single_update(type_name, object),
            many => client.bulk_update(type_name, many),
        }
    }

    fn flush_on_pop(&mut self, _client: &dyn IndexClient) -> Result<()> {
        Ok(())
    }
}

/// Accumulates notifications, deduplicated by object id per type, and
/// dispatches one batched request per distinct type when the frame pops.
///
/// Buffer order is first-notification order for types and for ids within a
/// type; a re-notified id keeps its latest payload.
#[derive(Debug, Default)]
pub struct Atomic {
    buffer: IndexMap<TypeName, IndexMap<String, ObjectRef>>,
}

impl UpdatePolicy for Atomic {
    fn name(&self) -> &'static str {
        "atomic"
    }

    fn handle(
        &mut self,
        _client: &dyn IndexClient,
        type_name: &TypeName,
        objects: &[ObjectRef],
    ) -> Result<()> {
        let pending = self.buffer.entry(type_name.clone()).or_default();
        for object in objects {
            pending.insert(object.id.clone(), object.clone());
        }
        tracing::trace!(%type_name, pending = pending.len(), "accumulated update");
        Ok(())
    }

    fn flush_on_pop(&mut self, client: &dyn IndexClient) -> Result<()> {
        // Pending state is considered lost once flush is attempted: take the
        // buffer up front so a mid-flush failure cannot replay it.
        let buffer = std::mem::take(&mut self.buffer);

        for (type_name, pending) in buffer {
            let objects: Vec<ObjectRef> = pending.into_values().collect();
            tracing::debug!(%type_name, count = objects.len(), "flushing accumulated updates");
            client.bulk_update(&type_name, &objects)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

type PolicyFactory = Box<dyn Fn() -> Box<dyn UpdatePolicy> + Send + Sync>;

/// Name → policy factory map.
///
/// The built-in set is open: callers may register custom policies before the
/// engine is handed out. Lookup of an unknown name is an error, never a
/// silent fallback.
pub struct PolicyRegistry {
    factories: HashMap<String, PolicyFactory>,
}

impl PolicyRegistry {
    /// Registry with the built-in policies (`bypass`, `urgent`, `atomic`).
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("bypass", || Box::new(Bypass));
        registry.register("urgent", || Box::new(Urgent));
        registry.register("atomic", || Box::new(Atomic::default()));
        registry
    }

    /// Register a policy factory under `name`, replacing any previous entry.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn UpdatePolicy> + Send + Sync + 'static,
    ) {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Instantiate the policy registered under `name`.
    pub fn create(&self, name: &str) -> Result<Box<dyn UpdatePolicy>> {
        let factory = self.factories.get(name).ok_or_else(|| {
            IndexSyncError::strategy(format!("unknown strategy policy '{name}'"))
        })?;
        Ok(factory())
    }

    /// Whether a policy named `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
