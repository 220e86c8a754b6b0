//! Per-thread strategy stacks behind a process-wide facade.
//!
//! Mutation hooks rarely have a stack to hand, so this module keeps one
//! [`StrategyStack`] per thread, lazily created from an immutable runtime
//! installed once during application startup. Stacks are never shared across
//! threads — isolation comes from scoping, not locking — and no process-wide
//! mutable stack exists.

use std::cell::RefCell;
use std::sync::{Arc, OnceLock};

use indexsync_client::IndexClient;
use indexsync_shared::{IndexSyncError, ObjectRef, Result, TypeName};

use crate::policy::PolicyRegistry;
use crate::stack::StrategyStack;

/// Immutable engine configuration shared by every thread's stack.
struct ScopedRuntime {
    client: Arc<dyn IndexClient>,
    registry: Arc<PolicyRegistry>,
    base: String,
}

static RUNTIME: OnceLock<ScopedRuntime> = OnceLock::new();

thread_local! {
    static STACK: RefCell<Option<StrategyStack>> = const { RefCell::new(None) };
}

/// Install the process-wide runtime: index client, policy registry, and the
/// base policy every thread's stack starts with.
///
/// Single-writer configuration phase: installing twice is a config error, as
/// is a base policy the registry does not know.
pub fn install(
    client: Arc<dyn IndexClient>,
    registry: Arc<PolicyRegistry>,
    base: &str,
) -> Result<()> {
    if !registry.contains(base) {
        return Err(IndexSyncError::config(format!(
            "unknown base strategy policy '{base}'"
        )));
    }

    let runtime = ScopedRuntime {
        client,
        registry,
        base: base.to_string(),
    };
    RUNTIME
        .set(runtime)
        .map_err(|_| IndexSyncError::config("strategy runtime already installed"))?;

    tracing::debug!(base, "installed scoped strategy runtime");
    Ok(())
}

/// Whether [`install`] has run.
pub fn is_installed() -> bool {
    RUNTIME.get().is_some()
}

/// Run `f` against this thread's stack, creating the stack on first use.
///
/// The borrow is scoped to `f`; callers must not re-enter this module from
/// inside `f` (the public facade functions below each take their own short
/// borrow instead of nesting).
fn with_stack<T>(f: impl FnOnce(&mut StrategyStack) -> Result<T>) -> Result<T> {
    let runtime = RUNTIME
        .get()
        .ok_or_else(|| IndexSyncError::config("strategy runtime not installed"))?;

    STACK.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(StrategyStack::new(
                Arc::clone(&runtime.client),
                Arc::clone(&runtime.registry),
                &runtime.base,
            )?);
        }
        let Some(stack) = slot.as_mut() else {
            return Err(IndexSyncError::strategy("thread stack unavailable"));
        };
        f(stack)
    })
}

/// Push a frame with the policy named `name` onto this thread's stack.
pub fn push(name: &str) -> Result<()> {
    with_stack(|stack| stack.push(name))
}

/// Pop and flush the top frame of this thread's stack.
pub fn pop() -> Result<()> {
    with_stack(StrategyStack::pop)
}

/// Name of this thread's active policy.
pub fn current() -> Result<String> {
    with_stack(|stack| Ok(stack.current().to_string()))
}

/// Deliver a change notification to this thread's active frame.
pub fn notify(type_name: &TypeName, objects: &[ObjectRef]) -> Result<()> {
    with_stack(|stack| stack.notify(type_name, objects))
}

/// Scoped execution on this thread's stack: push, run `action`, pop on every
/// exit path, re-raising the action's error after cleanup.
///
/// Unlike [`StrategyStack::wrap`] the action takes no stack argument — it
/// reaches the engine through this module's free functions, so notification
/// hooks deep in the call chain need no threading of state.
pub fn wrap<T>(name: &str, action: impl FnOnce() -> Result<T>) -> Result<T> {
    push(name)?;
    let result = action();
    let popped = pop();
    match result {
        Err(action_err) => Err(action_err),
        Ok(value) => popped.map(|()| value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexsync_client::{Dispatch, RecordingClient};
    use serde_json::json;

    fn refs(ids: &[&str]) -> Vec<ObjectRef> {
        ids.iter().map(|id| ObjectRef::new(*id, json!({}))).collect()
    }

    // One test owns the process-wide runtime: OnceLock state crosses test
    // functions, so the whole scoped lifecycle is exercised here in order.
    #[test]
    fn scoped_lifecycle() {
        let client = Arc::new(RecordingClient::new());
        let registry = Arc::new(PolicyRegistry::with_builtins());

        // Unknown base policy is rejected before anything is installed.
        assert!(install(client.clone(), registry.clone(), "inline").is_err());
        assert!(!is_installed());

        install(client.clone(), registry.clone(), "urgent").expect("install");
        assert!(is_installed());

        // Second install is a config error.
        assert!(install(client.clone(), registry.clone(), "urgent").is_err());

        let cities = TypeName::new("cities");

        // Base frame dispatches urgently.
        notify(&cities, &refs(&["a"])).expect("notify");
        assert_eq!(current().expect("current"), "urgent");

        // Nested wrap with notification hooks that know nothing of the stack.
        wrap("atomic", || {
            notify(&cities, &refs(&["b", "c"]))?;
            wrap("bypass", || notify(&cities, &refs(&["dropped"])))?;
            notify(&cities, &refs(&["b"]))
        })
        .expect("wrap");

        assert_eq!(
            client.dispatches(),
            vec![
                Dispatch::Single {
                    type_name: cities.clone(),
                    id: "a".into()
                },
                Dispatch::Bulk {
                    type_name: cities.clone(),
                    ids: vec!["b".into(), "c".into()]
                },
            ]
        );

        // Imbalanced pop bottoms out at the base frame.
        let err = pop().expect_err("must refuse");
        assert!(err.to_string().contains("base strategy frame"));

        // Each thread owns an independent stack over the same runtime.
        client.clear();
        let handle = std::thread::spawn(move || {
            wrap("atomic", || {
                notify(&TypeName::new("users"), &refs(&["u1"]))
            })
        });
        handle.join().expect("join").expect("thread wrap");

        assert_eq!(
            client.dispatches(),
            vec![Dispatch::Bulk {
                type_name: TypeName::new("users"),
                ids: vec!["u1".into()]
            }]
        );
    }
}
