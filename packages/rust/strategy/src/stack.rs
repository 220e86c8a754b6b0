//! The per-execution-context strategy stack.
//!
//! A stack always carries a base frame that is never popped; `push`/`pop`
//! manage overlay frames above it. `wrap` is the guaranteed-cleanup boundary:
//! the frame it pushes is popped (and flushed) on every exit path of the
//! wrapped action, and the action's error is re-raised unchanged afterwards.

use std::sync::Arc;

use indexsync_client::IndexClient;
use indexsync_shared::{IndexSyncError, ObjectRef, Result, TypeName};

use crate::policy::{PolicyRegistry, UpdatePolicy};

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// One nested scope's policy and pending state.
pub struct StrategyFrame {
    policy: Box<dyn UpdatePolicy>,
    closed: bool,
}

impl StrategyFrame {
    fn new(policy: Box<dyn UpdatePolicy>) -> Self {
        Self {
            policy,
            closed: false,
        }
    }

    /// Name of this frame's policy.
    pub fn variant(&self) -> &'static str {
        self.policy.name()
    }

    fn handle(
        &mut self,
        client: &dyn IndexClient,
        type_name: &TypeName,
        objects: &[ObjectRef],
    ) -> Result<()> {
        if self.closed {
            return Err(IndexSyncError::strategy(format!(
                "frame '{}' already flushed",
                self.variant()
            )));
        }
        self.policy.handle(client, type_name, objects)
    }

    /// Flush and close: the frame rejects further notifications afterwards.
    fn flush(&mut self, client: &dyn IndexClient) -> Result<()> {
        self.closed = true;
        self.policy.flush_on_pop(client)
    }

    /// Flush pending state but keep the frame usable (base-frame path).
    fn flush_pending(&mut self, client: &dyn IndexClient) -> Result<()> {
        self.policy.flush_on_pop(client)
    }
}

impl std::fmt::Debug for StrategyFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyFrame")
            .field("variant", &self.variant())
            .field("closed", &self.closed)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Stack
// ---------------------------------------------------------------------------

/// Strictly LIFO stack of strategy frames for one execution context.
///
/// The base frame exists from construction and is never removed; popping
/// with no overlay frames is a [`IndexSyncError::Strategy`] error and leaves
/// the stack untouched. The stack is deliberately not `Sync`-shared: each
/// thread/task owns its own (see the `scoped` module).
pub struct StrategyStack {
    client: Arc<dyn IndexClient>,
    registry: Arc<PolicyRegistry>,
    base: StrategyFrame,
    overlays: Vec<StrategyFrame>,
}

impl StrategyStack {
    /// Build a stack whose base frame uses the policy named `base`.
    pub fn new(
        client: Arc<dyn IndexClient>,
        registry: Arc<PolicyRegistry>,
        base: &str,
    ) -> Result<Self> {
        let base = StrategyFrame::new(registry.create(base)?);
        Ok(Self {
            client,
            registry,
            base,
            overlays: Vec::new(),
        })
    }

    /// Number of frames, base included.
    pub fn depth(&self) -> usize {
        self.overlays.len() + 1
    }

    /// Name of the active (top) frame's policy.
    pub fn current(&self) -> &'static str {
        self.overlays.last().unwrap_or(&self.base).variant()
    }

    /// Push a new frame with the policy named `name` atop the stack.
    pub fn push(&mut self, name: &str) -> Result<()> {
        let frame = StrategyFrame::new(self.registry.create(name)?);
        tracing::debug!(policy = name, depth = self.depth() + 1, "pushed strategy frame");
        self.overlays.push(frame);
        Ok(())
    }

    /// Pop the top frame and flush it.
    ///
    /// The frame is removed before its flush runs, so its pending state is
    /// lost once flush is attempted — a flush failure propagates but is not
    /// replayed. Popping with only the base frame left is an error; the base
    /// frame is never removed.
    pub fn pop(&mut self) -> Result<()> {
        let Some(mut frame) = self.overlays.pop() else {
            return Err(IndexSyncError::strategy(
                "cannot pop the base strategy frame",
            ));
        };
        tracing::debug!(policy = frame.variant(), depth = self.depth(), "popped strategy frame");
        frame.flush(self.client.as_ref())
    }

    /// Scoped execution: push a frame, run `action`, pop on every exit path.
    ///
    /// An error from `action` is re-raised unchanged after the pop (and its
    /// flush) has run; a pop failure surfaces only when the action itself
    /// succeeded.
    pub fn wrap<T>(
        &mut self,
        name: &str,
        action: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.push(name)?;
        let result = action(self);
        let popped = self.pop();
        match result {
            Err(action_err) => Err(action_err),
            Ok(value) => popped.map(|()| value),
        }
    }

    /// Deliver a change notification to the active frame's policy.
    pub fn notify(&mut self, type_name: &TypeName, objects: &[ObjectRef]) -> Result<()> {
        let client = Arc::clone(&self.client);
        let frame = self.overlays.last_mut().unwrap_or(&mut self.base);
        frame.handle(client.as_ref(), type_name, objects)
    }

    /// Flush the base frame's pending state without removing it.
    ///
    /// Only relevant when the base frame uses an accumulating policy; the
    /// frame stays open and keeps accepting notifications.
    pub fn flush_base(&mut self) -> Result<()> {
        self.base.flush_pending(self.client.as_ref())
    }
}

impl std::fmt::Debug for StrategyStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyStack")
            .field("depth", &self.depth())
            .field("current", &self.current())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexsync_client::{Dispatch, FailingClient, RecordingClient};
    use serde_json::json;

    fn refs(ids: &[&str]) -> Vec<ObjectRef> {
        ids.iter().map(|id| ObjectRef::new(*id, json!({}))).collect()
    }

    fn test_stack(client: Arc<dyn IndexClient>, base: &str) -> StrategyStack {
        StrategyStack::new(client, Arc::new(PolicyRegistry::with_builtins()), base)
            .expect("build stack")
    }

    #[test]
    fn base_frame_handles_notifications() {
        let client = Arc::new(RecordingClient::new());
        let mut stack = test_stack(client.clone(), "urgent");
        let cities = TypeName::new("cities");

        stack.notify(&cities, &refs(&["a"])).expect("notify");
        assert_eq!(
            client.dispatches(),
            vec![Dispatch::Single {
                type_name: cities,
                id: "a".into()
            }]
        );
    }

    #[test]
    fn pop_on_base_only_stack_is_an_error() {
        let client = Arc::new(RecordingClient::new());
        let mut stack = test_stack(client.clone(), "urgent");

        let err = stack.pop().expect_err("must refuse");
        assert!(err.to_string().contains("base strategy frame"));

        // State untouched: the base frame still works.
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.current(), "urgent");
        stack.notify(&TypeName::new("cities"), &refs(&["a"])).expect("notify");
        assert_eq!(client.dispatches().len(), 1);
    }

    #[test]
    fn push_unknown_policy_is_an_error() {
        let client = Arc::new(RecordingClient::new());
        let mut stack = test_stack(client, "urgent");

        assert!(stack.push("resque").is_err());
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn current_tracks_top_frame() {
        let client = Arc::new(RecordingClient::new());
        let mut stack = test_stack(client, "urgent");
        assert_eq!(stack.current(), "urgent");

        stack.push("atomic").expect("push");
        assert_eq!(stack.current(), "atomic");
        stack.push("bypass").expect("push");
        assert_eq!(stack.current(), "bypass");

        stack.pop().expect("pop");
        assert_eq!(stack.current(), "atomic");
        stack.pop().expect("pop");
        assert_eq!(stack.current(), "urgent");
    }

    #[test]
    fn urgent_frame_dispatches_in_order() {
        let client = Arc::new(RecordingClient::new());
        let mut stack = test_stack(client.clone(), "bypass");
        let cities = TypeName::new("cities");

        stack
            .wrap("urgent", |stack| {
                stack.notify(&cities, &refs(&["a"]))?;
                stack.notify(&cities, &refs(&["b"]))
            })
            .expect("wrap");

        assert_eq!(
            client.dispatches(),
            vec![
                Dispatch::Single {
                    type_name: cities.clone(),
                    id: "a".into()
                },
                Dispatch::Single {
                    type_name: cities,
                    id: "b".into()
                },
            ]
        );
    }

    #[test]
    fn atomic_frame_flushes_deduplicated_batch_on_pop() {
        let client = Arc::new(RecordingClient::new());
        let mut stack = test_stack(client.clone(), "bypass");
        let cities = TypeName::new("cities");

        stack.push("atomic").expect("push");
        stack.notify(&cities, &refs(&["a", "b"])).expect("notify");
        stack.notify(&cities, &refs(&["a"])).expect("re-notify");
        assert!(client.dispatches().is_empty());

        stack.pop().expect("pop");
        assert_eq!(
            client.dispatches(),
            vec![Dispatch::Bulk {
                type_name: cities,
                ids: vec!["a".into(), "b".into()]
            }]
        );
    }

    #[test]
    fn bypass_frame_produces_no_requests() {
        let client = Arc::new(RecordingClient::new());
        let mut stack = test_stack(client.clone(), "urgent");

        stack
            .wrap("bypass", |stack| {
                stack.notify(&TypeName::new("cities"), &refs(&["a", "b", "c"]))
            })
            .expect("wrap");

        assert!(client.dispatches().is_empty());
    }

    #[test]
    fn wrap_pops_on_action_error_and_reraises() {
        let client = Arc::new(RecordingClient::new());
        let mut stack = test_stack(client, "urgent");

        let err = stack
            .wrap("atomic", |stack| -> Result<()> {
                stack.notify(&TypeName::new("cities"), &refs(&["a"]))?;
                Err(IndexSyncError::validation("boom"))
            })
            .expect_err("action error must surface");

        assert!(err.to_string().contains("boom"));
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.current(), "urgent");
    }

    #[test]
    fn wrap_surfaces_flush_failure_when_action_succeeds() {
        let client = Arc::new(FailingClient);
        let mut stack = test_stack(client, "bypass");

        let err = stack
            .wrap("atomic", |stack| {
                stack.notify(&TypeName::new("cities"), &refs(&["a"]))
            })
            .expect_err("flush failure must surface");

        assert!(err.to_string().contains("injected failure"));
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn action_error_takes_precedence_over_flush_error() {
        let client = Arc::new(FailingClient);
        let mut stack = test_stack(client, "bypass");

        let err = stack
            .wrap("atomic", |stack| -> Result<()> {
                stack.notify(&TypeName::new("cities"), &refs(&["a"]))?;
                Err(IndexSyncError::validation("action failed first"))
            })
            .expect_err("error expected");

        assert!(err.to_string().contains("action failed first"));
    }

    #[test]
    fn nested_atomic_frames_flush_independently() {
        let client = Arc::new(RecordingClient::new());
        let mut stack = test_stack(client.clone(), "bypass");
        let cities = TypeName::new("cities");

        stack
            .wrap("atomic", |stack| {
                stack.notify(&cities, &refs(&["outer"]))?;
                stack.wrap("atomic", |stack| stack.notify(&cities, &refs(&["inner"])))
            })
            .expect("wrap");

        assert_eq!(
            client.dispatches(),
            vec![
                Dispatch::Bulk {
                    type_name: cities.clone(),
                    ids: vec!["inner".into()]
                },
                Dispatch::Bulk {
                    type_name: cities,
                    ids: vec!["outer".into()]
                },
            ]
        );
    }

    #[test]
    fn nested_urgent_inside_atomic_end_to_end() {
        // wrap(atomic) { notify(T,{A}); wrap(urgent) { notify(T,{C}) }; notify(T,{B}) }
        // must dispatch exactly: single C, then batched {A, B}.
        let client = Arc::new(RecordingClient::new());
        let mut stack = test_stack(client.clone(), "bypass");
        let cities = TypeName::new("cities");

        stack
            .wrap("atomic", |stack| {
                stack.notify(&cities, &refs(&["a"]))?;
                stack.wrap("urgent", |stack| stack.notify(&cities, &refs(&["c"])))?;
                stack.notify(&cities, &refs(&["b"]))
            })
            .expect("wrap");

        assert_eq!(
            client.dispatches(),
            vec![
                Dispatch::Single {
                    type_name: cities.clone(),
                    id: "c".into()
                },
                Dispatch::Bulk {
                    type_name: cities,
                    ids: vec!["a".into(), "b".into()]
                },
            ]
        );
    }

    #[test]
    fn flush_base_keeps_base_frame_open() {
        let client = Arc::new(RecordingClient::new());
        let mut stack = test_stack(client.clone(), "atomic");
        let cities = TypeName::new("cities");

        stack.notify(&cities, &refs(&["a"])).expect("notify");
        stack.flush_base().expect("flush base");
        assert_eq!(client.dispatches().len(), 1);

        // Still usable after the flush.
        stack.notify(&cities, &refs(&["b"])).expect("notify again");
        stack.flush_base().expect("flush again");
        assert_eq!(client.dispatches().len(), 2);
    }

    #[test]
    fn closed_frame_rejects_notifications() {
        let client = RecordingClient::new();
        let registry = PolicyRegistry::with_builtins();
        let mut frame = StrategyFrame::new(registry.create("atomic").expect("create"));

        frame
            .handle(&client, &TypeName::new("cities"), &refs(&["a"]))
            .expect("open frame accepts");
        frame.flush(&client).expect("flush");

        let err = frame
            .handle(&client, &TypeName::new("cities"), &refs(&["b"]))
            .expect_err("closed frame rejects");
        assert!(err.to_string().contains("already flushed"));
    }
}
