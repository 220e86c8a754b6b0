//! Update-strategy engine for IndexSync.
//!
//! Change notifications flow into a per-execution-context stack of strategy
//! frames; the active frame's policy decides whether they become immediate
//! requests (`urgent`), a deduplicated batch flushed on scope exit
//! (`atomic`), or nothing at all (`bypass`). Nested frames are independent:
//! each flushes its own state at its own pop.
//!
//! Use [`StrategyStack`] directly when a context object is already threaded
//! through the call chain, or the [`scoped`] facade when notification hooks
//! have no such context.

pub mod policy;
pub mod scoped;
pub mod stack;

pub use policy::{Atomic, Bypass, PolicyRegistry, UpdatePolicy, Urgent};
pub use stack::{StrategyFrame, StrategyStack};
