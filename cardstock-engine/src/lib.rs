//! # Cardstock Engine
//!
//! Interactive scene synchronization: keeps a registry of live
//! render-objects converged on the canonical document model.
//!
//! ## Sync loop
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              SceneSync                      │
//! ├─────────────────────────────────────────────┤
//! │  reconcile(doc, history)                    │
//! │   1. diff ids → additions / removals        │
//! │   2. tolerance-compare kept elements        │
//! │   3. defer removals mid-gesture             │
//! │   4. pending placeholders + build requests  │
//! │   5. atomic z-order rebuild                 │
//! │   6. position authority (undo/redo marker)  │
//! ├──────────────────────┬──────────────────────┤
//! │  InteractionArbiter  │  RenderRegistry      │
//! │  idle → interacting  │  id → handle + flags │
//! │  → committing        │  render order        │
//! └──────────────────────┴──────────────────────┘
//! ```
//!
//! Reconciliation is synchronous and serialized; async builder completions
//! re-enter through [`SceneSync::complete_build`] with generation stamps,
//! landing in any order relative to unrelated passes.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod arbiter;
pub mod error;
pub mod picker;
pub mod reconciler;
pub mod registry;

pub use arbiter::{InteractionArbiter, InteractionState, DEFAULT_COMMIT_GRACE};
pub use error::{EngineError, EngineResult};
pub use picker::ClickCycler;
pub use reconciler::{
    BuildRequest, CompletionOutcome, GestureCommit, GestureDelta, PositionAuthority,
    ReconcileReport, SceneSync,
};
pub use registry::{RegistryEntry, RenderRegistry};

/// Engine crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
