//! Synchronization and persistence core for a dual-pane document workbench.
//!
//! The workbench keeps a rendered source pane and an editable text pane
//! positionally aligned, and persists edits without blocking interaction:
//! - [`AnchorIndex`] maps content blocks to positions in both panes
//! - [`SyncEngine`] drives cross-pane moves with echo suppression
//! - [`SaveMachine`] tracks dirty/saving/error state with one in-flight save
//! - [`WorkbenchSession`] owns all of it for a single open document
//!
//! All state transitions run on one logical timeline: debounce timers and
//! spawned gateway calls only enqueue events, which [`WorkbenchSession::tick`]
//! drains one at a time.

/// Block-to-position lookup, rebuilt wholesale on structural edits.
pub mod anchor;
/// The save state machine, persistence gateway seam, and save errors.
pub mod save;
/// Per-document session: ownership, event loop, and lifecycle.
pub mod session;
/// Explicit-save shortcut bindings.
pub mod shortcut;
/// Cross-pane synchronization with echo suppression.
pub mod sync;

pub use anchor::AnchorIndex;
pub use save::{
	AUTOSAVE_DEBOUNCE, AttemptId, GatewayError, PersistenceGateway, SAVE_WRITE_TIMEOUT,
	SaveError, SaveMachine, SaveState, SaveStatus,
};
pub use session::{SessionConfig, WorkbenchSession};
pub use shortcut::{ShortcutDispatcher, WorkbenchCommand};
pub use sync::{MoveTarget, SYNC_DEBOUNCE, SyncDirection, SyncEngine, ViewMove};
