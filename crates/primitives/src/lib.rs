//! Core types for the dual-pane workbench: blocks, view positions, and keys.

/// Content blocks and their per-view positional data.
pub mod block;
/// Identifier types for workbench entities.
pub mod ids;
/// Key and chord types for the shortcut layer.
pub mod key;

pub use block::{Block, EditorSpan, PagePoint, SourceRegion, ViewKind, ViewPosition};
pub use ids::{BlockId, DocumentId};
pub use key::{Key, KeyCode, Modifiers};
