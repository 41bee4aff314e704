//! Cross-pane synchronization with echo suppression.
//!
//! Activity in one pane resolves to a block and produces a programmatic move
//! of the other pane. Panes emit activity events for every position change,
//! program-driven included, so the engine marks the moved pane suppressed
//! until the host reports the move finished; events from a suppressed pane
//! are echoes of our own move and never re-trigger the engine. Passes are
//! mutually exclusive while a move is in flight.
//!
//! Synchronization is best-effort: a block with no counterpart position in
//! the target pane is a traced no-op, never an error.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tandem_primitives::{BlockId, EditorSpan, PagePoint, SourceRegion, ViewKind, ViewPosition};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::anchor::AnchorIndex;

/// Default settle window for pane activity before a sync pass.
pub const SYNC_DEBOUNCE: Duration = Duration::from_millis(50);

/// Which pane initiated a synchronization pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncDirection {
	/// Source-pane activity drives the editor pane.
	FromSource,
	/// Editor-pane activity drives the source pane.
	FromEditor,
}

impl SyncDirection {
	/// The pane whose activity initiated the pass.
	pub fn origin(self) -> ViewKind {
		match self {
			SyncDirection::FromSource => ViewKind::Source,
			SyncDirection::FromEditor => ViewKind::Editor,
		}
	}

	/// The pane the pass moves.
	pub fn target(self) -> ViewKind {
		match self {
			SyncDirection::FromSource => ViewKind::Editor,
			SyncDirection::FromEditor => ViewKind::Source,
		}
	}
}

/// Destination of a programmatic move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveTarget {
	/// Scroll the source pane to this region.
	Source(SourceRegion),
	/// Scroll the editor pane to this span.
	Editor(EditorSpan),
}

/// A programmatic move the host must apply to a pane, then acknowledge via
/// [`SyncEngine::move_completed`] or [`SyncEngine::move_failed`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewMove {
	/// The pass that produced this move.
	pub direction: SyncDirection,
	/// The block both panes are aligning on.
	pub block: BlockId,
	/// Where the target pane should move.
	pub target: MoveTarget,
}

impl ViewMove {
	/// The pane this move applies to.
	pub fn view(&self) -> ViewKind {
		self.direction.target()
	}
}

/// Computes and emits cross-pane moves, one pass at a time.
pub struct SyncEngine {
	index: Arc<ArcSwap<AnchorIndex>>,
	/// Pane whose activity events are currently echoes of our own move.
	suppressed: Option<ViewKind>,
	last_source: Option<PagePoint>,
	last_editor: Option<usize>,
	moves_tx: mpsc::UnboundedSender<ViewMove>,
}

impl SyncEngine {
	/// An engine over the shared index, emitting moves on `moves_tx`.
	pub fn new(index: Arc<ArcSwap<AnchorIndex>>, moves_tx: mpsc::UnboundedSender<ViewMove>) -> Self {
		Self {
			index,
			suppressed: None,
			last_source: None,
			last_editor: None,
			moves_tx,
		}
	}

	/// The pane currently suppressed, if a programmatic move is in flight.
	pub fn suppressed(&self) -> Option<ViewKind> {
		self.suppressed
	}

	/// Records source-pane activity. Returns whether the caller should
	/// schedule a debounced `FromSource` pass: false for echoes of our own
	/// move and while any move is in flight.
	pub fn note_source_activity(&mut self, position: PagePoint) -> bool {
		if self.suppressed == Some(ViewKind::Source) {
			trace!("workbench.sync.echo_suppressed");
			return false;
		}
		self.last_source = Some(position);
		if self.suppressed.is_some() {
			trace!("workbench.sync.pass_in_flight");
			return false;
		}
		true
	}

	/// Records editor-pane activity; mirror of [`Self::note_source_activity`].
	pub fn note_editor_activity(&mut self, offset: usize) -> bool {
		if self.suppressed == Some(ViewKind::Editor) {
			trace!("workbench.sync.echo_suppressed");
			return false;
		}
		self.last_editor = Some(offset);
		if self.suppressed.is_some() {
			trace!("workbench.sync.pass_in_flight");
			return false;
		}
		true
	}

	/// Runs a debounced pass: resolves the last recorded position for
	/// `direction` to a block and moves the opposite pane to it.
	pub fn flush(&mut self, direction: SyncDirection) {
		if self.suppressed.is_some() {
			trace!(?direction, "workbench.sync.pass_in_flight");
			return;
		}
		let position = match direction {
			SyncDirection::FromSource => self.last_source.map(ViewPosition::Source),
			SyncDirection::FromEditor => self.last_editor.map(ViewPosition::Editor),
		};
		let Some(position) = position else {
			return;
		};

		let index = self.index.load();
		let Some(block) = index.nearest_block(position) else {
			trace!(?direction, "workbench.sync.no_block");
			return;
		};
		self.emit_move(&index, direction, block);
	}

	/// Moves the editor pane directly to `block` (e.g. a click on a rendered
	/// block). Bypasses the settle window, not the suppression rules.
	pub fn sync_to_block(&mut self, block: BlockId) {
		self.direct_move(SyncDirection::FromSource, block);
	}

	/// Moves the source pane directly to `block`'s anchor (e.g. a click in
	/// the editor gutter). Bypasses the settle window, not the suppression
	/// rules.
	pub fn sync_to_anchor(&mut self, block: BlockId) {
		self.direct_move(SyncDirection::FromEditor, block);
	}

	/// The host finished applying a programmatic move to `view`.
	pub fn move_completed(&mut self, view: ViewKind) {
		if self.suppressed == Some(view) {
			trace!(?view, "workbench.sync.move_completed");
			self.suppressed = None;
		}
	}

	/// The host failed to apply a programmatic move to `view` (e.g. target
	/// out of range). Suppression is cleared all the same so a bad move can
	/// never wedge synchronization.
	pub fn move_failed(&mut self, view: ViewKind) {
		if self.suppressed == Some(view) {
			debug!(?view, "workbench.sync.move_failed");
			self.suppressed = None;
		}
	}

	fn direct_move(&mut self, direction: SyncDirection, block: BlockId) {
		if self.suppressed.is_some() {
			trace!(?direction, block = block.0, "workbench.sync.pass_in_flight");
			return;
		}
		let index = self.index.load();
		self.emit_move(&index, direction, block);
	}

	fn emit_move(&mut self, index: &AnchorIndex, direction: SyncDirection, block: BlockId) {
		let target = match direction.target() {
			ViewKind::Source => index.source_region_of(block).map(MoveTarget::Source),
			ViewKind::Editor => index.editor_span_of(block).map(MoveTarget::Editor),
		};
		let Some(target) = target else {
			// Structural mismatch after an edit; sync is best-effort.
			trace!(block = block.0, ?direction, "workbench.sync.counterpart_missing");
			return;
		};

		self.suppressed = Some(direction.target());
		debug!(
			block = block.0,
			?direction,
			generation = index.generation(),
			"workbench.sync.move"
		);
		let _ = self.moves_tx.send(ViewMove {
			direction,
			block,
			target,
		});
	}
}
