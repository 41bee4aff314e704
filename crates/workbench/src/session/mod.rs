//! Per-document workbench session.
//!
//! [`WorkbenchSession`] owns the anchor index, sync engine, save machine, and
//! one shared debouncer for the whole document session. Debounce timers and
//! spawned gateway calls never mutate state directly; they enqueue
//! [`SessionEvent`]s, and [`WorkbenchSession::tick`] drains the queue one
//! event at a time. That keeps every transition strictly ordered on a single
//! logical timeline while gateway calls suspend in the background.
//!
//! Closing the session cancels all pending timers; an in-flight save may
//! finish, but its completion is discarded, never surfaced.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use tandem_debounce::Debouncer;
use tandem_primitives::{Block, BlockId, DocumentId, Key, PagePoint, ViewKind};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::anchor::AnchorIndex;
use crate::save::{
	AUTOSAVE_DEBOUNCE, AttemptId, CompleteOutcome, DirtyOutcome, PersistenceGateway,
	SAVE_WRITE_TIMEOUT, SaveAttempt, SaveError, SaveMachine, SaveStatus,
};
use crate::shortcut::{ShortcutDispatcher, WorkbenchCommand};
use crate::sync::{SYNC_DEBOUNCE, SyncDirection, SyncEngine, ViewMove};

/// Timer keys for the session's shared debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TimerKey {
	/// A settle window for pane activity in one direction.
	Sync(SyncDirection),
	/// The autosave window after an edit.
	Autosave,
}

/// Events on the session's single logical timeline.
#[derive(Debug)]
enum SessionEvent {
	/// A sync settle window elapsed.
	SyncDue(SyncDirection),
	/// The autosave window elapsed.
	AutosaveDue,
	/// A spawned gateway call finished.
	SaveFinished {
		attempt: AttemptId,
		result: Result<(), SaveError>,
	},
}

/// Tunable windows for one session.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
	/// Settle window for pane activity before a sync pass.
	pub sync_debounce: Duration,
	/// Window between an edit and the autosave attempt.
	pub autosave_debounce: Duration,
	/// Time an attempt may stay in flight before it is failed.
	pub save_timeout: Duration,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			sync_debounce: SYNC_DEBOUNCE,
			autosave_debounce: AUTOSAVE_DEBOUNCE,
			save_timeout: SAVE_WRITE_TIMEOUT,
		}
	}
}

/// Owner of all synchronization and persistence state for one open document.
pub struct WorkbenchSession {
	document: DocumentId,
	config: SessionConfig,
	index: Arc<ArcSwap<AnchorIndex>>,
	sync: SyncEngine,
	save: SaveMachine,
	debounce: Debouncer<TimerKey>,
	shortcuts: ShortcutDispatcher,
	gateway: Arc<dyn PersistenceGateway>,
	events_tx: mpsc::UnboundedSender<SessionEvent>,
	events_rx: mpsc::UnboundedReceiver<SessionEvent>,
	moves_rx: Option<mpsc::UnboundedReceiver<ViewMove>>,
	closed: bool,
}

impl std::fmt::Debug for WorkbenchSession {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WorkbenchSession")
			.field("document", &self.document)
			.field("state", &self.save.state())
			.field("closed", &self.closed)
			.finish()
	}
}

impl WorkbenchSession {
	/// Opens a session for `document` with its initial block set. The save
	/// machine starts clean.
	pub fn open(
		document: DocumentId,
		blocks: Vec<Block>,
		gateway: Arc<dyn PersistenceGateway>,
		config: SessionConfig,
	) -> Self {
		let index = Arc::new(ArcSwap::from_pointee(AnchorIndex::build(blocks)));
		let (events_tx, events_rx) = mpsc::unbounded_channel();
		let (moves_tx, moves_rx) = mpsc::unbounded_channel();

		debug!(
			doc_id = document.0,
			generation = index.load().generation(),
			"workbench.session.open"
		);

		Self {
			document,
			config,
			sync: SyncEngine::new(index.clone(), moves_tx),
			index,
			save: SaveMachine::new(),
			debounce: Debouncer::new(),
			shortcuts: ShortcutDispatcher::new(),
			gateway,
			events_tx,
			events_rx,
			moves_rx: Some(moves_rx),
			closed: false,
		}
	}

	/// The receiver of programmatic pane moves. The host applies each move
	/// and reports back via [`Self::move_completed`] / [`Self::move_failed`].
	pub fn take_moves(&mut self) -> Option<mpsc::UnboundedReceiver<ViewMove>> {
		self.moves_rx.take()
	}

	/// Read-only persistence snapshot for UI rendering.
	pub fn status(&self) -> SaveStatus {
		self.save.status()
	}

	/// Replaces the block set after a structural edit. The index is swapped
	/// wholesale; lookups never observe a half-updated mapping.
	pub fn replace_blocks(&mut self, blocks: Vec<Block>) {
		if self.closed {
			return;
		}
		let index = AnchorIndex::build(blocks);
		debug!(
			doc_id = self.document.0,
			generation = index.generation(),
			blocks = index.len(),
			"workbench.session.blocks_replaced"
		);
		self.index.store(Arc::new(index));
	}

	/// Handles scroll/cursor activity in the source pane.
	pub fn on_source_activity(&mut self, position: PagePoint) {
		if self.closed {
			return;
		}
		if self.sync.note_source_activity(position) {
			self.arm_sync(SyncDirection::FromSource);
		}
	}

	/// Handles scroll/cursor activity in the editor pane.
	pub fn on_editor_activity(&mut self, offset: usize) {
		if self.closed {
			return;
		}
		if self.sync.note_editor_activity(offset) {
			self.arm_sync(SyncDirection::FromEditor);
		}
	}

	/// Moves the editor pane directly to `block`, without the settle window.
	pub fn sync_to_block(&mut self, block: BlockId) {
		if !self.closed {
			self.sync.sync_to_block(block);
		}
	}

	/// Moves the source pane directly to `block`'s anchor, without the settle
	/// window.
	pub fn sync_to_anchor(&mut self, block: BlockId) {
		if !self.closed {
			self.sync.sync_to_anchor(block);
		}
	}

	/// The host finished applying a programmatic move to `view`.
	pub fn move_completed(&mut self, view: ViewKind) {
		self.sync.move_completed(view);
	}

	/// The host failed to apply a programmatic move to `view`.
	pub fn move_failed(&mut self, view: ViewKind) {
		self.sync.move_failed(view);
	}

	/// Records a content edit and arms the autosave window.
	pub fn mark_edited(&mut self) {
		if self.closed {
			return;
		}
		match self.save.mark_dirty() {
			DirtyOutcome::Reschedule => self.arm_autosave(),
			// Absorbed into the in-flight save's pending count.
			DirtyOutcome::Deferred => {}
		}
	}

	/// Explicit save: short-circuits the autosave window but not the
	/// at-most-one-in-flight invariant. Returns whether an attempt started.
	pub fn save_now(&mut self, now: Instant, snapshot: impl FnOnce() -> String) -> bool {
		if self.closed {
			return false;
		}
		let Some(attempt) = self.save.begin_save(now) else {
			return false;
		};
		// This attempt supersedes the pending autosave.
		self.debounce.cancel(&TimerKey::Autosave);
		self.spawn_save(attempt, snapshot());
		true
	}

	/// Retries after a failed save. Returns whether an attempt started.
	pub fn retry(&mut self, now: Instant, snapshot: impl FnOnce() -> String) -> bool {
		if self.closed {
			return false;
		}
		let Some(attempt) = self.save.retry(now) else {
			return false;
		};
		self.spawn_save(attempt, snapshot());
		true
	}

	/// Routes a key chord through the shortcut table. Returns whether the
	/// chord was handled.
	pub fn handle_key(&mut self, chord: &Key, now: Instant, snapshot: impl FnOnce() -> String) -> bool {
		match self.shortcuts.dispatch(chord) {
			Some(WorkbenchCommand::Save) => {
				// Rejected begins (already saving, or clean) are still
				// handled chords; pending-change bookkeeping loses nothing.
				self.save_now(now, snapshot);
				true
			}
			None => false,
		}
	}

	/// Drains the event queue and enforces the write timeout. The host calls
	/// this from its event loop; `snapshot` provides document content for
	/// save attempts that become due.
	pub fn tick(&mut self, now: Instant, snapshot: &dyn Fn() -> String) {
		while let Ok(event) = self.events_rx.try_recv() {
			if self.closed {
				trace!(?event, "workbench.session.stale_event");
				continue;
			}
			match event {
				SessionEvent::SyncDue(direction) => self.sync.flush(direction),
				SessionEvent::AutosaveDue => {
					if let Some(attempt) = self.save.begin_save(now) {
						self.spawn_save(attempt, snapshot());
					}
				}
				SessionEvent::SaveFinished { attempt, result } => {
					match self.save.complete_save(attempt, result) {
						// Edits arrived during the save; go again.
						CompleteOutcome::Reschedule => self.arm_autosave(),
						CompleteOutcome::Settled | CompleteOutcome::Stale => {}
					}
				}
			}
		}

		if !self.closed {
			self.save.check_timeout(now, self.config.save_timeout);
		}
	}

	/// Tears the session down: cancels every pending timer and discards any
	/// completion that arrives afterwards. Idempotent.
	pub fn close(&mut self) {
		if self.closed {
			return;
		}
		debug!(doc_id = self.document.0, "workbench.session.close");
		self.closed = true;
		self.debounce.cancel_all();
	}

	/// Whether the session has been closed.
	pub fn is_closed(&self) -> bool {
		self.closed
	}

	fn arm_sync(&mut self, direction: SyncDirection) {
		let tx = self.events_tx.clone();
		self.debounce
			.schedule(TimerKey::Sync(direction), self.config.sync_debounce, move || {
				let _ = tx.send(SessionEvent::SyncDue(direction));
			});
	}

	fn arm_autosave(&mut self) {
		let tx = self.events_tx.clone();
		self.debounce
			.schedule(TimerKey::Autosave, self.config.autosave_debounce, move || {
				let _ = tx.send(SessionEvent::AutosaveDue);
			});
	}

	fn spawn_save(&self, attempt: SaveAttempt, content: String) {
		let gateway = self.gateway.clone();
		let tx = self.events_tx.clone();
		let document = self.document;
		debug!(
			doc_id = document.0,
			attempt = attempt.id.0,
			bytes = content.len(),
			"workbench.save.flush_start"
		);
		tokio::spawn(async move {
			let result = gateway
				.save(document, content)
				.await
				.map_err(SaveError::from);
			let _ = tx.send(SessionEvent::SaveFinished {
				attempt: attempt.id,
				result,
			});
		});
	}
}
