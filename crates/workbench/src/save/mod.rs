//! Save state machine with single in-flight persistence attempts.
//!
//! [`SaveMachine`] is the pure transition core; the session drives it and
//! spawns the actual gateway calls. Transitions:
//! `clean → dirty → saving → {clean, error}`, `error → saving` on retry.
//! Edits arriving while a save is in flight are counted and coalesced into
//! one follow-up attempt; two saves never overlap.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tandem_primitives::DocumentId;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Default debounce window between an edit and the autosave attempt.
pub const AUTOSAVE_DEBOUNCE: Duration = Duration::from_millis(3000);

/// Time an attempt may stay in flight before it is treated as failed.
pub const SAVE_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Failure reported by the persistence gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
	/// The backend could not be reached.
	#[error("backend unavailable: {0}")]
	Unavailable(String),
	/// The backend refused the save.
	#[error("save rejected: {0}")]
	Rejected(String),
}

/// Terminal outcome of a persistence attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
	/// The gateway reported a failure.
	#[error(transparent)]
	Gateway(#[from] GatewayError),
	/// The attempt neither succeeded nor failed within the write timeout.
	#[error("save timed out")]
	Timeout,
}

/// Performs the actual save call. Implementations must be idempotent-safe to
/// retry: duplicate saves of identical content are harmless.
#[async_trait::async_trait]
pub trait PersistenceGateway: Send + Sync {
	/// Persists `content` for `document`.
	async fn save(&self, document: DocumentId, content: String) -> Result<(), GatewayError>;
}

/// Persistence lifecycle of the active document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveState {
	/// No edits since the last successful save.
	Clean,
	/// Unsaved edits exist.
	Dirty,
	/// A persistence attempt is in flight.
	Saving,
	/// The last attempt failed; retry is available.
	Error,
}

/// Identifier of one persistence attempt, for completion matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptId(pub u64);

/// Handle for an attempt the machine has admitted.
#[derive(Debug, Clone, Copy)]
pub struct SaveAttempt {
	/// The attempt's identifier.
	pub id: AttemptId,
}

#[derive(Debug, Clone, Copy)]
struct InFlightSave {
	id: AttemptId,
	started_at: Instant,
}

/// What the caller should do after `mark_dirty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirtyOutcome {
	/// (Re)arm the autosave debounce timer.
	Reschedule,
	/// A save is in flight; the edit was absorbed into the pending count.
	Deferred,
}

/// What the caller should do after `complete_save`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompleteOutcome {
	/// The machine settled (clean or error).
	Settled,
	/// Edits arrived during the save; arm a fresh autosave attempt.
	Reschedule,
	/// The completion did not match the in-flight attempt and was discarded.
	Stale,
}

/// Read-only snapshot for UI rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveStatus {
	/// Current lifecycle state.
	pub state: SaveState,
	/// When the last successful save completed.
	pub last_saved_at: Option<DateTime<Utc>>,
	/// Reason for the last failure, while in the error state.
	pub last_error: Option<String>,
	/// Edits that arrived while a save was in flight.
	pub pending_changes: u32,
}

/// Pure save state machine. One exists per open document session.
#[derive(Debug)]
pub struct SaveMachine {
	state: SaveState,
	last_saved_at: Option<DateTime<Utc>>,
	last_error: Option<String>,
	pending_changes: u32,
	inflight: Option<InFlightSave>,
	next_attempt: u64,
}

impl Default for SaveMachine {
	fn default() -> Self {
		Self::new()
	}
}

impl SaveMachine {
	/// A machine in the clean state, as on document load.
	pub fn new() -> Self {
		Self {
			state: SaveState::Clean,
			last_saved_at: None,
			last_error: None,
			pending_changes: 0,
			inflight: None,
			next_attempt: 1,
		}
	}

	/// Current lifecycle state.
	pub fn state(&self) -> SaveState {
		self.state
	}

	/// Whether an attempt is in flight.
	pub fn is_saving(&self) -> bool {
		self.inflight.is_some()
	}

	/// Read-only snapshot for UI rendering.
	pub fn status(&self) -> SaveStatus {
		SaveStatus {
			state: self.state,
			last_saved_at: self.last_saved_at,
			last_error: self.last_error.clone(),
			pending_changes: self.pending_changes,
		}
	}

	/// Records an edit. Cheap; callable arbitrarily often.
	///
	/// Outside a save this lands in `Dirty` (clearing a prior error) and asks
	/// the caller to rearm the autosave timer. During a save the edit is
	/// counted so one follow-up attempt is issued after the in-flight one
	/// completes.
	pub fn mark_dirty(&mut self) -> DirtyOutcome {
		match self.state {
			SaveState::Saving => {
				self.pending_changes += 1;
				trace!(pending = self.pending_changes, "workbench.save.dirty_deferred");
				DirtyOutcome::Deferred
			}
			SaveState::Clean | SaveState::Dirty | SaveState::Error => {
				if self.state == SaveState::Error {
					self.last_error = None;
				}
				self.state = SaveState::Dirty;
				DirtyOutcome::Reschedule
			}
		}
	}

	/// Admits a persistence attempt, transitioning to `Saving`.
	///
	/// Rejected (returns `None`) unless the machine is `Dirty` with nothing in
	/// flight; this is the at-most-one-in-flight invariant that keeps manual
	/// "save now" from racing the debounced autosave.
	pub fn begin_save(&mut self, now: Instant) -> Option<SaveAttempt> {
		if self.inflight.is_some() || self.state != SaveState::Dirty {
			trace!(state = ?self.state, "workbench.save.begin_rejected");
			return None;
		}
		let id = AttemptId(self.next_attempt);
		self.next_attempt += 1;
		self.inflight = Some(InFlightSave { id, started_at: now });
		self.state = SaveState::Saving;
		self.pending_changes = 0;
		debug!(attempt = id.0, "workbench.save.begin");
		Some(SaveAttempt { id })
	}

	/// Applies an attempt's result. Completions that do not match the
	/// in-flight attempt (already completed, timed out, or superseded) are
	/// discarded, which makes completion idempotent.
	pub fn complete_save(
		&mut self,
		attempt: AttemptId,
		result: Result<(), SaveError>,
	) -> CompleteOutcome {
		let matches = self.inflight.is_some_and(|inflight| inflight.id == attempt);
		if !matches {
			trace!(attempt = attempt.0, "workbench.save.stale_completion");
			return CompleteOutcome::Stale;
		}
		self.inflight = None;

		match result {
			Ok(()) => {
				if self.pending_changes > 0 {
					// The save that just finished is stale relative to the
					// edits that arrived during it.
					self.state = SaveState::Dirty;
					debug!(
						attempt = attempt.0,
						pending = self.pending_changes,
						"workbench.save.success_superseded"
					);
					CompleteOutcome::Reschedule
				} else {
					self.state = SaveState::Clean;
					self.last_saved_at = Some(Utc::now());
					self.last_error = None;
					debug!(attempt = attempt.0, "workbench.save.success");
					CompleteOutcome::Settled
				}
			}
			Err(err) => {
				self.state = SaveState::Error;
				self.last_error = Some(err.to_string());
				warn!(attempt = attempt.0, error = %err, "workbench.save.failed");
				CompleteOutcome::Settled
			}
		}
	}

	/// Retries after a failure: clears the error and immediately admits a new
	/// attempt. No-op outside the error state.
	pub fn retry(&mut self, now: Instant) -> Option<SaveAttempt> {
		if self.state != SaveState::Error {
			trace!(state = ?self.state, "workbench.save.retry_rejected");
			return None;
		}
		self.last_error = None;
		self.state = SaveState::Dirty;
		self.begin_save(now)
	}

	/// Force-fails an attempt that has been in flight longer than `limit`.
	/// The real completion, arriving later, is then stale and discarded.
	pub fn check_timeout(&mut self, now: Instant, limit: Duration) -> bool {
		let Some(inflight) = self.inflight else {
			return false;
		};
		if now.duration_since(inflight.started_at) <= limit {
			return false;
		}
		warn!(attempt = inflight.id.0, "workbench.save.write_timeout");
		self.complete_save(inflight.id, Err(SaveError::Timeout));
		true
	}
}
