//! Keyed debounce timers: collapse a burst of triggers into one deferred action.
//!
//! [`Debouncer`] arms one timer per key. Scheduling under a key cancels the
//! timer already armed for that key, so only the last call within the window
//! fires. Keys are independent; a sync timer never interferes with a save
//! timer. Actions fire on the tokio runtime, asynchronously relative to the
//! scheduling call.

use std::hash::Hash;
use std::time::Duration;

use rustc_hash::FxHashMap;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// One armed timer. The token doubles as a spent marker: the timer task
/// cancels it after firing, so a live token always means a pending action.
#[derive(Debug)]
struct ArmedTimer {
	cancel: CancellationToken,
}

/// Cancel-previous, fire-last keyed timers.
#[derive(Debug, Default)]
pub struct Debouncer<K> {
	timers: FxHashMap<K, ArmedTimer>,
}

impl<K> Debouncer<K>
where
	K: Eq + Hash + Clone + std::fmt::Debug,
{
	/// Creates a debouncer with no armed timers.
	pub fn new() -> Self {
		Self {
			timers: FxHashMap::default(),
		}
	}

	/// Arms `action` to fire after `delay`, superseding any timer already
	/// armed under `key`. The superseded action never fires.
	///
	/// Must be called from within a tokio runtime.
	pub fn schedule<F>(&mut self, key: K, delay: Duration, action: F)
	where
		F: FnOnce() + Send + 'static,
	{
		if let Some(previous) = self.timers.remove(&key) {
			previous.cancel.cancel();
		}

		let cancel = CancellationToken::new();
		self.timers.insert(
			key.clone(),
			ArmedTimer {
				cancel: cancel.clone(),
			},
		);

		trace!(?key, delay_ms = delay.as_millis() as u64, "debounce.armed");

		tokio::spawn(async move {
			if delay > Duration::ZERO {
				tokio::select! {
					_ = cancel.cancelled() => return,
					_ = sleep(delay) => {}
				}
			} else if cancel.is_cancelled() {
				return;
			}

			action();
			// Mark spent so is_armed() reflects reality.
			cancel.cancel();
		});
	}

	/// Removes a pending action under `key` without firing it.
	pub fn cancel(&mut self, key: &K) {
		if let Some(timer) = self.timers.remove(key) {
			trace!(?key, "debounce.cancelled");
			timer.cancel.cancel();
		}
	}

	/// Cancels every pending action. Used on session teardown.
	pub fn cancel_all(&mut self) {
		for (key, timer) in self.timers.drain() {
			trace!(?key, "debounce.cancelled");
			timer.cancel.cancel();
		}
	}

	/// Whether a timer is armed and has neither fired nor been cancelled.
	pub fn is_armed(&self, key: &K) -> bool {
		self.timers
			.get(key)
			.is_some_and(|timer| !timer.cancel.is_cancelled())
	}
}

#[cfg(test)]
mod tests;
