//! Explicit-save shortcut bindings.
//!
//! The keyboard surface itself is a collaborator; this only maps chords to
//! workbench commands. The default table binds Ctrl+S to save.

use rustc_hash::FxHashMap;
use tandem_primitives::Key;

/// Commands an explicit shortcut can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkbenchCommand {
	/// Begin a save immediately, short-circuiting the autosave debounce.
	Save,
}

/// Chord-to-command lookup table.
#[derive(Debug)]
pub struct ShortcutDispatcher {
	bindings: FxHashMap<Key, WorkbenchCommand>,
}

impl Default for ShortcutDispatcher {
	fn default() -> Self {
		let mut bindings = FxHashMap::default();
		bindings.insert(Key::ctrl_char('s'), WorkbenchCommand::Save);
		Self { bindings }
	}
}

impl ShortcutDispatcher {
	/// The default binding table (Ctrl+S → save).
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds or replaces a binding.
	pub fn bind(&mut self, chord: Key, command: WorkbenchCommand) {
		self.bindings.insert(chord, command);
	}

	/// The command bound to `chord`, if any.
	pub fn dispatch(&self, chord: &Key) -> Option<WorkbenchCommand> {
		self.bindings.get(chord).copied()
	}
}
