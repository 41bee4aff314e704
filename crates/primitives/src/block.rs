//! Content blocks and their positions in the two workbench panes.
//!
//! A [`Block`] is the logical unit both panes agree on: the rendered source
//! pane addresses it by page geometry, the editor pane by a character span.
//! Either side may be absent (a block present in only one pane), never
//! duplicated.

use serde::{Deserialize, Serialize};

use crate::ids::BlockId;

/// Which pane of the workbench a position belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewKind {
	/// The rendered source pane (paginated document render).
	Source,
	/// The editable text pane.
	Editor,
}

/// Bounding region of a block on a rendered source page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceRegion {
	/// Zero-based page index.
	pub page: u32,
	/// Left edge, in page coordinates.
	pub x: f32,
	/// Top edge, in page coordinates.
	pub y: f32,
	/// Region width.
	pub width: f32,
	/// Region height.
	pub height: f32,
}

impl SourceRegion {
	/// The top-left anchor point of the region.
	pub fn origin(&self) -> PagePoint {
		PagePoint { page: self.page, y: self.y }
	}
}

/// A vertical position within the source pane's coordinate space.
///
/// Ordered by `(page, y)`, which is the reading order of a paginated render.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PagePoint {
	/// Zero-based page index.
	pub page: u32,
	/// Vertical offset within the page.
	pub y: f32,
}

impl PagePoint {
	/// Total-order sort key. `y` values from view collaborators are finite;
	/// NaN is clamped to the page start rather than poisoning the order.
	pub fn sort_key(&self) -> (u32, u32) {
		let y = if self.y.is_nan() { 0.0 } else { self.y.max(0.0) };
		(self.page, y.to_bits())
	}
}

/// A character-offset range within the editor pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorSpan {
	/// Inclusive start offset.
	pub start: usize,
	/// Exclusive end offset.
	pub end: usize,
}

impl EditorSpan {
	/// Whether `offset` falls inside the span.
	pub fn contains(&self, offset: usize) -> bool {
		offset >= self.start && offset < self.end
	}
}

/// A position in either pane's coordinate space, for nearest-block queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewPosition {
	/// A scroll/cursor position in the source pane.
	Source(PagePoint),
	/// A character offset in the editor pane.
	Editor(usize),
}

impl ViewPosition {
	/// The pane this position belongs to.
	pub fn view(&self) -> ViewKind {
		match self {
			ViewPosition::Source(_) => ViewKind::Source,
			ViewPosition::Editor(_) => ViewKind::Editor,
		}
	}
}

/// A logical unit of document content, addressable from both panes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
	/// Stable identifier, unique within the document.
	pub id: BlockId,
	/// Position in logical reading order.
	pub order: u32,
	/// Geometry in the source pane, if the block is rendered there.
	pub source: Option<SourceRegion>,
	/// Span in the editor pane, if the block is editable there.
	pub editor: Option<EditorSpan>,
}

impl Block {
	/// The block's position in the given pane, if it has one.
	pub fn position_in(&self, view: ViewKind) -> Option<ViewPosition> {
		match view {
			ViewKind::Source => self.source.map(|r| ViewPosition::Source(r.origin())),
			ViewKind::Editor => self.editor.map(|s| ViewPosition::Editor(s.start)),
		}
	}
}
