//! Anchor index: immutable block-to-position lookup for both panes.
//!
//! Built once per document load and rebuilt wholesale whenever the block set
//! changes; the session swaps the whole index atomically so no lookup ever
//! observes a half-updated mapping. Lookups after a rebuild reflect the new
//! generation exclusively.

use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;
use tandem_primitives::{Block, BlockId, EditorSpan, SourceRegion, ViewPosition};
use tracing::warn;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Immutable mapping between blocks and their positions in each pane.
#[derive(Debug)]
pub struct AnchorIndex {
	generation: u64,
	/// Blocks in logical reading order.
	blocks: Vec<Block>,
	by_id: FxHashMap<BlockId, usize>,
	/// Slots of blocks present in the source pane, sorted by `(page, y)`.
	source_order: Vec<((u32, u32), usize)>,
	/// Slots of blocks present in the editor pane, sorted by span start.
	editor_order: Vec<(usize, usize)>,
}

impl AnchorIndex {
	/// Builds an index from a block sequence. Blocks are sorted into reading
	/// order; a block whose id already appeared is dropped with a warning
	/// (ids must be unique within a document).
	pub fn build(blocks: impl IntoIterator<Item = Block>) -> Self {
		let mut ordered: Vec<Block> = blocks.into_iter().collect();
		ordered.sort_by_key(|b| b.order);

		let mut by_id = FxHashMap::default();
		let mut deduped = Vec::with_capacity(ordered.len());
		for block in ordered {
			if by_id.contains_key(&block.id) {
				warn!(block = block.id.0, "workbench.anchor.duplicate_block");
				continue;
			}
			by_id.insert(block.id, deduped.len());
			deduped.push(block);
		}

		let mut source_order: Vec<_> = deduped
			.iter()
			.enumerate()
			.filter_map(|(slot, b)| b.source.map(|r| (r.origin().sort_key(), slot)))
			.collect();
		source_order.sort_unstable();

		let mut editor_order: Vec<_> = deduped
			.iter()
			.enumerate()
			.filter_map(|(slot, b)| b.editor.map(|s| (s.start, slot)))
			.collect();
		editor_order.sort_unstable();

		Self {
			generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
			blocks: deduped,
			by_id,
			source_order,
			editor_order,
		}
	}

	/// The generation assigned at build time; strictly increasing across
	/// rebuilds within a process.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Number of blocks in the index.
	pub fn len(&self) -> usize {
		self.blocks.len()
	}

	/// Whether the index holds no blocks.
	pub fn is_empty(&self) -> bool {
		self.blocks.is_empty()
	}

	/// The block with the given id, if present.
	pub fn block(&self, id: BlockId) -> Option<&Block> {
		self.by_id.get(&id).map(|&slot| &self.blocks[slot])
	}

	/// The block's region in the source pane, if it has one.
	pub fn source_region_of(&self, id: BlockId) -> Option<SourceRegion> {
		self.block(id).and_then(|b| b.source)
	}

	/// The block's span in the editor pane, if it has one.
	pub fn editor_span_of(&self, id: BlockId) -> Option<EditorSpan> {
		self.block(id).and_then(|b| b.editor)
	}

	/// Resolves a pane position to the closest enclosing-or-preceding block.
	///
	/// A position before the first block resolves to the first block. Returns
	/// `None` only when no block has a position in the queried pane.
	pub fn nearest_block(&self, position: ViewPosition) -> Option<BlockId> {
		let slot = match position {
			ViewPosition::Source(point) => nearest_in(&self.source_order, point.sort_key()),
			ViewPosition::Editor(offset) => nearest_in(&self.editor_order, offset),
		}?;
		Some(self.blocks[slot].id)
	}
}

/// Last entry with start <= query, else the first entry. Entries are sorted
/// by `(start, slot)`, so among equal starts the latest block in reading
/// order wins.
fn nearest_in<T: Ord + Copy>(order: &[(T, usize)], query: T) -> Option<usize> {
	if order.is_empty() {
		return None;
	}
	let idx = order.partition_point(|&(start, _)| start <= query);
	if idx == 0 {
		return Some(order[0].1);
	}
	Some(order[idx - 1].1)
}
