//! Identifier newtypes for documents and content blocks.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_BLOCK_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for an open document session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub u64);

impl DocumentId {
	/// Generates a new unique document ID.
	pub fn next() -> Self {
		Self(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
	}
}

/// Stable identifier for a content block, unique within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u64);

impl BlockId {
	/// Generates a new unique block ID.
	pub fn next() -> Self {
		Self(NEXT_BLOCK_ID.fetch_add(1, Ordering::Relaxed))
	}
}
