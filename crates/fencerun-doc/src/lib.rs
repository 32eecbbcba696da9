//! Document side of fencerun: scan a text document for fenced code blocks,
//! derive a stable identity per block, and splice execution output back into
//! the document immediately after the block it belongs to.
//!
//! Everything here is a pure function of its inputs. The index built from one
//! parse must never be used to merge into a newer revision of the document;
//! rebuild it first.

pub mod fences;
pub mod identity;
pub mod index;
pub mod merge;

pub use fences::{CodeBlock, parse};
pub use identity::identify;
pub use index::BlockIndex;
pub use merge::{RenderedResult, SEGMENT_END, SEGMENT_START_PREFIX, merge};

/// Parse `document` and build the identifier index in one step.
pub fn index_document(document: &str) -> BlockIndex {
    BlockIndex::build(parse(document))
}
