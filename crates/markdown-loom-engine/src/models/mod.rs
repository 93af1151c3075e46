pub mod document;
pub mod runs;
pub mod span;

pub(crate) use document::blocks_len;
pub use document::{
    Block, BlockPath, Document, Fragment, HARD_BREAK_CHAR, IMAGE_CHAR, Inline, LeafLocation, List,
    ListItem,
};
pub use runs::{Leaf, LinkTarget, Mark, Marks, Run, Runs};
pub use span::{Position, Span};
