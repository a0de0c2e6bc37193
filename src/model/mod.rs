//! Core data model types for mtree_index

mod content;
pub(crate) mod encoding;
mod hash;
mod path;

pub use content::Content;
pub use hash::{Hash, HashAlgorithm};
pub use path::MerklePathEntry;
