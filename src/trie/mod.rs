//! Authenticated merkle trie for one namespace
//!
//! This implements a binary radix trie where:
//! - Leaves are placed by the bits of `H(key)`, not by the raw key
//! - Each internal node hashes the concatenation of its children's hashes
//! - The root hash commits to every key/value pair in the namespace
//! - Any leaf can be proved against the root with a path of sibling hashes

mod node;
mod tree;
mod verify;

pub use node::{common_prefix_bits, NodeId, Side};
pub use tree::MerkleTrie;
pub use verify::verify_merkle_path;
