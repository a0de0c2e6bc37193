//! Merkle path entries

use super::Hash;
use serde::{Deserialize, Serialize};

/// One step of an inclusion proof, ordered leaf to root
///
/// `is_left_sibling` is true when the node being proved sits on the left,
/// so the recorded sibling is its right neighbour. A child of the root may
/// have no sibling; that side contributes no bytes to the parent's hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePathEntry {
    pub sibling_hash: Option<Hash>,
    pub is_left_sibling: bool,
}

impl MerklePathEntry {
    pub fn new(sibling_hash: Option<Hash>, is_left_sibling: bool) -> Self {
        MerklePathEntry {
            sibling_hash,
            is_left_sibling,
        }
    }

    /// Sibling bytes as they enter the parent's hash
    pub fn sibling_bytes(&self) -> &[u8] {
        self.sibling_hash.as_ref().map(|h| h.as_ref()).unwrap_or(&[])
    }
}
