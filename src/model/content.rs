//! Content - the key/value pair committed into a namespace's trie

use super::encoding::base64_bytes;
use super::{Hash, HashAlgorithm};
use serde::{Deserialize, Serialize};

/// Separator placed between key and value when hashing content
const SEPARATOR: &[u8] = b"|";

/// A key/value pair stored in and proved by a [`crate::trie::MerkleTrie`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub key: String,
    #[serde(with = "base64_bytes")]
    pub value: Vec<u8>,
}

impl Content {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Content {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Content hash: `H(key ++ "|" ++ value)`
    ///
    /// Stable across calls and processes for a given algorithm; verifiers
    /// recompute it independently.
    pub fn calculate_hash(&self, algorithm: HashAlgorithm) -> Hash {
        algorithm.digest_many(&[self.key.as_bytes(), SEPARATOR, &self.value])
    }

    /// Branching key: `H(key)`. Independent of the value.
    pub fn prefix_key(&self, algorithm: HashAlgorithm) -> Hash {
        algorithm.digest(self.key.as_bytes())
    }

    /// Two contents are equal under an algorithm when their hashes are equal
    pub fn equals(&self, other: &Content, algorithm: HashAlgorithm) -> bool {
        self.calculate_hash(algorithm) == other.calculate_hash(algorithm)
    }
}
