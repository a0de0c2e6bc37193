//! # mtree_index
//!
//! An authenticated, incrementally-updatable key/value index.
//!
//! Every namespace of a ledger's state gets a merkle trie whose root hash
//! commits to all of the namespace's key/value pairs. The trie is updated in
//! place as batches commit, and hands out inclusion proofs that anyone
//! holding a trusted root can check without access to the trie.
//!
//! ## Core Concepts
//!
//! - **Content**: a key/value pair, hashed as `H(key ++ "|" ++ value)`
//! - **Trie**: binary radix trie over `H(key)`, one per namespace
//! - **Merkle path**: sibling hashes from a leaf to the root
//! - **Registry**: namespace -> trie, fed by the ledger's commit path
//! - **Publisher**: serves each namespace's root, signed
//!
//! ## Example
//!
//! ```
//! use mtree_index::{
//!     verify_merkle_path, Content, HashAlgorithm, Height, TreeRegistry, UpdateBatch,
//! };
//!
//! let registry = TreeRegistry::new(HashAlgorithm::Sha256);
//! let mut batch = UpdateBatch::new();
//! batch.put("ns1", "k1", "v1");
//! registry.apply_updates(&batch, Height::new(1, 0))?;
//!
//! let content = Content::new("k1", "v1");
//! let root = registry.get_merkle_root("ns1").unwrap();
//! let path = registry.get_merkle_path("ns1", &content)?.unwrap();
//! assert!(verify_merkle_path(HashAlgorithm::Sha256, &content, &path, &root));
//! # Ok::<(), mtree_index::Error>(())
//! ```

pub mod client;
pub mod config;
pub mod model;
pub mod registry;
pub mod service;
pub mod signer;
pub mod trie;

mod error;

pub use client::RootClient;
pub use config::Config;
pub use error::{Error, Result};
pub use model::{Content, Hash, HashAlgorithm, MerklePathEntry};
pub use registry::{Height, ProvenValue, TreeRegistry, UpdateBatch, UpdateSource};
pub use service::{
    MerkleRootResponse, PublicKeyResponse, PublisherGuard, RootPublisher, ServiceHandle,
    SignedMerkleRootResponse,
};
pub use signer::{verify_signature, Ed25519Signer, KeyStore, RootSigner};
pub use trie::{verify_merkle_path, MerkleTrie};
