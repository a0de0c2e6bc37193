//! Namespace -> trie registry fed by the ledger's commit path
//!
//! The registry is owned by the caller and shared by handle: the commit path
//! calls [`TreeRegistry::apply_updates`], readers and the publication service
//! call the lookup methods. Each namespace's trie sits behind its own mutex,
//! held for a whole batch (per namespace) or a whole read.

use crate::model::encoding::base64_bytes;
use crate::model::{Content, Hash, HashAlgorithm, MerklePathEntry};
use crate::trie::MerkleTrie;
use crate::{Error, Result};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Ledger height a batch was committed at
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Height {
    pub block_num: u64,
    pub tx_num: u64,
}

impl Height {
    pub fn new(block_num: u64, tx_num: u64) -> Self {
        Height { block_num, tx_num }
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block_num, self.tx_num)
    }
}

/// A batch of committed state changes, as handed over by the ledger
///
/// A `None` value is a tombstone (delete); `Some` is an upsert.
pub trait UpdateSource {
    fn updated_namespaces(&self) -> Vec<String>;

    fn updates(&self, namespace: &str) -> Vec<(String, Option<Vec<u8>>)>;
}

/// In-memory [`UpdateSource`]
#[derive(Clone, Debug, Default)]
pub struct UpdateBatch {
    updates: BTreeMap<String, BTreeMap<String, Option<Vec<u8>>>>,
}

impl UpdateBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, namespace: &str, key: &str, value: impl Into<Vec<u8>>) {
        self.updates
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), Some(value.into()));
    }

    pub fn delete(&mut self, namespace: &str, key: &str) {
        self.updates
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), None);
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

impl UpdateSource for UpdateBatch {
    fn updated_namespaces(&self) -> Vec<String> {
        self.updates.keys().cloned().collect()
    }

    fn updates(&self, namespace: &str) -> Vec<(String, Option<Vec<u8>>)> {
        self.updates
            .get(namespace)
            .map(|kvs| kvs.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }
}

/// A state value together with the proof that it is in its namespace's trie
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenValue {
    #[serde(with = "base64_bytes")]
    pub value: Vec<u8>,
    pub merkle_path: Vec<MerklePathEntry>,
}

/// Registry of per-namespace merkle tries
pub struct TreeRegistry {
    algorithm: HashAlgorithm,
    trees: RwLock<HashMap<String, Arc<Mutex<MerkleTrie>>>>,
    savepoint: Mutex<Option<Height>>,
}

impl TreeRegistry {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        TreeRegistry {
            algorithm,
            trees: RwLock::new(HashMap::new()),
            savepoint: Mutex::new(None),
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Apply a committed batch, creating tries for new namespaces
    ///
    /// An error aborts the batch. Namespaces handled before the failure keep
    /// their changes; the caller must treat the whole commit as failed. The
    /// savepoint only advances when every namespace was applied, and never
    /// moves back when batches finish out of order.
    pub fn apply_updates(&self, batch: &impl UpdateSource, height: Height) -> Result<()> {
        for namespace in batch.updated_namespaces() {
            let tree = self.tree_or_create(&namespace);
            let mut tree = tree.lock();

            let updates = batch.updates(&namespace);
            debug!(
                namespace = %namespace,
                height = %height,
                updates = updates.len(),
                "applying updates"
            );

            for (key, value) in updates {
                match value {
                    Some(value) => tree.add(Content::new(key, value))?,
                    None => tree.delete(&Content::new(key, Vec::new()))?,
                }
            }
            debug!(namespace = %namespace, root = %tree.root_hash(), "namespace updated");
        }

        let mut savepoint = self.savepoint.lock();
        *savepoint = (*savepoint).max(Some(height));
        Ok(())
    }

    /// Highest height of a fully applied batch
    pub fn savepoint(&self) -> Option<Height> {
        *self.savepoint.lock()
    }

    /// Root of a namespace; `None` if the namespace was never touched
    pub fn get_merkle_root(&self, namespace: &str) -> Option<Hash> {
        self.tree(namespace).map(|tree| tree.lock().root_hash())
    }

    /// Path for `content.key`; `None` if the namespace was never touched
    pub fn get_merkle_path(
        &self,
        namespace: &str,
        content: &Content,
    ) -> Result<Option<Vec<MerklePathEntry>>> {
        match self.tree(namespace) {
            Some(tree) => Ok(Some(tree.lock().merkle_path(content)?)),
            None => Ok(None),
        }
    }

    /// False if the namespace was never touched
    pub fn verify_content(&self, namespace: &str, content: &Content) -> Result<bool> {
        match self.tree(namespace) {
            Some(tree) => tree.lock().verify_content(content),
            None => Ok(false),
        }
    }

    /// Read a value with its inclusion proof
    ///
    /// `None` if the key (or namespace) is absent. A value that does not
    /// match the trie is an error: the backing store and the index disagree.
    pub fn prove_state(
        &self,
        namespace: &str,
        key: &str,
        value: &[u8],
    ) -> Result<Option<ProvenValue>> {
        let Some(tree) = self.tree(namespace) else {
            return Ok(None);
        };
        let tree = tree.lock();
        if !tree.contains_key(key) {
            return Ok(None);
        }

        let content = Content::new(key, value);
        if !tree.verify_content(&content)? {
            return Err(Error::InvalidContent {
                namespace: namespace.to_string(),
                key: key.to_string(),
            });
        }
        let merkle_path = tree.merkle_path(&content)?;
        Ok(Some(ProvenValue {
            value: content.value,
            merkle_path,
        }))
    }

    /// Replace a namespace's trie with one built from `contents`
    ///
    /// Used to rebuild the index from the authoritative store after a
    /// restart. The new trie is built before the old one is swapped out.
    pub fn rebuild_namespace(
        &self,
        namespace: &str,
        contents: impl IntoIterator<Item = Content>,
    ) -> Result<Hash> {
        let trie = MerkleTrie::from_contents(self.algorithm, contents)?;
        let root = trie.root_hash();
        debug!(namespace = %namespace, root = %root, keys = trie.len(), "namespace rebuilt");

        let tree = self.tree_or_create(namespace);
        *tree.lock() = trie;
        Ok(root)
    }

    /// Namespaces that have a trie, sorted
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.trees.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn tree(&self, namespace: &str) -> Option<Arc<Mutex<MerkleTrie>>> {
        self.trees.read().get(namespace).cloned()
    }

    fn tree_or_create(&self, namespace: &str) -> Arc<Mutex<MerkleTrie>> {
        if let Some(tree) = self.tree(namespace) {
            return tree;
        }
        let mut trees = self.trees.write();
        trees
            .entry(namespace.to_string())
            .or_insert_with(|| {
                debug!(namespace = %namespace, "creating trie");
                Arc::new(Mutex::new(MerkleTrie::new(self.algorithm)))
            })
            .clone()
    }
}

impl Default for TreeRegistry {
    fn default() -> Self {
        TreeRegistry::new(HashAlgorithm::default())
    }
}
