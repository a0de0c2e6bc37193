//! Merkle trie implementation for one namespace

use super::node::{common_prefix_bits, Node, NodeId, NodeKind, Side};
use crate::model::{Content, Hash, HashAlgorithm, MerklePathEntry};
use crate::{Error, Result};
use std::collections::HashMap;
use std::fmt;

/// Arena slot of the synthetic root; never released
const ROOT: NodeId = 0;

/// A binary radix trie keyed by `H(key)` with merkle hashes on every node
///
/// The root's two children split leaves on the high bit of their prefix key.
/// Below that, each internal node records how many prefix bits its leaves
/// share. Every mutation rehashes from the touched node up to the root, so
/// [`MerkleTrie::root_hash`] is never stale.
pub struct MerkleTrie {
    algorithm: HashAlgorithm,
    nodes: Vec<Option<Node>>,
    /// Released arena slots available for reuse
    free: Vec<NodeId>,
    /// key -> leaf
    leaves: HashMap<String, NodeId>,
}

impl MerkleTrie {
    /// Create an empty trie
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let root = Node::root(algorithm.digest_children(None, None));
        MerkleTrie {
            algorithm,
            nodes: vec![Some(root)],
            free: Vec::new(),
            leaves: HashMap::new(),
        }
    }

    /// Build a trie by adding each content in order
    pub fn from_contents(
        algorithm: HashAlgorithm,
        contents: impl IntoIterator<Item = Content>,
    ) -> Result<Self> {
        let mut trie = MerkleTrie::new(algorithm);
        for content in contents {
            trie.add(content)?;
        }
        Ok(trie)
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Get the root hash
    pub fn root_hash(&self) -> Hash {
        match &self.nodes[ROOT] {
            Some(root) => root.hash,
            None => self.algorithm.digest_children(None, None),
        }
    }

    /// Number of keys in the trie
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.leaves.contains_key(key)
    }

    /// Get the content currently stored under a key
    pub fn get(&self, key: &str) -> Option<&Content> {
        let id = *self.leaves.get(key)?;
        match &self.nodes.get(id)?.as_ref()?.kind {
            NodeKind::Leaf { content } => Some(content),
            NodeKind::Internal { .. } => None,
        }
    }

    /// Insert a content, or update it if the key is already present
    pub fn add(&mut self, content: Content) -> Result<()> {
        if self.leaves.contains_key(&content.key) {
            return self.update(content);
        }

        let prefix_key = content.prefix_key(self.algorithm);
        let hash = content.calculate_hash(self.algorithm);
        let key = content.key.clone();
        let leaf = self.alloc(Node::leaf(content, hash, prefix_key));
        self.leaves.insert(key, leaf);

        let side = Side::of_prefix(&prefix_key);
        match self.node(ROOT)?.child(side) {
            None => {
                self.node_mut(ROOT)?.set_child(side, Some(leaf));
                self.node_mut(leaf)?.parent = Some(ROOT);
                self.rehash_from(ROOT)
            }
            Some(top) => {
                let (target, common) = self.find_split_point(top, &prefix_key)?;
                self.split(target, leaf, common)
            }
        }
    }

    /// Replace the content stored under `content.key`
    ///
    /// A key that is not present is added instead.
    pub fn update(&mut self, content: Content) -> Result<()> {
        let Some(&leaf) = self.leaves.get(&content.key) else {
            return self.add(content);
        };

        let hash = content.calculate_hash(self.algorithm);
        let node = self.node_mut(leaf)?;
        node.hash = hash;
        node.kind = NodeKind::Leaf { content };
        let parent = node.parent;

        match parent {
            Some(parent) => self.rehash_from(parent),
            None => Err(Error::Corruption(format!("leaf {} has no parent", leaf))),
        }
    }

    /// Remove the leaf for `content.key`. Absent keys are a no-op.
    ///
    /// Only the key is consulted; the value is ignored.
    pub fn delete(&mut self, content: &Content) -> Result<()> {
        let Some(leaf) = self.leaves.remove(&content.key) else {
            return Ok(());
        };

        let parent = self.parent_of(leaf)?;
        let side = self.side_in_parent(parent, leaf)?;

        if parent == ROOT {
            self.node_mut(ROOT)?.set_child(side, None);
            self.release(leaf);
            return self.rehash_from(ROOT);
        }

        // The parent only existed to separate the leaf from its sibling;
        // the sibling takes the parent's place.
        let sibling = self.node(parent)?.child(side.opposite()).ok_or_else(|| {
            Error::Corruption(format!("internal node {} has a single child", parent))
        })?;
        let grandparent = self.parent_of(parent)?;
        let parent_side = self.side_in_parent(grandparent, parent)?;

        self.node_mut(grandparent)?
            .set_child(parent_side, Some(sibling));
        self.node_mut(sibling)?.parent = Some(grandparent);
        self.release(leaf);
        self.release(parent);

        self.rehash_from(grandparent)
    }

    /// Sibling hashes from the leaf for `content.key` up to the root
    ///
    /// Returns an empty path for an absent key. Only the key is consulted.
    pub fn merkle_path(&self, content: &Content) -> Result<Vec<MerklePathEntry>> {
        let Some(&leaf) = self.leaves.get(&content.key) else {
            return Ok(Vec::new());
        };

        let mut path = Vec::new();
        let mut current = leaf;
        while let Some(parent) = self.node(current)?.parent {
            let side = self.side_in_parent(parent, current)?;
            let sibling = match self.node(parent)?.child(side.opposite()) {
                Some(id) => Some(self.node(id)?.hash),
                None => None,
            };
            path.push(MerklePathEntry::new(sibling, side == Side::Left));
            current = parent;
        }
        Ok(path)
    }

    /// Check that `content` is stored and every hash from its leaf to the
    /// root is consistent
    ///
    /// A missing key or any mismatch is `Ok(false)`.
    pub fn verify_content(&self, content: &Content) -> Result<bool> {
        let Some(&leaf) = self.leaves.get(&content.key) else {
            return Ok(false);
        };

        let node = self.node(leaf)?;
        if node.hash != content.calculate_hash(self.algorithm) {
            return Ok(false);
        }

        let mut current = node.parent;
        while let Some(id) = current {
            let node = self.node(id)?;
            if self.compute_hash(id)? != node.hash {
                return Ok(false);
            }
            current = node.parent;
        }
        Ok(true)
    }

    // === Internal helpers ===

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id)
            .and_then(Option::as_ref)
            .ok_or_else(|| Error::Corruption(format!("dangling node index {}", id)))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or_else(|| Error::Corruption(format!("dangling node index {}", id)))
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        if id != ROOT {
            if let Some(slot) = self.nodes.get_mut(id) {
                *slot = None;
                self.free.push(id);
            }
        }
    }

    fn parent_of(&self, id: NodeId) -> Result<NodeId> {
        self.node(id)?
            .parent
            .ok_or_else(|| Error::Corruption(format!("node {} has no parent", id)))
    }

    fn side_in_parent(&self, parent: NodeId, child: NodeId) -> Result<Side> {
        self.node(parent)?.side_of(child).ok_or_else(|| {
            Error::Corruption(format!("node {} is not a child of {}", child, parent))
        })
    }

    /// Walk down from `start` to the node the new prefix key diverges at
    ///
    /// Returns that node and the number of bits the new key shares with it.
    fn find_split_point(&self, start: NodeId, prefix_key: &Hash) -> Result<(NodeId, usize)> {
        let mut current = start;
        loop {
            let node = self.node(current)?;
            let common = common_prefix_bits(&node.prefix_key, prefix_key);
            let (left, right) = match &node.kind {
                NodeKind::Leaf { .. } => return Ok((current, common)),
                NodeKind::Internal { prefix_len, .. } if common < *prefix_len => {
                    return Ok((current, common))
                }
                NodeKind::Internal {
                    left: Some(left),
                    right: Some(right),
                    ..
                } => (*left, *right),
                NodeKind::Internal { .. } => {
                    return Err(Error::Corruption(format!(
                        "internal node {} is missing a child",
                        current
                    )))
                }
            };

            let left_common = common_prefix_bits(&self.node(left)?.prefix_key, prefix_key);
            let right_common = common_prefix_bits(&self.node(right)?.prefix_key, prefix_key);
            current = match left_common.cmp(&right_common) {
                std::cmp::Ordering::Greater => left,
                std::cmp::Ordering::Less => right,
                std::cmp::Ordering::Equal => {
                    return Err(Error::Corruption(format!(
                        "ambiguous branch at node {}: both children share {} bits",
                        current, left_common
                    )))
                }
            };
        }
    }

    /// Put a new internal node where `target` was, with `target` and `leaf`
    /// as its children ordered by prefix key
    fn split(&mut self, target: NodeId, leaf: NodeId, common: usize) -> Result<()> {
        let parent = self.parent_of(target)?;
        let side = self.side_in_parent(parent, target)?;

        let (target_key, target_hash) = {
            let node = self.node(target)?;
            (node.prefix_key, node.hash)
        };
        let (leaf_key, leaf_hash) = {
            let node = self.node(leaf)?;
            (node.prefix_key, node.hash)
        };

        let (left, right, hash) = if target_key < leaf_key {
            let hash = self
                .algorithm
                .digest_children(Some(&target_hash), Some(&leaf_hash));
            (target, leaf, hash)
        } else {
            let hash = self
                .algorithm
                .digest_children(Some(&leaf_hash), Some(&target_hash));
            (leaf, target, hash)
        };

        let internal = self.alloc(Node::internal(
            Some(parent),
            hash,
            target_key,
            common,
            left,
            right,
        ));
        self.node_mut(parent)?.set_child(side, Some(internal));
        self.node_mut(target)?.parent = Some(internal);
        self.node_mut(leaf)?.parent = Some(internal);

        self.rehash_from(parent)
    }

    /// Hash a node from its content (leaf) or its children's stored hashes
    fn compute_hash(&self, id: NodeId) -> Result<Hash> {
        match &self.node(id)?.kind {
            NodeKind::Leaf { content } => Ok(content.calculate_hash(self.algorithm)),
            NodeKind::Internal { left, right, .. } => {
                let left = match left {
                    Some(child) => Some(self.node(*child)?.hash),
                    None => None,
                };
                let right = match right {
                    Some(child) => Some(self.node(*child)?.hash),
                    None => None,
                };
                Ok(self.algorithm.digest_children(left.as_ref(), right.as_ref()))
            }
        }
    }

    /// Recompute hashes from `start` up to and including the root
    fn rehash_from(&mut self, start: NodeId) -> Result<()> {
        let mut current = Some(start);
        while let Some(id) = current {
            let hash = self.compute_hash(id)?;
            let node = self.node_mut(id)?;
            node.hash = hash;
            current = node.parent;
        }
        Ok(())
    }

    fn fmt_node(
        &self,
        f: &mut fmt::Formatter<'_>,
        id: NodeId,
        prefix: &str,
        is_tail: bool,
    ) -> fmt::Result {
        let node = self.node(id).map_err(|_| fmt::Error)?;
        let branch = if is_tail { "└── " } else { "├── " };
        match &node.kind {
            NodeKind::Leaf { content } => writeln!(
                f,
                "{}{}Leaf: key: {}, value: {}",
                prefix,
                branch,
                content.key,
                hex::encode(&content.value)
            )?,
            NodeKind::Internal { .. } if id == ROOT => {
                writeln!(f, "{}{}Root: {}", prefix, branch, node.hash)?
            }
            NodeKind::Internal { prefix_len, .. } => writeln!(
                f,
                "{}{}Node: {} (prefix bits: {})",
                prefix, branch, node.hash, prefix_len
            )?,
        }

        let child_prefix = format!("{}{}", prefix, if is_tail { "    " } else { "│   " });
        if let Some(left) = node.child(Side::Left) {
            self.fmt_node(f, left, &child_prefix, node.child(Side::Right).is_none())?;
        }
        if let Some(right) = node.child(Side::Right) {
            self.fmt_node(f, right, &child_prefix, true)?;
        }
        Ok(())
    }
}

impl fmt::Display for MerkleTrie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, ROOT, "", true)
    }
}

impl fmt::Debug for MerkleTrie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerkleTrie")
            .field("algorithm", &self.algorithm)
            .field("root", &self.root_hash())
            .field("len", &self.len())
            .finish()
    }
}
