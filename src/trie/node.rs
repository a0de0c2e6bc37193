//! Trie node types

use crate::model::{Content, Hash};

/// Index of a node in the trie's arena
pub type NodeId = usize;

/// Which child slot of an internal node
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Side of the root a prefix key hangs under: high bit clear goes left
    pub fn of_prefix(prefix_key: &Hash) -> Side {
        if prefix_key.as_bytes()[0] < 128 {
            Side::Left
        } else {
            Side::Right
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// A node in the merkle trie
///
/// Parent and child links are arena indices, so unlinking a node only
/// clears a slot.
#[derive(Clone, Debug)]
pub struct Node {
    pub parent: Option<NodeId>,
    /// Leaf: the content hash. Internal: `H(left ++ right)`.
    pub hash: Hash,
    /// Leaf: `H(key)`. Internal: the prefix key of a leaf beneath it; only
    /// its first `prefix_len` bits are meaningful.
    pub prefix_key: Hash,
    pub kind: NodeKind,
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Leaf {
        content: Content,
    },
    Internal {
        left: Option<NodeId>,
        right: Option<NodeId>,
        /// Bits shared by every leaf under this node
        prefix_len: usize,
    },
}

impl Node {
    pub fn leaf(content: Content, hash: Hash, prefix_key: Hash) -> Self {
        Node {
            parent: None,
            hash,
            prefix_key,
            kind: NodeKind::Leaf { content },
        }
    }

    /// The synthetic root: no prefix, children chosen by the high bit
    pub fn root(hash: Hash) -> Self {
        Node {
            parent: None,
            hash,
            prefix_key: Hash::from_bytes([0u8; 32]),
            kind: NodeKind::Internal {
                left: None,
                right: None,
                prefix_len: 0,
            },
        }
    }

    pub fn internal(
        parent: Option<NodeId>,
        hash: Hash,
        prefix_key: Hash,
        prefix_len: usize,
        left: NodeId,
        right: NodeId,
    ) -> Self {
        Node {
            parent,
            hash,
            prefix_key,
            kind: NodeKind::Internal {
                left: Some(left),
                right: Some(right),
                prefix_len,
            },
        }
    }

    pub fn child(&self, side: Side) -> Option<NodeId> {
        match (&self.kind, side) {
            (NodeKind::Internal { left, .. }, Side::Left) => *left,
            (NodeKind::Internal { right, .. }, Side::Right) => *right,
            (NodeKind::Leaf { .. }, _) => None,
        }
    }

    /// Which side `child` occupies, if it is a child of this node
    pub fn side_of(&self, child: NodeId) -> Option<Side> {
        match &self.kind {
            NodeKind::Internal { left, .. } if *left == Some(child) => Some(Side::Left),
            NodeKind::Internal { right, .. } if *right == Some(child) => Some(Side::Right),
            _ => None,
        }
    }

    /// Point a child slot at `child`. No-op on a leaf.
    pub fn set_child(&mut self, side: Side, child: Option<NodeId>) {
        if let NodeKind::Internal { left, right, .. } = &mut self.kind {
            match side {
                Side::Left => *left = child,
                Side::Right => *right = child,
            }
        }
    }
}

/// Number of leading bits two digests share
pub fn common_prefix_bits(a: &Hash, b: &Hash) -> usize {
    for (i, (x, y)) in a.as_bytes().iter().zip(b.as_bytes().iter()).enumerate() {
        let xor = x ^ y;
        if xor != 0 {
            return i * 8 + xor.leading_zeros() as usize;
        }
    }
    a.as_bytes().len() * 8
}
