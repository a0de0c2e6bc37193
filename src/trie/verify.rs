//! Tree-independent verification of merkle paths

use crate::model::{Content, Hash, HashAlgorithm, MerklePathEntry};

/// Recompute a root from `content` and its path, and compare it with
/// `expected_root`
///
/// Needs no access to the trie that produced the path: a remote party holding
/// a trusted root can run this on a proof obtained from anyone. Entries are
/// replayed leaf to root. The algorithm must match the producing trie's.
pub fn verify_merkle_path(
    algorithm: HashAlgorithm,
    content: &Content,
    path: &[MerklePathEntry],
    expected_root: &Hash,
) -> bool {
    let mut acc = content.calculate_hash(algorithm);
    for entry in path {
        acc = if entry.is_left_sibling {
            algorithm.digest_many(&[acc.as_ref(), entry.sibling_bytes()])
        } else {
            algorithm.digest_many(&[entry.sibling_bytes(), acc.as_ref()])
        };
    }
    acc == *expected_root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::MerkleTrie;

    fn trie_with(keys: &[(&str, &str)]) -> MerkleTrie {
        MerkleTrie::from_contents(
            HashAlgorithm::Sha256,
            keys.iter().map(|(k, v)| Content::new(*k, *v)),
        )
        .unwrap()
    }

    #[test]
    fn test_hand_built_path() {
        let alg = HashAlgorithm::Sha256;
        let c = Content::new("k", "v");
        let sibling = alg.digest(b"sibling");
        let leaf = c.calculate_hash(alg);

        let root = alg.digest_many(&[leaf.as_ref(), sibling.as_ref()]);
        let path = vec![MerklePathEntry::new(Some(sibling), true)];
        assert!(verify_merkle_path(alg, &c, &path, &root));

        // flipping the side changes the operand order
        let flipped = vec![MerklePathEntry::new(Some(sibling), false)];
        assert!(!verify_merkle_path(alg, &c, &flipped, &root));
    }

    #[test]
    fn test_empty_sibling_contributes_nothing() {
        let alg = HashAlgorithm::Sha256;
        let c = Content::new("k", "v");
        let root = alg.digest(c.calculate_hash(alg).as_ref());
        let path = vec![MerklePathEntry::new(None, true)];
        assert!(verify_merkle_path(alg, &c, &path, &root));
    }

    #[test]
    fn test_tampered_sibling_rejected() {
        let trie = trie_with(&[("a", "1"), ("b", "2"), ("c", "3"), ("d", "4"), ("e", "5")]);
        let c = Content::new("c", "3");
        let root = trie.root_hash();
        let path = trie.merkle_path(&c).unwrap();
        assert!(verify_merkle_path(HashAlgorithm::Sha256, &c, &path, &root));

        for i in 0..path.len() {
            let mut tampered = path.clone();
            let mut bytes = match tampered[i].sibling_hash {
                Some(h) => *h.as_bytes(),
                None => continue,
            };
            bytes[0] ^= 0x01;
            tampered[i].sibling_hash = Some(Hash::from_bytes(bytes));
            assert!(!verify_merkle_path(HashAlgorithm::Sha256, &c, &tampered, &root));
        }
    }

    #[test]
    fn test_wrong_value_rejected() {
        let trie = trie_with(&[("a", "1"), ("b", "2")]);
        let path = trie.merkle_path(&Content::new("a", "1")).unwrap();
        assert!(!verify_merkle_path(
            HashAlgorithm::Sha256,
            &Content::new("a", "X"),
            &path,
            &trie.root_hash()
        ));
    }
}
