use sumeragi::{
    merkle_tree::{merkle_root, MerkleTree, MerkleTreeError},
    types::{
        crypto_primitives::{hash, hash_pair},
        data_types::CryptoHash,
    },
};

#[test]
fn root_matches_reference_test() {
    let items = items(40);

    for leaves in [2, 4, 8] {
        let mut tree = MerkleTree::new(leaves, 64).unwrap();
        assert_eq!(tree.root(), None);
        for pushed in 1..=items.len() {
            tree.push(items[pushed - 1]);
            assert_eq!(
                tree.root(),
                reference_root(&items[..pushed], leaves),
                "leaves: {}, pushed: {}",
                leaves,
                pushed
            );
        }
    }
}

#[test]
fn leaves_are_rounded_up_test() {
    assert_eq!(MerkleTree::new(0, 1).unwrap().leaves(), 2);
    assert_eq!(MerkleTree::new(1, 1).unwrap().leaves(), 2);
    assert_eq!(MerkleTree::new(5, 1).unwrap().leaves(), 8);
    assert_eq!(MerkleTree::new(16, 1).unwrap().leaves(), 16);
    assert!(matches!(
        MerkleTree::new(4, 0),
        Err(MerkleTreeError::ZeroGenerations)
    ));
}

#[test]
fn rollback_restores_earlier_roots_test() {
    let items = items(10);

    // 4 leaves per generation and 2 retained generations. After 10 pushes the tree spans three
    // generations: [0..4], [root, 4..7], [root, 7..10].
    let mut roots = Vec::new();
    {
        let mut tree = MerkleTree::new(4, 2).unwrap();
        for item in &items {
            tree.push(*item);
            roots.push(tree.root());
        }
        assert_eq!(tree.max_rollback(), 9);
    }

    for steps in 0..=9 {
        let mut tree = MerkleTree::new(4, 2).unwrap();
        for item in &items {
            tree.push(*item);
        }
        tree.rollback(steps).unwrap();
        assert_eq!(tree.root(), roots[items.len() - steps - 1], "steps: {}", steps);
        assert_eq!(tree.max_rollback(), 9 - steps);

        // Pushing after a rollback continues exactly as if the undone pushes never happened.
        let replacement = hash(b"replacement");
        tree.push(replacement);
        let mut expected: Vec<CryptoHash> = items[..items.len() - steps].to_vec();
        expected.push(replacement);
        assert_eq!(tree.root(), reference_root(&expected, 4), "steps: {}", steps);
    }
}

#[test]
fn rollback_beyond_limit_changes_nothing_test() {
    // With a single retained generation, only the current and the previous generation are kept.
    let mut tree = MerkleTree::new(4, 1).unwrap();
    for item in items(10) {
        tree.push(item);
    }
    let root = tree.root();
    assert_eq!(tree.max_rollback(), 6);

    assert_eq!(
        tree.rollback(7),
        Err(MerkleTreeError::RollbackBeyondLimit {
            requested: 7,
            max_rollback: 6
        })
    );
    assert_eq!(tree.root(), root);
    assert_eq!(tree.max_rollback(), 6);

    tree.rollback(6).unwrap();
    assert_eq!(tree.root(), reference_root(&items(4), 4));
    assert_eq!(tree.max_rollback(), 0);
}

#[test]
fn merkle_root_of_sequences_test() {
    let items = items(3);

    assert_eq!(merkle_root(&[]), CryptoHash::zero());
    assert_eq!(merkle_root(&items[..1]), items[0]);
    assert_eq!(merkle_root(&items[..2]), hash_pair(&items[0], &items[1]));
    assert_eq!(
        merkle_root(&items),
        hash_pair(&hash_pair(&items[0], &items[1]), &items[2])
    );
}

fn items(n: u64) -> Vec<CryptoHash> {
    (0..n).map(|i| hash(&i.to_le_bytes())).collect()
}

// Root of a complete binary tree of `width` leaves whose first `items.len()` leaves are filled. A node
// whose right subtree is empty takes the value of its left subtree.
fn subtree(items: &[CryptoHash], width: usize) -> CryptoHash {
    if width == 1 {
        return items[0];
    }
    let half = width / 2;
    if items.len() <= half {
        subtree(items, half)
    } else {
        hash_pair(&subtree(&items[..half], half), &subtree(&items[half..], half))
    }
}

// Root of a tree with `leaves` leaves per generation after pushing `items`, where every generation after
// the first starts with the root of the one before.
fn reference_root(items: &[CryptoHash], leaves: usize) -> Option<CryptoHash> {
    if items.is_empty() {
        return None;
    }
    let mut carry: Option<CryptoHash> = None;
    let mut rest = items;
    loop {
        let mut generation: Vec<CryptoHash> = carry.into_iter().collect();
        let take = (leaves - generation.len()).min(rest.len());
        generation.extend_from_slice(&rest[..take]);
        rest = &rest[take..];
        let root = subtree(&generation, leaves);
        if rest.is_empty() {
            return Some(root);
        }
        carry = Some(root);
    }
}
