//! The deposit accumulator: a fixed-depth, append-only Poseidon Merkle tree
//!
//! Insertion uses the filled-subtree optimization: the tree keeps one hash
//! per level, the root of the most recently completed left sibling, and each
//! insert recomputes only the spine from the new leaf to the root. The batch
//! construction and opening builder below are claimant-side tooling; the
//! ledger itself only ever runs the incremental form

use circuit_types::{
    Scalar,
    merkle::{MerkleOpening, MerkleRoot, hash_merkle_level},
};
use constants::MERKLE_HEIGHT;
use lazy_static::lazy_static;
use thiserror::Error;

lazy_static! {
    /// The hash of an all-empty subtree at each height
    ///
    /// Index 0 is the empty leaf; index `MERKLE_HEIGHT` is the root of an
    /// empty tree
    static ref ZERO_HASHES: [Scalar; MERKLE_HEIGHT + 1] = {
        let mut hashes = [Scalar::zero(); MERKLE_HEIGHT + 1];
        for level in 1..=MERKLE_HEIGHT {
            hashes[level] = hash_merkle_level(hashes[level - 1], hashes[level - 1]);
        }
        hashes
    };
}

/// The hash of an all-empty subtree at the given height
///
/// `level` must be at most `MERKLE_HEIGHT`
pub fn zero_hash(level: usize) -> Scalar {
    ZERO_HASHES[level]
}

/// The errors the accumulator surfaces
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AccumulatorError {
    /// The tree has no leaf slots remaining
    #[error("the accumulator is full; no leaf slots remain")]
    TreeFull,
}

/// The append-only deposit accumulator
#[derive(Clone, Debug)]
pub struct DepositAccumulator {
    /// The retained left sibling hash at each level
    filled: [Scalar; MERKLE_HEIGHT],
    /// The current root
    root: MerkleRoot,
    /// The index the next leaf will occupy
    next_index: u64,
}

impl Default for DepositAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl DepositAccumulator {
    /// The maximum number of leaves the tree can hold
    pub const CAPACITY: u64 = 1 << MERKLE_HEIGHT;

    /// Create an empty accumulator; its root is the empty-tree hash
    pub fn new() -> Self {
        Self {
            filled: [Scalar::zero(); MERKLE_HEIGHT],
            root: zero_hash(MERKLE_HEIGHT),
            next_index: 0,
        }
    }

    /// Append a leaf, returning the new root
    pub fn insert(&mut self, leaf: Scalar) -> Result<MerkleRoot, AccumulatorError> {
        if self.next_index >= Self::CAPACITY {
            return Err(AccumulatorError::TreeFull);
        }

        let mut current = leaf;
        let mut index = self.next_index;
        for level in 0..MERKLE_HEIGHT {
            if index & 1 == 0 {
                // First child of a fresh subtree: retain it for the next
                // insert and pad the spine with the empty sibling
                self.filled[level] = current;
                current = hash_merkle_level(current, zero_hash(level));
            } else {
                current = hash_merkle_level(self.filled[level], current);
            }

            index >>= 1;
        }

        self.root = current;
        self.next_index += 1;
        Ok(self.root)
    }

    /// The current root
    pub fn root(&self) -> MerkleRoot {
        self.root
    }

    /// The number of leaves inserted so far
    pub fn leaf_count(&self) -> u64 {
        self.next_index
    }
}

// -----------------------
// | Claimant-Side Tools |
// -----------------------

/// Compute the root of the tree holding exactly `leaves`, zero-padded
///
/// A bottom-up fold over full levels; cross-checks the incremental form in
/// tests and gives claimants an offline root computation
pub fn compute_root_from_leaves(leaves: &[Scalar]) -> MerkleRoot {
    debug_assert!(leaves.len() as u64 <= DepositAccumulator::CAPACITY);

    let mut nodes: Vec<Scalar> = leaves.to_vec();
    for level in 0..MERKLE_HEIGHT {
        nodes = fold_level(&nodes, level);
    }

    nodes[0]
}

/// Build the sibling path opening `leaf_index` within the tree over `leaves`
///
/// Returns `None` when the index is out of range. The ledger never
/// materializes openings; claimants build them from their own view of the
/// leaf sequence
pub fn build_opening(leaves: &[Scalar], leaf_index: u64) -> Option<MerkleOpening> {
    let index = usize::try_from(leaf_index).ok()?;
    if index >= leaves.len() {
        return None;
    }

    let mut elems = [Scalar::zero(); MERKLE_HEIGHT];
    let mut nodes: Vec<Scalar> = leaves.to_vec();
    let mut node_index = index;
    for (level, elem) in elems.iter_mut().enumerate() {
        let sibling_index = node_index ^ 1;
        *elem = nodes.get(sibling_index).copied().unwrap_or_else(|| zero_hash(level));

        nodes = fold_level(&nodes, level);
        node_index >>= 1;
    }

    Some(MerkleOpening { elems, leaf_index })
}

/// Hash one level's nodes pairwise into the level above, zero-padding the
/// odd tail
fn fold_level(nodes: &[Scalar], level: usize) -> Vec<Scalar> {
    if nodes.is_empty() {
        return vec![zero_hash(level + 1)];
    }

    let mut next = Vec::with_capacity(nodes.len().div_ceil(2));
    for pair in nodes.chunks(2) {
        let left = pair[0];
        let right = if pair.len() == 2 { pair[1] } else { zero_hash(level) };
        next.push(hash_merkle_level(left, right));
    }

    next
}

#[cfg(test)]
mod test {
    use circuit_types::Scalar;
    use constants::MERKLE_HEIGHT;
    use rand::thread_rng;

    use super::{
        AccumulatorError, DepositAccumulator, build_opening, compute_root_from_leaves, zero_hash,
    };

    /// Sample a random leaf sequence of the given length
    fn random_leaves(n: usize) -> Vec<Scalar> {
        let mut rng = thread_rng();
        (0..n).map(|_| Scalar::random(&mut rng)).collect()
    }

    /// Tests the zero hash table's base case and the empty tree's root
    #[test]
    fn test_empty_tree_root() {
        assert_eq!(zero_hash(0), Scalar::zero());
        assert_eq!(DepositAccumulator::new().root(), zero_hash(MERKLE_HEIGHT));
        assert_eq!(compute_root_from_leaves(&[]), zero_hash(MERKLE_HEIGHT));
    }

    /// Tests that incremental insertion and batch construction agree on the
    /// root at every prefix length
    #[test]
    fn test_incremental_matches_batch() {
        let leaves = random_leaves(7);
        let mut accumulator = DepositAccumulator::new();

        for (i, leaf) in leaves.iter().enumerate() {
            let root = accumulator.insert(*leaf).unwrap();
            assert_eq!(root, compute_root_from_leaves(&leaves[..=i]));
        }

        assert_eq!(accumulator.leaf_count(), 7);
    }

    /// Tests that every opening of a populated tree folds to the root
    #[test]
    fn test_openings_fold_to_root() {
        let leaves = random_leaves(6);
        let mut accumulator = DepositAccumulator::new();
        for leaf in leaves.iter() {
            accumulator.insert(*leaf).unwrap();
        }

        for (i, leaf) in leaves.iter().enumerate() {
            let opening = build_opening(&leaves, i as u64).unwrap();
            assert_eq!(opening.compute_root(*leaf), accumulator.root());
        }

        assert!(build_opening(&leaves, leaves.len() as u64).is_none());
    }

    /// Tests the capacity limit
    #[test]
    fn test_tree_full() {
        let mut accumulator = DepositAccumulator::new();
        accumulator.next_index = DepositAccumulator::CAPACITY;

        assert_eq!(
            accumulator.insert(Scalar::from(1u8)),
            Err(AccumulatorError::TreeFull),
        );
    }
}
