//! Accumulator opening types shared by the claim circuit and the ledger

use constants::MERKLE_HEIGHT;
use duskpool_crypto::{Scalar, hash::compute_poseidon_hash};
use serde::{Deserialize, Serialize};

/// A root of the deposit accumulator
pub type MerkleRoot = Scalar;

/// Hash two children into their parent node
pub fn hash_merkle_level(left: Scalar, right: Scalar) -> Scalar {
    compute_poseidon_hash(&[left, right])
}

/// A sibling path proving a leaf's membership under a root
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleOpening {
    /// The sibling node at each level, leaf level first
    pub elems: [Scalar; MERKLE_HEIGHT],
    /// The index of the leaf the path opens
    pub leaf_index: u64,
}

impl MerkleOpening {
    /// Fold the opening over a leaf to produce the root it commits to
    ///
    /// At each level the bit of `leaf_index` selects whether the running
    /// node is the left or right child
    pub fn compute_root(&self, leaf: Scalar) -> MerkleRoot {
        let mut current = leaf;
        for (level, sibling) in self.elems.iter().enumerate() {
            let leaf_is_right = (self.leaf_index >> level) & 1 == 1;
            current = if leaf_is_right {
                hash_merkle_level(*sibling, current)
            } else {
                hash_merkle_level(current, *sibling)
            };
        }

        current
    }
}

#[cfg(test)]
mod test {
    use constants::MERKLE_HEIGHT;
    use duskpool_crypto::Scalar;
    use rand::thread_rng;

    use super::{MerkleOpening, hash_merkle_level};

    /// Tests a hand-rolled two-leaf opening at the bottom of the tree
    #[test]
    fn test_compute_root_sibling_order() {
        let mut rng = thread_rng();
        let leaf = Scalar::random(&mut rng);
        let sibling = Scalar::random(&mut rng);
        let upper = core::array::from_fn::<_, { MERKLE_HEIGHT - 1 }, _>(|_| {
            Scalar::random(&mut rng)
        });

        let mut elems = [Scalar::zero(); MERKLE_HEIGHT];
        elems[0] = sibling;
        elems[1..].copy_from_slice(&upper);

        // Leaf at an even index hashes on the left, odd on the right
        let left_opening = MerkleOpening { elems, leaf_index: 0 };
        let right_opening = MerkleOpening { elems, leaf_index: 1 };

        let mut expected_left = hash_merkle_level(leaf, sibling);
        let mut expected_right = hash_merkle_level(sibling, leaf);
        for sib in upper.iter() {
            expected_left = hash_merkle_level(expected_left, *sib);
            expected_right = hash_merkle_level(expected_right, *sib);
        }

        assert_eq!(left_opening.compute_root(leaf), expected_left);
        assert_eq!(right_opening.compute_root(leaf), expected_right);
    }
}
