//! Defines system-wide constants for node execution

#![deny(unsafe_code)]
#![deny(clippy::missing_docs_in_private_items)]
#![deny(missing_docs)]

// -------------------------
// | System-Wide Constants |
// -------------------------

/// The height of the Merkle tree backing the deposit accumulator
///
/// Fixed at protocol-design time; a height of 20 admits just over one
/// million deposits before the tree fills
pub const MERKLE_HEIGHT: usize = 20;

/// The set of deposit amounts the accumulator accepts
///
/// Restricting deposits to a small set of denominations keeps every deposit
/// indistinguishable from the others in its anonymity set; arbitrary amounts
/// would leak information through the deposit's size
pub const ALLOWED_DENOMINATIONS: [u128; 4] = [1_000, 10_000, 100_000, 1_000_000];

/// The domain separation constant mixed into claim nullifier derivations
///
/// Keeps nullifier preimages disjoint from every other hash application in
/// the protocol
pub const NULLIFIER_DOMAIN_SEP: u64 = 0x6475736b_6e756c6c; // b"dusknull"

/// The number of scalars absorbed per permutation of the Poseidon sponge
pub const POSEIDON_RATE: usize = 2;

/// The capacity width of the Poseidon sponge
pub const POSEIDON_CAPACITY: usize = 1;

/// The number of full rounds in the Poseidon permutation
pub const POSEIDON_FULL_ROUNDS: usize = 8;

/// The number of partial rounds in the Poseidon permutation
pub const POSEIDON_PARTIAL_ROUNDS: usize = 56;

/// The s-box exponent of the Poseidon permutation
pub const POSEIDON_ALPHA: u64 = 5;

// ------------------------------------
// | System Specific Type Definitions |
// ------------------------------------

/// The scalar field all commitments and accumulator nodes live in
pub type ScalarField = ark_bn254::Fr;
