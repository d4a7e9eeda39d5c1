//! Proof bundle types moved between the prover, the orchestrator, and the
//! ledger boundary
//!
//! The proof backend itself is an external collaborator; this module fixes
//! the shapes that cross its boundary. The `attest`/`check_attestation` pair
//! implements the embedded stand-in used by the local prover and the
//! embedded ledger: a binding tag over the circuit and its public signals,
//! issued only after native statement evaluation succeeds

use std::fmt::{self, Display, Formatter};

use duskpool_crypto::{Scalar, hash::compute_poseidon_hash};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as DeError};
use util::hex::{bytes_from_hex_string, bytes_to_hex_string};

/// Identifies the circuit a proof was generated for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitId {
    /// The order validity circuit: a revealed commitment is well-formed
    OrderValidity,
    /// The match validity circuit: crossing and settlement arithmetic
    MatchValidity,
    /// The deposit claim circuit: membership, denomination, and nullifier
    DepositClaim,
}

impl CircuitId {
    /// A field-element domain tag for the circuit, mixed into attestations
    fn domain_tag(&self) -> Scalar {
        match self {
            CircuitId::OrderValidity => Scalar::from(1u8),
            CircuitId::MatchValidity => Scalar::from(2u8),
            CircuitId::DepositClaim => Scalar::from(3u8),
        }
    }
}

impl Display for CircuitId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CircuitId::OrderValidity => write!(f, "order-validity"),
            CircuitId::MatchValidity => write!(f, "match-validity"),
            CircuitId::DepositClaim => write!(f, "deposit-claim"),
        }
    }
}

/// An opaque proof as returned by the proof backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proof(Vec<u8>);

impl Proof {
    /// Wrap raw proof bytes from a backend
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The raw proof bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Issue an attestation binding a circuit to its public signals
    ///
    /// Stand-in for a real proof in the embedded deployment; the issuer must
    /// have natively evaluated the statement first
    pub fn attest(circuit: CircuitId, public_signals: &[Scalar]) -> Self {
        Self(attestation_tag(circuit, public_signals).to_bytes_be())
    }

    /// Check an attestation against a circuit and its public signals
    pub fn check_attestation(&self, circuit: CircuitId, public_signals: &[Scalar]) -> bool {
        self.0 == attestation_tag(circuit, public_signals).to_bytes_be()
    }
}

/// The binding tag over a circuit's domain and public signals
fn attestation_tag(circuit: CircuitId, public_signals: &[Scalar]) -> Scalar {
    let mut preimage = Vec::with_capacity(public_signals.len() + 1);
    preimage.push(circuit.domain_tag());
    preimage.extend_from_slice(public_signals);
    compute_poseidon_hash(&preimage)
}

impl Serialize for Proof {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&bytes_to_hex_string(&self.0))
    }
}

impl<'de> Deserialize<'de> for Proof {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        bytes_from_hex_string(&hex).map(Proof).map_err(D::Error::custom)
    }
}

/// A proof together with the circuit and public signals it attests to
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofBundle {
    /// The circuit the proof was generated for
    pub circuit: CircuitId,
    /// The proof itself
    pub proof: Proof,
    /// The public signals the verifier checks the proof against
    pub public_signals: Vec<Scalar>,
}
