//! Helpers for converting values to and from hex strings

use num_bigint::BigUint;
use num_traits::Num;

/// Convert a byte array to a hex string
pub fn bytes_to_hex_string(bytes: &[u8]) -> String {
    let encoded = hex::encode(bytes);
    format!("0x{encoded}")
}

/// Convert a hex string to a byte array
pub fn bytes_from_hex_string(hex: &str) -> Result<Vec<u8>, String> {
    let hex = hex.strip_prefix("0x").unwrap_or(hex);
    hex::decode(hex).map_err(|e| format!("error deserializing bytes from hex string: {e}"))
}

/// A helper to serialize a BigUint to a hex string
pub fn biguint_to_hex_string(val: &BigUint) -> String {
    format!("0x{}", val.to_str_radix(16 /* radix */))
}

/// A helper to deserialize a BigUint from a hex string
pub fn biguint_from_hex_string(hex: &str) -> Result<BigUint, String> {
    // Deserialize as a string and remove "0x" if present
    let stripped = hex.strip_prefix("0x").unwrap_or(hex);
    BigUint::from_str_radix(stripped, 16 /* radix */)
        .map_err(|e| format!("error deserializing BigUint from hex string: {e}"))
}

#[cfg(test)]
mod test {
    use num_bigint::BigUint;
    use rand::{RngCore, thread_rng};

    use super::{
        biguint_from_hex_string, biguint_to_hex_string, bytes_from_hex_string, bytes_to_hex_string,
    };

    /// Tests that byte hex serialization round trips
    #[test]
    fn test_bytes_hex_round_trip() {
        let mut rng = thread_rng();
        let mut bytes = [0_u8; 32];
        rng.fill_bytes(&mut bytes);

        let hex = bytes_to_hex_string(&bytes);
        let recovered = bytes_from_hex_string(&hex).unwrap();
        assert_eq!(recovered, bytes.to_vec());
    }

    /// Tests that biguint hex serialization round trips, with and without a
    /// `0x` prefix
    #[test]
    fn test_biguint_hex_round_trip() {
        let mut rng = thread_rng();
        let val = BigUint::from(rng.next_u64());

        let hex = biguint_to_hex_string(&val);
        assert_eq!(biguint_from_hex_string(&hex).unwrap(), val);

        let unprefixed = hex.strip_prefix("0x").unwrap();
        assert_eq!(biguint_from_hex_string(unprefixed).unwrap(), val);
    }
}
