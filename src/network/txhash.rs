//! Non-consensus hashing helpers for relay log lines
//!
//! The engine treats headers and transactions as opaque bytes; these helpers
//! double-SHA256 them so log lines can still name what moved. They do NOT
//! replace consensus hashing.

use sha2::{Digest, Sha256};

/// Double-SHA256 of opaque payload bytes.
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// Hex id of a header or transaction, byte-reversed the way explorers print
/// block and transaction hashes.
pub fn payload_id(data: &[u8]) -> String {
    let mut hash = double_sha256(data);
    hash.reverse();
    hex::encode(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_sha256_empty() {
        // sha256(sha256(""))
        assert_eq!(
            hex::encode(double_sha256(b"")),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
    }

    #[test]
    fn test_payload_id_is_reversed() {
        let forward = hex::encode(double_sha256(b"abc"));
        let id = payload_id(b"abc");
        let re_reversed: String = id
            .as_bytes()
            .chunks(2)
            .rev()
            .map(|pair| std::str::from_utf8(pair).unwrap())
            .collect();
        assert_eq!(forward, re_reversed);
    }
}
