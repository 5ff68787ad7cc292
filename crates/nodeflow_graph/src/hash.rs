// SPDX-License-Identifier: MIT OR Apache-2.0
//! Content digests used to name generated datasets.

/// Hex digest of a string payload.
pub fn digest_hex(payload: &str) -> String {
    blake3::hash(payload.as_bytes()).to_hex().to_string()
}

/// Dataset identifier the execution engine knows a result by: `_<hash>`.
pub fn dataset_ref(hash: &str) -> String {
    format!("_{hash}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_deterministic() {
        assert_eq!(digest_hex("abc"), digest_hex("abc"));
        assert_ne!(digest_hex("abc"), digest_hex("abd"));
        assert_eq!(digest_hex("").len(), 64);
    }

    #[test]
    fn test_dataset_ref() {
        assert_eq!(dataset_ref("ff00"), "_ff00");
    }
}
