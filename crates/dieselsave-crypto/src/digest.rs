//! MD5 digests for the tree payload and the assembled save file
//!
//! The save format carries two 16-byte digests: one over the raw serialized
//! tree payload, and one over the whole assembled plaintext (excluding the
//! digest itself) after a masking pre-transform. Both are plain MD5; only
//! the pre-transform differs.

use md5::{Digest, Md5};
use std::fmt;

/// Mask table applied to the plaintext before the whole-file digest.
const FILE_MASK: [u8; 4] = [0x1A, 0x1F, 0x32, 0x2C];

fn md5_bytes(data: &[u8]) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&result);
    bytes
}

/// Masking pre-transform for the whole-file digest.
///
/// Byte `i` is replaced by `i mod 7` when `(byte + FILE_MASK[i mod 4])` is
/// odd, otherwise left unchanged.
fn mask(data: &[u8]) -> Vec<u8> {
    data.iter()
        .enumerate()
        .map(|(i, &byte)| {
            if byte.wrapping_add(FILE_MASK[i % 4]) & 1 != 0 {
                (i % 7) as u8
            } else {
                byte
            }
        })
        .collect()
}

/// Digest over the serialized tree payload (plain MD5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeDigest([u8; 16]);

impl TreeDigest {
    /// Create a tree digest from raw bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Compute the digest of a serialized tree payload.
    pub fn from_data(payload: &[u8]) -> Self {
        Self(md5_bytes(payload))
    }

    /// Parse a tree digest from a hex string.
    pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(hex, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TreeDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Digest over the assembled plaintext file (masked MD5).
///
/// Covers everything in the plaintext up to but excluding the digest itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileDigest([u8; 16]);

impl FileDigest {
    /// Create a file digest from raw bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Compute the digest of an assembled plaintext (masking pre-transform,
    /// then MD5).
    pub fn from_plaintext(plaintext: &[u8]) -> Self {
        Self(md5_bytes(&mask(plaintext)))
    }

    /// Parse a file digest from a hex string.
    pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(hex, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for FileDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_digest_known_vector() {
        let digest = TreeDigest::from_data(b"Hello, World!");
        assert_eq!(digest.to_hex(), "65a8e27d8879283831b664bd8b7f0ad4");
    }

    #[test]
    fn test_file_digest_known_vector() {
        // Masked-MD5 vector generated with the reference implementation.
        let digest = FileDigest::from_plaintext(b"Hello, World!");
        assert_eq!(digest.to_hex(), "3770833e954b9ce0326e574a9aa9ddb5");
    }

    #[test]
    fn test_file_digest_empty() {
        // The mask of an empty buffer is empty, so this is MD5 of nothing.
        let digest = FileDigest::from_plaintext(b"");
        assert_eq!(digest.to_hex(), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_mask_known_vector() {
        assert_eq!(hex::encode(mask(b"Hello, World!")), "48656c6c0405200001026c6405");
    }

    #[test]
    fn test_tree_digest_sensitivity() {
        let payload = b"\x07\x01\x00\x00\x00\x01a\x00\x03".to_vec();
        let base = TreeDigest::from_data(&payload);
        for i in 0..payload.len() {
            let mut flipped = payload.clone();
            flipped[i] ^= 0x01;
            assert_ne!(
                base,
                TreeDigest::from_data(&flipped),
                "digest unchanged after flipping byte {i}"
            );
        }
    }

    #[test]
    fn test_digests_are_deterministic() {
        let data = b"deterministic input";
        assert_eq!(TreeDigest::from_data(data), TreeDigest::from_data(data));
        assert_eq!(
            FileDigest::from_plaintext(data),
            FileDigest::from_plaintext(data)
        );
    }

    #[test]
    fn test_hex_round_trip() {
        let original = TreeDigest::from_bytes([
            0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66,
            0x77, 0x88,
        ]);
        let restored = TreeDigest::from_hex(&original.to_hex()).expect("valid hex");
        assert_eq!(original, restored);
    }
}
