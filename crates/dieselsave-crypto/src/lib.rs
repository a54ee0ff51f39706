//! Cryptographic primitives for Diesel-engine save files
//!
//! This crate provides the two low-level transforms the save format is built
//! on: the whole-file stream obfuscation and the two-level MD5 digest scheme
//! that authenticates the tree payload and the assembled file.
//!
//! # Components
//!
//! - **Obfuscation**: [`DieselCipher`], a length- and position-keyed XOR
//!   transform that is its own inverse for a fixed buffer length
//! - **Digests**: [`TreeDigest`] over the serialized tree payload, and
//!   [`FileDigest`] over the masked plaintext of the assembled file
//!
//! # Examples
//!
//! ## Round-tripping the obfuscation
//!
//! ```
//! use dieselsave_crypto::DieselCipher;
//!
//! let raw = b"save file contents";
//! let encoded = DieselCipher::encode(raw);
//! assert_eq!(DieselCipher::decode(&encoded), raw);
//! ```
//!
//! ## Digesting a payload
//!
//! ```
//! use dieselsave_crypto::TreeDigest;
//!
//! let digest = TreeDigest::from_data(b"\x07\x00\x00\x00\x00");
//! println!("tree digest: {digest}");
//! ```

#![warn(missing_docs)]

pub mod digest;
pub mod stream;

pub use digest::{FileDigest, TreeDigest};
pub use stream::DieselCipher;
