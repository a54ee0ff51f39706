//! Error types for loading and serializing save files

use thiserror::Error;

/// Errors raised while decoding a save file.
///
/// Every variant is fatal to the load operation; no document is produced.
/// Digest mismatches are deliberately absent here: stored digests that do
/// not match are repaired, not rejected.
#[derive(Debug, Error)]
pub enum FormatError {
    /// A framing magic marker did not match.
    #[error("invalid save magic at offset {offset:#x}: expected [0A 00 00 00], got {found:02X?}")]
    InvalidMagic {
        /// Plaintext offset of the marker
        offset: usize,
        /// The four bytes actually present
        found: [u8; 4],
    },

    /// The tree length field disagrees with the parsed tree size.
    #[error("tree length field mismatch: header says {expected} bytes, parsed tree is {actual}")]
    TreeLengthMismatch {
        /// Value of the on-disk length field
        expected: u32,
        /// Length recomputed from the parsed tree
        actual: u32,
    },

    /// An unrecognized type tag was encountered while parsing the tree.
    #[error("unknown value tag {tag:#04x} at offset {offset:#x}")]
    UnknownTag {
        /// The unrecognized tag byte
        tag: u8,
        /// Plaintext offset of the tag byte
        offset: u64,
    },

    /// A tree entry key decoded to a nested tree, which cannot key a map.
    #[error("tree key at offset {offset:#x} is a nested tree, expected a scalar")]
    InvalidKey {
        /// Plaintext offset of the key's tag byte
        offset: u64,
    },

    /// The plaintext ended before a framing field was complete.
    #[error("save file truncated: need {needed} bytes at offset {offset:#x}, {available} available")]
    Truncated {
        /// Plaintext offset of the incomplete field
        offset: usize,
        /// Bytes the field requires
        needed: usize,
        /// Bytes remaining in the buffer
        available: usize,
    },

    /// No account id is cached on the document.
    #[error("no account id present in the loaded save")]
    MissingAccountId,

    /// I/O error while reading the plaintext.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while re-serializing the tree.
///
/// Fatal to the current save/regenerate call only; the document's prior
/// in-memory state remains usable.
#[derive(Debug, Error)]
pub enum SerializeError {
    /// A text value cannot be NUL-terminated because it contains a NUL.
    #[error("text value contains an interior NUL byte: {text:?}")]
    InteriorNul {
        /// The offending string
        text: String,
    },

    /// I/O error while writing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
