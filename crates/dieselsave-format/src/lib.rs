//! Parser and builder for obfuscated Diesel-engine save files
//!
//! Save files are a whole-file XOR obfuscation (see `dieselsave-crypto`)
//! wrapped around a small framed plaintext: opaque prologue/epilogue byte
//! ranges around a recursive, ordered, typed key/value tree, authenticated
//! by a tree-payload digest and a masked whole-file digest.
//!
//! # Components
//!
//! - [`SaveValue`] / [`SaveTree`]: the typed value language and its ordered
//!   tree, with symmetric parse/write operations
//! - [`SaveDocument`]: framing, digest verification/repair, and the
//!   load → mutate → regenerate → save lifecycle
//!
//! # Design
//!
//! - **Symmetric operations**: everything parsed can be rebuilt; an
//!   unmutated load/save round-trip is byte-identical
//! - **Self-healing digests**: stored digests that fail verification are
//!   recomputed and overwritten, never treated as fatal (reported through
//!   `tracing` only)
//! - **Order preservation**: tree key order participates in the serialized
//!   byte layout and is kept exactly
//!
//! # Examples
//!
//! ```
//! use dieselsave_format::{SaveTree, SaveValue};
//!
//! # fn main() -> Result<(), dieselsave_format::SerializeError> {
//! let mut tree = SaveTree::new();
//! tree.insert("user_id".into(), SaveValue::Text("76500000000000001".into()));
//! let payload = tree.to_bytes()?;
//! assert_eq!(payload[0], 0x07);
//! # Ok(())
//! # }
//! ```
//!
//! Loading and editing a file:
//!
//! ```rust,ignore
//! use dieselsave_format::{SaveDocument, SaveValue};
//!
//! let raw = std::fs::read("save098.sav")?;
//! let mut document = SaveDocument::load(&raw)?;
//! println!("account: {:?}", document.account_id());
//! document.set_field(&["user_id"], SaveValue::Text("76500000000000002".into()));
//! std::fs::write("save098.sav", document.save()?)?;
//! ```

#![warn(missing_docs)]

pub mod document;
pub mod error;
mod ioutils;
pub mod tree;
pub mod value;

pub use document::{SAVE_MAGIC, SaveDocument, USER_ID_KEY};
pub use error::{FormatError, SerializeError};
pub use tree::SaveTree;
pub use value::SaveValue;
