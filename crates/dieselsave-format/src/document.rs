//! Save document framing and orchestration
//!
//! A [`SaveDocument`] owns everything between the obfuscated bytes on disk
//! and the parsed tree: the opaque prologue/epilogue ranges, the serialized
//! tree payload, and both digests. Plaintext layout (all integers
//! little-endian):
//!
//! | field           | size            | content                           |
//! |-----------------|-----------------|-----------------------------------|
//! | magic           | 4               | `0A 00 00 00`                     |
//! | prologue length | 4               | u32                               |
//! | prologue        | prologue length | opaque, preserved verbatim        |
//! | tree length     | 4               | u32, parsed tree bytes + `0x15`   |
//! | magic           | 4               | `0A 00 00 00`                     |
//! | tree payload    | variable        | tag `0x07` + count + entries      |
//! | tree digest     | 16              | MD5 of the tree payload           |
//! | epilogue        | variable        | opaque, preserved verbatim        |
//! | file digest     | 16              | masked MD5 of everything above    |

use crate::error::{FormatError, SerializeError};
use crate::tree::SaveTree;
use crate::value::SaveValue;
use dieselsave_crypto::{DieselCipher, FileDigest, TreeDigest};
use std::io::Cursor;
use tracing::{debug, warn};

/// Magic marker appearing twice in the plaintext framing.
pub const SAVE_MAGIC: [u8; 4] = [0x0A, 0x00, 0x00, 0x00];

/// Reserved tree key holding the account id of the save's owner.
pub const USER_ID_KEY: &str = "user_id";

/// Bias between the parsed tree size (count field + entries, excluding the
/// root tag) and the on-disk tree length field.
const TREE_LENGTH_BIAS: u32 = 0x15;

const DIGEST_LEN: usize = 16;

/// A decoded save file: parsed tree plus the opaque framing needed to
/// write it back byte-for-byte.
///
/// Constructed only by [`load`](Self::load); the tree and the cached
/// account id are the only caller-mutable state.
#[derive(Debug, Clone)]
pub struct SaveDocument {
    prologue: Vec<u8>,
    tree: SaveTree,
    /// Exact serialized tree bytes currently believed valid: as read from
    /// disk until `regenerate` replaces them from the tree.
    payload: Vec<u8>,
    tree_digest: TreeDigest,
    epilogue: Vec<u8>,
    file_digest: FileDigest,
    account_id: Option<String>,
}

impl SaveDocument {
    /// De-obfuscate and parse a raw save file.
    ///
    /// Validates both magic markers and the tree length field, parses the
    /// tree, and verifies both digests. Stored digests that do not match
    /// the recomputed values are overwritten (the format self-heals stale
    /// digests); the discrepancy is reported through `tracing::warn!` only.
    ///
    /// # Errors
    ///
    /// [`FormatError`] when the framing or the tree is malformed. No
    /// document is produced on failure.
    pub fn load(raw: &[u8]) -> Result<Self, FormatError> {
        let plaintext = DieselCipher::decode(raw);
        Self::from_plaintext(&plaintext)
    }

    fn from_plaintext(plaintext: &[u8]) -> Result<Self, FormatError> {
        let magic = take_array::<4>(plaintext, 0)?;
        if magic != SAVE_MAGIC {
            return Err(FormatError::InvalidMagic {
                offset: 0,
                found: magic,
            });
        }

        let prologue_len = take_u32(plaintext, 4)? as usize;
        let prologue_end = 8 + prologue_len;
        let prologue = take(plaintext, 8, prologue_len)?.to_vec();

        let tree_length_field = take_u32(plaintext, prologue_end)?;
        let magic = take_array::<4>(plaintext, prologue_end + 4)?;
        if magic != SAVE_MAGIC {
            return Err(FormatError::InvalidMagic {
                offset: prologue_end + 4,
                found: magic,
            });
        }

        // Parse the tree from the root tag onwards; cursor offsets in
        // errors are absolute plaintext offsets.
        let tree_start = prologue_end + 8;
        take(plaintext, tree_start, 1)?;
        let mut cursor = Cursor::new(plaintext);
        cursor.set_position(tree_start as u64);
        let tree = SaveTree::parse(&mut cursor)?;
        let tree_end = cursor.position() as usize;

        // The length field counts the parsed tree bytes without the root
        // tag, plus a fixed bias.
        let actual = (tree_end - tree_start - 1) as u32 + TREE_LENGTH_BIAS;
        if actual != tree_length_field {
            return Err(FormatError::TreeLengthMismatch {
                expected: tree_length_field,
                actual,
            });
        }

        let payload = plaintext[tree_start..tree_end].to_vec();
        let tree_digest = TreeDigest::from_bytes(take_array::<16>(plaintext, tree_end)?);

        let trailer_start = tree_end + DIGEST_LEN;
        let remaining = plaintext.len().saturating_sub(trailer_start);
        if remaining < DIGEST_LEN {
            return Err(FormatError::Truncated {
                offset: trailer_start,
                needed: DIGEST_LEN,
                available: remaining,
            });
        }
        let epilogue = plaintext[trailer_start..plaintext.len() - DIGEST_LEN].to_vec();
        let file_digest =
            FileDigest::from_bytes(take_array::<16>(plaintext, plaintext.len() - DIGEST_LEN)?);

        let account_id = find_account_id(&tree);
        let mut document = Self {
            prologue,
            tree,
            payload,
            tree_digest,
            epilogue,
            file_digest,
            account_id,
        };
        document.verify_and_repair();
        debug!(
            prologue = document.prologue.len(),
            payload = document.payload.len(),
            epilogue = document.epilogue.len(),
            entries = document.tree.len(),
            "loaded save document"
        );
        Ok(document)
    }

    /// Recompute both digests from the current payload and framing,
    /// overwriting stored values that disagree.
    ///
    /// The file digest is computed over the reassembled plaintext, so it
    /// covers the (possibly just repaired) tree digest, matching what a
    /// subsequent save writes out.
    fn verify_and_repair(&mut self) {
        let computed = TreeDigest::from_data(&self.payload);
        if self.tree_digest != computed {
            warn!(
                stored = %self.tree_digest,
                computed = %computed,
                "tree digest mismatch, repairing"
            );
            self.tree_digest = computed;
        }

        let computed = FileDigest::from_plaintext(&self.assemble_body());
        if self.file_digest != computed {
            warn!(
                stored = %self.file_digest,
                computed = %computed,
                "file digest mismatch, repairing"
            );
            self.file_digest = computed;
        }
    }

    /// Assemble the plaintext up to but excluding the file digest.
    fn assemble_body(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(
            16 + self.prologue.len() + self.payload.len() + DIGEST_LEN + self.epilogue.len(),
        );
        body.extend_from_slice(&SAVE_MAGIC);
        body.extend_from_slice(&(self.prologue.len() as u32).to_le_bytes());
        body.extend_from_slice(&self.prologue);
        // payload includes the root tag; the field counts it via the bias.
        body.extend_from_slice(&((self.payload.len() - 1) as u32 + TREE_LENGTH_BIAS).to_le_bytes());
        body.extend_from_slice(&SAVE_MAGIC);
        body.extend_from_slice(&self.payload);
        body.extend_from_slice(self.tree_digest.as_bytes());
        body.extend_from_slice(&self.epilogue);
        body
    }

    /// The parsed tree.
    pub fn tree(&self) -> &SaveTree {
        &self.tree
    }

    /// Mutable access to the tree.
    ///
    /// Mutations do not re-serialize anything; call
    /// [`regenerate`](Self::regenerate) (or [`save`](Self::save), which
    /// does so) before persisting.
    pub fn tree_mut(&mut self) -> &mut SaveTree {
        &mut self.tree
    }

    /// Replace or append a value at a key path through nested trees.
    ///
    /// Returns `false` without mutating anything when an intermediate path
    /// segment is missing or not a tree. Does not re-serialize the payload.
    pub fn set_field(&mut self, path: &[&str], value: SaveValue) -> bool {
        let Some((leaf, parents)) = path.split_last() else {
            return false;
        };
        let mut tree = &mut self.tree;
        for segment in parents {
            match tree.get_mut(segment) {
                Some(SaveValue::Tree(sub)) => tree = sub,
                _ => return false,
            }
        }
        tree.insert((*leaf).to_string(), value);
        // The account id cache is a projection of the tree; refresh it on
        // every mutation rather than tracking which paths touch it.
        self.account_id = find_account_id(&self.tree);
        true
    }

    /// Re-serialize the tree into the payload and recompute both digests.
    ///
    /// Must run (directly or via [`save`](Self::save)) before persisting
    /// any tree mutation.
    ///
    /// # Errors
    ///
    /// [`SerializeError`] leaves the document's prior state untouched.
    pub fn regenerate(&mut self) -> Result<(), SerializeError> {
        let payload = self.tree.to_bytes()?;
        self.payload = payload;
        self.tree_digest = TreeDigest::from_data(&self.payload);
        self.file_digest = FileDigest::from_plaintext(&self.assemble_body());
        self.account_id = find_account_id(&self.tree);
        Ok(())
    }

    /// Regenerate, reassemble, and re-obfuscate the document.
    ///
    /// Returns the final byte buffer for the caller to persist. May be
    /// called repeatedly; the in-memory state stays consistent.
    pub fn save(&mut self) -> Result<Vec<u8>, SerializeError> {
        self.regenerate()?;
        Ok(self.to_bytes())
    }

    /// Reassemble and re-obfuscate the current state without regenerating
    /// the payload from the tree.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut body = self.assemble_body();
        body.extend_from_slice(self.file_digest.as_bytes());
        DieselCipher::encode(&body)
    }

    /// Replace the account id by literal byte substitution in the decoded
    /// plaintext, bypassing the tree codec.
    ///
    /// This mirrors the legacy one-shot "change account id" path: every
    /// occurrence of the cached id's bytes in the reassembled plaintext is
    /// replaced with `new_id`, and the document state is rebuilt from the
    /// result (framing re-validated, digests recomputed). Prefer
    /// [`set_field`](Self::set_field) + [`save`](Self::save); the raw
    /// replacement cannot tell the id apart from an identical byte
    /// sequence elsewhere in the file.
    ///
    /// # Errors
    ///
    /// [`FormatError::MissingAccountId`] when no id is cached, or any
    /// framing error when the replacement breaks the file layout (for
    /// example an id of a different length, which shifts every length
    /// field). On error the document is left unchanged.
    pub fn replace_account_id_raw(&mut self, new_id: &str) -> Result<(), FormatError> {
        let old_id = self
            .account_id
            .as_deref()
            .ok_or(FormatError::MissingAccountId)?;

        let mut plaintext = self.assemble_body();
        plaintext.extend_from_slice(self.file_digest.as_bytes());
        let replaced = replace_all(&plaintext, old_id.as_bytes(), new_id.as_bytes());
        // Reload from the replaced plaintext; stale digests are repaired
        // there, so the rebuilt document is internally consistent.
        *self = Self::from_plaintext(&replaced)?;
        Ok(())
    }

    /// The cached account id, extracted from the reserved `user_id` key.
    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    /// Opaque bytes preceding the tree framing, preserved verbatim.
    pub fn prologue(&self) -> &[u8] {
        &self.prologue
    }

    /// Opaque bytes following the tree digest, preserved verbatim.
    pub fn epilogue(&self) -> &[u8] {
        &self.epilogue
    }

    /// The exact serialized tree bytes (root tag + count + entries).
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Digest over the serialized tree payload.
    pub fn tree_digest(&self) -> TreeDigest {
        self.tree_digest
    }

    /// Masked digest over the assembled plaintext.
    pub fn file_digest(&self) -> FileDigest {
        self.file_digest
    }
}

/// Last non-tree `user_id` value in document order, as its string form.
fn find_account_id(tree: &SaveTree) -> Option<String> {
    let mut found = None;
    for (key, value) in tree.iter() {
        match value {
            SaveValue::Tree(sub) => {
                if let Some(id) = find_account_id(sub) {
                    found = Some(id);
                }
            }
            value if key == USER_ID_KEY => found = Some(value.to_string()),
            _ => {}
        }
    }
    found
}

/// Replace every non-overlapping occurrence of `needle`, left to right.
fn replace_all(haystack: &[u8], needle: &[u8], replacement: &[u8]) -> Vec<u8> {
    if needle.is_empty() {
        return haystack.to_vec();
    }
    let mut out = Vec::with_capacity(haystack.len());
    let mut at = 0;
    while at < haystack.len() {
        if haystack[at..].starts_with(needle) {
            out.extend_from_slice(replacement);
            at += needle.len();
        } else {
            out.push(haystack[at]);
            at += 1;
        }
    }
    out
}

fn take(plaintext: &[u8], offset: usize, len: usize) -> Result<&[u8], FormatError> {
    plaintext
        .get(offset..offset + len)
        .ok_or(FormatError::Truncated {
            offset,
            needed: len,
            available: plaintext.len().saturating_sub(offset),
        })
}

fn take_array<const N: usize>(plaintext: &[u8], offset: usize) -> Result<[u8; N], FormatError> {
    let bytes = take(plaintext, offset, N)?;
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    Ok(out)
}

fn take_u32(plaintext: &[u8], offset: usize) -> Result<u32, FormatError> {
    Ok(u32::from_le_bytes(take_array::<4>(plaintext, offset)?))
}
