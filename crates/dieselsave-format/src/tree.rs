//! Ordered key/value tree
//!
//! The root structure of a save payload is an ordered mapping from string
//! keys to [`SaveValue`]s. Insertion order is semantically significant: it
//! participates in the serialized byte layout, so reordering keys changes
//! the output bytes.

use crate::error::{FormatError, SerializeError};
use crate::ioutils::ReadExt;
use crate::value::{SaveValue, TAG_TREE, write_text};
use std::io::{Read, Seek, Write};

/// An ordered mapping from string keys to typed values.
///
/// Keys are strings in memory and are encoded as text values on the wire.
/// Lookups are linear; trees in real saves hold at most a few dozen entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveTree {
    entries: Vec<(String, SaveValue)>,
}

impl SaveTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the tree has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&SaveValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Look up a value by key, mutably.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut SaveValue> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Insert a value, replacing in place if the key already exists.
    ///
    /// A replaced entry keeps its original position; a new key is appended,
    /// so serialized output is stable under repeated updates.
    pub fn insert(&mut self, key: String, value: SaveValue) -> Option<SaveValue> {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SaveValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Look up a value through nested trees by key path.
    pub fn get_path(&self, path: &[&str]) -> Option<&SaveValue> {
        let (first, rest) = path.split_first()?;
        let value = self.get(first)?;
        if rest.is_empty() {
            Some(value)
        } else if let SaveValue::Tree(sub) = value {
            sub.get_path(rest)
        } else {
            None
        }
    }

    /// Look up a value through nested trees by key path, mutably.
    pub fn get_path_mut(&mut self, path: &[&str]) -> Option<&mut SaveValue> {
        let (first, rest) = path.split_first()?;
        let value = self.get_mut(first)?;
        if rest.is_empty() {
            Some(value)
        } else if let SaveValue::Tree(sub) = value {
            sub.get_path_mut(rest)
        } else {
            None
        }
    }

    /// Parse a tagged tree (tag `0x07`, entry count, entries) from the
    /// reader.
    ///
    /// # Errors
    ///
    /// [`FormatError::UnknownTag`] when the leading byte is not the tree
    /// tag, otherwise whatever entry parsing raises.
    pub fn parse<R: Read + Seek>(reader: &mut R) -> Result<Self, FormatError> {
        let offset = reader.stream_position()?;
        let tag = reader.read_u8()?;
        if tag != TAG_TREE {
            return Err(FormatError::UnknownTag { tag, offset });
        }
        Self::parse_body(reader)
    }

    /// Parse the body of a tree (entry count + entries), the tag byte
    /// having already been consumed.
    pub(crate) fn parse_body<R: Read + Seek>(reader: &mut R) -> Result<Self, FormatError> {
        let count = reader.read_u32le()?;
        let mut tree = Self::new();
        for _ in 0..count {
            let key_offset = reader.stream_position()?;
            let key = match SaveValue::parse(reader)? {
                SaveValue::Tree(_) => {
                    return Err(FormatError::InvalidKey { offset: key_offset });
                }
                scalar => scalar.to_string(),
            };
            let value = SaveValue::parse(reader)?;
            // Duplicate keys replace in place, keeping the first position.
            tree.insert(key, value);
        }
        Ok(tree)
    }

    /// Write the tree as tag `0x07`, little-endian entry count, then each
    /// (key, value) pair in insertion order.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), SerializeError> {
        writer.write_all(&[TAG_TREE])?;
        writer.write_all(&(self.entries.len() as u32).to_le_bytes())?;
        for (key, value) in &self.entries {
            write_text(writer, key)?;
            value.write(writer)?;
        }
        Ok(())
    }

    /// Serialize the tree to a fresh payload buffer (tag + count + entries).
    pub fn to_bytes(&self) -> Result<Vec<u8>, SerializeError> {
        let mut bytes = Vec::new();
        self.write(&mut bytes)?;
        Ok(bytes)
    }
}

impl FromIterator<(String, SaveValue)> for SaveTree {
    fn from_iter<I: IntoIterator<Item = (String, SaveValue)>>(iter: I) -> Self {
        let mut tree = Self::new();
        for (key, value) in iter {
            tree.insert(key, value);
        }
        tree
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn sample_tree() -> SaveTree {
        [
            ("user_id".to_string(), SaveValue::Text("76500000000000001".into())),
            ("version".to_string(), SaveValue::U8(3)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_known_payload_bytes() {
        // Byte layout cross-checked against the reference implementation.
        let payload = sample_tree().to_bytes().unwrap();
        assert_eq!(
            hex::encode(&payload),
            "070200000001757365725f696400013736353030303030303030303030303031000176657273696f6e000403"
        );
    }

    #[test]
    fn test_parse_known_payload() {
        let payload = sample_tree().to_bytes().unwrap();
        let mut cursor = Cursor::new(&payload[..]);
        let tree = SaveTree::parse(&mut cursor).unwrap();
        assert_eq!(tree, sample_tree());
        assert_eq!(cursor.position() as usize, payload.len());
    }

    #[test]
    fn test_empty_tree_is_five_bytes() {
        let payload = SaveTree::new().to_bytes().unwrap();
        assert_eq!(payload, b"\x07\x00\x00\x00\x00");
    }

    #[test]
    fn test_nested_round_trip() {
        let inner: SaveTree = [("coins".to_string(), SaveValue::U16(1200))]
            .into_iter()
            .collect();
        let tree: SaveTree = [
            ("name".to_string(), SaveValue::Text("heister".into())),
            ("wallet".to_string(), SaveValue::Tree(inner)),
            ("hardcore".to_string(), SaveValue::Bool(false)),
        ]
        .into_iter()
        .collect();

        let payload = tree.to_bytes().unwrap();
        let parsed = SaveTree::parse(&mut Cursor::new(&payload[..])).unwrap();
        assert_eq!(parsed, tree);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut tree = sample_tree();
        let old = tree.insert("user_id".into(), SaveValue::Text("9".into()));
        assert_eq!(old, Some(SaveValue::Text("76500000000000001".into())));
        // Replaced key keeps its position ahead of "version".
        let keys: Vec<_> = tree.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, ["user_id", "version"]);
    }

    #[test]
    fn test_duplicate_wire_keys_collapse() {
        // count=2 with the same key twice: the later value wins, the entry
        // keeps its first position.
        let mut payload = Vec::new();
        payload.push(TAG_TREE);
        payload.extend_from_slice(&2u32.to_le_bytes());
        for value in [b'a', b'b'] {
            payload.extend_from_slice(b"\x01k\x00");
            payload.extend_from_slice(&[0x04, value]);
        }
        let tree = SaveTree::parse(&mut Cursor::new(&payload[..])).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get("k"), Some(&SaveValue::U8(b'b')));
    }

    #[test]
    fn test_numeric_wire_key_becomes_string() {
        let mut payload = Vec::new();
        payload.push(TAG_TREE);
        payload.extend_from_slice(&1u32.to_le_bytes());
        payload.extend_from_slice(&[0x04, 7]); // key: U8(7)
        payload.extend_from_slice(&[0x03]); // value: nil
        let tree = SaveTree::parse(&mut Cursor::new(&payload[..])).unwrap();
        assert_eq!(tree.get("7"), Some(&SaveValue::Nil));
    }

    #[test]
    fn test_tree_key_rejected() {
        let mut payload = Vec::new();
        payload.push(TAG_TREE);
        payload.extend_from_slice(&1u32.to_le_bytes());
        payload.extend_from_slice(b"\x07\x00\x00\x00\x00"); // key: empty tree
        payload.extend_from_slice(&[0x03]);
        let err = SaveTree::parse(&mut Cursor::new(&payload[..])).unwrap_err();
        assert!(matches!(err, FormatError::InvalidKey { offset: 5 }));
    }

    #[test]
    fn test_get_path() {
        let inner: SaveTree = [("coins".to_string(), SaveValue::U16(1200))]
            .into_iter()
            .collect();
        let tree: SaveTree = [("wallet".to_string(), SaveValue::Tree(inner))]
            .into_iter()
            .collect();
        assert_eq!(
            tree.get_path(&["wallet", "coins"]),
            Some(&SaveValue::U16(1200))
        );
        assert_eq!(tree.get_path(&["wallet", "bills"]), None);
        assert_eq!(tree.get_path(&["wallet", "coins", "deeper"]), None);
        assert_eq!(tree.get_path(&[]), None);
    }

    fn value_strategy() -> impl Strategy<Value = SaveValue> {
        let leaf = prop_oneof![
            "[a-z0-9 ]{0,12}".prop_map(SaveValue::Text),
            // i16-exact floats keep equality comparisons meaningful.
            any::<i16>().prop_map(|v| SaveValue::Float(f32::from(v))),
            Just(SaveValue::Nil),
            any::<u8>().prop_map(SaveValue::U8),
            any::<u16>().prop_map(SaveValue::U16),
            any::<bool>().prop_map(SaveValue::Bool),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            proptest::collection::vec(("[a-z_]{1,8}", inner), 0..4)
                .prop_map(|entries| SaveValue::Tree(entries.into_iter().collect()))
        })
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            entries in proptest::collection::vec(("[a-z_]{1,8}", value_strategy()), 0..6)
        ) {
            let tree: SaveTree = entries.into_iter().collect();
            let payload = tree.to_bytes().unwrap();
            let mut cursor = Cursor::new(&payload[..]);
            let parsed = SaveTree::parse(&mut cursor).unwrap();
            prop_assert_eq!(parsed, tree);
            prop_assert_eq!(cursor.position() as usize, payload.len());
        }
    }
}
