//! Binary KeyValue trees.
//!
//! The vendor stores schemas and its app catalog as recursive tagged binary
//! trees. A decoded tree is immutable and queried by name; a lookup miss
//! yields the shared [`KeyValue::invalid`] sentinel instead of failing, so
//! chains like `kv["a"]["b"]["c"].as_integer(0)` never fault.

mod reader;
mod writer;

pub use reader::read_tree;
pub use writer::StringTableBuilder;

use std::ops::Index;
use std::path::Path;

use strum::FromRepr;
use tracing::debug;

use crate::bytes::ByteBuffer;
use crate::error::{Error, Result};

/// Name of the synthetic root node.
pub const ROOT_NAME: &str = "<root>";

/// Wire tag of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr)]
#[repr(u8)]
pub enum KvType {
    None = 0,
    String = 1,
    Int32 = 2,
    Float32 = 3,
    Pointer = 4,
    WideString = 5,
    Color = 6,
    UInt64 = 7,
    End = 8,
}

/// Payload of a node. Only `None` nodes carry children.
#[derive(Debug, Clone, PartialEq)]
pub enum KvValue {
    None,
    String(String),
    Int32(i32),
    Float32(f32),
    UInt64(u64),
}

impl KvValue {
    pub fn kv_type(&self) -> KvType {
        match self {
            KvValue::None => KvType::None,
            KvValue::String(_) => KvType::String,
            KvValue::Int32(_) => KvType::Int32,
            KvValue::Float32(_) => KvType::Float32,
            KvValue::UInt64(_) => KvType::UInt64,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue {
    name: String,
    value: KvValue,
    valid: bool,
    children: Vec<KeyValue>,
}

static INVALID: KeyValue = KeyValue {
    name: String::new(),
    value: KvValue::None,
    valid: false,
    children: Vec::new(),
};

impl KeyValue {
    /// The lookup-miss sentinel.
    pub fn invalid() -> &'static KeyValue {
        &INVALID
    }

    /// A valid empty root node.
    pub fn root() -> Self {
        Self::node(ROOT_NAME)
    }

    /// A valid empty `None` node.
    pub fn node(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: KvValue::None,
            valid: true,
            children: Vec::new(),
        }
    }

    /// A valid leaf. A `KvValue::None` payload yields an empty node.
    pub fn leaf(name: impl Into<String>, value: KvValue) -> Self {
        Self {
            name: name.into(),
            value,
            valid: true,
            children: Vec::new(),
        }
    }

    /// Builder helper: append `child` to a `None` node.
    pub fn with_child(mut self, child: KeyValue) -> Self {
        self.push(child);
        self
    }

    /// Append `child`. Leaves never take children; the call is ignored.
    pub fn push(&mut self, child: KeyValue) {
        if self.value == KvValue::None {
            self.children.push(child);
        } else {
            debug!("Ignoring child {:?} of leaf node {:?}", child.name, self.name);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &KvValue {
        &self.value
    }

    pub fn kv_type(&self) -> KvType {
        self.value.kv_type()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn children(&self) -> &[KeyValue] {
        &self.children
    }

    /// First direct child whose name matches `key` ignoring case, or the
    /// sentinel.
    pub fn get(&self, key: &str) -> &KeyValue {
        self.children
            .iter()
            .find(|child| names_match(&child.name, key))
            .unwrap_or(&INVALID)
    }

    pub fn as_string(&self, default: &str) -> String {
        if !self.valid {
            return default.to_string();
        }
        match &self.value {
            KvValue::None => default.to_string(),
            KvValue::String(value) => value.clone(),
            KvValue::Int32(value) => value.to_string(),
            KvValue::Float32(value) => value.to_string(),
            KvValue::UInt64(value) => value.to_string(),
        }
    }

    /// `Int32` values, or `String` values that parse as one.
    pub fn as_integer(&self, default: i32) -> i32 {
        if !self.valid {
            return default;
        }
        match &self.value {
            KvValue::Int32(value) => *value,
            KvValue::String(value) => value.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    /// `UInt64` values, non-negative `Int32` values, or parsable strings.
    pub fn as_u64(&self, default: u64) -> u64 {
        if !self.valid {
            return default;
        }
        match &self.value {
            KvValue::UInt64(value) => *value,
            KvValue::Int32(value) => u64::try_from(*value).unwrap_or(default),
            KvValue::String(value) => value.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    pub fn as_float(&self, default: f32) -> f32 {
        match (&self.value, self.valid) {
            (KvValue::Float32(value), true) => *value,
            _ => default,
        }
    }

    /// `Int32` values, non-zero meaning true.
    pub fn as_boolean(&self, default: bool) -> bool {
        match (&self.value, self.valid) {
            (KvValue::Int32(value), true) => *value != 0,
            _ => default,
        }
    }

    /// Decode a whole file in the inline-name layout.
    pub fn load_binary<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let data = std::fs::read(path)?;
        debug!("Decoding {} ({} bytes)", path.display(), data.len());
        Self::read_binary(&data)
    }

    /// Decode a tree whose child names are inline strings.
    pub fn read_binary(data: &[u8]) -> Result<Self> {
        read_tree(&mut ByteBuffer::new(data), None)
    }

    /// Decode a tree whose child names are indices into `strings`.
    pub fn read_binary_with_strings(data: &[u8], strings: &[String]) -> Result<Self> {
        read_tree(&mut ByteBuffer::new(data), Some(strings))
    }

    /// Encode the children of this node with inline names.
    pub fn write_binary(&self) -> Vec<u8> {
        let mut out = Vec::new();
        writer::write_children(&mut out, self, None);
        out
    }

    /// Encode the children of this node with names interned in `strings`.
    pub fn write_binary_with_strings(&self, strings: &mut StringTableBuilder) -> Vec<u8> {
        let mut out = Vec::new();
        writer::write_children(&mut out, self, Some(strings));
        out
    }
}

impl Index<&str> for KeyValue {
    type Output = KeyValue;

    fn index(&self, key: &str) -> &KeyValue {
        self.get(key)
    }
}

fn names_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
        || a.chars()
            .flat_map(char::to_lowercase)
            .eq(b.chars().flat_map(char::to_lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> KeyValue {
        KeyValue::root().with_child(
            KeyValue::node("480")
                .with_child(KeyValue::leaf("gamename", KvValue::String("Spacewar".into())))
                .with_child(KeyValue::leaf("version", KvValue::Int32(12)))
                .with_child(KeyValue::leaf("ratio", KvValue::Float32(0.5)))
                .with_child(KeyValue::leaf("count", KvValue::String("42".into()))),
        )
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let kv = sample();
        assert_eq!(kv["480"]["GameName"].as_string(""), "Spacewar");
        assert_eq!(kv["480"]["VERSION"].as_integer(0), 12);
    }

    #[test]
    fn test_lookup_miss_yields_sentinel() {
        let kv = sample();
        let missing = &kv["480"]["stats"]["1"]["bits"];
        assert!(!missing.is_valid());
        assert_eq!(missing.as_string("dflt"), "dflt");
        assert_eq!(missing.as_integer(-1), -1);
        assert_eq!(missing.as_float(2.5), 2.5);
        assert!(missing.as_boolean(true));
        assert!(missing.children().is_empty());
    }

    #[test]
    fn test_string_parses_as_integer() {
        let kv = sample();
        assert_eq!(kv["480"]["count"].as_integer(0), 42);
        assert_eq!(kv["480"]["gamename"].as_integer(7), 7);
    }

    #[test]
    fn test_typed_accessors_respect_types() {
        let kv = sample();
        assert_eq!(kv["480"]["ratio"].as_float(0.0), 0.5);
        assert_eq!(kv["480"]["version"].as_float(1.0), 1.0);
        assert!(kv["480"]["version"].as_boolean(false));
        assert!(!kv["480"]["ratio"].as_boolean(false));
    }

    #[test]
    fn test_duplicate_names_return_first() {
        let kv = KeyValue::root()
            .with_child(KeyValue::leaf("name", KvValue::Int32(1)))
            .with_child(KeyValue::leaf("Name", KvValue::Int32(2)));
        assert_eq!(kv["NAME"].as_integer(0), 1);
    }

    #[test]
    fn test_leaves_take_no_children() {
        let mut leaf = KeyValue::leaf("x", KvValue::Int32(1));
        leaf.push(KeyValue::node("child"));
        assert!(leaf.children().is_empty());
    }

    #[test]
    fn test_as_u64() {
        let kv = KeyValue::root()
            .with_child(KeyValue::leaf("big", KvValue::UInt64(u64::MAX)))
            .with_child(KeyValue::leaf("neg", KvValue::Int32(-5)));
        assert_eq!(kv["big"].as_u64(0), u64::MAX);
        assert_eq!(kv["neg"].as_u64(9), 9);
        assert_eq!(kv["big"].as_string(""), u64::MAX.to_string());
    }

    #[test]
    fn test_kv_type_from_tag() {
        assert_eq!(KvType::from_repr(7), Some(KvType::UInt64));
        assert_eq!(KvType::from_repr(8), Some(KvType::End));
        assert_eq!(KvType::from_repr(9), None);
    }

    #[test]
    fn test_load_binary_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = KeyValue::load_binary(dir.path().join("missing.bin"));
        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }
}
