use std::collections::HashMap;

use super::{KeyValue, KvType, KvValue};

/// Interns child names for the indexed layout.
#[derive(Debug, Clone, Default)]
pub struct StringTableBuilder {
    strings: Vec<String>,
    indices: HashMap<String, i32>,
}

impl StringTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `name`, appending it on first use.
    pub fn intern(&mut self, name: &str) -> i32 {
        if let Some(&index) = self.indices.get(name) {
            return index;
        }
        let index = self.strings.len() as i32;
        self.strings.push(name.to_string());
        self.indices.insert(name.to_string(), index);
        index
    }

    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    pub fn into_strings(self) -> Vec<String> {
        self.strings
    }

    /// Table in its on-disk form: a u32 count, then null-terminated strings.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = (self.strings.len() as u32).to_le_bytes().to_vec();
        for string in &self.strings {
            write_cstring(&mut out, string);
        }
        out
    }
}

pub(super) fn write_children(
    out: &mut Vec<u8>,
    node: &KeyValue,
    mut strings: Option<&mut StringTableBuilder>,
) {
    for child in &node.children {
        out.push(child.kv_type() as u8);
        match strings.as_deref_mut() {
            Some(table) => out.extend_from_slice(&table.intern(&child.name).to_le_bytes()),
            None => write_cstring(out, &child.name),
        }
        match &child.value {
            KvValue::None => write_children(out, child, strings.as_deref_mut()),
            KvValue::String(value) => write_cstring(out, value),
            KvValue::Int32(value) => out.extend_from_slice(&value.to_le_bytes()),
            KvValue::Float32(value) => out.extend_from_slice(&value.to_le_bytes()),
            KvValue::UInt64(value) => out.extend_from_slice(&value.to_le_bytes()),
        }
    }
    out.push(KvType::End as u8);
}

fn write_cstring(out: &mut Vec<u8>, value: &str) {
    out.extend_from_slice(value.as_bytes());
    out.push(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_reuses_indices() {
        let mut table = StringTableBuilder::new();
        assert_eq!(table.intern("stats"), 0);
        assert_eq!(table.intern("name"), 1);
        assert_eq!(table.intern("stats"), 0);
        assert_eq!(table.strings(), ["stats", "name"]);
    }

    #[test]
    fn test_table_bytes() {
        let mut table = StringTableBuilder::new();
        table.intern("a");
        table.intern("bc");
        assert_eq!(table.to_bytes(), vec![2, 0, 0, 0, b'a', 0, b'b', b'c', 0]);
    }

    #[test]
    fn test_write_leaf_layout() {
        let kv = KeyValue::root().with_child(KeyValue::leaf("v", KvValue::Int32(1)));
        assert_eq!(kv.write_binary(), vec![2, b'v', 0, 1, 0, 0, 0, 8]);
    }
}
