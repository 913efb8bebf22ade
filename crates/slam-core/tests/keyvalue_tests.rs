//! Binary KeyValue decoding tests over hand-built byte streams.

use slam_core::keyvalue::ROOT_NAME;
use slam_core::{Error, KeyValue, KvType, KvValue, StringTableBuilder};

fn cstr(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(s.as_bytes());
    out.push(0);
}

fn nested_tree() -> KeyValue {
    KeyValue::root().with_child(
        KeyValue::node("480").with_child(
            KeyValue::node("stats").with_child(
                KeyValue::node("1")
                    .with_child(KeyValue::leaf("type", KvValue::Int32(4)))
                    .with_child(KeyValue::leaf("name", KvValue::String("ACH".into())))
                    .with_child(KeyValue::leaf("min", KvValue::Float32(0.5)))
                    .with_child(KeyValue::leaf("steamid", KvValue::UInt64(76_561_197_960_287_930))),
            ),
        ),
    )
}

mod string_table_tests {
    use super::*;

    #[test]
    fn test_indexed_and_inline_layouts_agree() {
        let strings: Vec<String> = ["stats", "name", "display"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut indexed = vec![KvType::None as u8];
        indexed.extend_from_slice(&0i32.to_le_bytes());
        indexed.push(KvType::String as u8);
        indexed.extend_from_slice(&1i32.to_le_bytes());
        cstr(&mut indexed, "ACH_WIN");
        indexed.push(KvType::Int32 as u8);
        indexed.extend_from_slice(&2i32.to_le_bytes());
        indexed.extend_from_slice(&1i32.to_le_bytes());
        indexed.push(KvType::End as u8);
        indexed.push(KvType::End as u8);

        let mut inline = vec![KvType::None as u8];
        cstr(&mut inline, "stats");
        inline.push(KvType::String as u8);
        cstr(&mut inline, "name");
        cstr(&mut inline, "ACH_WIN");
        inline.push(KvType::Int32 as u8);
        cstr(&mut inline, "display");
        inline.extend_from_slice(&1i32.to_le_bytes());
        inline.push(KvType::End as u8);
        inline.push(KvType::End as u8);

        let from_table = KeyValue::read_binary_with_strings(&indexed, &strings).unwrap();
        let from_inline = KeyValue::read_binary(&inline).unwrap();
        assert_eq!(from_table, from_inline);
        assert_eq!(from_table["STATS"]["Name"].as_string(""), "ACH_WIN");
        assert!(from_table["stats"]["display"].as_boolean(false));
    }

    #[test]
    fn test_builder_round_trip() {
        let tree = nested_tree();
        let mut table = StringTableBuilder::new();
        let bytes = tree.write_binary_with_strings(&mut table);
        let decoded = KeyValue::read_binary_with_strings(&bytes, table.strings()).unwrap();
        assert_eq!(decoded, tree);
    }
}

mod tree_tests {
    use super::*;

    #[test]
    fn test_deep_round_trip_keeps_every_leaf_type() {
        let tree = nested_tree();
        let decoded = KeyValue::read_binary(&tree.write_binary()).unwrap();
        assert_eq!(decoded, tree);
        assert_eq!(decoded.name(), ROOT_NAME);

        let stat = &decoded["480"]["stats"]["1"];
        assert_eq!(stat["type"].kv_type(), KvType::Int32);
        assert_eq!(stat["name"].kv_type(), KvType::String);
        assert_eq!(stat["min"].as_float(0.0), 0.5);
        assert_eq!(stat["steamid"].as_u64(0), 76_561_197_960_287_930);
    }

    #[test]
    fn test_lookup_miss_chains_to_sentinel() {
        let tree = nested_tree();
        let missing = &tree["480"]["nope"]["deeper"]["still"];
        assert!(!missing.is_valid());
        assert!(missing.children().is_empty());
        assert_eq!(missing.as_integer(-7), -7);
        assert_eq!(missing.as_string("fallback"), "fallback");
        assert!(std::ptr::eq(missing, KeyValue::invalid()));
    }

    #[test]
    fn test_duplicate_names_resolve_to_first() {
        let mut data = Vec::new();
        for value in [1i32, 2] {
            data.push(KvType::Int32 as u8);
            cstr(&mut data, "dup");
            data.extend_from_slice(&value.to_le_bytes());
        }
        data.push(KvType::End as u8);

        let kv = KeyValue::read_binary(&data).unwrap();
        assert_eq!(kv.children().len(), 2);
        assert_eq!(kv["DUP"].as_integer(0), 1);
    }

    #[test]
    fn test_load_binary_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = KeyValue::load_binary(dir.path().join("missing.bin"));
        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }

    #[test]
    fn test_load_binary_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.bin");
        std::fs::write(&path, nested_tree().write_binary()).unwrap();

        let kv = KeyValue::load_binary(&path).unwrap();
        assert_eq!(kv["480"]["stats"]["1"]["name"].as_string(""), "ACH");
    }
}
