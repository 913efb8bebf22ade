use tracing::trace;

use super::{KeyValue, KvType, KvValue, ROOT_NAME};
use crate::bytes::ByteBuffer;
use crate::error::{Error, Result};

/// Nesting deeper than this is treated as malformed input.
pub const MAX_DEPTH: usize = 512;

/// Decode one tree level (up to its `End` tag) starting at the buffer's
/// position, returning a synthetic root holding the decoded children.
///
/// With `strings`, child names are 32-bit indices into the table; indices
/// outside it become the decimal index. Without, names are inline
/// null-terminated UTF-8.
pub fn read_tree(buffer: &mut ByteBuffer<'_>, strings: Option<&[String]>) -> Result<KeyValue> {
    let mut root = KeyValue::node(ROOT_NAME);
    root.children = read_children(buffer, strings, 0)?;
    Ok(root)
}

fn read_children(
    buffer: &mut ByteBuffer<'_>,
    strings: Option<&[String]>,
    depth: usize,
) -> Result<Vec<KeyValue>> {
    if depth > MAX_DEPTH {
        return Err(Error::MalformedData {
            position: buffer.position(),
            message: format!("nesting deeper than {} levels", MAX_DEPTH),
        });
    }

    let mut children = Vec::new();
    loop {
        let position = buffer.position();
        let tag = buffer.read_u8()?;
        let kv_type = KvType::from_repr(tag);
        if kv_type == Some(KvType::End) {
            break;
        }

        let name = read_name(buffer, strings)?;
        let value = match kv_type {
            Some(KvType::None) => {
                let mut node = KeyValue::node(name);
                node.children = read_children(buffer, strings, depth + 1)?;
                children.push(node);
                continue;
            }
            Some(KvType::String) => KvValue::String(buffer.read_cstring()?),
            Some(KvType::Int32) => KvValue::Int32(buffer.read_i32()?),
            Some(KvType::UInt64) => KvValue::UInt64(buffer.read_u64()?),
            Some(KvType::Float32) => KvValue::Float32(buffer.read_f32()?),
            _ => return Err(Error::UnknownKeyValueType { tag, position }),
        };
        children.push(KeyValue::leaf(name, value));
    }

    trace!("Decoded {} children at depth {}", children.len(), depth);
    Ok(children)
}

fn read_name(buffer: &mut ByteBuffer<'_>, strings: Option<&[String]>) -> Result<String> {
    match strings {
        None => buffer.read_cstring(),
        Some(table) => {
            let index = buffer.read_i32()?;
            Ok(usize::try_from(index)
                .ok()
                .and_then(|i| table.get(i))
                .cloned()
                .unwrap_or_else(|| index.to_string()))
        }
    }
}
