//! Reader for the client's global app catalog (`appcache/appinfo.vdf`).
//!
//! Layout: magic, universe, an optional string table offset (modern format
//! 41+), then `{app id, size, fixed header, KeyValue tree}` records until an
//! app id of 0.

use std::path::{Path, PathBuf};

use serde::Serialize;
use strum::{Display, EnumString};
use tracing::{debug, warn};

use crate::bytes::ByteBuffer;
use crate::config::paths;
use crate::error::{Error, Result};
use crate::keyvalue::{KeyValue, read_tree};

/// Upper 24 bits of a modern catalog magic; the low byte is the version.
pub const MODERN_MAGIC: u32 = 0x07_56_44;

/// Full magics of the legacy catalog formats.
pub const LEGACY_MAGICS: [u32; 3] = [0x2756_4446, 0x2856_4446, 0x2956_4446];

/// Fixed record header size before the tree.
const RECORD_HEADER: usize = 40;
/// Extra header bytes of modern version 40 and later.
const RECORD_HEADER_V40: usize = 20;

const HEADER_IMAGE_URL: &str = "https://shared.cloudflare.steamstatic.com/store_item_assets/steam/apps";

/// App kinds kept from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AppType {
    Game,
    Dlc,
    Demo,
    Mod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameInfo {
    pub id: u32,
    pub name: String,
    pub kind: AppType,
    pub image_url: String,
    pub has_achievements: bool,
}

/// Catalog format, from the magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Format {
    version: u32,
    modern: bool,
}

impl Format {
    fn from_magic(magic: u32) -> Result<Self> {
        let modern = magic >> 8 == MODERN_MAGIC;
        if !modern && !LEGACY_MAGICS.contains(&magic) {
            return Err(Error::InvalidAppInfoMagic(magic));
        }
        Ok(Self {
            version: magic & 0xFF,
            modern,
        })
    }

    fn has_string_table(&self) -> bool {
        self.modern && self.version >= 41
    }

    fn record_header(&self) -> usize {
        if self.modern && self.version >= 40 {
            RECORD_HEADER + RECORD_HEADER_V40
        } else {
            RECORD_HEADER
        }
    }
}

pub fn app_info_path(install: &Path) -> PathBuf {
    let mut path = install.to_path_buf();
    path.extend(paths::APP_INFO);
    path
}

/// Games, DLC, demos and mods listed in the install's app catalog.
pub fn read_games(install: &Path) -> Result<Vec<GameInfo>> {
    let path = app_info_path(install);
    if !path.is_file() {
        return Err(Error::FileNotFound(path));
    }
    let data = std::fs::read(&path)?;
    debug!("Reading app catalog {} ({} bytes)", path.display(), data.len());
    parse_app_info(&data)
}

/// Parse an in-memory app catalog. Records that fail to decode are skipped;
/// a record overrunning the data ends the scan.
pub fn parse_app_info(data: &[u8]) -> Result<Vec<GameInfo>> {
    let mut buffer = ByteBuffer::new(data);
    let format = Format::from_magic(buffer.read_u32()?)?;
    let _universe = buffer.read_u32()?;
    debug!("App catalog version {} (modern: {})", format.version, format.modern);

    let strings = if format.has_string_table() {
        let offset = buffer.read_i64()?;
        Some(read_string_table(data, offset)?)
    } else {
        None
    };

    let mut games = Vec::new();
    while buffer.remaining() >= 4 {
        let app_id = buffer.read_u32()?;
        if app_id == 0 {
            break;
        }
        let size = buffer.read_u32()? as usize;
        let start = buffer.position();
        let Some(end) = start.checked_add(size).filter(|&end| end <= data.len()) else {
            warn!("Record of app {} overruns the catalog, stopping", app_id);
            break;
        };

        match parse_record(app_id, &data[start..end], format, strings.as_deref()) {
            Ok(Some(game)) => games.push(game),
            Ok(None) => {}
            Err(e) => warn!("Skipping app {}: {}", app_id, e),
        }
        buffer.set_position(end)?;
    }

    debug!("App catalog lists {} games", games.len());
    Ok(games)
}

fn read_string_table(data: &[u8], offset: i64) -> Result<Vec<String>> {
    let position = usize::try_from(offset).map_err(|_| Error::MalformedData {
        position: 0,
        message: format!("negative string table offset {}", offset),
    })?;
    let mut buffer = ByteBuffer::new(data);
    buffer.set_position(position)?;

    let count = buffer.read_u32()? as usize;
    // Every entry takes at least its terminator.
    if count > buffer.remaining() {
        return Err(Error::MalformedData {
            position: buffer.position(),
            message: format!(
                "string table claims {} entries but only {} bytes follow",
                count,
                buffer.remaining()
            ),
        });
    }
    let mut strings = Vec::with_capacity(count);
    for _ in 0..count {
        strings.push(buffer.read_cstring()?);
    }
    Ok(strings)
}

fn parse_record(
    app_id: u32,
    record: &[u8],
    format: Format,
    strings: Option<&[String]>,
) -> Result<Option<GameInfo>> {
    let mut buffer = ByteBuffer::new(record);
    buffer.skip(format.record_header())?;
    let kv = read_tree(&mut buffer, strings)?;

    let Some(root) = kv.children().first() else {
        return Ok(None);
    };
    let common = &root["common"];
    let Ok(kind) = common["type"].as_string("").parse::<AppType>() else {
        return Ok(None);
    };

    Ok(Some(GameInfo {
        id: app_id,
        name: common["name"].as_string(&format!("App {}", app_id)),
        kind,
        image_url: format!("{}/{}/header.jpg", HEADER_IMAGE_URL, app_id),
        has_achievements: has_achievements(root),
    }))
}

fn has_achievements(root: &KeyValue) -> bool {
    let common = &root["common"];
    root["achievements"].is_valid()
        || common["achievements"].is_valid()
        || root["extended"]["achievements"].is_valid()
        || common["community_visible_stats"].as_integer(0) != 0
        || common["category"]
            .children()
            .iter()
            .any(|category| category.name().contains("22"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyvalue::{KvValue, StringTableBuilder};

    fn text(name: &str, value: &str) -> KeyValue {
        KeyValue::leaf(name, KvValue::String(value.to_string()))
    }

    fn app(app_id: u32, kind: &str, extra: Option<KeyValue>) -> KeyValue {
        let mut common = KeyValue::node("common")
            .with_child(text("name", &format!("Game {}", app_id)))
            .with_child(text("type", kind));
        if let Some(extra) = extra {
            common.push(extra);
        }
        KeyValue::root().with_child(KeyValue::node("appinfo").with_child(common))
    }

    fn push_record(out: &mut Vec<u8>, app_id: u32, header: usize, tree: &[u8]) {
        out.extend_from_slice(&app_id.to_le_bytes());
        out.extend_from_slice(&((header + tree.len()) as u32).to_le_bytes());
        out.extend(std::iter::repeat_n(0u8, header));
        out.extend_from_slice(tree);
    }

    #[test]
    fn test_legacy_catalog() {
        let mut data = Vec::new();
        data.extend_from_slice(&LEGACY_MAGICS[1].to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        let visible = KeyValue::leaf("community_visible_stats", KvValue::String("1".into()));
        push_record(&mut data, 480, 40, &app(480, "Game", Some(visible)).write_binary());
        push_record(&mut data, 7, 40, &app(7, "Config", None).write_binary());
        push_record(&mut data, 500, 40, &app(500, "DLC", None).write_binary());
        data.extend_from_slice(&0u32.to_le_bytes());

        let games = parse_app_info(&data).unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].id, 480);
        assert_eq!(games[0].name, "Game 480");
        assert_eq!(games[0].kind, AppType::Game);
        assert!(games[0].has_achievements);
        assert!(games[0].image_url.ends_with("/480/header.jpg"));
        assert_eq!(games[1].kind, AppType::Dlc);
        assert!(!games[1].has_achievements);
    }

    #[test]
    fn test_modern_catalog_with_string_table() {
        let mut table = StringTableBuilder::new();
        let category = KeyValue::node("category")
            .with_child(KeyValue::leaf("category_22", KvValue::Int32(1)));
        let tree = app(620, "game", Some(category)).write_binary_with_strings(&mut table);

        let mut data = Vec::new();
        data.extend_from_slice(&((MODERN_MAGIC << 8) | 41).to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        let offset_at = data.len();
        data.extend_from_slice(&0i64.to_le_bytes());
        push_record(&mut data, 620, 60, &tree);
        data.extend_from_slice(&0u32.to_le_bytes());
        let offset = data.len() as i64;
        data[offset_at..offset_at + 8].copy_from_slice(&offset.to_le_bytes());
        data.extend_from_slice(&table.to_bytes());

        let games = parse_app_info(&data).unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].name, "Game 620");
        assert!(games[0].has_achievements);
    }

    #[test]
    fn test_truncated_string_table() {
        let mut data = Vec::new();
        data.extend_from_slice(&((MODERN_MAGIC << 8) | 41).to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&16i64.to_le_bytes());
        data.extend_from_slice(&20_000_000u32.to_le_bytes());

        assert!(matches!(
            read_string_table(&data, 16),
            Err(Error::MalformedData { position: 20, .. })
        ));
        assert!(matches!(
            parse_app_info(&data),
            Err(Error::MalformedData { .. })
        ));

        // Count fits the remaining bytes but the last entry is unterminated.
        let mut data = data[..16].to_vec();
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(b"stats\0name");
        assert!(matches!(
            read_string_table(&data, 16),
            Err(Error::MalformedData { .. })
        ));
    }

    #[test]
    fn test_broken_record_is_skipped() {
        let mut data = Vec::new();
        data.extend_from_slice(&LEGACY_MAGICS[0].to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        push_record(&mut data, 10, 40, &[0x2A, b'x', 0]);
        push_record(&mut data, 20, 40, &app(20, "mod", None).write_binary());
        data.extend_from_slice(&0u32.to_le_bytes());

        let games = parse_app_info(&data).unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].kind, AppType::Mod);
    }

    #[test]
    fn test_overrunning_record_stops_scan() {
        let mut data = Vec::new();
        data.extend_from_slice(&LEGACY_MAGICS[2].to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&30u32.to_le_bytes());
        data.extend_from_slice(&1000u32.to_le_bytes());
        data.extend_from_slice(&[0; 16]);

        assert!(parse_app_info(&data).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_magic() {
        let data = [0x44, 0x33, 0x22, 0x11, 0, 0, 0, 0];
        assert!(matches!(
            parse_app_info(&data),
            Err(Error::InvalidAppInfoMagic(0x1122_3344))
        ));
    }

    #[test]
    fn test_app_type_parsing() {
        assert_eq!("GAME".parse::<AppType>().unwrap(), AppType::Game);
        assert_eq!("dlc".parse::<AppType>().unwrap(), AppType::Dlc);
        assert!("tool".parse::<AppType>().is_err());
        assert_eq!(AppType::Demo.to_string(), "demo");
    }

    #[test]
    fn test_read_games_missing_catalog() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(read_games(dir.path()), Err(Error::FileNotFound(_))));
    }
}
