//! On-disk schema and app catalog readers, with achievement snapshots built
//! through the fake library.

use std::path::Path;

use slam_core::appinfo::{self, LEGACY_MAGICS};
use slam_core::native::mock::MockSteam;
use slam_core::schema;
use slam_core::{AppType, Client, Error, KeyValue, KvValue, snapshot};

fn text(name: &str, value: &str) -> KeyValue {
    KeyValue::leaf(name, KvValue::String(value.to_string()))
}

fn bit(id: &str, english: &str, permission: i32) -> KeyValue {
    KeyValue::node(id)
        .with_child(text("name", id))
        .with_child(KeyValue::leaf("permission", KvValue::Int32(permission)))
        .with_child(
            KeyValue::node("display")
                .with_child(KeyValue::node("name").with_child(text("english", english)))
                .with_child(text("icon", &format!("{}.jpg", id.to_lowercase())))
                .with_child(text("icon_gray", &format!("{}_gray.jpg", id.to_lowercase()))),
        )
}

fn write_schema(install: &Path, app_id: u32, bits: Vec<KeyValue>) {
    let mut group = KeyValue::node("bits");
    for bit in bits {
        group.push(bit);
    }
    let tree = KeyValue::root().with_child(
        KeyValue::node(app_id.to_string()).with_child(
            KeyValue::node("stats").with_child(
                KeyValue::node("1")
                    .with_child(KeyValue::leaf("type", KvValue::Int32(4)))
                    .with_child(group),
            ),
        ),
    );

    let path = schema::schema_path(install, app_id);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, tree.write_binary()).unwrap();
}

mod schema_tests {
    use super::*;

    #[test]
    fn test_load_definitions_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        write_schema(
            dir.path(),
            480,
            vec![bit("ACH_WIN", "Winner", 0), bit("ACH_LOSE", "Loser", 0)],
        );

        let defs = schema::load_achievement_definitions(dir.path(), 480, "english").unwrap();
        let ids: Vec<_> = defs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"ACH_WIN"));
        assert!(defs.iter().any(|d| d.name == "Loser"));
    }

    #[test]
    fn test_missing_schema_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = schema::load_achievement_definitions(dir.path(), 480, "english");
        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }

    #[test]
    fn test_snapshot_through_session() {
        let dir = tempfile::tempdir().unwrap();
        write_schema(
            dir.path(),
            480,
            vec![bit("ACH_WIN", "Winner", 0), bit("ACH_SECRET", "Secret", 2)],
        );
        let defs = schema::load_achievement_definitions(dir.path(), 480, "english").unwrap();

        let mut steam = MockSteam::builder()
            .install_path(dir.path())
            .running_app_id(480)
            .achievement("ACH_WIN", true, 1_700_000_000)
            .achievement_percent("ACH_WIN", 25.0)
            .achievement("ACH_SECRET", false, 0)
            .build();
        let mut client = Client::new(&mut steam);
        client.initialize(480).unwrap();

        let snap = snapshot(client.user_stats().unwrap(), &defs, 480);
        assert_eq!(snap.achievements.len(), 2);
        assert_eq!(snap.unlocked_count(), 1);
        assert!(snap.protected);

        let win = snap.get("ACH_WIN").unwrap();
        assert_eq!(win.global_percent, Some(25.0));
        assert!(win.icon_url.ends_with("/480/ach_win.jpg"));
        assert!(snap.get("ACH_SECRET").unwrap().icon_url.ends_with("_gray.jpg"));
    }
}

mod appinfo_tests {
    use super::*;

    fn record(out: &mut Vec<u8>, app_id: u32, kind: &str) {
        let tree = KeyValue::root().with_child(
            KeyValue::node("appinfo").with_child(
                KeyValue::node("common")
                    .with_child(text("name", &format!("App Name {}", app_id)))
                    .with_child(text("type", kind)),
            ),
        );
        let tree = tree.write_binary();
        out.extend_from_slice(&app_id.to_le_bytes());
        out.extend_from_slice(&(40 + tree.len() as u32).to_le_bytes());
        out.extend_from_slice(&[0; 40]);
        out.extend_from_slice(&tree);
    }

    #[test]
    fn test_read_games_from_install() {
        let dir = tempfile::tempdir().unwrap();
        let mut data = Vec::new();
        data.extend_from_slice(&LEGACY_MAGICS[0].to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        record(&mut data, 220, "Game");
        record(&mut data, 7, "Tool");
        record(&mut data, 320, "Demo");
        data.extend_from_slice(&0u32.to_le_bytes());

        let path = appinfo::app_info_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, data).unwrap();

        let games = appinfo::read_games(dir.path()).unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].name, "App Name 220");
        assert_eq!(games[1].kind, AppType::Demo);
        assert!(games.iter().all(|g| !g.has_achievements));
    }

    #[test]
    fn test_truncated_header() {
        assert!(matches!(
            appinfo::parse_app_info(&LEGACY_MAGICS[0].to_le_bytes()),
            Err(Error::MalformedData { .. })
        ));
    }
}
