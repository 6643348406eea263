//! The map a save was made on, embedded whole in the save.

use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};
use skirmish_persist::file::{read_file, write_file_atomic};
use skirmish_persist::{GameVariant, PersistError, Persistable, StatePersister, persist_enum};
use tracing::{debug, warn};

use crate::skirmish::SkirmishGameSettings;

persist_enum! {
    #[derive(Default)]
    pub enum GameType {
        #[default]
        SinglePlayer = 0,
        Multiplayer = 1,
        Skirmish = 2,
    }
}

/// Where embedded maps live on disk. Not persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapStorage {
    pub user_data_root: PathBuf,
    /// Re-read a materialized map and compare digests with the saved bytes.
    pub verify: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameStateMap {
    pub map_path1: String,
    pub map_path2: String,
    pub game_type: GameType,
    pub next_object_id: u32,
    pub next_drawable_id: u32,
    pub unknown4: u32,
    pub unknown5: u32,
    pub unknown6: bool,
    /// Persisted only for [`GameType::Skirmish`].
    pub skirmish: SkirmishGameSettings,
    pub storage: MapStorage,
}

impl GameStateMap {
    /// Absolute location of the map file under the user data root.
    pub fn map_file_path(&self) -> Result<PathBuf, PersistError> {
        resolve_map_path(&self.storage.user_data_root, &self.map_path1)
    }

    fn write_map(&mut self, p: &mut StatePersister, path: &Path) -> Result<(), PersistError> {
        let mut bytes = read_file(path)?;
        debug!(path = %path.display(), bytes = bytes.len(), "embedding map");
        p.persist_span("MapData", &mut bytes)
    }

    fn read_map(&mut self, p: &mut StatePersister, path: &Path) -> Result<(), PersistError> {
        let mut bytes = vec![0; p.segment_remaining()? as usize];
        p.persist_span("MapData", &mut bytes)?;
        let digest = Sha256::digest(&bytes);

        if let Ok(existing) = std::fs::read(path)
            && Sha256::digest(&existing) != digest
        {
            warn!(path = %path.display(), "replacing a different map file with the saved one");
        }

        write_file_atomic(path, &bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "materialized embedded map");

        if self.storage.verify && Sha256::digest(read_file(path)?) != digest {
            return Err(PersistError::EmbeddedResourceMismatch {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }
}

impl Persistable for GameStateMap {
    fn persist(&mut self, p: &mut StatePersister) -> Result<(), PersistError> {
        p.persist_version(2)?;

        p.persist_ascii_string("MapPath1", &mut self.map_path1)?;
        p.persist_ascii_string("MapPath2", &mut self.map_path2)?;
        p.persist_enum("GameType", &mut self.game_type)?;

        let map_path = resolve_map_path(&self.storage.user_data_root, &self.map_path1).map_err(
            |err| match err {
                PersistError::InvalidValue { reason, .. } => PersistError::InvalidValue {
                    field: p.field_path("MapPath1"),
                    reason,
                },
                other => other,
            },
        )?;

        let bfme = p.game() >= GameVariant::Bfme;

        p.begin_segment("EmbeddedMap")?;
        if bfme {
            p.persist_u32("Unknown4", &mut self.unknown4)?;
            p.persist_u32("Unknown5", &mut self.unknown5)?;
        }
        if p.is_reading() {
            self.read_map(p, &map_path)?;
        } else {
            self.write_map(p, &map_path)?;
        }
        p.end_segment()?;

        p.persist_u32("NextObjectId", &mut self.next_object_id)?;
        p.persist_u32("NextDrawableId", &mut self.next_drawable_id)?;
        if bfme {
            p.persist_bool("Unknown6", &mut self.unknown6)?;
        }

        if self.game_type == GameType::Skirmish {
            p.persist_object("SkirmishGameSettings", &mut self.skirmish)?;
            if p.is_reading() {
                self.skirmish.map_name = self.map_path1.clone();
            }
        }
        Ok(())
    }
}

/// Join a stored map path onto `root`. Backslashes count as separators;
/// the path must be relative and stay inside `root`.
pub fn resolve_map_path(root: &Path, map_path: &str) -> Result<PathBuf, PersistError> {
    let invalid = |reason: &str| PersistError::InvalidValue {
        field: "MapPath1".into(),
        reason: format!("{reason}: {map_path:?}"),
    };

    let normalized = map_path.replace('\\', "/");
    if normalized.trim().is_empty() {
        return Err(invalid("empty map path"));
    }
    if normalized.contains(':') {
        return Err(invalid("drive or scheme prefix in map path"));
    }

    let relative = Path::new(&normalized);
    let mut resolved = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => return Err(invalid("parent directory in map path")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(invalid("absolute map path"));
            }
        }
    }
    if resolved == root {
        return Err(invalid("map path names no file"));
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_persist::test_utils::StreamBuilder;
    use skirmish_persist::{ErrorKind, read_from_bytes, write_to_bytes};

    fn stored_map(root: &Path, relative: &str, bytes: &[u8]) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    fn map_state(root: &Path) -> GameStateMap {
        GameStateMap {
            map_path1: "Save\\00000001.map".into(),
            map_path2: "maps/alpine assault/alpine assault.map".into(),
            next_object_id: 42,
            next_drawable_id: 77,
            storage: MapStorage {
                user_data_root: root.to_path_buf(),
                verify: true,
            },
            ..GameStateMap::default()
        }
    }

    // -----------------------------------------------------------------------
    // Path handling
    // -----------------------------------------------------------------------

    #[test]
    fn backslashes_are_separators() {
        let path = resolve_map_path(Path::new("/data"), "Save\\sub\\a.map").unwrap();
        assert_eq!(path, Path::new("/data/Save/sub/a.map"));
    }

    #[test]
    fn escaping_paths_are_rejected() {
        for bad in ["../evil.map", "Save\\..\\..\\x.map", "/etc/passwd", "C:\\x.map", "", "."] {
            let err = resolve_map_path(Path::new("/data"), bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Format, "{bad:?}");
        }
    }

    // -----------------------------------------------------------------------
    // Embedding
    // -----------------------------------------------------------------------

    #[test]
    fn map_bytes_travel_with_the_save() {
        let source = tempfile::tempdir().unwrap();
        stored_map(source.path(), "Save/00000001.map", b"MAP-BYTES");
        let mut state = map_state(source.path());
        let bytes = write_to_bytes(GameVariant::ZeroHour, &mut state).unwrap();

        let target = tempfile::tempdir().unwrap();
        let mut loaded = GameStateMap {
            storage: MapStorage {
                user_data_root: target.path().to_path_buf(),
                verify: true,
            },
            ..GameStateMap::default()
        };
        read_from_bytes(GameVariant::ZeroHour, bytes, &mut loaded).unwrap();

        assert_eq!(loaded.next_object_id, 42);
        assert_eq!(loaded.next_drawable_id, 77);
        assert_eq!(loaded.map_path2, state.map_path2);
        let written = std::fs::read(target.path().join("Save/00000001.map")).unwrap();
        assert_eq!(written, b"MAP-BYTES");
        assert!(!target.path().join("Save/00000001.map.tmp").exists());
    }

    #[test]
    fn bfme_prefixes_two_words_inside_the_segment() {
        let source = tempfile::tempdir().unwrap();
        stored_map(source.path(), "Save/00000001.map", b"abc");
        let mut state = map_state(source.path());
        state.unknown4 = 4;
        state.unknown5 = 5;
        state.unknown6 = true;
        let bytes = write_to_bytes(GameVariant::Bfme2, &mut state).unwrap();

        let header = 1 + 1 + state.map_path1.len() + 1 + state.map_path2.len() + 4;
        let segment_len = u32::from_le_bytes(bytes[header..header + 4].try_into().unwrap());
        assert_eq!(segment_len, 8 + 3);
        assert_eq!(&bytes[header + 4..header + 12], &[4, 0, 0, 0, 5, 0, 0, 0]);
        assert_eq!(&bytes[header + 12..header + 15], b"abc");
        assert_eq!(*bytes.last().unwrap(), 1);
    }

    #[test]
    fn missing_source_map_fails_the_save() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_to_bytes(GameVariant::Generals, &mut map_state(dir.path())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn skirmish_settings_take_the_map_name_from_the_path() {
        let source = tempfile::tempdir().unwrap();
        stored_map(source.path(), "Save/00000001.map", b"m");
        let mut state = map_state(source.path());
        state.game_type = GameType::Skirmish;
        state.skirmish.seed = 99;
        state.skirmish.map_name = "stale".into();
        let bytes = write_to_bytes(GameVariant::ZeroHour, &mut state).unwrap();

        let target = tempfile::tempdir().unwrap();
        let mut loaded = GameStateMap::default();
        loaded.storage.user_data_root = target.path().to_path_buf();
        read_from_bytes(GameVariant::ZeroHour, bytes, &mut loaded).unwrap();
        assert_eq!(loaded.game_type, GameType::Skirmish);
        assert_eq!(loaded.skirmish.seed, 99);
        assert_eq!(loaded.skirmish.map_name, "Save\\00000001.map");
    }

    #[test]
    fn traversal_in_stored_path_is_a_format_violation() {
        let bytes = StreamBuilder::new()
            .u8(2)
            .ascii("..\\..\\outside.map")
            .ascii("")
            .u32(0)
            .begin_segment()
            .raw(b"x")
            .end_segment()
            .u32(0)
            .u32(0)
            .build();
        let root = tempfile::tempdir().unwrap();
        let mut loaded = GameStateMap::default();
        loaded.storage.user_data_root = root.path().join("user");
        let err = read_from_bytes(GameVariant::Generals, bytes, &mut loaded).unwrap_err();
        assert!(matches!(&err, PersistError::InvalidValue { field, .. } if field == "MapPath1"));
        assert!(!root.path().join("outside.map").exists());
    }
}
