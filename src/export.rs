//! Snapshot export for external consumers.
//!
//! Serializes the cache to a JSON document with a fixed key set: every
//! field appears in both display and raw machine-readable form, absent
//! values are emitted as empty string or zero, never omitted. Writes go
//! through a same-directory temp file plus rename so a reader can never
//! observe a partially written document.

use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::scanner::WorldScanner;
use crate::world::WorldRecord;

pub const SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub count: usize,
    pub last_updated: String,
    pub schema_version: String,
    pub worlds: Vec<WorldEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldEntry {
    pub index: usize,
    pub name: String,
    pub folder: String,
    pub path: String,
    pub gamemode: String,
    pub gamemode_raw: String,
    pub difficulty: String,
    pub difficulty_raw: String,
    pub version: String,
    pub seed: i64,
    pub hardcore: bool,
    pub cheats: bool,
    pub last_played: String,
    pub last_played_raw: i64,
    pub created: String,
    pub created_raw: i64,
    pub in_use: bool,
    pub status: String,
    pub has_icon: bool,
    pub size: String,
    pub size_bytes: u64,
    pub weather: String,
    pub time_of_day: String,
    pub raining: bool,
    pub thundering: bool,
    pub world_time: i64,
    pub day_time: i64,
    pub icon_path: String,
}

impl WorldEntry {
    pub fn from_record(index: usize, world: &WorldRecord) -> Self {
        Self {
            index,
            name: world.world_name().to_string(),
            folder: world.folder_name().to_string(),
            path: world.folder_path().to_string(),
            gamemode: world.game_mode_display(),
            gamemode_raw: world.game_mode().to_string(),
            difficulty: world.difficulty_display(),
            difficulty_raw: world.difficulty().to_string(),
            version: world.version().to_string(),
            seed: world.seed(),
            hardcore: world.hardcore(),
            cheats: world.cheats(),
            last_played: world.formatted_last_played(),
            last_played_raw: world.last_played(),
            created: world.formatted_creation_time(),
            created_raw: world.creation_time(),
            in_use: world.in_use(),
            status: world.status_display().to_string(),
            has_icon: world.has_icon(),
            size: world.formatted_size(),
            size_bytes: world.size_bytes(),
            weather: world.weather_display().to_string(),
            time_of_day: world.time_of_day_display(),
            raining: world.raining(),
            thundering: world.thundering(),
            world_time: world.world_time(),
            day_time: world.day_time(),
            icon_path: world.icon_path().unwrap_or_default().to_string(),
        }
    }
}

pub fn build_document(worlds: &[WorldRecord]) -> ExportDocument {
    ExportDocument {
        count: worlds.len(),
        last_updated: Utc::now().to_rfc3339(),
        schema_version: SCHEMA_VERSION.to_string(),
        worlds: worlds
            .iter()
            .enumerate()
            .map(|(i, w)| WorldEntry::from_record(i, w))
            .collect(),
    }
}

/// Writes cache snapshots to the export file, on demand or on a schedule.
#[derive(Clone)]
pub struct Exporter {
    scanner: WorldScanner,
    path: PathBuf,
}

enum Msg {
    Stop,
}

impl Exporter {
    pub fn new(scanner: WorldScanner, path: PathBuf) -> Self {
        Self { scanner, path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Export the current snapshot. On failure the previously exported
    /// file is left untouched.
    pub fn export(&self) -> Result<usize> {
        let worlds = self.scanner.get_all();
        let document = build_document(&worlds);
        let json = serde_json::to_string_pretty(&document)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create export directory: {}", parent.display())
            })?;
        }

        let mut tmp_os = self.path.as_os_str().to_os_string();
        tmp_os.push(".tmp");
        let tmp = PathBuf::from(tmp_os);

        std::fs::write(&tmp, json)
            .with_context(|| format!("failed to write export temp file: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path).with_context(|| {
            format!("failed to replace export file: {}", self.path.display())
        })?;

        debug!(
            "exported data for {} worlds to {}",
            document.count,
            self.path.display()
        );
        Ok(document.count)
    }

    /// Synchronous export, for callers that need the document current
    /// right now.
    pub fn force_export(&self) -> Result<usize> {
        self.export()
    }

    /// Start the recurring export. Independent of the scan schedule; a
    /// slow export never delays the next scan pass.
    pub fn spawn(&self, interval: Duration) -> ExporterTask {
        let (tx, rx) = std::sync::mpsc::channel::<Msg>();
        let (done_tx, done_rx) = std::sync::mpsc::channel::<()>();

        let exporter = self.clone();
        let handle = std::thread::spawn(move || {
            loop {
                match rx.recv_timeout(interval) {
                    Ok(Msg::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {
                        if let Err(err) = exporter.export() {
                            warn!("export pass failed: {err:#}");
                        }
                    }
                }
            }
            // Final export so consumers see the last state.
            if let Err(err) = exporter.export() {
                warn!("final export failed: {err:#}");
            }
            let _ = done_tx.send(());
        });

        ExporterTask {
            tx,
            done_rx,
            handle: Some(handle),
        }
    }
}

/// Owns the background export scheduler.
pub struct ExporterTask {
    tx: Sender<Msg>,
    done_rx: Receiver<()>,
    handle: Option<JoinHandle<()>>,
}

impl ExporterTask {
    pub fn shutdown(mut self, wait: Duration) {
        let _ = self.tx.send(Msg::Stop);
        match self.done_rx.recv_timeout(wait) {
            Ok(()) => {
                if let Some(handle) = self.handle.take() {
                    let _ = handle.join();
                }
            }
            Err(_) => {
                warn!("export scheduler did not stop within {wait:?}, detaching");
                self.handle.take();
            }
        }
        info!("world exporter shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DESCRIPTOR_FILE;
    use crate::nbt::{self, Compound, Tag};
    use crate::scanner::ScannerConfig;
    use std::path::Path;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_root(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "world_finder_test_{}_{}_{}",
            std::process::id(),
            nanos,
            name
        ))
    }

    fn write_world(root: &Path, folder: &str, seed: i64, last_played: i64) {
        let dir = root.join(folder);
        std::fs::create_dir_all(&dir).unwrap();

        let mut data = Compound::new();
        data.insert("LevelName", Tag::String(folder.to_uppercase()));
        data.insert("RandomSeed", Tag::Long(seed));
        data.insert("GameType", Tag::Int(0));
        data.insert("LastPlayed", Tag::Long(last_played));
        data.insert("Time", Tag::Long(5_000));
        data.insert("DayTime", Tag::Long(1_000));
        let mut root_tag = Compound::new();
        root_tag.insert("Data", Tag::Compound(data));

        std::fs::write(
            dir.join(DESCRIPTOR_FILE),
            nbt::encode_root_gzipped(&root_tag).unwrap(),
        )
        .unwrap();
    }

    fn scanner_over(root: &Path) -> WorldScanner {
        WorldScanner::initialize(Some(root.to_path_buf()), ScannerConfig::default()).unwrap()
    }

    #[test]
    fn export_round_trips_raw_fields_exactly() -> Result<()> {
        let base = temp_root("export_roundtrip");
        let root = base.join("saves");
        write_world(&root, "alpha", -9_876_543_210, 1_700_000_000_000);
        write_world(&root, "beta", 42, 1_600_000_000_000);

        let scanner = scanner_over(&root);
        let out = base.join("out").join("worlddata.json");
        let exporter = Exporter::new(scanner.clone(), out.clone());
        let count = exporter.export()?;
        assert_eq!(count, 2);

        let parsed: ExportDocument = serde_json::from_str(&std::fs::read_to_string(&out)?)?;
        assert_eq!(parsed.count, scanner.get_all().len());
        assert_eq!(parsed.schema_version, SCHEMA_VERSION);

        for (i, entry) in parsed.worlds.iter().enumerate() {
            let record = scanner.get(&entry.folder).unwrap();
            assert_eq!(entry.index, i);
            assert_eq!(entry.seed, record.seed());
            assert_eq!(entry.last_played_raw, record.last_played());
            assert_eq!(entry.created_raw, record.creation_time());
            assert_eq!(entry.size_bytes, record.size_bytes());
            assert_eq!(entry.world_time, record.world_time());
            assert_eq!(entry.day_time, record.day_time());
        }

        // Most recently played first.
        assert_eq!(parsed.worlds[0].folder, "alpha");

        let _ = std::fs::remove_dir_all(base);
        Ok(())
    }

    #[test]
    fn document_keys_are_schema_stable() -> Result<()> {
        let base = temp_root("export_schema");
        let root = base.join("saves");
        write_world(&root, "alpha", 1, 0);

        let exporter = Exporter::new(scanner_over(&root), base.join("worlddata.json"));
        exporter.export()?;

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(exporter.path())?)?;
        for key in ["count", "lastUpdated", "schemaVersion", "worlds"] {
            assert!(value.get(key).is_some(), "missing top-level key {key}");
        }

        let world = &value["worlds"][0];
        for key in [
            "index",
            "name",
            "folder",
            "path",
            "gamemode",
            "gamemodeRaw",
            "difficulty",
            "difficultyRaw",
            "version",
            "seed",
            "hardcore",
            "cheats",
            "lastPlayed",
            "lastPlayedRaw",
            "created",
            "createdRaw",
            "inUse",
            "status",
            "hasIcon",
            "size",
            "sizeBytes",
            "weather",
            "timeOfDay",
            "raining",
            "thundering",
            "worldTime",
            "dayTime",
            "iconPath",
        ] {
            assert!(world.get(key).is_some(), "missing world key {key}");
        }

        // Absent icon is an empty string, never a missing key.
        assert_eq!(world["iconPath"], serde_json::Value::String(String::new()));
        assert_eq!(world["lastPlayed"], "Never");

        let _ = std::fs::remove_dir_all(base);
        Ok(())
    }

    #[test]
    fn failed_export_leaves_previous_file_intact() -> Result<()> {
        let base = temp_root("export_atomic");
        let root = base.join("saves");
        write_world(&root, "alpha", 7, 100);

        let out = base.join("worlddata.json");
        let exporter = Exporter::new(scanner_over(&root), out.clone());
        exporter.export()?;
        let good = std::fs::read_to_string(&out)?;

        // A directory squatting on the temp path makes the write fail.
        let mut tmp_os = out.as_os_str().to_os_string();
        tmp_os.push(".tmp");
        std::fs::create_dir_all(PathBuf::from(tmp_os))?;

        assert!(exporter.export().is_err());
        assert_eq!(std::fs::read_to_string(&out)?, good);

        let _ = std::fs::remove_dir_all(base);
        Ok(())
    }
}
