//! Immutable snapshot of one world's metadata.
//!
//! Records are produced by the scanner, replaced wholesale on re-scan and
//! never mutated in place. Identity is the folder name: two records are
//! equal iff their folder names match, regardless of content.

use anyhow::{Result, bail};
use chrono::{Local, TimeZone};
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone)]
pub struct WorldRecord {
    folder_name: String,
    world_name: Option<String>,
    folder_path: String,
    icon_path: Option<String>,
    game_mode: String,
    difficulty: String,
    version: String,
    seed: i64,
    hardcore: bool,
    cheats: bool,
    last_played: i64,
    creation_time: i64,
    folder_modified: i64,
    in_use: bool,
    size_bytes: u64,
    world_time: i64,
    day_time: i64,
    raining: bool,
    thundering: bool,
}

impl WorldRecord {
    pub fn builder() -> WorldRecordBuilder {
        WorldRecordBuilder::default()
    }

    pub fn folder_name(&self) -> &str {
        &self.folder_name
    }

    /// Display name; falls back to the folder name when the descriptor
    /// carried no level name.
    pub fn world_name(&self) -> &str {
        self.world_name.as_deref().unwrap_or(&self.folder_name)
    }

    pub fn folder_path(&self) -> &str {
        &self.folder_path
    }

    pub fn icon_path(&self) -> Option<&str> {
        self.icon_path.as_deref()
    }

    pub fn game_mode(&self) -> &str {
        &self.game_mode
    }

    pub fn difficulty(&self) -> &str {
        &self.difficulty
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn seed(&self) -> i64 {
        self.seed
    }

    pub fn hardcore(&self) -> bool {
        self.hardcore
    }

    pub fn cheats(&self) -> bool {
        self.cheats
    }

    pub fn last_played(&self) -> i64 {
        self.last_played
    }

    pub fn creation_time(&self) -> i64 {
        self.creation_time
    }

    pub fn folder_modified(&self) -> i64 {
        self.folder_modified
    }

    pub fn in_use(&self) -> bool {
        self.in_use
    }

    pub fn has_icon(&self) -> bool {
        self.icon_path.is_some()
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn world_time(&self) -> i64 {
        self.world_time
    }

    pub fn day_time(&self) -> i64 {
        self.day_time
    }

    pub fn raining(&self) -> bool {
        self.raining
    }

    pub fn thundering(&self) -> bool {
        self.thundering
    }

    pub fn formatted_last_played(&self) -> String {
        if self.last_played == 0 {
            return "Never".to_string();
        }
        format_millis(self.last_played, "%b %d, %Y %H:%M")
    }

    pub fn formatted_creation_time(&self) -> String {
        if self.creation_time == 0 {
            return "Unknown".to_string();
        }
        format_millis(self.creation_time, "%b %d, %Y")
    }

    pub fn formatted_size(&self) -> String {
        if self.size_bytes == 0 {
            return "Unknown".to_string();
        }

        let units = ["B", "KB", "MB", "GB"];
        let mut bytes = self.size_bytes as f64;
        let mut unit = 0;
        while bytes >= 1024.0 && unit < units.len() - 1 {
            bytes /= 1024.0;
            unit += 1;
        }
        format!("{:.1} {}", bytes, units[unit])
    }

    /// Game mode for display; hardcore worlds present as "Hardcore"
    /// instead of "Survival". Unrecognized raw modes pass through.
    pub fn game_mode_display(&self) -> String {
        match self.game_mode.to_lowercase().as_str() {
            "survival" => {
                if self.hardcore {
                    "Hardcore".to_string()
                } else {
                    "Survival".to_string()
                }
            }
            "creative" => "Creative".to_string(),
            "adventure" => "Adventure".to_string(),
            "spectator" => "Spectator".to_string(),
            _ => self.game_mode.clone(),
        }
    }

    pub fn difficulty_display(&self) -> String {
        match self.difficulty.to_lowercase().as_str() {
            "peaceful" => "Peaceful".to_string(),
            "easy" => "Easy".to_string(),
            "normal" => "Normal".to_string(),
            "hard" => "Hard".to_string(),
            _ => self.difficulty.clone(),
        }
    }

    pub fn weather_display(&self) -> &'static str {
        if self.thundering {
            "Thunderstorm"
        } else if self.raining {
            "Rain"
        } else {
            "Clear"
        }
    }

    /// In-game clock derived from the day-time tick counter. Tick 0 is
    /// 06:00, one tick is 3.6 in-game seconds.
    pub fn time_of_day_display(&self) -> String {
        let time = self.day_time.rem_euclid(24000);
        let hours = ((time + 6000) / 1000) % 24;
        let minutes = ((time + 6000) % 1000) * 60 / 1000;
        format!("{hours:02}:{minutes:02}")
    }

    pub fn status_display(&self) -> &'static str {
        if self.in_use { "In Use" } else { "Available" }
    }
}

impl PartialEq for WorldRecord {
    fn eq(&self, other: &Self) -> bool {
        self.folder_name == other.folder_name
    }
}

impl Eq for WorldRecord {}

impl Hash for WorldRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folder_name.hash(state);
    }
}

pub(crate) fn format_millis(millis: i64, fmt: &str) -> String {
    match Local.timestamp_millis_opt(millis).single() {
        Some(dt) => dt.format(fmt).to_string(),
        None => "Unknown".to_string(),
    }
}

/// Staged construction for [`WorldRecord`]; `build` validates that the
/// identity fields are present. Counters and timestamps are clamped to
/// zero, the convention for "unknown/never".
#[derive(Debug, Clone)]
pub struct WorldRecordBuilder {
    folder_name: String,
    world_name: Option<String>,
    folder_path: String,
    icon_path: Option<String>,
    game_mode: String,
    difficulty: String,
    version: String,
    seed: i64,
    hardcore: bool,
    cheats: bool,
    last_played: i64,
    creation_time: i64,
    folder_modified: i64,
    in_use: bool,
    size_bytes: u64,
    world_time: i64,
    day_time: i64,
    raining: bool,
    thundering: bool,
}

impl Default for WorldRecordBuilder {
    fn default() -> Self {
        Self {
            folder_name: String::new(),
            world_name: None,
            folder_path: String::new(),
            icon_path: None,
            game_mode: "Unknown".to_string(),
            difficulty: "Unknown".to_string(),
            version: "Unknown".to_string(),
            seed: 0,
            hardcore: false,
            cheats: false,
            last_played: 0,
            creation_time: 0,
            folder_modified: 0,
            in_use: false,
            size_bytes: 0,
            world_time: 0,
            day_time: 0,
            raining: false,
            thundering: false,
        }
    }
}

impl WorldRecordBuilder {
    pub fn folder_name(mut self, v: impl Into<String>) -> Self {
        self.folder_name = v.into();
        self
    }

    pub fn world_name(mut self, v: impl Into<String>) -> Self {
        self.world_name = Some(v.into());
        self
    }

    pub fn folder_path(mut self, v: impl Into<String>) -> Self {
        self.folder_path = v.into();
        self
    }

    pub fn icon_path(mut self, v: impl Into<String>) -> Self {
        self.icon_path = Some(v.into());
        self
    }

    pub fn game_mode(mut self, v: impl Into<String>) -> Self {
        self.game_mode = v.into();
        self
    }

    pub fn difficulty(mut self, v: impl Into<String>) -> Self {
        self.difficulty = v.into();
        self
    }

    pub fn version(mut self, v: impl Into<String>) -> Self {
        self.version = v.into();
        self
    }

    pub fn seed(mut self, v: i64) -> Self {
        self.seed = v;
        self
    }

    pub fn hardcore(mut self, v: bool) -> Self {
        self.hardcore = v;
        self
    }

    pub fn cheats(mut self, v: bool) -> Self {
        self.cheats = v;
        self
    }

    pub fn last_played(mut self, v: i64) -> Self {
        self.last_played = v.max(0);
        self
    }

    pub fn creation_time(mut self, v: i64) -> Self {
        self.creation_time = v.max(0);
        self
    }

    pub fn folder_modified(mut self, v: i64) -> Self {
        self.folder_modified = v.max(0);
        self
    }

    pub fn in_use(mut self, v: bool) -> Self {
        self.in_use = v;
        self
    }

    pub fn size_bytes(mut self, v: u64) -> Self {
        self.size_bytes = v;
        self
    }

    pub fn world_time(mut self, v: i64) -> Self {
        self.world_time = v.max(0);
        self
    }

    pub fn day_time(mut self, v: i64) -> Self {
        self.day_time = v.max(0);
        self
    }

    pub fn raining(mut self, v: bool) -> Self {
        self.raining = v;
        self
    }

    pub fn thundering(mut self, v: bool) -> Self {
        self.thundering = v;
        self
    }

    pub fn build(self) -> Result<WorldRecord> {
        if self.folder_name.is_empty() {
            bail!("folder name is required");
        }
        if self.folder_path.is_empty() {
            bail!("folder path is required");
        }

        Ok(WorldRecord {
            folder_name: self.folder_name,
            world_name: self.world_name,
            folder_path: self.folder_path,
            icon_path: self.icon_path,
            game_mode: self.game_mode,
            difficulty: self.difficulty,
            version: self.version,
            seed: self.seed,
            hardcore: self.hardcore,
            cheats: self.cheats,
            last_played: self.last_played,
            creation_time: self.creation_time,
            folder_modified: self.folder_modified,
            in_use: self.in_use,
            size_bytes: self.size_bytes,
            world_time: self.world_time,
            day_time: self.day_time,
            raining: self.raining,
            thundering: self.thundering,
        })
    }
}
