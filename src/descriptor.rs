//! Field extraction from a world folder's binary descriptor.
//!
//! Everything of interest lives under the descriptor's "Data" compound and
//! is looked up by tag name; a field that is absent simply leaves the
//! builder's default in place. A file that cannot be decoded at all is
//! logged and tolerated, so callers always get a builder back.

use ignore::WalkBuilder;
use log::{debug, warn};
use std::path::Path;

use crate::nbt;
use crate::world::WorldRecordBuilder;

/// Descriptor file name inside every world folder.
pub const DESCRIPTOR_FILE: &str = "level.dat";
/// Custom world icon, optional.
pub const ICON_FILE: &str = "icon.png";
/// Lock marker present while the world is open in the game.
pub const LOCK_FILE: &str = "session.lock";

// Save folders are shallow in practice; the cap only guards against
// pathological self-referential layouts.
const MAX_SIZE_DEPTH: usize = 16;

/// Populate `builder` with whatever fields the descriptor carries.
pub fn extract_world_data(level_dat: &Path, builder: WorldRecordBuilder) -> WorldRecordBuilder {
    let root = match nbt::read_compressed(level_dat) {
        Ok(root) => root,
        Err(err) => {
            warn!("failed to read descriptor {}: {err:#}", level_dat.display());
            return builder;
        }
    };

    let Some(data) = root.get_compound("Data").filter(|d| !d.is_empty()) else {
        warn!("no Data tag in descriptor: {}", level_dat.display());
        return builder;
    };

    let mut builder = builder;

    if let Some(name) = data.get_string("LevelName")
        && !name.trim().is_empty()
    {
        builder = builder.world_name(name);
    }

    if let Some(version) = data.get_compound("Version")
        && let Some(version_name) = version.get_string("Name")
    {
        builder = builder.version(version_name);
    }

    if let Some(seed) = data.get_long("RandomSeed") {
        builder = builder.seed(seed);
    }

    if let Some(game_type) = data.get_int("GameType") {
        builder = builder.game_mode(convert_game_type(game_type));
    }

    if let Some(difficulty) = data.get_byte("Difficulty") {
        builder = builder.difficulty(convert_difficulty(difficulty));
    }

    if let Some(hardcore) = data.get_bool("hardcore") {
        builder = builder.hardcore(hardcore);
    }

    if let Some(allow_commands) = data.get_bool("allowCommands") {
        builder = builder.cheats(allow_commands);
    }

    if let Some(last_played) = data.get_long("LastPlayed") {
        builder = builder.last_played(last_played);
    }

    if let Some(creation_time) = data.get_long("creationTime") {
        builder = builder.creation_time(creation_time);
    }

    if let Some(world_time) = data.get_long("Time") {
        builder = builder.world_time(world_time);
    }

    if let Some(day_time) = data.get_long("DayTime") {
        builder = builder.day_time(day_time);
    }

    if let Some(raining) = data.get_bool("raining") {
        builder = builder.raining(raining);
    }

    if let Some(thundering) = data.get_bool("thundering") {
        builder = builder.thundering(thundering);
    }

    debug!("extracted world data from {}", level_dat.display());
    builder
}

fn convert_game_type(game_type: i32) -> &'static str {
    match game_type {
        0 => "Survival",
        1 => "Creative",
        2 => "Adventure",
        3 => "Spectator",
        _ => "Unknown",
    }
}

fn convert_difficulty(difficulty: i8) -> &'static str {
    match difficulty {
        0 => "Peaceful",
        1 => "Easy",
        2 => "Normal",
        3 => "Hard",
        _ => "Unknown",
    }
}

/// Total size of all files under `dir`, recursively. Filesystem errors
/// count as zero rather than failing the scan.
pub fn dir_size(dir: &Path) -> u64 {
    let walker = WalkBuilder::new(dir)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .follow_links(false)
        .max_depth(Some(MAX_SIZE_DEPTH))
        .build();

    let mut total = 0u64;
    for entry in walker.flatten() {
        if entry.file_type().is_some_and(|t| t.is_file())
            && let Ok(meta) = entry.metadata()
        {
            total += meta.len();
        }
    }
    total
}
