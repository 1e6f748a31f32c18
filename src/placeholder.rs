//! Template resolution for `{placeholder}` tokens.
//!
//! Tokens are single-level, case-insensitive names between braces; there
//! is no nesting and no escaping, and anything that is not a well-formed
//! token passes through untouched. Resolution is asymmetric: without a
//! record every token is rewritten to a visible `[name]` marker so
//! template authors can see their tokens, while with a record an unknown
//! name keeps its original `{name}` form.

use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config;
use crate::world::{WorldRecord, format_millis};

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

const DATE_FORMAT: &str = "%b %d, %Y";
const TIME_FORMAT: &str = "%H:%M";
const DATETIME_FORMAT: &str = "%b %d, %Y %H:%M";
const SHORT_DATE_FORMAT: &str = "%m/%d/%y";

/// Every name the engine can resolve. Kept in lock-step with
/// `build_placeholder_map`; the catalog test enforces the pairing.
pub const KNOWN_PLACEHOLDERS: &[&str] = &[
    // Basic world info
    "world_name",
    "folder_name",
    "folder_path",
    // Game settings
    "game_mode",
    "game_mode_display",
    "difficulty",
    "difficulty_display",
    "version",
    "hardcore",
    "hardcore_symbol",
    "cheats",
    "cheats_symbol",
    // Seed
    "seed",
    "seed_short",
    // Last played timestamps
    "last_played",
    "last_played_date",
    "last_played_time",
    "last_played_datetime",
    "last_played_short",
    "last_played_formatted",
    // Creation timestamps
    "creation_time",
    "creation_date",
    "creation_datetime",
    "creation_formatted",
    // Folder modified
    "folder_modified",
    "folder_modified_datetime",
    "folder_modified_relative",
    // Status
    "in_use",
    "in_use_symbol",
    "has_icon",
    "icon_symbol",
    // World size
    "world_size",
    "world_size_formatted",
    "world_size_mb",
    "world_size_gb",
    // Time & weather
    "world_time",
    "day_time",
    "time_of_day",
    "weather",
    "weather_symbol",
    "raining",
    "raining_symbol",
    "thundering",
    "thundering_symbol",
    // File system & images
    "icon_path",
    "world_screenshot",
    "world_icon",
    "world_image",
    "game_mode_icon",
    "status_icon",
    // Computed values
    "world_age",
    "days_since_played",
    "world_type",
    "play_status",
    // Visual symbols
    "status_dot",
    "mode_symbol",
    "difficulty_symbol",
];

/// Resolves `{name}` tokens against one world record.
#[derive(Debug, Clone)]
pub struct PlaceholderEngine {
    icons_dir: PathBuf,
    default_icon: String,
}

impl PlaceholderEngine {
    /// Engine over the standard asset locations.
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self::with_paths(
            config::icons_dir()?,
            config::DEFAULT_WORLD_ICON.to_string(),
        ))
    }

    /// Engine with explicit icon locations, for embedding and tests.
    pub fn with_paths(icons_dir: PathBuf, default_icon: String) -> Self {
        Self {
            icons_dir,
            default_icon,
        }
    }

    /// Replace every resolvable token in `text`. Without a record all
    /// tokens become `[name]` markers; with a record unknown names stay
    /// as their literal `{name}` form.
    pub fn resolve(&self, text: &str, world: Option<&WorldRecord>) -> String {
        if text.is_empty() || !text.contains('{') {
            return text.to_string();
        }

        match world {
            None => rewrite(text, |name| Some(format!("[{name}]"))),
            Some(world) => {
                let map = self.build_placeholder_map(world);
                rewrite(text, |name| map.get(&name.to_lowercase()).cloned())
            }
        }
    }

    pub fn known_placeholders(&self) -> &'static [&'static str] {
        KNOWN_PLACEHOLDERS
    }

    fn build_placeholder_map(&self, world: &WorldRecord) -> HashMap<String, String> {
        let now = now_ms();
        let mut map = HashMap::new();
        let mut put = |name: &str, value: String| {
            map.insert(name.to_string(), value);
        };

        // Basic world info
        put("world_name", world.world_name().to_string());
        put("folder_name", world.folder_name().to_string());
        put("folder_path", world.folder_path().to_string());

        // Game settings
        put("game_mode", world.game_mode().to_string());
        put("game_mode_display", world.game_mode_display());
        put("difficulty", world.difficulty().to_string());
        put("difficulty_display", world.difficulty_display());
        put("version", world.version().to_string());
        put("hardcore", yes_no(world.hardcore()));
        put(
            "hardcore_symbol",
            (if world.hardcore() { "💀" } else { "❤" }).to_string(),
        );
        put(
            "cheats",
            (if world.cheats() { "Enabled" } else { "Disabled" }).to_string(),
        );
        put(
            "cheats_symbol",
            (if world.cheats() { "⚡" } else { "🚫" }).to_string(),
        );

        // Seed
        put("seed", world.seed().to_string());
        put("seed_short", format_seed_short(world.seed()));

        // Last played
        put(
            "last_played",
            format_relative(world.last_played(), now, 7 * DAY_MS),
        );
        put("last_played_date", format_date(world.last_played()));
        put("last_played_time", format_time(world.last_played()));
        put(
            "last_played_datetime",
            format_datetime(world.last_played()),
        );
        put(
            "last_played_short",
            format_date_short(world.last_played()),
        );
        put("last_played_formatted", world.formatted_last_played());

        // Creation time
        put("creation_time", format_date(world.creation_time()));
        put("creation_date", format_date(world.creation_time()));
        put(
            "creation_datetime",
            format_datetime(world.creation_time()),
        );
        put("creation_formatted", world.formatted_creation_time());

        // Folder modified
        put("folder_modified", format_date(world.folder_modified()));
        put(
            "folder_modified_datetime",
            format_datetime(world.folder_modified()),
        );
        put(
            "folder_modified_relative",
            format_relative(world.folder_modified(), now, 30 * DAY_MS),
        );

        // Status
        put("in_use", yes_no(world.in_use()));
        put(
            "in_use_symbol",
            (if world.in_use() { "●" } else { "○" }).to_string(),
        );
        put("has_icon", yes_no(world.has_icon()));
        put(
            "icon_symbol",
            (if world.has_icon() { "🖼" } else { "📷" }).to_string(),
        );

        // World size
        put("world_size", world.size_bytes().to_string());
        put("world_size_formatted", world.formatted_size());
        put("world_size_mb", format_size_mb(world.size_bytes()));
        put("world_size_gb", format_size_gb(world.size_bytes()));

        // Time & weather
        put("world_time", world.world_time().to_string());
        put("day_time", world.day_time().to_string());
        put("time_of_day", world.time_of_day_display());
        put("weather", world.weather_display().to_string());
        put("weather_symbol", weather_symbol(world).to_string());
        put("raining", yes_no(world.raining()));
        put(
            "raining_symbol",
            (if world.raining() { "🌧" } else { "☀" }).to_string(),
        );
        put("thundering", yes_no(world.thundering()));
        put(
            "thundering_symbol",
            (if world.thundering() { "⛈" } else { "🌤" }).to_string(),
        );

        // File system & images
        put(
            "icon_path",
            world.icon_path().unwrap_or("No Icon").to_string(),
        );
        put("world_screenshot", self.world_screenshot(world));
        put("world_icon", self.world_icon(world));
        put("world_image", self.world_image(world));
        put("game_mode_icon", self.game_mode_icon(world));
        put("status_icon", self.status_icon(world, now));

        // Computed values
        put("world_age", world_age(world.creation_time(), now));
        put(
            "days_since_played",
            days_since_played(world.last_played(), now),
        );
        put("world_type", world_type(world));
        put("play_status", play_status(world, now));

        // Visual symbols
        put(
            "status_dot",
            (if world.in_use() { "🟢" } else { "🔴" }).to_string(),
        );
        put("mode_symbol", mode_symbol(world.game_mode()).to_string());
        put(
            "difficulty_symbol",
            difficulty_symbol(world.difficulty()).to_string(),
        );

        map
    }

    // ---- image selection chain ----
    // Each tier verifies on-disk existence and falls through silently.

    /// Auto-generated screenshot inside the world folder, else the default
    /// resource.
    fn world_screenshot(&self, world: &WorldRecord) -> String {
        let screenshot = Path::new(world.folder_path()).join(crate::descriptor::ICON_FILE);
        if screenshot.is_file() {
            return screenshot.to_string_lossy().into_owned();
        }
        self.default_icon.clone()
    }

    /// Explicit custom icon when it exists, else the screenshot tier.
    fn world_icon(&self, world: &WorldRecord) -> String {
        if let Some(icon) = world.icon_path()
            && Path::new(icon).is_file()
        {
            return icon.to_string();
        }
        self.world_screenshot(world)
    }

    /// Best available image: custom icon, screenshot, then the game-mode
    /// resource icon.
    fn world_image(&self, world: &WorldRecord) -> String {
        if let Some(icon) = world.icon_path()
            && Path::new(icon).is_file()
        {
            return icon.to_string();
        }

        let screenshot = self.world_screenshot(world);
        if screenshot != self.default_icon {
            return screenshot;
        }

        self.game_mode_icon(world)
    }

    fn game_mode_icon(&self, world: &WorldRecord) -> String {
        let mode = world.game_mode().to_lowercase();
        self.resource_icon(&format!("gamemode_{mode}.png"))
    }

    fn status_icon(&self, world: &WorldRecord, now: i64) -> String {
        let name = if world.in_use() {
            "world_active.png"
        } else if world.hardcore() {
            "world_hardcore.png"
        } else {
            let days_since = (now - world.last_played()) / DAY_MS;
            if days_since < 1 {
                "world_recent.png"
            } else if days_since < 7 {
                "world_week.png"
            } else {
                "world_old.png"
            }
        };
        self.resource_icon(name)
    }

    fn resource_icon(&self, name: &str) -> String {
        let path = self.icons_dir.join(name);
        if path.is_file() {
            return path.to_string_lossy().into_owned();
        }
        debug!("resource icon not found, using default: {name}");
        self.default_icon.clone()
    }
}

/// Whether `text` contains at least one well-formed token.
pub fn contains_placeholders(text: &str) -> bool {
    !find_placeholders(text).is_empty()
}

/// All token names in `text`, lowercased, first occurrence order, no
/// duplicates.
pub fn find_placeholders(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    rewrite(text, |name| {
        let lower = name.to_lowercase();
        if !names.contains(&lower) {
            names.push(lower);
        }
        None
    });
    names
}

/// Scan `text` for `{name}` tokens and substitute via `f`; `None` keeps
/// the token literal. A `{` that never closes, closes empty or runs into
/// another `{` is not a token.
fn rewrite(text: &str, mut f: impl FnMut(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while let Some(rel) = text[i..].find('{') {
        let open = i + rel;
        out.push_str(&text[i..open]);

        match text[open + 1..].find(['{', '}']) {
            Some(rel2) if text.as_bytes()[open + 1 + rel2] == b'}' && rel2 > 0 => {
                let close = open + 1 + rel2;
                let name = &text[open + 1..close];
                match f(name) {
                    Some(replacement) => out.push_str(&replacement),
                    None => out.push_str(&text[open..=close]),
                }
                i = close + 1;
            }
            Some(_) => {
                // Empty braces or a nested open: first brace is literal.
                out.push('{');
                i = open + 1;
            }
            None => {
                out.push_str(&text[open..]);
                return out;
            }
        }
    }

    out.push_str(&text[i..]);
    out
}

fn yes_no(v: bool) -> String {
    (if v { "Yes" } else { "No" }).to_string()
}

fn format_date(millis: i64) -> String {
    if millis > 0 {
        format_millis(millis, DATE_FORMAT)
    } else {
        "Never".to_string()
    }
}

fn format_time(millis: i64) -> String {
    if millis > 0 {
        format_millis(millis, TIME_FORMAT)
    } else {
        "Never".to_string()
    }
}

fn format_datetime(millis: i64) -> String {
    if millis > 0 {
        format_millis(millis, DATETIME_FORMAT)
    } else {
        "Never".to_string()
    }
}

fn format_date_short(millis: i64) -> String {
    if millis > 0 {
        format_millis(millis, SHORT_DATE_FORMAT)
    } else {
        "Never".to_string()
    }
}

/// Relative form up to `absolute_after`, then the absolute date.
fn format_relative(millis: i64, now: i64, absolute_after: i64) -> String {
    if millis <= 0 {
        return "Never".to_string();
    }

    let diff = now - millis;
    if diff < MINUTE_MS {
        return "Just now".to_string();
    }
    if diff < HOUR_MS {
        return format!("{}m ago", diff / MINUTE_MS);
    }
    if diff < DAY_MS {
        return format!("{}h ago", diff / HOUR_MS);
    }
    if diff < absolute_after {
        return format!("{}d ago", diff / DAY_MS);
    }
    format_millis(millis, DATE_FORMAT)
}

fn format_seed_short(seed: i64) -> String {
    let digits = seed.unsigned_abs().to_string();
    if digits.len() > 8 {
        format!("{}...", &digits[..8])
    } else {
        digits
    }
}

fn format_size_mb(bytes: u64) -> String {
    if bytes == 0 {
        return "0 MB".to_string();
    }
    format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
}

fn format_size_gb(bytes: u64) -> String {
    if bytes == 0 {
        return "0 GB".to_string();
    }
    format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
}

/// Age bucketing at day granularity: months are days/30, years days/365.
fn world_age(creation_time: i64, now: i64) -> String {
    if creation_time <= 0 {
        return "Unknown".to_string();
    }

    let days = (now - creation_time) / DAY_MS;
    if days == 0 {
        "Today".to_string()
    } else if days == 1 {
        "1 day".to_string()
    } else if days < 30 {
        format!("{days} days")
    } else if days < 365 {
        format!("{} months", days / 30)
    } else {
        format!("{} years", days / 365)
    }
}

fn days_since_played(last_played: i64, now: i64) -> String {
    if last_played <= 0 {
        return "Never".to_string();
    }

    let days = (now - last_played) / DAY_MS;
    match days {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        _ => format!("{days} days ago"),
    }
}

fn world_type(world: &WorldRecord) -> String {
    if world.hardcore() {
        "Hardcore".to_string()
    } else {
        world.game_mode().to_string()
    }
}

fn play_status(world: &WorldRecord, now: i64) -> String {
    if world.in_use() {
        return "Currently Playing".to_string();
    }
    if world.last_played() <= 0 {
        return "Never Played".to_string();
    }

    let diff = now - world.last_played();
    if diff < DAY_MS {
        "Recently Played".to_string()
    } else if diff < 7 * DAY_MS {
        "Played This Week".to_string()
    } else if diff < 30 * DAY_MS {
        "Played This Month".to_string()
    } else {
        "Not Recently Played".to_string()
    }
}

fn weather_symbol(world: &WorldRecord) -> &'static str {
    if world.thundering() {
        "⛈"
    } else if world.raining() {
        "🌧"
    } else {
        "☀"
    }
}

fn mode_symbol(game_mode: &str) -> &'static str {
    match game_mode.to_lowercase().as_str() {
        "survival" => "⚔",
        "creative" => "🎨",
        "adventure" => "🗺",
        "spectator" => "👻",
        _ => "❓",
    }
}

fn difficulty_symbol(difficulty: &str) -> &'static str {
    match difficulty.to_lowercase().as_str() {
        "peaceful" => "🕊",
        "easy" => "😊",
        "normal" => "😐",
        "hard" => "😰",
        _ => "❓",
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
