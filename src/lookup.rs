//! Flat `%token%` lookups against the live cache.
//!
//! This is the second, independently grown placeholder dialect: flat
//! underscore tokens with a `%...%` sentinel for anything unresolvable,
//! separate from the `{name}` template engine and intentionally not
//! unified with it. Tokens address worlds by 1-based index or by folder
//! name, aggregate lists, or the world count; anything the cache cannot
//! answer is retried against the exported JSON documents before giving
//! up.

use log::debug;
use parking_lot::Mutex;
use serde_json::Value;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::config;
use crate::scanner::WorldScanner;
use crate::world::WorldRecord;

const WORLD_PREFIX: &str = "worldfinder_world_";
const LIST_PREFIX: &str = "worldfinder_list_";
const COUNT_TOKEN: &str = "worldfinder_count";
const RECENT_LIMIT: usize = 5;

const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

pub struct NamedLookupParser {
    scanner: WorldScanner,
    documents: Vec<PathBuf>,
    refresh_interval: Duration,
    // One gate across all lookups bounds how often a parse may rescan.
    last_refresh: Mutex<Option<Instant>>,
}

impl NamedLookupParser {
    pub fn new(scanner: WorldScanner) -> anyhow::Result<Self> {
        Ok(Self::with_documents(
            scanner,
            config::lookup_documents()?,
            DEFAULT_REFRESH_INTERVAL,
        ))
    }

    pub fn with_documents(
        scanner: WorldScanner,
        documents: Vec<PathBuf>,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            scanner,
            documents,
            refresh_interval,
            last_refresh: Mutex::new(None),
        }
    }

    /// Resolve one token. Surrounding `%`/`{`/`}` decoration is stripped
    /// first; an unresolvable token comes back wrapped in `%...%`.
    pub fn parse(&self, placeholder: &str) -> String {
        if placeholder.is_empty() {
            return placeholder.to_string();
        }

        let clean: String = placeholder
            .chars()
            .filter(|c| !matches!(c, '%' | '{' | '}'))
            .collect();

        self.refresh_if_stale();

        let resolved = self
            .parse_world_index(&clean)
            .or_else(|| self.parse_world_name(&clean))
            .or_else(|| self.parse_list(&clean))
            .or_else(|| self.parse_count(&clean))
            .or_else(|| self.parse_from_documents(&clean));

        match resolved {
            Some(value) => value,
            None => format!("%{clean}%"),
        }
    }

    fn refresh_if_stale(&self) {
        let mut last = self.last_refresh.lock();
        let stale = last.is_none_or(|at| at.elapsed() >= self.refresh_interval);
        if stale {
            if let Err(err) = self.scanner.refresh_now() {
                debug!("lookup cache refresh failed: {err:#}");
            }
            *last = Some(Instant::now());
        }
    }

    /// `worldfinder_world_<index>_<field>`, 1-based index.
    fn parse_world_index(&self, token: &str) -> Option<String> {
        let rest = token.strip_prefix(WORLD_PREFIX)?;
        let (index, field) = rest.split_once('_')?;
        let index = index.parse::<usize>().ok()?.checked_sub(1)?;

        let worlds = self.scanner.get_all();
        world_property(worlds.get(index)?, field)
    }

    /// `worldfinder_world_<folder-name>_<field>`; the name segment cannot
    /// itself contain underscores.
    fn parse_world_name(&self, token: &str) -> Option<String> {
        let rest = token.strip_prefix(WORLD_PREFIX)?;
        let (name, field) = rest.split_once('_')?;
        if name.is_empty() || field.is_empty() {
            return None;
        }
        world_property(&self.scanner.get(name)?, field)
    }

    /// `worldfinder_list_<kind>`.
    fn parse_list(&self, token: &str) -> Option<String> {
        let kind = token.strip_prefix(LIST_PREFIX)?;
        let worlds = self.scanner.get_all();

        match kind.to_lowercase().as_str() {
            "names" => Some(join_names(&worlds, worlds.len())),
            "count" => Some(worlds.len().to_string()),
            "recent" => Some(join_names(&worlds, RECENT_LIMIT)),
            _ => None,
        }
    }

    fn parse_count(&self, token: &str) -> Option<String> {
        (token == COUNT_TOKEN).then(|| self.scanner.get_all().len().to_string())
    }

    /// Last resort: rewrite the token into a `worlds.<i>.<field>` path and
    /// walk the exported documents.
    fn parse_from_documents(&self, token: &str) -> Option<String> {
        let path = token_to_document_path(token)?;
        let parts: Vec<&str> = path.split('.').collect();

        for doc in &self.documents {
            if !doc.is_file() {
                continue;
            }
            let Ok(content) = std::fs::read_to_string(doc) else {
                continue;
            };
            let Ok(json) = serde_json::from_str::<Value>(&content) else {
                debug!("skipping unparsable document: {}", doc.display());
                continue;
            };
            if let Some(value) = walk(&json, &parts).and_then(stringify) {
                return Some(value);
            }
        }
        None
    }
}

/// `worldfinder_world_1_name` becomes `worlds.0.name`; a non-numeric
/// segment is kept as a name key.
fn token_to_document_path(token: &str) -> Option<String> {
    let rest = token.strip_prefix(WORLD_PREFIX)?;
    let (head, field) = rest.split_once('_')?;
    if head.is_empty() || field.is_empty() {
        return None;
    }

    match head.parse::<usize>() {
        Ok(index) => Some(format!("worlds.{}.{field}", index.checked_sub(1)?)),
        Err(_) => Some(format!("worlds.{head}.{field}")),
    }
}

fn walk<'a>(root: &'a Value, parts: &[&str]) -> Option<&'a Value> {
    let mut current = root;
    for part in parts {
        current = if let Ok(index) = part.parse::<usize>() {
            match current.as_array() {
                Some(array) => array.get(index)?,
                None => {
                    let array = current
                        .get("worlds")
                        .and_then(Value::as_array)
                        .or_else(|| current.get("cards").and_then(Value::as_array))?;
                    array.get(index)?
                }
            }
        } else {
            current.get(part)?
        };
    }
    Some(current)
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn join_names(worlds: &[WorldRecord], limit: usize) -> String {
    worlds
        .iter()
        .take(limit)
        .map(|w| w.world_name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn world_property(world: &WorldRecord, field: &str) -> Option<String> {
    let value = match field.to_lowercase().as_str() {
        "name" | "display_name" | "displayname" => world.world_name().to_string(),
        "folder" => world.folder_name().to_string(),
        "path" => world.folder_path().to_string(),
        "gamemode" => world.game_mode_display(),
        "gamemode_raw" | "gamemoderaw" => world.game_mode().to_string(),
        "difficulty" => world.difficulty_display(),
        "difficulty_raw" | "difficultyraw" => world.difficulty().to_string(),
        "version" => world.version().to_string(),
        "seed" => world.seed().to_string(),
        "hardcore" => {
            (if world.hardcore() { "Yes" } else { "No" }).to_string()
        }
        "cheats" | "cheats_enabled" => {
            (if world.cheats() { "Enabled" } else { "Disabled" }).to_string()
        }
        "last_played" | "lastplayed" => world.formatted_last_played(),
        "last_played_raw" | "lastplayedraw" => world.last_played().to_string(),
        "created" | "creation_time" => world.formatted_creation_time(),
        "created_raw" | "createdraw" => world.creation_time().to_string(),
        "size" | "size_formatted" => world.formatted_size(),
        "size_bytes" | "sizebytes" => world.size_bytes().to_string(),
        "in_use" | "inuse" | "status" => world.status_display().to_string(),
        "has_icon" | "hasicon" => {
            (if world.has_icon() { "Yes" } else { "No" }).to_string()
        }
        "weather" => world.weather_display().to_string(),
        "time_of_day" | "timeofday" => world.time_of_day_display(),
        "raining" => {
            (if world.raining() { "Yes" } else { "No" }).to_string()
        }
        "thundering" => {
            (if world.thundering() { "Yes" } else { "No" }).to_string()
        }
        "world_time" | "worldtime" => world.world_time().to_string(),
        "day_time" | "daytime" => world.day_time().to_string(),
        "icon_path" | "iconpath" => world.icon_path().unwrap_or_default().to_string(),
        _ => return None,
    };
    Some(value)
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

    fn write_world(root: &Path, folder: &str, level_name: &str, seed: i64, last_played: i64) {
        let dir = root.join(folder);
        std::fs::create_dir_all(&dir).unwrap();

        let mut data = Compound::new();
        data.insert("LevelName", Tag::String(level_name.to_string()));
        data.insert("RandomSeed", Tag::Long(seed));
        data.insert("GameType", Tag::Int(1));
        data.insert("LastPlayed", Tag::Long(last_played));
        let mut root_tag = Compound::new();
        root_tag.insert("Data", Tag::Compound(data));

        std::fs::write(
            dir.join(DESCRIPTOR_FILE),
            nbt::encode_root_gzipped(&root_tag).unwrap(),
        )
        .unwrap();
    }

    fn parser_over(root: &Path) -> NamedLookupParser {
        let scanner =
            WorldScanner::initialize(Some(root.to_path_buf()), ScannerConfig::default()).unwrap();
        NamedLookupParser::with_documents(scanner, Vec::new(), Duration::ZERO)
    }

    #[test]
    fn resolves_by_one_based_index() {
        let root = temp_root("lookup_index");
        write_world(&root, "alpha", "Alpha", 11, 2_000);
        write_world(&root, "beta", "Beta", 22, 1_000);

        let parser = parser_over(&root);
        // Index 1 is the most recently played world.
        assert_eq!(parser.parse("%worldfinder_world_1_name%"), "Alpha");
        assert_eq!(parser.parse("worldfinder_world_2_name"), "Beta");
        assert_eq!(parser.parse("worldfinder_world_1_seed"), "11");
        assert_eq!(parser.parse("worldfinder_world_1_gamemode"), "Creative");

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn resolves_by_folder_name() {
        let root = temp_root("lookup_name");
        write_world(&root, "alpha", "Alpha", 11, 2_000);

        let parser = parser_over(&root);
        assert_eq!(parser.parse("worldfinder_world_alpha_seed"), "11");
        assert_eq!(parser.parse("worldfinder_world_alpha_status"), "Available");

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn list_and_count_aggregates() {
        let root = temp_root("lookup_list");
        write_world(&root, "alpha", "Alpha", 1, 3_000);
        write_world(&root, "beta", "Beta", 2, 2_000);
        write_world(&root, "gamma", "Gamma", 3, 1_000);

        let parser = parser_over(&root);
        assert_eq!(parser.parse("worldfinder_count"), "3");
        assert_eq!(parser.parse("worldfinder_list_count"), "3");
        assert_eq!(parser.parse("worldfinder_list_names"), "Alpha, Beta, Gamma");

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn recent_list_is_capped() {
        let root = temp_root("lookup_recent");
        for i in 0..7i64 {
            write_world(
                &root,
                &format!("w{i}"),
                &format!("W{i}"),
                i,
                10_000 - i * 1_000,
            );
        }

        let parser = parser_over(&root);
        let recent = parser.parse("worldfinder_list_recent");
        assert_eq!(recent, "W0, W1, W2, W3, W4");

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn unresolvable_tokens_keep_percent_sentinels() {
        let root = temp_root("lookup_unresolved");
        write_world(&root, "alpha", "Alpha", 1, 1_000);

        let parser = parser_over(&root);
        assert_eq!(parser.parse("worldfinder_bogus"), "%worldfinder_bogus%");
        assert_eq!(
            parser.parse("worldfinder_world_99_name"),
            "%worldfinder_world_99_name%"
        );
        assert_eq!(
            parser.parse("worldfinder_world_alpha_bogusfield"),
            "%worldfinder_world_alpha_bogusfield%"
        );
        assert_eq!(parser.parse("worldfinder_list_sizes"), "%worldfinder_list_sizes%");

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn falls_back_to_exported_documents() {
        let base = temp_root("lookup_doc_fallback");
        let root = base.join("saves");
        std::fs::create_dir_all(&root).unwrap();

        let doc = base.join("worlddata.json");
        std::fs::write(
            &doc,
            r#"{"count":1,"worlds":[{"name":"FromDoc","seed":987}]}"#,
        )
        .unwrap();

        let scanner =
            WorldScanner::initialize(Some(root), ScannerConfig::default()).unwrap();
        let parser = NamedLookupParser::with_documents(scanner, vec![doc], Duration::ZERO);

        // The cache is empty, so the document answers.
        assert_eq!(parser.parse("worldfinder_world_1_name"), "FromDoc");
        assert_eq!(parser.parse("worldfinder_world_1_seed"), "987");
        assert_eq!(
            parser.parse("worldfinder_world_1_missing"),
            "%worldfinder_world_1_missing%"
        );

        let _ = std::fs::remove_dir_all(base);
    }

    #[test]
    fn refresh_gate_bounds_rescans() {
        let root = temp_root("lookup_gate");
        write_world(&root, "alpha", "Alpha", 1, 1_000);

        let scanner =
            WorldScanner::initialize(Some(root.clone()), ScannerConfig::default()).unwrap();
        let gated = NamedLookupParser::with_documents(
            scanner.clone(),
            Vec::new(),
            Duration::from_secs(3600),
        );
        assert_eq!(gated.parse("worldfinder_count"), "1");

        write_world(&root, "beta", "Beta", 2, 2_000);

        // Within the gate window no rescan happens, the new world stays
        // invisible to this parser.
        assert_eq!(gated.parse("worldfinder_count"), "1");

        let eager =
            NamedLookupParser::with_documents(scanner, Vec::new(), Duration::ZERO);
        assert_eq!(eager.parse("worldfinder_count"), "2");

        let _ = std::fs::remove_dir_all(root);
    }
}
