use serde_json::Value;
use std::path::Path;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use world_finder::nbt::{self, Compound, Tag};

fn temp_dir(name: &str) -> std::path::PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!(
        "world_finder_it_{}_{}_{}",
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
    data.insert("GameType", Tag::Int(0));
    data.insert("Difficulty", Tag::Byte(2));
    data.insert("LastPlayed", Tag::Long(last_played));
    data.insert("hardcore", Tag::Byte(0));
    let mut root_tag = Compound::new();
    root_tag.insert("Data", Tag::Compound(data));

    std::fs::write(
        dir.join("level.dat"),
        nbt::encode_root_gzipped(&root_tag).unwrap(),
    )
    .unwrap();
}

fn run(args: &[&str]) -> anyhow::Result<String> {
    let bin = env!("CARGO_BIN_EXE_world-finder");
    let out = Command::new(bin).args(args).output()?;
    if !out.status.success() {
        return Err(anyhow::anyhow!(
            "command failed: status={:?}, stderr={}",
            out.status.code(),
            String::from_utf8_lossy(&out.stderr)
        ));
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

fn run_json(args: &[&str]) -> anyhow::Result<Value> {
    Ok(serde_json::from_str(&run(args)?)?)
}

#[test]
fn list_scans_and_prints_sorted_document() -> anyhow::Result<()> {
    let base = temp_dir("list_flow");
    let saves = base.join("saves");
    write_world(&saves, "older", "Older World", 7, 1_000_000);
    write_world(&saves, "newer", "Newer World", 9, 2_000_000);
    std::fs::create_dir_all(saves.join("not_a_world")).unwrap();

    let doc = run_json(&["--saves", saves.to_string_lossy().as_ref(), "list"])?;

    assert_eq!(doc["count"], Value::from(2));
    assert_eq!(doc["schemaVersion"], Value::String("1.0.0".to_string()));
    assert!(doc["lastUpdated"].as_str().unwrap().contains('T'));

    let worlds = doc["worlds"].as_array().unwrap();
    assert_eq!(worlds.len(), 2);
    assert_eq!(worlds[0]["name"], "Newer World");
    assert_eq!(worlds[0]["index"], Value::from(0));
    assert_eq!(worlds[0]["seed"], Value::from(9));
    assert_eq!(worlds[0]["lastPlayedRaw"], Value::from(2_000_000));
    assert_eq!(worlds[0]["gamemode"], "Survival");
    assert_eq!(worlds[0]["difficulty"], "Normal");
    assert_eq!(worlds[1]["name"], "Older World");
    assert_eq!(worlds[1]["iconPath"], "");

    let _ = std::fs::remove_dir_all(base);
    Ok(())
}

#[test]
fn export_writes_document_and_rescan_evicts() -> anyhow::Result<()> {
    let base = temp_dir("export_flow");
    let saves = base.join("saves");
    let out = base.join("assets").join("worlddata.json");
    write_world(&saves, "alpha", "Alpha", 1, 500);
    write_world(&saves, "beta", "Beta", 2, 400);

    run(&[
        "--saves",
        saves.to_string_lossy().as_ref(),
        "--out",
        out.to_string_lossy().as_ref(),
        "export",
    ])?;

    let doc: Value = serde_json::from_str(&std::fs::read_to_string(&out)?)?;
    assert_eq!(doc["count"], Value::from(2));

    std::fs::remove_dir_all(saves.join("beta"))?;
    run(&[
        "--saves",
        saves.to_string_lossy().as_ref(),
        "--out",
        out.to_string_lossy().as_ref(),
        "export",
    ])?;

    let doc: Value = serde_json::from_str(&std::fs::read_to_string(&out)?)?;
    assert_eq!(doc["count"], Value::from(1));
    assert_eq!(doc["worlds"][0]["folder"], "alpha");

    let _ = std::fs::remove_dir_all(base);
    Ok(())
}

#[test]
fn resolve_renders_templates_with_and_without_world() -> anyhow::Result<()> {
    let base = temp_dir("resolve_flow");
    let saves = base.join("saves");
    write_world(&saves, "alpha", "Alpha", 1, 500);

    let resolved = run(&[
        "--saves",
        saves.to_string_lossy().as_ref(),
        "resolve",
        "{world_name} [{difficulty_display}] {bogus}",
        "-w",
        "alpha",
    ])?;
    assert_eq!(resolved.trim_end(), "Alpha [Normal] {bogus}");

    let unbound = run(&[
        "--saves",
        saves.to_string_lossy().as_ref(),
        "resolve",
        "{world_name} is {play_status}",
    ])?;
    assert_eq!(unbound.trim_end(), "[world_name] is [play_status]");

    let _ = std::fs::remove_dir_all(base);
    Ok(())
}

#[test]
fn lookup_resolves_flat_tokens() -> anyhow::Result<()> {
    let base = temp_dir("lookup_flow");
    let saves = base.join("saves");
    write_world(&saves, "alpha", "Alpha", 42, 500);

    let name = run(&[
        "--saves",
        saves.to_string_lossy().as_ref(),
        "lookup",
        "%worldfinder_world_1_name%",
    ])?;
    assert_eq!(name.trim_end(), "Alpha");

    let seed = run(&[
        "--saves",
        saves.to_string_lossy().as_ref(),
        "lookup",
        "worldfinder_world_alpha_seed",
    ])?;
    assert_eq!(seed.trim_end(), "42");

    let missing = run(&[
        "--saves",
        saves.to_string_lossy().as_ref(),
        "lookup",
        "worldfinder_nope",
    ])?;
    assert_eq!(missing.trim_end(), "%worldfinder_nope%");

    let _ = std::fs::remove_dir_all(base);
    Ok(())
}

#[test]
fn placeholders_catalog_is_printed() -> anyhow::Result<()> {
    let listing = run(&["placeholders"])?;
    let names: Vec<&str> = listing.lines().collect();

    assert!(names.len() >= 50);
    assert!(names.contains(&"{world_name}"));
    assert!(names.contains(&"{play_status}"));
    assert!(names.contains(&"{world_image}"));
    Ok(())
}
