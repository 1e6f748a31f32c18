use anyhow::Result;
use std::path::PathBuf;

use crate::cli::Cli;

/// File name of the exported snapshot document.
pub const EXPORT_FILENAME: &str = "worlddata.json";

/// Fixed fallback resource used when no better world image exists.
pub const DEFAULT_WORLD_ICON: &str = "assets/icons/world_default.png";

pub fn resolve_saves_dir(cli: &Cli) -> Result<PathBuf> {
    if let Some(p) = cli.saves.clone() {
        return Ok(p);
    }
    default_saves_dir()
}

pub fn resolve_export_file(cli: &Cli) -> Result<PathBuf> {
    if let Some(p) = cli.out.clone() {
        return Ok(p);
    }
    Ok(assets_dir()?.join(EXPORT_FILENAME))
}

pub fn default_saves_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("failed to resolve home directory"))?;
    Ok(home.join(".minecraft").join("saves"))
}

/// Asset directory holding the exported document and resource icons.
pub fn assets_dir() -> Result<PathBuf> {
    Ok(world_finder_home()?.join("assets"))
}

pub fn icons_dir() -> Result<PathBuf> {
    Ok(assets_dir()?.join("icons"))
}

/// Candidate documents the named-lookup fallback may read, most specific
/// first.
pub fn lookup_documents() -> Result<Vec<PathBuf>> {
    let assets = assets_dir()?;
    Ok(vec![
        assets.join(EXPORT_FILENAME),
        assets.join("worldcards.json"),
        assets.join("worldtemplate.json"),
    ])
}

fn world_finder_home() -> Result<PathBuf> {
    let base = dirs::data_local_dir()
        .or_else(dirs::cache_dir)
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow::anyhow!("failed to resolve data directory"))?;
    Ok(base.join("world-finder"))
}
