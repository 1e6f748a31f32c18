//! # world-finder
//!
//! Discovers save-game worlds on disk, extracts their metadata and keeps
//! an in-memory cache fresh from a background scan loop. The cache feeds
//! an atomic JSON exporter and two text-substitution dialects so any
//! external renderer can display world information without touching the
//! save format itself.
//!
//! ## Architecture
//!
//! - **nbt**: codec for the compressed named-tag descriptor format
//! - **descriptor**: field extraction from a world's descriptor file
//! - **world**: immutable per-world record with display helpers
//! - **scanner**: saves-directory discovery, change-aware cache, scheduled rescans
//! - **export**: atomic JSON snapshot export for external consumers
//! - **placeholder**: `{name}` template resolution with the full field catalog
//! - **lookup**: flat `%token%` lookups with exported-document fallback
//! - **config**: saves/export/asset path resolution

pub mod cli;
pub mod config;
pub mod descriptor;
pub mod export;
pub mod lookup;
pub mod nbt;
pub mod placeholder;
pub mod scanner;
pub mod world;
