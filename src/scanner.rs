//! World discovery and the in-memory record cache.
//!
//! The scanner walks the immediate subdirectories of one saves root,
//! extracts a [`WorldRecord`] per world folder and keeps the cache fresh
//! from a recurring background pass. Re-extraction is gated on the folder
//! modification timestamp: an unchanged folder is never re-parsed and its
//! directory size is never re-summed, which is where almost all scan cost
//! lives. The cache is written only by scan passes and read concurrently
//! by everyone else; entries are replaced atomically per key.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::config::default_saves_dir;
use crate::descriptor::{self, DESCRIPTOR_FILE, ICON_FILE, LOCK_FILE};
use crate::world::WorldRecord;

#[derive(Debug, Clone, Copy)]
pub struct ScannerConfig {
    /// Interval between background scan passes.
    pub scan_interval: Duration,
    /// Snapshot age beyond which `get_all` requests an opportunistic
    /// refresh.
    pub cache_validity: Duration,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(5),
            cache_validity: Duration::from_secs(30),
        }
    }
}

/// Counters for one scan pass.
#[derive(Debug, Default, Clone, Copy, serde::Serialize)]
pub struct ScanStats {
    pub scanned: usize,
    pub updated: usize,
    pub removed: usize,
}

enum Msg {
    Refresh,
    Stop,
}

struct Shared {
    root: PathBuf,
    config: ScannerConfig,
    cache: RwLock<HashMap<String, WorldRecord>>,
    // Serializes scan passes; readers are never blocked by it.
    scan_gate: Mutex<()>,
    last_scan_ms: AtomicI64,
    refresh_tx: Mutex<Option<Sender<Msg>>>,
}

/// Handle to the scanner service. Cheap to clone; all clones share the
/// same cache.
#[derive(Clone)]
pub struct WorldScanner {
    shared: Arc<Shared>,
}

impl WorldScanner {
    /// Resolve the saves root (platform default when `None`), create it if
    /// missing and run one synchronous scan. Failure here is fatal: without
    /// a usable root no operation is meaningful.
    pub fn initialize(root: Option<PathBuf>, config: ScannerConfig) -> Result<Self> {
        let root = match root {
            Some(p) => p,
            None => default_saves_dir()?,
        };

        if !root.exists() {
            warn!("saves directory not found, creating: {}", root.display());
            std::fs::create_dir_all(&root)
                .with_context(|| format!("failed to create saves directory: {}", root.display()))?;
        }

        let scanner = Self {
            shared: Arc::new(Shared {
                root,
                config,
                cache: RwLock::new(HashMap::new()),
                scan_gate: Mutex::new(()),
                last_scan_ms: AtomicI64::new(0),
                refresh_tx: Mutex::new(None),
            }),
        };

        scanner.scan_once()?;
        info!(
            "world scanner initialized with saves directory: {}",
            scanner.shared.root.display()
        );
        Ok(scanner)
    }

    pub fn root(&self) -> &Path {
        &self.shared.root
    }

    /// One full sweep: update changed/new folders, then evict entries whose
    /// folder disappeared. Per-folder failures are logged and leave the
    /// previous cache entry intact.
    pub fn scan_once(&self) -> Result<ScanStats> {
        let _gate = self.shared.scan_gate.lock();

        let entries = std::fs::read_dir(&self.shared.root).with_context(|| {
            format!(
                "failed to list saves directory: {}",
                self.shared.root.display()
            )
        })?;

        let mut folders = Vec::new();
        for entry in entries.flatten() {
            if entry.file_type().is_ok_and(|t| t.is_dir()) {
                folders.push(entry.path());
            }
        }

        enum Outcome {
            NotAWorld,
            Unchanged,
            Updated(WorldRecord),
            Failed,
        }

        let results: Vec<(String, Outcome)> = folders
            .par_iter()
            .map(|folder| {
                let name = folder
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();

                if !folder.join(DESCRIPTOR_FILE).is_file() {
                    debug!("no descriptor in folder, skipping: {name}");
                    return (name, Outcome::NotAWorld);
                }

                let modified = modified_ms(folder);
                let unchanged = self
                    .shared
                    .cache
                    .read()
                    .get(&name)
                    .is_some_and(|r| r.folder_modified() == modified);
                if unchanged {
                    return (name, Outcome::Unchanged);
                }

                match scan_world_folder(folder, &name, modified) {
                    Ok(record) => (name, Outcome::Updated(record)),
                    Err(err) => {
                        warn!("failed to scan world folder {name}: {err:#}");
                        (name, Outcome::Failed)
                    }
                }
            })
            .collect();

        let mut stats = ScanStats::default();
        let mut found: HashSet<String> = HashSet::new();
        for (name, outcome) in results {
            stats.scanned += 1;
            match outcome {
                Outcome::NotAWorld => continue,
                Outcome::Unchanged | Outcome::Failed => {
                    found.insert(name);
                }
                Outcome::Updated(record) => {
                    self.shared.cache.write().insert(name.clone(), record);
                    found.insert(name);
                    stats.updated += 1;
                }
            }
        }

        // Eviction runs strictly after the update sweep; a folder deleted
        // mid-pass is picked up on the next pass.
        {
            let mut cache = self.shared.cache.write();
            let stale: Vec<String> = cache
                .keys()
                .filter(|k| !found.contains(*k))
                .cloned()
                .collect();
            for key in stale {
                cache.remove(&key);
                debug!("evicted deleted world from cache: {key}");
                stats.removed += 1;
            }
        }

        self.shared
            .last_scan_ms
            .store(now_ms(), Ordering::Relaxed);

        if stats.updated > 0 || stats.removed > 0 {
            debug!(
                "world scan complete: {} scanned, {} updated, {} removed",
                stats.scanned, stats.updated, stats.removed
            );
        }
        Ok(stats)
    }

    /// Snapshot of all cached records, most recently played first. When the
    /// snapshot is older than the validity window a background refresh is
    /// requested; the caller still gets the current snapshot immediately.
    pub fn get_all(&self) -> Vec<WorldRecord> {
        let age = now_ms() - self.shared.last_scan_ms.load(Ordering::Relaxed);
        if age > self.shared.config.cache_validity.as_millis() as i64 {
            if let Some(tx) = self.shared.refresh_tx.lock().as_ref() {
                let _ = tx.send(Msg::Refresh);
            }
        }

        let mut worlds: Vec<WorldRecord> = self.shared.cache.read().values().cloned().collect();
        worlds.sort_by(|a, b| b.last_played().cmp(&a.last_played()));
        worlds
    }

    pub fn get(&self, folder_name: &str) -> Option<WorldRecord> {
        self.shared.cache.read().get(folder_name).cloned()
    }

    /// Blocking rescan, for callers that need the cache current right now.
    pub fn refresh_now(&self) -> Result<ScanStats> {
        self.scan_once()
    }

    /// Start the recurring background scan. The returned task owns the
    /// scheduler thread; drop it via [`ScannerTask::shutdown`].
    pub fn spawn(&self) -> ScannerTask {
        let (tx, rx) = std::sync::mpsc::channel::<Msg>();
        let (done_tx, done_rx) = std::sync::mpsc::channel::<()>();
        *self.shared.refresh_tx.lock() = Some(tx.clone());

        let scanner = self.clone();
        let handle = std::thread::spawn(move || {
            run_scheduler(scanner, rx);
            let _ = done_tx.send(());
        });

        ScannerTask {
            shared: Arc::clone(&self.shared),
            tx,
            done_rx,
            handle: Some(handle),
        }
    }
}

/// Owns the background scan scheduler.
pub struct ScannerTask {
    shared: Arc<Shared>,
    tx: Sender<Msg>,
    done_rx: Receiver<()>,
    handle: Option<JoinHandle<()>>,
}

impl ScannerTask {
    /// Stop the scheduler, waiting up to `wait` for an in-flight pass to
    /// finish before detaching the thread. The cache is cleared only once
    /// the scheduler is down.
    pub fn shutdown(mut self, wait: Duration) {
        *self.shared.refresh_tx.lock() = None;
        let _ = self.tx.send(Msg::Stop);

        match self.done_rx.recv_timeout(wait) {
            Ok(()) => {
                if let Some(handle) = self.handle.take() {
                    let _ = handle.join();
                }
            }
            Err(_) => {
                warn!("scan scheduler did not stop within {wait:?}, detaching");
                self.handle.take();
            }
        }

        self.shared.cache.write().clear();
        info!("world scanner shut down");
    }
}

fn run_scheduler(scanner: WorldScanner, rx: Receiver<Msg>) {
    use std::sync::mpsc::RecvTimeoutError;

    let interval = scanner.shared.config.scan_interval;
    loop {
        match rx.recv_timeout(interval) {
            Ok(Msg::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(Msg::Refresh) | Err(RecvTimeoutError::Timeout) => {
                // A failed pass must not kill the schedule.
                if let Err(err) = scanner.scan_once() {
                    warn!("scan pass failed: {err:#}");
                }
            }
        }
    }
}

fn scan_world_folder(folder: &Path, name: &str, modified: i64) -> Result<WorldRecord> {
    let mut builder = WorldRecord::builder()
        .folder_name(name)
        .folder_path(folder.to_string_lossy())
        .folder_modified(modified);

    builder = descriptor::extract_world_data(&folder.join(DESCRIPTOR_FILE), builder);

    let icon = folder.join(ICON_FILE);
    if icon.is_file() {
        builder = builder.icon_path(icon.to_string_lossy());
    }
    builder = builder.in_use(folder.join(LOCK_FILE).exists());
    builder = builder.size_bytes(descriptor::dir_size(folder));

    builder.build()
}

fn modified_ms(path: &Path) -> i64 {
    path.metadata()
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
