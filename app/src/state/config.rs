//! Configuration loading, resolution, and persistence.
//!
//! Handles the TOML config file (~/.config/hoopclock/config.toml) with a
//! `[game]` section, a `[host]` section and indexed `[webserver.<id>]`
//! sections.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

pub use hoopclock::HoopConfig;

/// Build a global ID from a type prefix and index: `"webserver.0"`.
pub fn global_id(prefix: &str, index: &str) -> String {
    format!("{prefix}.{index}")
}

/// Generate a short unique ID (8 hex chars from system time).
/// Used for WebSocket source IDs (`ws.{hex}`) and request correlation.
pub fn generate_id() -> String {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:08x}", (ts ^ (seq as u64)) as u32)
}

// ---------------------------------------------------------------------------
// Persistence I/O
// ---------------------------------------------------------------------------

/// Returns `~/.config/hoopclock/config.toml`.
pub fn default_config_path() -> PathBuf {
    let dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hoopclock");
    dir.join("config.toml")
}

/// Load persisted config from disk. If the file does not exist, creates it
/// with all-defaults and returns that. A file that fails to parse is left
/// untouched and defaults are used for this run.
pub fn load(path: &Path) -> HoopConfig {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<HoopConfig>(&contents) {
            Ok(config) => {
                tracing::info!("loaded config from {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!("failed to parse {}: {e}", path.display());
                HoopConfig::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let defaults = HoopConfig::default();
            tracing::info!("no config file found, creating {}", path.display());
            save_to(path, &defaults);
            defaults
        }
        Err(e) => {
            tracing::warn!("failed to read {}: {e}", path.display());
            HoopConfig::default()
        }
    }
}

/// Write config to a specific path. Creates parent dirs if needed. Never panics.
pub fn save_to(path: &Path, config: &HoopConfig) {
    if let Some(dir) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(dir) {
            tracing::warn!("failed to create config dir {}: {e}", dir.display());
            return;
        }
    }
    match toml::to_string_pretty(config) {
        Ok(contents) => {
            if let Err(e) = std::fs::write(path, contents) {
                tracing::warn!("failed to write {}: {e}", path.display());
            }
        }
        Err(e) => {
            tracing::warn!("failed to serialize config: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Cached config
// ---------------------------------------------------------------------------

/// Cached configuration backed by a TOML file.
///
/// Reads are cheap (RwLock read guard + clone). Writes acquire the write lock,
/// mutate the cached copy, and persist to disk.
///
/// Config mutations are serialized through the bus (processed by SystemActor
/// one at a time on its thread), so no external reload lock is needed.
pub struct SystemConfig {
    path: PathBuf,
    inner: RwLock<HoopConfig>,
}

impl SystemConfig {
    /// Load config from disk (or create defaults) and cache it.
    pub fn new(path: PathBuf) -> Self {
        let config = load(&path);
        Self {
            path,
            inner: RwLock::new(config),
        }
    }

    /// Clone the current cached config.
    pub fn snapshot(&self) -> HoopConfig {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Replace the entire cached config and persist to disk.
    pub fn replace(&self, new: HoopConfig) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = new;
        save_to(&self.path, &guard);
    }

    /// Change the cached config for this run only (CLI overrides).
    pub fn override_in_memory(&self, f: impl FnOnce(&mut HoopConfig)) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        f(&mut guard);
    }
}
