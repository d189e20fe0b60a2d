use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub storage: StorageConfig,
    pub watcher: WatcherConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `LINEA_PROFILE`. When set (e.g. `PLANT2`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("LINEA_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        let storage = StorageConfig::from_env_profiled(p);
        let watcher = WatcherConfig::from_env_profiled(p, &storage.data_dir);
        Self {
            profile: p.to_string(),
            storage,
            watcher,
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  storage:  db={}, max_connections={}",
            self.storage.database_path.display(),
            self.storage.max_connections
        );
        tracing::info!(
            "  watcher:  source={}, interval={}ms, dedup_capacity={}, user={}",
            self.watcher.source_path.display(),
            self.watcher.poll_interval_ms,
            self.watcher.dedup_capacity,
            self.watcher.user
        );
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub max_connections: u32,
}

impl StorageConfig {
    fn from_env_profiled(p: &str) -> Self {
        let data_dir = PathBuf::from(profiled_env_or(p, "DATA_DIR", "data"));
        let database_path = profiled_env_opt(p, "EVENTS_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("database").join("events.db"));
        Self {
            data_dir,
            database_path,
            max_connections: profiled_env_u32(p, "DB_MAX_CONNECTIONS", 4),
        }
    }

    /// Storage rooted at `data_dir` with default file layout.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            database_path: data_dir.join("database").join("events.db"),
            data_dir,
            max_connections: 4,
        }
    }
}

// ── Watcher ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Spreadsheet export polled on every tick.
    pub source_path: PathBuf,
    pub poll_interval_ms: u64,
    /// Upper bound on remembered row fingerprints.
    pub dedup_capacity: usize,
    /// `Usuario` recorded for rows ingested by the watcher.
    pub user: String,
}

impl WatcherConfig {
    fn from_env_profiled(p: &str, data_dir: &std::path::Path) -> Self {
        let source_path = profiled_env_opt(p, "WATCH_SOURCE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("input.csv"));
        Self {
            source_path,
            poll_interval_ms: profiled_env_u64(p, "WATCH_POLL_INTERVAL_MS", 2000),
            dedup_capacity: profiled_env_u64(p, "WATCH_DEDUP_CAPACITY", 100_000) as usize,
            user: profiled_env_or(p, "WATCH_USER", "maintenance"),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("data").join("input.csv"),
            poll_interval_ms: 2000,
            dedup_capacity: 100_000,
            user: "maintenance".to_string(),
        }
    }
}
