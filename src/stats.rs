//! Per-user usage statistics.
//!
//! The tracker is the only cross-request shared mutable state in the
//! pipeline. Counter updates happen under a single mutex so concurrent
//! events for the same user never lose increments; reads return a
//! point-in-time snapshot.

use crate::error::OcrError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Outcome classification recorded for every request, including aborted
/// ones. Empty results are counted separately from failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Empty,
    Failure,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Empty => "empty",
            Self::Failure => "failure",
        }
    }
}

/// Counters for a single user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub total_requests: u64,
    pub successes: u64,
    pub empties: u64,
    pub failures: u64,
    /// Requests per resolved language code.
    pub languages: HashMap<String, u64>,
}

/// Persistence collaborator for user statistics. The tracker owns the
/// in-memory state; a store only loads it at startup and receives
/// snapshots after each event.
pub trait StatsStore: Send + Sync {
    fn load(&self) -> Result<HashMap<String, UserStats>, OcrError>;
    fn save(&self, stats: &HashMap<String, UserStats>) -> Result<(), OcrError>;
}

/// JSON file store: one document mapping user id to counters.
pub struct JsonStatsStore {
    path: PathBuf,
}

impl JsonStatsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StatsStore for JsonStatsStore {
    fn load(&self) -> Result<HashMap<String, UserStats>, OcrError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let bytes = std::fs::read(&self.path)
            .map_err(|e| OcrError::Internal(format!("Failed to read stats file: {}", e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| OcrError::Internal(format!("Failed to parse stats file: {}", e)))
    }

    fn save(&self, stats: &HashMap<String, UserStats>) -> Result<(), OcrError> {
        let json = serde_json::to_vec_pretty(stats)
            .map_err(|e| OcrError::Internal(format!("Failed to serialize stats: {}", e)))?;
        write_atomically(&self.path, &json)
            .map_err(|e| OcrError::Internal(format!("Failed to write stats file: {}", e)))
    }
}

/// Write via a sibling temp file and rename, so a crash mid-write never
/// leaves a truncated stats file.
fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}

/// Records invocation counts, language usage, and outcomes per user.
pub struct UsageTracker {
    users: Mutex<HashMap<String, UserStats>>,
    store: Option<Box<dyn StatsStore>>,
}

impl UsageTracker {
    /// Tracker without persistence; state lives for the process only.
    pub fn in_memory() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            store: None,
        }
    }

    /// Tracker backed by a store; existing state is loaded up front.
    pub fn with_store(store: Box<dyn StatsStore>) -> Result<Self, OcrError> {
        let users = store.load()?;
        tracing::info!("Loaded usage statistics for {} users", users.len());
        Ok(Self {
            users: Mutex::new(users),
            store: Some(store),
        })
    }

    /// Record one completed or aborted request.
    ///
    /// Increments the total counter, the per-language counters for every
    /// resolved language, and the counter matching the outcome, atomically
    /// with respect to concurrent events.
    pub fn record_event(&self, user_id: &str, languages: &[String], outcome: Outcome) {
        let mut users = self.users.lock().expect("stats lock poisoned");
        let stats = users.entry(user_id.to_string()).or_default();

        stats.total_requests += 1;
        match outcome {
            Outcome::Success => stats.successes += 1,
            Outcome::Empty => stats.empties += 1,
            Outcome::Failure => stats.failures += 1,
        }
        for language in languages {
            *stats.languages.entry(language.clone()).or_insert(0) += 1;
        }

        if let Some(store) = &self.store {
            // Best effort: a failed save must not fail the request.
            if let Err(e) = store.save(&users) {
                tracing::warn!("Failed to persist usage statistics: {}", e);
            }
        }
    }

    /// Snapshot of a user's counters; zeroed record for unknown users.
    pub fn get_stats(&self, user_id: &str) -> UserStats {
        self.users
            .lock()
            .expect("stats lock poisoned")
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }
}
