//! Progress Tracker (§4.6) — a crash-safe, atomically-rewritten JSON record
//! of how far a run has gotten, so `--resume` can pick up where it left off.

use std::fs;
use std::io;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Paused,
    Error,
}

/// `u128` values exceed `2^53` for a fully-unknown 12-word phrase, so the
/// spec mandates JSON-safe decimal-string serialization instead of a bare
/// JSON number (§4.6, §3).
mod u128_as_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressState {
    #[serde(with = "u128_as_string")]
    pub last_processed_index: u128,
    #[serde(with = "u128_as_string")]
    pub total_combinations: u128,
    pub start_time: String,
    pub last_update_time: String,
    pub chunks_processed: u64,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressState {
    pub fn fresh(total_combinations: u128) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            last_processed_index: 0,
            total_combinations,
            start_time: now.clone(),
            last_update_time: now,
            chunks_processed: 0,
            status: RunStatus::Running,
            error: None,
        }
    }

    /// Load a prior progress file. A missing or unparseable file is not an
    /// error — callers get `None` and construct a fresh state themselves
    /// (the correct `total_combinations` isn't known to this function).
    pub fn load(path: &Path) -> Option<Self> {
        let contents = fs::read_to_string(path).ok()?;
        serde_json::from_str(&contents).ok()
    }

    /// The index a resumed run should seek the Enumerator to: one past the
    /// last fully-processed index, or 0 for a fresh run.
    pub fn resume_index(&self) -> u128 {
        if self.chunks_processed == 0 {
            0
        } else {
            self.last_processed_index + 1
        }
    }

    /// Atomic rewrite: write to a sibling temp file, then rename over the
    /// target. Avoids the partial-write-on-crash risk of the teacher's plain
    /// `File::create` + `write!` (§4.6: "spec strengthens this").
    pub fn save_atomic(&self, path: &Path) -> io::Result<()> {
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    pub fn commit(&mut self, last_processed_index: u128) {
        self.last_processed_index = self.last_processed_index.max(last_processed_index);
        self.chunks_processed += 1;
        self.last_update_time = Utc::now().to_rfc3339();
        if self.last_processed_index + 1 >= self.total_combinations {
            self.status = RunStatus::Completed;
        }
    }

    pub fn mark_completed(&mut self) {
        self.status = RunStatus::Completed;
        self.last_update_time = Utc::now().to_rfc3339();
    }

    pub fn mark_paused(&mut self) {
        self.status = RunStatus::Paused;
        self.last_update_time = Utc::now().to_rfc3339();
    }

    pub fn mark_error(&mut self, message: String) {
        self.status = RunStatus::Error;
        self.error = Some(message);
        self.last_update_time = Utc::now().to_rfc3339();
    }
}
