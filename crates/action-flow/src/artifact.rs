//! Replay artifact: the action trace of a run written as a JSON sequence file

use action_primitives::slugify;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use surefoot_core_types::Action;

use crate::errors::FlowError;

/// Ordered actions that reproduce a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSequence {
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub actions: Vec<Action>,
}

impl ActionSequence {
    pub fn new(task: impl Into<String>, start_url: Option<&str>, actions: Vec<Action>) -> Self {
        Self {
            task: task.into(),
            start_url: start_url.map(str::to_string),
            created_at: Utc::now(),
            actions,
        }
    }

    pub fn file_name(&self) -> String {
        format!(
            "sequence-{}-{}.json",
            slugify(&self.task),
            self.created_at.format("%Y%m%d-%H%M%S%3f")
        )
    }
}

/// Write `sequence` under `dir`, creating it if needed, and return the file path.
pub async fn write_sequence(dir: &Path, sequence: &ActionSequence) -> Result<PathBuf, FlowError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| FlowError::Artifact(format!("create {}: {e}", dir.display())))?;
    let path = dir.join(sequence.file_name());
    let body = serde_json::to_vec_pretty(sequence)
        .map_err(|e| FlowError::Artifact(format!("serialize sequence: {e}")))?;
    tokio::fs::write(&path, body)
        .await
        .map_err(|e| FlowError::Artifact(format!("write {}: {e}", path.display())))?;
    Ok(path)
}

pub async fn read_sequence(path: &Path) -> Result<ActionSequence, FlowError> {
    let body = tokio::fs::read(path)
        .await
        .map_err(|e| FlowError::Artifact(format!("read {}: {e}", path.display())))?;
    serde_json::from_slice(&body)
        .map_err(|e| FlowError::Artifact(format!("parse {}: {e}", path.display())))
}
