//! Run artifact export
//!
//! Per-episode returns and step counts, and the learned table, are written as
//! flat whitespace-separated text (one row per line), alongside a JSON
//! manifest. Every file is written to a `.tmp` sibling and renamed into
//! place, so an interrupted export never leaves a half-written artifact.

use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use gridworld_core::{GridError, Result, RunHistory};

/// File name of the per-episode returns
pub const RETURNS_FILE: &str = "episode_returns.txt";
/// File name of the per-episode step counts
pub const STEPS_FILE: &str = "episode_steps.txt";
/// File name of the Q-table
pub const Q_TABLE_FILE: &str = "q_table.txt";
/// File name of the value table
pub const VALUES_FILE: &str = "values.txt";
/// File name of the manifest
pub const MANIFEST_FILE: &str = "manifest.json";

/// Metadata describing a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    /// Unique run id
    pub run_id: Uuid,
    /// `qlearning` or `policy_iter`
    pub strategy: String,
    /// When training started
    pub started_at: DateTime<Utc>,
    /// When training returned
    pub finished_at: DateTime<Utc>,
    /// Global steps (Q-learning) or outer iterations (policy iteration)
    pub total_steps: usize,
    /// Whether the wall mutation fired
    pub swapped: bool,
    /// Whether the run was cancelled
    pub interrupted: bool,
    /// Echo of the run configuration
    pub config: serde_json::Value,
}

impl RunManifest {
    /// Manifest for a run that started at `started_at` and just finished
    pub fn new<C: Serialize>(strategy: &str, started_at: DateTime<Utc>, config: &C) -> Result<Self> {
        Ok(Self {
            run_id: Uuid::new_v4(),
            strategy: strategy.to_string(),
            started_at,
            finished_at: Utc::now(),
            total_steps: 0,
            swapped: false,
            interrupted: false,
            config: serde_json::to_value(config)?,
        })
    }
}

/// Everything a run writes to disk
#[derive(Debug, Clone, PartialEq)]
pub struct RunArtifacts {
    /// Return of each episode
    pub returns: Vec<f64>,
    /// Step count of each episode
    pub steps: Vec<usize>,
    /// Q-table, one row per feature
    pub q_table: Option<Array2<f64>>,
    /// Value table, one row per grid row
    pub values: Option<Array2<f64>>,
    /// Run metadata
    pub manifest: RunManifest,
}

impl RunArtifacts {
    /// Artifacts carrying only a manifest
    #[must_use]
    pub fn new(manifest: RunManifest) -> Self {
        Self {
            returns: Vec::new(),
            steps: Vec::new(),
            q_table: None,
            values: None,
            manifest,
        }
    }

    /// Attach per-episode returns and steps
    #[must_use]
    pub fn with_history(mut self, history: &RunHistory) -> Self {
        self.returns = history.returns();
        self.steps = history.steps();
        self
    }

    /// Write every artifact into `dir`, creating it if needed; returns the
    /// paths written
    pub async fn write(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir).await?;
        let mut written = Vec::new();

        if !self.returns.is_empty() {
            let body = lines(self.returns.iter());
            written.push(write_atomic(&dir.join(RETURNS_FILE), body).await?);
        }
        if !self.steps.is_empty() {
            let body = lines(self.steps.iter());
            written.push(write_atomic(&dir.join(STEPS_FILE), body).await?);
        }
        if let Some(q) = &self.q_table {
            written.push(write_atomic(&dir.join(Q_TABLE_FILE), format_table(q)).await?);
        }
        if let Some(v) = &self.values {
            written.push(write_atomic(&dir.join(VALUES_FILE), format_table(v)).await?);
        }
        let manifest = serde_json::to_string_pretty(&self.manifest)?;
        written.push(write_atomic(&dir.join(MANIFEST_FILE), manifest).await?);

        tracing::info!(dir = %dir.display(), files = written.len(), "artifacts written");
        Ok(written)
    }
}

fn lines<T: ToString>(values: impl Iterator<Item = T>) -> String {
    let mut out = String::new();
    for v in values {
        out.push_str(&v.to_string());
        out.push('\n');
    }
    out
}

/// Rows as lines of space-separated values
#[must_use]
pub fn format_table(table: &Array2<f64>) -> String {
    let mut out = String::new();
    for row in table.rows() {
        let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
        let _ = writeln!(out, "{}", cells.join(" "));
    }
    out
}

/// Parse the flat table format; every row must have the same width
pub fn parse_table(text: &str) -> Result<Array2<f64>> {
    let mut data = Vec::new();
    let mut width = None;
    let mut rows = 0;
    for (n, line) in text.lines().filter(|l| !l.trim().is_empty()).enumerate() {
        let row = line
            .split_whitespace()
            .map(str::parse::<f64>)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| GridError::config(format!("table line {n}: {e}")))?;
        match width {
            None => width = Some(row.len()),
            Some(w) if w != row.len() => {
                return Err(GridError::DimensionMismatch {
                    expected: w,
                    actual: row.len(),
                })
            }
            Some(_) => {}
        }
        data.extend(row);
        rows += 1;
    }
    Array2::from_shape_vec((rows, width.unwrap_or(0)), data)
        .map_err(|e| GridError::Other(anyhow::Error::from(e)))
}

/// Read a table written by [`RunArtifacts::write`]
pub async fn load_table(path: &Path) -> Result<Array2<f64>> {
    let text = fs::read_to_string(path).await?;
    parse_table(&text)
}

async fn write_atomic(path: &Path, contents: String) -> Result<PathBuf> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents).await?;
    fs::rename(&tmp, path).await?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridworld_core::{EpisodeRecord, Terminal};
    use ndarray::array;

    fn manifest() -> RunManifest {
        RunManifest::new("qlearning", Utc::now(), &serde_json::json!({ "seed": 42 })).unwrap()
    }

    #[test]
    fn test_table_format() {
        let t = array![[1.0, -0.5], [0.25, 0.0]];
        let text = format_table(&t);
        assert_eq!(text, "1 -0.5\n0.25 0\n");
        assert_eq!(parse_table(&text).unwrap(), t);
    }

    #[test]
    fn test_ragged_table_is_rejected() {
        assert!(matches!(
            parse_table("1 2\n3\n"),
            Err(GridError::DimensionMismatch { expected: 2, actual: 1 })
        ));
        assert!(parse_table("1 x\n").is_err());
    }

    #[tokio::test]
    async fn test_write_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = RunHistory::new();
        for (episode, steps) in [12usize, 7].into_iter().enumerate() {
            history.push(EpisodeRecord {
                episode,
                total_reward: 1.0,
                steps,
                outcome: Terminal::Yes,
                epsilon: 0.1,
            });
        }
        let q = array![[0.0, 0.5, 0.0, 0.0], [1.0, 0.0, 0.0, 0.0]];
        let artifacts = RunArtifacts {
            q_table: Some(q.clone()),
            ..RunArtifacts::new(manifest())
        }
        .with_history(&history);

        let written = artifacts.write(dir.path()).await.unwrap();
        assert_eq!(written.len(), 4);
        assert_eq!(load_table(&dir.path().join(Q_TABLE_FILE)).await.unwrap(), q);

        let steps = tokio::fs::read_to_string(dir.path().join(STEPS_FILE)).await.unwrap();
        assert_eq!(steps, "12\n7\n");

        let manifest: RunManifest =
            serde_json::from_str(&tokio::fs::read_to_string(dir.path().join(MANIFEST_FILE)).await.unwrap())
                .unwrap();
        assert_eq!(manifest.strategy, "qlearning");

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            assert_ne!(entry.path().extension().and_then(|e| e.to_str()), Some("tmp"));
        }
    }
}
