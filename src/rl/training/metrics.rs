//! Reward statistics over collected transitions, optionally appended to a
//! CSV file on every read.

use serde::Serialize;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use super::driver::TransitionObserver;
use crate::error::Result;
use crate::rl::memory::Transition;

/// One reading of [`TradingMetric`], also the CSV row layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSnapshot {
    pub tot_reward: f64,
    pub avg_reward: f64,
    pub min_reward: f64,
    pub max_reward: f64,
}

#[derive(Debug, Clone)]
pub struct TradingMetric {
    total: f64,
    count: usize,
    min: f64,
    max: f64,
    csv_path: Option<PathBuf>,
}

impl Default for TradingMetric {
    fn default() -> Self {
        Self::new()
    }
}

impl TradingMetric {
    pub fn new() -> Self {
        Self {
            total: 0.0,
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            csv_path: None,
        }
    }

    pub fn with_csv(mut self, path: impl Into<PathBuf>) -> Self {
        self.csv_path = Some(path.into());
        self
    }

    pub fn csv_path(&self) -> Option<&Path> {
        self.csv_path.as_deref()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn record(&mut self, reward: f64) {
        self.total += reward;
        self.count += 1;
        self.min = self.min.min(reward);
        self.max = self.max.max(reward);
    }

    /// Current statistics without touching the CSV file.
    ///
    /// Min and max read 0 until a reward has been recorded.
    pub fn snapshot(&self) -> MetricSnapshot {
        if self.count == 0 {
            return MetricSnapshot {
                tot_reward: 0.0,
                avg_reward: 0.0,
                min_reward: 0.0,
                max_reward: 0.0,
            };
        }
        MetricSnapshot {
            tot_reward: self.total,
            avg_reward: self.total / self.count as f64,
            min_reward: self.min,
            max_reward: self.max,
        }
    }

    /// Current statistics, appended as a row to the CSV file when one is set
    pub fn result(&self) -> Result<MetricSnapshot> {
        let snapshot = self.snapshot();
        if let Some(path) = &self.csv_path {
            append_row(path, &snapshot)?;
        }
        Ok(snapshot)
    }

    pub fn reset(&mut self) {
        self.total = 0.0;
        self.count = 0;
        self.min = f64::INFINITY;
        self.max = f64::NEG_INFINITY;
    }
}

impl TransitionObserver for TradingMetric {
    fn observe(&mut self, transition: &Transition) {
        self.record(f64::from(transition.reward));
    }
}

fn append_row(path: &Path, snapshot: &MetricSnapshot) -> Result<()> {
    let is_new = !path.exists();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(is_new)
        .from_writer(file);
    writer.serialize(snapshot)?;
    writer.flush()?;
    Ok(())
}
