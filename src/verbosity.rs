//! Response length vs annotated verbosity.
//!
//! A descriptive check on a helpfulness dataset: do longer responses get
//! rated as more verbose? Reads `{response, verbosity}` records.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dataset::{parse_records, DatasetError};

#[derive(Debug, thiserror::Error)]
pub enum VerbosityError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] DatasetError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RatedResponse {
    pub response: String,
    pub verbosity: f64,
}

/// Undefined statistics are `None` and serialize as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerbosityCorrelation {
    pub n: usize,
    pub pearson: Option<f64>,
    pub spearman: Option<f64>,
    pub mean_wc_low_verbosity: Option<f64>,
    pub mean_wc_high_verbosity: Option<f64>,
}

/// Load the first `sample_size` records and compute the statistic.
pub fn verbosity_correlation(
    path: impl AsRef<Path>,
    sample_size: usize,
) -> Result<VerbosityCorrelation, VerbosityError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| VerbosityError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut rows = parse_records::<RatedResponse>(path, &raw, Some(sample_size))?;
    rows.truncate(sample_size);
    Ok(correlate(&rows))
}

pub fn correlate(rows: &[RatedResponse]) -> VerbosityCorrelation {
    let word_counts: Vec<f64> = rows
        .iter()
        .map(|r| r.response.split_whitespace().count() as f64)
        .collect();
    let verbosity: Vec<f64> = rows.iter().map(|r| r.verbosity).collect();

    let group_mean = |keep: fn(f64) -> bool| {
        let picked: Vec<f64> = word_counts
            .iter()
            .zip(&verbosity)
            .filter(|(_, v)| keep(**v))
            .map(|(wc, _)| *wc)
            .collect();
        mean(&picked)
    };

    VerbosityCorrelation {
        n: rows.len(),
        pearson: pearson(&word_counts, &verbosity),
        spearman: spearman(&word_counts, &verbosity),
        mean_wc_low_verbosity: group_mean(|v| v <= 2.0),
        mean_wc_high_verbosity: group_mean(|v| v >= 4.0),
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Pearson correlation; `None` for fewer than two points or a constant series.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let mx = x[..n].iter().sum::<f64>() / n as f64;
    let my = y[..n].iter().sum::<f64>() / n as f64;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for i in 0..n {
        let dx = x[i] - mx;
        let dy = y[i] - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }
    if vx <= 0.0 || vy <= 0.0 {
        return None;
    }
    Some(cov / (vx.sqrt() * vy.sqrt()))
}

/// Spearman correlation: Pearson over average ranks.
pub fn spearman(x: &[f64], y: &[f64]) -> Option<f64> {
    pearson(&ranks_with_ties(x), &ranks_with_ties(y))
}

fn ranks_with_ties(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut i = 0usize;
    while i < n {
        let value = values[indices[i]];
        let mut j = i + 1;
        while j < n && values[indices[j]] == value {
            j += 1;
        }
        // 1-based average rank of the tie group.
        let avg_rank = (i + j + 1) as f64 / 2.0;
        for &idx in &indices[i..j] {
            ranks[idx] = avg_rank;
        }
        i = j;
    }
    ranks
}
