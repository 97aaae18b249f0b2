//! Series downsampling and row filtering for the plot endpoints.
//!
//! Two downsampling strategies are offered, selected per request:
//!
//! - `stride`: keep every k-th point. Cheap, shape-agnostic.
//! - `lttb`: Largest-Triangle-Three-Buckets, picks the point per bucket
//!   that maximizes the triangle area with its neighbours, preserving
//!   visual shape far better at the same point budget.

use serde::{Deserialize, Serialize};

/// Which Y axis an overlay series is drawn against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    #[default]
    #[serde(rename = "y")]
    Y,
    #[serde(rename = "y2")]
    Y2,
}

/// Comparison operator for a row filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
}

/// One row filter: `col <op> value`.
///
/// Filters referencing columns absent from the dataset are skipped, not
/// rejected.
#[derive(Debug, Clone, Deserialize)]
pub struct Filter {
    pub col: String,
    pub op: FilterOp,
    pub value: f64,
}

impl Filter {
    /// Does the given cell value pass this filter?
    pub fn matches(&self, value: f64) -> bool {
        match self.op {
            FilterOp::Eq => value == self.value,
            FilterOp::Ne => value != self.value,
            FilterOp::Gt => value > self.value,
            FilterOp::Lt => value < self.value,
            FilterOp::Ge => value >= self.value,
            FilterOp::Le => value <= self.value,
        }
    }
}

/// Keep every k-th point so that at most `max_points` remain.
///
/// Returns the input unchanged when it already fits the budget.
pub fn downsample_stride(x: &[f64], y: &[f64], max_points: usize) -> (Vec<f64>, Vec<f64>) {
    debug_assert_eq!(x.len(), y.len());
    let n = x.len();
    if n <= max_points || n == 0 || max_points == 0 {
        return (x.to_vec(), y.to_vec());
    }
    let stride = (n / max_points).max(1);
    let xs = x.iter().step_by(stride).copied().collect();
    let ys = y.iter().step_by(stride).copied().collect();
    (xs, ys)
}

/// Largest-Triangle-Three-Buckets downsampling to `threshold` points.
///
/// The first and last points are always kept. Degenerate thresholds
/// (fewer than 3, or at least the input length) return the input
/// unchanged.
pub fn downsample_lttb(x: &[f64], y: &[f64], threshold: usize) -> (Vec<f64>, Vec<f64>) {
    debug_assert_eq!(x.len(), y.len());
    let n = x.len();
    if threshold < 3 || threshold >= n {
        return (x.to_vec(), y.to_vec());
    }

    let bucket_size = (n - 2) as f64 / (threshold - 2) as f64;

    let mut sampled_x = Vec::with_capacity(threshold);
    let mut sampled_y = Vec::with_capacity(threshold);
    sampled_x.push(x[0]);
    sampled_y.push(y[0]);

    let mut a = 0usize;
    for i in 0..threshold - 2 {
        // Candidates come from the current bucket.
        let start = (i as f64 * bucket_size).floor() as usize + 1;
        let end = (((i + 1) as f64 * bucket_size).floor() as usize + 1).min(n);
        if start >= end {
            continue;
        }

        // The third triangle vertex is the average of the next bucket.
        let range_start = end;
        let range_end = (((i + 2) as f64 * bucket_size).floor() as usize + 1).min(n);
        let (avg_x, avg_y) = if range_start < range_end {
            let count = (range_end - range_start) as f64;
            (
                x[range_start..range_end].iter().sum::<f64>() / count,
                y[range_start..range_end].iter().sum::<f64>() / count,
            )
        } else {
            (x[n - 1], y[n - 1])
        };

        let (ax, ay) = (x[a], y[a]);
        let mut best_idx = start;
        let mut best_area = f64::NEG_INFINITY;
        for j in start..end {
            let area = ((ax - avg_x) * (y[j] - ay) - (ax - x[j]) * (avg_y - ay)).abs();
            if area > best_area {
                best_area = area;
                best_idx = j;
            }
        }

        a = best_idx;
        sampled_x.push(x[a]);
        sampled_y.push(y[a]);
    }

    sampled_x.push(x[n - 1]);
    sampled_y.push(y[n - 1]);
    (sampled_x, sampled_y)
}
