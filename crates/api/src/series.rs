//! Reads parsed CSV files into numeric plot traces.
//!
//! Rows with non-numeric values in any requested column are skipped,
//! filters are applied row by row, and each trace is downsampled
//! independently before it leaves the server.

use std::path::Path;

use flightdeck_core::plot::{downsample_lttb, downsample_stride, Filter};

/// Default point budget per trace.
pub const DEFAULT_MAX_POINTS: usize = 5000;

/// Which downsampling algorithm to apply to a trace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownsampleMethod {
    /// Every n-th point, endpoints preserved.
    Stride,
    /// Largest-triangle-three-buckets, keeps visual extremes.
    #[default]
    Lttb,
}

#[derive(Debug, thiserror::Error)]
pub enum SeriesError {
    #[error("Unknown column: {0}")]
    UnknownColumn(String),
    #[error("Failed to read parsed data: {0}")]
    Csv(#[from] csv::Error),
}

/// One plottable series after filtering and downsampling.
#[derive(Debug, serde::Serialize)]
pub struct Trace {
    pub name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// Load `y_cols` against `x_col` from a parsed CSV file.
///
/// `max_points` caps each trace via largest-triangle-three-buckets;
/// pass `0` to disable downsampling.
pub fn load_traces(
    path: &Path,
    x_col: &str,
    y_cols: &[String],
    filters: &[Filter],
    method: DownsampleMethod,
    max_points: usize,
) -> Result<Vec<Trace>, SeriesError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let index_of = |name: &str| -> Result<usize, SeriesError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| SeriesError::UnknownColumn(name.to_string()))
    };

    let x_index = index_of(x_col)?;
    let y_indices: Vec<usize> = y_cols
        .iter()
        .map(|c| index_of(c))
        .collect::<Result<_, _>>()?;
    // Filters naming absent columns are ignored rather than rejected.
    let active_filters: Vec<(&Filter, usize)> = filters
        .iter()
        .filter_map(|f| {
            let index = headers.iter().position(|h| h == f.col)?;
            Some((f, index))
        })
        .collect();

    let mut x: Vec<f64> = Vec::new();
    let mut ys: Vec<Vec<f64>> = vec![Vec::new(); y_cols.len()];

    'rows: for record in reader.records() {
        let record = record?;

        let Some(x_value) = parse_cell(&record, x_index) else {
            continue;
        };
        let mut row = Vec::with_capacity(y_indices.len());
        for &index in &y_indices {
            let Some(value) = parse_cell(&record, index) else {
                continue 'rows;
            };
            row.push(value);
        }
        for (filter, index) in &active_filters {
            let Some(value) = parse_cell(&record, *index) else {
                continue 'rows;
            };
            if !filter.matches(value) {
                continue 'rows;
            }
        }

        x.push(x_value);
        for (series, value) in ys.iter_mut().zip(row) {
            series.push(value);
        }
    }

    let traces = y_cols
        .iter()
        .zip(ys)
        .map(|(name, y)| {
            let (dx, dy) = if max_points > 0 {
                match method {
                    DownsampleMethod::Stride => downsample_stride(&x, &y, max_points),
                    DownsampleMethod::Lttb => downsample_lttb(&x, &y, max_points),
                }
            } else {
                (x.clone(), y)
            };
            Trace {
                name: name.clone(),
                x: dx,
                y: dy,
            }
        })
        .collect();

    Ok(traces)
}

fn parse_cell(record: &csv::StringRecord, index: usize) -> Option<f64> {
    let cell = record.get(index)?;
    if cell.is_empty() {
        return None;
    }
    cell.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flightdeck_core::plot::FilterOp;
    use std::io::Write;

    fn write_csv(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    #[test]
    fn loads_requested_columns() {
        let file = write_csv(&[
            "PacketNum,ID,alt,spd",
            "0,16,100,5",
            "1,16,110,6",
            "2,16,120,7",
        ]);
        let traces = load_traces(
            file.path(),
            "PacketNum",
            &["alt".into(), "spd".into()],
            &[],
            DownsampleMethod::Lttb,
            0,
        )
        .unwrap();

        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0].name, "alt");
        assert_eq!(traces[0].x, vec![0.0, 1.0, 2.0]);
        assert_eq!(traces[0].y, vec![100.0, 110.0, 120.0]);
        assert_eq!(traces[1].y, vec![5.0, 6.0, 7.0]);
    }

    #[test]
    fn rows_missing_values_are_skipped() {
        let file = write_csv(&["PacketNum,ID,alt", "0,16,100", "1,16,", "2,16,120"]);
        let traces = load_traces(file.path(), "PacketNum", &["alt".into()], &[], DownsampleMethod::Lttb, 0).unwrap();
        assert_eq!(traces[0].x, vec![0.0, 2.0]);
    }

    #[test]
    fn filters_are_applied() {
        let file = write_csv(&["PacketNum,ID,alt", "0,16,100", "1,17,110", "2,16,120"]);
        let filters = vec![Filter {
            col: "ID".into(),
            op: FilterOp::Eq,
            value: 16.0,
        }];
        let traces = load_traces(file.path(), "PacketNum", &["alt".into()], &filters, DownsampleMethod::Lttb, 0).unwrap();
        assert_eq!(traces[0].y, vec![100.0, 120.0]);
    }

    #[test]
    fn filter_on_absent_column_is_ignored() {
        let file = write_csv(&["PacketNum,alt", "0,100", "1,110"]);
        let filters = vec![Filter {
            col: "missing".into(),
            op: FilterOp::Eq,
            value: 1.0,
        }];
        let traces = load_traces(
            file.path(),
            "PacketNum",
            &["alt".into()],
            &filters,
            DownsampleMethod::Lttb,
            0,
        )
        .unwrap();
        assert_eq!(traces[0].y, vec![100.0, 110.0]);
    }

    #[test]
    fn unknown_column_errors() {
        let file = write_csv(&["PacketNum,ID", "0,16"]);
        let err = load_traces(file.path(), "PacketNum", &["nope".into()], &[], DownsampleMethod::Lttb, 0).unwrap_err();
        assert!(matches!(err, SeriesError::UnknownColumn(name) if name == "nope"));
    }
}
