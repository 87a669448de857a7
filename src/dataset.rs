//! Labeled point files and point parsing.
//!
//! A dataset file holds one labeled point per line:
//!
//! ```text
//! # label,x1,x2,...
//! setosa,5.1,3.5,1.4,0.2
//! virginica,6.3,3.3,6.0,2.5
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use std::fs;
use std::path::Path;

use ndarray::{Array1, Array2};

use crate::error::{KnnError, Result};

/// Labeled points loaded from a dataset file.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// One point per row.
    pub points: Array2<f64>,
    pub labels: Vec<String>,
}

impl Dataset {
    /// Parse the text of a dataset file.
    pub fn parse(text: &str) -> Result<Self> {
        let mut rows: Vec<Vec<f64>> = Vec::new();
        let mut labels = Vec::new();

        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (label, coords) = line.split_once(',').ok_or_else(|| {
                KnnError::invalid(format!(
                    "line {}: expected label followed by coordinates",
                    lineno + 1
                ))
            })?;
            let point = parse_coords(coords)
                .map_err(|reason| KnnError::invalid(format!("line {}: {}", lineno + 1, reason)))?;

            if let Some(first) = rows.first() {
                if first.len() != point.len() {
                    return Err(KnnError::invalid(format!(
                        "line {}: expected {} coordinates, got {}",
                        lineno + 1,
                        first.len(),
                        point.len()
                    )));
                }
            }

            labels.push(label.trim().to_string());
            rows.push(point);
        }

        Ok(Self {
            points: points_from_rows(&rows)?,
            labels,
        })
    }

    /// Read and parse a dataset file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Coordinates per point, `None` for an empty dataset.
    pub fn dimension(&self) -> Option<usize> {
        if self.is_empty() {
            None
        } else {
            Some(self.points.ncols())
        }
    }
}

/// Parse a point from a comma-separated string, e.g. `"1.0, 2.0"`.
pub fn parse_point(s: &str) -> Result<Array1<f64>> {
    parse_coords(s)
        .map(Array1::from)
        .map_err(KnnError::invalid)
}

/// Stack equally long rows into a matrix, one row per point.
pub fn points_from_rows(rows: &[Vec<f64>]) -> Result<Array2<f64>> {
    let ncols = rows.first().map_or(0, Vec::len);
    if let Some(bad) = rows.iter().find(|r| r.len() != ncols) {
        return Err(KnnError::dimension_mismatch(ncols, bad.len()));
    }

    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), ncols), flat)
        .map_err(|e| KnnError::invalid(e.to_string()))
}

fn parse_coords(s: &str) -> std::result::Result<Vec<f64>, String> {
    if s.trim().is_empty() {
        return Err("point has no coordinates".to_string());
    }
    s.split(',')
        .map(|x| {
            x.trim()
                .parse::<f64>()
                .map_err(|_| format!("invalid number: {:?}", x.trim()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_parse_dataset() {
        let text = "# header\nA, 0.0, 0.0\n\nB,10,10\nA,1,1\n";
        let data = Dataset::parse(text).unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data.dimension(), Some(2));
        assert_eq!(data.labels, vec!["A", "B", "A"]);
        assert_eq!(data.points, array![[0.0, 0.0], [10.0, 10.0], [1.0, 1.0]]);
    }

    #[test]
    fn test_parse_reports_line_number() {
        let err = Dataset::parse("A,1,2\nB,1,x\n").unwrap_err();
        assert!(err.to_string().contains("line 2"), "{}", err);

        let err = Dataset::parse("A,1,2\n\nB,1\n").unwrap_err();
        assert!(err.to_string().contains("line 3"), "{}", err);

        assert!(Dataset::parse("A\n").is_err());
    }

    #[test]
    fn test_parse_empty_dataset() {
        let data = Dataset::parse("# nothing here\n").unwrap();
        assert!(data.is_empty());
        assert_eq!(data.dimension(), None);
    }

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("1.0, 2.0, 3.0").unwrap(), array![1.0, 2.0, 3.0]);
        assert!(parse_point("1.0,,2.0").unwrap_err().is_invalid_input());
        assert!(parse_point("").is_err());
    }

    #[test]
    fn test_points_from_rows_rejects_ragged() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(points_from_rows(&rows).unwrap_err().is_invalid_input());

        let rows = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        assert_eq!(points_from_rows(&rows).unwrap(), array![[1.0, 2.0], [3.0, 4.0]]);
    }
}
