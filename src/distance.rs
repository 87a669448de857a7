//! Vector math used by the classifier: Euclidean distance over ndarray points

use ndarray::ArrayView1;

use crate::error::{KnnError, Result};

/// Distance and shape primitives consumed by the classifier.
///
/// Implementations must be a metric (the anchor pruning relies on the
/// triangle inequality) and symmetric, so that `distance(a, b)` and
/// `distance(b, a)` produce the same value.
pub trait VectorMath: Send + Sync {
    /// Distance between two points of equal dimensionality.
    fn distance(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64;

    /// Number of coordinates in a point.
    fn dimensionality(&self, a: ArrayView1<f64>) -> usize {
        a.len()
    }
}

/// Euclidean (L2) distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Euclidean;

impl VectorMath for Euclidean {
    fn distance(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        euclidean_distance(a, b)
    }
}

/// Compute Euclidean (L2) distance between two points
pub fn euclidean_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    (&a - &b).mapv(|x| x * x).sum().sqrt()
}

/// Validate a point against an `expected` dimension and return its own.
///
/// Rejects points with no coordinates and points with a NaN or infinite
/// coordinate, which would break the total order on distances.
pub(crate) fn check_point<M: VectorMath + ?Sized>(
    metric: &M,
    point: ArrayView1<f64>,
    expected: Option<usize>,
) -> Result<usize> {
    let dim = metric.dimensionality(point);
    if dim == 0 {
        return Err(KnnError::invalid("point has no coordinates"));
    }
    if let Some(expected) = expected {
        if dim != expected {
            return Err(KnnError::dimension_mismatch(expected, dim));
        }
    }
    if point.iter().any(|x| !x.is_finite()) {
        return Err(KnnError::invalid("point has a non-finite coordinate"));
    }
    Ok(dim)
}
