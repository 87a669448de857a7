//! Brute-force k-NN classifier, O(n) per query

use std::hash::Hash;

use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::anchor_list::AnchorEntry;
use crate::distance::{check_point, Euclidean, VectorMath};
use crate::error::{KnnError, Result};
use crate::vote::Method;

/// A classifier that computes the distance to every stored point.
///
/// Accepts the same input and aggregates the same way as
/// [`FastKnn`](crate::FastKnn), which makes it the reference to check anchor
/// searches against.
#[derive(Debug)]
pub struct ExhaustiveKnn<L, M = Euclidean> {
    points: Vec<Array1<f64>>,
    labels: Vec<L>,
    dimension: Option<usize>,
    metric: M,
}

impl<L: Eq + Hash + Clone> ExhaustiveKnn<L, Euclidean> {
    pub fn new() -> Self {
        Self::with_metric(Euclidean)
    }
}

impl<L: Eq + Hash + Clone> Default for ExhaustiveKnn<L, Euclidean> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Eq + Hash + Clone, M: VectorMath> ExhaustiveKnn<L, M> {
    pub fn with_metric(metric: M) -> Self {
        Self {
            points: Vec::new(),
            labels: Vec::new(),
            dimension: None,
            metric,
        }
    }

    pub fn insert(&mut self, point: ArrayView1<f64>, label: L) -> Result<()> {
        let dim = check_point(&self.metric, point, self.dimension)?;
        self.dimension = Some(dim);
        self.points.push(point.to_owned());
        self.labels.push(label);
        Ok(())
    }

    pub fn insert_batch(&mut self, points: ArrayView2<f64>, labels: &[L]) -> Result<()> {
        if points.nrows() != labels.len() {
            return Err(KnnError::invalid(format!(
                "batch has {} points but {} labels",
                points.nrows(),
                labels.len()
            )));
        }
        let mut dimension = self.dimension;
        for row in points.rows() {
            dimension = Some(check_point(&self.metric, row, dimension)?);
        }

        self.dimension = dimension;
        for (row, label) in points.rows().into_iter().zip(labels) {
            self.points.push(row.to_owned());
            self.labels.push(label.clone());
        }
        Ok(())
    }

    /// Every stored point sorted by `(distance, index)`, truncated to `k`.
    pub fn neighbors(&self, point: ArrayView1<f64>, k: usize) -> Result<Vec<AnchorEntry>> {
        if self.points.is_empty() {
            return Err(KnnError::invalid("cannot query an empty training set"));
        }
        if k == 0 || k > self.points.len() {
            return Err(KnnError::invalid(format!(
                "k must be in 1..={}, got {}",
                self.points.len(),
                k
            )));
        }
        check_point(&self.metric, point, self.dimension)?;

        let mut results: Vec<AnchorEntry> = self
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| AnchorEntry::new(i, self.metric.distance(point, p.view())))
            .collect();
        results.sort();
        results.truncate(k);
        Ok(results)
    }

    pub fn query(&self, point: ArrayView1<f64>, k: usize, method: Method) -> Result<L> {
        let neighbors = self.neighbors(point, k)?;
        method
            .aggregate(neighbors.iter().map(|n| &self.labels[n.index]))
            .ok_or_else(|| KnnError::invalid("no neighbors to aggregate"))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::FastKnn;
    use ndarray::array;

    #[test]
    fn test_exhaustive_basic() {
        let mut knn = ExhaustiveKnn::new();
        knn.insert(array![1.0, 0.0, 0.0].view(), 'a').unwrap();
        knn.insert(array![0.0, 1.0, 0.0].view(), 'b').unwrap();
        knn.insert(array![1.0, 1.0, 0.0].view(), 'b').unwrap();

        let results = knn.neighbors(array![1.0, 0.0, 0.0].view(), 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].index, 0); // exact match
        assert!(results[0].distance < 1e-12);
    }

    #[test]
    fn test_exhaustive_query_majority() {
        let mut knn = ExhaustiveKnn::new();
        let points = array![[0.0], [1.0], [2.0], [9.0]];
        knn.insert_batch(points.view(), &["near", "near", "far", "far"]).unwrap();

        assert_eq!(knn.query(array![0.4].view(), 3, Method::Mode).unwrap(), "near");
        assert_eq!(knn.len(), 4);
    }

    #[test]
    fn test_exhaustive_rejects_bad_input() {
        let mut knn: ExhaustiveKnn<u8> = ExhaustiveKnn::new();
        assert!(knn.neighbors(array![0.0].view(), 1).is_err());

        knn.insert(array![0.0, 0.0].view(), 1).unwrap();
        assert!(knn.insert(array![0.0].view(), 1).is_err());
        assert!(knn.neighbors(array![0.0, 0.0].view(), 2).is_err());
    }

    #[test]
    fn test_rejects_same_points_as_anchor_classifier() {
        let bad = [
            Array1::<f64>::zeros(0),
            array![f64::NAN, 0.0],
            array![0.0, f64::INFINITY],
            array![0.0, 0.0, 0.0],
        ];

        let mut exhaustive = ExhaustiveKnn::new();
        let mut fast = FastKnn::new(1);
        exhaustive.insert(array![1.0, 1.0].view(), 0u8).unwrap();
        fast.insert(array![1.0, 1.0].view(), 0u8).unwrap();

        for point in &bad {
            let slow = exhaustive.insert(point.view(), 1).unwrap_err();
            let quick = fast.insert(point.view(), 1).unwrap_err();
            assert!(slow.is_invalid_input() && quick.is_invalid_input());

            assert!(exhaustive.query(point.view(), 1, Method::Mode).is_err());
            assert!(fast.query(point.view(), 1, Method::Mode).is_err());
        }
        assert_eq!(exhaustive.len(), 1);
        assert_eq!(fast.len(), 1);

        // A bad first point must not fix the dimension either.
        let mut fresh: ExhaustiveKnn<u8> = ExhaustiveKnn::new();
        assert!(fresh.insert(array![f64::NAN].view(), 1).is_err());
        fresh.insert(array![1.0, 2.0].view(), 1).unwrap();

        let batch = array![[0.0, 0.0], [f64::NAN, 1.0]];
        assert!(fresh.insert_batch(batch.view(), &[2, 3]).is_err());
        assert_eq!(fresh.len(), 1);
    }
}
