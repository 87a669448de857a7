//! Anchor-indexed k-NN classifier.
//!
//! A handful of training points are picked as *anchors*. For every anchor the
//! classifier keeps all training points sorted by their distance to that
//! anchor. A query starts from the anchor nearest to the query point and walks
//! its list outwards; the triangle inequality bounds how close any remaining
//! entry can be to the query, so the walk stops once no remaining entry can
//! displace the current k-th best neighbor.
//!
//! The per-anchor lists are built lazily on the first query after the anchor
//! set changes, and from then on kept sorted as new points arrive.

use std::hash::Hash;
use std::str::FromStr;

use ndarray::{Array1, ArrayView1, ArrayView2};
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::anchor_list::{AnchorEntry, AnchorList};
use crate::distance::{check_point, Euclidean, VectorMath};
use crate::error::{KnnError, Result};
use crate::random::{RandomSource, StdRandom};
use crate::vote::Method;

/// Relative widening of the pruning bound. The bound sums two rounded
/// distances; without a few ulps of room an entry exactly tied with the k-th
/// neighbor can be pruned.
const PRUNE_SLACK: f64 = 1.0 + 4.0 * f64::EPSILON;

/// How a new anchor set is drawn from the training points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AnchorStrategy {
    /// Prefix of a uniform random permutation of the training indices.
    #[default]
    Random,
}

impl FromStr for AnchorStrategy {
    type Err = KnnError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "random" => Ok(AnchorStrategy::Random),
            other => Err(KnnError::invalid(format!(
                "unknown anchor selection strategy: {:?}",
                other
            ))),
        }
    }
}

/// Configuration for a [`FastKnn`].
#[derive(Debug, Clone)]
pub struct ClassifierParams {
    /// Target size of the anchor set.
    pub num_anchors: usize,
    /// Seed for anchor selection. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            num_anchors: 10,
            seed: None,
        }
    }
}

impl ClassifierParams {
    pub fn new(num_anchors: usize) -> Self {
        Self {
            num_anchors,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Whether the per-anchor lists reflect the current anchor set.
#[derive(Debug, Clone)]
enum IndexState {
    /// Anchors changed since the last build; no lists are held.
    Stale,
    /// One complete, sorted list per anchor, parallel to `FastKnn::anchors`.
    Fresh(Vec<AnchorList>),
}

impl IndexState {
    fn lists(&self) -> Option<&[AnchorList]> {
        match self {
            IndexState::Fresh(lists) => Some(lists.as_slice()),
            IndexState::Stale => None,
        }
    }
}

/// k-NN classifier over an append-only training set, generic over the label
/// type.
#[derive(Debug)]
pub struct FastKnn<L, M = Euclidean, R = StdRandom> {
    num_anchors: usize,
    /// Training points; position is the point's identity.
    points: Vec<Array1<f64>>,
    /// `labels[i]` belongs to `points[i]`.
    labels: Vec<L>,
    /// Indices into `points`, in selection order.
    anchors: Vec<usize>,
    state: IndexState,
    /// Enforced point dimension, fixed by the first insertion.
    dimension: Option<usize>,
    metric: M,
    rng: R,
}

impl<L> FastKnn<L, Euclidean, StdRandom>
where
    L: Eq + Hash + Clone,
{
    /// Create an empty classifier that will use up to `num_anchors` anchors.
    pub fn new(num_anchors: usize) -> Self {
        Self::with_params(ClassifierParams::new(num_anchors))
    }

    /// Create an empty classifier from explicit parameters.
    pub fn with_params(params: ClassifierParams) -> Self {
        let rng = match params.seed {
            Some(seed) => StdRandom::seeded(seed),
            None => StdRandom::from_entropy(),
        };
        Self::with_parts(params.num_anchors, Euclidean, rng)
    }
}

impl<L, M, R> FastKnn<L, M, R>
where
    L: Eq + Hash + Clone,
    M: VectorMath,
    R: RandomSource,
{
    /// Create an empty classifier with the given vector math and random source.
    pub fn with_parts(num_anchors: usize, metric: M, rng: R) -> Self {
        Self {
            num_anchors,
            points: Vec::new(),
            labels: Vec::new(),
            anchors: Vec::new(),
            state: IndexState::Stale,
            dimension: None,
            metric,
            rng,
        }
    }

    /// Replace the anchor set. The per-anchor lists are discarded and rebuilt
    /// on the next query.
    pub fn select_anchors(&mut self, strategy: AnchorStrategy) {
        match strategy {
            AnchorStrategy::Random => {
                let mut order = self.rng.shuffle_permutation(self.points.len());
                order.truncate(self.num_anchors);
                self.anchors = order;
            }
        }
        self.state = IndexState::Stale;
        debug!(
            anchors = self.anchors.len(),
            points = self.points.len(),
            "selected anchors"
        );
    }

    /// Add one labeled training point.
    pub fn insert(&mut self, point: ArrayView1<f64>, label: L) -> Result<()> {
        let dim = check_point(&self.metric, point, self.dimension)?;
        self.dimension = Some(dim);
        self.push(point, label);
        Ok(())
    }

    /// Add a batch of labeled training points, one per row of `points`.
    ///
    /// Either every row is inserted or, on error, none is.
    pub fn insert_batch(&mut self, points: ArrayView2<f64>, labels: &[L]) -> Result<()> {
        if points.nrows() != labels.len() {
            return Err(KnnError::invalid(format!(
                "batch has {} points but {} labels",
                points.nrows(),
                labels.len()
            )));
        }
        if points.nrows() == 0 {
            return Ok(());
        }

        let mut dimension = self.dimension;
        for row in points.rows() {
            dimension = Some(check_point(&self.metric, row, dimension)?);
        }

        self.dimension = dimension;
        for (row, label) in points.rows().into_iter().zip(labels) {
            self.push(row, label.clone());
        }
        Ok(())
    }

    /// Predict a label for `point` from its `k` nearest training points.
    pub fn query(&mut self, point: ArrayView1<f64>, k: usize, method: Method) -> Result<L> {
        let neighbors = self.neighbors(point, k)?;
        method
            .aggregate(neighbors.iter().map(|n| &self.labels[n.index]))
            .ok_or_else(|| KnnError::invalid("no neighbors to aggregate"))
    }

    /// Predict a label for every row of `points`.
    pub fn query_batch(
        &mut self,
        points: ArrayView2<f64>,
        k: usize,
        method: Method,
    ) -> Result<Vec<L>> {
        points
            .rows()
            .into_iter()
            .map(|row| self.query(row, k, method))
            .collect()
    }

    /// The `k` nearest training points to `point`, nearest first, as
    /// `(distance to point, index)` entries.
    pub fn neighbors(&mut self, point: ArrayView1<f64>, k: usize) -> Result<Vec<AnchorEntry>> {
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

        if self.anchors.len() < self.num_anchors {
            self.select_anchors(AnchorStrategy::Random);
        }
        self.rebuild();

        let lists = match self.state.lists() {
            Some(lists) if !lists.is_empty() => lists,
            _ => return Ok(self.scan_all(point, k)),
        };

        // Nearest anchor; the first one wins ties.
        let mut chosen = 0;
        let mut anchor_dist = self.distance_to(point, self.anchors[0]);
        for (slot, &anchor) in self.anchors.iter().enumerate().skip(1) {
            let dist = self.distance_to(point, anchor);
            if dist < anchor_dist {
                chosen = slot;
                anchor_dist = dist;
            }
        }

        let list = &lists[chosen];
        let mut found = AnchorList::with_capacity(k + 1);
        let mut scanned = 0;
        for entry in list.iter() {
            scanned += 1;
            found.insert(AnchorEntry::new(
                entry.index,
                self.distance_to(point, entry.index),
            ));
            // Anything past position k can never re-enter the top k.
            found.truncate(k + 1);
            if found.len() > k {
                let kth = found.as_slice()[k - 1].distance;
                if (anchor_dist + kth) * PRUNE_SLACK < entry.distance {
                    break;
                }
            }
        }
        trace!(
            anchor = self.anchors[chosen],
            scanned,
            total = list.len(),
            "anchor search"
        );

        found.truncate(k);
        Ok(found.into_vec())
    }

    /// Build the per-anchor lists if the index is stale.
    pub fn rebuild(&mut self) {
        if let IndexState::Fresh(_) = self.state {
            return;
        }

        let points = &self.points;
        let metric = &self.metric;
        let lists: Vec<AnchorList> = self
            .anchors
            .par_iter()
            .map(|&anchor| {
                let origin = points[anchor].view();
                let entries = points
                    .iter()
                    .enumerate()
                    .map(|(i, p)| AnchorEntry::new(i, metric.distance(p.view(), origin)))
                    .collect();
                AnchorList::from_unsorted(entries)
            })
            .collect();

        debug!(
            anchors = lists.len(),
            points = self.points.len(),
            "rebuilt anchor index"
        );
        self.state = IndexState::Fresh(lists);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Target size of the anchor set.
    pub fn num_anchors(&self) -> usize {
        self.num_anchors
    }

    /// Dimension of the stored points, once any have been inserted.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Current anchors as training-point indices, in selection order.
    pub fn anchors(&self) -> &[usize] {
        &self.anchors
    }

    /// Whether the per-anchor lists are built and current.
    pub fn is_fresh(&self) -> bool {
        matches!(self.state, IndexState::Fresh(_))
    }

    /// The sorted list for the anchor at training index `anchor`, if the
    /// index is fresh and `anchor` is one of the current anchors.
    pub fn anchor_list(&self, anchor: usize) -> Option<&AnchorList> {
        let slot = self.anchors.iter().position(|&a| a == anchor)?;
        self.state.lists()?.get(slot)
    }

    pub fn point(&self, index: usize) -> Option<ArrayView1<f64>> {
        self.points.get(index).map(|p| p.view())
    }

    pub fn label(&self, index: usize) -> Option<&L> {
        self.labels.get(index)
    }

    /// All labels, indexed like the training points.
    pub fn labels(&self) -> &[L] {
        &self.labels
    }

    pub(crate) fn points(&self) -> &[Array1<f64>] {
        &self.points
    }

    /// Restore a previously saved anchor set without drawing a new one.
    pub(crate) fn restore_anchors(&mut self, anchors: Vec<usize>) {
        self.anchors = anchors;
        self.state = IndexState::Stale;
    }

    fn push(&mut self, point: ArrayView1<f64>, label: L) {
        let index = self.points.len();
        self.points.push(point.to_owned());
        self.labels.push(label);

        if let IndexState::Fresh(lists) = &mut self.state {
            let points = &self.points;
            for (list, &anchor) in lists.iter_mut().zip(&self.anchors) {
                let dist = self.metric.distance(point, points[anchor].view());
                list.insert(AnchorEntry::new(index, dist));
            }
        }
    }

    /// Exhaustive scan, used when there are no anchor lists to prune with.
    fn scan_all(&self, point: ArrayView1<f64>, k: usize) -> Vec<AnchorEntry> {
        let entries = (0..self.points.len())
            .map(|i| AnchorEntry::new(i, self.distance_to(point, i)))
            .collect();
        let mut found = AnchorList::from_unsorted(entries);
        found.truncate(k);
        found.into_vec()
    }

    fn distance_to(&self, point: ArrayView1<f64>, index: usize) -> f64 {
        self.metric.distance(point, self.points[index].view())
    }
}
