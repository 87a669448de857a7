//! # anchor_knn
//!
//! A k-nearest-neighbor classifier for repeated queries against a growing
//! labeled dataset.
//!
//! This library provides:
//! - An anchor-indexed classifier that prunes its neighbor scan with the
//!   triangle inequality
//! - A brute-force reference classifier
//! - Labeled dataset parsing and snapshot persistence
//! - An HTTP API server
//!
//! ## Example
//!
//! ```rust
//! use anchor_knn::{FastKnn, Method};
//! use ndarray::array;
//!
//! let mut knn = FastKnn::new(1);
//! knn.insert(array![0.0, 0.0].view(), "A").unwrap();
//! knn.insert(array![10.0, 10.0].view(), "B").unwrap();
//! knn.insert(array![1.0, 1.0].view(), "A").unwrap();
//!
//! let label = knn.query(array![0.5, 0.5].view(), 1, Method::Mode).unwrap();
//! assert_eq!(label, "A");
//! ```

pub mod anchor_list;
pub mod classifier;
pub mod dataset;
pub mod distance;
pub mod error;
pub mod exhaustive;
pub mod metrics;
pub mod random;
pub mod server;
pub mod snapshot;
pub mod vote;

pub use anchor_list::{AnchorEntry, AnchorList};
pub use classifier::{AnchorStrategy, ClassifierParams, FastKnn};
pub use dataset::Dataset;
pub use distance::{Euclidean, VectorMath};
pub use error::{KnnError, Result};
pub use exhaustive::ExhaustiveKnn;
pub use random::{RandomSource, StdRandom};
pub use snapshot::{ModelSnapshot, SnapshotManager};
pub use vote::Method;
