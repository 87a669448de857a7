//! Snapshot: save/load a trained classifier to/from disk.
//!
//! A snapshot directory holds `model.bin` (bincode) and `manifest.json`, a
//! human-readable summary that also carries the CRC32 of `model.bin`.

use std::collections::HashSet;
use std::fs;
use std::hash::Hash;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::FastKnn;
use crate::dataset::points_from_rows;
use crate::distance::VectorMath;
use crate::error::{KnnError, Result};
use crate::random::RandomSource;

/// Serializable state of a [`FastKnn`]. The per-anchor lists are derived
/// data and are rebuilt after loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot<L> {
    pub num_anchors: usize,
    pub dimension: Option<usize>,
    pub points: Vec<Vec<f64>>,
    pub labels: Vec<L>,
    pub anchors: Vec<usize>,
}

/// Summary written next to the snapshot payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub point_count: usize,
    pub dimension: Option<usize>,
    pub num_anchors: usize,
    pub anchor_count: usize,
    pub checksum: u32,
}

impl<L, M, R> FastKnn<L, M, R>
where
    L: Eq + Hash + Clone,
    M: VectorMath,
    R: RandomSource,
{
    /// Capture the training data and the current anchor set.
    pub fn to_snapshot(&self) -> ModelSnapshot<L> {
        ModelSnapshot {
            num_anchors: self.num_anchors(),
            dimension: self.dimension(),
            points: self.points().iter().map(|p| p.to_vec()).collect(),
            labels: self.labels().to_vec(),
            anchors: self.anchors().to_vec(),
        }
    }

    /// Rebuild a classifier from a snapshot. The anchor set is restored as
    /// saved; the anchor lists are built on the first query.
    pub fn from_snapshot(snapshot: ModelSnapshot<L>, metric: M, rng: R) -> Result<Self> {
        if snapshot.points.len() != snapshot.labels.len() {
            return Err(corrupted(format!(
                "{} points but {} labels",
                snapshot.points.len(),
                snapshot.labels.len()
            )));
        }
        let dimension = snapshot.points.first().map(Vec::len);
        if dimension != snapshot.dimension {
            return Err(corrupted(format!(
                "recorded dimension {:?} does not match stored points ({:?})",
                snapshot.dimension, dimension
            )));
        }
        if snapshot.anchors.len() > snapshot.num_anchors {
            return Err(corrupted(format!(
                "{} anchors exceed the target of {}",
                snapshot.anchors.len(),
                snapshot.num_anchors
            )));
        }
        let mut seen = HashSet::new();
        for &anchor in &snapshot.anchors {
            if anchor >= snapshot.points.len() || !seen.insert(anchor) {
                return Err(corrupted(format!("invalid anchor index {}", anchor)));
            }
        }

        let points = points_from_rows(&snapshot.points).map_err(|e| corrupted(e.to_string()))?;
        let mut knn = Self::with_parts(snapshot.num_anchors, metric, rng);
        knn.insert_batch(points.view(), &snapshot.labels)
            .map_err(|e| corrupted(e.to_string()))?;
        knn.restore_anchors(snapshot.anchors);
        Ok(knn)
    }
}

/// Manages saving and loading classifier snapshots.
pub struct SnapshotManager {
    dir: PathBuf,
}

impl SnapshotManager {
    /// Create a snapshot manager for the given directory.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn snapshot_path(&self) -> PathBuf {
        self.dir.join("model.bin")
    }

    fn manifest_path(&self) -> PathBuf {
        self.dir.join("manifest.json")
    }

    /// Save a snapshot to disk.
    pub fn save<L: Serialize>(&self, snapshot: &ModelSnapshot<L>) -> Result<()> {
        let data = bincode::serialize(snapshot)
            .map_err(|e| KnnError::SerializationError(e.to_string()))?;
        fs::write(self.snapshot_path(), &data)?;

        let manifest = Manifest {
            point_count: snapshot.points.len(),
            dimension: snapshot.dimension,
            num_anchors: snapshot.num_anchors,
            anchor_count: snapshot.anchors.len(),
            checksum: crc32fast::hash(&data),
        };
        let manifest_bytes = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| KnnError::SerializationError(e.to_string()))?;
        fs::write(self.manifest_path(), &manifest_bytes)?;

        debug!(dir = %self.dir.display(), points = manifest.point_count, "saved snapshot");
        Ok(())
    }

    /// Load a snapshot from disk, or return None if no snapshot exists.
    pub fn load<L: DeserializeOwned>(&self) -> Result<Option<ModelSnapshot<L>>> {
        let path = self.snapshot_path();
        if !path.exists() {
            return Ok(None);
        }

        let manifest = self
            .manifest()?
            .ok_or_else(|| corrupted("missing manifest.json"))?;
        let data = fs::read(&path)?;
        let checksum = crc32fast::hash(&data);
        if checksum != manifest.checksum {
            return Err(corrupted(format!(
                "checksum mismatch: manifest {:08x}, payload {:08x}",
                manifest.checksum, checksum
            )));
        }

        let snapshot: ModelSnapshot<L> = bincode::deserialize(&data)
            .map_err(|e| KnnError::SerializationError(e.to_string()))?;
        Ok(Some(snapshot))
    }

    /// Read the manifest, if one has been written.
    pub fn manifest(&self) -> Result<Option<Manifest>> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(path)?;
        let manifest = serde_json::from_slice(&bytes)
            .map_err(|e| KnnError::SerializationError(e.to_string()))?;
        Ok(Some(manifest))
    }

    /// Check if a snapshot exists.
    pub fn exists(&self) -> bool {
        self.snapshot_path().exists()
    }
}

fn corrupted(reason: impl Into<String>) -> KnnError {
    KnnError::Corrupted {
        reason: reason.into(),
    }
}
