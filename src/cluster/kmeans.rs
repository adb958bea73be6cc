//! Fixed-k K-Means over (njs, jd) points.
//!
//! Iteration:
//! 1. assign each observation to its nearest centroid (Euclidean; ties go to
//!    the lowest centroid index)
//! 2. move every non-empty cluster's centroid to the mean of its members;
//!    empty clusters keep their previous centroid
//! 3. stop once no centroid moved by `tolerance` or more, or after
//!    `max_iterations` passes
//!
//! The starting centroids are configuration, not randomness, so a given input
//! always produces the same partition.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Centroid, Observation};
use crate::error::PipelineError;

/// Clustering options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansOptions {
    /// Number of clusters. Must equal `initial_centroids.len()`.
    pub k: usize,
    pub max_iterations: usize,
    /// Centroid movement below this distance counts as converged.
    pub tolerance: f64,
    pub initial_centroids: Vec<Centroid>,
}

impl Default for KMeansOptions {
    fn default() -> Self {
        Self {
            k: 2,
            max_iterations: 300,
            tolerance: 0.001,
            // Low NJS with long JD, and high NJS with short JD.
            initial_centroids: vec![Centroid::new(16.0, 18.5), Centroid::new(18.0, 14.0)],
        }
    }
}

impl KMeansOptions {
    /// Options seeded at the given centroids (`k` follows the seed count).
    pub fn with_seeds(initial_centroids: Vec<Centroid>) -> Self {
        Self {
            k: initial_centroids.len(),
            initial_centroids,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.k == 0 {
            return Err(PipelineError::InvalidConfig(
                "cluster count must be >= 1".to_string(),
            ));
        }
        if self.initial_centroids.len() != self.k {
            return Err(PipelineError::InvalidConfig(format!(
                "{} initial centroid(s) given for {} cluster(s)",
                self.initial_centroids.len(),
                self.k
            )));
        }
        if self
            .initial_centroids
            .iter()
            .any(|c| !(c.njs.is_finite() && c.jd.is_finite()))
        {
            return Err(PipelineError::InvalidConfig(
                "initial centroids must be finite".to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_iterations must be >= 1".to_string(),
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "convergence tolerance must be finite and >= 0 (got {})",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// One group of observations and the centroid it ended on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub index: usize,
    pub centroid: Centroid,
    pub members: Vec<Observation>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// `(min, max)` NJS over the members.
    pub fn njs_range(&self) -> Option<(f64, f64)> {
        njs_range(&self.members)
    }
}

/// `(min, max)` NJS over `observations`, or `None` when empty.
pub fn njs_range(observations: &[Observation]) -> Option<(f64, f64)> {
    let mut iter = observations.iter();
    let first = iter.next()?;
    let mut lo = first.njs;
    let mut hi = first.njs;
    for o in iter {
        lo = lo.min(o.njs);
        hi = hi.max(o.njs);
    }
    Some((lo, hi))
}

/// Result of a K-Means run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clustering {
    /// Always exactly `k` clusters; some may be empty.
    pub clusters: Vec<Cluster>,
    /// Number of assignment passes performed.
    pub iterations: usize,
    /// Whether the tolerance was met before `max_iterations` ran out.
    pub converged: bool,
}

/// Partition `observations` into `opts.k` clusters.
pub fn kmeans(observations: &[Observation], opts: &KMeansOptions) -> Result<Clustering, PipelineError> {
    opts.validate()?;

    let k = opts.k;
    let mut centroids = opts.initial_centroids.clone();
    let mut assignment = vec![0usize; observations.len()];
    let mut iterations = 0usize;
    let mut converged = false;

    while iterations < opts.max_iterations {
        iterations += 1;

        for (slot, obs) in assignment.iter_mut().zip(observations) {
            *slot = nearest_centroid(&centroids, obs);
        }

        let previous = centroids.clone();
        let mut sums = vec![(0.0f64, 0.0f64, 0usize); k];
        for (&idx, obs) in assignment.iter().zip(observations) {
            let s = &mut sums[idx];
            s.0 += obs.njs;
            s.1 += obs.jd;
            s.2 += 1;
        }
        for (centroid, &(sum_njs, sum_jd, count)) in centroids.iter_mut().zip(&sums) {
            if count == 0 {
                continue;
            }
            *centroid = Centroid::new(sum_njs / count as f64, sum_jd / count as f64);
        }

        let max_shift = centroids
            .iter()
            .zip(&previous)
            .map(|(c, p)| c.shift_from(p))
            .fold(0.0f64, f64::max);
        debug!(iteration = iterations, max_shift, "k-means pass");

        if max_shift < opts.tolerance {
            converged = true;
            break;
        }
    }

    // The last pass moved centroids after assigning; members are reported
    // against the assignment that produced the final centroids.
    let mut clusters: Vec<Cluster> = centroids
        .iter()
        .enumerate()
        .map(|(index, &centroid)| Cluster {
            index,
            centroid,
            members: Vec::new(),
        })
        .collect();
    for (&idx, obs) in assignment.iter().zip(observations) {
        clusters[idx].members.push(*obs);
    }

    Ok(Clustering {
        clusters,
        iterations,
        converged,
    })
}

fn nearest_centroid(centroids: &[Centroid], obs: &Observation) -> usize {
    let mut best_idx = 0;
    let mut best_dist = f64::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let d = c.distance_to(obs);
        // Strict `<` keeps the lowest index on ties.
        if d < best_dist {
            best_dist = d;
            best_idx = i;
        }
    }
    best_idx
}
