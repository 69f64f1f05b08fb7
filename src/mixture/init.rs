//! K-means based parameter initialization.
//!
//! Runs a deterministic k-means (farthest-point seeding, Lloyd refinement)
//! and converts the result into starting mixture parameters: centroid
//! means, uniform priors, identity covariances.

use crate::error::{MezclaError, Result};
use crate::mixture::MixtureParams;
use crate::primitives::{Matrix, Vector};
use crate::traits::Initializer;
use serde::{Deserialize, Serialize};

/// Default [`Initializer`]: k-means centroids, uniform priors, identity
/// covariances.
///
/// The seed only selects the first centroid; the remaining centroids are
/// chosen by farthest-point selection and refined with Lloyd iterations,
/// so the whole initialization is deterministic for a given seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeansInit {
    /// Maximum Lloyd iterations.
    max_iter: usize,
    /// Centroid-shift threshold for early stopping.
    tol: f64,
    /// Seed selecting the first centroid.
    random_state: Option<u64>,
}

impl Default for KMeansInit {
    fn default() -> Self {
        Self::new()
    }
}

impl KMeansInit {
    /// Creates an initializer with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_iter: 100,
            tol: 1e-4,
            random_state: None,
        }
    }

    /// Sets the maximum number of Lloyd iterations.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the seed selecting the first centroid.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Farthest-point centroid seeding.
    fn seed_centroids(&self, x: &Matrix<f64>, k: usize) -> Matrix<f64> {
        let (n_samples, n_features) = x.shape();
        let mut centroids_data = Vec::with_capacity(k * n_features);

        let seed = self.random_state.unwrap_or(42);
        let first_idx = (seed as usize) % n_samples;
        for j in 0..n_features {
            centroids_data.push(x.get(first_idx, j));
        }

        for _ in 1..k {
            let n_current = centroids_data.len() / n_features;
            let mut min_distances = vec![f64::INFINITY; n_samples];

            for (i, min_dist) in min_distances.iter_mut().enumerate() {
                for c in 0..n_current {
                    let mut dist_sq = 0.0;
                    for j in 0..n_features {
                        let diff = x.get(i, j) - centroids_data[c * n_features + j];
                        dist_sq += diff * diff;
                    }
                    if dist_sq < *min_dist {
                        *min_dist = dist_sq;
                    }
                }
            }

            // Next centroid: the point farthest from all current centroids.
            let mut max_dist = -1.0;
            let mut max_idx = 0;
            for (i, &dist) in min_distances.iter().enumerate() {
                if dist > max_dist {
                    max_dist = dist;
                    max_idx = i;
                }
            }

            for j in 0..n_features {
                centroids_data.push(x.get(max_idx, j));
            }
        }

        Matrix::from_vec(k, n_features, centroids_data)
            .expect("centroid dimensions match allocation")
    }

    /// Assigns each sample to the nearest centroid.
    fn assign_labels(x: &Matrix<f64>, centroids: &Matrix<f64>) -> Vec<usize> {
        let (n_samples, n_features) = x.shape();
        let k = centroids.n_rows();
        let mut labels = vec![0; n_samples];

        for (i, label) in labels.iter_mut().enumerate() {
            let mut min_dist = f64::INFINITY;
            for c in 0..k {
                let mut dist_sq = 0.0;
                for j in 0..n_features {
                    let diff = x.get(i, j) - centroids.get(c, j);
                    dist_sq += diff * diff;
                }
                if dist_sq < min_dist {
                    min_dist = dist_sq;
                    *label = c;
                }
            }
        }

        labels
    }

    /// Lloyd refinement of the seeded centroids.
    fn refine(&self, x: &Matrix<f64>, mut centroids: Matrix<f64>) -> Matrix<f64> {
        let (n_samples, n_features) = x.shape();
        let k = centroids.n_rows();

        for _ in 0..self.max_iter {
            let labels = Self::assign_labels(x, &centroids);

            let mut sums = vec![0.0; k * n_features];
            let mut counts = vec![0usize; k];
            for (i, &label) in labels.iter().enumerate() {
                counts[label] += 1;
                for j in 0..n_features {
                    sums[label * n_features + j] += x.get(i, j);
                }
            }

            let mut shift: f64 = 0.0;
            for c in 0..k {
                // A centroid that lost all its points keeps its position.
                if counts[c] == 0 {
                    continue;
                }
                for j in 0..n_features {
                    let new_val = sums[c * n_features + j] / counts[c] as f64;
                    let delta = new_val - centroids.get(c, j);
                    shift += delta * delta;
                    centroids.set(c, j, new_val);
                }
            }

            if shift.sqrt() < self.tol {
                break;
            }
        }

        centroids
    }
}

impl Initializer for KMeansInit {
    fn initialize(&self, x: &Matrix<f64>, k: usize) -> Result<MixtureParams> {
        let (n, d) = crate::mixture::validate_dataset(x)?;
        if k == 0 {
            return Err(MezclaError::invalid_input("k", k, ">= 1"));
        }
        if k > n {
            return Err(MezclaError::invalid_input(
                "k",
                k,
                "<= number of data points",
            ));
        }

        let centroids = self.refine(x, self.seed_centroids(x, k));

        Ok(MixtureParams {
            priors: Vector::from_vec(vec![1.0 / k as f64; k]),
            means: centroids,
            covariances: (0..k).map(|_| Matrix::eye(d)).collect(),
        })
    }
}
