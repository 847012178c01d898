//! Isolation Forest ensemble

use crate::anomaly::tree::{average_path_length, default_max_depth, RandomPartitionTree};
use crate::error::{AnomalyError, Result};
use ndarray::{Array1, ArrayView1, Zip};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Score given to every point when the sub-sample is a single point and
/// c(n) vanishes.
const NEUTRAL_SCORE: f64 = 0.5;

/// Isolation Forest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Number of trees
    pub n_trees: usize,
    /// Points drawn (without replacement) per tree
    pub sample_size: usize,
    /// Depth limit; derived from the effective sample size when unset
    pub max_depth: Option<usize>,
    /// Random seed
    pub seed: u64,
    /// Build and score on the rayon pool
    pub parallel: bool,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            sample_size: 256,
            max_depth: None,
            seed: 42,
            parallel: true,
        }
    }
}

impl EnsembleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set number of trees
    pub fn with_n_trees(mut self, n: usize) -> Self {
        self.n_trees = n;
        self
    }

    /// Set points per tree
    pub fn with_sample_size(mut self, n: usize) -> Self {
        self.sample_size = n;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(AnomalyError::invalid_config("n_trees", self.n_trees, "must be at least 1"));
        }
        if self.sample_size == 0 {
            return Err(AnomalyError::invalid_config(
                "sample_size",
                self.sample_size,
                "must be at least 1",
            ));
        }
        if self.max_depth == Some(0) {
            return Err(AnomalyError::invalid_config("max_depth", 0, "must be at least 1"));
        }
        Ok(())
    }
}

/// Anomaly score per input row, in row order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreTable {
    scores: Array1<f64>,
}

impl ScoreTable {
    pub fn new(scores: Array1<f64>) -> Self {
        Self { scores }
    }

    /// Score of the record at `row`
    pub fn get(&self, row: usize) -> Option<f64> {
        self.scores.get(row).copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn as_array(&self) -> &Array1<f64> {
        &self.scores
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.scores.iter().copied()
    }

    pub fn min(&self) -> Option<f64> {
        self.iter().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.iter().reduce(f64::max)
    }

    pub fn mean(&self) -> Option<f64> {
        self.scores.mean()
    }
}

/// A fitted ensemble of random partition trees.
///
/// Trees are immutable once `fit` returns; scoring only reads them, so a
/// fitted ensemble can be shared across the rayon pool.
#[derive(Debug, Clone)]
pub struct IsolationEnsemble {
    config: EnsembleConfig,
    trees: Vec<RandomPartitionTree>,
    /// Sub-sample size actually used (clipped to the dataset size)
    sample_size: usize,
    max_depth: usize,
}

impl IsolationEnsemble {
    /// Grow `config.n_trees` trees over `values`.
    ///
    /// Per-tree seeds are drawn up-front in tree order from a generator
    /// seeded with `config.seed`, so the parallel and sequential paths build
    /// identical forests.
    pub fn fit(config: &EnsembleConfig, values: ArrayView1<f64>) -> Result<Self> {
        config.validate()?;

        let n_samples = values.len();
        if n_samples == 0 {
            return Err(AnomalyError::InsufficientData(
                "cannot fit an ensemble on zero records".to_string(),
            ));
        }

        let sample_size = config.sample_size.min(n_samples);
        if sample_size < config.sample_size {
            warn!(
                requested = config.sample_size,
                available = n_samples,
                "sub-sample size exceeds dataset size, using the full dataset"
            );
        }
        let max_depth = config.max_depth.unwrap_or_else(|| default_max_depth(sample_size));

        let mut master = ChaCha8Rng::seed_from_u64(config.seed);
        let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master.gen()).collect();

        let grow = |seed: &u64| {
            let mut rng = ChaCha8Rng::seed_from_u64(*seed);
            let sample: Vec<f64> = rand::seq::index::sample(&mut rng, n_samples, sample_size)
                .iter()
                .map(|i| values[i])
                .collect();
            RandomPartitionTree::build(&sample, max_depth, &mut rng)
        };

        let trees: Vec<RandomPartitionTree> = if config.parallel {
            tree_seeds.par_iter().map(grow).collect()
        } else {
            tree_seeds.iter().map(grow).collect()
        };

        debug!(
            n_trees = trees.len(),
            sample_size,
            max_depth,
            "isolation ensemble fitted"
        );

        Ok(Self {
            config: config.clone(),
            trees,
            sample_size,
            max_depth,
        })
    }

    /// Mean isolation depth of `value` across every tree, summed in tree order
    pub fn mean_path_length(&self, value: f64) -> f64 {
        let total: f64 = self.trees.iter().map(|tree| tree.path_length(value)).sum();
        total / self.trees.len() as f64
    }

    /// Anomaly score in [0, 1]: s(x, n) = 2^(-E[h(x)] / c(n)).
    ///
    /// Near 1 means isolated in few splits; around 0.5 is a typical point.
    pub fn score(&self, value: f64) -> f64 {
        let expected = average_path_length(self.sample_size);
        if expected == 0.0 {
            return NEUTRAL_SCORE;
        }
        2.0_f64.powf(-self.mean_path_length(value) / expected)
    }

    /// Score every value, keeping row order
    pub fn score_samples(&self, values: ArrayView1<f64>) -> ScoreTable {
        let scores = if self.config.parallel {
            Zip::from(&values).par_map_collect(|&v| self.score(v))
        } else {
            values.map(|&v| self.score(v))
        };
        ScoreTable::new(scores)
    }

    pub fn trees(&self) -> &[RandomPartitionTree] {
        &self.trees
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Effective sub-sample size
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }
}
