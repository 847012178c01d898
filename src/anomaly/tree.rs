//! Randomized partition tree over a one-dimensional sample

use rand::distributions::Open01;
use rand::Rng;

/// Euler-Mascheroni constant used in the harmonic number approximation
const EULER_GAMMA: f64 = 0.5772156649;

/// Average path length of an unsuccessful search in a binary search tree
/// built over `n` points.
///
/// c(n) = 2 * H(n-1) - 2(n-1)/n for n > 1, with H(i) ~ ln(i) + gamma.
/// c(0) = c(1) = 0.
pub fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let n_f = n as f64;
    2.0 * ((n_f - 1.0).ln() + EULER_GAMMA) - 2.0 * (n_f - 1.0) / n_f
}

/// Default depth limit for a sub-sample of `sample_size` points
pub fn default_max_depth(sample_size: usize) -> usize {
    (sample_size.max(1) as f64).log2().ceil() as usize
}

/// Node of a partition tree
#[derive(Debug, Clone, PartialEq)]
pub enum PartitionNode {
    /// Internal node with split
    Internal {
        /// Split threshold
        threshold: f64,
        /// Subtree for values < threshold
        below: Box<PartitionNode>,
        /// Subtree for values >= threshold
        above: Box<PartitionNode>,
    },
    /// Leaf node
    Leaf {
        /// Number of sample points that reached this leaf
        size: usize,
    },
}

impl PartitionNode {
    fn grow(sample: &[f64], depth: usize, max_depth: usize, rng: &mut impl Rng) -> Self {
        if sample.len() <= 1 || depth >= max_depth {
            return PartitionNode::Leaf { size: sample.len() };
        }

        let min_val = sample.iter().copied().fold(f64::INFINITY, f64::min);
        let max_val = sample.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        // Indistinguishable points cannot be isolated any further
        if min_val == max_val {
            return PartitionNode::Leaf { size: sample.len() };
        }

        let u: f64 = rng.sample(Open01);
        let threshold = min_val + u * (max_val - min_val);

        let (below, above): (Vec<f64>, Vec<f64>) =
            sample.iter().partition(|&&v| v < threshold);

        PartitionNode::Internal {
            threshold,
            below: Box::new(Self::grow_side(&below, depth + 1, max_depth, rng)),
            above: Box::new(Self::grow_side(&above, depth + 1, max_depth, rng)),
        }
    }

    fn grow_side(sample: &[f64], depth: usize, max_depth: usize, rng: &mut impl Rng) -> Self {
        // Rounding can push the split onto an endpoint and leave one side empty
        if sample.is_empty() {
            PartitionNode::Leaf { size: 0 }
        } else {
            Self::grow(sample, depth, max_depth, rng)
        }
    }

    /// Number of nodes in this subtree
    pub fn node_count(&self) -> usize {
        match self {
            PartitionNode::Leaf { .. } => 1,
            PartitionNode::Internal { below, above, .. } => 1 + below.node_count() + above.node_count(),
        }
    }

    /// Length of the longest root-to-leaf path in this subtree
    pub fn height(&self) -> usize {
        match self {
            PartitionNode::Leaf { .. } => 0,
            PartitionNode::Internal { below, above, .. } => 1 + below.height().max(above.height()),
        }
    }
}

/// One tree of the isolation ensemble.
///
/// The sample it was grown from is not retained; only the split structure
/// and the leaf counts survive construction.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomPartitionTree {
    root: PartitionNode,
    max_depth: usize,
}

impl RandomPartitionTree {
    /// Build a tree over `sample`, splitting until every point is isolated,
    /// the points left are identical, or `max_depth` is reached.
    pub fn build(sample: &[f64], max_depth: usize, rng: &mut impl Rng) -> Self {
        Self {
            root: PartitionNode::grow(sample, 0, max_depth, rng),
            max_depth,
        }
    }

    /// Isolation depth of `value`, corrected by c(n) for the points left
    /// unresolved in the leaf it lands in.
    pub fn path_length(&self, value: f64) -> f64 {
        let mut node = &self.root;
        let mut depth = 0usize;
        loop {
            match node {
                PartitionNode::Leaf { size } => {
                    return depth as f64 + average_path_length(*size);
                }
                PartitionNode::Internal { threshold, below, above } => {
                    node = if value < *threshold { below } else { above };
                    depth += 1;
                }
            }
        }
    }

    pub fn root(&self) -> &PartitionNode {
        &self.root
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}
