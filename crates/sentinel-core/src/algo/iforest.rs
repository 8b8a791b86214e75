//! Isolation Forest for Batch Outlier Scoring
//!
//! Each tree recursively partitions a random subsample with axis-aligned
//! cuts at random positions. Outliers sit in sparse regions, so they are
//! separated after few cuts: a short average path length means anomalous.
//!
//! Key properties:
//! - Fit and score over one snapshot; nothing is kept between invocations
//! - Seeded RNG, so the same rows always produce the same scores
//! - Constant features are never chosen for a cut
//!
//! Reference: "Isolation Forest" (Liu, Ting, Zhou, ICDM 2008)

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

use super::stats;
use crate::config::ScoringConfig;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// A node in an isolation tree
#[derive(Debug, Clone)]
enum ItreeNode {
    Internal {
        split_dim: usize,
        split_value: f64,
        left: Box<ItreeNode>,
        right: Box<ItreeNode>,
    },
    /// Terminal node holding `size` training points
    External { size: usize },
}

#[derive(Debug, Clone)]
struct IsolationTree {
    root: ItreeNode,
}

impl IsolationTree {
    fn grow(points: Vec<&[f64]>, height_limit: usize, rng: &mut StdRng) -> Self {
        Self {
            root: grow_recursive(points, 0, height_limit, rng),
        }
    }

    /// Depth at which `point` lands, plus the expected remaining depth of
    /// the leaf it lands in
    fn path_length(&self, point: &[f64]) -> f64 {
        let mut node = &self.root;
        let mut depth = 0.0;
        loop {
            match node {
                ItreeNode::Internal {
                    split_dim,
                    split_value,
                    left,
                    right,
                } => {
                    depth += 1.0;
                    node = if point[*split_dim] <= *split_value {
                        left
                    } else {
                        right
                    };
                }
                ItreeNode::External { size } => return depth + average_path_length(*size),
            }
        }
    }
}

fn grow_recursive(
    points: Vec<&[f64]>,
    depth: usize,
    height_limit: usize,
    rng: &mut StdRng,
) -> ItreeNode {
    if depth >= height_limit || points.len() <= 1 {
        return ItreeNode::External { size: points.len() };
    }

    // Only features with spread in this node can separate anything
    let dims = points[0].len();
    let mut candidates = Vec::with_capacity(dims);
    for dim in 0..dims {
        let (lo, hi) = points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p[dim]), hi.max(p[dim]))
            });
        if hi > lo {
            candidates.push((dim, lo, hi));
        }
    }
    if candidates.is_empty() {
        return ItreeNode::External { size: points.len() };
    }

    let (split_dim, lo, hi) = candidates[rng.random_range(0..candidates.len())];
    let mut split_value = lo + rng.random::<f64>() * (hi - lo);
    if !(split_value < hi) {
        split_value = lo;
    }

    let (left, right): (Vec<&[f64]>, Vec<&[f64]>) =
        points.into_iter().partition(|p| p[split_dim] <= split_value);

    ItreeNode::Internal {
        split_dim,
        split_value,
        left: Box::new(grow_recursive(left, depth + 1, height_limit, rng)),
        right: Box::new(grow_recursive(right, depth + 1, height_limit, rng)),
    }
}

/// Average path length of an unsuccessful BST search over `n` points
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// A fitted isolation forest
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
    /// Decision threshold: the contamination quantile of training scores
    offset: f64,
}

impl IsolationForest {
    /// Fit a forest on `rows` (all rows must share one width)
    pub fn fit(rows: &[Vec<f64>], config: &ScoringConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let n_trees = config.n_estimators.max(1);
        let sample_size = config.max_samples.max(1).min(rows.len());
        let height_limit = (sample_size.max(2) as f64).log2().ceil() as usize;

        let trees = (0..n_trees)
            .map(|_| {
                let sample: Vec<&[f64]> = index::sample(&mut rng, rows.len(), sample_size)
                    .into_iter()
                    .map(|i| rows[i].as_slice())
                    .collect();
                IsolationTree::grow(sample, height_limit, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            sample_size,
            offset: 0.0,
        };
        let training_scores: Vec<f64> = rows.iter().map(|r| forest.score_sample(r)).collect();
        forest.offset = stats::quantile(&training_scores, config.contamination).unwrap_or(0.0);
        forest
    }

    /// Negated anomaly score in [-1, 0). Higher means more normal.
    pub fn score_sample(&self, point: &[f64]) -> f64 {
        let mean_path = self
            .trees
            .iter()
            .map(|tree| tree.path_length(point))
            .sum::<f64>()
            / self.trees.len().max(1) as f64;
        let norm = average_path_length(self.sample_size).max(f64::EPSILON);
        -(2f64.powf(-mean_path / norm))
    }

    /// Shifted scores: negative for the expected outliers, positive for inliers
    pub fn decision_function(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|r| self.score_sample(r) - self.offset).collect()
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}
