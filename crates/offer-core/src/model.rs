use crate::schema::ensure_schema_version;

use anyhow::{anyhow, ensure, Context, Result};
use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;

/// Classes the served model distinguishes.
pub const N_CLASSES: usize = 3;

/// Sentinel in `children_left` / `children_right` marking a leaf.
const TREE_LEAF: i64 = -1;

/// A fitted classifier exposing class probabilities.
///
/// Implementations are immutable after construction and shared across
/// requests behind an `Arc`.
pub trait ProbaModel: Send + Sync + fmt::Debug {
    /// Input columns, in the order the model was fitted on.
    fn feature_names(&self) -> &[String];

    fn n_classes(&self) -> usize;

    /// `x` is `(n_samples, n_features)`; the result is
    /// `(n_samples, n_classes)`.
    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>>;
}

/// On-disk layout of one fitted decision tree (flat node arrays).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeArrays {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class counts (or weights).
    pub value: Vec<Vec<f64>>,
}

/// On-disk forest artifact (`*.json` or `*.json.gz`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestArtifact {
    pub schema_version: u32,
    pub n_classes: usize,
    pub feature_names: Vec<String>,
    pub trees: Vec<TreeArrays>,
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        proba: Vec<f64>,
    },
}

#[derive(Debug, Clone)]
struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn from_arrays(t: &TreeArrays, n_features: usize, n_classes: usize) -> Result<Self> {
        let n = t.children_left.len();
        ensure!(n > 0, "tree has no nodes");
        ensure!(
            t.children_right.len() == n
                && t.feature.len() == n
                && t.threshold.len() == n
                && t.value.len() == n,
            "tree node arrays differ in length (children_left has {n})"
        );

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let (l, r) = (t.children_left[i], t.children_right[i]);
            if l == TREE_LEAF {
                ensure!(r == TREE_LEAF, "node {i}: leaf with a right child");
                let counts = &t.value[i];
                ensure!(
                    counts.len() == n_classes,
                    "node {i}: value has {} classes, expected {n_classes}",
                    counts.len()
                );
                ensure!(
                    counts.iter().all(|c| c.is_finite() && *c >= 0.0),
                    "node {i}: negative or non-finite class weight"
                );
                let total: f64 = counts.iter().sum();
                ensure!(total > 0.0, "node {i}: leaf with zero total weight");
                nodes.push(Node::Leaf {
                    proba: counts.iter().map(|c| c / total).collect(),
                });
                continue;
            }

            // Children always sit after their parent, which keeps the walk acyclic.
            let child = |c: i64| -> Result<usize> {
                usize::try_from(c)
                    .ok()
                    .filter(|&c| c > i && c < n)
                    .ok_or_else(|| anyhow!("node {i}: child index {c} out of range"))
            };
            let feature = usize::try_from(t.feature[i])
                .ok()
                .filter(|&f| f < n_features)
                .ok_or_else(|| anyhow!("node {i}: feature index {} out of range", t.feature[i]))?;
            ensure!(
                !t.threshold[i].is_nan(),
                "node {i}: NaN split threshold"
            );

            nodes.push(Node::Split {
                feature,
                threshold: t.threshold[i],
                left: child(l)?,
                right: child(r)?,
            });
        }
        Ok(Self { nodes })
    }

    fn leaf_proba(&self, row: ArrayView1<'_, f64>) -> &[f64] {
        let mut i = 0;
        loop {
            match &self.nodes[i] {
                Node::Leaf { proba } => return proba,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    i = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Bagged decision-tree ensemble: the probability is the mean of each
/// tree's normalized leaf distribution.
#[derive(Debug, Clone)]
pub struct ForestModel {
    feature_names: Vec<String>,
    n_classes: usize,
    trees: Vec<DecisionTree>,
}

impl ForestModel {
    pub fn from_artifact(a: &ForestArtifact) -> Result<Self> {
        ensure_schema_version(a.schema_version)?;
        ensure!(
            a.n_classes == N_CLASSES,
            "artifact has n_classes={}, service expects {N_CLASSES}",
            a.n_classes
        );
        ensure!(!a.feature_names.is_empty(), "artifact has no feature_names");
        ensure!(!a.trees.is_empty(), "artifact has no trees");

        let trees = a
            .trees
            .iter()
            .enumerate()
            .map(|(k, t)| {
                DecisionTree::from_arrays(t, a.feature_names.len(), a.n_classes)
                    .with_context(|| format!("tree #{k}"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            feature_names: a.feature_names.clone(),
            n_classes: a.n_classes,
            trees,
        })
    }

    /// Loads a forest artifact; a `.gz` suffix means gzip-compressed JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let f = fs::File::open(path)
            .with_context(|| format!("open model artifact: {}", path.display()))?;

        let gz = path.extension().and_then(|e| e.to_str()) == Some("gz");
        let mut text = String::new();
        if gz {
            flate2::read::GzDecoder::new(f)
                .read_to_string(&mut text)
                .with_context(|| format!("gunzip model artifact: {}", path.display()))?;
        } else {
            std::io::BufReader::new(f)
                .read_to_string(&mut text)
                .with_context(|| format!("read model artifact: {}", path.display()))?;
        }

        let artifact: ForestArtifact = serde_json::from_str(&text)
            .with_context(|| format!("parse model artifact: {}", path.display()))?;
        let model = Self::from_artifact(&artifact)
            .with_context(|| format!("validate model artifact: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            trees = model.n_trees(),
            features = model.feature_names.len(),
            "model loaded"
        );
        Ok(model)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl ProbaModel for ForestModel {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let n_features = self.feature_names.len();
        ensure!(
            x.ncols() == n_features,
            "got {} features per sample, model expects {n_features}",
            x.ncols()
        );

        let mut out = Array2::zeros((x.nrows(), self.n_classes));
        for (row, mut acc) in x.rows().into_iter().zip(out.rows_mut()) {
            for tree in &self.trees {
                for (a, p) in acc.iter_mut().zip(tree.leaf_proba(row)) {
                    *a += p;
                }
            }
        }
        let scale = 1.0 / self.trees.len() as f64;
        out.mapv_inplace(|a| a * scale);
        Ok(out)
    }
}
