/*!
This crate detects regions of a feature space where a fitted predictive model exhibits interaction effects. For a chosen target feature it takes the model's per-sample marginal-effect curves (ICE curves) and recursively partitions them along the remaining features, committing on each growth iteration the single split anywhere in the tree whose reduction in curve heterogeneity is largest. Leaves of the resulting tree are regions in which the target feature's effect is approximately homogeneous.

For an example, see `benchmarks/synthetic.rs`.
*/

use ndarray::prelude::*;
use serde::Serialize;
use thiserror::Error;

mod fit;
mod ice;
mod objective;

pub use fit::FitProgress;
pub use ice::{compute_ice_curves, IceCurves, Predict};
pub use objective::sum_of_squared_deviations;

/// A function that scores a subset of curves, given as row indices into the curve matrix. Lower values mean the curves in the subset are more homogeneous. It is never called with an empty subset.
pub type SplitObjective = fn(curves: ArrayView2<f32>, subset: &[usize]) -> f64;

/// These are the options passed to `RegionTree::fit`.
#[derive(Debug)]
pub struct FitOptions {
	/// Names of feature columns to treat as categorical. Splitting on categorical features is not implemented, so this list is accepted but not consumed.
	// TODO: implement discrete splits for enum feature columns.
	pub categorical_features: Option<Vec<String>>,
	/// A split is kept only if its interaction importance reaches `gamma` times the node's prior importance, or reaches `gamma` outright at nodes whose prior importance is zero.
	pub gamma: f64,
	/// How the tree is grown. Only `Nonsymmetric` growth is implemented.
	pub growth_method: GrowthMethod,
	/// The prior interaction importance assigned to the root node.
	pub initial_interaction_importance: f64,
	/// Recorded on the resulting tree as a depth label. Growth is bounded by `n_split`, not by depth.
	pub max_depth: usize,
	/// The maximum number of grid points along the target feature when computing ICE curves. If the target feature has more unique values than this, the grid is placed at evenly spaced quantiles instead.
	pub max_grid_size: usize,
	/// A split is only considered valid if each of the resulting children holds at least this many samples.
	pub min_node_size: usize,
	/// If set, the candidate thresholds for each feature are reduced to this many evenly spaced quantiles of the raw candidates, which speeds up the search on large nodes.
	pub n_quantiles: Option<usize>,
	/// The maximum number of splits committed to the tree. Each growth iteration commits at most one split anywhere in the tree, so this is also the iteration budget.
	pub n_split: usize,
	/// The objective that scores a subset of curves during the split search.
	pub objective: SplitObjective,
}

impl Default for FitOptions {
	fn default() -> Self {
		Self {
			categorical_features: None,
			gamma: 0.1,
			growth_method: GrowthMethod::Nonsymmetric,
			initial_interaction_importance: 0.0,
			max_depth: 5,
			max_grid_size: 100,
			min_node_size: 10,
			n_quantiles: None,
			n_split: 10,
			objective: sum_of_squared_deviations,
		}
	}
}

/// The strategy used to grow the tree. `Nonsymmetric` growth commits the single best split anywhere in the tree on each iteration. `Symmetric` growth, which would split every leaf of a depth level at once, is recognized in configuration but not implemented.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GrowthMethod {
	Nonsymmetric,
	Symmetric,
}

impl std::str::FromStr for GrowthMethod {
	type Err = FitError;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"nonsymmetric" => Ok(GrowthMethod::Nonsymmetric),
			"symmetric" => Ok(GrowthMethod::Symmetric),
			_ => Err(FitError::InvalidOptions {
				message: format!("unknown growth method \"{}\"", s),
			}),
		}
	}
}

#[derive(Debug, Error)]
pub enum FitError {
	#[error("invalid options: {message}")]
	InvalidOptions { message: String },
	#[error("the feature table contains no rows")]
	EmptyFeatureTable,
	#[error("did not find target column \"{column_name}\" among the feature columns")]
	TargetColumnNotFound { column_name: String },
	#[error("column \"{column_name}\" is not numeric, and only numeric columns can be used")]
	FeatureColumnNotNumeric { column_name: String },
	#[error("cannot materialize children on a node with no committed split")]
	SplitNotCommitted,
}

/// This is the result of `RegionTree::fit`.
#[derive(Debug, PartialEq, Serialize)]
pub struct RegionTree {
	/// The index of the target feature column whose effect the tree regionalizes.
	pub target_column_index: usize,
	/// The grid values along the target feature that the curves were computed over.
	pub grid: Vec<f32>,
	/// The configured maximum depth, recorded as a label. It does not bound growth.
	pub max_depth: usize,
	pub root: RegionNode,
}

/// A node of the region tree. A node either has both children present, in which case `split_feature_index` and `split_value` describe the committed split, or it is a leaf.
#[derive(Debug, PartialEq, Serialize)]
pub struct RegionNode {
	/// The root has depth 0 and children have their parent's depth plus one.
	pub depth: usize,
	/// The indices of the samples this node owns. A split partitions these between the two children.
	pub subset: Vec<usize>,
	/// The dispersion objective of this node's own subset.
	pub objective_value: f64,
	/// The objective value that interaction importances are normalized against: the root node's objective, inherited by every descendant.
	pub reference_objective_value: f64,
	/// The feature column the committed split tests, if any.
	pub split_feature_index: Option<usize>,
	/// The committed split's threshold. Samples with a feature value less than or equal to it go left, the rest go right.
	pub split_value: Option<f32>,
	/// The fractional reduction in dispersion the committed split achieved, normalized by the reference objective. Before a split is committed this holds the value inherited from the parent.
	pub interaction_importance: f64,
	/// True if this node's subset was too small to evaluate for a split.
	pub stop_criteria_met: bool,
	/// True if the best achievable split's importance fell below the node's improvement gate, so the node will never split.
	pub improvement_met: bool,
	pub left: Option<Box<RegionNode>>,
	pub right: Option<Box<RegionNode>>,
}

impl RegionTree {
	/// Collect the regions of the tree: the subtree leaves, depth first, left before right.
	pub fn regions(&self) -> Vec<&RegionNode> {
		self.root.leaves()
	}
}

impl RegionNode {
	pub fn is_leaf(&self) -> bool {
		self.left.is_none()
	}

	/// Collect the leaves of the subtree rooted at this node, depth first, left before right.
	pub fn leaves(&self) -> Vec<&RegionNode> {
		let mut leaves = Vec::new();
		self.collect_leaves(&mut leaves);
		leaves
	}

	fn collect_leaves<'a>(&'a self, leaves: &mut Vec<&'a RegionNode>) {
		match (&self.left, &self.right) {
			(Some(left), Some(right)) => {
				left.collect_leaves(leaves);
				right.collect_leaves(leaves);
			}
			_ => leaves.push(self),
		}
	}

	/// Count the committed splits in the subtree rooted at this node.
	pub fn n_splits(&self) -> usize {
		match (&self.left, &self.right) {
			(Some(left), Some(right)) => 1 + left.n_splits() + right.n_splits(),
			_ => 0,
		}
	}
}
