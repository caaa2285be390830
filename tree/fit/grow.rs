use super::split::{choose_best_split, partition_subset};
use super::FitProgress;
use crate::{FitError, FitOptions, RegionNode, SplitObjective};
use ndarray::prelude::*;
use repid_dataframe::DataFrameView;

/// The outcome of evaluating a leaf for its best split. Evaluation never mutates node state; the growth loop records the outcome on the node.
#[derive(Debug, PartialEq)]
enum Evaluation {
	/// The subset is smaller than the minimum node size, so the node can never split.
	TooSmall,
	/// No valid split exists, or the best split's importance fell below the node's improvement gate.
	Gated,
	Candidate(SplitCandidate),
}

#[derive(Debug, PartialEq)]
struct SplitCandidate {
	feature_index: usize,
	split_value: f32,
	/// The combined objective of the two partitions the split produces.
	objective_value: f64,
	interaction_importance: f64,
}

/// Grow a region tree over all samples of the curve collection. Each iteration evaluates every splittable leaf in the tree and commits the single candidate with the highest interaction importance; the loop ends after `n_split` iterations or as soon as no leaf produces a candidate.
pub fn grow_tree(
	curves: ArrayView2<f32>,
	features: &DataFrameView,
	target_column_index: usize,
	options: &FitOptions,
	update_progress: &mut dyn FnMut(FitProgress),
) -> Result<RegionNode, FitError> {
	assert_eq!(curves.nrows(), features.nrows());
	let subset: Vec<usize> = (0..curves.nrows()).collect();
	let objective_value = if subset.len() < options.min_node_size {
		0.0
	} else {
		(options.objective)(curves, &subset)
	};
	let mut root = RegionNode {
		depth: 0,
		subset,
		objective_value,
		reference_objective_value: objective_value,
		split_feature_index: None,
		split_value: None,
		interaction_importance: options.initial_interaction_importance,
		stop_criteria_met: false,
		improvement_met: false,
		left: None,
		right: None,
	};
	for iteration in 0..options.n_split {
		update_progress(FitProgress::GrowingTree {
			iteration,
			n_iterations: options.n_split,
		});
		match best_candidate(&mut root, curves, features, target_column_index, options)? {
			Some((node, candidate)) => {
				node.commit_split(&candidate);
				node.commit_children(curves, features, options.objective)?;
			}
			// Every leaf is stopped or improvement gated, so the tree is done growing.
			None => break,
		}
	}
	Ok(root)
}

/// Depth-first search for the leaf with the highest-importance split candidate. Leaves whose evaluation comes back `TooSmall` or `Gated` get the corresponding flag recorded along the way; because evaluation depends only on state fixed at node construction, recording the flags during the search pass cannot change any later outcome.
fn best_candidate<'a>(
	node: &'a mut RegionNode,
	curves: ArrayView2<f32>,
	features: &DataFrameView,
	target_column_index: usize,
	options: &FitOptions,
) -> Result<Option<(&'a mut RegionNode, SplitCandidate)>, FitError> {
	if node.left.is_some() {
		let left = best_candidate(
			node.left.as_mut().unwrap(),
			curves,
			features,
			target_column_index,
			options,
		)?;
		let right = best_candidate(
			node.right.as_mut().unwrap(),
			curves,
			features,
			target_column_index,
			options,
		)?;
		return Ok(merge_candidates(left, right));
	}
	if node.stop_criteria_met || node.improvement_met {
		return Ok(None);
	}
	match node.evaluate(curves, features, target_column_index, options)? {
		Evaluation::TooSmall => {
			node.stop_criteria_met = true;
			Ok(None)
		}
		Evaluation::Gated => {
			node.improvement_met = true;
			Ok(None)
		}
		Evaluation::Candidate(candidate) => Ok(Some((node, candidate))),
	}
}

/// Keep the candidate with the higher interaction importance. Ties go to `a`, which comes first in traversal order.
fn merge_candidates<'a>(
	a: Option<(&'a mut RegionNode, SplitCandidate)>,
	b: Option<(&'a mut RegionNode, SplitCandidate)>,
) -> Option<(&'a mut RegionNode, SplitCandidate)> {
	match (a, b) {
		(Some(a), Some(b)) => {
			if b.1.interaction_importance > a.1.interaction_importance {
				Some(b)
			} else {
				Some(a)
			}
		}
		(Some(a), None) => Some(a),
		(None, Some(b)) => Some(b),
		(None, None) => None,
	}
}

impl RegionNode {
	/// Evaluate this leaf for its best split, without mutating any node state.
	fn evaluate(
		&self,
		curves: ArrayView2<f32>,
		features: &DataFrameView,
		target_column_index: usize,
		options: &FitOptions,
	) -> Result<Evaluation, FitError> {
		if self.subset.len() < options.min_node_size {
			return Ok(Evaluation::TooSmall);
		}
		let best = match choose_best_split(curves, features, target_column_index, &self.subset, options)? {
			Some(best) => best,
			None => return Ok(Evaluation::Gated),
		};
		// A zero reference dispersion admits no importance, so such nodes always gate.
		let interaction_importance = if self.reference_objective_value == 0.0 {
			0.0
		} else {
			(self.objective_value - best.objective_value) / self.reference_objective_value
		};
		let gate = if self.interaction_importance == 0.0 {
			options.gamma
		} else {
			self.interaction_importance * options.gamma
		};
		if interaction_importance < gate {
			return Ok(Evaluation::Gated);
		}
		Ok(Evaluation::Candidate(SplitCandidate {
			feature_index: best.feature_index,
			split_value: best.split_value,
			objective_value: best.objective_value,
			interaction_importance,
		}))
	}

	fn commit_split(&mut self, candidate: &SplitCandidate) {
		self.split_feature_index = Some(candidate.feature_index);
		self.split_value = Some(candidate.split_value);
		self.interaction_importance = candidate.interaction_importance;
	}

	/// Materialize the two children of a committed split: samples whose split feature value is less than or equal to the threshold go to the left child, the rest to the right. Fails if no split has been committed on this node.
	pub(crate) fn commit_children(
		&mut self,
		curves: ArrayView2<f32>,
		features: &DataFrameView,
		objective: SplitObjective,
	) -> Result<(), FitError> {
		let feature_index = self.split_feature_index.ok_or(FitError::SplitNotCommitted)?;
		let split_value = self.split_value.ok_or(FitError::SplitNotCommitted)?;
		let feature = features.columns[feature_index].as_number().unwrap().data;
		let (left_subset, right_subset) = partition_subset(feature, &self.subset, split_value);
		self.left = Some(Box::new(self.make_child(left_subset, curves, objective)));
		self.right = Some(Box::new(self.make_child(right_subset, curves, objective)));
		Ok(())
	}

	/// Each child is a freshly allocated node with its own empty child slots, one level deeper, inheriting the parent's flags, interaction importance, and reference objective as its starting state.
	fn make_child(
		&self,
		subset: Vec<usize>,
		curves: ArrayView2<f32>,
		objective: SplitObjective,
	) -> RegionNode {
		let objective_value = objective(curves, &subset);
		RegionNode {
			depth: self.depth + 1,
			subset,
			objective_value,
			reference_objective_value: self.reference_objective_value,
			split_feature_index: None,
			split_value: None,
			interaction_importance: self.interaction_importance,
			stop_criteria_met: self.stop_criteria_met,
			improvement_met: self.improvement_met,
			left: None,
			right: None,
		}
	}
}

#[cfg(test)]
use repid_dataframe::{Column, DataFrame, NumberColumn};

#[cfg(test)]
use num_traits::ToPrimitive;

/// Curves with two constant groups and features that do or do not separate them.
#[cfg(test)]
fn two_cluster_fixture() -> (ndarray::Array2<f32>, DataFrame) {
	let mut curves = ndarray::Array2::zeros((100, 3));
	for i in 50..100 {
		for j in 0..3 {
			curves[[i, j]] = 10.0;
		}
	}
	let features = DataFrame {
		columns: vec![
			Column::Number(NumberColumn {
				name: "target".to_owned(),
				data: (0..100).map(|i| i.to_f32().unwrap()).collect(),
			}),
			Column::Number(NumberColumn {
				name: "group".to_owned(),
				data: (0..100).map(|i| if i < 50 { 0.0 } else { 1.0 }).collect(),
			}),
			Column::Number(NumberColumn {
				name: "noise".to_owned(),
				data: (0..100).map(|i| i.to_f32().unwrap()).collect(),
			}),
		],
	};
	(curves, features)
}

#[test]
fn test_two_cluster_scenario() {
	let (curves, features) = two_cluster_fixture();
	let features = features.view();
	let options = FitOptions {
		gamma: 0.1,
		min_node_size: 10,
		n_split: 3,
		..Default::default()
	};
	let root = grow_tree(curves.view(), &features, 0, &options, &mut |_| {}).unwrap();
	// The first committed split separates the two constant-curve groups perfectly.
	assert_eq!(root.objective_value, 7500.0);
	assert_eq!(root.split_feature_index, Some(1));
	assert_eq!(root.split_value, Some(0.0));
	assert_eq!(root.interaction_importance, 1.0);
	let left = root.left.as_ref().unwrap();
	let right = root.right.as_ref().unwrap();
	assert_eq!(left.subset, (0..50).collect::<Vec<usize>>());
	assert_eq!(right.subset, (50..100).collect::<Vec<usize>>());
	assert_eq!(left.objective_value + right.objective_value, 0.0);
	assert_eq!(left.depth, 1);
	assert_eq!(right.depth, 1);
	// The homogeneous children cannot improve, so the second iteration gates them and the tree keeps a single split.
	assert_eq!(root.n_splits(), 1);
	assert!(left.improvement_met || left.stop_criteria_met);
	assert!(right.improvement_met || right.stop_criteria_met);
}

#[test]
fn test_committed_subsets_partition_the_parent() {
	let (curves, features) = two_cluster_fixture();
	let features = features.view();
	let options = FitOptions {
		min_node_size: 10,
		..Default::default()
	};
	let root = grow_tree(curves.view(), &features, 0, &options, &mut |_| {}).unwrap();
	let left = root.left.as_ref().unwrap();
	let right = root.right.as_ref().unwrap();
	assert!(left.subset.len() >= 10);
	assert!(right.subset.len() >= 10);
	let mut union: Vec<usize> = left
		.subset
		.iter()
		.chain(right.subset.iter())
		.cloned()
		.collect();
	union.sort_unstable();
	assert_eq!(union, root.subset);
	assert!(left.subset.iter().all(|index| !right.subset.contains(index)));
}

#[test]
fn test_evaluation_is_pure_and_repeatable() {
	let (curves, features) = two_cluster_fixture();
	let features = features.view();
	let options = FitOptions {
		min_node_size: 10,
		..Default::default()
	};
	let subset: Vec<usize> = (0..100).collect();
	let objective_value = sum_of_squared_deviations(curves.view(), &subset);
	let node = RegionNode {
		depth: 0,
		subset,
		objective_value,
		reference_objective_value: objective_value,
		split_feature_index: None,
		split_value: None,
		interaction_importance: 0.0,
		stop_criteria_met: false,
		improvement_met: false,
		left: None,
		right: None,
	};
	let first = node.evaluate(curves.view(), &features, 0, &options).unwrap();
	let second = node.evaluate(curves.view(), &features, 0, &options).unwrap();
	assert_eq!(first, second);
	match first {
		Evaluation::Candidate(candidate) => assert_eq!(candidate.interaction_importance, 1.0),
		_ => panic!("expected a split candidate"),
	}
}

#[cfg(test)]
use crate::sum_of_squared_deviations;

/// Curves in four constant groups of ten, so the tree can keep splitting.
#[cfg(test)]
fn four_group_fixture() -> (ndarray::Array2<f32>, DataFrame) {
	let mut curves = ndarray::Array2::zeros((40, 2));
	for i in 0..40 {
		let group = i / 10;
		for j in 0..2 {
			curves[[i, j]] = (group * 10).to_f32().unwrap();
		}
	}
	let features = DataFrame {
		columns: vec![
			Column::Number(NumberColumn {
				name: "target".to_owned(),
				data: (0..40).map(|i| i.to_f32().unwrap()).collect(),
			}),
			Column::Number(NumberColumn {
				name: "group".to_owned(),
				data: (0..40).map(|i| (i / 10).to_f32().unwrap()).collect(),
			}),
		],
	};
	(curves, features)
}

#[test]
fn test_at_most_n_split_commits() {
	let (curves, features) = four_group_fixture();
	let features = features.view();
	for n_split in 1..4 {
		let options = FitOptions {
			min_node_size: 10,
			n_split,
			..Default::default()
		};
		let root = grow_tree(curves.view(), &features, 0, &options, &mut |_| {}).unwrap();
		assert_eq!(root.n_splits(), n_split);
	}
}

#[test]
fn test_tie_breaks_to_the_first_leaf_in_traversal_order() {
	let (curves, features) = four_group_fixture();
	let features = features.view();
	let options = FitOptions {
		min_node_size: 10,
		n_split: 2,
		..Default::default()
	};
	let root = grow_tree(curves.view(), &features, 0, &options, &mut |_| {}).unwrap();
	// Both children of the root offer equally important splits; the left one is visited first.
	assert_eq!(root.left.as_ref().unwrap().n_splits(), 1);
	assert_eq!(root.right.as_ref().unwrap().n_splits(), 0);
	assert_eq!(root.left.as_ref().unwrap().left.as_ref().unwrap().depth, 2);
}

#[test]
fn test_determinism() {
	let (curves, features) = four_group_fixture();
	let features = features.view();
	let options = FitOptions {
		min_node_size: 10,
		..Default::default()
	};
	let first = grow_tree(curves.view(), &features, 0, &options, &mut |_| {}).unwrap();
	let second = grow_tree(curves.view(), &features, 0, &options, &mut |_| {}).unwrap();
	assert_eq!(first, second);
}

#[test]
fn test_undersized_root_stops_without_splitting() {
	let curves = ndarray::Array2::zeros((5, 2));
	let features = DataFrame {
		columns: vec![
			Column::Number(NumberColumn {
				name: "target".to_owned(),
				data: vec![0.0, 1.0, 2.0, 3.0, 4.0],
			}),
			Column::Number(NumberColumn {
				name: "other".to_owned(),
				data: vec![4.0, 3.0, 2.0, 1.0, 0.0],
			}),
		],
	};
	let features = features.view();
	let options = FitOptions {
		min_node_size: 10,
		..Default::default()
	};
	let root = grow_tree(curves.view(), &features, 0, &options, &mut |_| {}).unwrap();
	assert!(root.stop_criteria_met);
	assert!(root.is_leaf());
	assert_eq!(root.n_splits(), 0);
}

#[test]
fn test_commit_children_requires_a_committed_split() {
	let curves = ndarray::Array2::zeros((4, 2));
	let features = DataFrame {
		columns: vec![Column::Number(NumberColumn {
			name: "a".to_owned(),
			data: vec![0.0, 1.0, 2.0, 3.0],
		})],
	};
	let features = features.view();
	let mut node = RegionNode {
		depth: 0,
		subset: vec![0, 1, 2, 3],
		objective_value: 0.0,
		reference_objective_value: 0.0,
		split_feature_index: None,
		split_value: None,
		interaction_importance: 0.0,
		stop_criteria_met: false,
		improvement_met: false,
		left: None,
		right: None,
	};
	let result = node.commit_children(curves.view(), &features, sum_of_squared_deviations);
	match result {
		Err(FitError::SplitNotCommitted) => {}
		_ => panic!("expected a sequencing error"),
	}
}
