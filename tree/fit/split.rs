use crate::{FitError, FitOptions, SplitObjective};
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use repid_dataframe::DataFrameView;

#[derive(Debug)]
pub struct ChooseBestSplitOutput {
	pub feature_index: usize,
	pub split_value: f32,
	/// The combined objective of the two partitions the split produces.
	pub objective_value: f64,
}

/// Find the split with the lowest combined objective across all split features for the given subset, if a valid one exists. A valid split will not exist if every candidate on every feature leaves fewer than `min_node_size` samples on one side. Ties are broken in favor of the earliest feature column and, within a feature, the earliest candidate.
pub fn choose_best_split(
	curves: ArrayView2<f32>,
	features: &DataFrameView,
	target_column_index: usize,
	subset: &[usize],
	options: &FitOptions,
) -> Result<Option<ChooseBestSplitOutput>, FitError> {
	let mut best_split_so_far: Option<ChooseBestSplitOutput> = None;
	for (feature_index, column) in features.columns.iter().enumerate() {
		// The target feature's own axis is what the curves sweep, so it is never a split feature.
		if feature_index == target_column_index {
			continue;
		}
		let column = column
			.as_number()
			.ok_or_else(|| FitError::FeatureColumnNotNumeric {
				column_name: column.name().to_owned(),
			})?;
		let candidates = generate_split_candidates(
			column.data,
			subset,
			options.min_node_size,
			options.n_quantiles,
		);
		for split_value in candidates {
			let objective_value = evaluate_split(
				curves,
				column.data,
				subset,
				split_value,
				options.min_node_size,
				options.objective,
			);
			let is_improvement = match &best_split_so_far {
				Some(best) => objective_value < best.objective_value,
				None => objective_value.is_finite(),
			};
			if is_improvement {
				best_split_so_far = Some(ChooseBestSplitOutput {
					feature_index,
					split_value,
					objective_value,
				});
			}
		}
	}
	Ok(best_split_so_far)
}

/// Generate the candidate thresholds for one feature restricted to `subset`. The subset's values are sorted and a raw candidate is placed at every `min_node_size`-th offset, from `min_node_size` through `len - min_node_size` inclusive. Each raw candidate is the midpoint of the two sorted values adjacent to its offset, so when the values are distinct it leaves at least `min_node_size` values on each side. If `n_quantiles` is set, the raw candidates are replaced by their values at `n_quantiles + 1` evenly spaced quantile probabilities.
pub fn generate_split_candidates(
	feature: &[f32],
	subset: &[usize],
	min_node_size: usize,
	n_quantiles: Option<usize>,
) -> Vec<f32> {
	let mut values: Vec<f32> = subset.iter().map(|index| feature[*index]).collect();
	if values.len() < 2 * min_node_size {
		return Vec::new();
	}
	values.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap());
	let mut candidates: Vec<f32> = (min_node_size..=values.len() - min_node_size)
		.step_by(min_node_size)
		.map(|offset| (values[offset - 1] + values[offset]) / 2.0)
		.collect();
	candidates.dedup();
	if let Some(n_quantiles) = n_quantiles {
		candidates = interpolated_quantiles(&candidates, n_quantiles + 1);
	}
	candidates
}

/// Score one candidate threshold: partition `subset` by `value > split_value`, reject the candidate with an infinite cost if either side falls below `min_node_size`, and otherwise return the combined objective of the two sides.
pub fn evaluate_split(
	curves: ArrayView2<f32>,
	feature: &[f32],
	subset: &[usize],
	split_value: f32,
	min_node_size: usize,
	objective: SplitObjective,
) -> f64 {
	let (left, right) = partition_subset(feature, subset, split_value);
	if left.len() < min_node_size || right.len() < min_node_size {
		return std::f64::INFINITY;
	}
	objective(curves, &left) + objective(curves, &right)
}

/// Partition `subset` by the split: indices whose feature value is less than or equal to `split_value` go left, the rest go right. Order within each side follows the subset order.
pub fn partition_subset(
	feature: &[f32],
	subset: &[usize],
	split_value: f32,
) -> (Vec<usize>, Vec<usize>) {
	let mut left = Vec::with_capacity(subset.len());
	let mut right = Vec::with_capacity(subset.len());
	for sample_index in subset {
		if feature[*sample_index] > split_value {
			right.push(*sample_index);
		} else {
			left.push(*sample_index);
		}
	}
	(left, right)
}

/// Interpolated quantiles of the sorted `values` at `n_points` evenly spaced probabilities over [0, 1] inclusive, deduplicated.
pub fn interpolated_quantiles(values: &[f32], n_points: usize) -> Vec<f32> {
	if values.is_empty() || n_points == 0 {
		return Vec::new();
	}
	if n_points == 1 {
		return vec![values[0]];
	}
	let mut quantiles: Vec<f32> = (0..n_points)
		.map(|point_index| {
			let position = (values.len() - 1).to_f32().unwrap() * point_index.to_f32().unwrap()
				/ (n_points - 1).to_f32().unwrap();
			let index = position.trunc().to_usize().unwrap();
			let fract = position.fract();
			if fract > 0.0 {
				values[index] * (1.0 - fract) + values[index + 1] * fract
			} else {
				values[index]
			}
		})
		.collect();
	quantiles.dedup();
	quantiles
}

#[cfg(test)]
use crate::sum_of_squared_deviations;

#[test]
fn test_candidates_at_exact_double_minimum() {
	// A subset of exactly twice the minimum node size yields one candidate that splits it evenly.
	let feature: Vec<f32> = (0..20).map(|i| i.to_f32().unwrap()).collect();
	let subset: Vec<usize> = (0..20).collect();
	let candidates = generate_split_candidates(&feature, &subset, 10, None);
	assert_eq!(candidates, vec![9.5]);
	let (left, right) = partition_subset(&feature, &subset, candidates[0]);
	assert_eq!(left.len(), 10);
	assert_eq!(right.len(), 10);
}

#[test]
fn test_candidates_too_small_subset() {
	let feature: Vec<f32> = (0..19).map(|i| i.to_f32().unwrap()).collect();
	let subset: Vec<usize> = (0..19).collect();
	assert!(generate_split_candidates(&feature, &subset, 10, None).is_empty());
}

#[test]
fn test_candidates_deduplicate_repeated_values() {
	// Fifty zeros then fifty ones: offsets 10..=90 produce only three distinct midpoints.
	let feature: Vec<f32> = (0..100).map(|i| if i < 50 { 0.0 } else { 1.0 }).collect();
	let subset: Vec<usize> = (0..100).collect();
	let candidates = generate_split_candidates(&feature, &subset, 10, None);
	assert_eq!(candidates, vec![0.0, 0.5, 1.0]);
}

#[test]
fn test_candidates_quantile_cap() {
	let feature: Vec<f32> = (0..100).map(|i| i.to_f32().unwrap()).collect();
	let subset: Vec<usize> = (0..100).collect();
	let raw = generate_split_candidates(&feature, &subset, 5, None);
	let capped = generate_split_candidates(&feature, &subset, 5, Some(4));
	assert!(capped.len() < raw.len());
	assert_eq!(capped.len(), 5);
	assert_eq!(capped.first(), raw.first());
	assert_eq!(capped.last(), raw.last());
}

#[test]
fn test_interpolated_quantiles() {
	let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
	assert_eq!(interpolated_quantiles(&values, 3), vec![1.0, 3.0, 5.0]);
	assert_eq!(interpolated_quantiles(&values, 2), vec![1.0, 5.0]);
	// Interpolation between values.
	let values = vec![0.0, 10.0];
	assert_eq!(interpolated_quantiles(&values, 3), vec![0.0, 5.0, 10.0]);
}

#[test]
fn test_evaluate_split_rejects_undersized_partitions() {
	let curves = Array2::zeros((10, 3));
	let feature: Vec<f32> = (0..10).map(|i| i.to_f32().unwrap()).collect();
	let subset: Vec<usize> = (0..10).collect();
	let cost = evaluate_split(
		curves.view(),
		&feature,
		&subset,
		1.5,
		5,
		sum_of_squared_deviations,
	);
	assert!(cost.is_infinite());
	let cost = evaluate_split(
		curves.view(),
		&feature,
		&subset,
		4.5,
		5,
		sum_of_squared_deviations,
	);
	assert_eq!(cost, 0.0);
}

#[test]
fn test_choose_best_split_prefers_separating_feature() {
	use repid_dataframe::{Column, DataFrame, NumberColumn};
	// Rows 0..10 share one curve, rows 10..20 another. The second feature separates the groups, the first does not.
	let mut curve_rows = Vec::new();
	for i in 0..20 {
		curve_rows.push(if i < 10 { [0.0, 0.0] } else { [4.0, 4.0] });
	}
	let curves = ndarray::arr2(&curve_rows);
	let features = DataFrame {
		columns: vec![
			Column::Number(NumberColumn {
				name: "target".to_owned(),
				data: (0..20).map(|i| i.to_f32().unwrap()).collect(),
			}),
			Column::Number(NumberColumn {
				name: "interleaved".to_owned(),
				data: (0..20).map(|i| (i % 2).to_f32().unwrap()).collect(),
			}),
			Column::Number(NumberColumn {
				name: "group".to_owned(),
				data: (0..20).map(|i| if i < 10 { 0.0 } else { 1.0 }).collect(),
			}),
		],
	};
	let subset: Vec<usize> = (0..20).collect();
	let options = FitOptions {
		min_node_size: 5,
		..Default::default()
	};
	let features = features.view();
	let best = choose_best_split(curves.view(), &features, 0, &subset, &options)
		.unwrap()
		.unwrap();
	assert_eq!(best.feature_index, 2);
	// The candidates 0.0 and 0.5 both separate the groups perfectly; the earliest one wins.
	assert_eq!(best.split_value, 0.0);
	assert_eq!(best.objective_value, 0.0);
}

#[test]
fn test_choose_best_split_errors_on_enum_column() {
	use repid_dataframe::{Column, DataFrame, EnumColumn, NumberColumn};
	use std::num::NonZeroUsize;
	let curves = Array2::zeros((20, 2));
	let features = DataFrame {
		columns: vec![
			Column::Number(NumberColumn {
				name: "target".to_owned(),
				data: (0..20).map(|i| i.to_f32().unwrap()).collect(),
			}),
			Column::Enum(EnumColumn {
				name: "color".to_owned(),
				options: vec!["red".to_owned(), "blue".to_owned()],
				data: (0..20).map(|i| NonZeroUsize::new(i % 2 + 1)).collect(),
			}),
		],
	};
	let subset: Vec<usize> = (0..20).collect();
	let options = FitOptions {
		min_node_size: 5,
		..Default::default()
	};
	let features = features.view();
	let result = choose_best_split(curves.view(), &features, 0, &subset, &options);
	match result {
		Err(FitError::FeatureColumnNotNumeric { column_name }) => assert_eq!(column_name, "color"),
		_ => panic!("expected a data validation error"),
	}
}
