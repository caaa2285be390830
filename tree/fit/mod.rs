use crate::ice::compute_ice_curves;
use crate::{FitError, FitOptions, GrowthMethod, Predict, RegionTree};
use repid_dataframe::DataFrameView;

mod grow;
pub(crate) mod split;

/// This enum reports fit progress.
#[derive(Debug)]
pub enum FitProgress {
	ComputingIceCurves,
	GrowingTree { iteration: usize, n_iterations: usize },
}

impl RegionTree {
	/// Detect the interaction regions for one target feature: compute the model's ICE curves over `features`, then grow the region tree by committing, on each of up to `n_split` iterations, the single split anywhere in the tree with the highest interaction importance.
	pub fn fit(
		model: &dyn Predict,
		features: DataFrameView,
		target_column_name: &str,
		options: &FitOptions,
		update_progress: &mut dyn FnMut(FitProgress),
	) -> Result<RegionTree, FitError> {
		validate_options(options)?;
		if features.nrows() == 0 {
			return Err(FitError::EmptyFeatureTable);
		}
		let target_column_index = features
			.columns
			.iter()
			.position(|column| column.name() == target_column_name)
			.ok_or_else(|| FitError::TargetColumnNotFound {
				column_name: target_column_name.to_owned(),
			})?;
		update_progress(FitProgress::ComputingIceCurves);
		let ice = compute_ice_curves(model, &features, target_column_index, options.max_grid_size)?;
		let root = grow::grow_tree(
			ice.curves.view(),
			&features,
			target_column_index,
			options,
			update_progress,
		)?;
		Ok(RegionTree {
			target_column_index,
			grid: ice.grid,
			max_depth: options.max_depth,
			root,
		})
	}
}

/// Check the options before any curve or tree work happens, so that a misconfigured fit fails fast.
fn validate_options(options: &FitOptions) -> Result<(), FitError> {
	if let GrowthMethod::Symmetric = options.growth_method {
		return Err(FitError::InvalidOptions {
			message: "symmetric growth is not implemented".to_owned(),
		});
	}
	if options.n_split == 0 {
		return Err(FitError::InvalidOptions {
			message: "n_split must be at least 1".to_owned(),
		});
	}
	if options.max_depth == 0 {
		return Err(FitError::InvalidOptions {
			message: "max_depth must be at least 1".to_owned(),
		});
	}
	if options.min_node_size == 0 {
		return Err(FitError::InvalidOptions {
			message: "min_node_size must be at least 1".to_owned(),
		});
	}
	if options.max_grid_size < 2 {
		return Err(FitError::InvalidOptions {
			message: "max_grid_size must be at least 2".to_owned(),
		});
	}
	if options.initial_interaction_importance < 0.0 {
		return Err(FitError::InvalidOptions {
			message: "initial_interaction_importance must not be negative".to_owned(),
		});
	}
	if !options.gamma.is_finite() || options.gamma <= 0.0 {
		return Err(FitError::InvalidOptions {
			message: "gamma must be positive and finite".to_owned(),
		});
	}
	if options.n_quantiles == Some(0) {
		return Err(FitError::InvalidOptions {
			message: "n_quantiles must be at least 1".to_owned(),
		});
	}
	Ok(())
}

#[cfg(test)]
use ndarray::prelude::*;

#[cfg(test)]
use num_traits::ToPrimitive;

#[cfg(test)]
use repid_dataframe::{Column, DataFrame, NumberColumn};

/// A closed-form stand-in for a fitted model whose response to the first feature depends on the second.
#[cfg(test)]
struct InteractionModel;

#[cfg(test)]
impl Predict for InteractionModel {
	fn predict(&self, example: ArrayView1<f32>) -> f32 {
		example[0] + 5.0 * example[0] * example[1]
	}
}

#[cfg(test)]
fn interaction_features() -> DataFrame {
	DataFrame {
		columns: vec![
			Column::Number(NumberColumn {
				name: "x1".to_owned(),
				data: (0..40).map(|i| i.to_f32().unwrap() / 40.0).collect(),
			}),
			Column::Number(NumberColumn {
				name: "x2".to_owned(),
				data: (0..40).map(|i| (i % 2).to_f32().unwrap()).collect(),
			}),
		],
	}
}

#[test]
fn test_fit_finds_the_interacting_feature() {
	let features = interaction_features();
	let options = FitOptions {
		min_node_size: 10,
		..Default::default()
	};
	let tree = RegionTree::fit(
		&InteractionModel,
		features.view(),
		"x1",
		&options,
		&mut |_| {},
	)
	.unwrap();
	assert_eq!(tree.target_column_index, 0);
	assert_eq!(tree.root.split_feature_index, Some(1));
	assert!(tree.root.interaction_importance > 0.0);
	// Within each region the model's effect curves for x1 coincide, so the regions are final.
	for region in tree.regions() {
		assert!(region.improvement_met || region.stop_criteria_met);
		assert_eq!(region.objective_value, 0.0);
	}
}

#[test]
fn test_fit_is_deterministic() {
	let features = interaction_features();
	let options = FitOptions {
		min_node_size: 10,
		..Default::default()
	};
	let first = RegionTree::fit(
		&InteractionModel,
		features.view(),
		"x1",
		&options,
		&mut |_| {},
	)
	.unwrap();
	let second = RegionTree::fit(
		&InteractionModel,
		features.view(),
		"x1",
		&options,
		&mut |_| {},
	)
	.unwrap();
	assert_eq!(first, second);
}

#[test]
fn test_fit_unknown_target_column() {
	let features = interaction_features();
	let result = RegionTree::fit(
		&InteractionModel,
		features.view(),
		"x9",
		&FitOptions::default(),
		&mut |_| {},
	);
	match result {
		Err(FitError::TargetColumnNotFound { column_name }) => assert_eq!(column_name, "x9"),
		_ => panic!("expected a missing target column error"),
	}
}

#[test]
fn test_fit_rejects_symmetric_growth() {
	let features = interaction_features();
	let options = FitOptions {
		growth_method: GrowthMethod::Symmetric,
		..Default::default()
	};
	let result = RegionTree::fit(&InteractionModel, features.view(), "x1", &options, &mut |_| {});
	assert!(matches!(result, Err(FitError::InvalidOptions { .. })));
}

#[test]
fn test_validate_options() {
	assert!(validate_options(&FitOptions::default()).is_ok());
	let invalid = [
		FitOptions {
			n_split: 0,
			..Default::default()
		},
		FitOptions {
			max_depth: 0,
			..Default::default()
		},
		FitOptions {
			min_node_size: 0,
			..Default::default()
		},
		FitOptions {
			max_grid_size: 1,
			..Default::default()
		},
		FitOptions {
			initial_interaction_importance: -1.0,
			..Default::default()
		},
		FitOptions {
			gamma: 0.0,
			..Default::default()
		},
		FitOptions {
			gamma: std::f64::NAN,
			..Default::default()
		},
		FitOptions {
			n_quantiles: Some(0),
			..Default::default()
		},
	];
	for options in invalid.iter() {
		assert!(matches!(
			validate_options(options),
			Err(FitError::InvalidOptions { .. })
		));
	}
}

#[test]
fn test_growth_method_from_str() {
	use std::str::FromStr;
	assert_eq!(
		GrowthMethod::from_str("nonsymmetric").unwrap(),
		GrowthMethod::Nonsymmetric
	);
	assert_eq!(
		GrowthMethod::from_str("symmetric").unwrap(),
		GrowthMethod::Symmetric
	);
	assert!(GrowthMethod::from_str("breadthwise").is_err());
}
