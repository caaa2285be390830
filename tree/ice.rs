use crate::fit::split::interpolated_quantiles;
use crate::FitError;
use itertools::izip;
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use repid_dataframe::DataFrameView;
use repid_finite::Finite;
use std::collections::BTreeSet;

/// A fitted predictive model, opaque except for its prediction capability.
pub trait Predict {
	/// Predict the response for a single example, given as one value per feature column. Enum features are passed as their option index.
	fn predict(&self, example: ArrayView1<f32>) -> f32;
}

/// The per-sample marginal-effect curves for one feature: one row per sample and one column per grid value, together with the grid itself.
#[derive(Debug)]
pub struct IceCurves {
	/// (n_samples, n_grid)
	pub curves: Array2<f32>,
	/// The grid values along the target feature.
	pub grid: Vec<f32>,
}

/// Compute the model's ICE curves for the target feature: sweep each sample's target value across the grid while holding its other feature values fixed, then mean-center each curve so that curves differ only in shape, not in level.
pub fn compute_ice_curves(
	model: &dyn Predict,
	features: &DataFrameView,
	target_column_index: usize,
	max_grid_size: usize,
) -> Result<IceCurves, FitError> {
	let target_column = features.columns[target_column_index]
		.as_number()
		.ok_or_else(|| FitError::FeatureColumnNotNumeric {
			column_name: features.columns[target_column_index].name().to_owned(),
		})?;
	let grid = compute_grid(target_column.data, max_grid_size);
	let rows = features.to_rows_f32();
	let n_samples = features.nrows();
	let mut curves = Array2::zeros((n_samples, grid.len()));
	let mut example = vec![0.0f32; features.ncols()];
	for sample_index in 0..n_samples {
		for (value, feature_value) in izip!(example.iter_mut(), rows.row(sample_index)) {
			*value = *feature_value;
		}
		for (grid_index, grid_value) in grid.iter().enumerate() {
			example[target_column_index] = *grid_value;
			curves[[sample_index, grid_index]] = model.predict(aview1(&example));
		}
		let mut curve = curves.row_mut(sample_index);
		let mean = curve.iter().map(|value| value.to_f64().unwrap()).sum::<f64>()
			/ curve.len().to_f64().unwrap();
		for value in curve.iter_mut() {
			*value -= mean.to_f32().unwrap();
		}
	}
	Ok(IceCurves { curves, grid })
}

/// The grid for the target feature: its unique finite values when there are at most `max_grid_size` of them, otherwise `max_grid_size` evenly spaced interpolated quantiles of its values.
fn compute_grid(data: &[f32], max_grid_size: usize) -> Vec<f32> {
	let unique_values: BTreeSet<Finite> = data
		.iter()
		.filter_map(|value| Finite::new(*value).ok())
		.collect();
	if unique_values.len() <= max_grid_size {
		unique_values.into_iter().map(|value| value.get()).collect()
	} else {
		let mut values: Vec<f32> = data.iter().cloned().filter(|value| value.is_finite()).collect();
		values.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap());
		interpolated_quantiles(&values, max_grid_size)
	}
}

#[cfg(test)]
use repid_dataframe::{Column, DataFrame, NumberColumn};

#[cfg(test)]
struct SumModel;

#[cfg(test)]
impl Predict for SumModel {
	fn predict(&self, example: ArrayView1<f32>) -> f32 {
		example.iter().sum()
	}
}

#[test]
fn test_grid_uses_unique_values_when_few() {
	assert_eq!(
		compute_grid(&[3.0, 1.0, 2.0, 1.0, 3.0], 100),
		vec![1.0, 2.0, 3.0],
	);
}

#[test]
fn test_grid_caps_at_quantiles() {
	let data: Vec<f32> = (0..101).map(|i| i.to_f32().unwrap()).collect();
	let grid = compute_grid(&data, 5);
	assert_eq!(grid, vec![0.0, 25.0, 50.0, 75.0, 100.0]);
}

#[test]
fn test_curves_are_mean_centered() {
	let features = DataFrame {
		columns: vec![
			Column::Number(NumberColumn {
				name: "a".to_owned(),
				data: vec![0.0, 1.0, 2.0, 3.0],
			}),
			Column::Number(NumberColumn {
				name: "b".to_owned(),
				data: vec![10.0, 20.0, 30.0, 40.0],
			}),
		],
	};
	let features = features.view();
	let ice = compute_ice_curves(&SumModel, &features, 0, 100).unwrap();
	assert_eq!(ice.grid, vec![0.0, 1.0, 2.0, 3.0]);
	assert_eq!(ice.curves.nrows(), 4);
	assert_eq!(ice.curves.ncols(), 4);
	for sample_index in 0..4 {
		let sum: f32 = ice.curves.row(sample_index).iter().sum();
		assert!(sum.abs() < 1e-4);
	}
	// The model is additive, so after centering every curve is the same function of the grid.
	let expected = vec![-1.5, -0.5, 0.5, 1.5];
	for sample_index in 0..4 {
		let curve: Vec<f32> = ice.curves.row(sample_index).iter().cloned().collect();
		assert_eq!(curve, expected);
	}
}

#[test]
fn test_enum_target_column_is_rejected() {
	use repid_dataframe::EnumColumn;
	use std::num::NonZeroUsize;
	let features = DataFrame {
		columns: vec![Column::Enum(EnumColumn {
			name: "color".to_owned(),
			options: vec!["red".to_owned()],
			data: vec![NonZeroUsize::new(1), NonZeroUsize::new(1)],
		})],
	};
	let features = features.view();
	let result = compute_ice_curves(&SumModel, &features, 0, 100);
	assert!(matches!(
		result,
		Err(FitError::FeatureColumnNotNumeric { .. })
	));
}
