use itertools::izip;
use ndarray::prelude::*;
use num_traits::ToPrimitive;

/// Score a subset of curves by their total deviation from the pointwise mean curve: the sum, over the subset's rows and over the grid columns, of the squared difference between each entry and the column mean taken across the subset. The result is zero exactly when every curve in the subset is identical.
pub fn sum_of_squared_deviations(curves: ArrayView2<f32>, subset: &[usize]) -> f64 {
	assert!(
		!subset.is_empty(),
		"the dispersion objective is undefined for an empty subset",
	);
	let mut mean_curve = vec![0.0f64; curves.ncols()];
	for sample_index in subset {
		for (mean, value) in izip!(mean_curve.iter_mut(), curves.row(*sample_index)) {
			*mean += value.to_f64().unwrap();
		}
	}
	let n_samples = subset.len().to_f64().unwrap();
	for mean in mean_curve.iter_mut() {
		*mean /= n_samples;
	}
	let mut sum = 0.0;
	for sample_index in subset {
		for (mean, value) in izip!(mean_curve.iter(), curves.row(*sample_index)) {
			let deviation = value.to_f64().unwrap() - mean;
			sum += deviation * deviation;
		}
	}
	sum
}

#[test]
fn test_identical_curves_have_zero_dispersion() {
	let curves = ndarray::arr2(&[[1.0, 2.0, 3.0], [1.0, 2.0, 3.0], [1.0, 2.0, 3.0]]);
	let subset = vec![0, 1, 2];
	assert_eq!(sum_of_squared_deviations(curves.view(), &subset), 0.0);
}

#[test]
fn test_known_dispersion() {
	// Column means are [1, 1], so every entry deviates by 1.
	let curves = ndarray::arr2(&[[0.0, 0.0], [2.0, 2.0]]);
	let subset = vec![0, 1];
	assert_eq!(sum_of_squared_deviations(curves.view(), &subset), 4.0);
}

#[test]
fn test_dispersion_of_sub_subset() {
	let curves = ndarray::arr2(&[[0.0, 0.0], [2.0, 2.0], [4.0, 4.0]]);
	// Restricting the subset restricts the mean curve as well.
	let subset = vec![0, 1];
	assert_eq!(sum_of_squared_deviations(curves.view(), &subset), 4.0);
	let subset = vec![2];
	assert_eq!(sum_of_squared_deviations(curves.view(), &subset), 0.0);
}

#[test]
#[should_panic]
fn test_empty_subset_panics() {
	let curves = ndarray::arr2(&[[1.0, 2.0]]);
	sum_of_squared_deviations(curves.view(), &[]);
}
