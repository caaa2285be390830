use ndarray::prelude::*;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use repid_dataframe::{Column, DataFrame, NumberColumn};
use repid_tree::{FitOptions, Predict, RegionTree};
use serde_json::json;

/// A closed-form model with a known interaction: the effect of x1 triples when x2 is above one half, while x3 only shifts the response.
struct InteractionModel;

impl Predict for InteractionModel {
	fn predict(&self, example: ArrayView1<f32>) -> f32 {
		let x1 = example[0];
		let x2 = example[1];
		let x3 = example[2];
		let interaction = if x2 > 0.5 { 3.0 * x1 } else { 0.0 };
		x1 + interaction + 0.5 * x3
	}
}

fn main() {
	// Generate a synthetic dataset.
	let mut rng = Xoshiro256Plus::seed_from_u64(42);
	let n_samples = 500;
	let columns = ["x1", "x2", "x3"]
		.iter()
		.map(|name| {
			let data: Vec<f32> = (0..n_samples).map(|_| rng.gen_range(0.0, 1.0)).collect();
			Column::Number(NumberColumn {
				name: name.to_string(),
				data,
			})
		})
		.collect();
	let features = DataFrame { columns };

	// Fit the region tree for x1.
	let tree = RegionTree::fit(
		&InteractionModel,
		features.view(),
		"x1",
		&FitOptions {
			n_split: 3,
			..Default::default()
		},
		&mut |_| {},
	)
	.unwrap();

	// Report the committed splits.
	let regions: Vec<serde_json::Value> = tree
		.regions()
		.iter()
		.map(|region| {
			json!({
				"depth": region.depth,
				"n_samples": region.subset.len(),
				"objective": region.objective_value,
			})
		})
		.collect();
	let output = json!({
		"n_splits": tree.root.n_splits(),
		"root_split_feature": tree.root.split_feature_index,
		"root_split_value": tree.root.split_value,
		"root_interaction_importance": tree.root.interaction_importance,
		"regions": regions,
	});
	println!("{}", output);
}
