/*!
This crate provides `Finite`, a wrapper around `f32` that is guaranteed not to be NaN or infinite. Because a `Finite` can always be compared with another one, it implements `Eq`, `Ord`, and `Hash`, which makes it possible to sort float values and to use them as keys in ordered collections.
*/

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use thiserror::Error;

#[derive(Clone, Copy, Debug)]
pub struct Finite(f32);

#[derive(Debug, Error)]
#[error("not finite")]
pub struct NotFiniteError;

impl Finite {
	pub fn new(value: f32) -> Result<Self, NotFiniteError> {
		if value.is_finite() {
			Ok(Self(value))
		} else {
			Err(NotFiniteError)
		}
	}

	pub fn get(self) -> f32 {
		self.0
	}
}

impl std::fmt::Display for Finite {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl PartialEq for Finite {
	#[inline]
	fn eq(&self, other: &Self) -> bool {
		self.0.eq(&other.0)
	}
}

impl Eq for Finite {}

impl PartialOrd for Finite {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		self.0.partial_cmp(&other.0)
	}
}

impl Ord for Finite {
	fn cmp(&self, other: &Self) -> Ordering {
		self.0.partial_cmp(&other.0).unwrap()
	}
}

impl Hash for Finite {
	#[inline]
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.0.to_bits().hash(state);
	}
}

#[test]
fn test_rejects_non_finite_values() {
	assert!(Finite::new(std::f32::NAN).is_err());
	assert!(Finite::new(std::f32::INFINITY).is_err());
	assert!(Finite::new(std::f32::NEG_INFINITY).is_err());
	assert_eq!(Finite::new(1.25).unwrap().get(), 1.25);
}

#[test]
fn test_ordering() {
	let mut values = vec![
		Finite::new(3.0).unwrap(),
		Finite::new(-1.0).unwrap(),
		Finite::new(2.0).unwrap(),
	];
	values.sort();
	let values: Vec<f32> = values.into_iter().map(|value| value.get()).collect();
	assert_eq!(values, vec![-1.0, 2.0, 3.0]);
}
