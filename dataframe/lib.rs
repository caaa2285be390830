/*!
This crate provides a minimal implementation of column-typed data tables, where each column holds either numbers or values drawn from a fixed set of options. It implements only the surface needed to describe the feature tables consumed by the region tree crates: typed columns, borrow-based views, and conversion to a row-major float array.
*/

use itertools::izip;
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use std::num::NonZeroUsize;

#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
	pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataFrameView<'a> {
	pub columns: Vec<ColumnView<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
	Number(NumberColumn),
	Enum(EnumColumn),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberColumn {
	pub name: String,
	pub data: Vec<f32>,
}

/// Enum columns hold, for each row, an index into `options`, or `None` for an invalid value.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumColumn {
	pub name: String,
	pub options: Vec<String>,
	pub data: Vec<Option<NonZeroUsize>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnView<'a> {
	Number(NumberColumnView<'a>),
	Enum(EnumColumnView<'a>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberColumnView<'a> {
	pub name: &'a str,
	pub data: &'a [f32],
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumColumnView<'a> {
	pub name: &'a str,
	pub options: &'a [String],
	pub data: &'a [Option<NonZeroUsize>],
}

impl DataFrame {
	pub fn ncols(&self) -> usize {
		self.columns.len()
	}

	pub fn nrows(&self) -> usize {
		self.columns.first().map(|column| column.len()).unwrap_or(0)
	}

	pub fn view(&self) -> DataFrameView {
		let columns = self.columns.iter().map(|column| column.view()).collect();
		DataFrameView { columns }
	}
}

impl Column {
	pub fn len(&self) -> usize {
		match self {
			Self::Number(s) => s.data.len(),
			Self::Enum(s) => s.data.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn name(&self) -> &str {
		match self {
			Self::Number(s) => s.name.as_str(),
			Self::Enum(s) => s.name.as_str(),
		}
	}

	pub fn as_number(&self) -> Option<&NumberColumn> {
		match self {
			Self::Number(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_enum(&self) -> Option<&EnumColumn> {
		match self {
			Self::Enum(s) => Some(s),
			_ => None,
		}
	}

	pub fn view(&self) -> ColumnView {
		match self {
			Self::Number(column) => ColumnView::Number(NumberColumnView {
				name: &column.name,
				data: &column.data,
			}),
			Self::Enum(column) => ColumnView::Enum(EnumColumnView {
				name: &column.name,
				options: &column.options,
				data: &column.data,
			}),
		}
	}
}

impl<'a> ColumnView<'a> {
	pub fn len(&self) -> usize {
		match self {
			Self::Number(s) => s.data.len(),
			Self::Enum(s) => s.data.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn name(&self) -> &str {
		match self {
			Self::Number(s) => s.name,
			Self::Enum(s) => s.name,
		}
	}

	pub fn as_number(&self) -> Option<&NumberColumnView<'a>> {
		match self {
			Self::Number(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_enum(&self) -> Option<&EnumColumnView<'a>> {
		match self {
			Self::Enum(s) => Some(s),
			_ => None,
		}
	}
}

impl<'a> DataFrameView<'a> {
	pub fn ncols(&self) -> usize {
		self.columns.len()
	}

	pub fn nrows(&self) -> usize {
		self.columns.first().map(|column| column.len()).unwrap_or(0)
	}

	/// Convert the table to a row-major float array. Enum values are converted to their option index, with invalid values mapped to zero.
	pub fn to_rows_f32(&self) -> Array2<f32> {
		let mut rows = Array2::zeros((self.nrows(), self.ncols()));
		for (mut ndarray_column, dataframe_column) in
			izip!(rows.gencolumns_mut(), self.columns.iter())
		{
			match dataframe_column {
				ColumnView::Number(column) => {
					for (a, b) in izip!(ndarray_column.iter_mut(), column.data) {
						*a = *b;
					}
				}
				ColumnView::Enum(column) => {
					for (a, b) in izip!(ndarray_column.iter_mut(), column.data) {
						*a = b.map(|b| b.get()).unwrap_or(0).to_f32().unwrap();
					}
				}
			}
		}
		rows
	}
}

#[test]
fn test_views_and_downcasts() {
	let df = DataFrame {
		columns: vec![
			Column::Number(NumberColumn {
				name: "a".to_owned(),
				data: vec![1.0, 2.0, 3.0],
			}),
			Column::Enum(EnumColumn {
				name: "b".to_owned(),
				options: vec!["x".to_owned(), "y".to_owned()],
				data: vec![NonZeroUsize::new(1), NonZeroUsize::new(2), None],
			}),
		],
	};
	assert_eq!(df.nrows(), 3);
	assert_eq!(df.ncols(), 2);
	let view = df.view();
	assert_eq!(view.columns[0].name(), "a");
	assert_eq!(view.columns[0].as_number().unwrap().data, &[1.0, 2.0, 3.0]);
	assert!(view.columns[1].as_number().is_none());
	assert_eq!(view.columns[1].as_enum().unwrap().options.len(), 2);
}

#[test]
fn test_to_rows_f32() {
	let df = DataFrame {
		columns: vec![
			Column::Number(NumberColumn {
				name: "a".to_owned(),
				data: vec![1.0, 2.0],
			}),
			Column::Enum(EnumColumn {
				name: "b".to_owned(),
				options: vec!["x".to_owned()],
				data: vec![NonZeroUsize::new(1), None],
			}),
		],
	};
	let rows = df.view().to_rows_f32();
	assert_eq!(rows[[0, 0]], 1.0);
	assert_eq!(rows[[0, 1]], 1.0);
	assert_eq!(rows[[1, 0]], 2.0);
	assert_eq!(rows[[1, 1]], 0.0);
}
