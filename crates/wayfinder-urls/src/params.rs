//! Route parameters and typed extraction.
//!
//! [`RouteParams`] is the ordered name/value map a match produces. Typed
//! values are pulled out of it either by name ([`RouteParams::parse`]) or
//! positionally through [`FromPath`], which works on a [`ParamContext`]
//! snapshot of the values in declaration order.

use std::fmt::Display;
use std::ops::Deref;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::PathError;

/// Parameters captured by a route match, in pattern declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteParams(IndexMap<String, String>);

impl RouteParams {
	/// Creates an empty parameter map.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the raw value of `name`.
	pub fn get(&self, name: &str) -> Option<&str> {
		self.0.get(name).map(String::as_str)
	}

	/// Sets `name`, keeping its original position when it already exists.
	pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
		self.0.insert(name.into(), value.into());
	}

	pub fn contains_key(&self, name: &str) -> bool {
		self.0.contains_key(name)
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterates `(name, value)` pairs in declaration order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	/// Combines ancestor parameters with a nested scope's own.
	///
	/// Every ancestor key survives; on a collision the child's value wins.
	pub fn merged_with(&self, child: &RouteParams) -> RouteParams {
		let mut merged = self.clone();
		for (name, value) in child.iter() {
			merged.insert(name, value);
		}
		merged
	}

	/// Parses the value of `name` as `T`.
	///
	/// # Errors
	///
	/// [`PathError::Missing`] when the parameter was not captured,
	/// [`PathError::ParseError`] when the value does not parse.
	///
	/// ```
	/// use wayfinder_urls::RouteParams;
	///
	/// let mut params = RouteParams::new();
	/// params.insert("id", "42");
	/// assert_eq!(params.parse::<u32>("id").unwrap(), 42);
	/// assert!(params.parse::<u32>("page").is_err());
	/// ```
	pub fn parse<T>(&self, name: &str) -> Result<T, PathError>
	where
		T: FromStr,
		T::Err: Display,
	{
		let raw = self
			.get(name)
			.ok_or_else(|| PathError::Missing(name.to_string()))?;
		raw.parse::<T>().map_err(|e| PathError::ParseError {
			param_index: None,
			param_name: Some(name.to_string()),
			param_type: std::any::type_name::<T>(),
			raw_value: raw.to_string(),
			reason: e.to_string(),
		})
	}

	/// Snapshot used by [`FromPath`] extractors.
	pub fn to_context(&self) -> ParamContext {
		ParamContext {
			names: self.0.keys().cloned().collect(),
			values: self.0.values().cloned().collect(),
		}
	}
}

impl From<IndexMap<String, String>> for RouteParams {
	fn from(map: IndexMap<String, String>) -> Self {
		Self(map)
	}
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RouteParams {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
	}
}

impl IntoIterator for RouteParams {
	type Item = (String, String);
	type IntoIter = indexmap::map::IntoIter<String, String>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}

/// Positional view of matched parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamContext {
	names: Vec<String>,
	values: Vec<String>,
}

impl ParamContext {
	/// Creates a context from parallel name and value lists.
	pub fn new(names: Vec<String>, values: Vec<String>) -> Self {
		Self { names, values }
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	/// Parameter names, parallel to the values.
	pub fn names(&self) -> &[String] {
		&self.names
	}

	fn expect_len(&self, expected: usize) -> Result<(), PathError> {
		if self.values.len() == expected {
			Ok(())
		} else {
			Err(PathError::CountMismatch {
				expected,
				actual: self.values.len(),
			})
		}
	}

	/// Parses the value at `index`, naming it in the error when known.
	fn parse_at<T>(&self, index: usize, type_name: &'static str) -> Result<T, PathError>
	where
		T: FromStr,
		T::Err: Display,
	{
		let raw = self.values.get(index).ok_or(PathError::CountMismatch {
			expected: index + 1,
			actual: self.values.len(),
		})?;
		raw.parse::<T>().map_err(|e| PathError::ParseError {
			param_index: Some(index),
			param_name: self.names.get(index).cloned(),
			param_type: type_name,
			raw_value: raw.clone(),
			reason: e.to_string(),
		})
	}
}

/// Builds a value out of every matched parameter.
///
/// Scalars require exactly one parameter; tuples require one per element.
pub trait FromPath: Sized {
	/// # Errors
	///
	/// [`PathError::CountMismatch`] on an arity mismatch, [`PathError::ParseError`]
	/// when a value does not parse.
	fn from_path(ctx: &ParamContext) -> Result<Self, PathError>;
}

/// Newtype marking a value extracted from route parameters.
///
/// ```
/// use wayfinder_urls::{FromPath, Path, RouteParams};
///
/// let params: RouteParams = [("user", "7"), ("post", "12")].into_iter().collect();
/// let Path((user, post)) = Path::<(u32, u32)>::from_path(&params.to_context()).unwrap();
/// assert_eq!((user, post), (7, 12));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path<T>(pub T);

impl<T> Path<T> {
	pub fn into_inner(self) -> T {
		self.0
	}
}

impl<T> Deref for Path<T> {
	type Target = T;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl<T> AsRef<T> for Path<T> {
	fn as_ref(&self) -> &T {
		&self.0
	}
}

impl<T: FromPath> FromPath for Path<T> {
	fn from_path(ctx: &ParamContext) -> Result<Self, PathError> {
		T::from_path(ctx).map(Path)
	}
}

macro_rules! scalar_from_path {
	($($ty:ty => $name:literal),* $(,)?) => {
		$(
			impl FromPath for $ty {
				fn from_path(ctx: &ParamContext) -> Result<Self, PathError> {
					ctx.expect_len(1)?;
					ctx.parse_at(0, $name)
				}
			}
		)*
	};
}

scalar_from_path! {
	i32 => "i32",
	i64 => "i64",
	u32 => "u32",
	u64 => "u64",
	bool => "bool",
	String => "String",
}

/// Extracts one parameter by position.
pub trait SingleFromPath: Sized {
	fn from_path_at(ctx: &ParamContext, index: usize) -> Result<Self, PathError>;
}

impl<T> SingleFromPath for T
where
	T: FromStr,
	T::Err: Display,
{
	fn from_path_at(ctx: &ParamContext, index: usize) -> Result<Self, PathError> {
		ctx.parse_at(index, std::any::type_name::<T>())
	}
}

macro_rules! tuple_from_path {
	($len:literal; $($idx:tt => $ty:ident),+) => {
		impl<$($ty),+> FromPath for ($($ty,)+)
		where
			$($ty: FromStr, <$ty as FromStr>::Err: Display,)+
		{
			fn from_path(ctx: &ParamContext) -> Result<Self, PathError> {
				ctx.expect_len($len)?;
				Ok(($(ctx.parse_at::<$ty>($idx, std::any::type_name::<$ty>())?,)+))
			}
		}
	};
}

tuple_from_path!(2; 0 => A, 1 => B);
tuple_from_path!(3; 0 => A, 1 => B, 2 => C);
tuple_from_path!(4; 0 => A, 1 => B, 2 => C, 3 => D);
tuple_from_path!(5; 0 => A, 1 => B, 2 => C, 3 => D, 4 => E);
tuple_from_path!(6; 0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F);

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn params(pairs: &[(&str, &str)]) -> RouteParams {
		pairs.iter().copied().collect()
	}

	#[rstest]
	fn test_params_keep_declaration_order() {
		let p = params(&[("z", "1"), ("a", "2"), ("m", "3")]);
		let names: Vec<_> = p.iter().map(|(k, _)| k).collect();
		assert_eq!(names, vec!["z", "a", "m"]);
	}

	#[rstest]
	fn test_merged_with_child_wins() {
		// Arrange
		let parent = params(&[("org", "acme"), ("id", "1")]);
		let child = params(&[("id", "2"), ("tab", "info")]);

		// Act
		let merged = parent.merged_with(&child);

		// Assert
		assert_eq!(merged.get("org"), Some("acme"));
		assert_eq!(merged.get("id"), Some("2"));
		assert_eq!(merged.get("tab"), Some("info"));
		assert_eq!(merged.len(), 3);
		assert_eq!(parent.get("id"), Some("1"));
	}

	#[rstest]
	fn test_parse_by_name() {
		let p = params(&[("id", "42"), ("slug", "hello")]);
		assert_eq!(p.parse::<i64>("id").unwrap(), 42);
		assert_eq!(p.parse::<String>("slug").unwrap(), "hello");
	}

	#[rstest]
	fn test_parse_missing() {
		let p = RouteParams::new();
		assert_eq!(p.parse::<u32>("id"), Err(PathError::Missing("id".to_string())));
	}

	#[rstest]
	fn test_parse_error_names_parameter() {
		let p = params(&[("id", "abc")]);
		match p.parse::<u32>("id") {
			Err(PathError::ParseError {
				param_name,
				raw_value,
				..
			}) => {
				assert_eq!(param_name.as_deref(), Some("id"));
				assert_eq!(raw_value, "abc");
			}
			other => panic!("Expected ParseError, got {other:?}"),
		}
	}

	#[rstest]
	fn test_serializes_as_object() {
		let p = params(&[("b", "2"), ("a", "1")]);
		assert_eq!(serde_json::to_string(&p).unwrap(), r#"{"b":"2","a":"1"}"#);
	}

	#[rstest]
	fn test_path_wrapper() {
		let id = Path(42i64);
		assert_eq!(*id, 42);
		let value: &i64 = id.as_ref();
		assert_eq!(*value, 42);
		assert_eq!(Path("x".to_string()).into_inner(), "x");
	}

	#[rstest]
	#[case("42", 42)]
	#[case("-7", -7)]
	fn test_from_path_i32(#[case] raw: &str, #[case] expected: i32) {
		let ctx = params(&[("id", raw)]).to_context();
		assert_eq!(i32::from_path(&ctx).unwrap(), expected);
	}

	#[rstest]
	fn test_from_path_wide_integers() {
		let ctx = params(&[("n", "18446744073709551615")]).to_context();
		assert_eq!(u64::from_path(&ctx).unwrap(), u64::MAX);
		let ctx = params(&[("n", "9223372036854775807")]).to_context();
		assert_eq!(i64::from_path(&ctx).unwrap(), i64::MAX);
	}

	#[rstest]
	fn test_from_path_bool_and_string() {
		let ctx = params(&[("flag", "true")]).to_context();
		assert!(bool::from_path(&ctx).unwrap());
		let ctx = params(&[("name", "ada")]).to_context();
		assert_eq!(String::from_path(&ctx).unwrap(), "ada");
	}

	#[rstest]
	fn test_from_path_parse_error() {
		// Arrange
		let ctx = params(&[("id", "not_a_number")]).to_context();

		// Act
		let result = u32::from_path(&ctx);

		// Assert
		match result {
			Err(PathError::ParseError {
				param_index,
				param_name,
				param_type,
				raw_value,
				..
			}) => {
				assert_eq!(param_index, Some(0));
				assert_eq!(param_name.as_deref(), Some("id"));
				assert_eq!(param_type, "u32");
				assert_eq!(raw_value, "not_a_number");
			}
			other => panic!("Expected ParseError, got {other:?}"),
		}
	}

	#[rstest]
	fn test_scalar_count_mismatch() {
		let ctx = params(&[("a", "1"), ("b", "2")]).to_context();
		assert_eq!(
			i32::from_path(&ctx),
			Err(PathError::CountMismatch {
				expected: 1,
				actual: 2
			})
		);
	}

	#[rstest]
	fn test_tuple_extraction() {
		let ctx = params(&[("user", "7"), ("slug", "intro"), ("draft", "false")]).to_context();
		let (user, slug, draft) = <(u64, String, bool)>::from_path(&ctx).unwrap();
		assert_eq!(user, 7);
		assert_eq!(slug, "intro");
		assert!(!draft);
	}

	#[rstest]
	fn test_six_tuple() {
		let ctx = params(&[("a", "1"), ("b", "2"), ("c", "3"), ("d", "4"), ("e", "5"), ("f", "6")])
			.to_context();
		let tuple = <(u8, u8, u8, u8, u8, u8)>::from_path(&ctx).unwrap();
		assert_eq!(tuple, (1, 2, 3, 4, 5, 6));
	}

	#[rstest]
	fn test_tuple_count_mismatch() {
		let ctx = params(&[("a", "1")]).to_context();
		assert!(matches!(
			<(i32, i32)>::from_path(&ctx),
			Err(PathError::CountMismatch {
				expected: 2,
				actual: 1
			})
		));
	}

	#[rstest]
	fn test_single_from_path_at() {
		let ctx = params(&[("a", "x"), ("b", "9")]).to_context();
		assert_eq!(u16::from_path_at(&ctx, 1).unwrap(), 9);
		assert!(matches!(
			u16::from_path_at(&ctx, 2),
			Err(PathError::CountMismatch { expected: 3, .. })
		));
	}
}
