//! Error types for pattern compilation and parameter extraction.

use thiserror::Error;

/// Result alias for pattern compilation.
pub type PatternResult<T> = Result<T, PatternError>;

/// A route pattern that cannot be turned into a matcher.
///
/// An unmatchable route is a configuration bug, so these are reported to the
/// caller rather than treated as "no match".
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
	/// Pattern exceeds the maximum accepted length.
	#[error("Pattern length {length} exceeds maximum allowed length of {max} bytes")]
	TooLong {
		/// Length of the rejected pattern.
		length: usize,
		/// Maximum accepted length.
		max: usize,
	},
	/// Pattern has more path segments than accepted.
	#[error("Pattern has {count} path segments, exceeding maximum of {max}")]
	TooManySegments {
		/// Segment count of the rejected pattern.
		count: usize,
		/// Maximum accepted segment count.
		max: usize,
	},
	/// A reserved character appeared where the grammar does not allow it.
	#[error("Unexpected {token} at index {index} in pattern {pattern:?}")]
	UnexpectedToken {
		/// The offending token (`"END"` for a premature end of input).
		token: String,
		/// Byte offset of the token.
		index: usize,
		/// The full pattern.
		pattern: String,
	},
	/// `:` or `*` not followed by a parameter name.
	#[error("Missing parameter name at index {index} in pattern {pattern:?}")]
	MissingParameterName {
		/// Byte offset of the `:` / `*`.
		index: usize,
		/// The full pattern.
		pattern: String,
	},
	/// Two parameters with no literal text between them.
	#[error("Missing text after parameter {name:?} in pattern {pattern:?}")]
	MissingSeparator {
		/// Name of the parameter that needs trailing text.
		name: String,
		/// The full pattern.
		pattern: String,
	},
	/// The generated (or constraint) regular expression failed to compile.
	#[error("Failed to compile pattern regex: {0}")]
	InvalidRegex(String),
}

impl From<regex::Error> for PatternError {
	fn from(err: regex::Error) -> Self {
		Self::InvalidRegex(err.to_string())
	}
}

/// Error type for typed path parameter extraction.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
	/// Failed to parse a parameter value.
	#[error("Failed to parse parameter {} '{raw_value}' as {param_type}: {reason}", describe(.param_index, .param_name))]
	ParseError {
		/// Index of the parameter that failed to parse.
		param_index: Option<usize>,
		/// Name of the parameter, when extracted by key.
		param_name: Option<String>,
		/// Expected type name.
		param_type: &'static str,
		/// Raw string value that failed to parse.
		raw_value: String,
		/// Error message from parsing.
		reason: String,
	},
	/// Parameter count mismatch.
	#[error("Parameter count mismatch: expected {expected}, got {actual}")]
	CountMismatch {
		/// Expected number of parameters.
		expected: usize,
		/// Actual number of parameters.
		actual: usize,
	},
	/// A named parameter is not present in the match.
	#[error("Missing route parameter: {0}")]
	Missing(String),
}

fn describe(index: &Option<usize>, name: &Option<String>) -> String {
	match (index, name) {
		(_, Some(name)) => format!("'{name}'"),
		(Some(index), None) => format!("[{index}]"),
		(None, None) => String::from("value"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_path_error_display() {
		let err = PathError::ParseError {
			param_index: Some(0),
			param_name: None,
			param_type: "i32",
			raw_value: "abc".to_string(),
			reason: "invalid digit".to_string(),
		};
		assert!(err.to_string().contains("parameter [0]"));
		assert!(err.to_string().contains("abc"));
		assert!(err.to_string().contains("i32"));
	}

	#[rstest]
	fn test_path_error_named_display() {
		let err = PathError::ParseError {
			param_index: None,
			param_name: Some("id".to_string()),
			param_type: "u64",
			raw_value: "x".to_string(),
			reason: "invalid digit".to_string(),
		};
		assert_eq!(
			err.to_string(),
			"Failed to parse parameter 'id' 'x' as u64: invalid digit"
		);
	}

	#[rstest]
	fn test_path_error_count_mismatch() {
		let err = PathError::CountMismatch {
			expected: 2,
			actual: 1,
		};
		assert!(err.to_string().contains("expected 2"));
		assert!(err.to_string().contains("got 1"));
	}

	#[rstest]
	fn test_pattern_error_display() {
		let err = PatternError::UnexpectedToken {
			token: "(".to_string(),
			index: 3,
			pattern: "/a/(b)".to_string(),
		};
		assert_eq!(
			err.to_string(),
			"Unexpected ( at index 3 in pattern \"/a/(b)\""
		);
	}
}
