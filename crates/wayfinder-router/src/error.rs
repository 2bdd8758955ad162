//! Router error types.

use thiserror::Error;
use wayfinder_urls::PatternError;

/// Result alias for router operations.
pub type RouterResult<T> = Result<T, RouterError>;

/// Errors raised by router operations.
///
/// Environment mismatches (no window) and undecodable paths are recovered
/// locally and never show up here.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RouterError {
	/// `reset` called on a memory location that does not record history.
	#[error("reset is only available on memory locations created with `record`")]
	ResetUnavailable,

	/// A route pattern failed to compile.
	#[error(transparent)]
	Pattern(#[from] PatternError),

	/// Search parameters could not be encoded into a query string.
	#[error("Failed to encode search parameters: {0}")]
	SearchParams(#[from] serde_urlencoded::ser::Error),

	/// Router settings could not be loaded or validated.
	#[error(transparent)]
	Settings(#[from] SettingsError),
}

/// Settings error
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SettingsError {
	#[error("File error: {0}")]
	FileError(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Unsupported format: {0}")]
	UnsupportedFormat(String),
}
