//! Applying route patterns to paths.

use regex::{Captures, Regex};

use crate::error::{PathError, PatternResult};
use crate::params::{FromPath, RouteParams};
use crate::pattern::{CompiledMatcher, MatcherKeys, PatternParser, RoutePattern};

/// Outcome of matching a route pattern against a path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MatchResult {
	/// The pattern matched.
	Matched {
		/// Captured parameters.
		params: RouteParams,
		/// The consumed prefix; only reported for loose matches.
		base: Option<String>,
	},
	/// The pattern did not match.
	#[default]
	NotMatched,
}

impl MatchResult {
	pub fn is_match(&self) -> bool {
		matches!(self, Self::Matched { .. })
	}

	/// Captured parameters, `None` when not matched.
	pub fn params(&self) -> Option<&RouteParams> {
		match self {
			Self::Matched { params, .. } => Some(params),
			Self::NotMatched => None,
		}
	}

	/// The consumed prefix of a loose match.
	pub fn base(&self) -> Option<&str> {
		match self {
			Self::Matched { base, .. } => base.as_deref(),
			Self::NotMatched => None,
		}
	}

	pub fn into_params(self) -> Option<RouteParams> {
		match self {
			Self::Matched { params, .. } => Some(params),
			Self::NotMatched => None,
		}
	}

	/// Extracts typed parameters from a match.
	///
	/// Returns `None` when not matched.
	pub fn extract<T: FromPath>(&self) -> Option<Result<T, PathError>> {
		self.params().map(|params| T::from_path(&params.to_context()))
	}
}

/// Matches `path` against `pattern`.
///
/// Path patterns are compiled with `parser` (an empty pattern means `*`);
/// regex patterns are used as they are. In loose mode the pattern only has to
/// match a prefix ending on a segment boundary, and that prefix is returned
/// as the match base.
///
/// Parameter names come from the compiled matcher when it declares them.
/// Otherwise the regex's named groups are used, and failing that the capture
/// groups are numbered from `"0"`. Groups that did not take part in the match
/// are left out.
///
/// # Errors
///
/// Returns the parser's [`PatternError`](crate::PatternError) when a path
/// pattern does not compile. Not matching is not an error.
///
/// ```
/// use wayfinder_urls::{DefaultParser, match_route};
///
/// let parser = DefaultParser::new();
/// let result = match_route(&parser, &"/users/:id".into(), "/users/123/posts", true).unwrap();
/// assert_eq!(result.params().unwrap().get("id"), Some("123"));
/// assert_eq!(result.base(), Some("/users/123"));
/// ```
pub fn match_route<P>(
	parser: &P,
	pattern: &RoutePattern,
	path: &str,
	loose: bool,
) -> PatternResult<MatchResult>
where
	P: PatternParser + ?Sized,
{
	let compiled = match pattern {
		RoutePattern::Regex(regex) => CompiledMatcher::from_regex(regex.clone()),
		RoutePattern::Path(source) if source.is_empty() => parser.compile("*", loose)?,
		RoutePattern::Path(source) => parser.compile(source, loose)?,
	};
	Ok(apply(&compiled, path, loose))
}

/// Runs an already compiled matcher against `path`.
pub fn apply(matcher: &CompiledMatcher, path: &str, loose: bool) -> MatchResult {
	let regex = matcher.regex();
	let Some(caps) = regex.captures(path) else {
		return MatchResult::NotMatched;
	};

	let (base, first_param) = if matcher.has_base_group() {
		(caps.get(1), 2)
	} else {
		(caps.get(0), 1)
	};

	let params = match matcher.keys() {
		MatcherKeys::Named(keys) => keys
			.iter()
			.zip(first_param..)
			.filter_map(|(key, group)| caps.get(group).map(|m| (key.as_str(), m.as_str())))
			.collect(),
		MatcherKeys::FromRegex => regex_params(regex, &caps, first_param),
	};

	MatchResult::Matched {
		params,
		base: if loose {
			Some(base.map_or_else(String::new, |m| m.as_str().to_string()))
		} else {
			None
		},
	}
}

fn regex_params(regex: &Regex, caps: &Captures<'_>, first_param: usize) -> RouteParams {
	if regex.capture_names().flatten().next().is_some() {
		return regex
			.capture_names()
			.flatten()
			.filter_map(|name| caps.name(name).map(|m| (name, m.as_str())))
			.collect();
	}

	(first_param..caps.len())
		.filter_map(|group| caps.get(group).map(|m| (group - first_param, m.as_str())))
		.map(|(index, value)| (index.to_string(), value))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::pattern::DefaultParser;
	use rstest::{fixture, rstest};

	#[fixture]
	fn parser() -> DefaultParser {
		DefaultParser::new()
	}

	fn run(parser: &DefaultParser, pattern: &str, path: &str, loose: bool) -> MatchResult {
		match_route(parser, &RoutePattern::from(pattern), path, loose).unwrap()
	}

	#[rstest]
	fn test_strict_match_has_no_base(parser: DefaultParser) {
		let result = run(&parser, "/users/:id", "/users/123", false);
		assert!(result.is_match());
		assert_eq!(result.params().unwrap().get("id"), Some("123"));
		assert_eq!(result.base(), None);
	}

	#[rstest]
	fn test_strict_rejects_longer_path(parser: DefaultParser) {
		assert_eq!(
			run(&parser, "/users/:id", "/users/123/posts", false),
			MatchResult::NotMatched
		);
	}

	#[rstest]
	fn test_loose_reports_base(parser: DefaultParser) {
		let result = run(&parser, "/a/:b", "/a/1/2/3", true);
		assert_eq!(result.base(), Some("/a/1"));
		assert_eq!(result.params().unwrap().get("b"), Some("1"));
	}

	#[rstest]
	fn test_locale_constraint(parser: DefaultParser) {
		// Arrange
		let pattern = "/:locale([a-zA-Z]{2})";

		// Act
		let hit = run(&parser, pattern, "/ru/test", true);
		let miss = run(&parser, pattern, "/ru11/test", true);

		// Assert
		assert_eq!(hit.params().unwrap().get("locale"), Some("ru"));
		assert_eq!(hit.params().unwrap().len(), 1);
		assert_eq!(hit.base(), Some("/ru"));
		assert!(!miss.is_match());
	}

	#[rstest]
	#[case("")]
	#[case("*")]
	fn test_empty_and_star_match_anything(parser: DefaultParser, #[case] pattern: &str) {
		let result = run(&parser, pattern, "/some/where", false);
		assert_eq!(result.params().unwrap().get("splat"), Some("some/where"));
	}

	#[rstest]
	fn test_optional_segment_omitted(parser: DefaultParser) {
		let result = run(&parser, "/users{/:id}", "/users", false);
		assert!(result.is_match());
		assert!(!result.params().unwrap().contains_key("id"));
	}

	#[rstest]
	fn test_regex_named_groups() {
		let regex = Regex::new(r"^/(?<section>[a-z]+)/(?<page>\d+)$").unwrap();
		let result = match_route(&DefaultParser::new(), &RoutePattern::from(regex), "/docs/4", false).unwrap();
		let params = result.into_params().unwrap();
		assert_eq!(params.get("section"), Some("docs"));
		assert_eq!(params.get("page"), Some("4"));
	}

	#[rstest]
	fn test_regex_numeric_keys() {
		let regex = Regex::new(r"^/(\w+)/(\d+)$").unwrap();
		let result = match_route(&DefaultParser::new(), &RoutePattern::from(regex), "/docs/4", false).unwrap();
		let params = result.into_params().unwrap();
		assert_eq!(params.get("0"), Some("docs"));
		assert_eq!(params.get("1"), Some("4"));
	}

	#[rstest]
	fn test_regex_loose_base_is_full_match() {
		let regex = Regex::new(r"^/app").unwrap();
		let result = match_route(&DefaultParser::new(), &RoutePattern::from(regex), "/app/x", true).unwrap();
		assert_eq!(result.base(), Some("/app"));
		assert!(result.params().unwrap().is_empty());
	}

	#[rstest]
	fn test_compile_error_propagates(parser: DefaultParser) {
		assert!(match_route(&parser, &RoutePattern::from("/a/(b)"), "/a/b", false).is_err());
	}

	#[rstest]
	fn test_extract_typed(parser: DefaultParser) {
		let result = run(&parser, "/users/:user/posts/:post", "/users/7/posts/12", false);
		let (user, post) = result.extract::<(u32, u32)>().unwrap().unwrap();
		assert_eq!((user, post), (7, 12));
		assert!(MatchResult::NotMatched.extract::<u32>().is_none());
	}
}
