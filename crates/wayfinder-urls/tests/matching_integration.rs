//! Integration tests for route matching across nested scopes

use rstest::*;
use wayfinder_urls::{
	DefaultParser, FromPath, Path, PatternError, PatternParser, RouteParams, RoutePattern,
	match_route, relative_path,
};

#[fixture]
fn parser() -> DefaultParser {
	DefaultParser::new()
}

#[rstest]
fn test_locale_prefix_then_nested_route(parser: DefaultParser) {
	// Arrange
	let outer = RoutePattern::from("/:locale([a-zA-Z]{2})");
	let inner = RoutePattern::from("/posts/:id");

	// Act
	let outer_match = match_route(&parser, &outer, "/ru/posts/5", true).unwrap();
	let base = outer_match.base().unwrap();
	let rest = relative_path(base, "/ru/posts/5");
	let inner_match = match_route(&parser, &inner, &rest, false).unwrap();

	// Assert
	assert_eq!(base, "/ru");
	assert_eq!(rest, "/posts/5");
	let merged = outer_match
		.params()
		.unwrap()
		.merged_with(inner_match.params().unwrap());
	assert_eq!(merged.get("locale"), Some("ru"));
	assert_eq!(merged.get("id"), Some("5"));
}

#[rstest]
fn test_locale_rejects_longer_segment(parser: DefaultParser) {
	let outer = RoutePattern::from("/:locale([a-zA-Z]{2})");
	assert!(!match_route(&parser, &outer, "/ru11/test", true).unwrap().is_match());
}

#[rstest]
#[case("/USERS/42", true)]
#[case("/users/42/", true)]
#[case("/users", false)]
fn test_literal_case_and_trailing_slash(
	parser: DefaultParser,
	#[case] path: &str,
	#[case] matched: bool,
) {
	let result = match_route(&parser, &RoutePattern::from("/users/:id"), path, false).unwrap();
	assert_eq!(result.is_match(), matched);
}

#[rstest]
fn test_wildcard_captures_rest(parser: DefaultParser) {
	let result = match_route(&parser, &RoutePattern::from("/docs/*"), "/docs/guide/intro", false)
		.unwrap();
	assert_eq!(result.params().unwrap().get("splat"), Some("guide/intro"));
}

#[rstest]
fn test_custom_parser_closure() {
	// Arrange: a parser that only understands exact paths
	let exact = |pattern: &str, _loose: bool| {
		wayfinder_urls::parse_pattern(&regex_free(pattern), false)
	};

	// Act
	let hit = match_route(&exact, &RoutePattern::from("/a:b"), "/a:b", false);

	// Assert
	assert!(hit.unwrap().is_match());
}

fn regex_free(pattern: &str) -> String {
	pattern.replace(':', "\\:")
}

#[rstest]
fn test_parser_errors_surface(parser: DefaultParser) {
	let err = parser.compile("/a/:", false).unwrap_err();
	assert!(matches!(err, PatternError::MissingParameterName { index: 3, .. }));
}

#[rstest]
fn test_typed_extraction_from_match(parser: DefaultParser) {
	let result =
		match_route(&parser, &RoutePattern::from("/orgs/:org/repos/:n"), "/orgs/acme/repos/3", false)
			.unwrap();

	let params: &RouteParams = result.params().unwrap();
	let Path((org, n)) = Path::<(String, u8)>::from_path(&params.to_context()).unwrap();

	assert_eq!(org, "acme");
	assert_eq!(n, 3);
	assert_eq!(params.parse::<u8>("n").unwrap(), 3);
}
