//! Property-based tests for pattern matching and path utilities

use proptest::prelude::*;
use rstest::*;
use wayfinder_urls::{DefaultParser, RoutePattern, absolute_path, match_route, relative_path};

fn mixed_case_path() -> impl Strategy<Value = String> {
	prop::collection::vec("[a-zA-Z0-9]{1,8}", 1..4).prop_map(|segments| format!("/{}", segments.join("/")))
}

/// Segments holding characters that appear percent-encoded in URLs, as
/// (decoded, encoded) pairs.
fn escaped_path() -> impl Strategy<Value = (String, String)> {
	let segment = ("[a-zA-Z]{1,4}", prop_oneof![Just((" ", "%20")), Just(("\u{e9}", "%C3%A9"))], "[a-z]{1,4}")
		.prop_map(|(head, (decoded, encoded), tail)| (format!("{head}{decoded}{tail}"), format!("{head}{encoded}{tail}")));
	prop::collection::vec(segment, 1..4).prop_map(|segments| {
		let decoded: Vec<_> = segments.iter().map(|(decoded, _)| decoded.as_str()).collect();
		let encoded: Vec<_> = segments.iter().map(|(_, encoded)| encoded.as_str()).collect();
		(format!("/{}", decoded.join("/")), format!("/{}", encoded.join("/")))
	})
}

fn swap_case(value: &str) -> String {
	value
		.chars()
		.map(|c| if c.is_ascii_uppercase() { c.to_ascii_lowercase() } else { c.to_ascii_uppercase() })
		.collect()
}

fn static_path() -> impl Strategy<Value = String> {
	prop::collection::vec("[a-z0-9]{1,8}", 1..6).prop_map(|segments| format!("/{}", segments.join("/")))
}

proptest! {
	/// Test: static pattern matches itself
	///
	/// Category: Property
	/// A pattern without parameters matches its own text with no params.
	#[rstest]
	fn prop_static_pattern_matches_itself(path in static_path()) {
		let parser = DefaultParser::new();

		let result = match_route(&parser, &RoutePattern::from(path.as_str()), &path, false).unwrap();

		prop_assert!(result.is_match());
		prop_assert!(result.params().unwrap().is_empty());
	}

	/// Test: two segment parameters
	///
	/// Category: Property
	/// `/:a/:b` captures each segment under its own name.
	#[rstest]
	fn prop_two_params_extracted(x in "[a-zA-Z0-9._~-]{1,12}", y in "[a-zA-Z0-9._~-]{1,12}") {
		let parser = DefaultParser::new();
		let path = format!("/{x}/{y}");

		let result = match_route(&parser, &RoutePattern::from("/:a/:b"), &path, false).unwrap();

		let params = result.into_params().unwrap();
		prop_assert_eq!(params.get("a"), Some(x.as_str()));
		prop_assert_eq!(params.get("b"), Some(y.as_str()));
		prop_assert_eq!(params.len(), 2);
	}

	/// Test: loose match consumes a prefix
	///
	/// Category: Property
	/// The reported base is a prefix of the path and matches strictly on its own.
	#[rstest]
	fn prop_loose_match_is_prefix(
		head in "[a-c]{1,2}",
		segments in prop::collection::vec("[a-c]{1,2}", 1..6),
	) {
		let parser = DefaultParser::new();
		let pattern = RoutePattern::from(format!("/{head}/:id"));
		let path = format!("/{}", segments.join("/"));

		let loose = match_route(&parser, &pattern, &path, true).unwrap();

		if let Some(base) = loose.base() {
			prop_assert!(path.starts_with(base));
			let strict = match_route(&parser, &pattern, base, false).unwrap();
			prop_assert!(strict.is_match());
			prop_assert_eq!(strict.params(), loose.params());
		}
	}

	/// Test: relative path inverts absolute path
	///
	/// Category: Property
	/// Joining a target onto a base and stripping the base again yields the target.
	#[rstest]
	fn prop_relative_inverts_absolute(
		base in prop_oneof![Just(String::new()), "/[a-z]{1,6}"],
		to in static_path(),
	) {
		prop_assert_eq!(relative_path(&base, &absolute_path(&to, &base)), to);
	}

	/// Test: base stripping ignores case
	///
	/// Category: Property
	/// A location whose base differs only in letter case still resolves inside the base.
	#[rstest]
	fn prop_relative_ignores_base_case(base in mixed_case_path(), to in static_path()) {
		let location = format!("{}{to}", swap_case(&base));

		prop_assert_eq!(relative_path(&base, &location), to);
	}

	/// Test: base stripping compares decoded paths
	///
	/// Category: Property
	/// Percent-encoded bases and locations are decoded before the prefix is stripped.
	#[rstest]
	fn prop_relative_decodes_escapes(base in escaped_path(), to in escaped_path()) {
		let ((base_decoded, base_encoded), (to_decoded, to_encoded)) = (base, to);
		let location = format!("{base_encoded}{to_encoded}");

		prop_assert_eq!(relative_path(&base_decoded, &location), to_decoded.clone());
		prop_assert_eq!(relative_path(&base_encoded, &location), to_decoded);
	}
}
