//! Pure path helpers shared by every location source and router scope.
//!
//! None of these functions fail: a path that cannot be percent-decoded is
//! returned unchanged, so a cosmetic encoding problem never stops a render.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

/// Escapes of these characters are kept encoded when decoding a path.
const RESERVED: &[u8] = b";/?:@&=+$,#";

/// A base of `"/"` is the same as no base at all.
fn base_defaults(base: &str) -> &str {
	if base == "/" { "" } else { base }
}

/// Resolves a navigation target against a router base.
///
/// Targets starting with `~` are absolute and escape the base.
///
/// ```
/// use wayfinder_urls::absolute_path;
///
/// assert_eq!(absolute_path("/users", "/app"), "/app/users");
/// assert_eq!(absolute_path("~/login", "/app"), "/login");
/// assert_eq!(absolute_path("/users", "/"), "/users");
/// ```
pub fn absolute_path(to: &str, base: &str) -> String {
	match to.strip_prefix('~') {
		Some(absolute) => absolute.to_string(),
		None => format!("{}{}", base_defaults(base), to),
	}
}

/// Converts an absolute `path` to one relative to `base`.
///
/// Both inputs are percent-decoded first and the prefix test ignores case.
/// A path outside of `base` comes back prefixed with `~`.
///
/// ```
/// use wayfinder_urls::relative_path;
///
/// assert_eq!(relative_path("/app", "/app/users"), "/users");
/// assert_eq!(relative_path("/app", "/APP"), "/");
/// assert_eq!(relative_path("/app", "/other"), "~/other");
/// ```
pub fn relative_path(base: &str, path: &str) -> String {
	let base = decode_path(base_defaults(base));
	let path = decode_path(path);

	if starts_with_ignore_case(&path, &base) {
		let rest = &path[base.len()..];
		if rest.is_empty() {
			String::from("/")
		} else {
			rest.to_string()
		}
	} else {
		format!("~{path}")
	}
}

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
	match haystack.get(..prefix.len()) {
		Some(head) => head == prefix || head.to_lowercase() == prefix.to_lowercase(),
		None => false,
	}
}

/// Strips a single leading `?` and percent-decodes the rest.
pub fn sanitize_search(search: &str) -> String {
	let search = search.strip_prefix('?').unwrap_or(search);
	decode_path(search).into_owned()
}

/// Percent-decodes a URI the way a browser's `decodeURI` does.
///
/// Escapes that decode to a reserved URI character (`; / ? : @ & = + $ , #`)
/// are left encoded. Malformed escapes or invalid UTF-8 leave the whole input
/// untouched.
///
/// ```
/// use wayfinder_urls::decode_path;
///
/// assert_eq!(decode_path("/caf%C3%A9"), "/café");
/// assert_eq!(decode_path("/a%2Fb"), "/a%2Fb");
/// assert_eq!(decode_path("/100%"), "/100%");
/// ```
pub fn decode_path(input: &str) -> Cow<'_, str> {
	if !input.contains('%') {
		return Cow::Borrowed(input);
	}
	match decode_uri(input) {
		Some(decoded) => Cow::Owned(decoded),
		None => {
			tracing::trace!(input, "leaving undecodable path as is");
			Cow::Borrowed(input)
		}
	}
}

fn decode_uri(input: &str) -> Option<String> {
	let bytes = input.as_bytes();
	let mut out = String::with_capacity(input.len());
	let mut i = 0;

	while i < bytes.len() {
		if bytes[i] != b'%' {
			let next = input[i..].find('%').map_or(bytes.len(), |offset| i + offset);
			out.push_str(&input[i..next]);
			i = next;
			continue;
		}

		// A run of consecutive escapes, decoded together so multi-byte
		// sequences stay intact
		let start = i;
		while i < bytes.len() && bytes[i] == b'%' {
			let hex = bytes.get(i + 1..i + 3)?;
			if !hex.iter().all(u8::is_ascii_hexdigit) {
				return None;
			}
			i += 3;
		}
		let run = &input[start..i];
		let decoded: Vec<u8> = percent_decode_str(run).collect();
		push_decoded_run(&mut out, run, &decoded)?;
	}

	Some(out)
}

fn push_decoded_run(out: &mut String, run: &str, decoded: &[u8]) -> Option<()> {
	let mut k = 0;
	while let Some(&lead) = decoded.get(k) {
		let width = match lead {
			0x00..=0x7F => 1,
			0xC2..=0xDF => 2,
			0xE0..=0xEF => 3,
			0xF0..=0xF4 => 4,
			_ => return None,
		};

		if width == 1 {
			if RESERVED.contains(&lead) {
				// Each escape is exactly three bytes of the original run
				out.push_str(&run[k * 3..k * 3 + 3]);
			} else {
				out.push(char::from(lead));
			}
		} else {
			let sequence = decoded.get(k..k + width)?;
			out.push_str(std::str::from_utf8(sequence).ok()?);
		}
		k += width;
	}
	Some(())
}

/// Normalizes a path for active-link comparisons.
///
/// Query string and fragment are removed, an empty path becomes `/`, and a
/// single trailing `/` is dropped everywhere but the root.
///
/// ```
/// use wayfinder_urls::normalize_path;
///
/// assert_eq!(normalize_path("/about/"), "/about");
/// assert_eq!(normalize_path("/about?x=1#y"), "/about");
/// assert_eq!(normalize_path(""), "/");
/// ```
pub fn normalize_path(path: &str) -> String {
	let path = path.split('?').next().unwrap_or_default();
	let path = path.split('#').next().unwrap_or_default();

	if path.is_empty() {
		return String::from("/");
	}
	match path.strip_suffix('/') {
		Some(trimmed) if !trimmed.is_empty() => trimmed.to_string(),
		_ => path.to_string(),
	}
}

/// Splits `"/path?search"` at the first `?`.
pub fn split_path_and_search(input: &str) -> (&str, Option<&str>) {
	match input.split_once('?') {
		Some((path, search)) => (path, Some(search)),
		None => (input, None),
	}
}

/// Picks the navigation target of a link or redirect from its `href` / `to`.
///
/// Empty strings count as absent. The result is empty when neither is given.
pub fn resolve_target_path(href: Option<&str>, to: Option<&str>, prefer_to: bool) -> String {
	let href = href.filter(|value| !value.is_empty());
	let to = to.filter(|value| !value.is_empty());
	let target = if prefer_to { to.or(href) } else { href.or(to) };
	target.unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("/users", "/app", "/app/users")]
	#[case("/users", "", "/users")]
	#[case("/users", "/", "/users")]
	#[case("~/login", "/app", "/login")]
	#[case("", "/app", "/app")]
	fn test_absolute_path(#[case] to: &str, #[case] base: &str, #[case] expected: &str) {
		assert_eq!(absolute_path(to, base), expected);
	}

	#[rstest]
	#[case("/app", "/app/users", "/users")]
	#[case("/app", "/app", "/")]
	#[case("/App", "/app/x", "/x")]
	#[case("", "/users", "/users")]
	#[case("/", "/users", "/users")]
	#[case("/app", "/other", "~/other")]
	#[case("/app", "/app/caf%C3%A9", "/café")]
	#[case("/a%20b", "/a b/c", "/c")]
	fn test_relative_path(#[case] base: &str, #[case] path: &str, #[case] expected: &str) {
		assert_eq!(relative_path(base, path), expected);
	}

	#[rstest]
	#[case("?a=1&b=2", "a=1&b=2")]
	#[case("a=1", "a=1")]
	#[case("??a", "?a")]
	#[case("?q=hello%20world", "q=hello world")]
	#[case("?q=%E0%A4%A", "q=%E0%A4%A")]
	#[case("", "")]
	fn test_sanitize_search(#[case] search: &str, #[case] expected: &str) {
		assert_eq!(sanitize_search(search), expected);
	}

	#[rstest]
	#[case("/plain", "/plain")]
	#[case("/a%20b", "/a b")]
	#[case("/caf%C3%A9", "/café")]
	#[case("/a%2Fb%3f", "/a%2Fb%3f")]
	#[case("/%23tag", "/%23tag")]
	#[case("/100%", "/100%")]
	#[case("/%zz", "/%zz")]
	#[case("/%C3", "/%C3")]
	#[case("/%FF", "/%FF")]
	#[case("/%ED%A0%80", "/%ED%A0%80")]
	fn test_decode_path(#[case] input: &str, #[case] expected: &str) {
		assert_eq!(decode_path(input), expected);
	}

	#[rstest]
	#[case("/about/", "/about")]
	#[case("/about", "/about")]
	#[case("/about?x=1#y", "/about")]
	#[case("/about#y?x", "/about")]
	#[case("", "/")]
	#[case("/", "/")]
	#[case("?x=1", "/")]
	#[case("/a//", "/a/")]
	fn test_normalize_path(#[case] input: &str, #[case] expected: &str) {
		assert_eq!(normalize_path(input), expected);
	}

	#[rstest]
	#[case("/users?page=2", "/users", Some("page=2"))]
	#[case("/users", "/users", None)]
	#[case("/a?b?c", "/a", Some("b?c"))]
	fn test_split_path_and_search(
		#[case] input: &str,
		#[case] path: &str,
		#[case] search: Option<&str>,
	) {
		assert_eq!(split_path_and_search(input), (path, search));
	}

	#[rstest]
	#[case(Some("/h"), Some("/t"), false, "/h")]
	#[case(Some("/h"), Some("/t"), true, "/t")]
	#[case(Some(""), Some("/t"), false, "/t")]
	#[case(None, None, true, "")]
	fn test_resolve_target_path(
		#[case] href: Option<&str>,
		#[case] to: Option<&str>,
		#[case] prefer_to: bool,
		#[case] expected: &str,
	) {
		assert_eq!(resolve_target_path(href, to, prefer_to), expected);
	}
}
