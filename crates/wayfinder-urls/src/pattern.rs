//! Route pattern compilation.
//!
//! A route pattern is compiled into a [`CompiledMatcher`]: a regular
//! expression plus the ordered list of parameter names its capture groups
//! belong to.
//!
//! # Pattern Syntax
//!
//! - `/users` - literal segments, matched case-insensitively
//! - `/users/:id` - named segment, any characters except `/`
//! - `/:locale([a-z]{2})` - named segment constrained by an inline regex
//! - `/files/*path` - named wildcard, the rest of the path including `/`
//! - `*`, `/*` and a trailing `/*` - unnamed wildcard, captured as `splat`
//! - `/users{/:id}` - optional group
//! - `\\:` - escaped literal character
//!
//! Strict matchers must consume the whole path (one trailing `/` allowed).
//! Loose matchers only need to consume a prefix that ends on a segment
//! boundary; the consumed prefix is reported as the match base so that a
//! nested router can continue from there.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::error::{PatternError, PatternResult};

/// Maximum allowed length for a route pattern string in bytes.
pub const MAX_PATTERN_LENGTH: usize = 1024;

/// Maximum allowed number of path segments in a route pattern.
pub const MAX_PATH_SEGMENTS: usize = 32;

/// Maximum allowed size for a compiled pattern regex (in bytes).
pub const MAX_REGEX_SIZE: usize = 1 << 20; // 1 MiB

/// Name given to unnamed wildcards.
pub const SPLAT: &str = "splat";

static CONSTRAINT_SITE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r":([A-Za-z0-9_]+)\(([^)]+)\)").expect("CONSTRAINT_SITE: invalid regex pattern")
});

/// A route pattern as given by the application.
#[derive(Debug, Clone)]
pub enum RoutePattern {
	/// A pattern string in the syntax described at the module level.
	Path(String),
	/// A ready-made regular expression, used verbatim.
	Regex(Regex),
}

impl RoutePattern {
	/// The pattern source text.
	pub fn as_str(&self) -> &str {
		match self {
			Self::Path(path) => path,
			Self::Regex(regex) => regex.as_str(),
		}
	}
}

impl From<&str> for RoutePattern {
	fn from(pattern: &str) -> Self {
		Self::Path(pattern.to_string())
	}
}

impl From<String> for RoutePattern {
	fn from(pattern: String) -> Self {
		Self::Path(pattern)
	}
}

impl From<&String> for RoutePattern {
	fn from(pattern: &String) -> Self {
		Self::Path(pattern.clone())
	}
}

impl From<Regex> for RoutePattern {
	fn from(regex: Regex) -> Self {
		Self::Regex(regex)
	}
}

impl PartialEq for RoutePattern {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Path(a), Self::Path(b)) => a == b,
			(Self::Regex(a), Self::Regex(b)) => a.as_str() == b.as_str(),
			_ => false,
		}
	}
}

impl Eq for RoutePattern {}

impl fmt::Display for RoutePattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Where parameter names come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatcherKeys {
	/// One name per capture group, in group order.
	Named(Vec<String>),
	/// Use the regex's own named groups, or numeric indices when it has none.
	FromRegex,
}

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub struct CompiledMatcher {
	regex: Regex,
	keys: MatcherKeys,
	base_group: bool,
}

impl CompiledMatcher {
	/// A matcher whose capture groups map onto `keys`.
	pub fn new(regex: Regex, keys: Vec<String>) -> Self {
		Self {
			regex,
			keys: MatcherKeys::Named(keys),
			base_group: false,
		}
	}

	/// A matcher that takes its parameter names from the regex itself.
	pub fn from_regex(regex: Regex) -> Self {
		Self {
			regex,
			keys: MatcherKeys::FromRegex,
			base_group: false,
		}
	}

	/// Marks capture group 1 as the consumed base rather than a parameter.
	pub fn with_base_group(mut self) -> Self {
		self.base_group = true;
		self
	}

	/// The compiled regular expression.
	pub fn regex(&self) -> &Regex {
		&self.regex
	}

	/// Parameter naming rule.
	pub fn keys(&self) -> &MatcherKeys {
		&self.keys
	}

	/// Whether group 1 holds the consumed base.
	pub fn has_base_group(&self) -> bool {
		self.base_group
	}

	/// Returns the parameter names, if the matcher declares them.
	pub fn param_names(&self) -> Option<&[String]> {
		match &self.keys {
			MatcherKeys::Named(keys) => Some(keys),
			MatcherKeys::FromRegex => None,
		}
	}

	/// Checks if this matcher would match the given path.
	pub fn is_match(&self, path: &str) -> bool {
		self.regex.is_match(path)
	}
}

/// Compiles route pattern strings into matchers.
///
/// Routers use [`DefaultParser`] unless a scope overrides it. Plain functions
/// and closures with the same signature are parsers too.
pub trait PatternParser {
	/// Compiles `pattern`; `loose` accepts prefix matches ending on a segment boundary.
	fn compile(&self, pattern: &str, loose: bool) -> PatternResult<CompiledMatcher>;
}

impl<F> PatternParser for F
where
	F: Fn(&str, bool) -> PatternResult<CompiledMatcher>,
{
	fn compile(&self, pattern: &str, loose: bool) -> PatternResult<CompiledMatcher> {
		self(pattern, loose)
	}
}

/// The standard parser, caching compiled matchers by `(pattern, loose)`.
#[derive(Debug, Default)]
pub struct DefaultParser {
	cache: RefCell<HashMap<(String, bool), CompiledMatcher>>,
}

/// Cached matchers kept before the cache is cleared.
const CACHE_CAPACITY: usize = 256;

impl DefaultParser {
	/// Creates a parser with an empty cache.
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of cached matchers.
	pub fn cached(&self) -> usize {
		self.cache.borrow().len()
	}
}

impl PatternParser for DefaultParser {
	fn compile(&self, pattern: &str, loose: bool) -> PatternResult<CompiledMatcher> {
		let key = (pattern.to_string(), loose);
		if let Some(hit) = self.cache.borrow().get(&key) {
			return Ok(hit.clone());
		}

		let compiled = parse_pattern(pattern, loose)?;
		tracing::debug!(pattern, loose, regex = compiled.regex.as_str(), "compiled route pattern");

		let mut cache = self.cache.borrow_mut();
		if cache.len() >= CACHE_CAPACITY {
			cache.clear();
		}
		cache.insert(key, compiled.clone());
		Ok(compiled)
	}
}

/// Compiles a route pattern without caching.
///
/// An empty pattern is treated as `*`.
///
/// # Errors
///
/// Returns [`PatternError`] if the pattern is too long, has too many
/// segments, breaks the grammar, or yields an invalid regex.
pub fn parse_pattern(pattern: &str, loose: bool) -> PatternResult<CompiledMatcher> {
	check_limits(pattern)?;

	let sites: Vec<_> = CONSTRAINT_SITE.captures_iter(pattern).collect();
	if !sites.is_empty() {
		let mut body = String::new();
		let mut keys = Vec::with_capacity(sites.len());
		let mut last = 0;
		for site in &sites {
			let (Some(whole), Some(name), Some(constraint)) = (site.get(0), site.get(1), site.get(2))
			else {
				continue;
			};
			body.push_str(&regex::escape(&pattern[last..whole.start()]));
			body.push('(');
			body.push_str(constraint.as_str());
			body.push(')');
			keys.push(name.as_str().to_string());
			last = whole.end();
		}
		body.push_str(&regex::escape(&pattern[last..]));

		return if loose {
			build(&format!("^({body})(?:/|$)"), keys, true)
		} else {
			build(&format!("^{body}$"), keys, false)
		};
	}

	let normalized = normalize_wildcard(pattern);
	let tokens = Lexer::new(&normalized).parse(false)?;
	let mut source = SourceBuilder::default();
	source.emit(&tokens, &normalized)?;
	let SourceBuilder { out: body, keys, .. } = source;

	if loose {
		build(&format!("^((?:{body})(?:/$)?)(?:/|$)"), keys, true)
	} else {
		build(&format!("^(?:{body})(?:/$)?$"), keys, false)
	}
}

fn check_limits(pattern: &str) -> PatternResult<()> {
	// Reject patterns exceeding the maximum length to prevent ReDoS
	if pattern.len() > MAX_PATTERN_LENGTH {
		return Err(PatternError::TooLong {
			length: pattern.len(),
			max: MAX_PATTERN_LENGTH,
		});
	}

	let count = pattern.split('/').count();
	if count > MAX_PATH_SEGMENTS {
		return Err(PatternError::TooManySegments {
			count,
			max: MAX_PATH_SEGMENTS,
		});
	}
	Ok(())
}

fn build(source: &str, keys: Vec<String>, base_group: bool) -> PatternResult<CompiledMatcher> {
	let regex = RegexBuilder::new(source)
		.case_insensitive(true)
		.size_limit(MAX_REGEX_SIZE)
		.build()?;
	let matcher = CompiledMatcher::new(regex, keys);
	Ok(if base_group {
		matcher.with_base_group()
	} else {
		matcher
	})
}

/// Gives unnamed wildcards the name [`SPLAT`].
fn normalize_wildcard(pattern: &str) -> String {
	match pattern {
		"" | "*" | "/*" => format!("/*{SPLAT}"),
		_ => match pattern.strip_suffix("/*") {
			Some(head) => format!("{head}/*{SPLAT}"),
			None => pattern.to_string(),
		},
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
	Text(String),
	Param(String),
	Wildcard(String),
	Group(Vec<Token>),
}

struct Lexer<'a> {
	pattern: &'a str,
	chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
	fn new(pattern: &'a str) -> Self {
		Self {
			pattern,
			chars: pattern.char_indices().peekable(),
		}
	}

	fn unexpected(&self, token: impl Into<String>, index: usize) -> PatternError {
		PatternError::UnexpectedToken {
			token: token.into(),
			index,
			pattern: self.pattern.to_string(),
		}
	}

	fn parse(&mut self, in_group: bool) -> PatternResult<Vec<Token>> {
		let mut tokens = Vec::new();
		let mut text = String::new();

		fn flush(text: &mut String, tokens: &mut Vec<Token>) {
			if !text.is_empty() {
				tokens.push(Token::Text(std::mem::take(text)));
			}
		}

		while let Some((index, c)) = self.chars.next() {
			match c {
				'\\' => match self.chars.next() {
					Some((_, escaped)) => text.push(escaped),
					None => return Err(self.unexpected("END", self.pattern.len())),
				},
				':' => {
					flush(&mut text, &mut tokens);
					let name = self.name(index)?;
					tokens.push(Token::Param(name));
				}
				'*' => {
					flush(&mut text, &mut tokens);
					let name = self.name(index)?;
					tokens.push(Token::Wildcard(name));
				}
				'{' => {
					flush(&mut text, &mut tokens);
					let inner = self.parse(true)?;
					tokens.push(Token::Group(inner));
				}
				'}' if in_group => {
					flush(&mut text, &mut tokens);
					return Ok(tokens);
				}
				'}' | '(' | ')' | '[' | ']' | '+' | '?' | '!' => {
					return Err(self.unexpected(c, index));
				}
				_ => text.push(c),
			}
		}

		if in_group {
			return Err(self.unexpected("END", self.pattern.len()));
		}
		flush(&mut text, &mut tokens);
		Ok(tokens)
	}

	/// Reads the name after `:` or `*`, bare or `"quoted"`.
	fn name(&mut self, sigil: usize) -> PatternResult<String> {
		let mut name = String::new();

		if self.chars.next_if(|&(_, c)| c == '"').is_some() {
			loop {
				match self.chars.next() {
					Some((_, '"')) => break,
					Some((_, '\\')) => match self.chars.next() {
						Some((_, escaped)) => name.push(escaped),
						None => return Err(self.unexpected("END", self.pattern.len())),
					},
					Some((_, c)) => name.push(c),
					None => return Err(self.unexpected("END", self.pattern.len())),
				}
			}
		} else if let Some((_, first)) = self.chars.next_if(|&(_, c)| is_id_start(c)) {
			name.push(first);
			while let Some((_, c)) = self.chars.next_if(|&(_, c)| is_id_continue(c)) {
				name.push(c);
			}
		}

		if name.is_empty() {
			return Err(PatternError::MissingParameterName {
				index: sigil,
				pattern: self.pattern.to_string(),
			});
		}
		Ok(name)
	}
}

fn is_id_start(c: char) -> bool {
	c.is_alphabetic() || c == '_' || c == '$'
}

fn is_id_continue(c: char) -> bool {
	c.is_alphanumeric() || c == '_' || c == '$'
}

struct SourceBuilder {
	out: String,
	keys: Vec<String>,
	/// Literal text since the last parameter
	backtrack: String,
	/// Whether a `/` has been seen since the last parameter
	safe: bool,
}

impl Default for SourceBuilder {
	fn default() -> Self {
		Self {
			out: String::new(),
			keys: Vec::new(),
			backtrack: String::new(),
			safe: true,
		}
	}
}

impl SourceBuilder {
	fn emit(&mut self, tokens: &[Token], pattern: &str) -> PatternResult<()> {
		for token in tokens {
			match token {
				Token::Text(text) => {
					self.out.push_str(&regex::escape(text));
					self.backtrack.push_str(text);
					self.safe |= text.contains('/');
				}
				Token::Param(name) | Token::Wildcard(name) => {
					if !self.safe && self.backtrack.is_empty() {
						return Err(PatternError::MissingSeparator {
							name: name.clone(),
							pattern: pattern.to_string(),
						});
					}
					if matches!(token, Token::Wildcard(_)) {
						self.out.push_str(r"([\s\S]+)");
					} else {
						self.out.push_str(&self.segment_capture());
					}
					self.keys.push(name.clone());
					self.backtrack.clear();
					self.safe = false;
				}
				Token::Group(inner) => {
					self.out.push_str("(?:");
					self.emit(inner, pattern)?;
					self.out.push_str(")?");
				}
			}
		}
		Ok(())
	}

	/// A segment parameter may not swallow the literal text that precedes it
	/// (e.g. the `-` in `/:from-:to`).
	fn segment_capture(&self) -> String {
		if self.safe {
			return String::from("([^/]+)");
		}
		let mut chars = self.backtrack.chars();
		match (chars.next(), chars.next()) {
			(Some(single), None) => format!("([^/{}]+)", regex::escape(&single.to_string())),
			// Longer separators would need look-around; a lazy segment keeps
			// the separator available to the following literal
			_ => String::from("([^/]+?)"),
		}
	}
}
