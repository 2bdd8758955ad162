//! Route patterns, path matching and path utilities.
//!
//! This crate holds the pure half of the router: nothing here touches the
//! location or the reactive runtime, so every function can be called from a
//! render pass, a server request or a test alike.
//!
//! ```
//! use wayfinder_urls::{DefaultParser, RoutePattern, match_route};
//!
//! let parser = DefaultParser::new();
//! let route = RoutePattern::from("/posts/:slug");
//! let result = match_route(&parser, &route, "/posts/hello-world", false).unwrap();
//! assert_eq!(result.params().unwrap().get("slug"), Some("hello-world"));
//! ```

pub mod error;
pub mod matcher;
pub mod params;
pub mod paths;
pub mod pattern;

pub use error::{PathError, PatternError, PatternResult};
pub use matcher::{MatchResult, apply, match_route};
pub use params::{FromPath, ParamContext, Path, RouteParams, SingleFromPath};
pub use paths::{
	absolute_path, decode_path, normalize_path, relative_path, resolve_target_path,
	sanitize_search, split_path_and_search,
};
pub use pattern::{
	CompiledMatcher, DefaultParser, MatcherKeys, PatternParser, RoutePattern, parse_pattern,
};
