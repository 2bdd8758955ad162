//! Reactive route hooks.
//!
//! Everything here is a memo over a [`RouterScope`]: the location relative to
//! the scope's base, the sanitized search, match results, search parameters
//! and the route boundaries that nest routers. Location sources are opened
//! once per hook and reopened only when the scope switches to a different
//! source; dropping the hook closes them.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use wayfinder_reactive::{Memo, untrack};
use wayfinder_urls::{
	MatchResult, RouteParams, RoutePattern, normalize_path, relative_path, resolve_target_path,
	sanitize_search,
};

use crate::context::{RouterContext, RouterOverrides, RouterScope};
use crate::error::RouterResult;
use crate::location::{LocationCell, LocationHook, NavigateOptions, Navigator, SearchHook};
use crate::logging::dev_warn;

/// A location source opened for one hook, identified by the hook object it
/// came from.
struct Active<H: ?Sized, V> {
	hook: Rc<H>,
	value: V,
}

impl<H: ?Sized, V: Clone> Clone for Active<H, V> {
	fn clone(&self) -> Self {
		Self {
			hook: self.hook.clone(),
			value: self.value.clone(),
		}
	}
}

impl<H: ?Sized, V> PartialEq for Active<H, V> {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.hook, &other.hook)
	}
}

/// Opens the source `select` picks from the scope's context, reopening it
/// when the context starts pointing at a different hook object.
fn active_source<H, V>(
	context: Memo<RouterContext>,
	select: fn(&RouterContext) -> &Rc<H>,
	open: fn(&H, &RouterContext) -> V,
) -> Memo<Active<H, V>>
where
	H: ?Sized + 'static,
	V: Clone + 'static,
{
	let mut current: Option<Active<H, V>> = None;
	Memo::new(move || {
		let router = context.get();
		let hook = select(&router);
		if let Some(active) = current.as_ref().filter(|active| Rc::ptr_eq(&active.hook, hook)) {
			return active.clone();
		}
		let value = untrack(|| open(&**hook, &router));
		let active = Active {
			hook: hook.clone(),
			value,
		};
		tracing::trace!(version = router.version(), "location source opened");
		current = Some(active.clone());
		active
	})
}

type PathSource = Active<dyn LocationHook, (LocationCell, Navigator)>;

/// The current location relative to a scope's base.
#[derive(Clone)]
pub struct UseLocation {
	path: Memo<String>,
	source: Memo<PathSource>,
}

impl UseLocation {
	/// The relative path as a memo.
	pub fn path(&self) -> &Memo<String> {
		&self.path
	}

	/// Reads the relative path, tracking it.
	pub fn get(&self) -> String {
		self.path.get()
	}

	/// Navigates the active source. `to` is passed on unchanged.
	pub fn navigate(&self, to: &str, options: &NavigateOptions) {
		let (_, navigator) = self.source.get_untracked().value;
		navigator.navigate(to, options);
	}

	/// A navigator that always targets the source active at call time.
	pub fn navigator(&self) -> Navigator {
		let source = self.source.clone();
		Navigator::new(move |to, options| {
			let (_, navigator) = source.get_untracked().value;
			navigator.navigate(to, options);
		})
	}
}

impl fmt::Debug for UseLocation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("UseLocation")
			.field("path", &self.path.get_untracked())
			.finish_non_exhaustive()
	}
}

/// Subscribes to the scope's location source.
pub fn use_location(scope: &RouterScope) -> UseLocation {
	let context = scope.context().clone();
	let source = active_source(context.clone(), RouterContext::hook, |hook, router| {
		hook.use_location(router)
	});
	let path = Memo::new({
		let source = source.clone();
		move || {
			let router = context.get();
			let current = source.with(|active| active.value.0.get());
			relative_path(router.base(), &current)
		}
	});
	UseLocation { path, source }
}

/// The scope's search string, sanitized (no leading `?`).
pub fn use_search(scope: &RouterScope) -> Memo<String> {
	let source = active_source(scope.context().clone(), RouterContext::search_hook, |hook, router| {
		hook.use_search(router)
	});
	Memo::new(move || source.with(|active| sanitize_search(&active.value.get())))
}

/// Matches a compiled route, warning once when the pattern is invalid.
fn match_memo(
	context: Memo<RouterContext>,
	location: UseLocation,
	pattern: RoutePattern,
	loose: bool,
) -> Memo<MatchResult> {
	let warned = Cell::new(false);
	Memo::new(move || {
		let router = context.get();
		let path = location.get();
		match router.match_route(&pattern, &path, loose) {
			Ok(result) => result,
			Err(err) => {
				if !warned.replace(true) {
					tracing::warn!(pattern = %pattern, error = %err, "route pattern failed to compile");
				}
				MatchResult::NotMatched
			}
		}
	})
}

/// A pattern matched against the current location.
#[derive(Clone)]
pub struct UseRoute {
	result: Memo<MatchResult>,
	matches: Memo<bool>,
	params: Memo<Option<RouteParams>>,
}

impl UseRoute {
	pub fn result(&self) -> &Memo<MatchResult> {
		&self.result
	}

	pub fn matches(&self) -> &Memo<bool> {
		&self.matches
	}

	/// Parameters of the match, `None` while not matching.
	pub fn params(&self) -> &Memo<Option<RouteParams>> {
		&self.params
	}
}

impl fmt::Debug for UseRoute {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("UseRoute")
			.field("result", &self.result.get_untracked())
			.finish()
	}
}

/// Matches `pattern` strictly against the scope's relative location.
pub fn use_route(scope: &RouterScope, pattern: impl Into<RoutePattern>) -> UseRoute {
	let result = match_memo(
		scope.context().clone(),
		use_location(scope),
		pattern.into(),
		false,
	);
	let matches = Memo::new({
		let result = result.clone();
		move || result.with(MatchResult::is_match)
	});
	let params = Memo::new({
		let result = result.clone();
		move || result.with(|result| result.params().cloned())
	});
	UseRoute {
		result,
		matches,
		params,
	}
}

/// Parameters of the nearest enclosing route, empty at the root.
pub fn use_params(scope: &RouterScope) -> Memo<RouteParams> {
	scope.params().clone()
}

/// Search parameters as ordered key/value pairs.
#[derive(Clone)]
pub struct UseSearchParams {
	location: UseLocation,
	pairs: Memo<Vec<(String, String)>>,
}

impl UseSearchParams {
	pub fn pairs(&self) -> &Memo<Vec<(String, String)>> {
		&self.pairs
	}

	/// First value of `key`, tracking the search.
	pub fn get(&self, key: &str) -> Option<String> {
		self.pairs.with(|pairs| {
			pairs
				.iter()
				.find(|(name, _)| name == key)
				.map(|(_, value)| value.clone())
		})
	}

	/// Every value of `key`, in order.
	pub fn get_all(&self, key: &str) -> Vec<String> {
		self.pairs.with(|pairs| {
			pairs
				.iter()
				.filter(|(name, _)| name == key)
				.map(|(_, value)| value.clone())
				.collect()
		})
	}

	/// Navigates to the current location with `params` as the query.
	///
	/// # Errors
	///
	/// [`RouterError::SearchParams`](crate::RouterError::SearchParams) when
	/// `params` does not encode as a flat query.
	pub fn set<T>(&self, params: &T, options: &NavigateOptions) -> RouterResult<()>
	where
		T: Serialize + ?Sized,
	{
		let query = serde_urlencoded::to_string(params)?;
		let to = format!("{}?{query}", self.location.path().get_untracked());
		self.location.navigate(&to, options);
		Ok(())
	}

	/// Edits the current pairs and navigates to the result.
	///
	/// # Errors
	///
	/// Same as [`set`](Self::set).
	pub fn update<F>(&self, f: F, options: &NavigateOptions) -> RouterResult<()>
	where
		F: FnOnce(&mut Vec<(String, String)>),
	{
		let mut pairs = self.pairs.get_untracked();
		f(&mut pairs);
		self.set(&pairs, options)
	}
}

impl fmt::Debug for UseSearchParams {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("UseSearchParams")
			.field("pairs", &self.pairs.get_untracked())
			.finish_non_exhaustive()
	}
}

/// Reads and writes the scope's query string.
pub fn use_search_params(scope: &RouterScope) -> UseSearchParams {
	let search = use_search(scope);
	let pairs = Memo::new(move || {
		let search = search.get();
		serde_urlencoded::from_str::<Vec<(String, String)>>(&search).unwrap_or_else(|err| {
			tracing::debug!(%search, error = %err, "unparsable search string");
			Vec::new()
		})
	});
	UseSearchParams {
		location: use_location(scope),
		pairs,
	}
}

/// A route boundary: a match, the parameters accumulated down to it and
/// the router its children see.
#[derive(Clone)]
pub struct RouteScope {
	result: Memo<MatchResult>,
	params: Memo<RouteParams>,
	router: RouterScope,
}

impl RouteScope {
	/// Whether the route matches, tracking the match.
	pub fn matched(&self) -> bool {
		self.result.with(MatchResult::is_match)
	}

	pub fn result(&self) -> &Memo<MatchResult> {
		&self.result
	}

	/// Ancestor parameters merged with this match's; the match wins.
	pub fn params(&self) -> &Memo<RouteParams> {
		&self.params
	}

	/// The scope for this route's children.
	pub fn router(&self) -> &RouterScope {
		&self.router
	}
}

impl fmt::Debug for RouteScope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouteScope")
			.field("result", &self.result.get_untracked())
			.field("params", &self.params.get_untracked())
			.field("router", &self.router)
			.finish()
	}
}

impl RouterScope {
	/// Opens a route boundary for `pattern`.
	///
	/// With `nest` the pattern only has to match a prefix of the location,
	/// and the children's router is based at the matched prefix.
	///
	/// ```
	/// use wayfinder_router::context::{RouterOverrides, RouterScope};
	/// use wayfinder_router::location::MemoryLocation;
	///
	/// let location = MemoryLocation::fixed("/users/7/posts");
	/// let root = RouterScope::root().nest_static(RouterOverrides::new().with_memory(&location));
	///
	/// let users = root.route("/users/:id", true);
	/// assert!(users.matched());
	/// assert_eq!(users.router().context().get_untracked().base(), "/users/7");
	///
	/// let posts = users.router().route("/posts", false);
	/// assert_eq!(posts.params().get_untracked().get("id"), Some("7"));
	/// ```
	pub fn route(&self, pattern: impl Into<RoutePattern>, nest: bool) -> RouteScope {
		let result = match_memo(self.context().clone(), use_location(self), pattern.into(), nest);
		self.route_with(result, nest)
	}

	/// Opens a route boundary over a match computed elsewhere, such as by
	/// [`switch`].
	pub fn route_with(&self, result: Memo<MatchResult>, nest: bool) -> RouteScope {
		let params = Memo::new({
			let (parent, result) = (self.params().clone(), result.clone());
			move || {
				let parent = parent.get();
				result.with(|result| match result.params() {
					Some(own) => parent.merged_with(own),
					None => parent,
				})
			}
		});

		let context = if nest {
			let (parent, result) = (self.context().clone(), result.clone());
			Memo::new(move || {
				let parent = parent.get();
				match result.with(|result| result.base().map(str::to_string)) {
					Some(base) => parent.derive(&RouterOverrides::new().with_base(base)),
					None => parent,
				}
			})
		} else {
			self.context().clone()
		};

		RouteScope {
			result,
			params: params.clone(),
			router: RouterScope::from_parts(context, params),
		}
	}
}

/// One entry of a [`switch`].
#[derive(Debug, Clone)]
pub struct SwitchRoute {
	/// `None` (or an empty path) matches anything.
	pub pattern: Option<RoutePattern>,
	pub nest: bool,
}

impl SwitchRoute {
	pub fn new(pattern: impl Into<RoutePattern>) -> Self {
		Self {
			pattern: Some(pattern.into()),
			nest: false,
		}
	}

	/// An entry matched loosely, for routes with nested routers.
	pub fn nested(pattern: impl Into<RoutePattern>) -> Self {
		Self {
			pattern: Some(pattern.into()),
			nest: true,
		}
	}

	/// A catch-all entry.
	pub fn fallback() -> Self {
		Self {
			pattern: None,
			nest: false,
		}
	}

	fn is_catch_all(&self) -> bool {
		match &self.pattern {
			None => true,
			Some(RoutePattern::Path(path)) => path.is_empty(),
			Some(RoutePattern::Regex(_)) => false,
		}
	}
}

/// The entry a [`switch`] picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchMatch {
	pub index: usize,
	pub result: MatchResult,
}

/// Picks the first entry of `routes` matching the location.
///
/// `location` replaces the scope's relative location when given and
/// non-empty. Invalid patterns are skipped with a warning.
pub fn switch(
	scope: &RouterScope,
	location: Option<String>,
	routes: Vec<SwitchRoute>,
) -> Memo<Option<SwitchMatch>> {
	let context = scope.context().clone();
	let current = use_location(scope);
	let location = location.filter(|location| !location.is_empty());
	let warned = Cell::new(false);
	Memo::new(move || {
		let router = context.get();
		let path = location.clone().unwrap_or_else(|| current.get());
		for (index, route) in routes.iter().enumerate() {
			if route.is_catch_all() {
				let result = MatchResult::Matched {
					params: RouteParams::new(),
					base: None,
				};
				return Some(SwitchMatch { index, result });
			}
			let Some(pattern) = &route.pattern else {
				continue;
			};
			match router.match_route(pattern, &path, route.nest) {
				Ok(result) if result.is_match() => return Some(SwitchMatch { index, result }),
				Ok(_) => {}
				Err(err) => {
					if !warned.replace(true) {
						tracing::warn!(%pattern, error = %err, "switch entry skipped");
					}
				}
			}
		}
		None
	})
}

/// Picks a link or redirect target from `href` / `to`, with development
/// advisories when neither or both are given.
pub fn validate_target_props(
	component: &str,
	href: Option<&str>,
	to: Option<&str>,
	prefer_to: bool,
) -> String {
	let target = resolve_target_path(href, to, prefer_to);
	if target.is_empty() {
		let names = if prefer_to { "`to` or `href`" } else { "`href` or `to`" };
		dev_warn(component, &format!("neither {names} provided, navigating to an empty path"));
	}
	let both = href.is_some_and(|href| !href.is_empty()) && to.is_some_and(|to| !to.is_empty());
	if both {
		let primary = if prefer_to { "to" } else { "href" };
		dev_warn(component, &format!("both `href` and `to` provided, `{primary}` is used"));
	}
	target
}

/// Redirects to `to`.
///
/// During server rendering the target is also written into the scope's
/// [`SsrContext`](crate::context::SsrContext) so the request handler can
/// answer with a redirect.
pub fn redirect(scope: &RouterScope, to: &str, options: &NavigateOptions) {
	if to.is_empty() {
		dev_warn("Redirect", "empty target, navigating to an empty path");
	}
	let router = scope.context().get_untracked();
	if let Some(ssr) = router.ssr_context() {
		ssr.set_redirect_to(to);
	}
	let (_, navigator) = untrack(|| router.hook().use_location(&router));
	tracing::debug!(to, "redirect");
	navigator.navigate(to, options);
}

/// Whether the scope's location is `target`, ignoring query, fragment and a
/// trailing slash.
pub fn is_active(scope: &RouterScope, target: impl Into<String>) -> Memo<bool> {
	let location = use_location(scope);
	let target = normalize_path(&target.into());
	Memo::new(move || normalize_path(&location.get()) == target)
}

/// The displayable href for `to` in the scope.
pub fn use_href(scope: &RouterScope, to: impl Into<String>) -> Memo<String> {
	let context = scope.context().clone();
	let to = to.into();
	Memo::new(move || context.get().resolve_href(&to))
}
