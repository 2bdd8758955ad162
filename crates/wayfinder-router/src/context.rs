//! Router contexts and their composition.
//!
//! A [`RouterContext`] is an immutable snapshot of the routing options in
//! effect for one subtree: base path, pattern parser, location source,
//! link formatter and server-rendering overrides. Nested routers never
//! mutate their parent; [`RouterContext::derive`] produces a new snapshot
//! from the parent and a set of [`RouterOverrides`].
//!
//! [`RouterScope`] wraps the snapshot in a memo so that a child recomputes
//! whenever its parent or its own overrides change.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use wayfinder_reactive::{Memo, Signal};
use wayfinder_urls::{
	DefaultParser, MatchResult, PatternParser, PatternResult, RouteParams, RoutePattern,
	absolute_path, match_route, split_path_and_search,
};

use crate::location::{DefaultLocation, HrefsFormatter, LocationHook, MemoryLocation, SearchHook};

static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

fn next_version() -> u64 {
	NEXT_VERSION.fetch_add(1, Ordering::Relaxed)
}

/// Redirect slot shared between a server render pass and the routes it
/// renders.
///
/// Clones share the slot. Two contexts are equal when they are the same
/// slot.
#[derive(Clone, Default)]
pub struct SsrContext {
	redirect_to: Rc<RefCell<Option<String>>>,
}

impl SsrContext {
	pub fn new() -> Self {
		Self::default()
	}

	/// The redirect target requested during rendering, if any.
	pub fn redirect_to(&self) -> Option<String> {
		self.redirect_to.borrow().clone()
	}

	pub fn set_redirect_to(&self, to: impl Into<String>) {
		*self.redirect_to.borrow_mut() = Some(to.into());
	}

	/// Takes the redirect target, leaving the slot empty.
	pub fn take_redirect(&self) -> Option<String> {
		self.redirect_to.borrow_mut().take()
	}
}

impl PartialEq for SsrContext {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.redirect_to, &other.redirect_to)
	}
}

impl fmt::Debug for SsrContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SsrContext")
			.field("redirect_to", &*self.redirect_to.borrow())
			.finish()
	}
}

/// Local settings a nested router applies on top of its parent.
///
/// Every field is optional; an absent field is inherited.
#[derive(Clone, Default)]
pub struct RouterOverrides {
	/// Appended to the parent's base.
	pub base: Option<String>,
	pub parser: Option<Rc<dyn PatternParser>>,
	pub hook: Option<Rc<dyn LocationHook>>,
	pub search_hook: Option<Rc<dyn SearchHook>>,
	pub hrefs: Option<HrefsFormatter>,
	/// Path reported while server rendering. A `?` splits off the search.
	pub ssr_path: Option<String>,
	pub ssr_search: Option<String>,
	pub ssr_context: Option<SsrContext>,
}

impl RouterOverrides {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_base(mut self, base: impl Into<String>) -> Self {
		self.base = Some(base.into());
		self
	}

	pub fn with_parser(mut self, parser: Rc<dyn PatternParser>) -> Self {
		self.parser = Some(parser);
		self
	}

	pub fn with_hook(mut self, hook: Rc<dyn LocationHook>) -> Self {
		self.hook = Some(hook);
		self
	}

	pub fn with_search_hook(mut self, search_hook: Rc<dyn SearchHook>) -> Self {
		self.search_hook = Some(search_hook);
		self
	}

	/// Uses `location` for both the path and the search.
	pub fn with_location<L>(self, location: L) -> Self
	where
		L: LocationHook + SearchHook + 'static,
	{
		let location = Rc::new(location);
		self.with_hook(location.clone()).with_search_hook(location)
	}

	/// Uses a memory location for both the path and the search.
	pub fn with_memory(self, location: &MemoryLocation) -> Self {
		self.with_hook(location.hook())
			.with_search_hook(location.search_hook())
	}

	pub fn with_hrefs(mut self, hrefs: HrefsFormatter) -> Self {
		self.hrefs = Some(hrefs);
		self
	}

	pub fn with_ssr_path(mut self, ssr_path: impl Into<String>) -> Self {
		self.ssr_path = Some(ssr_path.into());
		self
	}

	pub fn with_ssr_search(mut self, ssr_search: impl Into<String>) -> Self {
		self.ssr_search = Some(ssr_search.into());
		self
	}

	pub fn with_ssr_context(mut self, ssr_context: SsrContext) -> Self {
		self.ssr_context = Some(ssr_context);
		self
	}
}

impl fmt::Debug for RouterOverrides {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouterOverrides")
			.field("base", &self.base)
			.field("parser", &self.parser.is_some())
			.field("hook", &self.hook.is_some())
			.field("search_hook", &self.search_hook.is_some())
			.field("hrefs", &self.hrefs.is_some())
			.field("ssr_path", &self.ssr_path)
			.field("ssr_search", &self.ssr_search)
			.field("ssr_context", &self.ssr_context)
			.finish()
	}
}

/// Routing options in effect for one subtree.
///
/// Snapshots compare by version: every derivation gets a fresh one, so a
/// memo over a context always notifies when its inputs were recomputed.
#[derive(Clone)]
pub struct RouterContext {
	base: String,
	own_base: String,
	parser: Rc<dyn PatternParser>,
	hook: Rc<dyn LocationHook>,
	search_hook: Rc<dyn SearchHook>,
	hrefs: HrefsFormatter,
	ssr_path: Option<String>,
	ssr_search: Option<String>,
	ssr_context: Option<SsrContext>,
	version: u64,
}

impl RouterContext {
	/// The root context: no base, the default parser, identity hrefs and
	/// [`DefaultLocation`] for path and search.
	pub fn default_router() -> Self {
		let location = Rc::new(DefaultLocation);
		Self {
			base: String::new(),
			own_base: String::new(),
			parser: Rc::new(DefaultParser::new()),
			hook: location.clone(),
			search_hook: location,
			hrefs: HrefsFormatter::identity(),
			ssr_path: None,
			ssr_search: None,
			ssr_context: None,
			version: next_version(),
		}
	}

	/// Derives a child context.
	///
	/// - `base` is the parent's base followed by the override; `own_base`
	///   keeps only the override. Without an override both are inherited.
	/// - An `ssr_path` containing `?` is split, and the part after it is the
	///   search unless `ssr_search` is given too.
	/// - `hrefs` comes from the override, then from an overriding hook that
	///   formats its own links, then from the parent.
	/// - Everything else is the override if present, else the parent's.
	pub fn derive(&self, overrides: &RouterOverrides) -> Self {
		let (base, own_base) = match &overrides.base {
			Some(own) => (format!("{}{own}", self.base), own.clone()),
			None => (self.base.clone(), self.own_base.clone()),
		};

		let (ssr_path, parsed_search) = match overrides.ssr_path.as_deref() {
			Some(path) if !path.is_empty() => {
				let (path, search) = split_path_and_search(path);
				(Some(path.to_string()), search.map(str::to_string))
			}
			_ => (None, None),
		};
		let ssr_search = overrides.ssr_search.clone().or(parsed_search);

		let hrefs = overrides
			.hrefs
			.clone()
			.or_else(|| overrides.hook.as_ref().and_then(|hook| hook.hrefs()))
			.unwrap_or_else(|| self.hrefs.clone());

		let derived = Self {
			base,
			own_base,
			parser: overrides.parser.clone().unwrap_or_else(|| self.parser.clone()),
			hook: overrides.hook.clone().unwrap_or_else(|| self.hook.clone()),
			search_hook: overrides
				.search_hook
				.clone()
				.unwrap_or_else(|| self.search_hook.clone()),
			hrefs,
			ssr_path: ssr_path.or_else(|| self.ssr_path.clone()),
			ssr_search: ssr_search.or_else(|| self.ssr_search.clone()),
			ssr_context: overrides
				.ssr_context
				.clone()
				.or_else(|| self.ssr_context.clone()),
			version: next_version(),
		};
		tracing::trace!(base = %derived.base, version = derived.version, "router context derived");
		derived
	}

	/// Absolute prefix accumulated from the root.
	pub fn base(&self) -> &str {
		&self.base
	}

	/// This context's own contribution to [`base`](Self::base).
	pub fn own_base(&self) -> &str {
		&self.own_base
	}

	pub fn parser(&self) -> &Rc<dyn PatternParser> {
		&self.parser
	}

	pub fn hook(&self) -> &Rc<dyn LocationHook> {
		&self.hook
	}

	pub fn search_hook(&self) -> &Rc<dyn SearchHook> {
		&self.search_hook
	}

	pub fn hrefs(&self) -> &HrefsFormatter {
		&self.hrefs
	}

	pub fn ssr_path(&self) -> Option<&str> {
		self.ssr_path.as_deref()
	}

	pub fn ssr_search(&self) -> Option<&str> {
		self.ssr_search.as_deref()
	}

	pub fn ssr_context(&self) -> Option<&SsrContext> {
		self.ssr_context.as_ref()
	}

	pub fn version(&self) -> u64 {
		self.version
	}

	/// The displayable href for `to`: made absolute against the base, then
	/// passed through `hrefs`. A leading `~` escapes the base.
	pub fn resolve_href(&self, to: &str) -> String {
		self.hrefs.format(&absolute_path(to, &self.base))
	}

	/// Matches `path` with this context's parser.
	///
	/// # Errors
	///
	/// The parser's error when `pattern` does not compile.
	pub fn match_route(&self, pattern: &RoutePattern, path: &str, loose: bool) -> PatternResult<MatchResult> {
		match_route(&*self.parser, pattern, path, loose)
	}
}

impl Default for RouterContext {
	fn default() -> Self {
		Self::default_router()
	}
}

impl PartialEq for RouterContext {
	fn eq(&self, other: &Self) -> bool {
		self.version == other.version
	}
}

impl fmt::Debug for RouterContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouterContext")
			.field("base", &self.base)
			.field("own_base", &self.own_base)
			.field("ssr_path", &self.ssr_path)
			.field("ssr_search", &self.ssr_search)
			.field("ssr_context", &self.ssr_context)
			.field("version", &self.version)
			.finish_non_exhaustive()
	}
}

/// A reactive router boundary.
///
/// Holds the context in effect and the route parameters accumulated by
/// enclosing routes. Children created with [`nest`](Self::nest) recompute
/// when the parent context or their overrides change.
///
/// ```
/// use wayfinder_router::context::{RouterOverrides, RouterScope};
///
/// let root = RouterScope::root();
/// let app = root.nest_static(RouterOverrides::new().with_base("/app"));
/// let admin = app.nest_static(RouterOverrides::new().with_base("/admin"));
/// assert_eq!(admin.context().get_untracked().base(), "/app/admin");
/// ```
#[derive(Clone)]
pub struct RouterScope {
	context: Memo<RouterContext>,
	params: Memo<RouteParams>,
}

impl RouterScope {
	/// A root scope over [`RouterContext::default_router`].
	pub fn root() -> Self {
		Self::from_context(RouterContext::default_router())
	}

	/// A root scope over a fixed context.
	pub fn from_context(context: RouterContext) -> Self {
		Self::from_parts(Memo::new(move || context.clone()), Memo::new(RouteParams::new))
	}

	/// A root scope following `context`.
	pub fn from_signal(context: Signal<RouterContext>) -> Self {
		Self::from_parts(Memo::new(move || context.get()), Memo::new(RouteParams::new))
	}

	pub(crate) fn from_parts(context: Memo<RouterContext>, params: Memo<RouteParams>) -> Self {
		Self { context, params }
	}

	/// A child scope whose overrides may change over time.
	pub fn nest(&self, overrides: Signal<RouterOverrides>) -> Self {
		let parent = self.context.clone();
		let context = Memo::new(move || {
			let parent = parent.get();
			overrides.with(|overrides| parent.derive(overrides))
		});
		Self::from_parts(context, self.params.clone())
	}

	/// A child scope with fixed overrides.
	pub fn nest_static(&self, overrides: RouterOverrides) -> Self {
		let parent = self.context.clone();
		let context = Memo::new(move || parent.get().derive(&overrides));
		Self::from_parts(context, self.params.clone())
	}

	pub fn context(&self) -> &Memo<RouterContext> {
		&self.context
	}

	/// Parameters of the enclosing routes, empty at the root.
	pub fn params(&self) -> &Memo<RouteParams> {
		&self.params
	}
}

impl fmt::Debug for RouterScope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouterScope")
			.field("context", &self.context.get_untracked())
			.field("params", &self.params.get_untracked())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::location::{HashLocation, MemoryLocationOptions};
	use rstest::rstest;
	use serial_test::serial;

	#[rstest]
	fn test_nested_bases_concatenate() {
		// Arrange
		let root = RouterContext::default_router();

		// Act
		let app = root.derive(&RouterOverrides::new().with_base("/app"));
		let admin = app.derive(&RouterOverrides::new().with_base("/admin"));
		let inherited = admin.derive(&RouterOverrides::new());

		// Assert
		assert_eq!(admin.base(), "/app/admin");
		assert_eq!(admin.own_base(), "/admin");
		assert_eq!(inherited.base(), "/app/admin");
		assert_eq!(inherited.own_base(), "/admin");
		assert_eq!(root.base(), "");
	}

	#[rstest]
	#[case(Some("/about?tab=2"), None, Some("/about"), Some("tab=2"))]
	#[case(Some("/about?tab=2"), Some("x=1"), Some("/about"), Some("x=1"))]
	#[case(Some("/about"), None, Some("/about"), None)]
	#[case(Some(""), None, None, None)]
	#[case(None, Some("x=1"), None, Some("x=1"))]
	fn test_ssr_path_split(
		#[case] ssr_path: Option<&str>,
		#[case] ssr_search: Option<&str>,
		#[case] expected_path: Option<&str>,
		#[case] expected_search: Option<&str>,
	) {
		let overrides = RouterOverrides {
			ssr_path: ssr_path.map(str::to_string),
			ssr_search: ssr_search.map(str::to_string),
			..RouterOverrides::default()
		};

		let derived = RouterContext::default_router().derive(&overrides);

		assert_eq!(derived.ssr_path(), expected_path);
		assert_eq!(derived.ssr_search(), expected_search);
	}

	#[rstest]
	fn test_ssr_values_inherit() {
		let parent = RouterContext::default_router()
			.derive(&RouterOverrides::new().with_ssr_path("/page?q=1"));
		let child = parent.derive(&RouterOverrides::new().with_base("/nested"));
		assert_eq!(child.ssr_path(), Some("/page"));
		assert_eq!(child.ssr_search(), Some("q=1"));
	}

	#[rstest]
	fn test_hook_hrefs_take_precedence_over_parent() {
		// Arrange
		let parent = RouterContext::default_router()
			.derive(&RouterOverrides::new().with_hrefs(HrefsFormatter::new(|h| format!("!{h}"))));

		// Act
		let hashed = parent.derive(&RouterOverrides::new().with_location(HashLocation::new()));
		let explicit = parent.derive(
			&RouterOverrides::new()
				.with_location(HashLocation::new())
				.with_hrefs(HrefsFormatter::new(|h| format!("@{h}"))),
		);
		let memory = parent.derive(
			&RouterOverrides::new().with_memory(&MemoryLocation::new(MemoryLocationOptions::new())),
		);

		// Assert
		assert_eq!(hashed.hrefs().format("/a"), "#/a");
		assert_eq!(explicit.hrefs().format("/a"), "@/a");
		assert_eq!(memory.hrefs().format("/a"), "!/a");
	}

	#[rstest]
	fn test_ssr_context_threads_through() {
		let slot = SsrContext::new();
		let root = RouterContext::default_router()
			.derive(&RouterOverrides::new().with_ssr_context(slot.clone()));
		let leaf = root
			.derive(&RouterOverrides::new().with_base("/a"))
			.derive(&RouterOverrides::new().with_base("/b"));

		leaf.ssr_context().unwrap().set_redirect_to("/login");

		assert_eq!(slot.redirect_to(), Some("/login".to_string()));
		assert_eq!(leaf.ssr_context(), Some(&slot));
		assert_eq!(slot.take_redirect(), Some("/login".to_string()));
		assert_eq!(slot.redirect_to(), None);
	}

	#[rstest]
	fn test_derive_is_pure_and_versions_change() {
		let parent = RouterContext::default_router();
		let before = parent.version();

		let child = parent.derive(&RouterOverrides::new().with_base("/x"));

		assert_eq!(parent.version(), before);
		assert_eq!(parent.base(), "");
		assert_ne!(parent, child);
		assert_eq!(parent, parent.clone());
	}

	#[rstest]
	#[case("/users", "/app/users")]
	#[case("~/outside", "/outside")]
	fn test_resolve_href(#[case] to: &str, #[case] expected: &str) {
		let router = RouterContext::default_router().derive(&RouterOverrides::new().with_base("/app"));
		assert_eq!(router.resolve_href(to), expected);
	}

	#[rstest]
	fn test_resolve_href_in_hash_mode() {
		let router = RouterContext::default_router().derive(
			&RouterOverrides::new()
				.with_base("/app")
				.with_location(HashLocation::new()),
		);
		assert_eq!(router.resolve_href("/users"), "#/app/users");
	}

	#[rstest]
	fn test_custom_parser_is_used() {
		let parser: Rc<dyn PatternParser> = Rc::new(|pattern: &str, loose: bool| {
			wayfinder_urls::parse_pattern(&pattern.to_lowercase(), loose)
		});
		let router = RouterContext::default_router().derive(&RouterOverrides::new().with_parser(parser));

		let result = router
			.match_route(&RoutePattern::from("/USERS/:ID"), "/users/7", false)
			.unwrap();

		assert_eq!(result.params().unwrap().get("id"), Some("7"));
	}

	#[rstest]
	#[serial]
	fn test_scope_recomputes_when_overrides_change() {
		// Arrange
		let root = RouterScope::root();
		let overrides = Signal::new(RouterOverrides::new().with_base("/v1"));
		let child = root.nest(overrides.clone());
		let grandchild = child.nest_static(RouterOverrides::new().with_base("/users"));
		assert_eq!(grandchild.context().get_untracked().base(), "/v1/users");

		// Act
		overrides.set(RouterOverrides::new().with_base("/v2"));

		// Assert
		assert_eq!(child.context().get_untracked().base(), "/v2");
		assert_eq!(grandchild.context().get_untracked().base(), "/v2/users");
		assert!(grandchild.params().get_untracked().is_empty());
	}

	#[rstest]
	#[serial]
	fn test_scope_from_signal_follows_root() {
		let root = Signal::new(RouterContext::default_router());
		let scope = RouterScope::from_signal(root.clone());
		let nested = scope.nest_static(RouterOverrides::new().with_base("/docs"));

		root.set(RouterContext::default_router().derive(&RouterOverrides::new().with_base("/site")));

		assert_eq!(nested.context().get_untracked().base(), "/site/docs");
	}
}
