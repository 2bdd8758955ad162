//! Server rendering.
//!
//! A server render pass runs against a static memory location seeded with
//! the request's path and search, so nothing rendered can move it. Routes
//! that want the client elsewhere write the target into the pass's
//! [`SsrContext`], which the request handler reads afterwards.

use std::rc::Rc;

use wayfinder_urls::PatternParser;

use crate::context::{RouterContext, RouterOverrides, RouterScope, SsrContext};
use crate::location::{HrefsFormatter, MemoryLocation, MemoryLocationOptions};

/// A router context for one server render of `path` + `search`.
///
/// The location is static, the base empty and hrefs unchanged. `search`
/// is given without the leading `?`.
///
/// ```
/// use wayfinder_router::ssr::create_ssr_router;
///
/// let router = create_ssr_router("/about", "page=2");
/// assert_eq!(router.ssr_path(), Some("/about"));
/// assert_eq!(router.ssr_search(), Some("page=2"));
/// ```
pub fn create_ssr_router(path: &str, search: &str) -> RouterContext {
	let location = MemoryLocation::new(
		MemoryLocationOptions::new()
			.with_path(path)
			.with_search(search)
			.with_static(true),
	);
	RouterContext::default_router().derive(
		&RouterOverrides::new()
			.with_memory(&location)
			.with_hrefs(HrefsFormatter::identity())
			.with_ssr_path(path)
			.with_ssr_search(search),
	)
}

/// Runs render passes and collects their redirects.
#[derive(Clone, Default)]
pub struct SsrRender {
	base: Option<String>,
	parser: Option<Rc<dyn PatternParser>>,
}

impl SsrRender {
	pub fn new() -> Self {
		Self::default()
	}

	/// Renders under `base` instead of the root.
	pub fn with_base(mut self, base: impl Into<String>) -> Self {
		self.base = Some(base.into());
		self
	}

	pub fn with_parser(mut self, parser: Rc<dyn PatternParser>) -> Self {
		self.parser = Some(parser);
		self
	}

	/// Runs `f` in a root scope for `path` + `search`.
	///
	/// Returns what `f` produced and the redirect target a route requested,
	/// if any.
	pub fn render<R>(&self, path: &str, search: &str, f: impl FnOnce(&RouterScope) -> R) -> (R, Option<String>) {
		let slot = SsrContext::new();
		let overrides = RouterOverrides {
			base: self.base.clone(),
			parser: self.parser.clone(),
			ssr_context: Some(slot.clone()),
			..RouterOverrides::default()
		};
		let scope = RouterScope::from_context(create_ssr_router(path, search).derive(&overrides));

		let output = f(&scope);
		let redirect_to = slot.take_redirect();
		match &redirect_to {
			Some(to) => tracing::debug!(path, to = %to, "render requested a redirect"),
			None => tracing::trace!(path, "render finished"),
		}
		(output, redirect_to)
	}
}

impl std::fmt::Debug for SsrRender {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SsrRender")
			.field("base", &self.base)
			.field("custom_parser", &self.parser.is_some())
			.finish()
	}
}
