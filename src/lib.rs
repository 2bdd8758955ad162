//! # Wayfinder
//!
//! An isomorphic routing engine: route patterns, location sources and
//! nested router contexts, propagated through fine-grained reactive cells.
//!
//! The same routing code runs in the browser, where locations follow the
//! History API or the URL fragment, and on the server, where a render pass
//! reads a fixed location and reports redirects back to the request
//! handler.
//!
//! ## Crates
//!
//! - [`reactive`] - signals, memos and effects
//! - [`urls`] - pattern compilation, matching and path utilities
//! - [`router`] - location sources, router contexts, route hooks and SSR
//!
//! ## Feature Flags
//!
//! - `settings` (default) - router settings from TOML / JSON files and
//!   `WAYFINDER_*` environment variables
//!
//! ## Quick Example
//!
//! ```
//! use wayfinder::prelude::*;
//!
//! let location = MemoryLocation::new(MemoryLocationOptions::new().with_path("/app/users/7"));
//! let app = RouterScope::root().nest_static(
//! 	RouterOverrides::new().with_memory(&location).with_base("/app"),
//! );
//!
//! let user = use_route(&app, "/users/:id");
//! assert!(user.matches().get_untracked());
//! assert_eq!(use_location(&app).get(), "/users/7");
//! ```

pub use wayfinder_reactive as reactive;
pub use wayfinder_router as router;
pub use wayfinder_urls as urls;

/// The types and hooks most applications need.
pub mod prelude {
	// Reactivity
	pub use wayfinder_reactive::{Effect, Memo, Signal, batch, untrack};

	// Patterns and matching
	pub use wayfinder_urls::{
		MatchResult, PatternError, PatternParser, RouteParams, RoutePattern, absolute_path,
		relative_path,
	};

	// Routing
	pub use wayfinder_router::{
		BrowserLocation, HashLocation, MemoryLocation, MemoryLocationOptions, NavigateOptions,
		RouteScope, RouterContext, RouterError, RouterOverrides, RouterResult, RouterScope,
		SsrRender, SwitchRoute, is_active, redirect, switch, use_href, use_location, use_params,
		use_route, use_search, use_search_params,
	};

	#[cfg(feature = "settings")]
	pub use wayfinder_router::RouterSettings;
}
