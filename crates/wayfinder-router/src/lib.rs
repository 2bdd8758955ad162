//! Location sources, router contexts and reactive route hooks.
//!
//! The router is built in layers:
//!
//! - [`window`] models the address bar. A [`HeadlessWindow`] stands in for
//!   the browser outside of `wasm32`; without any window every location
//!   operation quietly does nothing.
//! - [`location`] turns a window (or plain memory) into a location source:
//!   browser history, the URL fragment or an in-memory location.
//! - [`context`] composes router contexts: base paths, parsers, sources and
//!   server-rendering overrides, nested without mutation.
//! - [`hooks`] derives memos from a [`RouterScope`]: the relative location,
//!   search parameters, matches, route boundaries and switches.
//! - [`ssr`] runs server render passes and collects redirects.
//!
//! ```
//! use wayfinder_router::context::{RouterOverrides, RouterScope};
//! use wayfinder_router::hooks::use_route;
//! use wayfinder_router::location::{MemoryLocation, MemoryLocationOptions, NavigateOptions};
//!
//! let location = MemoryLocation::new(MemoryLocationOptions::new().with_path("/users/1"));
//! let scope = RouterScope::root().nest_static(RouterOverrides::new().with_memory(&location));
//! let user = use_route(&scope, "/users/:id");
//! assert_eq!(user.params().get_untracked().unwrap().get("id"), Some("1"));
//!
//! location.navigate("/users/2", &NavigateOptions::new());
//! assert_eq!(user.params().get_untracked().unwrap().get("id"), Some("2"));
//! ```

pub mod context;
pub mod error;
pub mod history_patch;
pub mod hooks;
pub mod location;
pub mod logging;
#[cfg(feature = "settings")]
pub mod settings;
pub mod ssr;
pub mod window;

pub use context::{RouterContext, RouterOverrides, RouterScope, SsrContext};
pub use error::{RouterError, RouterResult, SettingsError};
pub use history_patch::{PATCH_TOKEN, is_patched, patch_history};
pub use hooks::{
	RouteScope, SwitchMatch, SwitchRoute, UseLocation, UseRoute, UseSearchParams, is_active,
	redirect, switch, use_href, use_location, use_params, use_route, use_search,
	use_search_params, validate_target_props,
};
pub use location::{
	BrowserLocation, DefaultLocation, HashLocation, HrefsFormatter, LocationCell, LocationHook,
	MemoryLocation, MemoryLocationOptions, NavigateOptions, Navigator, SearchHook, Subscription,
};
pub use logging::{dev_warn, is_dev};
#[cfg(feature = "settings")]
pub use settings::{LocationKind, MemorySettings, RouterSettings};
pub use ssr::{SsrRender, create_ssr_router};
pub use window::{
	HeadlessWindow, HistoryMethod, LocationEvent, Window, has_window, install_window,
	uninstall_window, with_window,
};
