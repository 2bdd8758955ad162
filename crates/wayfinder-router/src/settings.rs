//! Router settings
//!
//! Settings describe the root router of an application: its base path, which
//! location source it uses and the values reported while server rendering.
//! They can be loaded from a TOML or JSON file or from `WAYFINDER_*`
//! environment variables.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::context::{RouterContext, RouterOverrides};
use crate::error::SettingsError;
use crate::location::{BrowserLocation, HashLocation, MemoryLocation, MemoryLocationOptions};

/// Location source of the root router
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
	/// Browser history (`pushState` / `popstate`)
	#[default]
	Browser,
	/// URL fragment (`/#/path`)
	Hash,
	/// In-memory location
	Memory,
}

impl std::str::FromStr for LocationKind {
	type Err = SettingsError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value.trim().to_lowercase().as_str() {
			"browser" => Ok(Self::Browser),
			"hash" => Ok(Self::Hash),
			"memory" => Ok(Self::Memory),
			other => Err(SettingsError::ParseError(format!(
				"unknown location kind `{other}` (expected browser, hash or memory)"
			))),
		}
	}
}

/// Memory location settings
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySettings {
	/// Initial path
	#[serde(default = "default_memory_path")]
	pub path: String,

	/// Initial search, without the leading `?`
	#[serde(default)]
	pub search: String,

	/// Ignore navigation
	#[serde(default, rename = "static")]
	pub static_location: bool,

	/// Keep the navigation history
	#[serde(default)]
	pub record: bool,
}

fn default_memory_path() -> String {
	"/".to_string()
}

impl Default for MemorySettings {
	fn default() -> Self {
		Self {
			path: default_memory_path(),
			search: String::new(),
			static_location: false,
			record: false,
		}
	}
}

impl From<&MemorySettings> for MemoryLocationOptions {
	fn from(settings: &MemorySettings) -> Self {
		MemoryLocationOptions::new()
			.with_path(settings.path.clone())
			.with_search(settings.search.clone())
			.with_static(settings.static_location)
			.with_record(settings.record)
	}
}

/// Root router settings
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterSettings {
	/// Base path of the application, empty or `/`-prefixed without a
	/// trailing `/`
	#[serde(default)]
	pub base: String,

	/// Location source
	#[serde(default)]
	pub location: LocationKind,

	/// Memory location configuration, used when `location` is `memory`
	#[serde(default)]
	pub memory: MemorySettings,

	/// Path reported while server rendering
	#[serde(default)]
	pub ssr_path: Option<String>,

	/// Search reported while server rendering
	#[serde(default)]
	pub ssr_search: Option<String>,
}

impl RouterSettings {
	/// Create new settings with defaults
	pub fn new() -> Self {
		Self::default()
	}

	/// Validate settings
	pub fn validate(&self) -> Result<(), SettingsError> {
		if !self.base.is_empty() && !self.base.starts_with('/') {
			return Err(SettingsError::ValidationError(format!(
				"base `{}` must start with `/`",
				self.base
			)));
		}
		if self.base.len() > 1 && self.base.ends_with('/') {
			return Err(SettingsError::ValidationError(format!(
				"base `{}` must not end with `/`",
				self.base
			)));
		}
		if self.base == "/" {
			return Err(SettingsError::ValidationError(
				"use an empty base instead of `/`".to_string(),
			));
		}
		if self.location == LocationKind::Memory && !self.memory.path.starts_with('/') {
			return Err(SettingsError::ValidationError(format!(
				"memory path `{}` must start with `/`",
				self.memory.path
			)));
		}
		Ok(())
	}

	/// Load settings from environment variables
	pub fn from_env() -> Result<Self, SettingsError> {
		Self::from_env_with(|key| std::env::var(key).ok())
	}

	/// Load settings from `WAYFINDER_*` variables read through `lookup`
	///
	/// Recognized variables: `WAYFINDER_BASE`, `WAYFINDER_LOCATION`,
	/// `WAYFINDER_MEMORY_PATH`, `WAYFINDER_MEMORY_SEARCH`,
	/// `WAYFINDER_MEMORY_STATIC`, `WAYFINDER_MEMORY_RECORD`,
	/// `WAYFINDER_SSR_PATH` and `WAYFINDER_SSR_SEARCH`.
	pub fn from_env_with<F>(lookup: F) -> Result<Self, SettingsError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut settings = Self::default();
		let flag = |value: String| value.to_lowercase() == "true" || value == "1";

		if let Some(base) = lookup("WAYFINDER_BASE") {
			settings.base = base;
		}

		if let Some(location) = lookup("WAYFINDER_LOCATION") {
			settings.location = location.parse()?;
		}

		// Memory location
		if let Some(path) = lookup("WAYFINDER_MEMORY_PATH") {
			settings.memory.path = path;
		}
		if let Some(search) = lookup("WAYFINDER_MEMORY_SEARCH") {
			settings.memory.search = search;
		}
		if let Some(value) = lookup("WAYFINDER_MEMORY_STATIC") {
			settings.memory.static_location = flag(value);
		}
		if let Some(value) = lookup("WAYFINDER_MEMORY_RECORD") {
			settings.memory.record = flag(value);
		}

		// Server rendering
		settings.ssr_path = lookup("WAYFINDER_SSR_PATH");
		settings.ssr_search = lookup("WAYFINDER_SSR_SEARCH");

		Ok(settings)
	}

	/// Load settings from a configuration file
	pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
		let path = path.into();
		let contents = std::fs::read_to_string(&path).map_err(|e| {
			SettingsError::FileError(format!("Failed to read {}: {}", path.display(), e))
		})?;

		let settings: RouterSettings =
			if path.extension().and_then(|s| s.to_str()) == Some("toml") {
				toml::from_str(&contents)
					.map_err(|e| SettingsError::ParseError(format!("TOML parse error: {}", e)))?
			} else if path.extension().and_then(|s| s.to_str()) == Some("json") {
				serde_json::from_str(&contents)
					.map_err(|e| SettingsError::ParseError(format!("JSON parse error: {}", e)))?
			} else {
				return Err(SettingsError::UnsupportedFormat(
					"Supported formats: .toml, .json".to_string(),
				));
			};

		tracing::debug!(path = %path.display(), "router settings loaded");
		Ok(settings)
	}

	/// The overrides these settings apply to the default router
	pub fn overrides(&self) -> RouterOverrides {
		let mut overrides = match self.location {
			LocationKind::Browser => RouterOverrides::new().with_location(BrowserLocation),
			LocationKind::Hash => RouterOverrides::new().with_location(HashLocation::new()),
			LocationKind::Memory => {
				RouterOverrides::new().with_memory(&MemoryLocation::new((&self.memory).into()))
			}
		};
		if !self.base.is_empty() {
			overrides = overrides.with_base(self.base.clone());
		}
		overrides.ssr_path = self.ssr_path.clone();
		overrides.ssr_search = self.ssr_search.clone();
		overrides
	}

	/// Validate and build the root router context
	pub fn into_context(self) -> Result<RouterContext, SettingsError> {
		self.validate()?;
		Ok(RouterContext::default_router().derive(&self.overrides()))
	}
}
