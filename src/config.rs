//! Client configuration: base URL, auth routes, debug history size, and refresh timeout.
//!
//! Values are validated once by [`ClientConfigBuilder::build`]; the pipeline treats a built
//! [`ClientConfig`] as immutable for its whole lifetime.

/// Builder API for assembling client configs.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// Validated client configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Base every relative request path is resolved against.
	pub base_url: Url,
	/// Path of the credential refresh endpoint, relative to the base.
	pub refresh_path: String,
	/// Navigation target used when the session ends.
	pub login_path: String,
	/// Number of entries kept per debug history list.
	pub history_capacity: usize,
	/// Upper bound on a single refresh call; `None` waits for the transport indefinitely.
	pub refresh_timeout: Option<Duration>,
}
impl ClientConfig {
	/// Default refresh endpoint path.
	pub const DEFAULT_REFRESH_PATH: &'static str = "auth/refresh";
	/// Default login navigation target.
	pub const DEFAULT_LOGIN_PATH: &'static str = "/login";
	/// Default debug history capacity.
	pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Resolves a request target: absolute URLs pass through, relative paths are joined to the
	/// base with a single `/`.
	pub fn resolve(&self, target: &str) -> Result<Url, ConfigError> {
		if let Ok(url) = Url::parse(target)
			&& !url.cannot_be_a_base()
		{
			return Ok(url);
		}

		let base = self.base_url.as_str().trim_end_matches('/');
		let path = target.trim_start_matches('/');
		let joined = if path.is_empty() { base.to_owned() } else { format!("{base}/{path}") };

		Url::parse(&joined)
			.map_err(|source| ConfigError::InvalidUrl { target: target.to_owned(), source })
	}

	/// Fully-qualified refresh endpoint.
	pub fn refresh_url(&self) -> Result<Url, ConfigError> {
		self.resolve(&self.refresh_path)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn config(base: &str) -> ClientConfig {
		ClientConfig::builder(Url::parse(base).expect("Base fixture should parse."))
			.build()
			.expect("Config fixture should build.")
	}

	#[test]
	fn relative_paths_join_with_a_single_slash() {
		let with_slash = config("https://api.example.com/v1/");
		let without_slash = config("https://api.example.com/v1");

		for cfg in [&with_slash, &without_slash] {
			assert_eq!(
				cfg.resolve("/guilds/42").expect("Relative path should resolve.").as_str(),
				"https://api.example.com/v1/guilds/42"
			);
			assert_eq!(
				cfg.resolve("ranks?page=2").expect("Relative path should resolve.").as_str(),
				"https://api.example.com/v1/ranks?page=2"
			);
		}

		assert_eq!(
			with_slash.refresh_url().expect("Refresh URL should resolve.").as_str(),
			"https://api.example.com/v1/auth/refresh"
		);
	}

	#[test]
	fn absolute_urls_pass_through() {
		let cfg = config("https://api.example.com/v1");

		assert_eq!(
			cfg.resolve("https://cdn.example.com/avatar.png")
				.expect("Absolute URL should resolve.")
				.as_str(),
			"https://cdn.example.com/avatar.png"
		);
	}

	#[test]
	fn config_serializes_the_base_url_as_a_string() {
		let cfg = config("https://api.example.com/v1");
		let encoded = serde_json::to_value(&cfg).expect("Config should serialize.");

		assert_eq!(encoded["base_url"], "https://api.example.com/v1");
		assert_eq!(
			serde_json::from_value::<ClientConfig>(encoded).expect("Config should deserialize."),
			cfg
		);
	}
}
