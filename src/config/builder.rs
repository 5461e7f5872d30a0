// self
use crate::{_prelude::*, config::ClientConfig, error::ConfigError};

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Base URL for relative request paths.
	pub base_url: Url,
	/// Refresh endpoint path.
	pub refresh_path: String,
	/// Login navigation target.
	pub login_path: String,
	/// Debug history capacity.
	pub history_capacity: usize,
	/// Optional refresh timeout.
	pub refresh_timeout: Option<Duration>,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with the provided base URL and defaults.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			refresh_path: ClientConfig::DEFAULT_REFRESH_PATH.into(),
			login_path: ClientConfig::DEFAULT_LOGIN_PATH.into(),
			history_capacity: ClientConfig::DEFAULT_HISTORY_CAPACITY,
			refresh_timeout: None,
		}
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the login navigation target.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.login_path = path.into();

		self
	}

	/// Overrides how many entries each debug history list keeps.
	pub fn history_capacity(mut self, capacity: usize) -> Self {
		self.history_capacity = capacity;

		self
	}

	/// Bounds every refresh call; an expired call ends the session.
	pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
		self.refresh_timeout = Some(timeout);

		self
	}

	/// Validates the inputs and produces a [`ClientConfig`].
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		if !matches!(self.base_url.scheme(), "http" | "https") {
			return Err(ConfigError::UnsupportedScheme { url: self.base_url.to_string() });
		}
		if self.refresh_path.trim().is_empty() {
			return Err(ConfigError::EmptyRefreshPath);
		}
		if self.history_capacity == 0 {
			return Err(ConfigError::ZeroHistoryCapacity);
		}
		if self.refresh_timeout.is_some_and(|timeout| !timeout.is_positive()) {
			return Err(ConfigError::NonPositiveRefreshTimeout);
		}

		let config = ClientConfig {
			base_url: self.base_url,
			refresh_path: self.refresh_path,
			login_path: self.login_path,
			history_capacity: self.history_capacity,
			refresh_timeout: self.refresh_timeout,
		};

		config.refresh_url()?;

		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("URL fixture should parse.")
	}

	#[test]
	fn defaults_match_the_console_backend() {
		let config = ClientConfig::builder(url("http://localhost:8080/api"))
			.build()
			.expect("Default config should build.");

		assert_eq!(config.refresh_path, "auth/refresh");
		assert_eq!(config.login_path, "/login");
		assert_eq!(config.history_capacity, 20);
		assert!(config.refresh_timeout.is_none());
	}

	#[test]
	fn builder_rejects_invalid_inputs() {
		let err = ClientConfig::builder(url("ftp://example.com"))
			.build()
			.expect_err("Non-HTTP base should be rejected.");

		assert!(matches!(err, ConfigError::UnsupportedScheme { .. }));

		let err = ClientConfig::builder(url("https://example.com"))
			.history_capacity(0)
			.build()
			.expect_err("Zero capacity should be rejected.");

		assert!(matches!(err, ConfigError::ZeroHistoryCapacity));

		let err = ClientConfig::builder(url("https://example.com"))
			.refresh_path("  ")
			.build()
			.expect_err("Blank refresh path should be rejected.");

		assert!(matches!(err, ConfigError::EmptyRefreshPath));

		let err = ClientConfig::builder(url("https://example.com"))
			.refresh_timeout(Duration::ZERO)
			.build()
			.expect_err("Zero timeout should be rejected.");

		assert!(matches!(err, ConfigError::NonPositiveRefreshTimeout));
	}

	#[test]
	fn config_round_trips_through_json() {
		let config = ClientConfig::builder(url("https://example.com/api"))
			.refresh_timeout(Duration::seconds(10))
			.build()
			.expect("Config should build.");
		let payload = serde_json::to_string(&config).expect("Config should serialize.");
		let decoded: ClientConfig =
			serde_json::from_str(&payload).expect("Config should deserialize.");

		assert_eq!(decoded, config);
	}
}
