//! Client-level error types shared by the pipeline, stores, and facade.

// self
use crate::{_prelude::*, http::ApiResponse, session::SessionEndReason};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure; no response was received.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Backend answered with a non-2xx status.
	#[error("Request failed with status code {}.", .response.status)]
	Status {
		/// Response received from the backend.
		response: Box<ApiResponse>,
	},
	/// The session can no longer be used; callers have been sent to the login entry point.
	#[error("Session ended: {reason}.")]
	SessionEnded {
		/// Shared cause observed by every request affected by the same refresh outcome.
		reason: SessionEndReason,
		/// The caller's own authorization failure, when one was received.
		response: Option<Box<ApiResponse>>,
	},
	/// The credential store cannot be rewritten while a refresh is in flight.
	#[error("A credential refresh is in progress.")]
	RefreshInProgress,
	/// Another login or logout is still writing the credential store.
	#[error("Another session write is in progress.")]
	SessionWriteInProgress,
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be encoded: {source}.")]
	Encode {
		/// Underlying serialization failure.
		#[source]
		source: serde_json::Error,
	},
	/// Response body did not match the requested type.
	#[error("Response body could not be decoded: {source}.")]
	Decode {
		/// Structured decoding failure including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl Error {
	/// Wraps a non-2xx response.
	pub fn status(response: ApiResponse) -> Self {
		Self::Status { response: Box::new(response) }
	}

	/// Builds a session-ended error that keeps the caller's own failure response.
	pub fn session_ended(reason: SessionEndReason, response: Option<ApiResponse>) -> Self {
		Self::SessionEnded { reason, response: response.map(Box::new) }
	}

	/// Returns the failure response carried by this error, if any.
	pub fn response(&self) -> Option<&ApiResponse> {
		match self {
			Self::Status { response } => Some(response),
			Self::SessionEnded { response, .. } => response.as_deref(),
			_ => None,
		}
	}

	/// Returns the HTTP status carried by this error, if any.
	pub fn status_code(&self) -> Option<u16> {
		self.response().map(|response| response.status)
	}

	/// Returns `true` when the backend rejected the presented credential.
	pub fn is_unauthorized(&self) -> bool {
		matches!(self, Self::Status { response } if response.is_unauthorized())
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// No transport was configured and the default one is disabled.
	#[error("No HTTP transport is configured.")]
	MissingTransport,
	/// Base URL must be an absolute `http` or `https` URL.
	#[error("Base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// URL that failed validation.
		url: String,
	},
	/// A request target could not be resolved into a URL.
	#[error("Request target `{target}` is not a valid URL.")]
	InvalidUrl {
		/// Target that failed to resolve.
		target: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Refresh path must not be empty.
	#[error("Refresh path must not be empty.")]
	EmptyRefreshPath,
	/// Debug history must keep at least one entry.
	#[error("History capacity must be at least 1.")]
	ZeroHistoryCapacity,
	/// Refresh timeout must be positive.
	#[error("Refresh timeout must be positive.")]
	NonPositiveRefreshTimeout,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error: {source}.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error: {0}.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn status_errors_expose_their_response() {
		let err = Error::status(ApiResponse::new(403, Value::String("forbidden".into())));

		assert_eq!(err.status_code(), Some(403));
		assert!(!err.is_unauthorized());
		assert_eq!(err.to_string(), "Request failed with status code 403.");
		assert_eq!(err.response().map(|response| &response.data), Some(&Value::from("forbidden")));
	}

	#[test]
	fn session_ended_keeps_the_callers_own_response() {
		let err = Error::session_ended(
			SessionEndReason::RefreshFailed { message: "connection reset".into() },
			Some(ApiResponse::new(401, Value::Null)),
		);

		assert_eq!(err.status_code(), Some(401));
		assert!(err.to_string().contains("connection reset"));

		let bare = Error::session_ended(SessionEndReason::MissingRefreshToken, None);

		assert!(bare.response().is_none());
	}
}
