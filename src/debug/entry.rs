//! Records kept by the debug store and the snapshot exposed to observers.

// self
use crate::{_prelude::*, http::HttpMethod};

/// One dispatched request, completed in place once its response or error arrives.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestLogEntry {
	/// Monotonic identifier assigned at dispatch.
	pub id: u64,
	/// HTTP verb.
	pub method: HttpMethod,
	/// Fully-qualified target.
	pub url: String,
	/// Dispatch instant.
	pub timestamp: OffsetDateTime,
	/// Response status, once one arrived.
	pub status: Option<u16>,
	/// Response reason phrase, once one arrived.
	pub status_text: Option<String>,
	/// Elapsed time between dispatch and completion.
	pub duration_ms: Option<u64>,
	/// Failure summary for error completions.
	pub error_message: Option<String>,
}
impl RequestLogEntry {
	/// Returns `true` once the entry has been completed.
	pub fn is_complete(&self) -> bool {
		self.duration_ms.is_some()
	}
}

/// Outcome label for a refresh event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshStatus {
	/// New credentials were stored.
	Success,
	/// The refresh ended the session.
	Failure,
}

/// One completed refresh attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefreshEvent {
	/// Monotonic identifier.
	pub id: u64,
	/// Completion instant.
	pub timestamp: OffsetDateTime,
	/// Outcome.
	pub status: RefreshStatus,
	/// Failure summary, when the refresh failed.
	pub message: Option<String>,
}

/// Immutable view of recent traffic and refresh activity.
///
/// Lists are most-recent-first and bounded by the configured capacity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugSnapshot {
	/// Most recently dispatched request.
	pub last_request: Option<RequestLogEntry>,
	/// Most recently completed request.
	pub last_response: Option<RequestLogEntry>,
	/// Recent requests.
	pub request_history: Vec<RequestLogEntry>,
	/// Recent refresh outcomes.
	pub token_refresh_events: Vec<RefreshEvent>,
}
