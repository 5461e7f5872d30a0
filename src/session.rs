//! Session credentials, the persisted session record, and session termination.

pub mod secret;
pub mod terminate;

pub use secret::*;
pub use terminate::*;

// self
use crate::_prelude::*;

/// Access credential plus the optional refresh credential issued alongside it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredentials {
	/// Short-lived credential presented on every authenticated call.
	pub access_token: TokenSecret,
	/// Longer-lived credential exchanged for a new access credential.
	pub refresh_token: Option<TokenSecret>,
}
impl SessionCredentials {
	/// Creates credentials without a refresh credential.
	pub fn new(access_token: impl Into<TokenSecret>) -> Self {
		Self { access_token: access_token.into(), refresh_token: None }
	}

	/// Attaches a refresh credential.
	pub fn with_refresh_token(mut self, refresh_token: impl Into<TokenSecret>) -> Self {
		self.refresh_token = Some(refresh_token.into());

		self
	}
}

/// Everything the credential store persists, keyed the way the login flow writes it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
	/// Current access credential.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub token: Option<TokenSecret>,
	/// Current refresh credential.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<TokenSecret>,
	/// Opaque user profile owned by the login flow.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user: Option<Value>,
}
impl SessionRecord {
	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.token.is_none() && self.refresh_token.is_none() && self.user.is_none()
	}

	/// Replaces the stored credentials, keeping the previous refresh credential when the new
	/// pair does not carry one.
	pub fn apply(&mut self, credentials: SessionCredentials) {
		self.token = Some(credentials.access_token);

		if let Some(refresh) = credentials.refresh_token {
			self.refresh_token = Some(refresh);
		}
	}
}

/// Why a session was ended; shared by every request affected by the same outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEndReason {
	/// A refresh was needed but no refresh credential was stored.
	MissingRefreshToken,
	/// The refresh endpoint answered with a non-2xx status.
	RefreshRejected {
		/// Status returned by the refresh endpoint.
		status: u16,
		/// Summary of the rejection.
		message: String,
	},
	/// The refresh call could not complete (network, malformed body, storage).
	RefreshFailed {
		/// Summary of the failure.
		message: String,
	},
	/// The refresh call exceeded the configured timeout.
	RefreshTimedOut,
	/// The refresh task stopped before reporting an outcome.
	Interrupted,
	/// The user logged out.
	LoggedOut,
}
impl SessionEndReason {
	/// Returns the message recorded in the debug log for this reason.
	pub fn message(&self) -> String {
		self.to_string()
	}
}
impl Display for SessionEndReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::MissingRefreshToken => f.write_str("no refresh token is stored"),
			Self::RefreshRejected { status, message } =>
				write!(f, "refresh rejected with status {status}: {message}"),
			Self::RefreshFailed { message } => write!(f, "refresh failed: {message}"),
			Self::RefreshTimedOut => f.write_str("refresh timed out"),
			Self::Interrupted => f.write_str("refresh was interrupted"),
			Self::LoggedOut => f.write_str("logged out"),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn apply_keeps_refresh_token_when_none_is_issued() {
		let mut record = SessionRecord::default();

		record.apply(SessionCredentials::new("T1").with_refresh_token("R1"));
		record.apply(SessionCredentials::new("T2"));

		assert_eq!(record.token.as_ref().map(TokenSecret::expose), Some("T2"));
		assert_eq!(record.refresh_token.as_ref().map(TokenSecret::expose), Some("R1"));

		record.apply(SessionCredentials::new("T3").with_refresh_token("R2"));

		assert_eq!(record.refresh_token.as_ref().map(TokenSecret::expose), Some("R2"));
	}

	#[test]
	fn record_uses_persisted_key_layout() {
		let record = SessionRecord {
			token: Some("T1".into()),
			refresh_token: Some("R1".into()),
			user: Some(serde_json::json!({ "name": "mod" })),
		};
		let payload = serde_json::to_value(&record).expect("Session record should serialize.");

		assert_eq!(
			payload,
			serde_json::json!({ "token": "T1", "refresh_token": "R1", "user": { "name": "mod" } })
		);
		assert!(SessionRecord::default().is_empty());
	}
}
