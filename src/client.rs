//! Application-facing client: one pipeline, one shared session context.
//!
//! UI code calls [`ConsoleClient::send`] (or the verb shorthands) and receives either the
//! backend's 2xx response or an [`Error`]. Bearer attachment, the refresh protocol, and debug
//! recording happen inside the pipeline and are invisible to callers. The login flow writes
//! credentials through [`ConsoleClient::establish_session`].

mod builder;
mod context;

pub use builder::ClientBuilder;
pub use context::SessionContext;

// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	debug::DebugStore,
	http::{ApiRequest, ApiResponse, HttpMethod},
	pipeline::{Pipeline, RefreshMetrics},
	session::{SessionCredentials, SessionEndReason},
	store::CredentialStore,
};

/// Authenticated HTTP client for the admin console.
///
/// Cloning is cheap; clones share the pipeline, the credential store, the debug log, and the
/// refresh state.
#[derive(Clone, Debug)]
pub struct ConsoleClient {
	context: Arc<SessionContext>,
	pipeline: Pipeline,
}
impl ConsoleClient {
	/// Starts a [`ClientBuilder`] for `config`.
	pub fn builder(config: ClientConfig) -> ClientBuilder {
		ClientBuilder::new(config)
	}

	/// Sends `request` through the pipeline.
	///
	/// Resolves with the 2xx response. A first `401` is recovered transparently when the
	/// refresh succeeds; otherwise the caller receives [`Error::SessionEnded`] carrying its own
	/// `401`.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		let context = request.into_context(self.context.config())?;

		self.pipeline.execute(context).await
	}

	/// `GET target`.
	pub async fn get(&self, target: &str) -> Result<ApiResponse> {
		self.send(ApiRequest::get(target)).await
	}

	/// `POST target` with a JSON body.
	pub async fn post(&self, target: &str, body: Value) -> Result<ApiResponse> {
		self.send(ApiRequest::new(HttpMethod::Post, target).body(body)).await
	}

	/// `PUT target` with a JSON body.
	pub async fn put(&self, target: &str, body: Value) -> Result<ApiResponse> {
		self.send(ApiRequest::new(HttpMethod::Put, target).body(body)).await
	}

	/// `PATCH target` with a JSON body.
	pub async fn patch(&self, target: &str, body: Value) -> Result<ApiResponse> {
		self.send(ApiRequest::new(HttpMethod::Patch, target).body(body)).await
	}

	/// `DELETE target`.
	pub async fn delete(&self, target: &str) -> Result<ApiResponse> {
		self.send(ApiRequest::new(HttpMethod::Delete, target)).await
	}

	/// Persists the credentials and user blob issued by login or registration and re-arms
	/// session termination.
	///
	/// Fails with [`Error::RefreshInProgress`] while a refresh is in flight. Requests that hit a
	/// `401` during the write wait for it and retry with the new credentials.
	pub async fn establish_session(
		&self,
		credentials: SessionCredentials,
		user: Option<Value>,
	) -> Result<()> {
		let write = self.context.coordinator().begin_write()?;

		self.context.store().establish(credentials, user).await?;
		write.established();
		self.context.terminator().reset();

		tracing::info!("Session established.");

		Ok(())
	}

	/// Ends the session on the user's request: clears the store and navigates to login.
	///
	/// Fails with [`Error::RefreshInProgress`] while a refresh is in flight. The session counts as
	/// ended even when the store fails to clear; that error is returned without navigating.
	pub async fn logout(&self) -> Result<()> {
		let write = self.context.coordinator().begin_write()?;
		let cleared = self.context.store().clear().await;

		write.ended(SessionEndReason::LoggedOut);
		cleared?;
		self.context.terminator().terminate(&SessionEndReason::LoggedOut).await;

		Ok(())
	}

	/// Returns `true` while a credential refresh is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.context.coordinator().is_refreshing()
	}

	/// Reason the current session ended, if it has.
	pub fn session_ended(&self) -> Option<SessionEndReason> {
		self.context.coordinator().ended()
	}

	/// Debug event store fed by every request.
	pub fn debug(&self) -> &DebugStore {
		self.context.debug()
	}

	/// Refresh counters.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		self.context.coordinator().metrics()
	}

	/// Credential store shared with the login flow.
	pub fn store(&self) -> &Arc<dyn CredentialStore> {
		self.context.store()
	}

	/// Client configuration.
	pub fn config(&self) -> &ClientConfig {
		self.context.config()
	}
}
