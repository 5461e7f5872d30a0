// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	debug::DebugStore,
	http::HttpTransport,
	pipeline::RefreshCoordinator,
	session::{LoginRedirect, SessionTerminator, TokenSecret},
	store::CredentialStore,
};

/// Everything the pipeline stages share: one instance per client, created at startup.
pub struct SessionContext {
	config: ClientConfig,
	store: Arc<dyn CredentialStore>,
	transport: Arc<dyn HttpTransport>,
	debug: DebugStore,
	terminator: SessionTerminator,
	coordinator: RefreshCoordinator,
}
impl SessionContext {
	/// Wires the shared state for one client.
	pub fn new(
		config: ClientConfig,
		store: Arc<dyn CredentialStore>,
		transport: Arc<dyn HttpTransport>,
		redirect: Arc<dyn LoginRedirect>,
	) -> Self {
		let debug = DebugStore::from(&config);
		let terminator = SessionTerminator::new(store.clone(), redirect, config.login_path.clone());

		Self { config, store, transport, debug, terminator, coordinator: Default::default() }
	}

	/// Validated client configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Credential store shared with the login flow.
	pub fn store(&self) -> &Arc<dyn CredentialStore> {
		&self.store
	}

	/// Raw transport; calls made through it bypass every stage.
	pub fn transport(&self) -> &Arc<dyn HttpTransport> {
		&self.transport
	}

	/// Debug event store.
	pub fn debug(&self) -> &DebugStore {
		&self.debug
	}

	/// Session terminator.
	pub fn terminator(&self) -> &SessionTerminator {
		&self.terminator
	}

	/// Refresh coordinator.
	pub fn coordinator(&self) -> &RefreshCoordinator {
		&self.coordinator
	}

	/// Reads the current access credential. An unreadable store counts as no credential.
	pub async fn access_token(&self) -> Option<TokenSecret> {
		match self.store.load().await {
			Ok(record) => record.token,
			Err(e) => {
				tracing::warn!(error = %e, "Credential store unreadable; sending without credential.");

				None
			},
		}
	}
}
impl Debug for SessionContext {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionContext")
			.field("config", &self.config)
			.field("debug", &self.debug)
			.field("terminator", &self.terminator)
			.field("coordinator", &self.coordinator)
			.finish()
	}
}
