// self
use crate::{
	_prelude::*,
	client::{ConsoleClient, SessionContext},
	config::ClientConfig,
	error::ConfigError,
	http::HttpTransport,
	pipeline::{CredentialStage, Middleware, Pipeline, RecordStage, RefreshStage},
	session::{LogRedirect, LoginRedirect},
	store::{CredentialStore, MemoryStore},
};

/// Assembles a [`ConsoleClient`].
///
/// Unset collaborators fall back to a [`MemoryStore`], the reqwest transport (when the
/// `reqwest` feature is enabled), and [`LogRedirect`].
pub struct ClientBuilder {
	config: ClientConfig,
	store: Option<Arc<dyn CredentialStore>>,
	transport: Option<Arc<dyn HttpTransport>>,
	redirect: Option<Arc<dyn LoginRedirect>>,
	stages: Vec<Arc<dyn Middleware>>,
}
impl ClientBuilder {
	/// Starts a builder for `config`.
	pub fn new(config: ClientConfig) -> Self {
		Self { config, store: None, transport: None, redirect: None, stages: Vec::new() }
	}

	/// Uses `store` for credentials.
	pub fn store(mut self, store: Arc<dyn CredentialStore>) -> Self {
		self.store = Some(store);

		self
	}

	/// Uses `transport` for every outbound call, including the refresh call.
	pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
		self.transport = Some(transport);

		self
	}

	/// Uses `redirect` to navigate to login when the session ends.
	pub fn redirect(mut self, redirect: Arc<dyn LoginRedirect>) -> Self {
		self.redirect = Some(redirect);

		self
	}

	/// Appends a stage. Extra stages run after the built-in ones, in insertion order, and are
	/// re-run for every retry.
	pub fn stage<M>(mut self, stage: M) -> Self
	where
		M: Middleware,
	{
		self.stages.push(Arc::new(stage));

		self
	}

	/// Builds the client.
	pub fn build(self) -> Result<ConsoleClient> {
		let transport = match self.transport {
			Some(transport) => transport,
			None => default_transport()?,
		};
		let store: Arc<dyn CredentialStore> = match self.store {
			Some(store) => store,
			None => Arc::new(MemoryStore::default()),
		};
		let redirect: Arc<dyn LoginRedirect> = match self.redirect {
			Some(redirect) => redirect,
			None => Arc::new(LogRedirect),
		};
		let context = Arc::new(SessionContext::new(self.config, store, transport.clone(), redirect));
		let mut stages: Vec<Arc<dyn Middleware>> = vec![
			Arc::new(RefreshStage::new(context.clone())),
			Arc::new(CredentialStage::new(context.clone())),
			Arc::new(RecordStage::new(context.debug().clone())),
		];

		stages.extend(self.stages);

		Ok(ConsoleClient { pipeline: Pipeline::new(stages, transport), context })
	}
}
impl Debug for ClientBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientBuilder")
			.field("config", &self.config)
			.field("store_set", &self.store.is_some())
			.field("transport_set", &self.transport.is_some())
			.field("redirect_set", &self.redirect.is_some())
			.field("extra_stages", &self.stages.len())
			.finish()
	}
}

#[cfg(feature = "reqwest")]
fn default_transport() -> Result<Arc<dyn HttpTransport>, ConfigError> {
	let client = ReqwestClient::builder().build()?;

	Ok(Arc::new(crate::http::ReqwestTransport::with_client(client)))
}

#[cfg(not(feature = "reqwest"))]
fn default_transport() -> Result<Arc<dyn HttpTransport>, ConfigError> {
	Err(ConfigError::MissingTransport)
}
