//! Helpers shared by the integration tests.

#![allow(dead_code)]

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use parking_lot::Mutex;
// self
use console_client::{
	client::ConsoleClient,
	config::ClientConfig,
	http::HttpTransport,
	session::{LoginRedirect, SessionCredentials, SessionEndReason},
	store::MemoryStore,
	url::Url,
};

/// [`LoginRedirect`] that remembers every navigation it was asked to perform.
#[derive(Debug, Default)]
pub struct RecordingRedirect {
	count: AtomicUsize,
	targets: Mutex<Vec<(String, SessionEndReason)>>,
}
impl RecordingRedirect {
	pub fn count(&self) -> usize {
		self.count.load(Ordering::SeqCst)
	}

	pub fn targets(&self) -> Vec<(String, SessionEndReason)> {
		self.targets.lock().clone()
	}
}
impl LoginRedirect for RecordingRedirect {
	fn redirect(&self, target: &str, reason: &SessionEndReason) {
		self.count.fetch_add(1, Ordering::SeqCst);
		self.targets.lock().push((target.to_owned(), reason.clone()));
	}
}

pub struct Harness {
	pub client: ConsoleClient,
	pub store: Arc<MemoryStore>,
	pub redirect: Arc<RecordingRedirect>,
}

pub fn test_config(base_url: &str) -> ClientConfig {
	ClientConfig::builder(Url::parse(base_url).expect("Test base URL should parse."))
		.build()
		.expect("Test client config should build.")
}

/// Builds a client over `transport`, or the reqwest default when `None`.
pub fn harness(config: ClientConfig, transport: Option<Arc<dyn HttpTransport>>) -> Harness {
	let store = Arc::new(MemoryStore::default());
	let redirect = Arc::new(RecordingRedirect::default());
	let mut builder = ConsoleClient::builder(config).store(store.clone()).redirect(redirect.clone());

	if let Some(transport) = transport {
		builder = builder.transport(transport);
	}

	let client = builder.build().expect("Test client should build.");

	Harness { client, store, redirect }
}

/// Seeds the store the way the login flow would.
pub async fn sign_in(client: &ConsoleClient, access: &str, refresh: Option<&str>) {
	let mut credentials = SessionCredentials::new(access);

	if let Some(refresh) = refresh {
		credentials = credentials.with_refresh_token(refresh);
	}

	client
		.establish_session(credentials, Some(serde_json::json!({ "name": "moderator" })))
		.await
		.expect("Establishing the test session should succeed.");
}

pub fn stored_tokens(store: &MemoryStore) -> (Option<String>, Option<String>) {
	let record = store.record();

	(
		record.token.map(|token| token.expose().to_owned()),
		record.refresh_token.map(|token| token.expose().to_owned()),
	)
}
