//! Thread-safe in-memory [`CredentialStore`] for tests and embedded use.

// self
use crate::{
	_prelude::*,
	session::{SessionCredentials, SessionRecord},
	store::{CredentialStore, StoreFuture},
};

/// Storage backend that keeps the session record in-process.
///
/// Mutations apply when the method is called; the returned futures are already resolved.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<SessionRecord>>);
impl MemoryStore {
	/// Creates a store already holding `record`.
	pub fn with_record(record: SessionRecord) -> Self {
		Self(Arc::new(RwLock::new(record)))
	}

	/// Returns a copy of the current record without going through the async contract.
	pub fn record(&self) -> SessionRecord {
		self.0.read().clone()
	}
}
impl CredentialStore for MemoryStore {
	fn load(&self) -> StoreFuture<'_, SessionRecord> {
		let record = self.record();

		Box::pin(async move { Ok(record) })
	}

	fn save_credentials(&self, credentials: SessionCredentials) -> StoreFuture<'_, ()> {
		self.0.write().apply(credentials);

		Box::pin(async { Ok(()) })
	}

	fn establish(
		&self,
		credentials: SessionCredentials,
		user: Option<Value>,
	) -> StoreFuture<'_, ()> {
		*self.0.write() = SessionRecord {
			token: Some(credentials.access_token),
			refresh_token: credentials.refresh_token,
			user,
		};

		Box::pin(async { Ok(()) })
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		*self.0.write() = SessionRecord::default();

		Box::pin(async { Ok(()) })
	}
}
