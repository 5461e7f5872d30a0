//! Storage contract and built-in implementations for the persisted session record.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	session::{SessionCredentials, SessionRecord},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Durable key/value state holding the current credentials and the login flow's user blob.
///
/// Every write replaces the affected keys atomically: readers observe either the previous or
/// the new credentials, never a mix of both.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Reads the full session record; missing keys are `None`.
	fn load(&self) -> StoreFuture<'_, SessionRecord>;

	/// Overwrites the access credential and, when present, the refresh credential.
	fn save_credentials(&self, credentials: SessionCredentials) -> StoreFuture<'_, ()>;

	/// Replaces the whole record at login or registration completion.
	fn establish(
		&self,
		credentials: SessionCredentials,
		user: Option<Value>,
	) -> StoreFuture<'_, ()>;

	/// Erases every persisted key.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::error::Error;

	#[test]
	fn store_error_converts_into_client_error_with_source() {
		let store_error = StoreError::Backend { message: "storage quota exceeded".into() };
		let client_error: Error = store_error.clone().into();

		assert!(matches!(client_error, Error::Storage(_)));
		assert!(client_error.to_string().contains("storage quota exceeded"));

		let source = StdError::source(&client_error)
			.expect("Client error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
