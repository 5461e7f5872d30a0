//! File-backed [`CredentialStore`] that survives process restarts.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	session::{SessionCredentials, SessionRecord},
	store::{CredentialStore, StoreError, StoreFuture},
};

/// Persists the session record as a JSON object (`token`, `refresh_token`, `user`) after each
/// mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<SessionRecord>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let record = Self::load_record(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(record)) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_record(path: &Path) -> Result<SessionRecord, StoreError> {
		if !path.exists() {
			return Ok(SessionRecord::default());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(SessionRecord::default());
		}

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, record: &SessionRecord) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(record).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize session record: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	fn replace_with(&self, update: impl FnOnce(&mut SessionRecord)) -> Result<(), StoreError> {
		let mut guard = self.inner.write();
		let mut next = guard.clone();

		update(&mut next);
		self.persist_locked(&next)?;
		*guard = next;

		Ok(())
	}
}
impl CredentialStore for FileStore {
	fn load(&self) -> StoreFuture<'_, SessionRecord> {
		Box::pin(async move { Ok(self.inner.read().clone()) })
	}

	fn save_credentials(&self, credentials: SessionCredentials) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.replace_with(|record| record.apply(credentials)) })
	}

	fn establish(
		&self,
		credentials: SessionCredentials,
		user: Option<Value>,
	) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			self.replace_with(|record| {
				*record = SessionRecord {
					token: Some(credentials.access_token),
					refresh_token: credentials.refresh_token,
					user,
				}
			})
		})
	}

	/// Forgets the in-memory record even when the file cannot be rewritten; the persist error
	/// is still returned.
	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			*guard = SessionRecord::default();

			self.persist_locked(&guard)
		})
	}
}
