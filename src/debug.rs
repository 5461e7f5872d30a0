//! Observable, bounded log of request lifecycle and refresh events.
//!
//! The store keeps two most-recent-first lists (requests and refresh outcomes), each capped at
//! the configured capacity. Every mutation swaps in a new [`DebugSnapshot`] and then notifies
//! all current listeners synchronously, in subscription order. A panicking listener is caught
//! and logged; it neither stops the remaining listeners nor reaches the request that caused the
//! mutation.
//!
//! Delivery is serialized: listeners observe snapshots in the order they were produced, even
//! when mutations race across threads. A listener may mutate the store itself; the newer
//! snapshot is delivered right away and the superseded one is not handed to the listeners that
//! had not seen it yet.

pub mod entry;

pub use entry::*;

// std
use std::{
	panic::{self, AssertUnwindSafe},
	sync::{
		Weak,
		atomic::{AtomicU64, Ordering},
	},
	time::Duration as StdDuration,
};
// crates.io
use parking_lot::ReentrantMutex;
// self
use crate::{_prelude::*, config::ClientConfig, http::HttpMethod};

/// Observer invoked with the snapshot produced by a mutation.
pub type Listener = Arc<dyn Fn(&DebugSnapshot) + Send + Sync>;

/// Cloneable handle to the debug event store.
#[derive(Clone)]
pub struct DebugStore(Arc<DebugInner>);
impl DebugStore {
	/// Creates an empty store keeping `capacity` entries per list.
	pub fn new(capacity: usize) -> Self {
		Self(Arc::new(DebugInner {
			capacity: capacity.max(1),
			state: Mutex::new(Arc::new(DebugSnapshot::default())),
			delivery: ReentrantMutex::new(()),
			listeners: Mutex::new(Vec::new()),
			next_listener: AtomicU64::new(1),
			next_request: AtomicU64::new(1),
			next_refresh: AtomicU64::new(1),
		}))
	}

	/// Entries kept per list.
	pub fn capacity(&self) -> usize {
		self.0.capacity
	}

	/// Returns the current snapshot. The same `Arc` is returned until the next mutation.
	pub fn snapshot(&self) -> Arc<DebugSnapshot> {
		self.0.state.lock().clone()
	}

	/// Registers `listener`; it runs after every subsequent mutation.
	pub fn subscribe<F>(&self, listener: F) -> Subscription
	where
		F: 'static + Fn(&DebugSnapshot) + Send + Sync,
	{
		let id = self.0.next_listener.fetch_add(1, Ordering::Relaxed);

		self.0.listeners.lock().push((id, Arc::new(listener)));

		Subscription { id, store: Arc::downgrade(&self.0) }
	}

	/// Number of registered listeners.
	pub fn listener_count(&self) -> usize {
		self.0.listeners.lock().len()
	}

	/// Records a dispatched request and returns its open entry.
	pub fn request_started(&self, method: HttpMethod, url: impl Into<String>) -> RequestLogEntry {
		let entry = RequestLogEntry {
			id: self.0.next_request.fetch_add(1, Ordering::Relaxed),
			method,
			url: url.into(),
			timestamp: OffsetDateTime::now_utc(),
			status: None,
			status_text: None,
			duration_ms: None,
			error_message: None,
		};
		let opened = entry.clone();

		self.mutate(move |state, capacity| {
			state.last_request = Some(entry.clone());
			push_bounded(&mut state.request_history, entry, capacity);
		});

		opened
	}

	/// Completes `open` with a 2xx response.
	pub fn request_succeeded(
		&self,
		open: RequestLogEntry,
		status: u16,
		status_text: impl Into<String>,
		elapsed: StdDuration,
	) {
		let entry = RequestLogEntry {
			status: Some(status),
			status_text: Some(status_text.into()),
			duration_ms: Some(millis(elapsed)),
			..open
		};

		self.complete(entry);
	}

	/// Completes `open` with a failure; `status` is `None` when no response arrived.
	pub fn request_failed(
		&self,
		open: RequestLogEntry,
		status: Option<u16>,
		status_text: Option<String>,
		message: impl Into<String>,
		elapsed: StdDuration,
	) {
		let entry = RequestLogEntry {
			status,
			status_text,
			duration_ms: Some(millis(elapsed)),
			error_message: Some(message.into()),
			..open
		};

		self.complete(entry);
	}

	/// Records a successful refresh.
	pub fn refresh_succeeded(&self) {
		self.push_refresh(RefreshStatus::Success, None);
	}

	/// Records a failed refresh.
	pub fn refresh_failed(&self, message: impl Into<String>) {
		self.push_refresh(RefreshStatus::Failure, Some(message.into()));
	}

	fn push_refresh(&self, status: RefreshStatus, message: Option<String>) {
		let event = RefreshEvent {
			id: self.0.next_refresh.fetch_add(1, Ordering::Relaxed),
			timestamp: OffsetDateTime::now_utc(),
			status,
			message,
		};

		self.mutate(move |state, capacity| {
			push_bounded(&mut state.token_refresh_events, event, capacity);
		});
	}

	fn complete(&self, entry: RequestLogEntry) {
		self.mutate(move |state, _| {
			if let Some(slot) = state.request_history.iter_mut().find(|e| e.id == entry.id) {
				if slot.is_complete() {
					return;
				}

				*slot = entry.clone();
			}

			state.last_response = Some(entry);
		});
	}

	fn mutate<F>(&self, apply: F)
	where
		F: FnOnce(&mut DebugSnapshot, usize),
	{
		let _delivery = self.0.delivery.lock();
		let snapshot = {
			let mut guard = self.0.state.lock();
			let mut next = DebugSnapshot::clone(&guard);

			apply(&mut next, self.0.capacity);

			if next == **guard {
				return;
			}

			*guard = Arc::new(next);

			guard.clone()
		};

		self.notify(&snapshot);
	}

	fn notify(&self, snapshot: &Arc<DebugSnapshot>) {
		let listeners = self.0.listeners.lock().clone();
		let view: &DebugSnapshot = snapshot;

		for (id, listener) in listeners {
			// Superseded by a mutation made from inside a listener.
			if !Arc::ptr_eq(&*self.0.state.lock(), snapshot) {
				break;
			}
			if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener(view))) {
				tracing::warn!(
					listener = id,
					panic = panic_message(payload.as_ref()),
					"Debug listener panicked; remaining listeners still notified."
				);
			}
		}
	}
}
impl From<&ClientConfig> for DebugStore {
	fn from(config: &ClientConfig) -> Self {
		Self::new(config.history_capacity)
	}
}
impl Default for DebugStore {
	fn default() -> Self {
		Self::new(ClientConfig::DEFAULT_HISTORY_CAPACITY)
	}
}
impl Debug for DebugStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DebugStore")
			.field("capacity", &self.0.capacity)
			.field("listeners", &self.listener_count())
			.finish()
	}
}

/// Handle returned by [`DebugStore::subscribe`].
///
/// Dropping the handle keeps the listener registered; call
/// [`unsubscribe`](Subscription::unsubscribe) to remove it.
#[derive(Debug)]
pub struct Subscription {
	id: u64,
	store: Weak<DebugInner>,
}
impl Subscription {
	/// Removes the listener. Returns `false` if it was already gone.
	pub fn unsubscribe(self) -> bool {
		let Some(store) = self.store.upgrade() else {
			return false;
		};
		let mut listeners = store.listeners.lock();
		let before = listeners.len();

		listeners.retain(|(id, _)| *id != self.id);

		listeners.len() != before
	}
}

struct DebugInner {
	capacity: usize,
	state: Mutex<Arc<DebugSnapshot>>,
	delivery: ReentrantMutex<()>,
	listeners: Mutex<Vec<(u64, Listener)>>,
	next_listener: AtomicU64,
	next_request: AtomicU64,
	next_refresh: AtomicU64,
}
impl Debug for DebugInner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DebugInner").field("capacity", &self.capacity).finish()
	}
}

fn push_bounded<T>(list: &mut Vec<T>, item: T, capacity: usize) {
	list.insert(0, item);
	list.truncate(capacity);
}

fn millis(elapsed: StdDuration) -> u64 {
	u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
	payload
		.downcast_ref::<&str>()
		.copied()
		.or_else(|| payload.downcast_ref::<String>().map(String::as_str))
		.unwrap_or("<non-string panic payload>")
}
