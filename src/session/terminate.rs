//! Session termination: erase persisted state and send the operator back to login.

// std
use std::sync::atomic::{AtomicBool, Ordering};
// self
use crate::{_prelude::*, session::SessionEndReason, store::CredentialStore};

/// Performs the hard navigation to the login entry point.
///
/// Implementations must not rely on in-app routing: the authenticated state that produced the
/// termination may be inconsistent, so the whole view is expected to be torn down.
pub trait LoginRedirect
where
	Self: Send + Sync,
{
	/// Navigates to `target` because the session ended for `reason`.
	fn redirect(&self, target: &str, reason: &SessionEndReason);
}
impl<F> LoginRedirect for F
where
	F: Fn(&str, &SessionEndReason) + Send + Sync,
{
	fn redirect(&self, target: &str, reason: &SessionEndReason) {
		self(target, reason)
	}
}

/// Default [`LoginRedirect`] that only reports the navigation through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogRedirect;
impl LoginRedirect for LogRedirect {
	fn redirect(&self, target: &str, reason: &SessionEndReason) {
		tracing::warn!(%reason, login = target, "Session ended; navigate to login.");
	}
}

/// Single point through which an invalid session is acted upon.
///
/// The first [`terminate`](SessionTerminator::terminate) after construction (or after
/// [`reset`](SessionTerminator::reset)) clears the store and redirects; later calls are no-ops
/// until a new session is established.
pub struct SessionTerminator {
	store: Arc<dyn CredentialStore>,
	redirect: Arc<dyn LoginRedirect>,
	login_target: String,
	armed: AtomicBool,
}
impl SessionTerminator {
	/// Creates an armed terminator.
	pub fn new(
		store: Arc<dyn CredentialStore>,
		redirect: Arc<dyn LoginRedirect>,
		login_target: impl Into<String>,
	) -> Self {
		Self { store, redirect, login_target: login_target.into(), armed: AtomicBool::new(true) }
	}

	/// Ends the session. Returns `false` when the session had already been terminated.
	pub async fn terminate(&self, reason: &SessionEndReason) -> bool {
		if !self.armed.swap(false, Ordering::SeqCst) {
			return false;
		}
		if let Err(e) = self.store.clear().await {
			tracing::error!(error = %e, "Failed to clear the credential store.");
		}

		tracing::info!(%reason, "Session terminated.");
		self.redirect.redirect(&self.login_target, reason);

		true
	}

	/// Re-arms the terminator once a new session exists.
	pub fn reset(&self) {
		self.armed.store(true, Ordering::SeqCst);
	}

	/// Returns `true` while a termination is still possible for the current session.
	pub fn is_armed(&self) -> bool {
		self.armed.load(Ordering::SeqCst)
	}

	/// Navigation target used on termination.
	pub fn login_target(&self) -> &str {
		&self.login_target
	}
}
impl Debug for SessionTerminator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionTerminator")
			.field("login_target", &self.login_target)
			.field("armed", &self.is_armed())
			.finish()
	}
}
