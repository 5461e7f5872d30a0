//! Single-flight credential refresh with ordered replay.
//!
//! The first request whose original attempt comes back `401` becomes the refresher: it flips
//! the coordinator into the refreshing state and runs the refresh call on a background task, so
//! the outcome is reported even if the caller stops waiting. Every other `401` that arrives
//! while the flag is set is parked in the pending queue with a reply channel.
//!
//! Each request is stamped with the credential generation it observed when it entered the
//! pipeline. A `401` carrying an older generation was produced by credentials that have
//! already been replaced, so it is replayed immediately (or rejected, when the replacement was
//! a session end) instead of triggering a second refresh.
//!
//! On success the queue is drained and replayed in arrival order with the new credential. On
//! failure the store is cleared, every queued request is rejected with the same
//! [`SessionEndReason`] plus its own `401`, and the session terminator runs once.
//!
//! Login and logout claim a [`SessionWrite`] before touching the store. The claim is refused
//! while a refresh is in flight, and a `401` arriving while it is held waits for the write
//! instead of starting a refresh that could overwrite the new session with rotated old
//! credentials.

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::mem;
// crates.io
use futures_util::future;
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	client::SessionContext,
	http::{ApiResponse, HttpMethod, RequestContext},
	obs::{self, StageKind, StageOutcome, StageSpan},
	pipeline::{Middleware, Next, PipelineFuture},
	session::{SessionCredentials, SessionEndReason, TokenSecret},
};

type Reply = oneshot::Sender<Wake>;

/// Shared refresh state consulted by every `401` and by session establishment.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
	state: Mutex<RefreshState>,
	metrics: RefreshMetrics,
}
impl RefreshCoordinator {
	/// Returns `true` while a refresh call is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.state.lock().refreshing
	}

	/// Current credential generation; bumped by every refresh outcome and session change.
	pub fn generation(&self) -> u64 {
		self.state.lock().generation
	}

	/// Number of requests waiting for the in-flight refresh.
	pub fn pending_len(&self) -> usize {
		self.state.lock().pending.len()
	}

	/// Reason the current session ended, if it has.
	pub fn ended(&self) -> Option<SessionEndReason> {
		self.state.lock().ended.clone()
	}

	/// Refresh counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Claims the credential store for a login or logout.
	///
	/// Fails with [`Error::RefreshInProgress`] while a refresh is in flight and with
	/// [`Error::SessionWriteInProgress`] while another claim is held.
	pub(crate) fn begin_write(&self) -> Result<SessionWrite<'_>> {
		let mut state = self.state.lock();

		if state.refreshing {
			return Err(Error::RefreshInProgress);
		}
		if state.writing {
			return Err(Error::SessionWriteInProgress);
		}

		state.writing = true;

		Ok(SessionWrite { coordinator: self, finished: false })
	}

	fn finish_write(&self, outcome: WriteOutcome) {
		let pending = {
			let mut state = self.state.lock();

			state.writing = false;

			match &outcome {
				WriteOutcome::Established => {
					state.generation += 1;
					state.ended = None;
				},
				WriteOutcome::Ended(reason) => {
					state.generation += 1;
					state.ended = Some(reason.clone());
				},
				WriteOutcome::Abandoned => (),
			}

			mem::take(&mut state.pending)
		};

		for PendingRequest { original, reply, .. } in pending {
			let wake = match &outcome {
				WriteOutcome::Ended(reason) =>
					Wake::Settled(Err(Error::session_ended(reason.clone(), Some(original)))),
				WriteOutcome::Established | WriteOutcome::Abandoned => Wake::Retry,
			};

			let _ = reply.send(wake);
		}
	}

	fn admit(&self, request: &RequestContext, original: &ApiResponse) -> Admission {
		let mut state = self.state.lock();

		if state.refreshing || state.writing {
			let (reply, receiver) = oneshot::channel();

			state.pending.push(PendingRequest {
				request: request.clone(),
				original: original.clone(),
				reply,
			});
			self.metrics.record_queued();

			return Admission::Queued(receiver);
		}
		if request.generation != state.generation {
			return match &state.ended {
				Some(reason) => Admission::Ended(reason.clone()),
				None => Admission::Replay,
			};
		}

		state.refreshing = true;

		Admission::Refresh
	}

	fn settle(&self, ended: Option<SessionEndReason>) -> Vec<PendingRequest> {
		let mut state = self.state.lock();

		state.refreshing = false;
		state.generation += 1;
		state.ended = ended;

		mem::take(&mut state.pending)
	}
}

/// Claim on the credential store held by a login or logout.
///
/// Dropping it without [`established`](Self::established) or [`ended`](Self::ended) leaves the
/// session state untouched and lets waiting requests retry.
#[derive(Debug)]
pub(crate) struct SessionWrite<'a> {
	coordinator: &'a RefreshCoordinator,
	finished: bool,
}
impl SessionWrite<'_> {
	/// Marks the freshly written credentials as current; waiting requests retry with them.
	pub(crate) fn established(mut self) {
		self.finish(WriteOutcome::Established);
	}

	/// Marks the session as ended; waiting requests are rejected with `reason`.
	pub(crate) fn ended(mut self, reason: SessionEndReason) {
		self.finish(WriteOutcome::Ended(reason));
	}

	fn finish(&mut self, outcome: WriteOutcome) {
		self.finished = true;
		self.coordinator.finish_write(outcome);
	}
}
impl Drop for SessionWrite<'_> {
	fn drop(&mut self) {
		if !self.finished {
			self.finish(WriteOutcome::Abandoned);
		}
	}
}

/// Outermost stage: turns the first `401` of a request into a refresh and one retry.
#[derive(Debug)]
pub struct RefreshStage {
	context: Arc<SessionContext>,
}
impl RefreshStage {
	/// Creates the stage over the shared session context.
	pub fn new(context: Arc<SessionContext>) -> Self {
		Self { context }
	}

	async fn recover(
		&self,
		request: RequestContext,
		original: ApiResponse,
		next: Next,
	) -> Result<ApiResponse> {
		match self.context.coordinator().admit(&request, &original) {
			Admission::Queued(receiver) => {
				tracing::debug!(url = %request.url, "Credential update in flight; request queued.");

				match receiver.await {
					Ok(Wake::Settled(outcome)) => outcome,
					Ok(Wake::Retry) => replay(next, request).await,
					Err(_) => Err(Error::session_ended(SessionEndReason::Interrupted, Some(original))),
				}
			},
			Admission::Replay => {
				tracing::debug!(url = %request.url, "Credentials rotated since dispatch; replaying.");

				replay(next, request).await
			},
			Admission::Ended(reason) => Err(Error::session_ended(reason, Some(original))),
			Admission::Refresh => {
				let task = tokio::spawn(refresh_session(self.context.clone(), next.clone()));
				let outcome = match task.await {
					Ok(outcome) => outcome,
					Err(e) => {
						tracing::error!(error = %e, "Refresh task stopped before settling.");

						if self.context.coordinator().is_refreshing() {
							end_session(&self.context, SessionEndReason::Interrupted).await;
						}

						Err(SessionEndReason::Interrupted)
					},
				};

				match outcome {
					Ok(()) => replay(next, request).await,
					Err(reason) => Err(Error::session_ended(reason, Some(original))),
				}
			},
		}
	}
}
impl Middleware for RefreshStage {
	fn handle<'a>(&'a self, request: RequestContext, next: Next) -> PipelineFuture<'a> {
		Box::pin(async move {
			let request = if request.is_retry() {
				request
			} else {
				request.with_generation(self.context.coordinator().generation())
			};

			match next.clone().run(request.clone()).await {
				Err(Error::Status { response })
					if response.is_unauthorized() && !request.is_retry() =>
					self.recover(request, *response, next).await,
				outcome => outcome,
			}
		})
	}
}

#[derive(Debug, Default)]
struct RefreshState {
	refreshing: bool,
	writing: bool,
	generation: u64,
	ended: Option<SessionEndReason>,
	pending: Vec<PendingRequest>,
}

#[derive(Debug)]
struct PendingRequest {
	request: RequestContext,
	original: ApiResponse,
	reply: Reply,
}

#[derive(Debug)]
enum Wake {
	Settled(Result<ApiResponse>),
	/// A session write finished; replay with whatever the store now holds.
	Retry,
}

enum WriteOutcome {
	Established,
	Ended(SessionEndReason),
	Abandoned,
}

enum Admission {
	Queued(oneshot::Receiver<Wake>),
	Replay,
	Ended(SessionEndReason),
	Refresh,
}

#[derive(Deserialize)]
struct RefreshGrant {
	access_token: TokenSecret,
	#[serde(default)]
	refresh_token: Option<TokenSecret>,
}
impl From<RefreshGrant> for SessionCredentials {
	fn from(grant: RefreshGrant) -> Self {
		Self { access_token: grant.access_token, refresh_token: grant.refresh_token }
	}
}

async fn replay(next: Next, request: RequestContext) -> Result<ApiResponse> {
	const KIND: StageKind = StageKind::Replay;

	let retry = request.retry();
	let span = StageSpan::new(KIND, "replay").with_attempt(retry.attempt);

	obs::record_stage_outcome(KIND, StageOutcome::Attempt);

	let result = span.instrument(next.run(retry)).await;

	match &result {
		Ok(_) => obs::record_stage_outcome(KIND, StageOutcome::Success),
		Err(_) => obs::record_stage_outcome(KIND, StageOutcome::Failure),
	}

	result
}

async fn replay_pending(next: Next, pending: Vec<PendingRequest>) {
	let replays = pending.into_iter().map(|PendingRequest { request, reply, .. }| {
		let next = next.clone();

		async move {
			let _ = reply.send(Wake::Settled(replay(next, request).await));
		}
	});

	future::join_all(replays).await;
}

async fn refresh_session(context: Arc<SessionContext>, next: Next) -> Result<(), SessionEndReason> {
	const KIND: StageKind = StageKind::Refresh;

	let span = StageSpan::new(KIND, "refresh_session");

	obs::record_stage_outcome(KIND, StageOutcome::Attempt);
	context.coordinator().metrics.record_attempt();

	match span.instrument(exchange(&context)).await {
		Ok(()) => {
			let coordinator = context.coordinator();

			coordinator.metrics.record_success();
			obs::record_stage_outcome(KIND, StageOutcome::Success);
			context.debug().refresh_succeeded();

			let pending = coordinator.settle(None);

			tracing::info!(queued = pending.len(), "Credentials refreshed.");

			if !pending.is_empty() {
				tokio::spawn(replay_pending(next, pending));
			}

			Ok(())
		},
		Err(reason) => {
			end_session(&context, reason.clone()).await;

			Err(reason)
		},
	}
}

async fn exchange(context: &SessionContext) -> Result<(), SessionEndReason> {
	let record = context.store().load().await.map_err(failed)?;
	let Some(refresh_token) = record.refresh_token else {
		return Err(SessionEndReason::MissingRefreshToken);
	};
	let url = context.config().refresh_url().map_err(failed)?;
	let request = RequestContext::new(HttpMethod::Post, url)
		.with_body(serde_json::json!({ "refresh_token": refresh_token.expose() }));
	let call = context.transport().execute(request);
	let response = match context.config().refresh_timeout {
		Some(limit) => tokio::time::timeout(limit.unsigned_abs(), call)
			.await
			.map_err(|_| SessionEndReason::RefreshTimedOut)?,
		None => call.await,
	}
	.map_err(failed)?;

	if !response.is_success() {
		return Err(SessionEndReason::RefreshRejected {
			status: response.status,
			message: rejection_message(&response),
		});
	}

	let grant = response.json::<RefreshGrant>().map_err(failed)?;

	context.store().save_credentials(grant.into()).await.map_err(failed)?;

	Ok(())
}

async fn end_session(context: &SessionContext, reason: SessionEndReason) {
	let coordinator = context.coordinator();

	coordinator.metrics.record_failure();
	obs::record_stage_outcome(StageKind::Refresh, StageOutcome::Failure);

	if let Err(e) = context.store().clear().await {
		tracing::error!(error = %e, "Failed to clear the credential store.");
	}
	// No refresh call is made without a refresh credential.
	if !matches!(reason, SessionEndReason::MissingRefreshToken) {
		context.debug().refresh_failed(reason.message());
	}

	let pending = coordinator.settle(Some(reason.clone()));

	tracing::warn!(%reason, queued = pending.len(), "Credential refresh failed; ending session.");

	for PendingRequest { original, reply, .. } in pending {
		let _ = reply.send(Wake::Settled(Err(Error::session_ended(reason.clone(), Some(original)))));
	}

	context.terminator().terminate(&reason).await;
}

fn failed(e: impl Display) -> SessionEndReason {
	SessionEndReason::RefreshFailed { message: e.to_string() }
}

fn rejection_message(response: &ApiResponse) -> String {
	["message", "error"]
		.iter()
		.find_map(|key| response.data.get(key).and_then(Value::as_str))
		.or_else(|| response.data.as_str())
		.filter(|message| !message.is_empty())
		.unwrap_or(&response.status_text)
		.to_owned()
}
