//! Debug log recording for every dispatch attempt.

// std
use std::time::Instant;
// self
use crate::{
	_prelude::*,
	debug::{DebugStore, RequestLogEntry},
	http::{ApiResponse, RequestContext},
	obs::{self, StageKind, StageOutcome, StageSpan},
	pipeline::{Middleware, Next, PipelineFuture},
};

/// Opens a debug entry when an attempt is dispatched and completes it exactly once.
///
/// An attempt whose future is dropped before it settles is completed as cancelled.
#[derive(Debug)]
pub struct RecordStage {
	debug: DebugStore,
}
impl RecordStage {
	/// Creates the stage writing into `debug`.
	pub fn new(debug: DebugStore) -> Self {
		Self { debug }
	}
}
impl Middleware for RecordStage {
	fn handle<'a>(&'a self, request: RequestContext, next: Next) -> PipelineFuture<'a> {
		const KIND: StageKind = StageKind::Dispatch;

		Box::pin(async move {
			let span = StageSpan::new(KIND, "dispatch").with_attempt(request.attempt);
			let entry = OpenEntry {
				debug: self.debug.clone(),
				entry: Some(self.debug.request_started(request.method, request.url.as_str())),
				started: Instant::now(),
			};

			obs::record_stage_outcome(KIND, StageOutcome::Attempt);
			tracing::debug!(method = %request.method, url = %request.url, "Dispatching request.");

			let result = span.instrument(next.run(request)).await;

			match &result {
				Ok(_) => obs::record_stage_outcome(KIND, StageOutcome::Success),
				Err(_) => obs::record_stage_outcome(KIND, StageOutcome::Failure),
			}

			entry.finish(&result);

			result
		})
	}
}

struct OpenEntry {
	debug: DebugStore,
	entry: Option<RequestLogEntry>,
	started: Instant,
}
impl OpenEntry {
	fn finish(mut self, result: &Result<ApiResponse>) {
		let Some(open) = self.entry.take() else {
			return;
		};
		let elapsed = self.started.elapsed();

		match result {
			Ok(response) =>
				self.debug.request_succeeded(open, response.status, &response.status_text, elapsed),
			Err(e) => {
				let response = e.response();

				tracing::debug!(error = %e, url = %open.url, "Request failed.");
				self.debug.request_failed(
					open,
					response.map(|response| response.status),
					response.map(|response| response.status_text.clone()),
					e.to_string(),
					elapsed,
				);
			},
		}
	}
}
impl Drop for OpenEntry {
	fn drop(&mut self) {
		if let Some(open) = self.entry.take() {
			self.debug.request_failed(open, None, None, "Request cancelled.", self.started.elapsed());
		}
	}
}
