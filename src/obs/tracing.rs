// crates.io
use tracing::{Instrument, instrument::Instrumented};
// self
use crate::{_prelude::*, obs::StageKind};

/// A span builder used by pipeline stages.
#[derive(Clone, Debug)]
pub struct StageSpan {
	span: tracing::Span,
}
impl StageSpan {
	/// Creates a new span tagged with the provided stage + operation.
	pub fn new(kind: StageKind, operation: &'static str) -> Self {
		let span = tracing::info_span!(
			"console_client.pipeline",
			stage = kind.as_str(),
			operation,
			attempt = tracing::field::Empty
		);

		Self { span }
	}

	/// Records the request attempt being handled by this span.
	pub fn with_attempt(self, attempt: u32) -> Self {
		self.span.record("attempt", attempt);

		self
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		fut.instrument(self.span.clone())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = StageSpan::new(StageKind::Refresh, "instrument_wraps_future");
		let value = StageSpan::instrument(&span, async { 42 }).await;

		assert_eq!(value, 42);
	}
}
