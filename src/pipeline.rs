//! Middleware pipeline every outbound call travels through.
//!
//! A [`Pipeline`] is an ordered list of [`Middleware`] stages composed at startup and
//! terminated by an [`HttpTransport`]. Each stage receives the request plus a [`Next`] cursor
//! over the remaining stages; because [`Next`] is owned and cloneable, a stage may run the rest
//! of the chain more than once (the refresh stage replays requests this way).
//!
//! The end of the chain converts non-2xx responses into [`Error::Status`], so stages only see
//! `Ok` for 2xx responses.

pub mod credential;
pub mod record;
pub mod refresh;

pub use credential::CredentialStage;
pub use record::RecordStage;
pub use refresh::{RefreshCoordinator, RefreshMetrics, RefreshStage};

// self
use crate::{
	_prelude::*,
	http::{ApiResponse, HttpTransport, RequestContext},
};

/// Boxed future produced by pipeline stages.
pub type PipelineFuture<'a> = Pin<Box<dyn Future<Output = Result<ApiResponse>> + 'a + Send>>;

/// One `(request, next) -> response` stage.
pub trait Middleware
where
	Self: 'static + Send + Sync,
{
	/// Handles `request`, usually by delegating to `next` and inspecting the outcome.
	fn handle<'a>(&'a self, request: RequestContext, next: Next) -> PipelineFuture<'a>;
}

/// Owned cursor over the stages that follow the current one.
#[derive(Clone)]
pub struct Next {
	stages: Arc<[Arc<dyn Middleware>]>,
	transport: Arc<dyn HttpTransport>,
	position: usize,
}
impl Next {
	/// Runs the remaining stages, then the transport.
	pub fn run(self, request: RequestContext) -> PipelineFuture<'static> {
		match self.stages.get(self.position).cloned() {
			Some(stage) => {
				let next = Self { position: self.position + 1, ..self };

				Box::pin(async move { stage.handle(request, next).await })
			},
			None => Box::pin(async move {
				let response = self.transport.execute(request).await?;

				response.error_for_status()
			}),
		}
	}

	/// Number of stages still ahead of this cursor.
	pub fn remaining(&self) -> usize {
		self.stages.len().saturating_sub(self.position)
	}
}
impl Debug for Next {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Next").field("remaining", &self.remaining()).finish()
	}
}

/// Composed stage list plus terminal transport.
#[derive(Clone, Debug)]
pub struct Pipeline {
	head: Next,
}
impl Pipeline {
	/// Composes `stages` (outermost first) in front of `transport`.
	pub fn new(stages: Vec<Arc<dyn Middleware>>, transport: Arc<dyn HttpTransport>) -> Self {
		Self { head: Next { stages: stages.into(), transport, position: 0 } }
	}

	/// Runs `request` through every stage.
	pub fn execute(&self, request: RequestContext) -> PipelineFuture<'static> {
		self.head.clone().run(request)
	}

	/// Number of composed stages.
	pub fn len(&self) -> usize {
		self.head.remaining()
	}

	/// Returns `true` when requests go straight to the transport.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::http::{HttpMethod, TransportFuture};

	struct EchoTransport;
	impl HttpTransport for EchoTransport {
		fn execute(&self, request: RequestContext) -> TransportFuture<'_> {
			Box::pin(async move {
				let status = request.header("x-status").and_then(|s| s.parse().ok()).unwrap_or(200);
				let tags = request.header("x-tags").unwrap_or_default().to_owned();

				Ok(ApiResponse::new(status, Value::String(tags)))
			})
		}
	}

	struct Tag(&'static str);
	impl Middleware for Tag {
		fn handle<'a>(&'a self, request: RequestContext, next: Next) -> PipelineFuture<'a> {
			Box::pin(async move {
				let tags = match request.header("x-tags") {
					Some(existing) => format!("{existing},{}", self.0),
					None => self.0.to_owned(),
				};

				next.run(request.with_header("x-tags", tags)).await
			})
		}
	}

	fn request() -> RequestContext {
		RequestContext::new(
			HttpMethod::Get,
			Url::parse("https://api.example.com/guilds").expect("URL fixture should parse."),
		)
	}

	#[tokio::test]
	async fn stages_run_outermost_first() {
		let pipeline = Pipeline::new(
			vec![Arc::new(Tag("outer")), Arc::new(Tag("inner"))],
			Arc::new(EchoTransport),
		);
		let response =
			pipeline.execute(request()).await.expect("Echo transport should answer with 200.");

		assert_eq!(pipeline.len(), 2);
		assert_eq!(response.data, Value::from("outer,inner"));
	}

	#[tokio::test]
	async fn non_success_statuses_surface_as_status_errors() {
		let pipeline = Pipeline::new(Vec::new(), Arc::new(EchoTransport));
		let err = pipeline
			.execute(request().with_header("x-status", "503"))
			.await
			.expect_err("503 should be reported as an error.");

		assert!(pipeline.is_empty());
		assert_eq!(err.status_code(), Some(503));
	}
}
