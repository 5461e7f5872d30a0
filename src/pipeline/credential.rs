//! Bearer attachment.

// self
use crate::{
	_prelude::*,
	client::SessionContext,
	http::{AUTHORIZATION, RequestContext},
	pipeline::{Middleware, Next, PipelineFuture},
};

/// Reads the access credential at dispatch time and sets `authorization: Bearer <token>`.
///
/// The store is read for every attempt, so a replay after a refresh always carries the new
/// credential. Requests go out without the header when nothing is stored.
#[derive(Debug)]
pub struct CredentialStage {
	context: Arc<SessionContext>,
}
impl CredentialStage {
	/// Creates the stage over the shared session context.
	pub fn new(context: Arc<SessionContext>) -> Self {
		Self { context }
	}
}
impl Middleware for CredentialStage {
	fn handle<'a>(&'a self, request: RequestContext, next: Next) -> PipelineFuture<'a> {
		Box::pin(async move {
			let request = match self.context.access_token().await {
				Some(token) => request.with_header(AUTHORIZATION, token.bearer()),
				None => request,
			};

			next.run(request).await
		})
	}
}
