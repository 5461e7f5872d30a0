//! Request contract, response shape, and transport primitives.
//!
//! Callers describe a call with [`ApiRequest`]; the pipeline turns it into one
//! [`RequestContext`] per dispatch attempt and hands the final context to an
//! [`HttpTransport`]. Transports return every response they receive, whatever its status;
//! the end of the pipeline decides which statuses count as failures.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	error::{ConfigError, TransportError},
};

/// Header carrying the JSON content type on every outbound call.
pub const CONTENT_TYPE: &str = "content-type";
/// Header carrying the bearer credential.
pub const AUTHORIZATION: &str = "authorization";
/// Content type used for every request body.
pub const APPLICATION_JSON: &str = "application/json";

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// The network: executes one fully prepared request.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by every
/// in-flight request, including replays driven from background tasks. A returned
/// [`ApiResponse`] means the backend answered; `Err` means no response was received.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and returns the backend's response regardless of its status.
	fn execute(&self, request: RequestContext) -> TransportFuture<'_>;
}

/// HTTP verbs used by the console.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
	/// `HEAD`
	Head,
	/// `OPTIONS`
	Options,
}
impl HttpMethod {
	/// Returns the canonical upper-case verb.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Patch => "PATCH",
			Self::Delete => "DELETE",
			Self::Head => "HEAD",
			Self::Options => "OPTIONS",
		}
	}
}
impl Display for HttpMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
#[cfg(feature = "reqwest")]
impl From<HttpMethod> for reqwest::Method {
	fn from(method: HttpMethod) -> Self {
		match method {
			HttpMethod::Get => Self::GET,
			HttpMethod::Post => Self::POST,
			HttpMethod::Put => Self::PUT,
			HttpMethod::Patch => Self::PATCH,
			HttpMethod::Delete => Self::DELETE,
			HttpMethod::Head => Self::HEAD,
			HttpMethod::Options => Self::OPTIONS,
		}
	}
}

/// A call as written by UI code: verb, target, optional JSON body, extra headers.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
	/// HTTP verb.
	pub method: HttpMethod,
	/// Absolute URL or path relative to the configured base.
	pub target: String,
	/// JSON body, if any.
	pub body: Option<Value>,
	/// Extra headers keyed by lower-case name.
	pub headers: BTreeMap<String, String>,
}
impl ApiRequest {
	/// Creates a request without body or extra headers.
	pub fn new(method: HttpMethod, target: impl Into<String>) -> Self {
		Self { method, target: target.into(), body: None, headers: BTreeMap::new() }
	}

	/// Shorthand for a `GET` request.
	pub fn get(target: impl Into<String>) -> Self {
		Self::new(HttpMethod::Get, target)
	}

	/// Attaches an already-built JSON body.
	pub fn body(mut self, body: Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Serializes `payload` into the JSON body.
	pub fn json<T>(self, payload: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		let body = serde_json::to_value(payload).map_err(|source| Error::Encode { source })?;

		Ok(self.body(body))
	}

	/// Adds or replaces an extra header.
	pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());

		self
	}

	/// Resolves the target and produces the first dispatch attempt.
	pub fn into_context(self, config: &ClientConfig) -> Result<RequestContext, ConfigError> {
		let url = config.resolve(&self.target)?;
		let mut context = RequestContext::new(self.method, url);

		context.headers.extend(self.headers);
		context.body = self.body;

		Ok(context)
	}
}

/// One dispatch attempt flowing through the pipeline.
///
/// Contexts are values: stages that change a request pass a modified copy downstream, and a
/// retry is a fresh context with [`attempt`](RequestContext::attempt) incremented.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestContext {
	/// HTTP verb.
	pub method: HttpMethod,
	/// Fully-qualified target.
	pub url: Url,
	/// Outbound headers keyed by lower-case name.
	pub headers: BTreeMap<String, String>,
	/// JSON body, if any.
	pub body: Option<Value>,
	/// Zero for the original dispatch, incremented for every retry.
	pub attempt: u32,
	/// Credential generation observed when this attempt entered the pipeline.
	pub generation: u64,
}
impl RequestContext {
	/// Creates the first attempt for `method` + `url` with the JSON content type set.
	pub fn new(method: HttpMethod, url: Url) -> Self {
		let mut headers = BTreeMap::new();

		headers.insert(CONTENT_TYPE.into(), APPLICATION_JSON.into());

		Self { method, url, headers, body: None, attempt: 0, generation: 0 }
	}

	/// Returns a header value by case-insensitive name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}

	/// Returns a copy with the header set.
	pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());

		self
	}

	/// Returns a copy with the JSON body set.
	pub fn with_body(mut self, body: Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Returns a copy stamped with a credential generation.
	pub fn with_generation(mut self, generation: u64) -> Self {
		self.generation = generation;

		self
	}

	/// Returns the next attempt of this request.
	pub fn retry(&self) -> Self {
		Self { attempt: self.attempt.saturating_add(1), ..self.clone() }
	}

	/// Returns `true` once this request has already been retried.
	pub fn is_retry(&self) -> bool {
		self.attempt > 0
	}
}

/// Backend response: `{ data, status, headers }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Reason phrase accompanying the status.
	pub status_text: String,
	/// Response headers keyed by lower-case name.
	pub headers: BTreeMap<String, String>,
	/// Parsed JSON body; `Null` when empty, a string when the body is not JSON.
	pub data: Value,
}
impl ApiResponse {
	/// Creates a response with the canonical reason phrase and no headers.
	pub fn new(status: u16, data: Value) -> Self {
		Self {
			status,
			status_text: reason_phrase(status).into(),
			headers: BTreeMap::new(),
			data,
		}
	}

	/// Builds a response from raw body bytes.
	pub fn from_body(
		status: u16,
		status_text: impl Into<String>,
		headers: BTreeMap<String, String>,
		body: &[u8],
	) -> Self {
		let data = if body.iter().all(u8::is_ascii_whitespace) {
			Value::Null
		} else {
			serde_json::from_slice(body)
				.unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
		};

		Self { status, status_text: status_text.into(), headers, data }
	}

	/// Returns a copy with the header set.
	pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());

		self
	}

	/// Returns `true` for any 2xx status.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns `true` for the status that triggers the refresh protocol.
	pub fn is_unauthorized(&self) -> bool {
		self.status == 401
	}

	/// Decodes the body into `T`, reporting the failing JSON path on mismatch.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		serde_path_to_error::deserialize(&self.data).map_err(|source| Error::Decode { source })
	}

	/// Converts a non-2xx response into [`Error::Status`].
	pub fn error_for_status(self) -> Result<Self> {
		if self.is_success() { Ok(self) } else { Err(Error::status(self)) }
	}
}

/// Canonical reason phrase for the statuses the console backend emits.
pub fn reason_phrase(status: u16) -> &'static str {
	match status {
		200 => "OK",
		201 => "Created",
		202 => "Accepted",
		204 => "No Content",
		400 => "Bad Request",
		401 => "Unauthorized",
		403 => "Forbidden",
		404 => "Not Found",
		409 => "Conflict",
		422 => "Unprocessable Entity",
		429 => "Too Many Requests",
		500 => "Internal Server Error",
		502 => "Bad Gateway",
		503 => "Service Unavailable",
		504 => "Gateway Timeout",
		_ => "",
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl std::ops::Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: RequestContext) -> TransportFuture<'_> {
		Box::pin(async move {
			let mut builder = self.0.request(request.method.into(), request.url);

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = &request.body {
				builder = builder.json(body);
			}

			let response = builder.send().await?;
			let status = response.status();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
				})
				.collect();
			let body = response.bytes().await?;

			Ok(ApiResponse::from_body(
				status.as_u16(),
				status.canonical_reason().unwrap_or_default(),
				headers,
				&body,
			))
		})
	}
}
