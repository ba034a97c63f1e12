//! Per-request state carried through the filter chain.
//!
//! An [`ExchangeContext`] is created fresh for every request by the
//! [`EndpointPipeline`](crate::EndpointPipeline) and dropped once the response
//! is built. Filters enrich it in order: the endpoint, request id and
//! extensions first, then the data source and response sink, then the
//! decoded inputs, and finally the handler outputs or error.

use crate::endpoint::Endpoint;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method, Response, StatusCode, Uri, Version};
use http_body_util::Full;
use portico_codec::{CodecOptions, HttpRequestDataSource, HttpResponseSink, OutputPort};
use portico_core::{PathParams, ResponseObserver, StatusCodeProvider, StatusError};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// State of one request flowing through the filter chain.
pub struct ExchangeContext {
    request_id: String,
    endpoint: Option<Arc<Endpoint>>,
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    path_params: PathParams,
    pub(crate) source: Option<Arc<HttpRequestDataSource>>,
    pub(crate) sink: Option<HttpResponseSink>,
    pub(crate) inputs: Option<Box<dyn Any + Send>>,
    pub(crate) outputs: Option<Box<dyn OutputPort>>,
    pub(crate) error: Option<anyhow::Error>,
    pub(crate) response: Option<Response<Full<Bytes>>>,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    pub(crate) codec: CodecOptions,
    pub(crate) observer: Arc<dyn ResponseObserver>,
    pub(crate) expose_error_details: bool,
    started_at: Instant,
}

impl ExchangeContext {
    /// Creates a context for an inbound request with a fresh request id.
    pub fn new(
        parts: http::request::Parts,
        body: Bytes,
        path_params: PathParams,
        codec: CodecOptions,
        observer: Arc<dyn ResponseObserver>,
    ) -> Self {
        Self {
            request_id: Uuid::now_v7().to_string(),
            endpoint: None,
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body,
            path_params,
            source: None,
            sink: None,
            inputs: None,
            outputs: None,
            error: None,
            response: None,
            extensions: HashMap::new(),
            codec,
            observer,
            expose_error_details: false,
            started_at: Instant::now(),
        }
    }

    /// Returns the request id.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub(crate) fn set_request_id(&mut self, request_id: impl Into<String>) {
        self.request_id = request_id.into();
    }

    /// Returns the endpoint once injected.
    #[must_use]
    pub fn endpoint(&self) -> Option<&Arc<Endpoint>> {
        self.endpoint.as_ref()
    }

    pub(crate) fn set_endpoint(&mut self, endpoint: Arc<Endpoint>) {
        self.endpoint = Some(endpoint);
    }

    /// Returns the operation id, empty before the endpoint is injected.
    #[must_use]
    pub fn operation_id(&self) -> &str {
        self.endpoint
            .as_ref()
            .map_or("", |endpoint| endpoint.operation_id.as_str())
    }

    /// Returns the request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the buffered request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the path parameters.
    #[must_use]
    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// Returns the request data source once injected.
    #[must_use]
    pub fn source(&self) -> Option<&Arc<HttpRequestDataSource>> {
        self.source.as_ref()
    }

    /// Returns the codec defaults for this request.
    #[must_use]
    pub fn codec(&self) -> &CodecOptions {
        &self.codec
    }

    /// Rebuilds the request head without its extensions.
    #[must_use]
    pub fn parts(&self) -> http::request::Parts {
        let (mut parts, ()) = http::Request::new(()).into_parts();
        parts.method = self.method.clone();
        parts.uri = self.uri.clone();
        parts.version = self.version;
        parts.headers = self.headers.clone();
        parts
    }

    /// Returns the error recorded so far.
    #[must_use]
    pub fn error(&self) -> Option<&anyhow::Error> {
        self.error.as_ref()
    }

    /// Records an error, replacing any earlier one.
    pub fn set_error(&mut self, err: impl Into<anyhow::Error>) {
        self.error = Some(err.into());
    }

    /// Returns true once a response was produced.
    #[must_use]
    pub fn has_response(&self) -> bool {
        self.response.is_some()
    }

    /// Short-circuits the exchange with a ready response.
    pub fn set_response(&mut self, response: Response<Full<Bytes>>) {
        self.response = Some(response);
    }

    /// Time elapsed since the exchange started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Inserts a typed extension, replacing any value of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Returns a typed extension.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    /// Removes a typed extension.
    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }

    /// Returns a cheap snapshot of the request for handlers.
    #[must_use]
    pub fn request_context(&self) -> RequestContext {
        RequestContext {
            request_id: self.request_id.clone(),
            operation_id: self.operation_id().to_string(),
            method: self.method.clone(),
            uri: self.uri.clone(),
            headers: self.headers.clone(),
            permissions: self
                .get::<RequiredPermissions>()
                .map(|required| required.0.clone())
                .unwrap_or_default(),
        }
    }

    /// Builds the final response.
    ///
    /// A response set by a filter wins. Otherwise a pending error becomes a
    /// plain-text response carrying its status, and an exchange that never
    /// reached the encoder yields `500`.
    pub(crate) fn into_response(mut self) -> Response<Full<Bytes>> {
        let mut response = match (self.response.take(), self.error.take()) {
            (Some(response), _) => response,
            (None, Some(err)) => {
                let status = err
                    .downcast_ref::<StatusError>()
                    .map_or(StatusCode::INTERNAL_SERVER_ERROR, StatusCodeProvider::status_code);
                plain_text_response(status, &err.to_string())
            }
            (None, None) => match self.sink.take() {
                Some(sink) => sink.into_response(),
                None => plain_text_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "No response was produced",
                ),
            },
        };

        if let Ok(value) = HeaderValue::from_str(&self.request_id) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }
        response
    }
}

impl fmt::Debug for ExchangeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeContext")
            .field("request_id", &self.request_id)
            .field("operation_id", &self.operation_id())
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("has_inputs", &self.inputs.is_some())
            .field("has_outputs", &self.outputs.is_some())
            .field("error", &self.error.as_ref().map(ToString::to_string))
            .field("extensions", &self.extensions.len())
            .finish_non_exhaustive()
    }
}

/// Builds a `text/plain` response.
pub(crate) fn plain_text_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(message.to_string())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Permissions required by the endpoint, any of which grants access.
///
/// Inserted as an extension before middlewares run so an authorization
/// middleware can enforce it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredPermissions(pub Vec<String>);

impl RequiredPermissions {
    /// Returns true when `granted` holds any required permission, or when
    /// nothing is required.
    #[must_use]
    pub fn is_satisfied_by<S: AsRef<str>>(&self, granted: &[S]) -> bool {
        self.0.is_empty()
            || granted
                .iter()
                .any(|permission| self.0.iter().any(|required| required == permission.as_ref()))
    }
}

/// Request metadata handed to handlers.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Request id.
    pub request_id: String,
    /// Operation id of the endpoint.
    pub operation_id: String,
    /// Request method.
    pub method: Method,
    /// Request URI.
    pub uri: Uri,
    /// Request headers.
    pub headers: HeaderMap,
    /// Permissions required by the endpoint.
    pub permissions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use portico_core::CompositeResponseObserver;

    fn context() -> ExchangeContext {
        let (parts, ()) = http::Request::builder()
            .method(Method::POST)
            .uri("/devices?page=1")
            .header("x-tenant", "acme")
            .body(())
            .unwrap()
            .into_parts();
        ExchangeContext::new(
            parts,
            Bytes::from_static(b"{}"),
            PathParams::new(),
            CodecOptions::default(),
            Arc::new(CompositeResponseObserver::new()),
        )
    }

    #[test]
    fn test_request_id_is_uuid() {
        let ctx = context();
        assert!(Uuid::parse_str(ctx.request_id()).is_ok());
        assert_eq!(ctx.operation_id(), "");
    }

    #[test]
    fn test_extensions() {
        let mut ctx = context();
        ctx.insert(RequiredPermissions(vec!["DEVICE_READ".into()]));
        assert_eq!(
            ctx.get::<RequiredPermissions>().map(|p| p.0.len()),
            Some(1)
        );
        assert_eq!(ctx.request_context().permissions, ["DEVICE_READ"]);
        assert!(ctx.remove::<RequiredPermissions>().is_some());
        assert!(ctx.get::<RequiredPermissions>().is_none());
    }

    #[test]
    fn test_parts_rebuilt() {
        let ctx = context();
        let parts = ctx.parts();
        assert_eq!(parts.method, Method::POST);
        assert_eq!(parts.uri.query(), Some("page=1"));
        assert_eq!(parts.headers["x-tenant"], "acme");
    }

    #[test]
    fn test_permissions_satisfied() {
        let required = RequiredPermissions(vec!["A".into(), "B".into()]);
        assert!(required.is_satisfied_by(&["B"]));
        assert!(!required.is_satisfied_by(&["C"]));
        assert!(RequiredPermissions::default().is_satisfied_by::<&str>(&[]));
    }

    #[tokio::test]
    async fn test_error_without_encoder() {
        let mut ctx = context();
        ctx.set_error(StatusError::not_found(anyhow::anyhow!("missing")));
        let request_id = ctx.request_id().to_string();

        let response = ctx.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[REQUEST_ID_HEADER], request_id.as_str());
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"missing");
    }

    #[test]
    fn test_no_response() {
        let response = context().into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
