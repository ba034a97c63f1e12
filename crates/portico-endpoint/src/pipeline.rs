//! Running an endpoint for one HTTP request.
//!
//! # Example
//!
//! ```rust,ignore
//! let pipeline = EndpointPipeline::new(Arc::new(endpoint), PipelineConfig::default());
//! let response = pipeline.handle(request, PathParams::new()).await;
//! ```

use crate::context::ExchangeContext;
use crate::endpoint::Endpoint;
use crate::filter::{
    ControllerFilter, EndpointMetadataFilter, Filter, InjectContextFilter, InjectDecoderFilter,
    InjectEncoderFilter, InjectEndpointFilter, Next, RequestFilter, ResponseFilter,
};
use crate::EndpointError;
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::{BodyExt, Full};
use portico_codec::{ensure_schema_resolver, CodecOptions};
use portico_core::{CompositeResponseObserver, PathParams, ResponseObserver};
use portico_telemetry::{LoggingResponseObserver, TracingResponseObserver};
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;

/// Settings shared by every request of a pipeline.
#[derive(Clone)]
pub struct PipelineConfig {
    /// Codec defaults and form limits.
    pub codec: CodecOptions,
    /// Notified once per response.
    pub observer: Arc<dyn ResponseObserver>,
    /// Include error chains in enveloped error bodies.
    pub expose_error_details: bool,
    /// Adopt a valid incoming `X-Request-ID`.
    pub trust_request_id: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            codec: CodecOptions::default(),
            observer: Arc::new(
                CompositeResponseObserver::new()
                    .with(LoggingResponseObserver)
                    .with(TracingResponseObserver),
            ),
            expose_error_details: false,
            trust_request_id: false,
        }
    }
}

impl PipelineConfig {
    /// Replaces the observer.
    #[must_use]
    pub fn with_observer(mut self, observer: impl ResponseObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    /// Replaces the codec defaults.
    #[must_use]
    pub fn with_codec(mut self, codec: CodecOptions) -> Self {
        self.codec = codec;
        self
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("codec", &self.codec)
            .field("expose_error_details", &self.expose_error_details)
            .field("trust_request_id", &self.trust_request_id)
            .finish_non_exhaustive()
    }
}

/// The fixed filter chain of one endpoint.
pub struct EndpointPipeline {
    endpoint: Arc<Endpoint>,
    config: PipelineConfig,
    stages: Vec<Arc<dyn Filter>>,
}

impl EndpointPipeline {
    /// Assembles the chain for `endpoint`.
    pub fn new(endpoint: Arc<Endpoint>, config: PipelineConfig) -> Self {
        ensure_schema_resolver();

        let mut stages: Vec<Arc<dyn Filter>> = vec![
            Arc::new(InjectEndpointFilter::new(Arc::clone(&endpoint))),
            Arc::new(InjectContextFilter::new(config.trust_request_id)),
            Arc::new(EndpointMetadataFilter),
        ];
        stages.extend(endpoint.middlewares().iter().cloned());
        stages.extend([
            Arc::new(InjectDecoderFilter) as Arc<dyn Filter>,
            Arc::new(InjectEncoderFilter),
            Arc::new(ResponseFilter),
            Arc::new(RequestFilter),
            Arc::new(ControllerFilter),
        ]);

        Self {
            endpoint,
            config,
            stages,
        }
    }

    /// Returns the endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Arc<Endpoint> {
        &self.endpoint
    }

    /// Stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    fn build_chain(&self) -> Next<'_> {
        self.stages
            .iter()
            .rev()
            .fold(Next::end(), |next, stage| Next::new(stage.as_ref(), next))
    }

    /// Handles one request.
    ///
    /// Path parameters are taken from `path_params`, or extracted with the
    /// endpoint's [`PathTemplate`] when the router supplied none.
    pub async fn handle(
        &self,
        request: Request<Full<Bytes>>,
        path_params: PathParams,
    ) -> Response<Full<Bytes>> {
        let (parts, body) = request.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        };

        let path_params = if path_params.is_empty() {
            self.endpoint
                .template()
                .captures(parts.uri.path())
                .unwrap_or_default()
        } else {
            path_params
        };

        let span = tracing::info_span!(
            "request",
            operation_id = %self.endpoint.operation_id,
            http.method = %parts.method,
            http.path = %parts.uri.path(),
            request_id = tracing::field::Empty,
            http.status_code = tracing::field::Empty,
            error = tracing::field::Empty,
        );

        async move {
            let mut ctx = ExchangeContext::new(
                parts,
                body,
                path_params,
                self.config.codec.clone(),
                Arc::clone(&self.config.observer),
            );
            ctx.expose_error_details = self.config.expose_error_details;

            self.build_chain().run(&mut ctx).await;

            tracing::debug!(
                request_id = %ctx.request_id(),
                duration_ms = ctx.elapsed().as_millis() as u64,
                "Request completed"
            );
            ctx.into_response()
        }
        .instrument(span)
        .await
    }
}

impl fmt::Debug for EndpointPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointPipeline")
            .field("operation_id", &self.endpoint.operation_id)
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}

/// A compiled endpoint path such as `/devices/{deviceId}/ports/{port}`.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    path: String,
    regex: Regex,
    names: Vec<String>,
}

impl PathTemplate {
    /// Compiles `path`. Each `{name}` matches one non-empty segment.
    pub fn parse(path: &str) -> Result<Self, EndpointError> {
        let invalid = |message: &str| EndpointError::InvalidPath {
            path: path.to_string(),
            message: message.to_string(),
        };

        let mut pattern = String::from("^");
        let mut names = Vec::new();
        let mut rest = path;
        while let Some(open) = rest.find('{') {
            let (literal, tail) = rest.split_at(open);
            if literal.contains('}') {
                return Err(invalid("unmatched '}'"));
            }
            pattern.push_str(&regex::escape(literal));

            let close = tail.find('}').ok_or_else(|| invalid("unclosed '{'"))?;
            let name = &tail[1..close];
            if name.is_empty() || name.contains(['{', '/']) {
                return Err(invalid("invalid parameter name"));
            }
            if names.iter().any(|existing| existing == name) {
                return Err(invalid("duplicate parameter name"));
            }
            names.push(name.to_string());
            pattern.push_str("([^/]+)");
            rest = &tail[close + 1..];
        }
        if rest.contains('}') {
            return Err(invalid("unmatched '}'"));
        }
        pattern.push_str(&regex::escape(rest.trim_end_matches('/')));
        pattern.push_str("/?$");

        let regex = Regex::new(&pattern).map_err(|err| invalid(&err.to_string()))?;
        Ok(Self {
            path: path.to_string(),
            regex,
            names,
        })
    }

    /// Returns the template text.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Parameter names in order of appearance.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Extracts the parameters from `path`, `None` when it does not match.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<PathParams> {
        let captures = self.regex.captures(path)?;
        let mut params = PathParams::new();
        for (index, name) in self.names.iter().enumerate() {
            if let Some(value) = captures.get(index + 1) {
                params.push(name.clone(), value.as_str());
            }
        }
        Some(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::REQUEST_ID_HEADER;
    use crate::describe::RequestDescriber;
    use crate::filter::FnFilter;
    use crate::handler::RequestData;
    use http::{Method, StatusCode};
    use portico_core::StatusError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request(method: Method, uri: &str, body: &'static str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    async fn body_text(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_path_template() {
        let template = PathTemplate::parse("/devices/{deviceId}/ports/{port}").unwrap();
        assert_eq!(template.names(), ["deviceId", "port"]);

        let params = template.captures("/devices/d-7/ports/eth0").unwrap();
        assert_eq!(params.get("deviceId"), Some("d-7"));
        assert_eq!(params.get("port"), Some("eth0"));
        assert!(template.captures("/devices/d-7/ports/eth0/").is_some());
        assert!(template.captures("/devices/d-7").is_none());
        assert!(template.captures("/devices//ports/eth0").is_none());

        let literal = PathTemplate::parse("/health.json").unwrap();
        assert!(literal.captures("/health.json").is_some());
        assert!(literal.captures("/healthxjson").is_none());
    }

    #[test]
    fn test_path_template_rejects_malformed() {
        for path in ["/devices/{id", "/devices/id}", "/devices/{}", "/a/{id}/b/{id}"] {
            assert!(
                matches!(PathTemplate::parse(path), Err(EndpointError::InvalidPath { .. })),
                "{path}"
            );
        }
    }

    #[test]
    fn test_stage_order() {
        async fn noop() -> anyhow::Result<()> {
            Ok(())
        }
        let audit = FnFilter::new("audit", |ctx, next| Box::pin(next.run(ctx)));
        let endpoint = Endpoint::builder(Method::GET, "/devices")
            .middleware(audit)
            .handler(noop)
            .build()
            .unwrap();
        let pipeline = EndpointPipeline::new(Arc::new(endpoint), PipelineConfig::default());
        assert_eq!(
            pipeline.stage_names(),
            [
                "inject_endpoint",
                "inject_context",
                "endpoint_metadata",
                "audit",
                "inject_decoder",
                "inject_encoder",
                "response",
                "request",
                "controller",
            ]
        );
    }

    #[tokio::test]
    async fn test_handle_no_content() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        async fn touch(describer: RequestDescriber) -> anyhow::Result<()> {
            anyhow::ensure!(describer.parameters()["deviceId"] == "d-7");
            CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        let endpoint = Endpoint::builder(Method::PUT, "/devices/{deviceId}")
            .operation_id("touchDevice")
            .handler(touch)
            .build()
            .unwrap();
        let pipeline = EndpointPipeline::new(Arc::new(endpoint), PipelineConfig::default());

        let response = pipeline
            .handle(request(Method::PUT, "/devices/d-7", ""), PathParams::new())
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handler_error_rendered() {
        async fn missing(data: RequestData) -> anyhow::Result<()> {
            let path = data.source().uri().path().to_string();
            Err(StatusError::not_found(anyhow::anyhow!("nothing at {path}")).into())
        }

        let endpoint = Endpoint::builder(Method::GET, "/devices/{id}")
            .handler(missing)
            .build()
            .unwrap();
        let pipeline = EndpointPipeline::new(Arc::new(endpoint), PipelineConfig::default());

        let response = pipeline
            .handle(request(Method::GET, "/devices/9", ""), PathParams::new())
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["content-type"], "application/json");
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["code"], "UNKNOWN");
        assert_eq!(body["message"], "nothing at /devices/9");
    }

    #[tokio::test]
    async fn test_middleware_short_circuit_skips_handler() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        async fn guarded() -> anyhow::Result<()> {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        let deny = FnFilter::new("deny", |ctx, _next| {
            Box::pin(async move {
                ctx.set_error(StatusError::forbidden(anyhow::anyhow!("Forbidden")));
            })
        });

        let endpoint = Endpoint::builder(Method::DELETE, "/devices/{id}")
            .permission_any_of(["DELETE_DEVICE"])
            .middleware(deny)
            .handler(guarded)
            .build()
            .unwrap();
        let pipeline = EndpointPipeline::new(Arc::new(endpoint), PipelineConfig::default());

        let response = pipeline
            .handle(request(Method::DELETE, "/devices/9", ""), PathParams::new())
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_text(response).await, "Forbidden");
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
    }
}
