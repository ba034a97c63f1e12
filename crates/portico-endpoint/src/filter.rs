//! The per-request filter chain.
//!
//! Every endpoint runs the same fixed sequence of stages:
//!
//! | # | Stage | Purpose |
//! |---|-------|---------|
//! | 1 | [`InjectEndpointFilter`] | attach the endpoint to the exchange |
//! | 2 | [`InjectContextFilter`] | request id, span fields, context injectors |
//! | 3 | [`EndpointMetadataFilter`] | expose required permissions |
//! | - | endpoint middlewares | user supplied [`Filter`]s, in declaration order |
//! | 4 | [`InjectDecoderFilter`] | build the request data source |
//! | 5 | [`InjectEncoderFilter`] | create the response sink |
//! | 6 | [`ResponseFilter`] | after the inner stages: convert errors, populate outputs |
//! | 7 | [`RequestFilter`] | validate and populate inputs |
//! | 8 | [`ControllerFilter`] | call the handler |
//!
//! Middlewares cannot be placed between the fixed stages. A middleware that
//! does not call [`Next::run`] short-circuits the exchange; it should record
//! an error or a response on the context before returning.
//!
//! ```rust,ignore
//! let audit = FnFilter::new("audit", |ctx, next| {
//!     Box::pin(async move {
//!         tracing::info!(request_id = %ctx.request_id(), "audited");
//!         next.run(ctx).await;
//!     })
//! });
//! ```

use crate::context::{plain_text_response, ExchangeContext, RequiredPermissions, REQUEST_ID_HEADER};
use crate::convert::convert_error;
use crate::describe::RequestDescriber;
use crate::endpoint::Endpoint;
use crate::populate::OutputsPopulator;
use http::StatusCode;
use portico_codec::{
    HttpRequestDataSource, HttpResponseSink, RequestDecoder, RequestValidator,
};
use portico_core::{ObservedExchange, StatusError};
use portico_telemetry::logging::fields;
use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use uuid::Uuid;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A stage of the filter chain.
///
/// Filters receive the mutable exchange and a [`Next`] continuation. Calling
/// `next.run(ctx)` runs the rest of the chain; work placed after the call
/// sees the handler outcome.
pub trait Filter: Send + Sync + 'static {
    /// Name used in logs and [`EndpointPipeline::stage_names`](crate::EndpointPipeline::stage_names).
    fn name(&self) -> &'static str;

    /// Processes the exchange.
    fn process<'a>(&'a self, ctx: &'a mut ExchangeContext, next: Next<'a>) -> BoxFuture<'a, ()>;
}

/// Continuation running the remaining filters.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        filter: &'a dyn Filter,
        next: Box<Next<'a>>,
    },
    End,
}

impl<'a> Next<'a> {
    pub(crate) fn new(filter: &'a dyn Filter, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                filter,
                next: Box::new(next),
            },
        }
    }

    pub(crate) fn end() -> Self {
        Self {
            inner: NextInner::End,
        }
    }

    /// Runs the next filter. Consumes `self` so it runs at most once.
    pub async fn run(self, ctx: &mut ExchangeContext) {
        match self.inner {
            NextInner::Chain { filter, next } => filter.process(ctx, *next).await,
            NextInner::End => {}
        }
    }
}

/// A filter built from a closure.
pub struct FnFilter<F> {
    name: &'static str,
    func: F,
}

impl<F> FnFilter<F> {
    /// Wraps `func` under `name`.
    pub fn new(name: &'static str, func: F) -> Self
    where
        F: for<'a> Fn(&'a mut ExchangeContext, Next<'a>) -> BoxFuture<'a, ()>
            + Send
            + Sync
            + 'static,
    {
        Self { name, func }
    }
}

impl<F> Filter for FnFilter<F>
where
    F: for<'a> Fn(&'a mut ExchangeContext, Next<'a>) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(&'a self, ctx: &'a mut ExchangeContext, next: Next<'a>) -> BoxFuture<'a, ()> {
        (self.func)(ctx, next)
    }
}

fn injected_endpoint(ctx: &mut ExchangeContext) -> Option<Arc<Endpoint>> {
    let endpoint = ctx.endpoint().cloned();
    if endpoint.is_none() {
        ctx.set_error(StatusError::internal(anyhow::anyhow!(
            "Endpoint was not injected"
        )));
    }
    endpoint
}

/// Attaches the endpoint to the exchange.
pub struct InjectEndpointFilter {
    endpoint: Arc<Endpoint>,
}

impl InjectEndpointFilter {
    /// Injects `endpoint`.
    pub fn new(endpoint: Arc<Endpoint>) -> Self {
        Self { endpoint }
    }
}

impl Filter for InjectEndpointFilter {
    fn name(&self) -> &'static str {
        "inject_endpoint"
    }

    fn process<'a>(&'a self, ctx: &'a mut ExchangeContext, next: Next<'a>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            ctx.set_endpoint(Arc::clone(&self.endpoint));
            next.run(ctx).await;
        })
    }
}

/// Settles the request id and runs the endpoint's context injectors.
///
/// An incoming `X-Request-ID` is only adopted when trusted and when it is a
/// valid UUID; otherwise the generated UUID v7 stays.
#[derive(Debug, Clone, Copy, Default)]
pub struct InjectContextFilter {
    trust_request_id: bool,
}

impl InjectContextFilter {
    /// Creates the stage.
    #[must_use]
    pub const fn new(trust_request_id: bool) -> Self {
        Self { trust_request_id }
    }

    fn incoming_request_id(&self, ctx: &ExchangeContext) -> Option<Uuid> {
        if !self.trust_request_id {
            return None;
        }
        ctx.headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok())
    }
}

impl Filter for InjectContextFilter {
    fn name(&self) -> &'static str {
        "inject_context"
    }

    fn process<'a>(&'a self, ctx: &'a mut ExchangeContext, next: Next<'a>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if let Some(request_id) = self.incoming_request_id(ctx) {
                ctx.set_request_id(request_id.to_string());
            }
            tracing::Span::current().record(fields::REQUEST_ID, ctx.request_id());

            if let Some(endpoint) = ctx.endpoint().cloned() {
                for injector in endpoint.context_injectors() {
                    injector(ctx);
                }
            }

            portico_telemetry::log_request_start!(
                ctx.request_id(),
                ctx.method(),
                ctx.uri().path(),
                ctx.operation_id()
            );
            next.run(ctx).await;
        })
    }
}

/// Publishes endpoint metadata to the middlewares.
#[derive(Debug, Clone, Copy, Default)]
pub struct EndpointMetadataFilter;

impl Filter for EndpointMetadataFilter {
    fn name(&self) -> &'static str {
        "endpoint_metadata"
    }

    fn process<'a>(&'a self, ctx: &'a mut ExchangeContext, next: Next<'a>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let Some(endpoint) = injected_endpoint(ctx) else {
                return;
            };
            ctx.insert(RequiredPermissions(endpoint.permissions.clone()));
            next.run(ctx).await;
        })
    }
}

/// Builds the request data source, parsing multipart forms.
#[derive(Debug, Clone, Copy, Default)]
pub struct InjectDecoderFilter;

impl Filter for InjectDecoderFilter {
    fn name(&self) -> &'static str {
        "inject_decoder"
    }

    fn process<'a>(&'a self, ctx: &'a mut ExchangeContext, next: Next<'a>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let mut source = HttpRequestDataSource::new(
                ctx.method().clone(),
                ctx.uri().clone(),
                ctx.headers().clone(),
                ctx.body().clone(),
                ctx.path_params().clone(),
                ctx.codec().multipart.clone(),
            );
            source.load_multipart().await;
            ctx.source = Some(Arc::new(source));
            next.run(ctx).await;
        })
    }
}

/// Creates the response sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct InjectEncoderFilter;

impl Filter for InjectEncoderFilter {
    fn name(&self) -> &'static str {
        "inject_encoder"
    }

    fn process<'a>(&'a self, ctx: &'a mut ExchangeContext, next: Next<'a>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            ctx.sink = Some(HttpResponseSink::new());
            next.run(ctx).await;
        })
    }
}

/// Turns the handler outcome into the response.
///
/// Runs the inner stages first. Errors are converted with the endpoint's
/// converter, or the registry-backed default, before the outputs populator
/// renders them. A populator failure answers `500`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseFilter;

impl Filter for ResponseFilter {
    fn name(&self) -> &'static str {
        "response"
    }

    fn process<'a>(&'a self, ctx: &'a mut ExchangeContext, next: Next<'a>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            next.run(ctx).await;
            if ctx.has_response() {
                return;
            }

            let (Some(endpoint), Some(mut sink)) = (ctx.endpoint().cloned(), ctx.sink.take()) else {
                return;
            };

            let error = ctx
                .error
                .take()
                .map(|err| convert_error(endpoint.error_converter(), err));
            let outputs = ctx.outputs.take();
            let describer = ctx
                .source()
                .map(|source| RequestDescriber::from_source(source.as_ref()))
                .unwrap_or_default();
            let observer = Arc::clone(&ctx.observer);
            let method = ctx.method().clone();
            let path = ctx.uri().path().to_string();
            let request_id = ctx.request_id().to_string();

            let exchange = ObservedExchange {
                operation_id: &endpoint.operation_id,
                method: &method,
                path: &path,
                request_id: &request_id,
            };

            let mut populator = OutputsPopulator::new(&endpoint, exchange)
                .with_observer(observer.as_ref())
                .with_describer(&describer)
                .with_error_details(ctx.expose_error_details);
            if let Some(outputs) = outputs.as_deref() {
                populator = populator.with_outputs(outputs);
            }
            if let Some(err) = error {
                populator = populator.with_error(err);
            }

            let response = match populator.populate(&mut sink) {
                Ok(_) => sink.into_response(),
                Err(err) => {
                    tracing::error!(
                        request_id = %request_id,
                        operation_id = %endpoint.operation_id,
                        error = ?anyhow::Error::new(err),
                        "Failed to populate response"
                    );
                    plain_text_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Failed to populate response",
                    )
                }
            };
            ctx.set_response(response);
        })
    }
}

/// Validates and populates the inputs, rejecting bad requests with `400`
/// before the handler runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestFilter;

impl RequestFilter {
    fn populate_inputs(
        endpoint: &Endpoint,
        ctx: &ExchangeContext,
    ) -> anyhow::Result<Option<Box<dyn Any + Send>>> {
        let source = ctx
            .source()
            .ok_or_else(|| anyhow::anyhow!("Request data source was not injected"))?;
        let decoder = RequestDecoder::new(source.as_ref()).with_defaults(
            ctx.codec().default_content_type.as_str(),
            ctx.codec().default_content_encoding.as_str(),
        );

        let port = endpoint.request.port.as_deref();
        if let Some(failure) = RequestValidator::new(port, &decoder).validate_request()? {
            return Err(failure.into());
        }

        let (Some(binding), Some(port)) = (endpoint.request.binding, port) else {
            return Ok(None);
        };
        let inputs = binding.populate(port, &decoder)?;
        if let Some(validator) = &endpoint.request.validator {
            validator(inputs.as_ref())?;
        }
        Ok(Some(inputs))
    }
}

impl Filter for RequestFilter {
    fn name(&self) -> &'static str {
        "request"
    }

    fn process<'a>(&'a self, ctx: &'a mut ExchangeContext, next: Next<'a>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let Some(endpoint) = injected_endpoint(ctx) else {
                return;
            };

            match Self::populate_inputs(&endpoint, ctx) {
                Ok(inputs) => ctx.inputs = inputs,
                Err(err) => {
                    tracing::warn!(
                        request_id = %ctx.request_id(),
                        operation_id = %endpoint.operation_id,
                        error = %err,
                        "Request rejected"
                    );
                    if err.is::<StatusError>() {
                        ctx.set_error(err);
                    } else {
                        ctx.set_error(StatusError::bad_request(err));
                    }
                    return;
                }
            }
            next.run(ctx).await;
        })
    }
}

/// Calls the handler and records its outputs or error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerFilter;

impl Filter for ControllerFilter {
    fn name(&self) -> &'static str {
        "controller"
    }

    fn process<'a>(&'a self, ctx: &'a mut ExchangeContext, next: Next<'a>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let Some(endpoint) = injected_endpoint(ctx) else {
                return;
            };

            match endpoint.handler().call(ctx).await {
                Ok(outputs) => ctx.outputs = Some(outputs),
                Err(err) => {
                    tracing::debug!(
                        request_id = %ctx.request_id(),
                        error = %err,
                        "Handler failed"
                    );
                    ctx.error = Some(err);
                }
            }
            next.run(ctx).await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::Method;
    use portico_codec::CodecOptions;
    use portico_core::{CompositeResponseObserver, PathParams};

    fn context(uri: &str) -> ExchangeContext {
        let (parts, ()) = http::Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(REQUEST_ID_HEADER, "0191c8b4-8d1e-7c2a-9f00-000000000001")
            .body(())
            .unwrap()
            .into_parts();
        ExchangeContext::new(
            parts,
            Bytes::new(),
            PathParams::new(),
            CodecOptions::default(),
            Arc::new(CompositeResponseObserver::new()),
        )
    }

    struct Visit(&'static str);

    impl Filter for Visit {
        fn name(&self) -> &'static str {
            self.0
        }

        fn process<'a>(&'a self, ctx: &'a mut ExchangeContext, next: Next<'a>) -> BoxFuture<'a, ()> {
            Box::pin(async move {
                let mut visited = ctx.remove::<Vec<&'static str>>().unwrap_or_default();
                visited.push(self.0);
                ctx.insert(visited);
                next.run(ctx).await;
            })
        }
    }

    #[tokio::test]
    async fn test_chain_order() {
        let first = Visit("first");
        let second = Visit("second");
        let mut ctx = context("/devices");

        Next::new(&first, Next::new(&second, Next::end()))
            .run(&mut ctx)
            .await;

        assert_eq!(ctx.get::<Vec<&'static str>>().unwrap(), &["first", "second"]);
    }

    #[tokio::test]
    async fn test_fn_filter_short_circuits() {
        let deny = FnFilter::new("deny", |ctx, _next| {
            Box::pin(async move {
                ctx.set_error(StatusError::forbidden(anyhow::anyhow!("denied")));
            })
        });
        let after = Visit("after");
        let mut ctx = context("/devices");

        Next::new(&deny, Next::new(&after, Next::end()))
            .run(&mut ctx)
            .await;

        assert_eq!(deny.name(), "deny");
        assert!(ctx.error().is_some());
        assert!(ctx.get::<Vec<&'static str>>().is_none());
    }

    #[tokio::test]
    async fn test_request_id_trust() {
        let mut trusted = context("/devices");
        InjectContextFilter::new(true)
            .process(&mut trusted, Next::end())
            .await;
        assert_eq!(trusted.request_id(), "0191c8b4-8d1e-7c2a-9f00-000000000001");

        let mut untrusted = context("/devices");
        InjectContextFilter::new(false)
            .process(&mut untrusted, Next::end())
            .await;
        assert_ne!(untrusted.request_id(), "0191c8b4-8d1e-7c2a-9f00-000000000001");
    }

    #[tokio::test]
    async fn test_request_filter_requires_endpoint() {
        let mut ctx = context("/devices");
        RequestFilter.process(&mut ctx, Next::end()).await;
        assert_eq!(
            ctx.error().map(ToString::to_string).as_deref(),
            Some("Endpoint was not injected")
        );
    }

    #[tokio::test]
    async fn test_decoder_reads_query() {
        let mut ctx = context("/devices?page=2");
        InjectDecoderFilter.process(&mut ctx, Next::end()).await;
        let describer = RequestDescriber::from_source(ctx.source().unwrap().as_ref());
        assert_eq!(describer.parameters()["page"], "2");
    }
}
