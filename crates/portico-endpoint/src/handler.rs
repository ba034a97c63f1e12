//! Adapting async functions into endpoint handlers.
//!
//! Any `async fn` whose arguments all implement [`FromExchange`] and whose
//! return type implements [`IntoHandlerResult`] is a [`Handler`]:
//!
//! ```rust,ignore
//! async fn get_device(
//!     ctx: RequestContext,
//!     Inputs(inputs): Inputs<GetDeviceInputs>,
//! ) -> anyhow::Result<GetDeviceOutputs> {
//!     tracing::debug!(request_id = %ctx.request_id, "Loading device");
//!     Ok(GetDeviceOutputs { body: load(inputs.device_id).await? })
//! }
//! ```
//!
//! Argument types that cannot be produced from the exchange are rejected by
//! the compiler, so an endpoint never fails at request time for an
//! unresolvable signature.

use crate::context::{ExchangeContext, RequestContext};
use crate::describe::RequestDescriber;
use crate::endpoint::{InputBinding, ResponsePort};
use crate::filter::BoxFuture;
use portico_codec::{HttpRequestDataSource, InputPort, OutputPort, RequestDecoder};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Result of a handler call once its outputs are type-erased.
pub type HandlerResult = Result<Box<dyn OutputPort>, anyhow::Error>;

/// Values a handler can receive as an argument.
pub trait FromExchange: Sized + Send + 'static {
    /// Produces the argument from the exchange.
    fn from_exchange(ctx: &mut ExchangeContext) -> anyhow::Result<Self>;

    /// Input port this argument binds, if any.
    fn input_binding() -> Option<InputBinding> {
        None
    }
}

impl FromExchange for RequestContext {
    fn from_exchange(ctx: &mut ExchangeContext) -> anyhow::Result<Self> {
        Ok(ctx.request_context())
    }
}

impl FromExchange for RequestDescriber {
    fn from_exchange(ctx: &mut ExchangeContext) -> anyhow::Result<Self> {
        let source = ctx
            .source()
            .ok_or_else(|| anyhow::anyhow!("Request data source was not injected"))?;
        Ok(Self::from_source(source.as_ref()))
    }
}

impl FromExchange for http::request::Parts {
    fn from_exchange(ctx: &mut ExchangeContext) -> anyhow::Result<Self> {
        Ok(ctx.parts())
    }
}

/// The populated input port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inputs<T>(pub T);

impl<T: InputPort> FromExchange for Inputs<T> {
    fn from_exchange(ctx: &mut ExchangeContext) -> anyhow::Result<Self> {
        let inputs = ctx
            .inputs
            .take()
            .ok_or_else(|| anyhow::anyhow!("Request inputs were not populated"))?;
        inputs
            .downcast::<T>()
            .map(|inputs| Self(*inputs))
            .map_err(|_| {
                anyhow::anyhow!(
                    "Request inputs are not of type {}",
                    std::any::type_name::<T>()
                )
            })
    }

    fn input_binding() -> Option<InputBinding> {
        Some(InputBinding::of::<T>())
    }
}

/// Direct access to the request data, for handlers decoding by hand.
#[derive(Debug, Clone)]
pub struct RequestData {
    source: Arc<HttpRequestDataSource>,
    content_type: String,
    content_encoding: String,
}

impl RequestData {
    /// Returns the data source.
    #[must_use]
    pub fn source(&self) -> &HttpRequestDataSource {
        &self.source
    }

    /// Returns a decoder using the endpoint's codec defaults.
    #[must_use]
    pub fn decoder(&self) -> RequestDecoder<'_> {
        RequestDecoder::new(self.source.as_ref())
            .with_defaults(self.content_type.as_str(), self.content_encoding.as_str())
    }
}

impl FromExchange for RequestData {
    fn from_exchange(ctx: &mut ExchangeContext) -> anyhow::Result<Self> {
        let source = ctx
            .source()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Request data source was not injected"))?;
        Ok(Self {
            source,
            content_type: ctx.codec().default_content_type.clone(),
            content_encoding: ctx.codec().default_content_encoding.clone(),
        })
    }
}

/// A typed extension inserted by a middleware or context injector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension<T>(pub T);

impl<T: Clone + Send + Sync + 'static> FromExchange for Extension<T> {
    fn from_exchange(ctx: &mut ExchangeContext) -> anyhow::Result<Self> {
        ctx.get::<T>().cloned().map(Self).ok_or_else(|| {
            anyhow::anyhow!(
                "Missing request extension {}",
                std::any::type_name::<T>()
            )
        })
    }
}

/// Handler return values.
pub trait IntoHandlerResult: Send + 'static {
    /// Output port produced on success.
    type Outputs: ResponsePort;

    /// Erases the outputs.
    fn into_handler_result(self) -> HandlerResult;
}

impl<O, E> IntoHandlerResult for Result<O, E>
where
    O: ResponsePort,
    E: Into<anyhow::Error> + Send + 'static,
{
    type Outputs = O;

    fn into_handler_result(self) -> HandlerResult {
        match self {
            Ok(outputs) => Ok(Box::new(outputs)),
            Err(err) => Err(err.into()),
        }
    }
}

/// An async function callable with arguments drawn from the exchange.
pub trait Handler<Args>: Clone + Send + Sync + 'static {
    /// Output port type.
    type Outputs: ResponsePort;

    /// Input port bound by the arguments, if any.
    fn input_binding() -> Option<InputBinding>;

    /// Extracts the arguments and starts the call.
    fn call(&self, ctx: &mut ExchangeContext) -> BoxFuture<'static, HandlerResult>;
}

macro_rules! impl_handler {
    ($($ty:ident),*) => {
        impl<F, Fut, R, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: IntoHandlerResult,
            $($ty: FromExchange,)*
        {
            type Outputs = R::Outputs;

            fn input_binding() -> Option<InputBinding> {
                None $(.or_else(<$ty as FromExchange>::input_binding))*
            }

            #[allow(non_snake_case, unused_variables)]
            fn call(&self, ctx: &mut ExchangeContext) -> BoxFuture<'static, HandlerResult> {
                $(
                    let $ty = match <$ty as FromExchange>::from_exchange(ctx) {
                        Ok(value) => value,
                        Err(err) => return Box::pin(std::future::ready(Err(err))),
                    };
                )*
                let handler = self.clone();
                Box::pin(async move { handler($($ty),*).await.into_handler_result() })
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);

/// Object-safe handler stored on the endpoint.
pub(crate) trait ErasedHandler: Send + Sync {
    fn call(&self, ctx: &mut ExchangeContext) -> BoxFuture<'static, HandlerResult>;
}

pub(crate) struct HandlerService<H, Args> {
    handler: H,
    _args: PhantomData<fn() -> Args>,
}

impl<H, Args> HandlerService<H, Args> {
    pub(crate) const fn new(handler: H) -> Self {
        Self {
            handler,
            _args: PhantomData,
        }
    }
}

impl<H, Args> ErasedHandler for HandlerService<H, Args>
where
    H: Handler<Args>,
    Args: 'static,
{
    fn call(&self, ctx: &mut ExchangeContext) -> BoxFuture<'static, HandlerResult> {
        self.handler.call(ctx)
    }
}
