//! Response completion hook.

use http::{Method, StatusCode};
use std::fmt;
use std::sync::Arc;

/// What an observer is told about the exchange that completed.
#[derive(Debug, Clone, Copy)]
pub struct ObservedExchange<'a> {
    /// Operation id of the endpoint.
    pub operation_id: &'a str,
    /// Request method.
    pub method: &'a Method,
    /// Request path.
    pub path: &'a str,
    /// Per-request identifier.
    pub request_id: &'a str,
}

/// Receives exactly one notification per completed response.
pub trait ResponseObserver: Send + Sync {
    /// The response completed without error.
    fn success(&self, exchange: &ObservedExchange<'_>, code: StatusCode);

    /// The response carries an error.
    fn error(&self, exchange: &ObservedExchange<'_>, code: StatusCode, err: &anyhow::Error);
}

/// Fans notifications out to several observers in order.
#[derive(Clone, Default)]
pub struct CompositeResponseObserver {
    observers: Vec<Arc<dyn ResponseObserver>>,
}

impl CompositeResponseObserver {
    /// Creates an empty composite.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an observer.
    #[must_use]
    pub fn with(mut self, observer: impl ResponseObserver + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Appends a shared observer.
    pub fn push(&mut self, observer: Arc<dyn ResponseObserver>) {
        self.observers.push(observer);
    }

    /// Returns the number of observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Returns true if there are no observers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl ResponseObserver for CompositeResponseObserver {
    fn success(&self, exchange: &ObservedExchange<'_>, code: StatusCode) {
        for observer in &self.observers {
            observer.success(exchange, code);
        }
    }

    fn error(&self, exchange: &ObservedExchange<'_>, code: StatusCode, err: &anyhow::Error) {
        for observer in &self.observers {
            observer.error(exchange, code, err);
        }
    }
}

impl fmt::Debug for CompositeResponseObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeResponseObserver")
            .field("observers", &self.observers.len())
            .finish()
    }
}
