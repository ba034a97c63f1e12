//! Response observers backed by `tracing` and `metrics`.
//!
//! | Observer | Effect |
//! |----------|--------|
//! | [`LoggingResponseObserver`] | one log event per response |
//! | [`TracingResponseObserver`] | records status and error on the current span |
//! | [`MetricsResponseObserver`] | increments `portico_http_responses_total` |

use http::StatusCode;
use portico_core::{ObservedExchange, ResponseObserver};
use tracing::Span;

/// Name of the response counter.
pub const RESPONSES_TOTAL: &str = "portico_http_responses_total";

/// Emits a log event for every completed response.
///
/// Success logs at `info`, client errors at `warn` and server errors at
/// `error`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingResponseObserver;

impl ResponseObserver for LoggingResponseObserver {
    fn success(&self, exchange: &ObservedExchange<'_>, code: StatusCode) {
        tracing::info!(
            request_id = %exchange.request_id,
            operation_id = %exchange.operation_id,
            http.method = %exchange.method,
            http.path = %exchange.path,
            http.status_code = code.as_u16(),
            "Request completed"
        );
    }

    fn error(&self, exchange: &ObservedExchange<'_>, code: StatusCode, err: &anyhow::Error) {
        if code.is_server_error() {
            tracing::error!(
                request_id = %exchange.request_id,
                operation_id = %exchange.operation_id,
                http.method = %exchange.method,
                http.path = %exchange.path,
                http.status_code = code.as_u16(),
                error = %err,
                "Request failed"
            );
        } else {
            tracing::warn!(
                request_id = %exchange.request_id,
                operation_id = %exchange.operation_id,
                http.method = %exchange.method,
                http.path = %exchange.path,
                http.status_code = code.as_u16(),
                error = %err,
                "Request rejected"
            );
        }
    }
}

/// Records the outcome on the current span.
///
/// The span must declare `http.status_code` and `error` fields (as
/// `tracing::field::Empty`) for the values to be kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingResponseObserver;

impl ResponseObserver for TracingResponseObserver {
    fn success(&self, _exchange: &ObservedExchange<'_>, code: StatusCode) {
        Span::current().record("http.status_code", code.as_u16());
    }

    fn error(&self, _exchange: &ObservedExchange<'_>, code: StatusCode, err: &anyhow::Error) {
        let span = Span::current();
        span.record("http.status_code", code.as_u16());
        span.record("error", tracing::field::display(err));
    }
}

/// Counts responses by operation, status and outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsResponseObserver;

impl MetricsResponseObserver {
    fn count(exchange: &ObservedExchange<'_>, code: StatusCode, outcome: &'static str) {
        metrics::counter!(
            RESPONSES_TOTAL,
            "operation" => exchange.operation_id.to_string(),
            "status" => code.as_u16().to_string(),
            "outcome" => outcome
        )
        .increment(1);
    }
}

impl ResponseObserver for MetricsResponseObserver {
    fn success(&self, exchange: &ObservedExchange<'_>, code: StatusCode) {
        Self::count(exchange, code, "success");
    }

    fn error(&self, exchange: &ObservedExchange<'_>, code: StatusCode, _err: &anyhow::Error) {
        Self::count(exchange, code, "error");
    }
}

/// Registers the description of [`RESPONSES_TOTAL`] with the installed recorder.
pub fn describe_metrics() {
    metrics::describe_counter!(
        RESPONSES_TOTAL,
        "Total number of HTTP responses produced by Portico endpoints"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use portico_core::CompositeResponseObserver;

    fn exchange(method: &Method) -> ObservedExchange<'_> {
        ObservedExchange {
            operation_id: "listDevices",
            method,
            path: "/devices",
            request_id: "0191e6a2",
        }
    }

    #[test]
    fn test_observers_without_subscriber_or_recorder() {
        let method = Method::GET;
        let observer = CompositeResponseObserver::new()
            .with(LoggingResponseObserver)
            .with(TracingResponseObserver)
            .with(MetricsResponseObserver);

        observer.success(&exchange(&method), StatusCode::OK);
        observer.error(
            &exchange(&method),
            StatusCode::NOT_FOUND,
            &anyhow::anyhow!("device not found"),
        );
        observer.error(
            &exchange(&method),
            StatusCode::INTERNAL_SERVER_ERROR,
            &anyhow::anyhow!("database offline"),
        );
        describe_metrics();
        assert_eq!(observer.len(), 3);
    }

    #[test]
    fn test_tracing_observer_records_on_span() {
        let span = tracing::info_span!(
            "request",
            http.status_code = tracing::field::Empty,
            error = tracing::field::Empty
        );
        let _guard = span.enter();
        let method = Method::POST;
        TracingResponseObserver.error(
            &exchange(&method),
            StatusCode::CONFLICT,
            &anyhow::anyhow!("duplicate"),
        );
    }
}
