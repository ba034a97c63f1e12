//! Process-wide map from error types to HTTP status codes.
//!
//! Written at startup, read on every failed request by the default error
//! converter. Entries are matched against each error in a failure's source
//! chain, first registration wins.

use http::StatusCode;
use parking_lot::RwLock;
use std::error::Error as StdError;
use std::fmt;
use std::sync::OnceLock;

type Matcher = Box<dyn Fn(&(dyn StdError + 'static)) -> bool + Send + Sync>;

struct Entry {
    label: &'static str,
    matcher: Matcher,
    status: StatusCode,
}

/// Error to status code registry guarded by a read/write lock.
#[derive(Default)]
pub struct ErrorStatusRegistry {
    entries: RwLock<Vec<Entry>>,
}

static GLOBAL: OnceLock<ErrorStatusRegistry> = OnceLock::new();

impl ErrorStatusRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide registry.
    pub fn global() -> &'static ErrorStatusRegistry {
        GLOBAL.get_or_init(ErrorStatusRegistry::new)
    }

    /// Maps every error of type `E` to `status`.
    pub fn register<E: StdError + 'static>(&self, status: StatusCode) {
        self.register_matcher(std::any::type_name::<E>(), status, |err| err.is::<E>());
    }

    /// Maps every error accepted by `matcher` to `status`.
    pub fn register_matcher<F>(&self, label: &'static str, status: StatusCode, matcher: F)
    where
        F: Fn(&(dyn StdError + 'static)) -> bool + Send + Sync + 'static,
    {
        tracing::debug!(error_type = label, status = status.as_u16(), "registered error status");
        self.entries.write().push(Entry {
            label,
            matcher: Box::new(matcher),
            status,
        });
    }

    /// Returns the status registered for any error in the chain of `err`.
    #[must_use]
    pub fn lookup(&self, err: &anyhow::Error) -> Option<StatusCode> {
        let entries = self.entries.read();
        err.chain().find_map(|cause| {
            entries
                .iter()
                .find(|entry| (entry.matcher)(cause))
                .map(|entry| entry.status)
        })
    }

    /// Returns the number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl fmt::Debug for ErrorStatusRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read();
        f.debug_list()
            .entries(entries.iter().map(|entry| (entry.label, entry.status)))
            .finish()
    }
}

/// Registers `E` in the process-wide registry.
pub fn register_error_status<E: StdError + 'static>(status: StatusCode) {
    ErrorStatusRegistry::global().register::<E>(status);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("device missing")]
    struct DeviceMissing;

    #[derive(Debug, thiserror::Error)]
    #[error("lookup failed")]
    struct LookupFailed(#[source] DeviceMissing);

    #[test]
    fn test_lookup_direct() {
        let registry = ErrorStatusRegistry::new();
        registry.register::<DeviceMissing>(StatusCode::NOT_FOUND);

        let err = anyhow::Error::new(DeviceMissing);
        assert_eq!(registry.lookup(&err), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_lookup_through_chain() {
        let registry = ErrorStatusRegistry::new();
        registry.register::<DeviceMissing>(StatusCode::NOT_FOUND);

        let err = anyhow::Error::new(LookupFailed(DeviceMissing));
        assert_eq!(registry.lookup(&err), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_lookup_unregistered() {
        let registry = ErrorStatusRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.lookup(&anyhow::anyhow!("other")), None);
    }

    #[test]
    fn test_matcher_registration() {
        let registry = ErrorStatusRegistry::new();
        registry.register_matcher("timeout", StatusCode::GATEWAY_TIMEOUT, |err| {
            err.to_string().contains("timed out")
        });

        assert_eq!(
            registry.lookup(&anyhow::anyhow!("upstream timed out")),
            Some(StatusCode::GATEWAY_TIMEOUT)
        );
        assert_eq!(registry.len(), 1);
    }
}
