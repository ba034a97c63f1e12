//! Typed side table attached to each [`PortField`](crate::PortField).
//!
//! Subsystems that derive artifacts from a field (validation schemas,
//! documentation fragments) store them here keyed by their Rust type, so the
//! reflector never needs to know what they are.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Type-keyed storage for per-field artifacts.
///
/// Values are stored behind `Arc` so a reflected [`Port`](crate::Port) can be
/// cloned and shared across requests cheaply.
///
/// # Example
///
/// ```
/// use portico_core::Baggage;
///
/// #[derive(Debug, PartialEq)]
/// struct Description(&'static str);
///
/// let mut baggage = Baggage::new();
/// baggage.insert(Description("tenant identifier"));
///
/// assert_eq!(
///     baggage.get::<Description>(),
///     Some(&Description("tenant identifier"))
/// );
/// assert!(!baggage.contains::<u32>());
/// ```
#[derive(Clone, Default)]
pub struct Baggage {
    items: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Baggage {
    /// Creates an empty baggage table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, replacing any previous value of the same type.
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.items.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Inserts an already shared value.
    pub fn insert_arc<T: Any + Send + Sync>(&mut self, value: Arc<T>) {
        self.items.insert(TypeId::of::<T>(), value);
    }

    /// Returns the value of type `T`, if present.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.items
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    /// Returns a shared handle to the value of type `T`, if present.
    #[must_use]
    pub fn get_arc<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.items
            .get(&TypeId::of::<T>())
            .and_then(|value| Arc::clone(value).downcast::<T>().ok())
    }

    /// Returns true if a value of type `T` is present.
    #[must_use]
    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.items.contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of stored items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Debug for Baggage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Baggage")
            .field("items", &self.items.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Marker(u32);

    #[test]
    fn test_insert_replaces_same_type() {
        let mut baggage = Baggage::new();
        baggage.insert(Marker(1));
        baggage.insert(Marker(2));

        assert_eq!(baggage.len(), 1);
        assert_eq!(baggage.get::<Marker>(), Some(&Marker(2)));
    }

    #[test]
    fn test_get_arc_shares_value() {
        let mut baggage = Baggage::new();
        baggage.insert_arc(Arc::new(Marker(7)));

        let shared = baggage.get_arc::<Marker>().unwrap();
        assert_eq!(*shared, Marker(7));
        assert!(baggage.get_arc::<String>().is_none());
    }

    #[test]
    fn test_clone_keeps_items() {
        let mut baggage = Baggage::new();
        baggage.insert(String::from("schema"));
        let cloned = baggage.clone();

        assert_eq!(cloned.get::<String>().map(String::as_str), Some("schema"));
    }
}
