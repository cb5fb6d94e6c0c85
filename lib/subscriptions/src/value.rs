use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::stream::EventSourceFactory;

/// The root value of an execution pass.
///
/// Plain data is read by the default field resolver. Event sources are only visible to the
/// default subscribe resolver, which opens the source registered under the root field's name.
/// Every event of a subscription becomes the root value of its own execution pass.
#[derive(Clone, Default)]
pub struct RootValue {
    data: Value,
    event_sources: HashMap<String, Arc<dyn EventSourceFactory>>,
}

impl RootValue {
    pub fn new(data: Value) -> Self {
        RootValue {
            data,
            event_sources: HashMap::new(),
        }
    }

    pub fn with_event_source(
        mut self,
        field_name: impl Into<String>,
        factory: impl EventSourceFactory + 'static,
    ) -> Self {
        self.event_sources
            .insert(field_name.into(), Arc::new(factory));
        self
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn event_source(&self, field_name: &str) -> Option<&Arc<dyn EventSourceFactory>> {
        self.event_sources.get(field_name)
    }
}

impl From<Value> for RootValue {
    fn from(data: Value) -> Self {
        RootValue::new(data)
    }
}

impl fmt::Debug for RootValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sources: Vec<&str> = self.event_sources.keys().map(String::as_str).collect();
        sources.sort_unstable();
        f.debug_struct("RootValue")
            .field("data", &self.data)
            .field("event_sources", &sources)
            .finish()
    }
}

/// Opaque, shared per-request context handed to every resolver.
#[derive(Clone, Default)]
pub struct ContextValue(Option<Arc<dyn Any + Send + Sync>>);

impl ContextValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        ContextValue(Some(Arc::new(value)))
    }

    pub fn empty() -> Self {
        ContextValue(None)
    }

    pub fn get<T: Any>(&self) -> Option<&T> {
        self.0.as_deref().and_then(|value| value.downcast_ref::<T>())
    }

    /// Both values point to the same allocation (or both are empty).
    pub fn ptr_eq(&self, other: &ContextValue) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("ContextValue(..)"),
            None => f.write_str("ContextValue(empty)"),
        }
    }
}
