//! Hands merged configuration to the services that consume it.
//!
//! Each top-level key of the merged document names a service. After every
//! merge, only services whose value changed (by value equality) are
//! reconfigured, so an unchanged file set never restarts anything.
//!
//! There is no post-dispatch callback phase; callers run follow-up work
//! after [`Dispatcher::dispatch`] returns.

use crate::config::Document;
use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A subsystem configured by one top-level key.
pub trait Service: Send {
    /// Apply a new value for this service's key.
    fn reconfigure(&mut self, key: &str, value: &Value) -> Result<()>;
}

impl<F> Service for F
where
    F: FnMut(&str, &Value) -> Result<()> + Send,
{
    fn reconfigure(&mut self, key: &str, value: &Value) -> Result<()> {
        self(key, value)
    }
}

/// Routes changed top-level keys to their services.
///
/// The last dispatched document is published through an [`ArcSwap`], so
/// readers on other threads can grab a consistent view without locking.
pub struct Dispatcher {
    services: HashMap<String, Box<dyn Service>>,
    fallback: Option<Box<dyn Service>>,
    /// Last value successfully applied per key.
    applied: Document,
    current: Arc<ArcSwap<Document>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
            fallback: None,
            applied: Document::new(),
            current: Arc::new(ArcSwap::from_pointee(Document::new())),
        }
    }

    /// Register the service for a top-level key.
    pub fn with_service(mut self, key: impl Into<String>, service: impl Service + 'static) -> Self {
        self.services.insert(key.into(), Box::new(service));
        self
    }

    /// Service used for keys that have no registered service.
    pub fn with_fallback(mut self, service: impl Service + 'static) -> Self {
        self.fallback = Some(Box::new(service));
        self
    }

    /// Shared handle to the most recently dispatched document.
    pub fn handle(&self) -> Arc<ArcSwap<Document>> {
        Arc::clone(&self.current)
    }

    /// The most recently dispatched document.
    pub fn current(&self) -> Arc<Document> {
        self.current.load_full()
    }

    /// Reconfigure every service whose key changed, then publish `merged`.
    ///
    /// Returns the keys that were reconfigured, in document order. Stops at
    /// the first failing service; keys applied before the failure stay
    /// applied and `merged` is not published.
    pub fn dispatch(&mut self, merged: Document) -> Result<Vec<String>> {
        let mut changed = Vec::new();

        for (key, value) in &merged {
            if self.applied.get(key) == Some(value) {
                continue;
            }

            let service = match self.services.get_mut(key) {
                Some(service) => service,
                None => match self.fallback.as_mut() {
                    Some(fallback) => fallback,
                    None => {
                        warn!(key = %key, "No service named {}", key);
                        continue;
                    }
                },
            };

            debug!(key = %key, "Reconfiguring service");
            service
                .reconfigure(key, value)
                .with_context(|| format!("service '{key}' rejected its configuration"))?;
            self.applied.insert(key.clone(), value.clone());
            changed.push(key.clone());
        }

        if !changed.is_empty() {
            info!(services = ?changed, "Configuration applied");
        }
        self.current.store(Arc::new(merged));
        Ok(changed)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn doc(value: Value) -> Document {
        serde_json::from_value(value).unwrap()
    }

    fn recorder() -> (Arc<Mutex<Vec<(String, Value)>>>, impl Service + 'static) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let service = move |key: &str, value: &Value| -> Result<()> {
            sink.lock().unwrap().push((key.to_string(), value.clone()));
            Ok(())
        };
        (calls, service)
    }

    #[test]
    fn test_only_changed_keys_reconfigured() {
        let (calls, service) = recorder();
        let mut dispatcher = Dispatcher::new().with_fallback(service);

        let first = dispatcher
            .dispatch(doc(json!({"app": {"port": 80}, "log": "info"})))
            .unwrap();
        assert_eq!(first, vec!["app", "log"]);

        let second = dispatcher
            .dispatch(doc(json!({"app": {"port": 81}, "log": "info"})))
            .unwrap();
        assert_eq!(second, vec!["app"]);

        let third = dispatcher
            .dispatch(doc(json!({"app": {"port": 81}, "log": "info"})))
            .unwrap();
        assert!(third.is_empty());
        assert_eq!(calls.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_named_service_preferred_over_fallback() {
        let (app_calls, app) = recorder();
        let (other_calls, other) = recorder();
        let mut dispatcher = Dispatcher::new()
            .with_service("app", app)
            .with_fallback(other);

        dispatcher
            .dispatch(doc(json!({"app": 1, "cache": 2})))
            .unwrap();
        assert_eq!(*app_calls.lock().unwrap(), vec![("app".to_string(), json!(1))]);
        assert_eq!(
            *other_calls.lock().unwrap(),
            vec![("cache".to_string(), json!(2))]
        );
    }

    #[test]
    fn test_unknown_key_skipped_without_fallback() {
        let mut dispatcher = Dispatcher::new();
        let changed = dispatcher.dispatch(doc(json!({"mystery": 1}))).unwrap();
        assert!(changed.is_empty());
        assert_eq!(dispatcher.current()["mystery"], json!(1));
    }

    #[test]
    fn test_failing_service_is_retried_next_time() {
        let attempts = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&attempts);
        let mut dispatcher = Dispatcher::new().with_service(
            "db",
            move |_key: &str, _value: &Value| -> Result<()> {
                let mut n = counter.lock().unwrap();
                *n += 1;
                if *n == 1 {
                    anyhow::bail!("connection refused");
                }
                Ok(())
            },
        );

        let err = dispatcher.dispatch(doc(json!({"db": "x"}))).unwrap_err();
        assert!(err.to_string().contains("service 'db'"));
        assert!(dispatcher.current().is_empty());

        assert_eq!(dispatcher.dispatch(doc(json!({"db": "x"}))).unwrap(), vec!["db"]);
        assert_eq!(*attempts.lock().unwrap(), 2);
    }

    #[test]
    fn test_handle_sees_latest_document() {
        let mut dispatcher = Dispatcher::new();
        let handle = dispatcher.handle();
        dispatcher.dispatch(doc(json!({"a": 1}))).unwrap();
        assert_eq!(handle.load()["a"], json!(1));
    }
}
