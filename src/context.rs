use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::bus::{DEFAULT_BUS_CAPACITY, EventBus};

/// Shared application context: the event bus plus a registry of service readiness gates.
///
/// Cloning is cheap; all clones share the same bus and registry.
#[derive(Debug, Clone)]
pub struct AppContext {
    bus: EventBus,
    services: Arc<Mutex<HashMap<String, watch::Sender<bool>>>>,
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl AppContext {
    pub fn new(bus_capacity: usize) -> Self {
        Self {
            bus: EventBus::new(bus_capacity),
            services: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Logging handle for a named component.
    pub fn logger(&self, component: &str) -> Logger {
        Logger {
            component: Arc::from(component),
        }
    }

    pub fn emit(&self, topic: &str, payload: serde_json::Value) -> usize {
        self.bus.emit(topic, payload)
    }

    pub fn publish<T: Serialize>(&self, topic: &str, payload: &T) -> serde_json::Result<usize> {
        self.bus.publish(topic, payload)
    }

    /// Run `handler` for every payload published on `topic` from now on.
    ///
    /// Each invocation is spawned as its own task, so a slow handler does not
    /// hold back the next message. Aborting the returned handle stops the
    /// subscription but leaves already-spawned invocations running.
    pub fn on<F, Fut>(&self, topic: &str, handler: F) -> JoinHandle<()>
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut subscription = self.bus.subscribe(topic);
        tokio::spawn(async move {
            while let Some(payload) = subscription.recv().await {
                tokio::spawn(handler(payload));
            }
        })
    }

    /// Mark `service` as ready, releasing every pending [`AppContext::resolve`].
    pub fn provide(&self, service: &str) {
        tracing::debug!(service, "service ready");
        self.gate(service).send_replace(true);
    }

    pub fn is_ready(&self, service: &str) -> bool {
        *self.gate(service).borrow()
    }

    /// Wait until `service` has been provided.
    pub async fn resolve(&self, service: &str) {
        let mut ready = self.gate(service).subscribe();
        // The sender lives in the registry for as long as this context does.
        let _ = ready.wait_for(|ready| *ready).await;
    }

    fn gate(&self, service: &str) -> watch::Sender<bool> {
        let mut services = self.services.lock().unwrap_or_else(|e| e.into_inner());
        services
            .entry(service.to_string())
            .or_insert_with(|| watch::channel(false).0)
            .clone()
    }
}

/// Component-tagged logger handed out by [`AppContext::logger`].
///
/// Every record carries a `component` field. Without an installed subscriber
/// nothing is written.
#[derive(Debug, Clone)]
pub struct Logger {
    component: Arc<str>,
}

impl Logger {
    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn debug(&self, message: &str) {
        tracing::debug!(component = %self.component, "{message}");
    }

    pub fn info(&self, message: &str) {
        tracing::info!(component = %self.component, "{message}");
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(component = %self.component, "{message}");
    }

    pub fn error(&self, message: &str) {
        tracing::error!(component = %self.component, "{message}");
    }
}
