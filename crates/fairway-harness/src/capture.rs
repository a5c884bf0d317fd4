#![forbid(unsafe_code)]

//! Tracing capture for span and event assertions.
//!
//! ```
//! use fairway_harness::capture::with_captured_tracing;
//!
//! let ((), capture) = with_captured_tracing(|| {
//!     let _span = tracing::debug_span!("controller.snapshot", phase = "active-turn").entered();
//!     tracing::warn!(target: "fairway.controller", "partial snapshot");
//! });
//! assert_eq!(capture.spans_named("controller.snapshot").len(), 1);
//! assert_eq!(capture.events_at("fairway.controller").len(), 1);
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

/// A span seen while capturing.
#[derive(Debug, Clone)]
pub struct CapturedSpan {
    pub name: String,
    pub target: String,
    /// Recorded fields. Declared but unrecorded fields are present and empty.
    pub fields: BTreeMap<String, String>,
}

/// An event seen while capturing.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    /// Names of the spans the event happened in, outermost first.
    pub scope: Vec<String>,
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    /// The event's message, if it has one.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.fields.get("message").map(String::as_str)
    }
}

#[derive(Debug, Default)]
struct Captured {
    spans: Vec<CapturedSpan>,
    events: Vec<CapturedEvent>,
}

/// A `tracing_subscriber` layer that records spans and events.
#[derive(Debug, Clone, Default)]
pub struct CaptureLayer {
    inner: Arc<Mutex<Captured>>,
}

/// Read side of a [`CaptureLayer`].
#[derive(Debug, Clone)]
pub struct CaptureHandle {
    inner: Arc<Mutex<Captured>>,
}

impl CaptureLayer {
    /// A layer and the handle that reads what it records.
    #[must_use]
    pub fn new() -> (Self, CaptureHandle) {
        let layer = Self::default();
        let handle = CaptureHandle {
            inner: Arc::clone(&layer.inner),
        };
        (layer, handle)
    }
}

impl CaptureHandle {
    #[must_use]
    pub fn spans(&self) -> Vec<CapturedSpan> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .spans
            .clone()
    }

    #[must_use]
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .clone()
    }

    #[must_use]
    pub fn spans_named(&self, name: &str) -> Vec<CapturedSpan> {
        self.spans().into_iter().filter(|s| s.name == name).collect()
    }

    #[must_use]
    pub fn events_at(&self, target: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.target == target)
            .collect()
    }

    /// Events whose message contains `needle`.
    #[must_use]
    pub fn events_with_message(&self, needle: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.message().is_some_and(|m| m.contains(needle)))
            .collect()
    }
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }
    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> tracing_subscriber::Layer<S> for CaptureLayer
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);
        let mut fields: BTreeMap<String, String> = visitor.0.into_iter().collect();
        for field in attrs.metadata().fields() {
            fields.entry(field.name().to_string()).or_default();
        }
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .spans
            .push(CapturedSpan {
                name: attrs.metadata().name().to_string(),
                target: attrs.metadata().target().to_string(),
                fields,
            });
    }

    fn on_event(&self, event: &tracing::Event<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        let scope = ctx
            .event_scope(event)
            .map(|scope| scope.from_root().map(|s| s.name().to_string()).collect())
            .unwrap_or_default();
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .push(CapturedEvent {
                level: *event.metadata().level(),
                target: event.metadata().target().to_string(),
                scope,
                fields: visitor.0.into_iter().collect(),
            });
    }
}

/// Run `f` with a capturing subscriber as the thread default.
pub fn with_captured_tracing<F, R>(f: F) -> (R, CaptureHandle)
where
    F: FnOnce() -> R,
{
    let (layer, handle) = CaptureLayer::new();
    let subscriber = tracing_subscriber::registry().with(layer);
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, handle)
}
