//! Error-log capture layer
//!
//! A `tracing_subscriber::Layer` that records every ERROR-level event as a
//! `console-error` diagnostic. Layers only observe: the event still reaches
//! the fmt layer and every other subscriber layer unchanged.

use crate::capture::service::DiagnosticsService;
use crate::capture::types::DiagnosticEvent;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;

/// Events from the capture module itself are never re-captured.
const SELF_TARGET: &str = "pitchside::capture";

/// Records ERROR-level tracing events into a [`DiagnosticsService`]
#[derive(Clone)]
pub struct ErrorCaptureLayer {
    service: Arc<DiagnosticsService>,
}

impl ErrorCaptureLayer {
    pub fn new(service: Arc<DiagnosticsService>) -> Self {
        Self { service }
    }
}

/// Joins the message and remaining fields the way the arguments of an
/// error call would print: message first, then `key=value` pairs.
#[derive(Default)]
struct JoinedFields {
    message: Option<String>,
    rest: String,
}

impl JoinedFields {
    fn push(&mut self, field: &Field, value: std::fmt::Arguments<'_>) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            if !self.rest.is_empty() {
                self.rest.push(' ');
            }
            let _ = write!(self.rest, "{}={}", field.name(), value);
        }
    }

    fn joined(self) -> String {
        match (self.message, self.rest.is_empty()) {
            (Some(message), true) => message,
            (Some(message), false) => format!("{} {}", message, self.rest),
            (None, _) => self.rest,
        }
    }
}

impl Visit for JoinedFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, format_args!("{}", value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push(field, format_args!("{}", value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.push(field, format_args!("{:?}", value));
    }
}

impl<S> tracing_subscriber::Layer<S> for ErrorCaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() != Level::ERROR || metadata.target().starts_with(SELF_TARGET) {
            return;
        }

        let mut fields = JoinedFields::default();
        event.record(&mut fields);

        // Callsite metadata carries file and line but no column
        let mut diagnostic = DiagnosticEvent::console_error(fields.joined());
        diagnostic.filename = metadata.file().map(str::to_string);
        diagnostic.line = metadata.line();

        self.service.log_error(diagnostic);
    }
}
