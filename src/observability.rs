//! Progress events for LLM calls.
//!
//! Every attempt made by the resilient client is reported to an injected
//! `EventSink`. Sinks observe only; they cannot influence retries.

use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What happened on one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The request is about to be sent.
    Started,
    /// The endpoint returned a usable completion.
    Succeeded,
    /// The attempt failed transiently and another one follows after `delay`.
    RetryScheduled { delay: Duration },
    /// The call gave up. `transient` tells whether retries were exhausted.
    Failed { transient: bool },
}

/// A single progress report from an LLM-calling component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Component making the call (e.g. "sql_agent", "llm_client").
    pub component: String,
    /// URL the call is sent to.
    pub endpoint: String,
    /// 1-based attempt number.
    pub attempt: u32,
    /// What happened.
    pub outcome: Outcome,
}

impl ProgressEvent {
    /// Creates a new event.
    pub fn new(
        component: impl Into<String>,
        endpoint: impl Into<String>,
        attempt: u32,
        outcome: Outcome,
    ) -> Self {
        Self {
            component: component.into(),
            endpoint: endpoint.into(),
            attempt,
            outcome,
        }
    }
}

/// Receiver of progress events.
pub trait EventSink: Send + Sync {
    /// Records one event. Must not panic.
    fn emit(&self, event: &ProgressEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &ProgressEvent) {
        let ProgressEvent {
            component,
            endpoint,
            attempt,
            outcome,
        } = event;

        match outcome {
            Outcome::Started => {
                debug!(component = %component, endpoint = %endpoint, attempt, "LLM request started")
            }
            Outcome::Succeeded => {
                debug!(component = %component, endpoint = %endpoint, attempt, "LLM request succeeded")
            }
            Outcome::RetryScheduled { delay } => warn!(
                component = %component,
                endpoint = %endpoint,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "LLM request failed, retrying"
            ),
            Outcome::Failed { transient } => info!(
                component = %component,
                endpoint = %endpoint,
                attempt,
                transient,
                "LLM request failed"
            ),
        }
    }
}

/// Keeps every event in memory. Used by tests.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingEventSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded events.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Returns the delays of every scheduled retry, in order.
    pub fn retry_delays(&self) -> Vec<Duration> {
        self.events()
            .into_iter()
            .filter_map(|event| match event.outcome {
                Outcome::RetryScheduled { delay } => Some(delay),
                _ => None,
            })
            .collect()
    }

    /// Returns how many attempts were started.
    pub fn attempts_started(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| event.outcome == Outcome::Started)
            .count()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: &ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
