//! Retrying LLM client.
//!
//! Wraps a single-attempt `ChatTransport` with the exponential backoff policy
//! and reports every attempt to an `EventSink`.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::llm::retry::RetryPolicy;
use crate::llm::types::CompletionRequest;
use crate::llm::{ChatTransport, LlmClient};
use crate::observability::{EventSink, Outcome, ProgressEvent, TracingEventSink};

/// Component name used in progress events when the request names none.
pub const DEFAULT_COMPONENT: &str = "llm_client";

/// LLM client that retries transient failures of its transport.
pub struct ResilientClient<T> {
    transport: T,
    policy: RetryPolicy,
    sink: Arc<dyn EventSink>,
}

impl<T: ChatTransport> ResilientClient<T> {
    /// Creates a client with the default policy and a tracing sink.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            policy: RetryPolicy::default(),
            sink: Arc::new(TracingEventSink),
        }
    }

    /// Sets the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the event sink.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the wrapped transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn emit(&self, component: &str, attempt: u32, outcome: Outcome) {
        self.sink.emit(&ProgressEvent::new(
            component,
            self.transport.endpoint(),
            attempt,
            outcome,
        ));
    }
}

#[async_trait]
impl<T: ChatTransport> LlmClient for ResilientClient<T> {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let component = request.component.unwrap_or(DEFAULT_COMPONENT);
        let mut attempt = 1;

        loop {
            self.emit(component, attempt, Outcome::Started);

            match self.transport.send_once(request).await {
                Ok(text) => {
                    self.emit(component, attempt, Outcome::Succeeded);
                    return Ok(text);
                }
                Err(err) if err.is_transient() && self.policy.has_attempts_after(attempt) => {
                    let delay = self.policy.delay_after(attempt);
                    tracing::debug!(attempt, error = %err, "Transient LLM failure");
                    self.emit(component, attempt, Outcome::RetryScheduled { delay });
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    self.emit(
                        component,
                        attempt,
                        Outcome::Failed {
                            transient: err.is_transient(),
                        },
                    );
                    return Err(err);
                }
            }
        }
    }

    fn model(&self) -> &str {
        self.transport.model()
    }
}
