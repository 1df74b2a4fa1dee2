//! Mock review model for testing and dry runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ReviewError, Result};

use super::provider::ReviewModel;

type Responder = dyn Fn(&str) -> Result<String> + Send + Sync;

/// Response returned when no responder is configured.
const DEFAULT_RESPONSE: &str = "```json\n{\"correctness\": 1.0, \"suggestion\": \"No issues found.\"}\n```";

/// Mock model that returns predictable responses.
///
/// Every call is instrumented: the number of calls, the peak number of calls
/// outstanding at once and the prompts received can be inspected afterwards.
#[derive(Clone)]
pub struct MockModel {
    responder: Arc<Responder>,
    latency: Duration,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockModel {
    /// Create a mock that reports every exercise as fine.
    pub fn new() -> Self {
        Self::with_responder(|_| Ok(DEFAULT_RESPONSE.to_string()))
    }

    /// Always return the given text.
    pub fn with_response(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::with_responder(move |_| Ok(text.clone()))
    }

    /// Always fail with the given message.
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::with_responder(move |_| Err(ReviewError::Model(message.clone())))
    }

    /// Compute each response from the prompt.
    pub fn with_responder(
        responder: impl Fn(&str) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Arc::new(responder),
            latency: Duration::ZERO,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Delay every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of calls made so far.
    pub fn calls(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Highest number of calls that were outstanding at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Prompts received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReviewModel for MockModel {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let response = (self.responder)(prompt);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        response
    }

    fn name(&self) -> &str {
        "mock"
    }
}
