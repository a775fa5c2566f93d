//! Endpoint request handler.
//!
//! # Data Flow
//! ```text
//! transport request
//!     → guard.rs (method check, 405 short-circuit)
//!     → request.rs (allow-listed PipelineRequest)
//!     → resilience/timeouts.rs (deadline scope)
//!     → pipeline/invoker.rs (pipeline raced against the deadline)
//!     → response.rs (status, headers, body)
//!     → banner header, metrics, transport response
//! ```
//!
//! No state is kept across requests. The endpoint config is shared read-only.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{HeaderValue, Request};
use axum::response::Response;
use axum::routing::any;
use axum::Router;

use crate::config::EndpointConfig;
use crate::http::guard::method_allowed;
use crate::http::request::RequestTranslator;
use crate::http::response::{cache_control_value, render, GATEWAY_HEADER, GATEWAY_HEADER_VALUE};
use crate::observability::metrics;
use crate::pipeline::{invoke, InvocationOutcome, Pipeline};
use crate::resilience::timeouts::DeadlineScope;

/// Serves one configured endpoint through one pipeline.
pub struct EndpointHandler {
    endpoint: EndpointConfig,
    pipeline: Arc<dyn Pipeline>,
    translator: RequestTranslator,
    cache_control: Option<HeaderValue>,
}

impl EndpointHandler {
    pub fn new(endpoint: EndpointConfig, pipeline: Arc<dyn Pipeline>, max_body_size: usize) -> Self {
        let translator = RequestTranslator::new(&endpoint, max_body_size);
        let cache_control = cache_control_value(endpoint.cache_ttl());
        Self {
            endpoint,
            pipeline,
            translator,
            cache_control,
        }
    }

    /// Answer one request. Always produces a response.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let method = request.method().clone();

        let mut response = self.dispatch(request).await;
        response.headers_mut().insert(GATEWAY_HEADER, GATEWAY_HEADER_VALUE);

        metrics::record_request(&self.endpoint.endpoint, method.as_str(), response.status().as_u16(), start);
        response
    }

    async fn dispatch(&self, request: Request<Body>) -> Response {
        if !method_allowed(request.method(), &self.endpoint.method) {
            tracing::debug!(
                endpoint = %self.endpoint.endpoint,
                method = %request.method(),
                expected = %self.endpoint.method,
                "Method not allowed"
            );
            return render(InvocationOutcome::MethodNotAllowed, None);
        }

        let pipeline_request = match self.translator.translate(request).await {
            Ok(translated) => translated,
            Err(err) => {
                tracing::warn!(endpoint = %self.endpoint.endpoint, error = %err, "Failed to read request");
                return render(InvocationOutcome::ErrorNoData(err), None);
            }
        };

        let scope = DeadlineScope::from_timeout(self.endpoint.timeout());
        // Dropping this (request finished or client gone) cancels the scope.
        let _cancel_on_drop = scope.cancel_on_drop();

        let outcome = invoke(self.pipeline.clone(), &scope, pipeline_request).await;
        self.log_outcome(&outcome);

        render(outcome, self.cache_control.as_ref())
    }

    fn log_outcome(&self, outcome: &InvocationOutcome) {
        let endpoint = &self.endpoint.endpoint;
        match outcome {
            InvocationOutcome::Timeout => {
                metrics::record_timeout(endpoint);
                tracing::warn!(
                    endpoint = %endpoint,
                    timeout_ms = self.endpoint.timeout_ms,
                    "Pipeline did not answer before the deadline"
                );
            }
            InvocationOutcome::ErrorWithPartialData(_, err) => {
                tracing::warn!(endpoint = %endpoint, error = %err, "Pipeline failed, serving partial data");
            }
            InvocationOutcome::ErrorNoData(err) => {
                tracing::error!(endpoint = %endpoint, error = %err, "Pipeline failed");
            }
            other => {
                tracing::debug!(endpoint = %endpoint, outcome = other.kind(), "Pipeline answered");
            }
        }
    }

    /// Register the handler for every method under its endpoint path.
    ///
    /// Method filtering is left to the guard so mismatches get the
    /// handler's own 405 rendering.
    pub fn into_router(self) -> Router {
        let path = self.endpoint.endpoint.clone();
        let handler = Arc::new(self);
        Router::new().route(
            &path,
            any(move |request: Request<Body>| {
                let handler = handler.clone();
                async move { handler.handle(request).await }
            }),
        )
    }
}
