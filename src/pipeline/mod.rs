//! Backend pipeline contract.
//!
//! # Data Flow
//! ```text
//! PipelineRequest (allow-listed query, headers, body)
//!     → Pipeline::run(scope, request), spawned as its own task
//!     → invoker.rs races the result against the deadline scope
//!     → InvocationOutcome handed to the response renderer
//! ```
//!
//! # Design Decisions
//! - The pipeline is an external collaborator; this module only fixes its shape
//! - Error and completeness are orthogonal: a failure may still carry data
//! - Cancellation is cooperative: pipelines watch the `DeadlineScope` they are given

pub mod backend;
pub mod invoker;

use std::collections::BTreeMap;
use std::future::Future;

use axum::body::Bytes;
use futures_util::future::BoxFuture;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::resilience::timeouts::DeadlineScope;

pub use backend::HttpBackend;
pub use invoker::{invoke, InvocationOutcome};

/// Forwarded query parameters, keyed by configured name.
pub type QueryParams = BTreeMap<String, Vec<String>>;

/// Forwarded headers, keyed by lowercase header name.
pub type Headers = BTreeMap<String, Vec<String>>;

/// Per-request input handed to the pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineRequest {
    pub method: String,
    pub path: String,
    pub query: QueryParams,
    pub headers: Headers,
    pub body: Bytes,
}

/// Data produced by the pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineResponse {
    /// Whether every expected upstream piece was gathered.
    pub is_complete: bool,
    pub data: Map<String, Value>,
}

impl PipelineResponse {
    pub fn complete(data: Map<String, Value>) -> Self {
        Self {
            is_complete: true,
            data,
        }
    }

    pub fn incomplete(data: Map<String, Value>) -> Self {
        Self {
            is_complete: false,
            data,
        }
    }

    /// True when there is a payload worth rendering.
    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }
}

/// Backend failure. `Display` is what the client sees on a no-data 500.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Message(String),

    #[error("context canceled")]
    Cancelled,

    #[error("pipeline task aborted")]
    Aborted,

    #[error("upstream responded with status {0}")]
    UpstreamStatus(u16),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("invalid upstream request: {0}")]
    InvalidRequest(#[from] axum::http::Error),

    #[error("reading body failed: {0}")]
    Body(#[from] axum::Error),

    #[error("invalid upstream payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("encoding response failed: {0}")]
    Encode(serde_json::Error),
}

impl PipelineError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// A pipeline error, possibly alongside the data gathered before it happened.
#[derive(Debug)]
pub struct PipelineFailure {
    pub error: PipelineError,
    pub partial: Option<PipelineResponse>,
}

impl PipelineFailure {
    pub fn new(error: PipelineError) -> Self {
        Self {
            error,
            partial: None,
        }
    }

    pub fn with_partial(mut self, response: PipelineResponse) -> Self {
        self.partial = Some(response);
        self
    }
}

impl From<PipelineError> for PipelineFailure {
    fn from(error: PipelineError) -> Self {
        Self::new(error)
    }
}

/// `Ok(None)` is a valid answer distinct from an empty response.
pub type PipelineResult = Result<Option<PipelineResponse>, PipelineFailure>;

/// The backend processing pipeline.
pub trait Pipeline: Send + Sync + 'static {
    fn run(&self, scope: DeadlineScope, request: PipelineRequest) -> BoxFuture<'static, PipelineResult>;
}

impl<F, Fut> Pipeline for F
where
    F: Fn(DeadlineScope, PipelineRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = PipelineResult> + Send + 'static,
{
    fn run(&self, scope: DeadlineScope, request: PipelineRequest) -> BoxFuture<'static, PipelineResult> {
        Box::pin(self(scope, request))
    }
}

/// Pipeline that answers immediately with no response and no error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPipeline;

impl Pipeline for NoopPipeline {
    fn run(&self, _scope: DeadlineScope, _request: PipelineRequest) -> BoxFuture<'static, PipelineResult> {
        Box::pin(async { Ok(None) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_messages_are_client_facing() {
        assert_eq!(PipelineError::msg("This is a dummy error").to_string(), "This is a dummy error");
        assert_eq!(PipelineError::UpstreamStatus(503).to_string(), "upstream responded with status 503");
    }

    #[test]
    fn test_has_data() {
        assert!(!PipelineResponse::complete(Map::new()).has_data());
        let data = json!({"foo": "bar"}).as_object().cloned().unwrap();
        assert!(PipelineResponse::incomplete(data).has_data());
    }

    #[tokio::test]
    async fn test_closures_are_pipelines() {
        let pipeline = |_scope: DeadlineScope, request: PipelineRequest| async move {
            let mut data = Map::new();
            data.insert("method".into(), Value::String(request.method));
            Ok::<_, PipelineFailure>(Some(PipelineResponse::complete(data)))
        };
        let request = PipelineRequest {
            method: "GET".into(),
            ..Default::default()
        };
        let response = Pipeline::run(&pipeline, DeadlineScope::unbounded(), request).await.unwrap().unwrap();
        assert_eq!(response.data["method"], "GET");

        assert!(NoopPipeline.run(DeadlineScope::unbounded(), PipelineRequest::default()).await.unwrap().is_none());
    }
}
