//! HTTP backend pipeline.
//!
//! # Responsibilities
//! - Forward the allow-listed query, headers and body to one upstream
//! - Decode the upstream JSON body into the response data mapping
//! - Map upstream failures onto `PipelineError`
//!
//! # Design Decisions
//! - One upstream per endpoint; merging and balancing live elsewhere
//! - Watches the deadline scope and abandons the upstream call once it ends
//! - Non-object JSON bodies are wrapped under `collection`
//! - Upstream bodies are read up to `max_response_bytes`

use axum::body::Body;
use axum::http::Request;
use futures_util::future::BoxFuture;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde_json::{Map, Value};

use crate::config::BackendConfig;
use crate::pipeline::{Pipeline, PipelineError, PipelineFailure, PipelineRequest, PipelineResponse, PipelineResult};
use crate::resilience::timeouts::DeadlineScope;

const COLLECTION_KEY: &str = "collection";

/// Pipeline backed by a single upstream HTTP server.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client<HttpConnector, Body>,
    config: BackendConfig,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client, config }
    }

    fn upstream_uri(&self, request: &PipelineRequest) -> String {
        let mut uri = format!("http://{}{}", self.config.address, self.config.path);

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (name, values) in &request.query {
            for value in values {
                query.append_pair(name, value);
            }
        }
        let query = query.finish();
        if !query.is_empty() {
            uri.push('?');
            uri.push_str(&query);
        }
        uri
    }

    async fn fetch(&self, request: PipelineRequest) -> Result<PipelineResponse, PipelineError> {
        let mut builder = Request::builder()
            .method(self.config.method.as_str())
            .uri(self.upstream_uri(&request));
        for (name, values) in &request.headers {
            for value in values {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        let upstream_request = builder.body(Body::from(request.body))?;

        tracing::debug!(
            backend = %self.config.address,
            uri = %upstream_request.uri(),
            "Forwarding to backend"
        );

        let response = self.client.request(upstream_request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::UpstreamStatus(status.as_u16()));
        }

        let bytes = axum::body::to_bytes(Body::new(response.into_body()), self.config.max_response_bytes).await?;
        let value: Value = serde_json::from_slice(&bytes)?;

        Ok(PipelineResponse::complete(self.shape(value)))
    }

    fn shape(&self, value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) if !self.config.is_collection => map,
            other => {
                let mut map = Map::new();
                map.insert(COLLECTION_KEY.to_string(), other);
                map
            }
        }
    }
}

impl Pipeline for HttpBackend {
    fn run(&self, scope: DeadlineScope, request: PipelineRequest) -> BoxFuture<'static, PipelineResult> {
        let backend = self.clone();
        Box::pin(async move {
            tracing::debug!(
                backend = %backend.config.address,
                remaining_ms = ?scope.remaining().map(|d| d.as_millis()),
                "Calling backend"
            );
            tokio::select! {
                _ = scope.done() => {
                    tracing::debug!(backend = %backend.config.address, "Deadline scope ended, abandoning backend call");
                    Err(PipelineFailure::new(PipelineError::Cancelled))
                }
                result = backend.fetch(request) => result.map(Some).map_err(PipelineFailure::new),
            }
        })
    }
}
