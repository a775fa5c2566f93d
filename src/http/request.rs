//! Request translation.
//!
//! # Responsibilities
//! - Extract method, path, query parameters, headers and body
//! - Forward only the query parameters and headers named in the endpoint config
//! - Produce a pipeline-neutral `PipelineRequest`
//!
//! # Design Decisions
//! - Allow-list, not pass-through: the result is built by walking the
//!   configured names, never by iterating the incoming query or headers
//! - Every occurrence of a forwarded name is kept, in order; names missing
//!   from the request produce no entry
//! - Body read is bounded by the configured maximum body size

use std::collections::HashMap;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, Request};

use crate::config::EndpointConfig;
use crate::pipeline::{Headers, PipelineError, PipelineRequest, QueryParams};

/// Builds pipeline requests for one endpoint.
#[derive(Debug, Clone)]
pub struct RequestTranslator {
    query_string: Vec<String>,
    headers_to_pass: Vec<HeaderName>,
    max_body_size: usize,
}

impl RequestTranslator {
    pub fn new(endpoint: &EndpointConfig, max_body_size: usize) -> Self {
        let headers_to_pass = endpoint
            .headers_to_pass
            .iter()
            .filter_map(|name| match HeaderName::from_bytes(name.as_bytes()) {
                Ok(header) => Some(header),
                Err(_) => {
                    tracing::warn!(endpoint = %endpoint.endpoint, header = %name, "Ignoring invalid header name");
                    None
                }
            })
            .collect();

        Self {
            query_string: endpoint.query_string.clone(),
            headers_to_pass,
            max_body_size,
        }
    }

    /// Pick the allow-listed parameters out of a raw query string.
    pub fn query(&self, raw_query: Option<&str>) -> QueryParams {
        let mut parsed: HashMap<String, Vec<String>> = HashMap::new();
        if let Some(raw) = raw_query {
            for (name, value) in url::form_urlencoded::parse(raw.as_bytes()) {
                parsed.entry(name.into_owned()).or_default().push(value.into_owned());
            }
        }

        let mut forwarded = QueryParams::new();
        for name in &self.query_string {
            if let Some(values) = parsed.get(name) {
                forwarded.insert(name.clone(), values.clone());
            }
        }
        forwarded
    }

    /// Pick the allow-listed headers, keeping every value in order.
    pub fn headers(&self, headers: &HeaderMap) -> Headers {
        let mut forwarded = Headers::new();
        for name in &self.headers_to_pass {
            let values: Vec<String> = headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect();
            if !values.is_empty() {
                forwarded.insert(name.as_str().to_string(), values);
            }
        }
        forwarded
    }

    /// Consume the transport request and build the pipeline request.
    pub async fn translate(&self, request: Request<Body>) -> Result<PipelineRequest, PipelineError> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, self.max_body_size).await?;

        Ok(PipelineRequest {
            method: parts.method.as_str().to_string(),
            path: parts.uri.path().to_string(),
            query: self.query(parts.uri.query()),
            headers: self.headers(&parts.headers),
            body,
        })
    }
}
