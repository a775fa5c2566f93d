//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Endpoint definitions, one route each.
    pub endpoints: Vec<EndpointConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Request limits.
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Immutable descriptor of one route.
///
/// Built once at startup and shared read-only by every request to the route.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointConfig {
    /// Path the route is registered under (e.g., "/users/{id}").
    pub endpoint: String,

    /// HTTP method the endpoint accepts. Compared byte-exact.
    #[serde(default = "default_method")]
    pub method: String,

    /// Handler deadline in milliseconds. `0` means no deadline: the handler
    /// waits for the pipeline for as long as the client stays connected.
    #[serde(default)]
    pub timeout_ms: u64,

    /// Advertised cache lifetime in seconds. `0` disables `Cache-Control`.
    #[serde(default)]
    pub cache_ttl_secs: u64,

    /// Query parameters forwarded to the pipeline. A trailing `[]` marks a
    /// multi-valued parameter.
    #[serde(default)]
    pub query_string: Vec<String>,

    /// Request headers forwarded to the pipeline.
    #[serde(default)]
    pub headers_to_pass: Vec<String>,

    /// Upstream served by the HTTP backend pipeline. Without one the
    /// endpoint answers through the no-op pipeline.
    #[serde(default)]
    pub backend: Option<BackendConfig>,
}

impl EndpointConfig {
    /// Create an endpoint with defaults for everything but the path.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: default_method(),
            timeout_ms: 0,
            cache_ttl_secs: 0,
            query_string: Vec::new(),
            headers_to_pass: Vec::new(),
            backend: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn default_method() -> String {
    "GET".to_string()
}

/// Upstream server queried by the HTTP backend pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Backend address (e.g., "127.0.0.1:3000").
    pub address: String,

    /// Path requested on the backend.
    pub path: String,

    /// Method used against the backend.
    #[serde(default = "default_method")]
    pub method: String,

    /// Wrap the decoded body under a `collection` key.
    #[serde(default)]
    pub is_collection: bool,

    /// Largest upstream body read before the call fails.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
}

fn default_max_response_bytes() -> usize {
    1024 * 1024 // 1MB
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}
