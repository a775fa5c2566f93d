//! Edge gateway: per-endpoint request handling over a backend pipeline.
//!
//! Each configured endpoint gets a handler that checks the method, forwards
//! allow-listed query parameters and headers, runs the backend pipeline under
//! the endpoint's deadline and renders the outcome as an HTTP response.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod resilience;

pub use config::schema::GatewayConfig;
pub use http::{EndpointHandler, HttpServer};
pub use lifecycle::Shutdown;
pub use pipeline::{Pipeline, PipelineError, PipelineFailure, PipelineRequest, PipelineResponse, PipelineResult};
pub use resilience::DeadlineScope;
