//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with one handler per configured endpoint
//! - Pick the pipeline each endpoint runs through
//! - Wire up middleware (request ID, tracing)
//! - Serve on a listener until shutdown is signalled

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::validation::validate_config;
use crate::config::{ConfigError, EndpointConfig, GatewayConfig};
use crate::http::handler::EndpointHandler;
use crate::pipeline::{HttpBackend, NoopPipeline, Pipeline};

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a server whose pipelines come from the endpoint backends.
    pub fn new(config: GatewayConfig) -> Result<Self, ConfigError> {
        Self::with_pipelines(config, default_pipeline)
    }

    /// Create a server with a custom pipeline per endpoint.
    ///
    /// The config is validated first; the router refuses (by panicking) the
    /// route patterns validation rejects.
    pub fn with_pipelines<F>(config: GatewayConfig, factory: F) -> Result<Self, ConfigError>
    where
        F: Fn(&EndpointConfig) -> Arc<dyn Pipeline>,
    {
        validate_config(&config).map_err(ConfigError::Validation)?;
        let router = Self::build_router(&config, factory);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router<F>(config: &GatewayConfig, factory: F) -> Router
    where
        F: Fn(&EndpointConfig) -> Arc<dyn Pipeline>,
    {
        let mut router = Router::new();
        for endpoint in &config.endpoints {
            tracing::info!(
                endpoint = %endpoint.endpoint,
                method = %endpoint.method,
                timeout_ms = endpoint.timeout_ms,
                cache_ttl_secs = endpoint.cache_ttl_secs,
                "Registering endpoint"
            );
            let handler = EndpointHandler::new(
                endpoint.clone(),
                factory(endpoint),
                config.security.max_body_size,
            );
            router = router.merge(handler.into_router());
        }

        router.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            endpoints = self.config.endpoints.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The router, for serving it elsewhere or driving it in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// HTTP backend when the endpoint names one, no-op pipeline otherwise.
pub fn default_pipeline(endpoint: &EndpointConfig) -> Arc<dyn Pipeline> {
    match &endpoint.backend {
        Some(backend) => Arc::new(HttpBackend::new(backend.clone())),
        None => Arc::new(NoopPipeline),
    }
}
