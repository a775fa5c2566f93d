//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate listener address, endpoint paths and methods
//! - Validate allow-list entries and backend definitions
//! - Reject route patterns the router would refuse
//! - Detect duplicate endpoint paths, including captures spelled differently
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::http::{HeaderName, Method};
use thiserror::Error;

use crate::config::schema::{EndpointConfig, GatewayConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("endpoint '{0}' must start with '/'")]
    EndpointPath(String),

    #[error("endpoint '{endpoint}' is not a valid route: {reason}")]
    RoutePattern { endpoint: String, reason: String },

    #[error("endpoint '{0}' is declared more than once")]
    DuplicateEndpoint(String),

    #[error("endpoint '{endpoint}' conflicts with '{existing}'")]
    ConflictingEndpoint { endpoint: String, existing: String },

    #[error("endpoint '{endpoint}' has invalid method '{method}'")]
    Method { endpoint: String, method: String },

    #[error("endpoint '{0}' forwards an empty query parameter name")]
    EmptyQueryParam(String),

    #[error("endpoint '{endpoint}' forwards invalid header '{header}'")]
    HeaderName { endpoint: String, header: String },

    #[error("endpoint '{endpoint}' has an invalid backend: {reason}")]
    Backend { endpoint: String, reason: String },
}

/// Validate the whole configuration, collecting every error found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let mut routes: HashMap<String, &str> = HashMap::new();
    for endpoint in &config.endpoints {
        let name = endpoint.endpoint.as_str();
        if validate_endpoint(endpoint, &mut errors) {
            match routes.get(&route_key(name)) {
                Some(&existing) if existing == name => {
                    errors.push(ValidationError::DuplicateEndpoint(name.to_string()));
                }
                Some(&existing) => errors.push(ValidationError::ConflictingEndpoint {
                    endpoint: name.to_string(),
                    existing: existing.to_string(),
                }),
                None => {
                    routes.insert(route_key(name), name);
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Returns whether the path can be registered as a route.
fn validate_endpoint(endpoint: &EndpointConfig, errors: &mut Vec<ValidationError>) -> bool {
    let name = &endpoint.endpoint;

    let routable = if !name.starts_with('/') {
        errors.push(ValidationError::EndpointPath(name.clone()));
        false
    } else if let Err(reason) = check_route_pattern(name) {
        errors.push(ValidationError::RoutePattern {
            endpoint: name.clone(),
            reason: reason.to_string(),
        });
        false
    } else {
        true
    };

    if !is_valid_method(&endpoint.method) {
        errors.push(ValidationError::Method {
            endpoint: name.clone(),
            method: endpoint.method.clone(),
        });
    }

    if endpoint.query_string.iter().any(|p| p.is_empty()) {
        errors.push(ValidationError::EmptyQueryParam(name.clone()));
    }

    for header in &endpoint.headers_to_pass {
        if HeaderName::from_bytes(header.as_bytes()).is_err() {
            errors.push(ValidationError::HeaderName {
                endpoint: name.clone(),
                header: header.clone(),
            });
        }
    }

    if let Some(backend) = &endpoint.backend {
        let reason = if backend.address.is_empty() {
            Some("address is empty")
        } else if !backend.path.starts_with('/') {
            Some("path must start with '/'")
        } else if !is_valid_method(&backend.method) {
            Some("method is not a valid HTTP method")
        } else {
            None
        };
        if let Some(reason) = reason {
            errors.push(ValidationError::Backend {
                endpoint: name.clone(),
                reason: reason.to_string(),
            });
        }
    }

    routable
}

/// Segment rules of the router: captures are whole segments written
/// `{name}` or `{*name}`, and a catch-all may only end the path.
fn check_route_pattern(path: &str) -> Result<(), &'static str> {
    let segments: Vec<&str> = path.split('/').skip(1).collect();
    for (i, segment) in segments.iter().enumerate() {
        if segment.starts_with(':') || segment.starts_with('*') {
            return Err("segments must not start with ':' or '*', use '{name}' captures");
        }
        if !segment.contains(['{', '}']) {
            continue;
        }
        let inner = segment
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .ok_or("a capture must span the whole segment")?;
        let (catch_all, name) = match inner.strip_prefix('*') {
            Some(name) => (true, name),
            None => (false, inner),
        };
        if name.is_empty() || name.contains(['{', '}', '*']) {
            return Err("a capture needs a plain name");
        }
        if catch_all && i + 1 != segments.len() {
            return Err("a catch-all capture must be the last segment");
        }
    }
    Ok(())
}

/// The path with capture names erased, so `/u/{id}` and `/u/{name}` collide.
fn route_key(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with("{*") {
                "{*}"
            } else if segment.starts_with('{') {
                "{}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_valid_method(method: &str) -> bool {
    !method.is_empty() && Method::from_bytes(method.as_bytes()).is_ok()
}
