//! Method guard.
//!
//! Runs before any deadline is set up or the body is read, so a wrong
//! method costs nothing on the backend side.

use axum::http::Method;

/// True when `method` is exactly the configured one (case-sensitive).
pub fn method_allowed(method: &Method, configured: &str) -> bool {
    method.as_str() == configured
}
