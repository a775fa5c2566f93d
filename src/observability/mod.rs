//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Endpoint handlers produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields (endpoint, method, status, error) on every event
//! - Request ID set by middleware and carried on the HTTP span
//! - Metrics are cheap and optional

pub mod logging;
pub mod metrics;
