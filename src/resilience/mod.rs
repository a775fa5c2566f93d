//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to pipeline:
//!     → timeouts.rs (derive the deadline scope from the endpoint timeout)
//!     → pipeline/invoker.rs (race the pipeline against that scope)
//! ```
//!
//! # Design Decisions
//! - The client-facing deadline is decoupled from backend completion
//! - Retries belong to the backend pipeline, never to the handler

pub mod timeouts;

pub use timeouts::DeadlineScope;
