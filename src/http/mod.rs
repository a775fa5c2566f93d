//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → handler.rs (one EndpointHandler per configured endpoint)
//!         → guard.rs (method check)
//!         → request.rs (allow-listed pipeline request)
//!         → [pipeline raced against the deadline]
//!         → response.rs (status, headers, body)
//!     → Send to client
//! ```

pub mod guard;
pub mod handler;
pub mod request;
pub mod response;
pub mod server;

pub use handler::EndpointHandler;
pub use request::RequestTranslator;
pub use response::{
    COMPLETED_HEADER, COMPLETE_VALUE, GATEWAY_HEADER, GATEWAY_HEADER_VALUE, INCOMPLETE_VALUE,
    INTERNAL_ERROR_MESSAGE,
};
pub use server::HttpServer;
