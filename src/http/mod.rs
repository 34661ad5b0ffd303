//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, timeout, trace)
//!     → exchange.rs (request-scoped context)
//!     → [routing resolves route + request URL]
//!     → [filter chain]
//!         → dispatch.rs (forward:// served in-process)
//!         → transport.rs (http:// forwarded upstream)
//!     → response taken from the exchange
//! ```

pub mod dispatch;
pub mod exchange;
pub mod server;
pub mod transport;

pub use exchange::{Exchange, X_REQUEST_ID};
pub use server::HttpServer;
