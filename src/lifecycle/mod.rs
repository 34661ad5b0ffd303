//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → server stops accepting → drain → in-flight cancelled at deadline
//!             → config watcher and reload loop exit
//! ```
//!
//! # Design Decisions
//! - One broadcast coordinator; every long-running task subscribes
//! - Shutdown has timeout: in-flight requests are cancelled after the drain deadline

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
