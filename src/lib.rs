//! Hierarchical graph state machines for async Rust.
//!
//! Re-exports the switchyard crates for convenience.

/// Graph model, execution engine, observers and event replay.
pub use switchyard_graph;

/// Subscriber setup and a tracing-backed observer.
pub use switchyard_tracing;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use switchyard_graph::prelude::*;
    pub use switchyard_tracing::{TracingFormat, TracingObserver, TracingSetup};
}
