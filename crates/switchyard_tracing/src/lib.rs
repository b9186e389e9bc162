//! Structured logging for switchyard.
//!
//! - [`TracingSetup`] installs a `tracing-subscriber` registry with an
//!   environment filter and a pretty, compact or JSON formatter.
//! - [`TracingObserver`] renders every lifecycle hook of a
//!   [`StateMachine`](switchyard_graph::StateMachine) as a `tracing` event.
//!
//! The engine itself already emits `debug!` diagnostics inside a
//! `switchyard.run` span; the observer adds the lifecycle view on top.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use switchyard_tracing::{TracingObserver, TracingSetup};
//!
//! TracingSetup::new().with_env_filter("switchyard=debug").init();
//! let machine = StateMachine::new(graph).with_observer(Arc::new(TracingObserver::new()));
//! ```

/// Subscriber installation.
pub mod setup;

/// Tracing-backed lifecycle observer.
pub mod observer;

pub use observer::TracingObserver;
pub use setup::{TracingFormat, TracingSetup};
