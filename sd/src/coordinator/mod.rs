//! Trigger coordination across pages
//!
//! The coordinator owns the page registry, tracks which page is active,
//! and turns external triggers into debounced read-compute-set round trips
//! against it:
//! - **Trigger:** named step request resolved against the active page
//! - **Round trip:** GET_SPEED, compute the step, SET_SPEED
//! - **Debounce:** at most one round trip in flight per page

pub mod config;
pub mod core;
pub mod handle;
pub mod messages;

pub use config::CoordinatorConfig;
pub use core::Coordinator;
pub use handle::CoordinatorHandle;
pub use messages::{CoordCommand, CoordinatorMetrics, CoordinatorStatus, RoundTripOutcome};
