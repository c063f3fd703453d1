pub mod api;
pub mod check;
pub mod cost;
pub mod decompose;
pub mod engine;
pub mod grid;
pub mod hum;
pub mod patterns;
pub mod schedule;

pub use api::{GlobalRouter, PerformanceMetrics, RouteError};
pub use schedule::{Mode, PhaseOutcome};
