pub mod config;
pub mod generator;
pub mod logger;
pub mod profiler;
pub mod rng;
pub mod visualization;
