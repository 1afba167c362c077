//! txflow Benchmark Library
//!
//! Shared setup for the propagation and concurrency benchmarks.

pub mod config;
pub mod setup;
