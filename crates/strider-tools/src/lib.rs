//! Development tools and instrumentation for Strider.
//!
//! This crate provides utilities for profiling problem assembly and
//! evaluation, including per-stage timing and memory tracking.

pub mod probe;

pub use probe::{current_rss_bytes, ProbeError, StageMeasurement, StageProbe};
