//! # Vertex Benchmark Suite
//!
//! Workspace-level performance validation:
//! - **benches/subsystem_benchmarks.rs**: gossip validation/storage and
//!   consensus majority-selection throughput.

pub mod fixtures;
