//! Observability infrastructure for the edge streaming SSR platform.
//!
//! This crate provides:
//! - `Statistics` - Registry of named process-wide counters
//! - `Variable` - A single atomic counter
//! - `InMemoryStatistics` - Default registry implementation
//! - `StatisticsSnapshot` - Serializable view of all counters

mod statistics;

pub use statistics::*;
