//! Stub world for loopback runs and integration tests.

/// A minimal in-memory world server answering the full command set.
pub mod stub;
