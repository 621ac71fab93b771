//! Wire protocol primitives shared by every Orrery peer.
//!
//! This crate hosts the pure, I/O-free half of the protocol:
//! - ids: composite object/template identifiers (structural key equality)
//! - state: the per-object kinematic snapshot exchanged with the server
//! - wire: request/response envelopes and their textual encoding
//! - commands: one factory per operation, each pairing an encoded request
//!   with the typed decoder for its reply
//! - template: immutable geometry + collision shape, plus the stock cube
//!
//! Keep this crate lean: no async, no transport, no logging. Everything
//! here is deterministic and unit-testable without a runtime.

/// Composite identifiers for live objects and reusable templates.
pub mod ids;
/// Per-object kinematic snapshot and collision shape descriptors.
pub mod state;
/// Immutable geometry templates and the stock unit cube.
pub mod template;
/// Request/response envelopes and their JSON encoding.
pub mod wire;

/// The command catalog: one pure factory per wire operation.
pub mod commands;

pub use commands::{Command, CommandError, Reply};
pub use ids::{ObjectId, TemplateId};
pub use state::{Quat, StateVariable, Vec3, CSHAPE_DYNAMIC, CSHAPE_SPHERE};
pub use template::Template;
pub use wire::{Request, Response, WireError};
