//! Client-side machinery for mirroring a remote simulation.
//!
//! The heart of this crate is [`session::Session`], an explicit state
//! machine that issues protocol commands one round-trip at a time and
//! reconciles the replies into its [`cache::ObjectCache`]. The machine
//! performs no I/O: a runner feeds it the last response and carries out the
//! directive it returns. [`driver::run_session`] is that runner for any
//! [`transport::Transport`].
//!
//! Two transports ship with the crate: an in-process channel pair for tests
//! and singleplayer-style loopback runs, and length-prefixed JSON frames
//! over TCP for talking to a live server.

/// The object cache: every object the server has shown us.
pub mod cache;
/// Session tuning knobs.
pub mod config;
/// The async runner connecting a session to a transport.
pub mod driver;
/// Session-level error taxonomy.
pub mod error;
/// Geometry compilation into renderable meshes.
pub mod mesh;
/// The session state machine.
pub mod session;
/// The spawn-request trigger shared with the input layer.
pub mod signal;
/// Transport boundary: trait, events, and the two shipped implementations.
pub mod transport;
/// Observer pose and the spawn-direction math derived from it.
pub mod view;

pub use cache::{CacheEntry, ObjectCache};
pub use config::SessionConfig;
pub use driver::{run_cycles, run_session};
pub use error::SessionError;
pub use mesh::{Mesh, Triangle};
pub use session::{Directive, Session};
pub use signal::SpawnSignal;
pub use transport::{Transport, TransportError, TransportEvent};
pub use view::{SharedViewpoint, Viewpoint};
