//! The spawn-request trigger shared with the input layer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Level-triggered spawn request.
///
/// The input side raises the flag at any time; the session consumes it with
/// one atomic swap, exactly once per cycle. Raising it several times
/// between cycles still yields a single spawn.
#[derive(Debug, Clone, Default)]
pub struct SpawnSignal {
    flag: Arc<AtomicBool>,
}

impl SpawnSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag.
    pub fn raise(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Consumes the flag, returning whether it was raised.
    pub fn take(&self) -> bool {
        self.flag.swap(false, Ordering::SeqCst)
    }

    /// Reads the flag without consuming it (diagnostics only).
    pub fn is_raised(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
