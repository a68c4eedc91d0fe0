//! Shared view of the drive's state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{Arc, Mutex};

use super::{DriveState, Position};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Read only view of a [`DriveCtrl`](super::DriveCtrl) which stays available while another thread
/// holds the drive for a slew.
#[derive(Debug, Clone)]
pub struct DriveMonitor {
    inner: Arc<Mutex<DriveSnapshot>>,
}

/// The drive's state at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveSnapshot {
    pub state: DriveState,

    /// The last successfully read position.
    pub position: Option<Position>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveMonitor {
    pub(super) fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(DriveSnapshot {
                state: DriveState::Disabled,
                position: None
            }))
        }
    }

    pub fn snapshot(&self) -> DriveSnapshot {
        *self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub(super) fn set_state(&self, state: DriveState) {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).state = state;
    }

    pub(super) fn set_position(&self, position: Position) {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).position = Some(position);
    }
}
