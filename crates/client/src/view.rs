//! Observer pose and the spawn-direction math derived from it.
//!
//! The presentation layer owns a camera; the session only pulls its pose:
//! once to aim a projectile spawn, once to report the controller's desired
//! position. The quaternion is consumed verbatim, never normalized here.

use std::sync::{Arc, Mutex};

use orrery_protocol::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Squared forward magnitudes below this count as degenerate; the view
/// vector collapses to zero instead of dividing by a near-zero norm.
pub const VIEW_EPSILON: f64 = 1e-6;

/// Observer pose supplied by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewpoint {
    pub position: Vec3,
    /// Orientation quaternion (x, y, z, w).
    pub orientation: Quat,
}

impl Default for Viewpoint {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            orientation: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl Viewpoint {
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// The unit +Z axis rotated by the viewpoint quaternion, in closed form.
    pub fn forward(&self) -> Vec3 {
        let [x, y, z, w] = self.orientation;
        [
            2.0 * x * z + 2.0 * y * w,
            2.0 * y * z - 2.0 * x * w,
            1.0 - 2.0 * x * x - 2.0 * y * y,
        ]
    }

    /// Normalized spawn direction: `-forward`, or exactly zero when the
    /// forward vector is degenerate.
    pub fn spawn_direction(&self) -> Vec3 {
        let f = self.forward();
        let mag2 = f[0] * f[0] + f[1] * f[1] + f[2] * f[2];
        if mag2 < VIEW_EPSILON {
            return [0.0; 3];
        }
        let inv = 1.0 / mag2.sqrt();
        [-f[0] * inv, -f[1] * inv, -f[2] * inv]
    }

    /// Position and velocity for an object launched from this viewpoint:
    /// `offset` units ahead along the spawn direction, moving at `speed`.
    pub fn launch_pose(&self, offset: f64, speed: f64) -> (Vec3, Vec3) {
        let dir = self.spawn_direction();
        (
            [
                self.position[0] + offset * dir[0],
                self.position[1] + offset * dir[1],
                self.position[2] + offset * dir[2],
            ],
            [speed * dir[0], speed * dir[1], speed * dir[2]],
        )
    }
}

/// Shared slot for the current observer pose.
///
/// The presentation side writes at its own pace; the session reads once per
/// cycle. One writer, one reader.
#[derive(Debug, Clone, Default)]
pub struct SharedViewpoint {
    inner: Arc<Mutex<Viewpoint>>,
}

impl SharedViewpoint {
    pub fn new(initial: Viewpoint) -> Self {
        Self {
            inner: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn set(&self, viewpoint: Viewpoint) {
        if let Ok(mut slot) = self.inner.lock() {
            *slot = viewpoint;
        }
    }

    pub fn get(&self) -> Viewpoint {
        self.inner.lock().map(|slot| *slot).unwrap_or_default()
    }
}
