//! Immutable geometry templates.
//!
//! A template couples a raw triangle-soup vertex buffer (stride 9: three
//! 3-D vertices per triangle, unscaled) with a collision shape descriptor.
//! Templates are registered once and referenced by many spawned objects.

use serde::{Deserialize, Serialize};

use crate::state::{Vec3, CSHAPE_DYNAMIC};

/// Number of floats per triangle in a raw vertex buffer.
pub const VERTEX_STRIDE: usize = 9;

// Unit cube as 12 triangles / 36 vertices, half-extent 0.5, centered on the
// origin. Winding matches the buffer the original avatar shipped with.
const UNIT_CUBE: [f64; 108] = [
    -0.5, -0.5, -0.5, -0.5, -0.5, 0.5, -0.5, 0.5, 0.5, //
    0.5, 0.5, -0.5, -0.5, -0.5, -0.5, -0.5, 0.5, -0.5, //
    0.5, -0.5, 0.5, -0.5, -0.5, -0.5, 0.5, -0.5, -0.5, //
    0.5, 0.5, -0.5, 0.5, -0.5, -0.5, -0.5, -0.5, -0.5, //
    -0.5, -0.5, -0.5, -0.5, 0.5, 0.5, -0.5, 0.5, -0.5, //
    0.5, -0.5, 0.5, -0.5, -0.5, 0.5, -0.5, -0.5, -0.5, //
    -0.5, 0.5, 0.5, -0.5, -0.5, 0.5, 0.5, -0.5, 0.5, //
    0.5, 0.5, 0.5, 0.5, -0.5, -0.5, 0.5, 0.5, -0.5, //
    0.5, -0.5, -0.5, 0.5, 0.5, 0.5, 0.5, -0.5, 0.5, //
    0.5, 0.5, 0.5, 0.5, 0.5, -0.5, -0.5, 0.5, -0.5, //
    0.5, 0.5, 0.5, -0.5, 0.5, -0.5, -0.5, 0.5, 0.5, //
    0.5, 0.5, 0.5, -0.5, 0.5, 0.5, 0.5, -0.5, 0.5, //
];

/// Immutable geometry + collision shape pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub cshape: [f64; 4],
    /// Flat vertex buffer, stride 9, unscaled.
    pub geometry: Vec<f64>,
}

impl Template {
    pub fn new(cshape: [f64; 4], geometry: Vec<f64>) -> Self {
        Self { cshape, geometry }
    }

    /// The stock template for the controller's own avatar: a unit cube
    /// tagged as a dynamic composite body.
    pub fn controller_avatar() -> Self {
        Self::new(CSHAPE_DYNAMIC, unit_cube())
    }

    pub fn triangle_count(&self) -> usize {
        self.geometry.len() / VERTEX_STRIDE
    }
}

/// Returns the unit cube vertex buffer (108 floats, half-extent 0.5).
pub fn unit_cube() -> Vec<f64> {
    UNIT_CUBE.to_vec()
}

/// Returns the unit cube displaced by `offset`.
pub fn unit_cube_at(offset: Vec3) -> Vec<f64> {
    let mut buf = unit_cube();
    for vertex in buf.chunks_exact_mut(3) {
        vertex[0] += offset[0];
        vertex[1] += offset[1];
        vertex[2] += offset[2];
    }
    buf
}
