//! Geometry compilation: raw template buffers into renderable meshes.
//!
//! Templates arrive as flat f64 triangle soup (stride 9). Compilation
//! scales every coordinate by the object's scale, splits the soup into
//! discrete triangles, and assigns a cosmetic face color. The GPU-facing
//! representation is f32.

use orrery_protocol::template::VERTEX_STRIDE;

/// One renderable triangle: three vertices and a cosmetic face color.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub vertices: [[f32; 3]; 3],
    /// RGB in [0, 1]. Purely cosmetic; carries no meaning.
    pub color: [f32; 3],
}

/// Compiled renderable representation of one object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    /// Compiles a raw vertex buffer into triangles, scaling every
    /// coordinate by `scale`.
    ///
    /// Trailing floats that do not fill a whole triangle are dropped.
    pub fn compile(buffer: &[f64], scale: f64) -> Self {
        let mut triangles = Vec::with_capacity(buffer.len() / VERTEX_STRIDE);
        for (index, soup) in buffer.chunks_exact(VERTEX_STRIDE).enumerate() {
            let mut vertices = [[0.0f32; 3]; 3];
            for (v, vertex) in vertices.iter_mut().enumerate() {
                for (c, coord) in vertex.iter_mut().enumerate() {
                    *coord = (soup[v * 3 + c] * scale) as f32;
                }
            }
            triangles.push(Triangle {
                vertices,
                color: face_color(index),
            });
        }
        Self { triangles }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

/// Cosmetic color for the triangle at `index`.
///
/// Deterministic so that repeated compiles of the same buffer agree; the
/// palette just has to keep neighboring faces distinguishable.
fn face_color(index: usize) -> [f32; 3] {
    let h = (index as u32).wrapping_mul(2_654_435_761);
    [
        ((h >> 16) & 0xff) as f32 / 255.0,
        ((h >> 8) & 0xff) as f32 / 255.0,
        (h & 0xff) as f32 / 255.0,
    ]
}
