//! The per-object kinematic snapshot exchanged with the server.
//!
//! Field names and defaults follow the server's JSON schema verbatim, which
//! is why two fields keep their camelCase wire spelling via serde renames.
//! Servers routinely omit fields that still hold their defaults, so the
//! whole struct deserializes with per-field fallbacks.

use serde::{Deserialize, Serialize};

/// 3-component vector (position, velocity).
pub type Vec3 = [f64; 3];
/// Quaternion in (x, y, z, w) order.
pub type Quat = [f64; 4];

/// Collision shape descriptor for a plain sphere (the server default).
///
/// Element 0 selects the shape kind, the remaining elements are
/// shape-specific parameters.
pub const CSHAPE_SPHERE: [f64; 4] = [1.0, 1.0, 1.0, 1.0];

/// Collision shape descriptor for a dynamic composite body.
///
/// Every object spawned through this client carries this tag regardless of
/// its template's own descriptor.
pub const CSHAPE_DYNAMIC: [f64; 4] = [4.0, 1.0, 1.0, 1.0];

/// Kinematic + physical snapshot of one object at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateVariable {
    pub radius: f64,
    pub scale: f64,
    /// Inverse mass; 0 denotes an immovable object.
    pub imass: f64,
    pub restitution: f64,
    /// Orientation quaternion (x, y, z, w), applied verbatim by consumers.
    pub orientation: Quat,
    pub position: Vec3,
    #[serde(rename = "velocityLin")]
    pub velocity_lin: Vec3,
    #[serde(rename = "velocityRot")]
    pub velocity_rot: Vec3,
    pub cshape: [f64; 4],
}

impl Default for StateVariable {
    fn default() -> Self {
        Self {
            radius: 1.0,
            scale: 1.0,
            imass: 1.0,
            restitution: 0.9,
            orientation: [0.0, 0.0, 0.0, 1.0],
            position: [0.0; 3],
            velocity_lin: [0.0; 3],
            velocity_rot: [0.0; 3],
            cshape: CSHAPE_SPHERE,
        }
    }
}

impl StateVariable {
    /// Builds the snapshot for spawning a dynamic object.
    ///
    /// Keeps the creation-time invariant `scale == radius` and forces the
    /// dynamic composite collision tag.
    pub fn dynamic(position: Vec3, velocity: Vec3, orientation: Quat, scale: f64, imass: f64) -> Self {
        Self {
            radius: scale,
            scale,
            imass,
            orientation,
            position,
            velocity_lin: velocity,
            cshape: CSHAPE_DYNAMIC,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_server_schema() {
        let sv = StateVariable::default();
        assert_eq!(sv.radius, 1.0);
        assert_eq!(sv.scale, 1.0);
        assert_eq!(sv.imass, 1.0);
        assert_eq!(sv.restitution, 0.9);
        assert_eq!(sv.orientation, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(sv.cshape, CSHAPE_SPHERE);
    }

    #[test]
    fn partial_json_fills_defaults() {
        // Servers omit fields still at their defaults.
        let sv: StateVariable =
            serde_json::from_str(r#"{"position": [1.0, 2.0, 3.0], "scale": 2.0}"#).unwrap();
        assert_eq!(sv.position, [1.0, 2.0, 3.0]);
        assert_eq!(sv.scale, 2.0);
        assert_eq!(sv.restitution, 0.9);
        assert_eq!(sv.velocity_lin, [0.0; 3]);
    }

    #[test]
    fn wire_names_keep_camel_case() {
        let text = serde_json::to_string(&StateVariable::default()).unwrap();
        assert!(text.contains("\"velocityLin\""));
        assert!(text.contains("\"velocityRot\""));
        assert!(text.contains("\"cshape\""));
    }

    #[test]
    fn dynamic_spawn_state_keeps_invariants() {
        let sv = StateVariable::dynamic([1.0, 0.0, 0.0], [0.0, 0.2, 0.0], [0.0, 0.0, 0.0, 1.0], 0.25, 20.0);
        assert_eq!(sv.scale, sv.radius);
        assert_eq!(sv.cshape, CSHAPE_DYNAMIC);
        assert_eq!(sv.imass, 20.0);
        assert_eq!(sv.velocity_lin, [0.0, 0.2, 0.0]);
    }
}
