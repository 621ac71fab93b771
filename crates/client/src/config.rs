//! Session tuning knobs.

use orrery_protocol::TemplateId;
use serde::{Deserialize, Serialize};

/// Tuning for one mirroring session.
///
/// The defaults reproduce the behavior of the reference controller: cube
/// avatar under template id 1, projectiles appearing two units ahead of the
/// viewpoint, and no cache eviction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Template id registered at bootstrap for the controller's avatar.
    /// Projectiles reuse the same template.
    pub bootstrap_template: TemplateId,
    /// Distance ahead of the viewpoint at which projectiles appear, in
    /// world units.
    pub spawn_offset: f64,
    /// Initial projectile speed, in world units per tick.
    pub spawn_speed: f64,
    /// Scale (and creation-time radius) of spawned projectiles.
    pub spawn_scale: f64,
    /// Inverse mass of spawned projectiles.
    pub spawn_imass: f64,
    /// Evict a cache entry once it has been absent from this many
    /// consecutive enumerations. `None` keeps entries forever.
    pub evict_after_missing: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bootstrap_template: TemplateId::from([1]),
            spawn_offset: 2.0,
            spawn_speed: 0.2,
            spawn_scale: 0.25,
            spawn_imass: 20.0,
            evict_after_missing: None,
        }
    }
}
