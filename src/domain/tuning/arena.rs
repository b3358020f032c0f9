use std::time::Duration;

/// Gameplay tuning for the arena shooter.
///
/// Keep this separate from runtime/server configuration (tick rates, buffer sizes, etc.).
#[derive(Debug, Clone, Copy)]
pub struct ArenaTuning {
    /// Side length of the square world in world units.
    pub world_size: f32,

    /// Collision radius used for bounds, walls and hit checks.
    pub player_radius: f32,

    /// Movement speed in world units per second.
    pub move_speed: f32,

    /// Minimum time between two shots from the same player.
    pub fire_cooldown: Duration,

    /// Maximum distance a shot travels.
    pub shot_range: f32,

    /// Time a killed player stays down before respawning.
    pub respawn_delay: Duration,
}

impl Default for ArenaTuning {
    fn default() -> Self {
        Self {
            world_size: 800.0,
            player_radius: 12.0,
            move_speed: 450.0,
            // Three shots per second.
            fire_cooldown: Duration::from_millis(1000 / 3),
            shot_range: 1000.0,
            respawn_delay: Duration::from_secs(1),
        }
    }
}
