use crate::domain::state::{ArenaPlayer, Wall};
use crate::domain::systems::raycast::{Ray, nearest_wall_hit, ray_circle_distance};
use crate::domain::tuning::ArenaTuning;
use std::time::Instant;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotOutcome {
    /// Shooter is dead or the cooldown has not elapsed; nothing happened.
    NotFired,
    Miss,
    Hit { shooter_id: u64, victim_id: u64 },
}

/// Hitscan shot from `shooter` toward `target`.
///
/// Walls closer than the target block the shot. A hit scores a point for the shooter
/// and schedules the victim's respawn.
pub fn fire(
    shooter: &mut ArenaPlayer,
    target: Option<&mut ArenaPlayer>,
    walls: &[Wall],
    cfg: &ArenaTuning,
    now: Instant,
) -> ShotOutcome {
    if !shooter.alive {
        return ShotOutcome::NotFired;
    }
    let cooling_down = shooter
        .last_shot_at
        .is_some_and(|at| now.saturating_duration_since(at) < cfg.fire_cooldown);
    if cooling_down {
        return ShotOutcome::NotFired;
    }
    shooter.last_shot_at = Some(now);

    let Some(target) = target.filter(|t| t.alive) else {
        return ShotOutcome::Miss;
    };

    let ray = Ray::from_yaw(shooter.x, shooter.y, shooter.yaw);
    let Some(target_dist) = ray_circle_distance(&ray, target.x, target.y, cfg.player_radius)
    else {
        return ShotOutcome::Miss;
    };
    if target_dist > cfg.shot_range {
        return ShotOutcome::Miss;
    }
    if nearest_wall_hit(&ray, walls).is_some_and(|wall_dist| wall_dist < target_dist) {
        return ShotOutcome::Miss;
    }

    target.alive = false;
    target.respawn_at = Some(now + cfg.respawn_delay);
    shooter.score += 1;

    info!(
        shooter_id = shooter.id,
        victim_id = target.id,
        shooter_score = shooter.score,
        "player hit"
    );
    ShotOutcome::Hit {
        shooter_id: shooter.id,
        victim_id: target.id,
    }
}

/// Brings a dead player back at their spawn once the respawn deadline passes.
pub fn tick_respawn(player: &mut ArenaPlayer, now: Instant) -> bool {
    match player.respawn_at {
        Some(at) if !player.alive && now >= at => {
            player.respawn();
            true
        }
        _ => false,
    }
}
