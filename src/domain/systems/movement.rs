use crate::domain::state::{ArenaInput, ArenaPlayer, Wall};
use crate::domain::systems::collision::{hits_any_wall, resolve};
use crate::domain::tuning::ArenaTuning;

/// Wraps a yaw in degrees into [0, 360).
pub fn normalize_yaw(yaw: f32) -> f32 {
    let wrapped = yaw.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Unnormalized displacement for the held direction keys.
///
/// Up/down follow the facing direction; left/right strafe at yaw -90 / +90.
fn direction(yaw: f32, input: &ArenaInput) -> (f32, f32) {
    let mut dx = 0.0;
    let mut dy = 0.0;

    let forward = yaw.to_radians();
    if input.up {
        dx += forward.cos();
        dy += forward.sin();
    }
    if input.down {
        dx -= forward.cos();
        dy -= forward.sin();
    }

    let left = (yaw - 90.0).to_radians();
    if input.left {
        dx += left.cos();
        dy += left.sin();
    }
    let right = (yaw + 90.0).to_radians();
    if input.right {
        dx += right.cos();
        dy += right.sin();
    }

    (dx, dy)
}

pub fn apply_input(
    player: &mut ArenaPlayer,
    input: &ArenaInput,
    dt: f32,
    cfg: &ArenaTuning,
    walls: &[Wall],
) {
    // rotation
    player.yaw = normalize_yaw(player.yaw + input.yaw_delta);

    let (dx, dy) = direction(player.yaw, input);
    let step = cfg.move_speed * dt;

    // bounds clamp keeps the whole circle inside the world
    let r = cfg.player_radius;
    let max = cfg.world_size - r;
    let cand_x = (player.x + dx * step).max(r).min(max);
    let cand_y = (player.y + dy * step).max(r).min(max);

    if !hits_any_wall(cand_x, cand_y, r, walls) {
        player.x = cand_x;
        player.y = cand_y;
        return;
    }

    let (rx, ry) = resolve(cand_x, cand_y, r, walls);
    if !hits_any_wall(rx, ry, r, walls) {
        player.x = rx;
        player.y = ry;
    }
    // Otherwise the previous position is kept.
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::SpawnPoint;

    fn player_at(x: f32, y: f32, yaw: f32) -> ArenaPlayer {
        ArenaPlayer::new(1, "p".to_string(), SpawnPoint { x, y, yaw })
    }

    #[test]
    fn when_normalizing_yaw_then_result_is_in_range() {
        assert_eq!(normalize_yaw(370.0), 10.0);
        assert_eq!(normalize_yaw(-90.0), 270.0);
        assert_eq!(normalize_yaw(360.0), 0.0);
        let tiny = normalize_yaw(-1e-9);
        assert!((0.0..360.0).contains(&tiny));
    }

    #[test]
    fn when_moving_up_at_zero_yaw_then_player_moves_along_positive_x() {
        let cfg = ArenaTuning::default();
        let mut p = player_at(400.0, 400.0, 0.0);
        let input = ArenaInput {
            up: true,
            ..ArenaInput::default()
        };
        apply_input(&mut p, &input, 0.1, &cfg, &[]);
        assert!((p.x - 445.0).abs() < 1e-3);
        assert!((p.y - 400.0).abs() < 1e-3);
    }

    #[test]
    fn when_strafing_right_at_zero_yaw_then_player_moves_along_positive_y() {
        let cfg = ArenaTuning::default();
        let mut p = player_at(400.0, 400.0, 0.0);
        let input = ArenaInput {
            right: true,
            ..ArenaInput::default()
        };
        apply_input(&mut p, &input, 0.1, &cfg, &[]);
        assert!((p.x - 400.0).abs() < 1e-3);
        assert!((p.y - 445.0).abs() < 1e-3);
    }

    #[test]
    fn when_pushing_past_the_edge_then_position_is_clamped_to_radius() {
        let cfg = ArenaTuning::default();
        let mut p = player_at(20.0, 400.0, 180.0);
        let input = ArenaInput {
            up: true,
            ..ArenaInput::default()
        };
        apply_input(&mut p, &input, 1.0, &cfg, &[]);
        assert_eq!(p.x, cfg.player_radius);
    }

    #[test]
    fn when_turning_then_yaw_delta_is_applied_and_wrapped() {
        let cfg = ArenaTuning::default();
        let mut p = player_at(400.0, 400.0, 350.0);
        let input = ArenaInput {
            yaw_delta: 20.0,
            ..ArenaInput::default()
        };
        apply_input(&mut p, &input, 0.016, &cfg, &[]);
        assert!((p.yaw - 10.0).abs() < 1e-3);
    }

    #[test]
    fn when_moving_into_a_wall_then_player_never_ends_inside_it() {
        let cfg = ArenaTuning::default();
        let walls = [Wall::new(420.0, 300.0, 40.0, 200.0)];
        let mut p = player_at(400.0, 400.0, 0.0);
        let input = ArenaInput {
            up: true,
            ..ArenaInput::default()
        };
        for _ in 0..30 {
            apply_input(&mut p, &input, 1.0 / 60.0, &cfg, &walls);
            assert!(!hits_any_wall(p.x, p.y, cfg.player_radius, &walls));
        }
        assert!(p.x <= 420.0 - cfg.player_radius);
    }
}
