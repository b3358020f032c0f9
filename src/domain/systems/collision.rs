use crate::domain::state::Wall;

/// True when a circle at `(x, y)` overlaps the wall rectangle.
pub fn circle_hits_wall(x: f32, y: f32, radius: f32, wall: &Wall) -> bool {
    // Closest point on the rectangle to the circle center.
    let closest_x = x.max(wall.x).min(wall.x + wall.w);
    let closest_y = y.max(wall.y).min(wall.y + wall.h);

    let dx = x - closest_x;
    let dy = y - closest_y;
    dx * dx + dy * dy < radius * radius
}

pub fn hits_any_wall(x: f32, y: f32, radius: f32, walls: &[Wall]) -> bool {
    walls.iter().any(|wall| circle_hits_wall(x, y, radius, wall))
}

/// Nudges a colliding candidate by one unit along X, then along Y.
///
/// Returns the first free nudge, or the candidate unchanged when none is free.
pub fn resolve(x: f32, y: f32, radius: f32, walls: &[Wall]) -> (f32, f32) {
    if !hits_any_wall(x, y, radius, walls) {
        return (x, y);
    }

    let nudges = [(x - 1.0, y), (x + 1.0, y), (x, y - 1.0), (x, y + 1.0)];
    nudges
        .into_iter()
        .find(|&(nx, ny)| !hits_any_wall(nx, ny, radius, walls))
        .unwrap_or((x, y))
}
