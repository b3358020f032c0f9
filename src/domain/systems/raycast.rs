use crate::domain::state::Wall;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin_x: f32,
    pub origin_y: f32,
    pub dir_x: f32,
    pub dir_y: f32,
}

impl Ray {
    /// Ray from `(x, y)` facing `yaw_degrees` (0 = +X, 90 = +Y).
    pub fn from_yaw(x: f32, y: f32, yaw_degrees: f32) -> Self {
        let rad = yaw_degrees.to_radians();
        Self {
            origin_x: x,
            origin_y: y,
            dir_x: rad.cos(),
            dir_y: rad.sin(),
        }
    }
}

/// Slab test. Returns the entry distance when the wall is strictly ahead of the origin.
pub fn ray_wall_distance(ray: &Ray, wall: &Wall) -> Option<f32> {
    let axes = [
        (ray.origin_x, ray.dir_x, wall.x, wall.x + wall.w),
        (ray.origin_y, ray.dir_y, wall.y, wall.y + wall.h),
    ];

    let mut t_min = 0.0_f32;
    let mut t_max = f32::INFINITY;
    for (origin, dir, lo, hi) in axes {
        if dir.abs() < f32::EPSILON {
            // Parallel to this slab: must already be between its planes.
            if origin < lo || origin > hi {
                return None;
            }
            continue;
        }

        let mut t1 = (lo - origin) / dir;
        let mut t2 = (hi - origin) / dir;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }
        t_min = t_min.max(t1);
        t_max = t_max.min(t2);
        if t_min > t_max {
            return None;
        }
    }

    (t_min > 0.0).then_some(t_min)
}

/// Distance to the closest wall the ray enters, if any.
pub fn nearest_wall_hit(ray: &Ray, walls: &[Wall]) -> Option<f32> {
    walls
        .iter()
        .filter_map(|wall| ray_wall_distance(ray, wall))
        .min_by(|a, b| a.total_cmp(b))
}

/// Distance along the ray to the point closest to the circle center,
/// when that point lies inside the circle and in front of the origin.
pub fn ray_circle_distance(ray: &Ray, cx: f32, cy: f32, radius: f32) -> Option<f32> {
    let len_sq = ray.dir_x * ray.dir_x + ray.dir_y * ray.dir_y;
    if len_sq == 0.0 {
        return None;
    }

    let t = ((cx - ray.origin_x) * ray.dir_x + (cy - ray.origin_y) * ray.dir_y) / len_sq;
    if t < 0.0 {
        return None;
    }

    let px = ray.origin_x + ray.dir_x * t;
    let py = ray.origin_y + ray.dir_y * t;
    let dx = px - cx;
    let dy = py - cy;
    if dx * dx + dy * dy > radius * radius {
        return None;
    }

    Some(t * len_sq.sqrt())
}
