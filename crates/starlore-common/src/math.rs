//! Small math helpers, converted from `original_source/src/common/maths.c`
//! and the `rect_collide` helper in `original_source/src/server/server.c`.

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    /// Authoritative positions are integers (spec §3 invariant) so that
    /// client replay is bit-identical. Call this after every movement step.
    pub fn truncate(self) -> Vec2 {
        Vec2::new(self.x.trunc(), self.y.trunc())
    }

    pub fn add(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }
}

/// Linear interpolation, clamped to `[0, 1]` per spec §4.9.
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    a + (b - a) * t
}

pub fn lerp_vec2(a: Vec2, b: Vec2, t: f32) -> Vec2 {
    Vec2::new(lerp(a.x, b.x, t), lerp(a.y, b.y, t))
}

/// Axis-aligned rectangle overlap test, both rects given as (center, size).
/// Converted from `rect_collide` in `original_source/src/server/server.c`.
pub fn rect_collide(center1: Vec2, size1: Vec2, center2: Vec2, size2: Vec2) -> bool {
    let left1 = center1.x - size1.x / 2.0;
    let right1 = center1.x + size1.x / 2.0;
    let top1 = center1.y - size1.y / 2.0;
    let bottom1 = center1.y + size1.y / 2.0;

    let left2 = center2.x - size2.x / 2.0;
    let right2 = center2.x + size2.x / 2.0;
    let top2 = center2.y - size2.y / 2.0;
    let bottom2 = center2.y + size2.y / 2.0;

    left1 <= right2 && right1 >= left2 && top1 <= bottom2 && bottom1 >= top2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_clamps() {
        assert_eq!(lerp(0.0, 10.0, -1.0), 0.0);
        assert_eq!(lerp(0.0, 10.0, 2.0), 10.0);
        assert_eq!(lerp(0.0, 10.0, 0.5), 5.0);
    }

    #[test]
    fn rect_collide_overlap() {
        let a = rect_collide(Vec2::new(0.0, 0.0), Vec2::new(32.0, 32.0), Vec2::new(24.0, 0.0), Vec2::new(32.0, 32.0));
        assert!(a);
        let b = rect_collide(Vec2::new(0.0, 0.0), Vec2::new(32.0, 32.0), Vec2::new(200.0, 0.0), Vec2::new(32.0, 32.0));
        assert!(!b);
    }
}
