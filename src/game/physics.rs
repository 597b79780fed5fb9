//! Arena physics: movement integration, bounds clamping and circle tests
//!
//! Everything here is pure. The authoritative simulator and the client's
//! local predictor call the same functions so their results stay numerically
//! compatible.

/// 2D vector for positions and velocities
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_sq(self, other: Vec2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn distance(self, other: Vec2) -> f32 {
        self.distance_sq(other).sqrt()
    }

    /// Per-axis linear interpolation
    pub fn lerp(self, other: Vec2, t: f32) -> Vec2 {
        Vec2 {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

/// Arena dimensions and body constants
#[derive(Debug, Clone, Copy)]
pub struct ArenaParams {
    /// World extent along x
    pub width: f32,
    /// World extent along y
    pub height: f32,
    /// Participant movement speed (units per second)
    pub speed: f32,
    /// Participant body radius
    pub participant_radius: f32,
    /// Pickup radius
    pub pickup_radius: f32,
}

impl Default for ArenaParams {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            speed: 200.0,
            participant_radius: 15.0,
            pickup_radius: 10.0,
        }
    }
}

impl ArenaParams {
    /// Starting positions: left and right quarter of the world, vertically centered
    pub fn spawn_positions(&self) -> [Vec2; 2] {
        [
            Vec2::new(self.width * 0.25, self.height * 0.5),
            Vec2::new(self.width * 0.75, self.height * 0.5),
        ]
    }

    /// Distance at or under which a participant collects the pickup
    pub fn pickup_distance(&self) -> f32 {
        self.participant_radius + self.pickup_radius
    }
}

/// Movement direction from a participant's directional keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Direction {
    pub dx: i8,
    pub dy: i8,
}

impl Direction {
    pub const NONE: Direction = Direction { dx: 0, dy: 0 };

    /// Build a direction; each axis must be -1, 0 or 1
    pub fn new(dx: i8, dy: i8) -> Option<Self> {
        let valid = |v: i8| (-1..=1).contains(&v);
        (valid(dx) && valid(dy)).then_some(Self { dx, dy })
    }

    /// Velocity for this direction at the given speed (axes are not normalized)
    pub fn velocity(self, speed: f32) -> Vec2 {
        Vec2::new(f32::from(self.dx) * speed, f32::from(self.dy) * speed)
    }
}

/// Physics system for participant movement and pickup checks
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Euler step, then clamp to the world bounds shrunk by the participant radius
    pub fn integrate(position: Vec2, velocity: Vec2, dt: f32, params: &ArenaParams) -> Vec2 {
        let moved = Vec2::new(position.x + velocity.x * dt, position.y + velocity.y * dt);
        Self::clamp_to_bounds(moved, params)
    }

    /// Clamp both axes to `[radius, extent - radius]`
    pub fn clamp_to_bounds(position: Vec2, params: &ArenaParams) -> Vec2 {
        let r = params.participant_radius;
        Vec2::new(
            position.x.clamp(r, params.width - r),
            position.y.clamp(r, params.height - r),
        )
    }

    /// Push two overlapping participants apart along the separating axis.
    ///
    /// Each body moves by half the overlap, so the midpoint is preserved.
    /// Coincident bodies (zero distance) are left alone since there is no axis.
    pub fn resolve_participant_overlap(a: Vec2, b: Vec2, params: &ArenaParams) -> (Vec2, Vec2) {
        let dx = a.x - b.x;
        let dy = a.y - b.y;
        let dist = (dx * dx + dy * dy).sqrt();
        let min_dist = params.participant_radius * 2.0;

        if dist >= min_dist || dist <= 0.0 {
            return (a, b);
        }

        let push = (min_dist - dist) * 0.5;
        let nx = dx / dist;
        let ny = dy / dist;

        (
            Vec2::new(a.x + nx * push, a.y + ny * push),
            Vec2::new(b.x - nx * push, b.y - ny * push),
        )
    }

    /// True if the participant touches the pickup (boundary inclusive)
    pub fn pickup_test(participant: Vec2, pickup: Vec2, params: &ArenaParams) -> bool {
        let reach = params.pickup_distance();
        participant.distance_sq(pickup) <= reach * reach
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrate_moves_and_clamps() {
        let params = ArenaParams::default();
        let moved = PhysicsSystem::integrate(
            Vec2::new(200.0, 300.0),
            Vec2::new(200.0, 0.0),
            1.0 / 30.0,
            &params,
        );
        assert!((moved.x - 206.666_67).abs() < 1e-3);
        assert_eq!(moved.y, 300.0);

        let clamped = PhysicsSystem::integrate(
            Vec2::new(10.0, 590.0),
            Vec2::new(-1000.0, 1000.0),
            1.0,
            &params,
        );
        assert_eq!(clamped, Vec2::new(15.0, 585.0));
    }

    #[test]
    fn integrate_always_stays_in_bounds() {
        let params = ArenaParams::default();
        let r = params.participant_radius;
        let velocities = [-200.0_f32, 0.0, 200.0, 5000.0];
        let mut pos = Vec2::new(400.0, 300.0);
        for &vx in &velocities {
            for &vy in &velocities {
                for _ in 0..200 {
                    pos = PhysicsSystem::integrate(pos, Vec2::new(vx, vy), 1.0 / 30.0, &params);
                    assert!(pos.x >= r && pos.x <= params.width - r);
                    assert!(pos.y >= r && pos.y <= params.height - r);
                }
            }
        }
    }

    #[test]
    fn overlap_resolution_preserves_midpoint() {
        let params = ArenaParams::default();
        let a = Vec2::new(100.0, 100.0);
        let b = Vec2::new(110.0, 100.0);
        let (a2, b2) = PhysicsSystem::resolve_participant_overlap(a, b, &params);

        assert!((a2.distance(b2) - 30.0).abs() < 1e-4);
        assert!(((a2.x + b2.x) * 0.5 - 105.0).abs() < 1e-4);
        assert!(a2.x < a.x && b2.x > b.x);
    }

    #[test]
    fn overlap_resolution_ignores_separated_and_coincident() {
        let params = ArenaParams::default();
        let a = Vec2::new(100.0, 100.0);
        let far = Vec2::new(140.0, 100.0);
        assert_eq!(PhysicsSystem::resolve_participant_overlap(a, far, &params), (a, far));
        assert_eq!(PhysicsSystem::resolve_participant_overlap(a, a, &params), (a, a));
    }

    #[test]
    fn pickup_test_is_boundary_inclusive() {
        let params = ArenaParams::default();
        let coin = Vec2::new(400.0, 300.0);
        assert!(PhysicsSystem::pickup_test(Vec2::new(425.0, 300.0), coin, &params));
        assert!(PhysicsSystem::pickup_test(Vec2::new(400.0, 275.0), coin, &params));
        assert!(!PhysicsSystem::pickup_test(Vec2::new(425.01, 300.0), coin, &params));
        // symmetric
        assert_eq!(
            PhysicsSystem::pickup_test(Vec2::new(415.0, 320.0), coin, &params),
            PhysicsSystem::pickup_test(coin, Vec2::new(415.0, 320.0), &params),
        );
    }

    #[test]
    fn direction_rejects_out_of_range() {
        assert!(Direction::new(1, -1).is_some());
        assert!(Direction::new(2, 0).is_none());
        assert_eq!(Direction::new(1, 0).map(|d| d.velocity(200.0)), Some(Vec2::new(200.0, 0.0)));
    }
}
