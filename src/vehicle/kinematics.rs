use crate::math::{try_normalize, Point2d, Vector2d};
use cgmath::prelude::*;

/// Point-mass motion of a vehicle steering straight at its current target.
#[derive(Clone, Debug)]
pub struct Kinematics {
    /// Position in the local frame.
    pos: Point2d,
    /// Unit heading in the local frame.
    dir: Vector2d,
    /// The velocity in m/s.
    vel: f64,
    /// The maximum acceleration in m/s<sup>2</sup>.
    max_acc: f64,
    /// The cruise speed in m/s.
    max_vel: f64,
}

impl Kinematics {
    pub fn new(max_acc: f64, max_vel: f64) -> Self {
        Self {
            pos: Point2d::new(0.0, 0.0),
            dir: Vector2d::new(0.0, 1.0),
            vel: 0.0,
            max_acc,
            max_vel,
        }
    }

    pub fn position(&self) -> Point2d {
        self.pos
    }

    pub fn direction(&self) -> Vector2d {
        self.dir
    }

    pub fn vel(&self) -> f64 {
        self.vel
    }

    /// Places the vehicle at rest.
    pub fn place(&mut self, pos: Point2d, dir: Vector2d) {
        self.pos = pos;
        self.dir = try_normalize(dir).unwrap_or(self.dir);
        self.vel = 0.0;
    }

    /// Brings the vehicle to an immediate stop.
    pub fn stop(&mut self) {
        self.vel = 0.0;
    }

    /// Accelerates towards the cruise speed, as on a free road.
    fn free_road_acc(&self) -> f64 {
        if self.max_vel <= 0.0 {
            return 0.0;
        }
        self.max_acc * (1.0 - (self.vel / self.max_vel).powi(4))
    }

    /// Integrates the vehicle's motion towards `target`, never overshooting it.
    ///
    /// # Parameters
    /// * `target` - The point being steered at
    /// * `dt` - The time step in seconds
    pub fn drive_towards(&mut self, target: Point2d, dt: f64) {
        let to_target = target - self.pos;
        let dist = to_target.magnitude();
        if let Some(dir) = try_normalize(to_target) {
            self.dir = dir;
        }

        let vel = (self.vel + dt * self.free_road_acc()).clamp(0.0, self.max_vel.max(0.0));
        let step = 0.5 * (self.vel + vel) * dt;
        self.vel = vel;
        self.pos += self.dir * f64::min(step, dist);
    }
}
