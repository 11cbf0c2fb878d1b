//! Proximity queries between vehicles.

use crate::math::{project_local, Direction, Point2d, Vector2d};
use crate::vehicle::Turn;
use crate::VehicleId;

/// An oriented rectangle in the local frame.
#[derive(Clone, Copy, Debug)]
pub struct ScanBox {
    /// The centre of the box.
    pub centre: Point2d,
    /// Unit vector along the box's width.
    pub right: Vector2d,
    /// Unit vector along the box's length.
    pub forward: Vector2d,
    /// Half the box's width.
    pub half_right: f64,
    /// Half the box's length.
    pub half_forward: f64,
}

impl ScanBox {
    /// Creates an axis-aligned square.
    pub fn square(centre: Point2d, half_extent: f64) -> Self {
        Self {
            centre,
            right: Vector2d::new(1.0, 0.0),
            forward: Vector2d::new(0.0, 1.0),
            half_right: half_extent,
            half_forward: half_extent,
        }
    }

    /// Whether the point lies inside the box, edges included.
    pub fn contains(&self, point: Point2d) -> bool {
        let local = project_local(point, self.centre, self.right, self.forward);
        local.x.abs() <= self.half_right && local.y.abs() <= self.half_forward
    }
}

/// What other vehicles can observe about a vehicle when deciding right of way.
#[derive(Clone, Copy, Debug)]
pub struct AgentView {
    pub id: VehicleId,
    /// Position in the local frame.
    pub position: Point2d,
    /// Unit heading in the local frame.
    pub forward: Vector2d,
    /// Compass bucket of the edge being driven.
    pub bearing: Direction,
    /// The turn to be taken at the next node.
    pub turning: Turn,
    /// Road priority of the edge being driven; higher wins.
    pub road_priority: u8,
    /// Whether the vehicle has been cleared through an intersection and is still in it.
    pub in_intersection: bool,
    /// Whether the vehicle is waiting at a red light.
    pub at_light: bool,
    /// Whether the vehicle is holding its brakes after being blocked.
    pub braking: bool,
    /// The vehicle's tie-break value.
    pub stop_time: f64,
}

/// Something that can find the vehicles inside an area.
pub trait SpatialIndex {
    /// Returns every vehicle positioned inside the box.
    fn agents_in(&self, area: &ScanBox) -> Vec<AgentView>;
}

impl SpatialIndex for [AgentView] {
    fn agents_in(&self, area: &ScanBox) -> Vec<AgentView> {
        self.iter()
            .filter(|view| area.contains(view.position))
            .copied()
            .collect()
    }
}

impl SpatialIndex for Vec<AgentView> {
    fn agents_in(&self, area: &ScanBox) -> Vec<AgentView> {
        self.as_slice().agents_in(area)
    }
}
