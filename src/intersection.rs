use crate::config::SimConfig;
use crate::math::{rot90, Point2d, Vector2d};
use crate::spatial::{AgentView, ScanBox, SpatialIndex};
use crate::vehicle::Turn;
use arrayvec::ArrayVec;
use cgmath::prelude::*;

/// Decides whether a vehicle may enter an unsignalised intersection.
#[derive(Clone, Copy, Debug)]
pub struct IntersectionArbiter {
    /// Half side of the square searched for vehicles already in the intersection, in m.
    half_extent: f64,
    /// Offset and size unit of the directional scan boxes, in m.
    scan_distance: f64,
}

/// The outcome of an arbitration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// The vehicle may enter the intersection.
    Clear,
    /// The vehicle must stop and try again later.
    MustStop,
}

/// A side of the intersection, relative to the arbitrating vehicle, that is scanned for traffic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Right,
    Left,
    Ahead,
}

impl IntersectionArbiter {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            half_extent: config.intersection_scan_half_extent,
            scan_distance: config.scan_distance,
        }
    }

    /// Decides whether `me` may enter the intersection centred on `centre`.
    ///
    /// The intersection is blocked by any vehicle already committed to it and not heading the
    /// same way. Then, depending on the turn being made, boxes to the right, left and ahead of
    /// the centre are scanned for vehicles heading into the intersection; each of those blocks
    /// unless it is exempted by the right-of-way rules or yields to `me` on priority or stop time.
    pub fn evaluate(&self, me: &AgentView, centre: Point2d, nearby: &dyn SpatialIndex) -> Decision {
        let mut clear = true;

        let committed = nearby.agents_in(&ScanBox::square(centre, self.half_extent));
        for other in committed.iter().filter(|other| other.id != me.id) {
            if other.in_intersection && other.forward.dot(me.forward) <= 0.5 {
                clear = false;
            }
        }

        for side in sides_to_scan(me.turning) {
            let area = self.scan_box(me, centre, side);
            let found = nearby.agents_in(&area);
            log::trace!("{} vehicles {side:?} of {:?} turning {:?}", found.len(), me.id, me.turning);
            for other in found.iter().filter(|other| other.id != me.id) {
                if conflicts(me, other, side) {
                    clear = false;
                }
            }
        }

        if clear {
            Decision::Clear
        } else {
            Decision::MustStop
        }
    }

    /// Builds the box scanned on one side of an intersection, oriented to the vehicle's heading.
    fn scan_box(&self, me: &AgentView, centre: Point2d, side: Side) -> ScanBox {
        let d = self.scan_distance;
        let right = right_of(me.forward);
        let (centre, half_right, half_forward) = match side {
            Side::Right => (centre + right * d, 2.0 * d, d),
            Side::Left => (centre - right * d, 2.0 * d, d),
            Side::Ahead => (centre + me.forward * d, d, 2.0 * d),
        };
        ScanBox {
            centre,
            right,
            forward: me.forward,
            half_right,
            half_forward,
        }
    }
}

/// The sides scanned for each turn.
fn sides_to_scan(turning: Turn) -> ArrayVec<Side, 3> {
    let mut sides = ArrayVec::new();
    sides.push(Side::Right);
    match turning {
        Turn::Left => {}
        Turn::Forward => sides.push(Side::Left),
        Turn::Right => {
            sides.push(Side::Left);
            sides.push(Side::Ahead);
        }
    }
    sides
}

/// The right-hand normal of a heading.
fn right_of(forward: Vector2d) -> Vector2d {
    -rot90(forward)
}

/// Whether a vehicle found on one side of the intersection stops `me` from entering.
fn conflicts(me: &AgentView, other: &AgentView, side: Side) -> bool {
    let right = right_of(me.forward);
    let mine = me.bearing.ordinal();
    let theirs = other.bearing.ordinal();
    let opposite = (mine - theirs).abs() == 2;

    let approaching = match side {
        Side::Right => other.forward.dot(right) < 0.0,
        Side::Left => other.forward.dot(-right) > 0.0,
        Side::Ahead => other.forward.dot(me.forward) < 0.0,
    };

    match (me.turning, side) {
        (Turn::Left, Side::Right) => {
            if !approaching || other.in_intersection || other.at_light {
                return false;
            }
            // Coming from the clockwise-adjacent bearing
            if (mine + 1) % 4 == theirs {
                return false;
            }
            // Coming from the anticlockwise-adjacent bearing and turning
            if (mine + 4 - 1) % 4 == theirs && matches!(other.turning, Turn::Left | Turn::Right) {
                return false;
            }
            // Oncoming and going straight or turning left
            if opposite && matches!(other.turning, Turn::Left | Turn::Forward) {
                return false;
            }
        }
        (Turn::Left, _) => return false,
        (Turn::Forward, _) | (Turn::Right, Side::Right) => {
            if !approaching || other.in_intersection || other.at_light {
                return false;
            }
        }
        (Turn::Right, Side::Left) => {
            if opposite && other.turning == Turn::Right {
                return false;
            }
            if !approaching || other.in_intersection || other.at_light {
                return false;
            }
        }
        (Turn::Right, Side::Ahead) => {
            if opposite && other.turning == Turn::Right {
                return false;
            }
            // Waiting at a light does not exempt oncoming traffic
            if !approaching || other.in_intersection {
                return false;
            }
        }
    }

    !yields(me, other)
}

/// Whether `other` gives way to `me`: it is braking, it is on a lower priority road, or it has
/// been waiting for less time.
fn yields(me: &AgentView, other: &AgentView) -> bool {
    if other.braking || other.road_priority < me.road_priority {
        return true;
    }
    !(other.stop_time < 1.0 || other.stop_time > me.stop_time)
}
