use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable parameters of a traffic simulation.
///
/// Every field has a default matching the reference study setup, so a config file only needs
/// to name the values it overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// How long each signal phase stays green, in s.
    pub green_duration: f64,
    /// The global all-yellow interval between phases, in s.
    pub yellow_duration: f64,
    /// The phase which is green when the cycle starts.
    pub initial_phase: usize,
    /// Extra routing cost per vehicle occupying an edge.
    pub congestion_penalty: f64,
    /// How long a vehicle counts as "in the intersection" after being cleared, in s.
    pub intersection_hold: f64,
    /// How long a vehicle holds its brakes after a blocked arbitration, in s.
    pub braking_hold: f64,
    /// Radius around a waypoint within which it counts as reached, in m.
    /// The current driving offset is added to this.
    pub waypoint_threshold: f64,
    /// Lateral offset to the left used on two-way roads, in m.
    pub left_side_offset: f64,
    /// Inner edge of the approach window where lights and intersections are checked, in m.
    pub approach_near: f64,
    /// Outer edge of the approach window, in m.
    pub approach_far: f64,
    /// Cruise speed, in m/s.
    pub max_speed: f64,
    /// Acceleration towards the cruise speed, in m/s^2.
    pub acceleration: f64,
    /// Half side of the square searched around an intersection centre, in m.
    pub intersection_scan_half_extent: f64,
    /// Offset and size unit of the directional scan boxes, in m.
    pub scan_distance: f64,
    /// Number of vehicles generated when no route cache is supplied.
    pub random_agents: usize,
    /// Delay before the first congestion-aware spawn, in s.
    pub smart_spawn_delay: f64,
    /// Interval between congestion-aware spawns, in s.
    pub smart_spawn_interval: f64,
    /// Seed of the simulation's random number generator.
    pub random_seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            green_duration: 10.0,
            yellow_duration: 1.0,
            initial_phase: 0,
            congestion_penalty: 0.1,
            intersection_hold: 6.0,
            braking_hold: 1.0,
            waypoint_threshold: 4.0,
            left_side_offset: 5.0,
            approach_near: 5.0,
            approach_far: 20.0,
            max_speed: 30.0 / 3.6,
            acceleration: 3.0,
            intersection_scan_half_extent: 50.0,
            scan_distance: 20.0,
            random_agents: 500,
            smart_spawn_delay: 15.0,
            smart_spawn_interval: 10.0,
            random_seed: 0,
        }
    }
}

impl SimConfig {
    /// Parses a config from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::MalformedConfig(e.to_string()))
    }

    /// Reads a config from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
