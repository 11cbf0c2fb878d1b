pub use cgmath;
pub use config::SimConfig;
pub use error::{Error, Result};
pub use fleet::{Fleet, OdPair, OdPairs, PlayerTrip, RouteCache, RouteRecord};
pub use graph::{Neighbour, Node, RoadGraph, Way};
pub use intersection::{Decision, IntersectionArbiter};
pub use light::{LightState, TrafficLightCycle};
pub use math::{Direction, Point2d, Projection, Vector2d, WebMercator};
pub use router::Router;
pub use simulation::Simulation;
pub use slotmap::{Key, KeyData};
pub use spatial::{AgentView, ScanBox, SpatialIndex};
pub use util::Interval;
pub use vehicle::{AgentState, TickContext, Turn, VehicleAgent};

mod config;
mod error;
mod fleet;
pub mod graph;
mod intersection;
mod light;
pub mod math;
mod router;
mod simulation;
mod spatial;
mod util;
mod vehicle;

slotmap::new_key_type! {
    /// Unique ID of a [Node] in a [RoadGraph].
    pub struct NodeId;
    /// Unique ID of a [VehicleAgent].
    pub struct VehicleId;
}
