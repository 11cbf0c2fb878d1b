use self::kinematics::Kinematics;
use crate::config::SimConfig;
use crate::error::{Error, Result};
use crate::graph::RoadGraph;
use crate::intersection::{Decision, IntersectionArbiter};
use crate::light::TrafficLightCycle;
use crate::math::{bearing, rot90, try_normalize, Direction, Point2d, Projection, Vector2d};
use crate::spatial::{AgentView, SpatialIndex};
use crate::util::Interval;
use crate::{NodeId, VehicleId};
use cgmath::prelude::*;
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::Rng;

mod kinematics;

/// Road priority of the first and last edges of a route, which never give way.
const DEFAULT_PRIORITY: u8 = 5;

/// A simulated car following a fixed route through the road network.
///
/// The vehicle drives edge by edge. While it travels along the edge from `route[cursor]` to
/// `route[cursor + 1]` it is counted in that edge's congestion.
#[derive(Clone, Debug)]
pub struct VehicleAgent {
    /// The vehicle's ID
    id: VehicleId,
    /// The nodes to visit, in order.
    route: Vec<NodeId>,
    /// The local frame positions of the route's nodes.
    points: Vec<Point2d>,
    /// Whether each edge of the route is one-way.
    one_ways: Vec<bool>,
    /// The index of the node most recently reached.
    cursor: usize,
    /// What the vehicle is doing.
    state: AgentState,
    /// The vehicle's motion.
    kin: Kinematics,
    /// The lateral offset used on two-way roads, in m.
    left_side_offset: f64,
    /// The current lateral offset to the left of the road centreline, in m.
    offset: f64,
    /// The turn to be made at the next node.
    turning: Turn,
    /// The compass bucket of the current edge.
    bearing: Direction,
    /// The road priority of the current edge.
    road_priority: u8,
    /// Time left in the intersection the vehicle was last cleared through, in s.
    intersection_hold: f64,
    /// Time left holding the brakes after a blocked arbitration, in s.
    braking_hold: f64,
    /// Whether the vehicle is stopped at a red light.
    at_light: bool,
    /// The tie-break value used by right-of-way arbitration.
    stop_time: f64,
    /// The index of the last node the vehicle was cleared through.
    cleared: Option<usize>,
    /// Whether the vehicle has been paused from outside.
    paused: bool,
    /// Set on arrival until collected by the vehicle's owner.
    reached_destination: bool,
}

/// The state of a [VehicleAgent].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AgentState {
    /// No drivable route has been assigned.
    #[default]
    Idle,
    /// Following the route.
    Driving,
    /// Stopped at a red light.
    WaitingAtLight,
    /// Stopped at an intersection after braking, waiting to arbitrate again.
    WaitingAtIntersection,
    /// Holding the brakes after being refused entry to an intersection.
    Braking,
    /// At the end of the route.
    Arrived,
}

/// The turn a vehicle makes at a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Turn {
    #[default]
    Left,
    Forward,
    Right,
}

/// The shared state a vehicle reads and updates during a tick.
pub struct TickContext<'a> {
    /// The road network, whose congestion counters the vehicle updates.
    pub graph: &'a RoadGraph,
    /// The traffic signals.
    pub lights: &'a TrafficLightCycle,
    /// The other vehicles.
    pub nearby: &'a dyn SpatialIndex,
    /// Decides right of way at intersections.
    pub arbiter: &'a IntersectionArbiter,
    /// The simulation parameters.
    pub config: &'a SimConfig,
    /// Source of arbitration tie-break values.
    pub rng: &'a mut StdRng,
}

impl VehicleAgent {
    /// Creates an idle vehicle.
    pub(crate) fn new(id: VehicleId, config: &SimConfig) -> Self {
        Self {
            id,
            route: vec![],
            points: vec![],
            one_ways: vec![],
            cursor: 0,
            state: AgentState::Idle,
            kin: Kinematics::new(config.acceleration, config.max_speed),
            left_side_offset: config.left_side_offset,
            offset: 0.0,
            turning: Turn::default(),
            bearing: Direction::default(),
            road_priority: DEFAULT_PRIORITY,
            intersection_hold: 0.0,
            braking_hold: 0.0,
            at_light: false,
            stop_time: 0.0,
            cleared: None,
            paused: false,
            reached_destination: false,
        }
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The route being followed.
    pub fn route(&self) -> &[NodeId] {
        &self.route
    }

    /// The index of the route node most recently reached.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    /// The node being driven towards, if any.
    pub fn target(&self) -> Option<NodeId> {
        match self.state {
            AgentState::Idle | AgentState::Arrived => None,
            _ => self.route.get(self.cursor + 1).copied(),
        }
    }

    /// Gets the position of the vehicle in the local frame.
    pub fn position(&self) -> Point2d {
        self.kin.position()
    }

    /// Gets the heading of the vehicle in the local frame.
    pub fn direction(&self) -> Vector2d {
        self.kin.direction()
    }

    /// The vehicle's speed in m/s.
    pub fn speed(&self) -> f64 {
        self.kin.vel()
    }

    /// The current lateral offset from the road centreline, in m.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn turning(&self) -> Turn {
        self.turning
    }

    pub fn bearing(&self) -> Direction {
        self.bearing
    }

    pub fn road_priority(&self) -> u8 {
        self.road_priority
    }

    pub fn stop_time(&self) -> f64 {
        self.stop_time
    }

    /// Whether the vehicle is still inside the last intersection it was cleared through.
    pub fn in_intersection(&self) -> bool {
        self.intersection_hold > 0.0
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether the vehicle is at the end of its route.
    pub fn has_arrived(&self) -> bool {
        self.state == AgentState::Arrived
    }

    /// Collects the one-shot "reached destination" flag.
    pub fn take_reached_destination(&mut self) -> bool {
        std::mem::take(&mut self.reached_destination)
    }

    /// Pauses or resumes the vehicle. A paused vehicle stays where it is and keeps its state.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        if paused {
            self.kin.stop();
        }
    }

    /// What other vehicles can observe about this one, or `None` if it is not on the road.
    pub fn view(&self) -> Option<AgentView> {
        if self.state == AgentState::Idle {
            return None;
        }
        Some(AgentView {
            id: self.id,
            position: self.kin.position(),
            forward: self.kin.direction(),
            bearing: self.bearing,
            turning: self.turning,
            road_priority: self.road_priority,
            in_intersection: self.in_intersection(),
            at_light: self.at_light,
            braking: self.state == AgentState::Braking,
            stop_time: self.stop_time,
        })
    }

    /// Puts the vehicle at the start of a new route.
    ///
    /// A route with fewer than two nodes cannot be driven and leaves the vehicle idle.
    pub fn assign_route(
        &mut self,
        route: Vec<NodeId>,
        graph: &RoadGraph,
        projection: &dyn Projection,
    ) -> Result<()> {
        let points = project_route(&route, graph, projection)?;
        self.release_congestion(graph);

        self.one_ways = one_way_cache(&route, graph);
        self.route = route;
        self.points = points;
        self.reached_destination = false;

        if self.route.len() < 2 {
            log::warn!("Vehicle {:?} given a route of {} nodes", self.id, self.route.len());
            self.cursor = 0;
            self.state = AgentState::Idle;
            return Ok(());
        }
        self.restart(graph);
        Ok(())
    }

    /// Swaps in a new route, keeping the vehicle's place in it.
    ///
    /// The new route must extend past the cursor; otherwise the old route is kept.
    pub fn replace_route(
        &mut self,
        route: Vec<NodeId>,
        graph: &RoadGraph,
        projection: &dyn Projection,
    ) -> Result<()> {
        if self.cursor + 1 >= route.len() {
            log::warn!(
                "Vehicle {:?} kept its route: replacement of {} nodes ends before node {}",
                self.id,
                route.len(),
                self.cursor + 1
            );
            return Ok(());
        }
        let points = project_route(&route, graph, projection)?;
        let holding = self.holds_edge();
        self.release_congestion(graph);

        self.one_ways = one_way_cache(&route, graph);
        self.route = route;
        self.points = points;
        if holding {
            graph.add_congestion(self.route[self.cursor], self.route[self.cursor + 1]);
            self.update_edge(graph);
        }
        log::debug!("Vehicle {:?} rerouted over {} nodes", self.id, self.route.len());
        Ok(())
    }

    /// Moves the vehicle back to the start of its route, ready to drive it again.
    pub fn teleport_to_route_start(&mut self, graph: &RoadGraph) {
        self.release_congestion(graph);
        self.reached_destination = false;
        if self.route.len() < 2 {
            self.state = AgentState::Idle;
            return;
        }
        self.restart(graph);
    }

    /// Releases the congestion of the edge being driven, e.g. before the vehicle is removed.
    pub fn release_congestion(&mut self, graph: &RoadGraph) {
        if self.holds_edge() {
            graph.remove_congestion(self.route[self.cursor], self.route[self.cursor + 1]);
        }
    }

    /// Whether the vehicle is counted in the congestion of `(route[cursor], route[cursor + 1])`.
    fn holds_edge(&self) -> bool {
        !matches!(self.state, AgentState::Idle | AgentState::Arrived)
            && self.cursor + 1 < self.route.len()
    }

    /// Advances the vehicle by `dt` seconds.
    pub fn tick(&mut self, dt: f64, ctx: &mut TickContext) {
        if self.paused {
            self.kin.stop();
            return;
        }
        if matches!(self.state, AgentState::Idle | AgentState::Arrived) {
            return;
        }

        self.intersection_hold = f64::max(self.intersection_hold - dt, 0.0);
        if self.state == AgentState::Braking {
            self.braking_hold -= dt;
            if self.braking_hold <= 0.0 {
                self.braking_hold = 0.0;
                self.state = AgentState::WaitingAtIntersection;
            }
            self.kin.stop();
            return;
        }

        let (from, to) = (self.route[self.cursor], self.route[self.cursor + 1]);
        let node_point = self.points[self.cursor + 1];
        let distance = self.kin.position().distance(node_point);
        let config = ctx.config;

        if Interval::new(config.approach_near, config.approach_far).contains_exclusive(distance) {
            if ctx.lights.should_stop(ctx.graph, from, to) {
                if !self.at_light {
                    log::debug!("Vehicle {:?} waiting at light {:?}", self.id, to);
                }
                self.at_light = true;
                self.state = AgentState::WaitingAtLight;
                self.kin.stop();
                return;
            }
            self.at_light = false;

            if self.needs_arbitration(ctx.graph) {
                match self.arbitrate(node_point, ctx.nearby, ctx.arbiter) {
                    Decision::Clear => {
                        log::debug!("Vehicle {:?} cleared through {:?}", self.id, to);
                        self.intersection_hold = config.intersection_hold;
                        self.stop_time = ctx.rng.gen_range(0.0..1.0);
                        self.cleared = Some(self.cursor + 1);
                    }
                    Decision::MustStop => {
                        log::debug!("Vehicle {:?} blocked at {:?}", self.id, to);
                        self.stop_time += 1.0;
                        self.braking_hold = config.braking_hold;
                        self.state = AgentState::Braking;
                        self.kin.stop();
                        return;
                    }
                }
            }
        }

        self.state = AgentState::Driving;
        self.kin.drive_towards(self.target_point(), dt);

        let distance = self.kin.position().distance(node_point);
        if distance < config.waypoint_threshold + self.offset {
            self.reach_waypoint(ctx.graph);
        }
    }

    /// Whether the next node is an intersection the vehicle still has to be cleared through.
    fn needs_arbitration(&self, graph: &RoadGraph) -> bool {
        let next = self.cursor + 1;
        let node = self.route[next];
        !graph.is_signal(node)
            && graph.is_intersection(node)
            && !self.in_intersection()
            && self.cleared != Some(next)
    }

    fn arbitrate(
        &self,
        centre: Point2d,
        nearby: &dyn SpatialIndex,
        arbiter: &IntersectionArbiter,
    ) -> Decision {
        match self.view() {
            Some(me) => arbiter.evaluate(&me, centre, nearby),
            None => Decision::Clear,
        }
    }

    /// Moves on to the next edge, or arrives if the route is complete.
    fn reach_waypoint(&mut self, graph: &RoadGraph) {
        graph.remove_congestion(self.route[self.cursor], self.route[self.cursor + 1]);
        self.cursor += 1;

        if self.cursor + 1 >= self.route.len() {
            log::debug!("Vehicle {:?} arrived", self.id);
            self.state = AgentState::Arrived;
            self.reached_destination = true;
            self.offset = 0.0;
            self.at_light = false;
            self.kin.stop();
            return;
        }

        graph.add_congestion(self.route[self.cursor], self.route[self.cursor + 1]);
        self.update_edge(graph);
    }

    /// Resets the vehicle to the first edge of its route.
    fn restart(&mut self, graph: &RoadGraph) {
        self.cursor = 0;
        self.state = AgentState::Driving;
        self.intersection_hold = 0.0;
        self.braking_hold = 0.0;
        self.at_light = false;
        self.stop_time = 0.0;
        self.cleared = None;
        graph.add_congestion(self.route[0], self.route[1]);
        self.update_edge(graph);

        let dir = self.points[1] - self.points[0];
        let left = try_normalize(dir).map(rot90).unwrap_or_else(Vector2d::zero);
        self.kin.place(self.points[0] + left * self.offset, dir);
    }

    /// The point being steered at: the next node, shifted to the driving side of the edge.
    fn target_point(&self) -> Point2d {
        let (a, b) = (self.points[self.cursor], self.points[self.cursor + 1]);
        let left = try_normalize(b - a).map(rot90).unwrap_or_else(Vector2d::zero);
        b + left * self.offset
    }

    /// Whether edge `idx` of the route is one-way. An index outside the route is logged and
    /// treated as two-way.
    fn on_one_way(&self, idx: usize) -> bool {
        match self.one_ways.get(idx) {
            Some(one_way) => *one_way,
            None => {
                log::warn!(
                    "Vehicle {:?} has no one-way entry {idx} (route has {} edges)",
                    self.id,
                    self.one_ways.len()
                );
                false
            }
        }
    }

    /// Recomputes everything derived from the current edge.
    fn update_edge(&mut self, graph: &RoadGraph) {
        let one_way = self.on_one_way(self.cursor);
        self.offset = if one_way { 0.0 } else { self.left_side_offset };
        self.turning = self.next_turn();

        let (from, to) = (self.route[self.cursor], self.route[self.cursor + 1]);
        if let (Some(a), Some(b)) = (graph.node(from), graph.node(to)) {
            self.bearing = Direction::from_degrees(bearing(a.lat(), a.lon(), b.lat(), b.lon()));
        }

        let first_or_last = self.cursor == 0 || self.cursor + 2 >= self.route.len();
        self.road_priority = if first_or_last {
            DEFAULT_PRIORITY
        } else {
            match (self.bearing, one_way) {
                (Direction::East | Direction::West, true) => 1,
                (Direction::North | Direction::South, true) => 2,
                (Direction::East | Direction::West, false) => 3,
                (Direction::North | Direction::South, false) => 5,
            }
        };
    }

    /// The turn to be made at the end of the current edge.
    fn next_turn(&self) -> Turn {
        let c = self.cursor;
        if c + 2 >= self.points.len() {
            return Turn::Forward;
        }
        let forward = try_normalize(self.points[c + 1] - self.points[c]);
        let next = try_normalize(self.points[c + 2] - self.points[c + 1]);
        let (Some(forward), Some(next)) = (forward, next) else {
            return Turn::Forward;
        };
        let dot = rot90(forward).dot(next);
        if dot > 0.5 {
            Turn::Left
        } else if dot < -0.5 {
            Turn::Right
        } else {
            Turn::Forward
        }
    }
}

/// Projects each node of a route into the local frame.
fn project_route(
    route: &[NodeId],
    graph: &RoadGraph,
    projection: &dyn Projection,
) -> Result<Vec<Point2d>> {
    route
        .iter()
        .map(|id| {
            graph
                .node(*id)
                .map(|node| projection.to_local(node.lat(), node.lon()))
                .ok_or_else(|| Error::UnknownNode(format!("{id:?}")))
        })
        .collect()
}

/// Looks up whether each edge of a route is one-way.
fn one_way_cache(route: &[NodeId], graph: &RoadGraph) -> Vec<bool> {
    route
        .iter()
        .tuple_windows()
        .map(|(from, to)| graph.is_one_way(*from, *to))
        .collect()
}
