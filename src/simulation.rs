use crate::config::SimConfig;
use crate::error::Result;
use crate::fleet::{Fleet, OdPairs, PlayerTrip, RouteCache};
use crate::graph::RoadGraph;
use crate::intersection::IntersectionArbiter;
use crate::light::TrafficLightCycle;
use crate::math::Projection;
use crate::router::Router;
use crate::vehicle::VehicleAgent;
use crate::VehicleId;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

/// A traffic simulation over a road network.
pub struct Simulation {
    /// The road network.
    graph: RoadGraph,
    /// Converts node coordinates into the local frame.
    projection: Box<dyn Projection>,
    /// The traffic signals.
    lights: TrafficLightCycle,
    /// Decides right of way at intersections.
    arbiter: IntersectionArbiter,
    /// The vehicles being simulated.
    fleet: Fleet,
    /// The simulation parameters.
    config: SimConfig,
    /// Source of all randomness in the simulation.
    rng: StdRng,
    /// The simulated time in s.
    time: f64,
    /// The current frame of simulation.
    frame: usize,
}

impl Simulation {
    /// Creates a simulation using a projection centred on the road network.
    pub fn new(graph: RoadGraph, config: SimConfig) -> Self {
        let projection = graph.projection();
        Self::with_projection(graph, config, projection)
    }

    /// Creates a simulation which places nodes using the given projection.
    pub fn with_projection(
        graph: RoadGraph,
        config: SimConfig,
        projection: impl Projection + 'static,
    ) -> Self {
        Self {
            lights: TrafficLightCycle::new(&graph, &config),
            arbiter: IntersectionArbiter::new(&config),
            fleet: Fleet::new(),
            rng: StdRng::seed_from_u64(config.random_seed),
            projection: Box::new(projection),
            graph,
            config,
            time: 0.0,
            frame: 0,
        }
    }

    /// Gets the road network.
    pub fn graph(&self) -> &RoadGraph {
        &self.graph
    }

    /// Gets the traffic signals.
    pub fn lights(&self) -> &TrafficLightCycle {
        &self.lights
    }

    /// Gets the vehicles.
    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The simulated time in s.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Gets the current simulation frame index.
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Gets a reference to the vehicle with the given ID.
    pub fn get_vehicle(&self, id: VehicleId) -> Option<&VehicleAgent> {
        self.fleet.get(id)
    }

    /// Returns an iterator over all the vehicles in the simulation.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &VehicleAgent> {
        self.fleet.iter()
    }

    /// A router over the simulation's road network.
    pub fn router(&self) -> Router<'_> {
        Router::new(&self.graph, self.config.congestion_penalty)
    }

    /// Spawns background vehicles from a route cache, returning how many were spawned.
    pub fn spawn_cached(&mut self, cache: &RouteCache) -> usize {
        self.fleet
            .spawn_cached(cache, &self.graph, self.projection.as_ref(), &self.config)
    }

    /// Spawns up to `count` background vehicles between random nodes and returns their routes.
    pub fn spawn_random(&mut self, count: usize) -> Result<RouteCache> {
        let router = Router::new(&self.graph, self.config.congestion_penalty);
        self.fleet.spawn_random(
            count,
            &self.graph,
            &router,
            self.projection.as_ref(),
            &self.config,
            &mut self.rng,
        )
    }

    /// Queues congestion-aware spawns for a set of origin-destination pairs.
    pub fn schedule_smart(&mut self, pairs: OdPairs) {
        self.fleet.schedule_smart(pairs, self.time, &self.config);
    }

    /// Adds the player's vehicle on the shortest route of a trip.
    pub fn add_player(&mut self, trip: &PlayerTrip) -> Result<VehicleId> {
        let start = self.graph.node_id(&trip.origin_node)?;
        let end = self.graph.node_id(&trip.destination_node)?;
        let route = self.router().shortest_path(start, end)?;
        self.fleet
            .add_player(route, &self.graph, self.projection.as_ref(), &self.config)
    }

    /// Sends a vehicle on a detour through a node more than `min_distance` beyond the node it
    /// is heading for, then on to its destination. Returns whether the route changed.
    pub fn detour(&mut self, id: VehicleId, min_distance: f64) -> Result<bool> {
        let Some(agent) = self.fleet.get(id) else {
            return Ok(false);
        };
        let Some(next) = agent.target() else {
            return Ok(false);
        };
        let route = agent.route().to_vec();
        let target_idx = agent.cursor() + 1;

        let on_route: HashSet<_> = route.iter().copied().collect();
        let Some(via) = self.graph.find_node_beyond(next, min_distance, &on_route) else {
            log::warn!("No detour node beyond {}", self.graph.display_name(next));
            return Ok(false);
        };
        let detour = self.router().splice_detour(&route, target_idx, via)?;
        if detour == route {
            return Ok(false);
        }
        self.fleet
            .replace_route(id, detour, &self.graph, self.projection.as_ref())?;
        Ok(true)
    }

    /// Advances the simulation by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        self.time += dt;
        self.frame += 1;
        self.lights.tick(dt);

        let router = Router::new(&self.graph, self.config.congestion_penalty);
        self.fleet.spawn_due_smart(
            self.time,
            &self.graph,
            &router,
            self.projection.as_ref(),
            &self.config,
        );
        self.fleet.step(
            dt,
            &self.graph,
            &self.lights,
            &self.arbiter,
            &self.config,
            &mut self.rng,
        );
    }

    /// Starts a round: every vehicle goes back to the start of its route and drives again.
    pub fn begin_round(&mut self) {
        log::info!("Beginning round at {:.1}s", self.time);
        self.lights.reset(&self.config);
        self.fleet.teleport_all_to_start(&self.graph);
        self.fleet.set_paused(false);
    }

    /// Ends a round: every vehicle stops where it is.
    pub fn end_round(&mut self) {
        log::info!("Ending round at {:.1}s", self.time);
        self.fleet.set_paused(true);
    }

    /// Collects the one-shot flag raised when the player's vehicle arrives.
    pub fn take_player_arrival(&mut self) -> bool {
        self.fleet.take_player_arrival()
    }
}
