use crate::config::SimConfig;
use crate::error::Result;
use crate::graph::RoadGraph;
use crate::intersection::IntersectionArbiter;
use crate::light::TrafficLightCycle;
use crate::math::Projection;
use crate::router::Router;
use crate::spatial::AgentView;
use crate::vehicle::{TickContext, VehicleAgent};
use crate::{NodeId, VehicleId};
use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use slotmap::{SecondaryMap, SlotMap};
use std::collections::{HashSet, VecDeque};

pub use cache::{OdPair, OdPairs, PlayerTrip, RouteCache, RouteRecord};

mod cache;

/// The vehicles on the road, and the spawning of new ones.
///
/// Background vehicles are removed when they reach the end of their route. Player vehicles
/// persist across rounds and raise a one-shot arrival flag instead.
#[derive(Clone, Debug, Default)]
pub struct Fleet {
    /// The vehicles.
    agents: SlotMap<VehicleId, VehicleAgent>,
    /// Vehicle IDs in creation order, which is also the order they are ticked in.
    order: Vec<VehicleId>,
    /// The player vehicles.
    players: HashSet<VehicleId>,
    /// Nodes which already have a vehicle starting on them.
    taken_starts: HashSet<NodeId>,
    /// Congestion-aware spawns still to come.
    pending_smart: VecDeque<OdPair>,
    /// When the next congestion-aware spawn is due, in s.
    next_smart_spawn: f64,
    /// The time between congestion-aware spawns, in s.
    smart_interval: f64,
    /// Whether a player vehicle has arrived since the flag was last taken.
    player_arrived: bool,
    /// What each vehicle on the road looks like to the others.
    views: Vec<AgentView>,
    /// Index of each vehicle's entry in `views`.
    slots: SecondaryMap<VehicleId, usize>,
}

impl Fleet {
    /// Creates an empty fleet.
    pub fn new() -> Self {
        Default::default()
    }

    /// The number of vehicles.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Gets a vehicle by ID.
    pub fn get(&self, id: VehicleId) -> Option<&VehicleAgent> {
        self.agents.get(id)
    }

    /// Returns an iterator over the vehicles in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &VehicleAgent> {
        self.order.iter().map(move |id| &self.agents[*id])
    }

    /// Whether the vehicle is a player vehicle.
    pub fn is_player(&self, id: VehicleId) -> bool {
        self.players.contains(&id)
    }

    /// The number of congestion-aware spawns still to come.
    pub fn pending_smart(&self) -> usize {
        self.pending_smart.len()
    }

    /// Marks a node as a start node so that no background vehicle spawns on it.
    /// Returns `false` if it was already taken.
    pub fn reserve_start(&mut self, node: NodeId) -> bool {
        self.taken_starts.insert(node)
    }

    /// Spawns a background vehicle on a route.
    ///
    /// Routes of fewer than two nodes, and routes starting where another vehicle started,
    /// are skipped.
    pub fn spawn_route(
        &mut self,
        route: Vec<NodeId>,
        graph: &RoadGraph,
        projection: &dyn Projection,
        config: &SimConfig,
    ) -> Result<Option<VehicleId>> {
        if route.len() < 2 {
            return Ok(None);
        }
        if self.taken_starts.contains(&route[0]) {
            log::debug!("Skipping spawn at taken start {}", graph.display_name(route[0]));
            return Ok(None);
        }
        let start = route[0];
        let id = self.insert(route, graph, projection, config)?;
        self.taken_starts.insert(start);
        Ok(Some(id))
    }

    /// Spawns a background vehicle for each usable record of a route cache, returning how
    /// many were spawned. Records naming unknown nodes are skipped.
    pub fn spawn_cached(
        &mut self,
        cache: &RouteCache,
        graph: &RoadGraph,
        projection: &dyn Projection,
        config: &SimConfig,
    ) -> usize {
        let mut spawned = 0;
        for record in &cache.cars {
            let route = match record
                .path
                .iter()
                .map(|name| graph.node_id(name))
                .collect::<Result<Vec<_>>>()
            {
                Ok(route) => route,
                Err(e) => {
                    log::warn!("Skipping cached route {}: {e}", record.id);
                    continue;
                }
            };
            match self.spawn_route(route, graph, projection, config) {
                Ok(Some(_)) => spawned += 1,
                Ok(None) => {}
                Err(e) => log::warn!("Skipping cached route {}: {e}", record.id),
            }
        }
        log::info!("Spawned {spawned} of {} cached routes", cache.cars.len());
        spawned
    }

    /// Spawns up to `count` background vehicles between random nodes, each starting on a
    /// node no other vehicle started on. Returns the generated routes.
    pub fn spawn_random(
        &mut self,
        count: usize,
        graph: &RoadGraph,
        router: &Router,
        projection: &dyn Projection,
        config: &SimConfig,
        rng: &mut StdRng,
    ) -> Result<RouteCache> {
        let mut cache = RouteCache::default();
        for i in 0..count {
            let start = graph
                .node_ids()
                .iter()
                .filter(|id| !self.taken_starts.contains(*id))
                .choose(rng);
            let Some(&start) = start else {
                log::warn!("Every node is taken; spawned {} of {count} vehicles", cache.cars.len());
                break;
            };
            self.taken_starts.insert(start);
            let Some(&end) = graph.node_ids().iter().choose(rng) else {
                break;
            };

            let route = router.shortest_path(start, end)?;
            if route.len() < 2 {
                continue;
            }
            cache.cars.push(RouteRecord {
                id: i as u32,
                start_node: graph.display_name(start),
                destination_node: graph.display_name(end),
                path: route.iter().map(|id| graph.display_name(*id)).collect(),
            });
            self.insert(route, graph, projection, config)?;
        }
        log::info!("Spawned {} random vehicles", cache.cars.len());
        Ok(cache)
    }

    /// Queues congestion-aware spawns: the first after the configured delay, then one per
    /// interval.
    pub fn schedule_smart(&mut self, pairs: OdPairs, now: f64, config: &SimConfig) {
        log::info!("Scheduled {} congestion-aware spawns", pairs.cars.len());
        self.pending_smart = pairs.cars.into();
        self.next_smart_spawn = now + config.smart_spawn_delay;
        self.smart_interval = config.smart_spawn_interval;
    }

    /// Spawns the congestion-aware vehicles which are due by `now`.
    pub fn spawn_due_smart(
        &mut self,
        now: f64,
        graph: &RoadGraph,
        router: &Router,
        projection: &dyn Projection,
        config: &SimConfig,
    ) {
        while now >= self.next_smart_spawn {
            let Some(pair) = self.pending_smart.pop_front() else {
                return;
            };
            self.next_smart_spawn += self.smart_interval;

            let ends = graph
                .node_id(&pair.start_node)
                .and_then(|start| Ok((start, graph.node_id(&pair.destination_id)?)));
            let route = ends.and_then(|(start, end)| router.congestion_weighted_path(start, end));
            let spawned = route.and_then(|route| self.spawn_route(route, graph, projection, config));
            match spawned {
                Ok(Some(id)) => log::debug!("Spawned congestion-aware vehicle {id:?} for pair {}", pair.id),
                Ok(None) => log::debug!("Skipped congestion-aware pair {}", pair.id),
                Err(e) => log::warn!("Skipped congestion-aware pair {}: {e}", pair.id),
            }
        }
    }

    /// Adds a player vehicle on a route. Its start node is reserved against background spawns.
    pub fn add_player(
        &mut self,
        route: Vec<NodeId>,
        graph: &RoadGraph,
        projection: &dyn Projection,
        config: &SimConfig,
    ) -> Result<VehicleId> {
        if let Some(start) = route.first() {
            self.taken_starts.insert(*start);
        }
        let id = self.insert(route, graph, projection, config)?;
        self.players.insert(id);
        log::info!("Added player vehicle {id:?}");
        Ok(id)
    }

    /// Replaces the route of a vehicle, keeping its place along it.
    pub fn replace_route(
        &mut self,
        id: VehicleId,
        route: Vec<NodeId>,
        graph: &RoadGraph,
        projection: &dyn Projection,
    ) -> Result<()> {
        match self.agents.get_mut(id) {
            Some(agent) => agent.replace_route(route, graph, projection),
            None => Ok(()),
        }
    }

    /// Removes a vehicle, releasing the congestion it holds.
    pub fn remove(&mut self, id: VehicleId, graph: &RoadGraph) -> Option<VehicleAgent> {
        let mut agent = self.agents.remove(id)?;
        agent.release_congestion(graph);
        self.order.retain(|other| *other != id);
        self.players.remove(&id);
        self.slots.remove(id);
        Some(agent)
    }

    /// Pauses or resumes every vehicle.
    pub fn set_paused(&mut self, paused: bool) {
        for agent in self.agents.values_mut() {
            agent.set_paused(paused);
        }
    }

    /// Moves every vehicle back to the start of its route.
    pub fn teleport_all_to_start(&mut self, graph: &RoadGraph) {
        for id in &self.order {
            self.agents[*id].teleport_to_route_start(graph);
        }
    }

    /// Collects the one-shot flag raised when a player vehicle arrives.
    pub fn take_player_arrival(&mut self) -> bool {
        std::mem::take(&mut self.player_arrived)
    }

    /// Advances every vehicle by `dt` seconds in creation order, then removes background
    /// vehicles which have arrived.
    ///
    /// Each vehicle sees the others as they are after any earlier tick in the same step.
    pub fn step(
        &mut self,
        dt: f64,
        graph: &RoadGraph,
        lights: &TrafficLightCycle,
        arbiter: &IntersectionArbiter,
        config: &SimConfig,
        rng: &mut StdRng,
    ) {
        self.snapshot();

        for id in &self.order {
            let agent = &mut self.agents[*id];
            let mut ctx = TickContext {
                graph,
                lights,
                nearby: &self.views,
                arbiter,
                config,
                rng: &mut *rng,
            };
            agent.tick(dt, &mut ctx);

            if let (Some(slot), Some(view)) = (self.slots.get(*id), agent.view()) {
                self.views[*slot] = view;
            }
        }

        let mut arrived = vec![];
        for id in &self.order {
            let agent = &mut self.agents[*id];
            if self.players.contains(id) {
                if agent.take_reached_destination() {
                    log::info!("Player vehicle {id:?} reached its destination");
                    self.player_arrived = true;
                }
            } else if agent.has_arrived() {
                arrived.push(*id);
            }
        }
        for id in arrived {
            log::debug!("Removing arrived vehicle {id:?}");
            self.remove(id, graph);
        }
    }

    /// Rebuilds the views of the vehicles on the road.
    fn snapshot(&mut self) {
        self.views.clear();
        self.slots.clear();
        for id in &self.order {
            if let Some(view) = self.agents[*id].view() {
                self.slots.insert(*id, self.views.len());
                self.views.push(view);
            }
        }
    }

    /// Creates a vehicle and puts it on a route.
    fn insert(
        &mut self,
        route: Vec<NodeId>,
        graph: &RoadGraph,
        projection: &dyn Projection,
        config: &SimConfig,
    ) -> Result<VehicleId> {
        let id = self
            .agents
            .insert_with_key(|id| VehicleAgent::new(id, config));
        if let Err(e) = self.agents[id].assign_route(route, graph, projection) {
            self.agents.remove(id);
            return Err(e);
        }
        self.order.push(id);
        Ok(id)
    }
}
