//! The static road network and its live congestion counters.

use self::schema::MapData;
use crate::error::{Error, Result};
use crate::math::{Direction, WebMercator};
use crate::util::Interval;
use crate::NodeId;
use slotmap::SlotMap;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

pub mod schema;

/// A road network: intersections and geometry points joined by directed, weighted edges.
///
/// Everything is immutable after loading except the per-edge congestion counters,
/// which are atomic so a shared `&RoadGraph` can be updated from any thread.
#[derive(Debug)]
pub struct RoadGraph {
    /// The nodes, in the order they were loaded.
    nodes: SlotMap<NodeId, Node>,
    /// Node IDs in load order.
    order: Vec<NodeId>,
    /// Maps map-data node names to IDs.
    names: HashMap<String, NodeId>,
    /// Road metadata keyed by way ID.
    ways: HashMap<String, Way>,
    /// Signalised nodes.
    signals: HashSet<NodeId>,
    /// Signalised nodes bucketed by the direction of their bearing tag.
    signal_directions: [HashSet<NodeId>; 4],
    /// Number of vehicles committed to each directed edge.
    congestion: HashMap<(NodeId, NodeId), AtomicU32>,
    /// Latitude extent of all nodes.
    lat: Interval<f64>,
    /// Longitude extent of all nodes.
    lon: Interval<f64>,
}

/// A graph vertex: an intersection or a point along a road's geometry.
#[derive(Clone, Debug)]
pub struct Node {
    id: NodeId,
    name: String,
    lat: f64,
    lon: f64,
    way_id: String,
    signal: u16,
    neighbours: SmallVec<[Neighbour; 4]>,
}

/// A directed edge out of a node.
#[derive(Clone, Debug, PartialEq)]
pub struct Neighbour {
    /// The node the edge leads to.
    pub node: NodeId,
    /// The length of the edge.
    pub distance: f64,
    /// Whether the road only allows travel in this direction.
    pub one_way: bool,
    /// The way the edge belongs to.
    pub way_id: String,
}

/// A named road. Carried for presentation only; routing ignores it.
#[derive(Clone, Debug, PartialEq)]
pub struct Way {
    pub id: String,
    pub name: String,
    pub highway_type: Option<String>,
    pub max_speed: Option<f64>,
}

impl Node {
    /// The node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The node's ID in the map data.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// The way the node belongs to.
    pub fn way_id(&self) -> &str {
        &self.way_id
    }

    /// The bearing tag of a signal, or 0 if the node is not signalised.
    pub fn signal_tag(&self) -> u16 {
        self.signal
    }

    /// The outgoing edges, in load order.
    pub fn neighbours(&self) -> &[Neighbour] {
        &self.neighbours
    }
}

impl RoadGraph {
    /// Reads a graph from a JSON map file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Parses a graph from a JSON map document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let data: MapData =
            serde_json::from_str(json).map_err(|e| Error::MalformedMapData(e.to_string()))?;
        Self::from_map_data(data)
    }

    /// Builds a graph from map data, validating it as it goes.
    pub fn from_map_data(data: MapData) -> Result<Self> {
        let first = data
            .nodes
            .first()
            .ok_or_else(|| Error::MalformedMapData("map contains no nodes".into()))?;

        let mut graph = Self {
            nodes: SlotMap::with_capacity_and_key(data.nodes.len()),
            order: Vec::with_capacity(data.nodes.len()),
            names: HashMap::with_capacity(data.nodes.len()),
            ways: HashMap::with_capacity(data.ways.len()),
            signals: HashSet::new(),
            signal_directions: Default::default(),
            congestion: HashMap::new(),
            lat: Interval::point(first.lat),
            lon: Interval::point(first.lon),
        };

        for way in data.ways {
            graph.ways.insert(
                way.way_id.clone(),
                Way {
                    id: way.way_id,
                    name: way.name,
                    highway_type: way.highway_type,
                    max_speed: way.max_speed,
                },
            );
        }

        // Insert every node first so edges may refer forwards
        for node in &data.nodes {
            if !node.lat.is_finite() || !node.lon.is_finite() {
                return Err(Error::MalformedMapData(format!(
                    "node {} has an invalid coordinate",
                    node.node_id
                )));
            }
            if graph.names.contains_key(&node.node_id) {
                return Err(Error::MalformedMapData(format!(
                    "node {} is defined more than once",
                    node.node_id
                )));
            }
            let id = graph.nodes.insert_with_key(|id| Node {
                id,
                name: node.node_id.clone(),
                lat: node.lat,
                lon: node.lon,
                way_id: node.way_id.clone(),
                signal: node.is_signal,
                neighbours: SmallVec::new(),
            });
            graph.order.push(id);
            graph.names.insert(node.node_id.clone(), id);
            graph.lat.expand(node.lat);
            graph.lon.expand(node.lon);

            if node.is_signal != 0 {
                let direction = Direction::from_degrees(node.is_signal as f64);
                graph.signals.insert(id);
                graph.signal_directions[direction.index()].insert(id);
            }
        }

        // Resolve the edges
        for (node, id) in data.nodes.into_iter().zip(graph.order.clone()) {
            for edge in node.neighbours {
                let target = *graph.names.get(&edge.neighbour_id).ok_or_else(|| {
                    Error::MalformedMapData(format!(
                        "node {} references undefined neighbour {}",
                        node.node_id, edge.neighbour_id
                    ))
                })?;
                if !edge.distance.is_finite() || edge.distance < 0.0 {
                    return Err(Error::MalformedMapData(format!(
                        "edge {} -> {} has invalid distance {}",
                        node.node_id, edge.neighbour_id, edge.distance
                    )));
                }
                graph.congestion.entry((id, target)).or_default();
                graph.nodes[id].neighbours.push(Neighbour {
                    node: target,
                    distance: edge.distance,
                    one_way: edge.is_one_way,
                    way_id: edge.way_id,
                });
            }
        }

        log::info!(
            "Loaded road graph: {} nodes, {} edges, {} signals",
            graph.node_count(),
            graph.edge_count(),
            graph.signals.len()
        );
        Ok(graph)
    }

    /// Resolves a map-data node name to its ID.
    pub fn node_id(&self, name: &str) -> Result<NodeId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownNode(name.to_string()))
    }

    /// Whether the node belongs to this graph.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Gets a node by ID.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// A printable name for a node, used in logs and errors.
    pub(crate) fn display_name(&self, id: NodeId) -> String {
        self.nodes
            .get(id)
            .map(|n| n.name.clone())
            .unwrap_or_else(|| format!("{id:?}"))
    }

    /// Returns an iterator over the nodes in load order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().map(move |id| &self.nodes[*id])
    }

    /// The IDs of all nodes in load order.
    pub fn node_ids(&self) -> &[NodeId] {
        &self.order
    }

    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.neighbours.len()).sum()
    }

    /// Gets a way by ID.
    pub fn way(&self, way_id: &str) -> Option<&Way> {
        self.ways.get(way_id)
    }

    /// The outgoing edges of a node, in load order. Unknown nodes have none.
    pub fn neighbours_of(&self, id: NodeId) -> &[Neighbour] {
        self.nodes
            .get(id)
            .map(|n| n.neighbours.as_slice())
            .unwrap_or(&[])
    }

    /// The first edge from `from` into `to`, if there is one.
    pub fn edge(&self, from: NodeId, to: NodeId) -> Option<&Neighbour> {
        self.neighbours_of(from).iter().find(|n| n.node == to)
    }

    /// Whether the edge from `from` into `to` is one-way.
    /// A missing edge is simply not one-way.
    pub fn is_one_way(&self, from: NodeId, to: NodeId) -> bool {
        self.edge(from, to).map_or(false, |n| n.one_way)
    }

    /// Whether vehicles must negotiate the node as an intersection: it has more than two
    /// outgoing edges, or exactly two of which the first is one-way.
    pub fn is_intersection(&self, id: NodeId) -> bool {
        match self.neighbours_of(id) {
            [first, _] => first.one_way,
            edges => edges.len() > 2,
        }
    }

    /// Whether the node carries a traffic signal.
    pub fn is_signal(&self, id: NodeId) -> bool {
        self.signals.contains(&id)
    }

    /// All signalised nodes.
    pub fn signals(&self) -> &HashSet<NodeId> {
        &self.signals
    }

    /// The signalised nodes whose bearing tag falls in the given direction.
    pub fn signals_facing(&self, direction: Direction) -> &HashSet<NodeId> {
        &self.signal_directions[direction.index()]
    }

    /// Records a vehicle committing to the edge.
    pub fn add_congestion(&self, from: NodeId, to: NodeId) {
        match self.congestion.get(&(from, to)) {
            Some(count) => {
                count.fetch_add(1, Ordering::Relaxed);
            }
            None => log::debug!("Ignoring congestion on non-edge {from:?} -> {to:?}"),
        }
    }

    /// Records a vehicle leaving the edge. The count never drops below zero.
    pub fn remove_congestion(&self, from: NodeId, to: NodeId) {
        if let Some(count) = self.congestion.get(&(from, to)) {
            let _ = count.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
        }
    }

    /// The number of vehicles currently committed to the edge.
    pub fn congestion(&self, from: NodeId, to: NodeId) -> u32 {
        self.congestion
            .get(&(from, to))
            .map_or(0, |count| count.load(Ordering::Relaxed))
    }

    /// The total number of vehicles committed to any edge.
    pub fn total_congestion(&self) -> u32 {
        self.congestion
            .values()
            .map(|count| count.load(Ordering::Relaxed))
            .sum()
    }

    /// The latitude and longitude extent of the network.
    pub fn bounds(&self) -> (Interval<f64>, Interval<f64>) {
        (self.lat, self.lon)
    }

    /// A projection centred on the middle of the network.
    pub fn projection(&self) -> WebMercator {
        WebMercator::centred_on(self.lat.midpoint(), self.lon.midpoint())
    }

    /// Finds a node more than `min_distance` of travel away from `from` which is not in `avoid`.
    ///
    /// The closest qualifying direct neighbour wins; otherwise the search widens breadth-first,
    /// accumulating edge distances, and returns the first qualifying node it reaches.
    pub fn find_node_beyond(
        &self,
        from: NodeId,
        min_distance: f64,
        avoid: &HashSet<NodeId>,
    ) -> Option<NodeId> {
        let qualifies =
            |id: NodeId, dist: f64| id != from && dist > min_distance && !avoid.contains(&id);

        let mut dist_to = HashMap::new();
        let mut queue = VecDeque::new();
        dist_to.insert(from, 0.0);

        let direct = self
            .neighbours_of(from)
            .iter()
            .filter(|n| qualifies(n.node, n.distance))
            .min_by(|a, b| a.distance.total_cmp(&b.distance));
        if let Some(n) = direct {
            return Some(n.node);
        }
        for n in self.neighbours_of(from) {
            if !dist_to.contains_key(&n.node) {
                dist_to.insert(n.node, n.distance);
                queue.push_back(n.node);
            }
        }

        while let Some(id) = queue.pop_front() {
            let base = dist_to[&id];
            for n in self.neighbours_of(id) {
                let total = base + n.distance;
                if qualifies(n.node, total) {
                    return Some(n.node);
                }
                if !dist_to.contains_key(&n.node) {
                    dist_to.insert(n.node, total);
                    queue.push_back(n.node);
                }
            }
        }
        None
    }
}
