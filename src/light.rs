use crate::config::SimConfig;
use crate::graph::RoadGraph;
use crate::math::{bearing, Direction};
use crate::NodeId;
use std::collections::HashMap;

/// A four-phase signal controller shared by every signalised node.
///
/// Each phase gives a green light to approaches heading in one direction. A phase stays green
/// for `green_duration`, after which every approach sees a yellow light for `yellow_duration`
/// before the next phase (in north, east, south, west order) turns green.
#[derive(Clone, Debug)]
pub struct TrafficLightCycle {
    /// The index of the direction which currently has the green light.
    phase: usize,
    /// The time since the current phase turned green in s.
    elapsed: f64,
    /// How long each phase is green in s.
    green_duration: f64,
    /// How long the all-yellow interval lasts in s.
    yellow_duration: f64,
    /// The direction of travel of each edge into a signalised node.
    approaches: HashMap<(NodeId, NodeId), Direction>,
    /// The signalised nodes, bucketed by the direction of their bearing tag.
    facing: [Vec<NodeId>; 4],
}

/// The state of the lights facing one direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightState {
    Red,
    Amber,
    Green,
}

impl TrafficLightCycle {
    /// Creates a light cycle for the signals of a road network.
    pub fn new(graph: &RoadGraph, config: &SimConfig) -> Self {
        let mut approaches = HashMap::new();
        for node in graph.nodes() {
            for edge in node.neighbours() {
                if graph.is_signal(edge.node) {
                    if let Some(dir) = approach_direction(graph, node.id(), edge.node) {
                        approaches.insert((node.id(), edge.node), dir);
                    }
                }
            }
        }

        let mut facing: [Vec<NodeId>; 4] = Default::default();
        for dir in Direction::ALL {
            facing[dir.index()] = graph.signals_facing(dir).iter().copied().collect();
            facing[dir.index()].sort();
        }

        log::info!(
            "Created light cycle for {} signals with {} approaches",
            graph.signals().len(),
            approaches.len()
        );

        Self {
            phase: config.initial_phase % 4,
            elapsed: 0.0,
            green_duration: config.green_duration,
            yellow_duration: config.yellow_duration,
            approaches,
            facing,
        }
    }

    /// Advances the cycle by `dt` seconds.
    pub fn tick(&mut self, dt: f64) {
        let period = self.green_duration + self.yellow_duration;
        self.elapsed += dt;
        if period <= 0.0 {
            return;
        }
        while self.elapsed >= period {
            self.elapsed -= period;
            self.phase = (self.phase + 1) % 4;
            log::debug!("Signal phase {:?} is green", self.current_phase());
        }
    }

    /// Restarts the cycle at its initial phase.
    pub fn reset(&mut self, config: &SimConfig) {
        self.phase = config.initial_phase % 4;
        self.elapsed = 0.0;
    }

    /// The direction which has, or has just had, the green light.
    pub fn current_phase(&self) -> Direction {
        Direction::from_index(self.phase)
    }

    /// Whether the cycle is in its all-yellow interval.
    pub fn is_yellow(&self) -> bool {
        self.elapsed >= self.green_duration
    }

    /// Whether a vehicle travelling from `from` into `to` has a green light.
    pub fn is_green(&self, graph: &RoadGraph, from: NodeId, to: NodeId) -> bool {
        if self.is_yellow() {
            return false;
        }
        let dir = match self.approaches.get(&(from, to)) {
            Some(dir) => Some(*dir),
            None => approach_direction(graph, from, to),
        };
        dir == Some(self.current_phase())
    }

    /// Whether a vehicle travelling from `from` into `to` must stop for a light.
    pub fn should_stop(&self, graph: &RoadGraph, from: NodeId, to: NodeId) -> bool {
        graph.is_signal(to) && !self.is_green(graph, from, to)
    }

    /// The state of the lights facing the given direction.
    pub fn light_state(&self, direction: Direction) -> LightState {
        match (direction == self.current_phase(), self.is_yellow()) {
            (false, _) => LightState::Red,
            (true, true) => LightState::Amber,
            (true, false) => LightState::Green,
        }
    }

    /// The signalised nodes whose lights face the given direction.
    pub fn signal_nodes_facing(&self, direction: Direction) -> &[NodeId] {
        &self.facing[direction.index()]
    }
}

/// The direction of travel from one node to another.
fn approach_direction(graph: &RoadGraph, from: NodeId, to: NodeId) -> Option<Direction> {
    let (from, to) = (graph.node(from)?, graph.node(to)?);
    let degrees = bearing(from.lat(), from.lon(), to.lat(), to.lon());
    Some(Direction::from_degrees(degrees))
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    /// A signal at the origin with approaches from the west (heading east, bucket 0)
    /// and from the south (heading north, bucket 1).
    fn crossroads() -> RoadGraph {
        let edge = |to: &str| {
            json!({ "neighbourId": to, "distance": 100.0, "isOneWay": "False", "wayId": "w" })
        };
        let data = json!({ "nodes": [
            { "nodeId": "s", "lat": 0.0, "lon": 0.0, "wayId": "w", "isSignal": 90,
              "neighbours": [edge("w"), edge("south")] },
            { "nodeId": "w", "lat": 0.0, "lon": -0.001, "wayId": "w", "neighbours": [edge("s")] },
            { "nodeId": "south", "lat": -0.001, "lon": 0.0, "wayId": "w", "neighbours": [edge("s")] },
        ]});
        RoadGraph::from_map_data(serde_json::from_value(data).unwrap()).unwrap()
    }

    #[test]
    fn phases_rotate_after_green_and_yellow() {
        let g = crossroads();
        let [s, w, south] = ["s", "w", "south"].map(|n| g.node_id(n).unwrap());
        let mut lights = TrafficLightCycle::new(&g, &SimConfig::default());

        assert!(lights.is_green(&g, w, s));
        assert!(!lights.is_green(&g, south, s));
        assert!(lights.should_stop(&g, south, s));

        // Yellow: nothing is green
        lights.tick(10.5);
        assert!(lights.is_yellow());
        assert!(!lights.is_green(&g, w, s));
        assert!(!lights.is_green(&g, south, s));
        assert_eq!(lights.light_state(Direction::North), LightState::Amber);

        lights.tick(0.5);
        assert_eq!(lights.current_phase(), Direction::East);
        assert!(lights.is_green(&g, south, s));
        assert!(!lights.is_green(&g, w, s));
        assert_eq!(lights.light_state(Direction::North), LightState::Red);
        assert_eq!(lights.light_state(Direction::East), LightState::Green);
    }

    #[test]
    fn unsignalised_nodes_never_stop() {
        let g = crossroads();
        let [s, w] = ["s", "w"].map(|n| g.node_id(n).unwrap());
        let mut lights = TrafficLightCycle::new(&g, &SimConfig::default());
        lights.tick(10.5);
        assert!(!lights.should_stop(&g, s, w));
    }

    #[test]
    fn large_steps_wrap_around() {
        let g = crossroads();
        let mut lights = TrafficLightCycle::new(&g, &SimConfig::default());
        lights.tick(4.0 * 11.0 + 1.0);
        assert_eq!(lights.current_phase(), Direction::North);
        assert!(!lights.is_yellow());
    }

    #[test]
    fn signals_are_listed_by_tag_direction() {
        let g = crossroads();
        let s = g.node_id("s").unwrap();
        let lights = TrafficLightCycle::new(&g, &SimConfig::default());
        assert_eq!(lights.signal_nodes_facing(Direction::East), &[s]);
        assert!(lights.signal_nodes_facing(Direction::West).is_empty());
    }
}
