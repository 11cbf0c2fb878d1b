//! Road networks shared by the integration tests.
#![allow(dead_code)]

use city_traffic::{Point2d, RoadGraph};
use serde_json::{json, Value};

/// A directed edge between two named nodes.
pub struct Edge {
    pub from: &'static str,
    pub to: &'static str,
    pub distance: f64,
    pub one_way: bool,
}

/// A two-way road, as a pair of edges.
pub fn road(a: &'static str, b: &'static str, distance: f64) -> [Edge; 2] {
    [
        Edge { from: a, to: b, distance, one_way: false },
        Edge { from: b, to: a, distance, one_way: false },
    ]
}

/// A one-way road.
pub fn one_way(from: &'static str, to: &'static str, distance: f64) -> Edge {
    Edge { from, to, distance, one_way: true }
}

/// Builds a graph from `(name, lat, lon, signal tag)` nodes and edges, through the same
/// map-data path as a map file.
pub fn build(nodes: &[(&str, f64, f64, u16)], edges: &[Edge]) -> RoadGraph {
    let nodes = nodes
        .iter()
        .map(|(name, lat, lon, signal)| {
            let neighbours = edges
                .iter()
                .filter(|e| e.from == *name)
                .map(|e| {
                    json!({
                        "neighbourId": e.to,
                        "distance": e.distance,
                        "isOneWay": if e.one_way { "True" } else { "False" },
                        "wayId": "w1",
                    })
                })
                .collect::<Vec<_>>();
            json!({
                "nodeId": name, "lat": lat, "lon": lon, "wayId": "w1",
                "isSignal": signal, "neighbours": neighbours,
            })
        })
        .collect::<Vec<_>>();
    let data: Value = json!({
        "ways": [{ "wayId": "w1", "name": "Test Road", "highwayType": "residential" }],
        "nodes": nodes,
    });
    RoadGraph::from_json_str(&data.to_string()).unwrap()
}

/// A projection where a thousandth of a degree is 100 m.
pub fn flat(lat: f64, lon: f64) -> Point2d {
    Point2d::new(lon * 1e5, lat * 1e5)
}

/// A diamond of two-way roads: A to D through either B or C.
pub fn diamond(c_to_d: f64) -> RoadGraph {
    let edges = [road("A", "B", 10.0), road("A", "C", 10.0), road("B", "D", 10.0), road("C", "D", c_to_d)];
    build(
        &[
            ("A", 0.0, 0.0, 0),
            ("B", 0.001, 0.001, 0),
            ("C", -0.001, 0.001, 0),
            ("D", 0.0, 0.002, 0),
        ],
        &edges.into_iter().flatten().collect::<Vec<_>>(),
    )
}

/// A four-way crossroads centred on X, with arms 100 m long.
pub fn crossroads(signal: u16) -> RoadGraph {
    let edges = [road("W", "X", 100.0), road("E", "X", 100.0), road("S", "X", 100.0), road("N", "X", 100.0)];
    build(
        &[
            ("X", 0.0, 0.0, signal),
            ("W", 0.0, -0.001, 0),
            ("E", 0.0, 0.001, 0),
            ("S", -0.001, 0.0, 0),
            ("N", 0.001, 0.0, 0),
        ],
        &edges.into_iter().flatten().collect::<Vec<_>>(),
    )
}
