//! The on-disk shape of the road-network map data produced by the map tool.

use serde::{Deserialize, Deserializer, Serialize};

/// A complete map document: `{ "ways": [...], "nodes": [...] }`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MapData {
    #[serde(default)]
    pub ways: Vec<WayData>,
    pub nodes: Vec<NodeData>,
}

/// A named road.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WayData {
    pub way_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub highway_type: Option<String>,
    #[serde(default)]
    pub max_speed: Option<f64>,
}

/// A graph vertex with its outgoing edges.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    pub node_id: String,
    pub lat: f64,
    pub lon: f64,
    pub way_id: String,
    /// Bearing tag of a signalised node in degrees; 0 means no signal.
    #[serde(default)]
    pub is_signal: u16,
    #[serde(default)]
    pub neighbours: Vec<NeighbourData>,
}

/// A directed edge to another node.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighbourData {
    pub neighbour_id: String,
    pub distance: f64,
    /// Written by the map tool as the string `"True"`/`"False"`; plain booleans are accepted too.
    #[serde(deserialize_with = "lenient_bool")]
    pub is_one_way: bool,
    pub way_id: String,
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(serde::de::Error::custom(format!(
                "expected a boolean, found {s:?}"
            ))),
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn one_way_flag_accepts_strings_and_bools() {
        let edges: Vec<NeighbourData> = serde_json::from_value(json!([
            { "neighbourId": "a", "distance": 1.0, "isOneWay": "True", "wayId": "w" },
            { "neighbourId": "b", "distance": 1.0, "isOneWay": "false", "wayId": "w" },
            { "neighbourId": "c", "distance": 1.0, "isOneWay": true, "wayId": "w" },
        ]))
        .unwrap();
        let flags = edges.iter().map(|e| e.is_one_way).collect::<Vec<_>>();
        assert_eq!(flags, vec![true, false, true]);
    }

    #[test]
    fn one_way_flag_rejects_garbage() {
        let result: Result<NeighbourData, _> = serde_json::from_value(
            json!({ "neighbourId": "a", "distance": 1.0, "isOneWay": "maybe", "wayId": "w" }),
        );
        assert!(result.is_err());
    }

    #[test]
    fn way_speed_is_optional() {
        let way: WayData =
            serde_json::from_value(json!({ "wayId": "w1", "name": "Hay Street" })).unwrap();
        assert_eq!(way.max_speed, None);
    }
}
