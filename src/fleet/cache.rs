//! Route files read and written by the fleet.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pre-computed routes for background traffic: `{ "cars": [...] }`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteCache {
    pub cars: Vec<RouteRecord>,
}

/// One background vehicle's route.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRecord {
    pub id: u32,
    #[serde(default)]
    pub start_node: String,
    #[serde(default)]
    pub destination_node: String,
    /// Node IDs to visit, starting with the start node.
    #[serde(default)]
    pub path: Vec<String>,
}

/// Origin-destination pairs for vehicles routed around congestion when they spawn.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OdPairs {
    pub cars: Vec<OdPair>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OdPair {
    pub id: u32,
    pub start_node: String,
    #[serde(rename = "destinationID")]
    pub destination_id: String,
}

/// Where the player's vehicle starts and finishes a round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerTrip {
    pub origin_node: String,
    pub destination_node: String,
}

fn parse<T: DeserializeOwned>(json: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| Error::MalformedRouteFile(e.to_string()))
}

fn read<T: DeserializeOwned>(path: &Path) -> Result<T> {
    parse(&std::fs::read_to_string(path)?)
}

impl RouteCache {
    pub fn from_json_str(json: &str) -> Result<Self> {
        parse(json)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        read(path.as_ref())
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::MalformedRouteFile(e.to_string()))
    }

    /// Writes the cache so later runs can spawn the same traffic.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

impl OdPairs {
    pub fn from_json_str(json: &str) -> Result<Self> {
        parse(json)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        read(path.as_ref())
    }
}

impl PlayerTrip {
    pub fn from_json_str(json: &str) -> Result<Self> {
        parse(json)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        read(path.as_ref())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reads_route_records() {
        let cache = RouteCache::from_json_str(
            r#"{ "cars": [
                { "id": 0, "startNode": "a", "destinationNode": "c", "path": ["a", "b", "c"] },
                { "id": 1, "startNode": null, "destinationNode": null, "path": null }
            ] }"#,
        );
        // Nulls are not accepted in place of strings
        assert!(matches!(cache, Err(Error::MalformedRouteFile(_))));

        let cache = RouteCache::from_json_str(
            r#"{ "cars": [{ "id": 0, "startNode": "a", "destinationNode": "c", "path": ["a", "b", "c"] }] }"#,
        )
        .unwrap();
        assert_eq!(cache.cars[0].path, vec!["a", "b", "c"]);
        let again = RouteCache::from_json_str(&cache.to_json_string().unwrap()).unwrap();
        assert_eq!(again, cache);
    }

    #[test]
    fn reads_od_pairs_and_trips() {
        let pairs = OdPairs::from_json_str(
            r#"{ "cars": [{ "id": 3, "startNode": "a", "destinationID": "d" }] }"#,
        )
        .unwrap();
        assert_eq!(pairs.cars[0].destination_id, "d");

        let trip =
            PlayerTrip::from_json_str(r#"{ "originNode": "a", "destinationNode": "d" }"#).unwrap();
        assert_eq!(trip.origin_node, "a");
        assert!(PlayerTrip::from_json_str(r#"{ "originNode": "a" }"#).is_err());
    }
}
