use crate::error::{Error, Result};
use crate::graph::{Neighbour, RoadGraph};
use crate::NodeId;
use ordered_float::OrderedFloat;

/// The total weight of a route, in m.
type PathCost = OrderedFloat<f64>;

/// Finds routes through a [RoadGraph].
///
/// Every query returns the route as an ordered list of nodes starting at `start`. When `start`
/// equals `end` or `end` cannot be reached, the route is just `[start]`, which callers treat as
/// "nothing to do".
#[derive(Clone, Copy)]
pub struct Router<'a> {
    /// The road network.
    graph: &'a RoadGraph,
    /// The extra cost of each vehicle occupying an edge, used by congestion-aware routing.
    congestion_penalty: f64,
}

impl<'a> Router<'a> {
    /// Creates a router over a road network.
    pub fn new(graph: &'a RoadGraph, congestion_penalty: f64) -> Self {
        Self {
            graph,
            congestion_penalty,
        }
    }

    /// Finds the shortest route by static edge distance.
    pub fn shortest_path(&self, start: NodeId, end: NodeId) -> Result<Vec<NodeId>> {
        self.find_path(start, end, None, |_, edge| OrderedFloat(edge.distance))
    }

    /// Finds the shortest route by static edge distance without entering `exclude`.
    pub fn shortest_path_excluding(
        &self,
        start: NodeId,
        end: NodeId,
        exclude: NodeId,
    ) -> Result<Vec<NodeId>> {
        self.find_path(start, end, Some(exclude), |_, edge| OrderedFloat(edge.distance))
    }

    /// Finds the shortest route where each edge also costs a penalty for every vehicle on it.
    pub fn congestion_weighted_path(&self, start: NodeId, end: NodeId) -> Result<Vec<NodeId>> {
        self.find_path(start, end, None, |from, edge| {
            let count = self.graph.congestion(from, edge.node);
            OrderedFloat(edge.distance + count as f64 * self.congestion_penalty)
        })
    }

    /// Reroutes a route so that it passes through `via` after reaching `route[target_idx]`.
    ///
    /// The route up to and including `target_idx` is kept. The second leg may not re-enter the
    /// node the first leg arrived at `via` from. If either leg cannot be found, or `target_idx`
    /// is outside the route, the route is returned unchanged.
    pub fn splice_detour(
        &self,
        route: &[NodeId],
        target_idx: usize,
        via: NodeId,
    ) -> Result<Vec<NodeId>> {
        let (Some(&target), Some(&end)) = (route.get(target_idx), route.last()) else {
            log::warn!("Detour target {target_idx} is outside a route of {} nodes", route.len());
            return Ok(route.to_vec());
        };

        let to_via = self.shortest_path(target, via)?;
        let [.., came_from, _] = to_via[..] else {
            log::warn!(
                "No detour from {} via {}",
                self.graph.display_name(target),
                self.graph.display_name(via)
            );
            return Ok(route.to_vec());
        };
        let to_end = self.shortest_path_excluding(via, end, came_from)?;
        if to_end.len() < 2 {
            log::warn!(
                "No route from detour node {} to {}",
                self.graph.display_name(via),
                self.graph.display_name(end)
            );
            return Ok(route.to_vec());
        }

        let mut spliced = route[..=target_idx].to_vec();
        spliced.extend_from_slice(&to_via[1..]);
        spliced.extend_from_slice(&to_end[1..]);
        Ok(spliced)
    }

    /// Runs Dijkstra's algorithm with the given edge cost function.
    fn find_path<F>(
        &self,
        start: NodeId,
        end: NodeId,
        exclude: Option<NodeId>,
        cost: F,
    ) -> Result<Vec<NodeId>>
    where
        F: Fn(NodeId, &Neighbour) -> PathCost,
    {
        for id in [start, end] {
            if !self.graph.contains(id) {
                return Err(Error::UnknownNode(format!("{id:?}")));
            }
        }

        let graph = self.graph;
        let result = pathfinding::directed::dijkstra::dijkstra(
            &start,
            |id| {
                let from = *id;
                graph
                    .neighbours_of(from)
                    .iter()
                    .filter(|edge| Some(edge.node) != exclude)
                    .map(|edge| (edge.node, cost(from, edge)))
                    .collect::<Vec<_>>()
            },
            |id| *id == end,
        );

        match result {
            Some((path, _)) => Ok(path),
            None => {
                log::debug!(
                    "No route from {} to {}",
                    graph.display_name(start),
                    graph.display_name(end)
                );
                Ok(vec![start])
            }
        }
    }
}
