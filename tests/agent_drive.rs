//! Tests of single vehicles driving their routes through a simulation.

mod common;

use city_traffic::{AgentState, RouteCache, RouteRecord, SimConfig, Simulation};
use common::{diamond, flat};

const DT: f64 = 0.05;

fn cached(paths: &[&[&str]]) -> RouteCache {
    RouteCache {
        cars: paths
            .iter()
            .enumerate()
            .map(|(i, path)| RouteRecord {
                id: i as u32,
                start_node: path[0].to_string(),
                destination_node: path[path.len() - 1].to_string(),
                path: path.iter().map(|n| n.to_string()).collect(),
            })
            .collect(),
    }
}

#[test]
fn congestion_follows_the_vehicle() {
    let mut sim = Simulation::with_projection(diamond(10.0), SimConfig::default(), flat);
    assert_eq!(sim.spawn_cached(&cached(&[&["A", "B", "D"]])), 1);

    let [a, b, d] = ["A", "B", "D"].map(|n| sim.graph().node_id(n).unwrap());
    let id = sim.iter_vehicles().next().unwrap().id();
    assert_eq!(sim.graph().congestion(a, b), 1);
    assert_eq!(sim.graph().congestion(b, d), 0);

    let mut steps = 0;
    while sim.get_vehicle(id).unwrap().cursor() < 1 {
        sim.step(DT);
        steps += 1;
        assert!(steps < 2000, "vehicle never reached B");
    }
    assert_eq!(sim.get_vehicle(id).unwrap().cursor(), 1);
    assert_eq!(sim.graph().congestion(a, b), 0);
    assert_eq!(sim.graph().congestion(b, d), 1);
}

#[test]
fn background_vehicles_are_removed_on_arrival() {
    let mut sim = Simulation::with_projection(diamond(10.0), SimConfig::default(), flat);
    sim.spawn_cached(&cached(&[&["A", "B", "D"], &["D", "C", "A"]]));
    assert_eq!(sim.fleet().len(), 2);

    for _ in 0..2000 {
        sim.step(DT);
        if sim.fleet().is_empty() {
            break;
        }
    }
    assert!(sim.fleet().is_empty());
    assert_eq!(sim.graph().total_congestion(), 0);
    assert!(!sim.take_player_arrival());
}

#[test]
fn vehicles_keep_to_the_left_of_two_way_roads() {
    let mut sim = Simulation::with_projection(diamond(10.0), SimConfig::default(), flat);
    sim.spawn_cached(&cached(&[&["A", "B", "D"]]));
    for _ in 0..20 {
        sim.step(DT);
    }
    let veh = sim.iter_vehicles().next().unwrap();
    assert_eq!(veh.state(), AgentState::Driving);
    assert!(veh.speed() > 0.0);

    // A to B runs north-east, so left of the centreline is north-west of it
    let p = veh.position();
    assert!(p.y > p.x);
}
