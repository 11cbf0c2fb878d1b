//! Tests of spawning, rounds and detours.

mod common;

use city_traffic::{
    AgentState, OdPairs, PlayerTrip, RouteCache, SimConfig, Simulation, VehicleId,
};
use common::{build, crossroads, diamond, flat, road};
use std::collections::HashSet;

const DT: f64 = 0.05;

fn trip(from: &str, to: &str) -> PlayerTrip {
    PlayerTrip {
        origin_node: from.into(),
        destination_node: to.into(),
    }
}

fn run_until(sim: &mut Simulation, max_time: f64, mut done: impl FnMut(&mut Simulation) -> bool) {
    while sim.time() < max_time {
        sim.step(DT);
        if done(sim) {
            return;
        }
    }
    panic!("condition not met within {max_time}s");
}

#[test]
fn cached_routes_skip_taken_starts_and_unknown_nodes() {
    let mut sim = Simulation::with_projection(crossroads(0), SimConfig::default(), flat);
    sim.add_player(&trip("W", "E")).unwrap();

    let cache = RouteCache::from_json_str(
        r#"{ "cars": [
            { "id": 0, "startNode": "W", "destinationNode": "N", "path": ["W", "X", "N"] },
            { "id": 1, "startNode": "S", "destinationNode": "Q", "path": ["S", "X", "Q"] },
            { "id": 2, "startNode": "S", "destinationNode": "S", "path": ["S"] },
            { "id": 3, "startNode": "N", "destinationNode": "S", "path": ["N", "X", "S"] },
            { "id": 4, "startNode": "N", "destinationNode": "E", "path": ["N", "X", "E"] }
        ] }"#,
    )
    .unwrap();
    assert_eq!(sim.spawn_cached(&cache), 1);
    assert_eq!(sim.fleet().len(), 2);
}

#[test]
fn player_persists_after_arrival() {
    let mut sim = Simulation::with_projection(crossroads(0), SimConfig::default(), flat);
    let id = sim.add_player(&trip("W", "E")).unwrap();
    assert!(sim.fleet().is_player(id));
    let [w, x, e] = ["W", "X", "E"].map(|n| sim.graph().node_id(n).unwrap());
    assert_eq!(sim.get_vehicle(id).unwrap().route(), &[w, x, e]);

    run_until(&mut sim, 120.0, |sim| sim.take_player_arrival());
    assert!(!sim.take_player_arrival());
    let player = sim.get_vehicle(id).unwrap();
    assert!(player.has_arrived());
    assert_eq!(sim.graph().total_congestion(), 0);

    // A new round puts the player back at the start
    sim.begin_round();
    let player = sim.get_vehicle(id).unwrap();
    assert_eq!(player.state(), AgentState::Driving);
    assert_eq!(player.cursor(), 0);
    assert_eq!(sim.graph().congestion(w, x), 1);
    run_until(&mut sim, 240.0, |sim| sim.take_player_arrival());
}

#[test]
fn ended_rounds_freeze_vehicles() {
    let mut sim = Simulation::with_projection(crossroads(0), SimConfig::default(), flat);
    let id = sim.add_player(&trip("S", "N")).unwrap();
    for _ in 0..40 {
        sim.step(DT);
    }
    sim.end_round();
    let frozen = sim.get_vehicle(id).unwrap().position();
    for _ in 0..40 {
        sim.step(DT);
    }
    let player = sim.get_vehicle(id).unwrap();
    assert!(player.is_paused());
    assert_eq!(player.position(), frozen);
    assert_eq!(player.state(), AgentState::Driving);

    sim.begin_round();
    let player = sim.get_vehicle(id).unwrap();
    assert!(!player.is_paused());
    assert!(player.position().y < frozen.y);
}

#[test]
fn smart_spawns_are_staggered() {
    let mut sim = Simulation::with_projection(crossroads(0), SimConfig::default(), flat);
    let pairs = OdPairs::from_json_str(
        r#"{ "cars": [
            { "id": 0, "startNode": "S", "destinationID": "N" },
            { "id": 1, "startNode": "E", "destinationID": "W" }
        ] }"#,
    )
    .unwrap();
    sim.schedule_smart(pairs);
    assert_eq!(sim.fleet().pending_smart(), 2);

    while sim.time() < 14.9 {
        sim.step(DT);
    }
    assert!(sim.fleet().is_empty());
    assert_eq!(sim.fleet().pending_smart(), 2);

    while sim.time() < 15.1 {
        sim.step(DT);
    }
    assert_eq!(sim.fleet().pending_smart(), 1);
    assert_eq!(sim.fleet().len(), 1);

    while sim.time() < 25.1 {
        sim.step(DT);
    }
    assert_eq!(sim.fleet().pending_smart(), 0);
}

#[test]
fn random_spawns_use_distinct_starts() {
    let mut sim = Simulation::with_projection(diamond(10.0), SimConfig::default(), flat);
    let cache = sim.spawn_random(10).unwrap();
    assert!(cache.cars.len() <= 4);
    assert_eq!(sim.fleet().len(), cache.cars.len());

    let starts = cache.cars.iter().map(|c| c.start_node.as_str()).collect::<HashSet<_>>();
    assert_eq!(starts.len(), cache.cars.len());
    for car in &cache.cars {
        assert_eq!(car.path.first(), Some(&car.start_node));
        assert_eq!(car.path.last(), Some(&car.destination_node));
    }

    // The generated routes can be saved and spawned again
    let json = cache.to_json_string().unwrap();
    assert_eq!(RouteCache::from_json_str(&json).unwrap(), cache);
}

#[test]
fn detour_goes_round_the_block() {
    // W - X - E along the bottom, with a block to the north of X
    let edges = [
        road("W", "X", 100.0),
        road("X", "E", 100.0),
        road("X", "N", 100.0),
        road("N", "NE", 100.0),
        road("NE", "E", 100.0),
    ];
    let graph = build(
        &[
            ("W", 0.0, -0.001, 0),
            ("X", 0.0, 0.0, 0),
            ("E", 0.0, 0.001, 0),
            ("N", 0.001, 0.0, 0),
            ("NE", 0.001, 0.001, 0),
        ],
        &edges.into_iter().flatten().collect::<Vec<_>>(),
    );
    let mut sim = Simulation::with_projection(graph, SimConfig::default(), flat);
    let id: VehicleId = sim.add_player(&trip("W", "E")).unwrap();
    let [w, x, e, n, ne] = ["W", "X", "E", "N", "NE"].map(|n| sim.graph().node_id(n).unwrap());

    assert!(sim.detour(id, 50.0).unwrap());
    assert_eq!(sim.get_vehicle(id).unwrap().route(), &[w, x, n, ne, e]);
    assert_eq!(sim.graph().congestion(w, x), 1);
    assert_eq!(sim.graph().total_congestion(), 1);

    run_until(&mut sim, 240.0, |sim| sim.take_player_arrival());
    assert_eq!(sim.graph().total_congestion(), 0);
}

#[test]
fn detour_without_an_alternative_keeps_the_route() {
    let mut sim = Simulation::with_projection(crossroads(0), SimConfig::default(), flat);
    let id = sim.add_player(&trip("W", "E")).unwrap();
    let before = sim.get_vehicle(id).unwrap().route().to_vec();
    assert!(!sim.detour(id, 50.0).unwrap());
    assert_eq!(sim.get_vehicle(id).unwrap().route(), before.as_slice());
}
