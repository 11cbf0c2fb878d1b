use city_traffic::{RoadGraph, RouteCache, SimConfig, Simulation};
use env_logger::{Builder, Env};
use std::path::PathBuf;
use std::time::Instant;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "city-traffic", about = "Benchmarks the traffic core on a road map")]
struct Flags {
    /// Road-network map JSON
    #[structopt(parse(from_os_str))]
    map: PathBuf,

    /// Simulation parameters; defaults are used for anything missing
    #[structopt(long = "config", parse(from_os_str))]
    config: Option<PathBuf>,

    /// Cached routes to spawn instead of random traffic
    #[structopt(long = "routes", parse(from_os_str))]
    routes: Option<PathBuf>,
}

fn main() -> city_traffic::Result<()> {
    Builder::from_env(Env::default().default_filter_or("info")).init();

    let flags = Flags::from_args();
    let config = match &flags.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };

    let graph = RoadGraph::load(&flags.map)?;
    let mut sim = Simulation::new(graph, config);
    match &flags.routes {
        Some(path) => {
            sim.spawn_cached(&RouteCache::load(path)?);
        }
        None => {
            let count = sim.config().random_agents;
            sim.spawn_random(count)?;
        }
    }

    println!("Simulating...");
    let num_frames = 1000;
    let dt = 0.05;
    loop {
        let start = Instant::now();
        for _ in 0..num_frames {
            sim.step(dt);
        }
        let frame = start.elapsed() / num_frames;
        println!(
            "Avg. frame: {:?} --> {:.0}x speedup ({} vehs, {} on edges)",
            frame,
            dt / frame.as_secs_f64(),
            sim.fleet().len(),
            sim.graph().total_congestion(),
        );
        if sim.fleet().is_empty() {
            break;
        }
    }
    Ok(())
}
