//! CLI tool to replay an intro loading session on a virtual clock.
//!
//! Usage:
//!   intro-sim
//!   intro-sim --offline --continue-offline-at 3200
//!   intro-sim --offline-at 900 --online-at 2500 -o timeline.txt
//!
//! Prints one line per observable event. Set `RUST_LOG=debug` to see state
//! transitions as they happen.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use portfolio_rs::{Config, Connectivity, LoaderError, ScriptedEvent, Simulation};

#[derive(Parser, Debug)]
#[command(name = "intro-sim", about = "Replay an intro loading session")]
struct Args {
    /// Start with the network offline
    #[arg(long)]
    offline: bool,

    /// When the page finishes loading (ms)
    #[arg(long, default_value_t = 0)]
    ready_at: u64,

    /// Never signal that resources are ready
    #[arg(long, conflicts_with = "ready_at")]
    no_ready: bool,

    /// Drop the network at these times (ms)
    #[arg(long = "offline-at")]
    offline_at: Vec<u64>,

    /// Restore the network at these times (ms)
    #[arg(long = "online-at")]
    online_at: Vec<u64>,

    /// Press "Continue Offline" at this time (ms)
    #[arg(long)]
    continue_offline_at: Option<u64>,

    /// Press "Retry Connection" at this time (ms)
    #[arg(long)]
    retry_at: Option<u64>,

    /// Stop the simulation at this time (ms)
    #[arg(long, default_value_t = 30_000)]
    until: u64,

    /// Progress tick interval (ms)
    #[arg(long)]
    tick_ms: Option<u32>,

    /// Minimum loader duration (ms)
    #[arg(long)]
    floor_ms: Option<u32>,

    /// Write the timeline here instead of stdout
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,
}

impl Args {
    fn config(&self) -> Config {
        let mut config = Config::default();
        if let Some(tick_ms) = self.tick_ms {
            config.loader.tick_ms = tick_ms;
        }
        if let Some(floor_ms) = self.floor_ms {
            config.shell.floor_ms = floor_ms;
        }
        config
    }
}

fn run(args: &Args) -> Result<Simulation, LoaderError> {
    let connectivity = Connectivity::from_online(!args.offline);
    let mut sim = Simulation::new(args.config(), connectivity)?;

    if !args.no_ready {
        sim.schedule(args.ready_at, ScriptedEvent::ResourcesReady);
    }
    for &at in &args.offline_at {
        sim.schedule(at, ScriptedEvent::Network(Connectivity::Offline));
    }
    for &at in &args.online_at {
        sim.schedule(at, ScriptedEvent::Network(Connectivity::Online));
    }
    if let Some(at) = args.continue_offline_at {
        sim.schedule(at, ScriptedEvent::ContinueOffline);
    }
    if let Some(at) = args.retry_at {
        sim.schedule(at, ScriptedEvent::Retry);
    }

    sim.start();
    sim.run_until(args.until);
    Ok(sim)
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let sim = match run(&args) {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    if let Some(path) = &args.output {
        if let Err(e) = sim.timeline().write_to(path) {
            eprintln!("error writing '{}': {}", path.display(), e);
            process::exit(1);
        }
    } else {
        print!("{}", sim.timeline());
    }

    match sim.revealed_at() {
        Some(at) => eprintln!("Content revealed at {}ms", at),
        None if sim.is_reloaded() => eprintln!("Page reload requested"),
        None => eprintln!("Loader still showing at {}ms", sim.now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_ready_conflicts_with_ready_at() {
        let err = Args::try_parse_from(["intro-sim", "--no-ready", "--ready-at", "500"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);

        let args = Args::try_parse_from(["intro-sim", "--no-ready"]).unwrap();
        assert!(args.no_ready);
        let args = Args::try_parse_from(["intro-sim", "--ready-at", "500"]).unwrap();
        assert_eq!(args.ready_at, 500);
    }
}
