use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use foundation::{CanvasParams, DroneId, SwarmId, DEFAULT_INSET};
use swarm_client::{EvictionPolicy, ServerConfig};
use tracing_subscriber::EnvFilter;

mod console;

use console::Console;

#[derive(Parser, Debug)]
#[command(author, version, about = "Operator console for a drone swarm control server")]
struct Args {
    /// Control server base URL (default: $CRAZYSERV_URL or http://localhost:5000)
    #[arg(long)]
    url: Option<String>,

    /// Swarm to address
    #[arg(long, default_value = "swarm1")]
    swarm: String,

    /// Drone id within the swarm (required by per-drone commands)
    #[arg(long)]
    drone: Option<String>,

    /// Canvas size used to report and accept canvas coordinates
    #[arg(long, default_value_t = 800.0)]
    canvas_width: f64,

    #[arg(long, default_value_t = 600.0)]
    canvas_height: f64,

    /// Fraction of the canvas left empty on each side, in [0, 0.5)
    #[arg(long, default_value_t = DEFAULT_INSET)]
    inset: f64,

    /// Forget drones not reported for this many seconds (default: never)
    #[arg(long)]
    evict_after_s: Option<f64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch and print the arena bounds
    Arena,

    /// Refresh and print the status of every drone in the swarm
    Status,

    /// Refresh and print one drone's status
    DroneStatus,

    /// Open the radio link to a drone
    Connect {
        #[arg(long, default_value_t = 0)]
        radio: u32,
        #[arg(long, default_value_t = 80)]
        channel: u32,
        #[arg(long, default_value = "E7E7E7E7E7")]
        address: String,
        #[arg(long, default_value = "2M")]
        data_rate: String,
    },

    Disconnect,

    Calibrate,

    Takeoff {
        #[arg(long, default_value_t = 1.0)]
        z: f64,
        #[arg(long, default_value_t = 0.2)]
        velocity: f64,
    },

    Land {
        #[arg(long, default_value_t = 0.0)]
        z: f64,
        #[arg(long, default_value_t = 0.2)]
        velocity: f64,
    },

    /// Send a drone to an arena position (meters)
    Goto {
        #[arg(long)]
        x: f64,
        #[arg(long)]
        y: f64,
        #[arg(long, default_value_t = 1.0)]
        z: f64,
        #[arg(long, default_value_t = 0.2)]
        velocity: f64,
        #[arg(long, default_value_t = 0.0)]
        yaw: f64,
        /// Interpret x/y/z relative to the current position
        #[arg(long)]
        relative: bool,
    },

    /// Send a drone to the arena point under a canvas position
    Tap {
        #[arg(long)]
        cx: f64,
        #[arg(long)]
        cy: f64,
    },

    Stop,

    /// Poll swarm status periodically; overlapping polls are skipped
    Watch {
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
        /// Stop after this many polls (default: until Ctrl-C)
        #[arg(long)]
        count: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config = ServerConfig::from_env()?;
    if let Some(url) = &args.url {
        config.set_base_url(url)?;
    }

    let canvas = CanvasParams::new(args.canvas_width, args.canvas_height).with_inset(args.inset);
    canvas.validate()?;

    let eviction = match args.evict_after_s {
        Some(s) if s.is_finite() && s >= 0.0 => EvictionPolicy::Ttl(Duration::from_secs_f64(s)),
        Some(s) => return Err(format!("invalid --evict-after-s {s}").into()),
        None => EvictionPolicy::Never,
    };

    let console = Console::new(
        Arc::new(config),
        SwarmId::new(args.swarm),
        args.drone.map(DroneId::new),
        canvas,
        eviction,
    );
    console.run(args.command).await
}
