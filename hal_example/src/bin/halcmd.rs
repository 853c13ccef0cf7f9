//! # halcmd
//!
//! Inspect and drive components on the shared memory pin bus.
//!
//! ```bash
//! halcmd show                              # every live component
//! halcmd show hal-example --json
//! halcmd getp hal-example.count
//! halcmd setp hal-example.increment TRUE
//! halcmd cleanup                           # remove segments of dead owners
//! ```

#![deny(warnings)]

use clap::{Parser, Subcommand};
use hal_common::bus::BusError;
use hal_common::config::LogLevel;
use hal_common::pin::{PinInfo, PinValue};
use hal_example::logging::setup_tracing;
use hal_shared_memory::{SegmentDiscovery, ShmPeer};
use serde::Serialize;
use tracing::{debug, error};

/// Inspect and drive HAL components in shared memory
#[derive(Parser, Debug)]
#[command(name = "halcmd")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Inspect and drive HAL components in shared memory")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List components and their pins
    Show {
        /// Only this component
        component: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print the value of a pin
    Getp {
        /// Full pin name, e.g. hal-example.count
        pin: String,
    },
    /// Write an input pin
    Setp {
        /// Full pin name, e.g. hal-example.increment
        pin: String,
        /// Value: TRUE/FALSE/1/0 for bit pins, an integer for s32 pins
        value: String,
    },
    /// Remove segments left behind by dead processes
    Cleanup,
}

/// One component in `show --json` output
#[derive(Serialize)]
struct ComponentView {
    component: String,
    prefix: String,
    owner_pid: u32,
    ready: bool,
    pins: Vec<PinInfo>,
}

impl From<&ShmPeer> for ComponentView {
    fn from(peer: &ShmPeer) -> Self {
        Self {
            component: peer.component().to_string(),
            prefix: peer.prefix().to_string(),
            owner_pid: peer.owner_pid(),
            ready: peer.is_ready(),
            pins: peer.pins(),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    setup_tracing(args.verbose, false, LogLevel::Warn);

    if let Err(e) = run(args.command) {
        error!("halcmd: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Show { component, json } => {
            let peers = match component {
                Some(name) => vec![ShmPeer::attach(&name)?],
                None => ShmPeer::attach_all()?,
            };
            if json {
                let views: Vec<ComponentView> = peers.iter().map(ComponentView::from).collect();
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else {
                show(&peers);
            }
        }
        Command::Getp { pin } => {
            let peer = owner_of(&pin)?;
            println!("{}", peer.get(&pin)?);
        }
        Command::Setp { pin, value } => {
            let peer = owner_of(&pin)?;
            let value = PinValue::parse(peer.pin_type(&pin)?, &value)?;
            peer.set(&pin, value)?;
            debug!("{} <- {}", pin, value);
        }
        Command::Cleanup => {
            let removed = SegmentDiscovery::new().cleanup_orphaned_segments()?;
            println!("Removed {removed} orphaned segment(s)");
        }
    }
    Ok(())
}

/// Live component owning the pin with this full name
fn owner_of(pin: &str) -> Result<ShmPeer, BusError> {
    ShmPeer::attach_all()
        .map_err(|e| BusError::Shm(e.to_string()))?
        .into_iter()
        .find(|peer| peer.has_pin(pin))
        .ok_or_else(|| BusError::PinNotFound(pin.to_string()))
}

fn show(peers: &[ShmPeer]) {
    if peers.is_empty() {
        println!("No components");
        return;
    }
    for peer in peers {
        println!(
            "Component {} (pid {}, {})",
            peer.component(),
            peer.owner_pid(),
            if peer.is_ready() { "ready" } else { "not ready" }
        );
        for pin in peer.pins() {
            println!(
                "  {:<4} {:<3} {:>12}  {}",
                pin.pin_type, pin.direction, pin.value, pin.name
            );
        }
    }
}
