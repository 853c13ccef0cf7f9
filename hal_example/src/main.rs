//! # HAL Example Binary
//!
//! Registers the `hal-example` component, creates its pins and runs the
//! window until it is closed.
//!
//! # Usage
//!
//! ```bash
//! # Shared memory bus, drive the input from another terminal
//! hal_example
//! halcmd setp hal-example.increment 1
//!
//! # In-process bus with a simulated input
//! hal_example -s -v
//!
//! # Configuration file, CLI flags override it
//! hal_example --config hal-example.toml --tick-ms 50
//! ```

#![deny(warnings)]

use clap::Parser;
use hal_common::bus::PinBus;
use hal_common::config::{ConfigLoader, ExampleConfig};
use hal_example::actions::forward_actions;
use hal_example::logging::setup_tracing;
use hal_example::{
    BusRegistry, ConsoleDisplay, ExampleCore, ExampleError, MemoryBus, MemoryProbe, SquareWave,
};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::time::Duration;
use tracing::{error, info};

/// Ticks per half period of the simulated `increment` square wave
const SIMULATION_HALF_PERIOD: u32 = 5;

/// HAL example component - counts rising edges and mirrors a toggle button
#[derive(Parser, Debug)]
#[command(name = "hal_example")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "HAL example component: rising-edge counter with a toggle button")]
#[command(long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Pin bus backend (shm or memory)
    #[arg(short, long)]
    backend: Option<String>,

    /// Use the in-process bus and drive `increment` with a square wave
    #[arg(short = 's', long)]
    simulate: bool,

    /// Component name
    #[arg(short, long)]
    name: Option<String>,

    /// Pin prefix (defaults to the component name)
    #[arg(short, long)]
    prefix: Option<String>,

    /// Synchronizer period in milliseconds
    #[arg(short, long, value_name = "MS")]
    tick_ms: Option<u64>,

    /// Do not read user actions from stdin (stop with Ctrl-C)
    #[arg(long)]
    no_input: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    dump_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("hal_example failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Tracing needs the configured level, so load first and report afterwards
    let config = load_config(&args);
    let level = config
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(args.verbose, args.json, level);
    let config = config?;

    if args.dump_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    info!(
        "{} v{} starting...",
        config.shared.service_name,
        env!("CARGO_PKG_VERSION")
    );

    let example = &config.example;
    let display = ConsoleDisplay::stdout();
    let tick = Duration::from_millis(example.tick_ms);

    let (bus, probe): (Box<dyn PinBus>, Option<MemoryProbe>) = if args.simulate {
        info!("Simulation mode enabled (in-process bus, simulated input)");
        let bus = MemoryBus::register(&example.component_name)?;
        let probe = bus.probe();
        (Box::new(bus) as Box<dyn PinBus>, Some(probe))
    } else {
        let registry = BusRegistry::with_defaults();
        (registry.create(&example.backend, &example.component_name)?, None)
    };
    let mut core = ExampleCore::new(bus, display, tick);

    // Setup signal handler.
    let running = core.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    core.init(example.prefix())?;

    // The square wave drives `increment`, which exists only after init
    if let Some(probe) = probe {
        let wave = SquareWave::new(probe, SIMULATION_HALF_PERIOD)?;
        core = core.with_stimulus(Box::new(wave));
    }

    let (tx, rx) = mpsc::channel();
    let _input_guard = if args.no_input {
        // Keep the channel open; only Ctrl-C stops the loop
        Some(tx)
    } else {
        std::thread::Builder::new()
            .name("stdin-actions".to_string())
            .spawn(move || forward_actions(std::io::stdin().lock(), &tx))?;
        None
    };

    // An event loop error is reported once, by main()
    let result = core.run(&rx);
    core.shutdown();
    drop(core);

    info!("hal_example shutdown complete");
    Ok(result?)
}

/// Build the effective configuration: file (if any), then CLI overrides.
fn load_config(args: &Args) -> Result<ExampleConfig, ExampleError> {
    let mut config = match &args.config {
        Some(path) => ExampleConfig::load(path)?,
        None => ExampleConfig::default(),
    };

    let example = &mut config.example;
    if let Some(name) = &args.name {
        example.component_name = name.clone();
    }
    if let Some(prefix) = &args.prefix {
        example.prefix = Some(prefix.clone());
    }
    if let Some(tick_ms) = args.tick_ms {
        example.tick_ms = tick_ms;
    }
    if let Some(backend) = &args.backend {
        example.backend = backend.clone();
    }
    if args.simulate {
        example.backend = "memory".to_string();
    }

    config.validate()?;
    Ok(config)
}
