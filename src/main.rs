// hrm-emulator Source Code File
//
// Copyright 2026 The hrm-emulator Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use clap::Parser;
use hrm_emulator::api::{Adapter, Stack};
use hrm_emulator::config::EmulatorConfig;
use hrm_emulator::emulator::PeripheralEmulator;
use hrm_emulator::{loopback, platform, Error, Result};
use log::{error, info, warn};
use std::path::PathBuf;
use std::process::ExitCode;

/// Emulates a BLE health tracker that streams simulated heart rate over the GATT Heart Rate
/// profile.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// TOML file with emulator settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Name the adapter advertises under
    #[arg(short, long)]
    alias: Option<String>,

    /// Milliseconds between simulation ticks
    #[arg(short, long)]
    interval_ms: Option<u64>,

    /// Seed for the simulation's random walk
    #[arg(short, long)]
    seed: Option<u64>,

    /// Run without a radio, on the in-process loopback backend
    #[arg(long)]
    loopback: bool,

    /// Print the GATT database as JSON and exit
    #[arg(long)]
    describe: bool,
}

impl Cli {
    fn load_config(&self) -> Result<EmulatorConfig> {
        let mut config = match &self.config {
            Some(path) => EmulatorConfig::from_file(path)?,
            None => EmulatorConfig::default(),
        };
        if let Some(alias) = &self.alias {
            config.alias = alias.clone();
        }
        if let Some(interval_ms) = self.interval_ms {
            config.tick_interval_ms = interval_ms;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(target_os = "linux")]
async fn radio() -> Result<(platform::Adapter, platform::Stack)> {
    platform::Manager::new().await?.default_adapter().await
}

#[cfg(not(target_os = "linux"))]
async fn radio() -> Result<(platform::Adapter, platform::Stack)> {
    Err(Error::StackUnavailable(
        "no Bluetooth peripheral backend for this platform".into(),
    ))
}

async fn run<A: Adapter, S: Stack>(config: EmulatorConfig, adapter: A, stack: S) -> Result<()> {
    let mut emulator = PeripheralEmulator::new(config, adapter, stack)?;
    let shutdown = emulator.shutdown_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupted"),
            Err(err) => warn!("Could not listen for Ctrl+C: {}", err),
        }
        shutdown.shutdown();
    });
    emulator.run().await
}

fn describe(config: EmulatorConfig) -> Result<()> {
    let mut emulator = PeripheralEmulator::new(
        config,
        loopback::LoopbackAdapter::default(),
        loopback::LoopbackStack::default(),
    )?;
    emulator.build_topology();
    let json = serde_json::to_string_pretty(&emulator.describe())
        .map_err(|err| Error::Other(Box::new(err)))?;
    println!("{}", json);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = pretty_env_logger::formatted_timed_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_env("RUST_LOG")
        .try_init()
    {
        eprintln!("Logger was already initialized: {}", err);
    }

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let result = if cli.describe {
        describe(config)
    } else if cli.loopback || !platform::HAS_RADIO {
        if !cli.loopback {
            warn!("No Bluetooth backend on this platform, falling back to loopback");
        }
        run(
            config,
            loopback::LoopbackAdapter::default(),
            loopback::LoopbackStack::default(),
        )
        .await
    } else {
        match radio().await {
            Ok((adapter, stack)) => run(config, adapter, stack).await,
            Err(err) => Err(err),
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err @ Error::StackUnavailable(_)) => {
            error!("{}", err);
            error!("Make sure you're on Linux with BlueZ installed");
            error!("Make sure bluetoothd is running: sudo systemctl start bluetooth");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!("Emulator failed: {}", err);
            ExitCode::FAILURE
        }
    }
}
