// hrm-emulator Source Code File
//
// Copyright 2026 The hrm-emulator Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! hrm-emulator turns a host Bluetooth adapter into a BLE health tracker. It publishes a GATT
//! Heart Rate service, walks a set of simulated vital signs on a fixed period and notifies
//! subscribed centrals with standard Heart Rate Measurement values.
//!
//! The library is split into:
//!
//! - [`api`]: the collaborator traits ([`api::Adapter`], [`api::Stack`]) and the plain data types
//!   shared between the emulator and its Bluetooth backends.
//! - [`gatt`]: the in-memory GATT database (services and characteristics) and the Heart Rate
//!   profile constants.
//! - [`emulator`]: the simulation model and the event loop that couples it to the GATT database.
//! - [`platform`]: the backend used by default on the current target.
//!
//! ```no_run
//! use hrm_emulator::{config::EmulatorConfig, emulator::PeripheralEmulator, loopback};
//!
//! # async fn example() -> hrm_emulator::Result<()> {
//! let mut emulator = PeripheralEmulator::new(
//!     EmulatorConfig::default(),
//!     loopback::LoopbackAdapter::default(),
//!     loopback::LoopbackStack::default(),
//! )?;
//! emulator.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
#[cfg(target_os = "linux")]
pub mod bluez;
pub mod config;
pub mod emulator;
pub mod gatt;
pub mod loopback;
pub mod platform;

use crate::api::Access;
use uuid::Uuid;

/// The main error type returned by most methods in hrm-emulator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Adapter configuration failed: {0}")]
    AdapterConfiguration(String),

    #[error("Bluetooth stack unavailable: {0}")]
    StackUnavailable(String),

    #[error("{access} is not permitted on characteristic {uuid}")]
    InvalidAccess { uuid: Uuid, access: Access },

    #[error("Characteristic not found: {0}")]
    CharacteristicNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Emulator event loop is not running")]
    EmulatorStopped,

    #[error("Could not read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{}", _0)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Convenience type for a result using the hrm-emulator [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;
