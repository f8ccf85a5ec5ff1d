// hrm-emulator Source Code File
//
// Copyright 2026 The hrm-emulator Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! The peripheral emulator: owns the GATT database and the simulated vital signs, and drives the
//! periodic tick that couples them.
//!
//! Everything runs on one cooperative event loop. Ticks and inbound central requests are
//! multiplexed with `tokio::select!`, so they never overlap and the database needs no locking.

pub mod simulation;

use log::{debug, error, info, trace, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::api::{
    bleuuid::BleUuid, Accessible, Adapter, ApplicationProperties, CharPropFlags,
    CharacteristicId, Describable, RequestSender, ServiceId, Stack, StackRequest,
};
use crate::config::EmulatorConfig;
use crate::gatt::profile::{self, HeartRateMeasurement};
use crate::gatt::Application;
use crate::{Error, Result};
use simulation::{Deltas, SimulationState};

const REQUEST_BUFFER: usize = 32;

/// Stops a running [`PeripheralEmulator`] from anywhere, typically a signal handler.
#[derive(Clone, Debug)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    fn new() -> Self {
        let (tx, _) = watch::channel(false);
        ShutdownHandle { tx: Arc::new(tx) }
    }

    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// A BLE health tracker, generic over the Bluetooth backend it runs on.
pub struct PeripheralEmulator<A, S> {
    config: EmulatorConfig,
    adapter: A,
    stack: S,
    application: Application,
    heart_rate: Option<CharacteristicId>,
    state: SimulationState,
    rng: StdRng,
    requests: mpsc::Sender<StackRequest>,
    inbound: Option<mpsc::Receiver<StackRequest>>,
    shutdown: ShutdownHandle,
}

impl<A: Adapter, S: Stack> PeripheralEmulator<A, S> {
    pub fn new(config: EmulatorConfig, adapter: A, stack: S) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let (requests, inbound) = mpsc::channel(REQUEST_BUFFER);
        Ok(PeripheralEmulator {
            application: Application::new(&config.base_path),
            state: config.simulation.initial_state(),
            config,
            adapter,
            stack,
            heart_rate: None,
            rng,
            requests,
            inbound: Some(inbound),
            shutdown: ShutdownHandle::new(),
        })
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }

    pub fn application(&self) -> &Application {
        &self.application
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SimulationState {
        &mut self.state
    }

    /// The Heart Rate Measurement characteristic, once the topology has been built.
    pub fn heart_rate_characteristic(&self) -> Option<&CharacteristicId> {
        self.heart_rate.as_ref()
    }

    /// A sender for feeding central requests into the event loop. Requests are only answered
    /// while [`run`](Self::run) is executing.
    pub fn request_sender(&self) -> RequestSender {
        RequestSender::new(self.requests.clone())
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Asks the event loop to stop. Equivalent to calling
    /// [`ShutdownHandle::shutdown`] on a handle from [`shutdown_handle`](Self::shutdown_handle).
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    /// Builds the fixed profile: one primary Heart Rate service holding one Heart Rate Measurement
    /// characteristic (read, notify). A Device Information service follows when configured.
    /// Calling this again returns the existing Heart Rate service.
    pub fn build_topology(&mut self) -> ServiceId {
        if let Some(heart_rate) = &self.heart_rate {
            return heart_rate.service().clone();
        }

        let service = self
            .application
            .add_service(profile::HEART_RATE_SERVICE, true);
        let service_id = service.id().clone();
        let measurement = service
            .add_characteristic(
                profile::HEART_RATE_MEASUREMENT,
                CharPropFlags::READ | CharPropFlags::NOTIFY,
            )
            .id()
            .clone();
        info!(
            "Heart Rate Service created: {}",
            profile::HEART_RATE_SERVICE.to_short_string()
        );
        info!(
            "Heart Rate Characteristic created: {}",
            profile::HEART_RATE_MEASUREMENT.to_short_string()
        );
        self.heart_rate = Some(measurement);

        if let Some(info) = &self.config.device_information {
            self.application
                .add_service(profile::DEVICE_INFORMATION_SERVICE, true)
                .add_characteristic(profile::MANUFACTURER_NAME_STRING, CharPropFlags::READ)
                .set_value(info.manufacturer.as_bytes().to_vec());
            info!(
                "Device Information Service created: {}",
                profile::DEVICE_INFORMATION_SERVICE.to_short_string()
            );
        }

        service_id
    }

    pub fn describe(&self) -> ApplicationProperties {
        self.application.describe()
    }

    /// Advances the simulation by one random step and publishes the new heart rate.
    pub async fn tick(&mut self) {
        let deltas = self.config.simulation.sample(&mut self.rng);
        self.tick_with(deltas).await;
    }

    /// Advances the simulation by the given offsets and publishes the new heart rate.
    pub async fn tick_with(&mut self, deltas: Deltas) {
        self.config.simulation.apply(&mut self.state, deltas);

        if let Some(id) = &self.heart_rate {
            let value = HeartRateMeasurement::from_heart_rate(self.state.heart_rate).to_bytes();
            let notification = match self.application.characteristic_mut(id) {
                Ok(characteristic) => characteristic.update_value(value),
                Err(err) => {
                    error!("Heart rate characteristic is missing: {}", err);
                    None
                }
            };
            if let Some(notification) = notification {
                if let Err(err) = self.stack.notify(notification).await {
                    warn!("Failed to notify {}: {}", id, err);
                }
            }
        } else {
            trace!("No topology yet, simulated values are not published");
        }

        info!(
            "HR: {} bpm | SpO2: {:.1}% | Stress: {}",
            self.state.heart_rate, self.state.spo2, self.state.stress
        );
    }

    pub fn on_read(&self, id: &CharacteristicId) -> Result<Vec<u8>> {
        self.application.characteristic(id)?.read()
    }

    pub fn on_write(&mut self, id: &CharacteristicId, value: &[u8]) -> Result<()> {
        self.application.characteristic_mut(id)?.write(value)
    }

    pub fn on_start_notify(&mut self, id: &CharacteristicId) -> Result<()> {
        self.application.characteristic_mut(id)?.start_notify()
    }

    pub fn on_stop_notify(&mut self, id: &CharacteristicId) -> Result<()> {
        self.application.characteristic_mut(id)?.stop_notify();
        Ok(())
    }

    fn handle_request(&mut self, request: StackRequest) {
        trace!("Handling request for {}", request.characteristic());
        match request {
            StackRequest::Read {
                characteristic,
                responder,
            } => respond(responder, self.on_read(&characteristic)),
            StackRequest::Write {
                characteristic,
                value,
                responder,
            } => respond(responder, self.on_write(&characteristic, &value)),
            StackRequest::StartNotify {
                characteristic,
                responder,
            } => respond(responder, self.on_start_notify(&characteristic)),
            StackRequest::StopNotify {
                characteristic,
                responder,
            } => respond(responder, self.on_stop_notify(&characteristic)),
        }
    }

    async fn configure_adapter(&self) {
        let result = async {
            self.adapter.set_powered(true).await?;
            info!("Bluetooth adapter powered on");
            self.adapter.set_alias(&self.config.alias).await?;
            self.adapter.set_discoverable(true).await?;
            info!("Adapter configured as {:?}", self.config.alias);
            Ok::<(), Error>(())
        }
        .await;
        if let Err(err) = result {
            warn!("Could not configure adapter: {}", err);
            warn!("Make sure BlueZ is running: sudo systemctl start bluetooth");
        }
    }

    async fn register(&self) -> Result<()> {
        for service in self.application.services() {
            self.stack.register_service(service.describe()).await?;
            for characteristic in service.characteristics() {
                self.stack
                    .register_characteristic(characteristic.describe())
                    .await?;
            }
            debug!(
                "Registered service {} ({})",
                service.id(),
                service.uuid().to_short_string()
            );
        }
        Ok(())
    }

    fn print_banner(&self) {
        let simulation = &self.config.simulation;
        info!("BLE Health Tracker Emulator");
        info!(
            "Search for {:?} from the companion app and connect to it",
            self.config.alias
        );
        info!(
            "Broadcasting heart rate {}-{} bpm, SpO2 {}-{}%, stress {}-{}",
            simulation.heart_rate.min,
            simulation.heart_rate.max,
            simulation.spo2.min,
            simulation.spo2.max,
            simulation.stress.min,
            simulation.stress.max
        );
        info!("Press Ctrl+C to stop the emulator");
    }

    /// Configures the adapter, publishes the GATT database and runs the event loop until
    /// [`shutdown`](ShutdownHandle::shutdown) is requested.
    ///
    /// Adapter configuration failures are logged and ignored; a stack that can't register or
    /// publish the database ends the run with an error. An emulator runs at most once.
    pub async fn run(&mut self) -> Result<()> {
        let mut inbound = self
            .inbound
            .take()
            .ok_or_else(|| Error::Other("emulator has already been run".into()))?;
        let mut shutdown = self.shutdown.subscribe();

        self.print_banner();
        self.configure_adapter().await;
        self.build_topology();
        self.register().await?;
        self.stack
            .publish(&self.config.alias, self.request_sender())
            .await?;
        info!("Emulator running and advertising");

        let period = self.config.tick_interval();
        let mut ticks = time::interval_at(Instant::now() + period, period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut running = !self.shutdown.is_shutdown();
        while running {
            tokio::select! {
                biased;
                changed = shutdown.changed() => running = changed.is_ok() && !*shutdown.borrow(),
                _ = ticks.tick() => self.tick().await,
                Some(request) = inbound.recv() => self.handle_request(request),
            }
        }

        info!("Shutting down...");
        if let Err(err) = self.stack.unpublish().await {
            warn!("Failed to withdraw GATT application: {}", err);
        }
        Ok(())
    }
}

fn respond<T>(responder: oneshot::Sender<Result<T>>, result: Result<T>) {
    if let Err(err) = &result {
        warn!("Rejected request: {}", err);
    }
    if responder.send(result).is_err() {
        debug!("Requester went away before the response was sent");
    }
}
