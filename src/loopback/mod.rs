// hrm-emulator Source Code File
//
// Copyright 2026 The hrm-emulator Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! An in-process backend with no radio behind it. [`LoopbackAdapter`] and [`LoopbackStack`]
//! remember every call made on them, which makes them suitable for dry runs on machines without
//! BlueZ and for observing the emulator in tests. The stack hands out the published
//! [`RequestSender`], so a caller can play the part of a connected central.

use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use log::{debug, info, trace};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::api::{
    bleuuid::BleUuid, Adapter, CharacteristicProperties, RequestSender, ServiceProperties, Stack,
    ValueNotification,
};
use crate::{Error, Result};

#[derive(Debug, Default)]
struct AdapterState {
    powered: bool,
    alias: Option<String>,
    discoverable: bool,
}

/// An adapter that only records its configuration.
#[derive(Clone, Debug, Default)]
pub struct LoopbackAdapter {
    state: Arc<Mutex<AdapterState>>,
    failing: bool,
}

impl LoopbackAdapter {
    /// An adapter whose every configuration call fails, as a radio that is blocked or missing
    /// would.
    pub fn failing() -> Self {
        LoopbackAdapter {
            failing: true,
            ..Default::default()
        }
    }

    pub fn is_powered(&self) -> bool {
        self.state.lock().unwrap().powered
    }

    pub fn alias(&self) -> Option<String> {
        self.state.lock().unwrap().alias.clone()
    }

    pub fn is_discoverable(&self) -> bool {
        self.state.lock().unwrap().discoverable
    }

    fn update(&self, property: &str, apply: impl FnOnce(&mut AdapterState)) -> Result<()> {
        if self.failing {
            return Err(Error::AdapterConfiguration(format!(
                "loopback adapter refused to set {}",
                property
            )));
        }
        apply(&mut self.state.lock().unwrap());
        trace!("Loopback adapter {} updated", property);
        Ok(())
    }
}

#[async_trait]
impl Adapter for LoopbackAdapter {
    async fn set_powered(&self, powered: bool) -> Result<()> {
        self.update("Powered", |state| state.powered = powered)
    }

    async fn set_alias(&self, alias: &str) -> Result<()> {
        self.update("Alias", |state| state.alias = Some(alias.to_string()))
    }

    async fn set_discoverable(&self, discoverable: bool) -> Result<()> {
        self.update("Discoverable", |state| state.discoverable = discoverable)
    }
}

#[derive(Debug)]
struct StackState {
    services: Vec<ServiceProperties>,
    characteristics: Vec<CharacteristicProperties>,
    notifications: Vec<ValueNotification>,
    advertised_as: Option<String>,
    central: Option<RequestSender>,
}

/// A stack that keeps the registered database and every notification in memory.
#[derive(Clone, Debug)]
pub struct LoopbackStack {
    state: Arc<Mutex<StackState>>,
    events_channel: broadcast::Sender<ValueNotification>,
}

impl Default for LoopbackStack {
    fn default() -> Self {
        let (events_channel, _) = broadcast::channel(16);
        LoopbackStack {
            state: Arc::new(Mutex::new(StackState {
                services: vec![],
                characteristics: vec![],
                notifications: vec![],
                advertised_as: None,
                central: None,
            })),
            events_channel,
        }
    }
}

impl LoopbackStack {
    pub fn services(&self) -> Vec<ServiceProperties> {
        self.state.lock().unwrap().services.clone()
    }

    pub fn characteristics(&self) -> Vec<CharacteristicProperties> {
        self.state.lock().unwrap().characteristics.clone()
    }

    /// Every notification delivered so far, oldest first.
    pub fn notifications_sent(&self) -> Vec<ValueNotification> {
        self.state.lock().unwrap().notifications.clone()
    }

    /// The name the database is advertised under, while published.
    pub fn advertised_as(&self) -> Option<String> {
        self.state.lock().unwrap().advertised_as.clone()
    }

    /// The request channel of the published emulator. Requests sent through it are handled as if
    /// they came from a connected central.
    pub fn central(&self) -> Option<RequestSender> {
        self.state.lock().unwrap().central.clone()
    }

    /// A stream of notifications delivered from now on.
    pub fn notifications(&self) -> Pin<Box<dyn Stream<Item = ValueNotification> + Send>> {
        let receiver = self.events_channel.subscribe();
        Box::pin(BroadcastStream::new(receiver).filter_map(|x| async move { x.ok() }))
    }
}

#[async_trait]
impl Stack for LoopbackStack {
    async fn register_service(&self, service: ServiceProperties) -> Result<()> {
        debug!(
            "Loopback registered service {} ({})",
            service.id,
            service.uuid.to_short_string()
        );
        self.state.lock().unwrap().services.push(service);
        Ok(())
    }

    async fn register_characteristic(
        &self,
        characteristic: CharacteristicProperties,
    ) -> Result<()> {
        debug!(
            "Loopback registered characteristic {} ({})",
            characteristic.id,
            characteristic.uuid.to_short_string()
        );
        self.state
            .lock()
            .unwrap()
            .characteristics
            .push(characteristic);
        Ok(())
    }

    async fn publish(&self, alias: &str, requests: RequestSender) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.advertised_as = Some(alias.to_string());
        state.central = Some(requests);
        info!(
            "Loopback stack serving {} service(s) as {:?}",
            state.services.len(),
            alias
        );
        Ok(())
    }

    async fn notify(&self, notification: ValueNotification) -> Result<()> {
        trace!(
            "Loopback notification on {}: {:?}",
            notification.characteristic,
            notification.value
        );
        self.state
            .lock()
            .unwrap()
            .notifications
            .push(notification.clone());
        if let Err(lost) = self.events_channel.send(notification) {
            trace!("Lost notification, while nothing subscribed: {:?}", lost);
        }
        Ok(())
    }

    async fn unpublish(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.advertised_as = None;
        state.central = None;
        Ok(())
    }
}
