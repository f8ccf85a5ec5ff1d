// hrm-emulator Source Code File
//
// Copyright 2026 The hrm-emulator Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! The local GATT database: an [`Application`] holds [`Service`]s, which own their
//! [`Characteristic`]s. Everything is addressed by object-path style identifiers derived from the
//! application's base path, so `/org/bluez/example/service1/char1` is the first characteristic of
//! the first service.

pub mod characteristic;
pub mod profile;
pub mod service;

pub use characteristic::{Characteristic, NotifyState};
pub use service::Service;

use uuid::Uuid;

use crate::api::{ApplicationProperties, CharacteristicId, Describable, ServiceId};
use crate::{Error, Result};

pub const DEFAULT_BASE_PATH: &str = "/org/bluez/example";

/// The set of services published by the emulator.
#[derive(Debug, Clone)]
pub struct Application {
    base_path: String,
    services: Vec<Service>,
}

impl Default for Application {
    fn default() -> Self {
        Application::new(DEFAULT_BASE_PATH)
    }
}

impl Application {
    pub fn new(base_path: &str) -> Self {
        Application {
            base_path: base_path.trim_end_matches('/').to_string(),
            services: vec![],
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Appends an empty service and hands it back so characteristics can be added to it.
    pub fn add_service(&mut self, uuid: Uuid, primary: bool) -> &mut Service {
        let id = ServiceId::new(&self.base_path, self.services.len());
        self.services.push(Service::new(id, uuid, primary));
        let last = self.services.len() - 1;
        &mut self.services[last]
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn service(&self, id: &ServiceId) -> Option<&Service> {
        self.services.iter().find(|s| s.id() == id)
    }

    pub fn service_mut(&mut self, id: &ServiceId) -> Option<&mut Service> {
        self.services.iter_mut().find(|s| s.id() == id)
    }

    pub fn characteristic(&self, id: &CharacteristicId) -> Result<&Characteristic> {
        self.service(id.service())
            .and_then(|service| service.characteristic(id))
            .ok_or_else(|| Error::CharacteristicNotFound(id.to_string()))
    }

    pub fn characteristic_mut(&mut self, id: &CharacteristicId) -> Result<&mut Characteristic> {
        self.service_mut(id.service())
            .and_then(|service| service.characteristic_mut(id))
            .ok_or_else(|| Error::CharacteristicNotFound(id.to_string()))
    }
}

impl Describable for Application {
    type Properties = ApplicationProperties;

    fn describe(&self) -> ApplicationProperties {
        ApplicationProperties {
            base_path: self.base_path.clone(),
            services: self.services.iter().map(Service::describe).collect(),
            characteristics: self
                .services
                .iter()
                .flat_map(|service| service.characteristics())
                .map(Characteristic::describe)
                .collect(),
        }
    }
}
