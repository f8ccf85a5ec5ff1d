// hrm-emulator Source Code File
//
// Copyright 2026 The hrm-emulator Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use uuid::Uuid;

use super::characteristic::Characteristic;
use crate::api::{CharPropFlags, CharacteristicId, Describable, ServiceId, ServiceProperties};

/// A GATT service and the characteristics it owns, in declaration order.
#[derive(Debug, Clone)]
pub struct Service {
    id: ServiceId,
    uuid: Uuid,
    primary: bool,
    characteristics: Vec<Characteristic>,
}

impl Service {
    pub(crate) fn new(id: ServiceId, uuid: Uuid, primary: bool) -> Self {
        Service {
            id,
            uuid,
            primary,
            characteristics: vec![],
        }
    }

    pub fn id(&self) -> &ServiceId {
        &self.id
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    /// Appends a new characteristic and hands it back. There is no way to remove one.
    pub fn add_characteristic(&mut self, uuid: Uuid, flags: CharPropFlags) -> &mut Characteristic {
        let id = CharacteristicId::new(&self.id, self.characteristics.len());
        self.characteristics.push(Characteristic::new(id, uuid, flags));
        let last = self.characteristics.len() - 1;
        &mut self.characteristics[last]
    }

    pub fn characteristics(&self) -> &[Characteristic] {
        &self.characteristics
    }

    pub fn characteristic(&self, id: &CharacteristicId) -> Option<&Characteristic> {
        self.characteristics.iter().find(|c| c.id() == id)
    }

    pub fn characteristic_mut(&mut self, id: &CharacteristicId) -> Option<&mut Characteristic> {
        self.characteristics.iter_mut().find(|c| c.id() == id)
    }
}

impl Describable for Service {
    type Properties = ServiceProperties;

    fn describe(&self) -> ServiceProperties {
        ServiceProperties {
            id: self.id.clone(),
            uuid: self.uuid,
            primary: self.primary,
            characteristics: self
                .characteristics
                .iter()
                .map(|c| c.id().clone())
                .collect(),
        }
    }
}
