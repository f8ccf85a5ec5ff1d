// hrm-emulator Source Code File
//
// Copyright 2026 The hrm-emulator Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use log::{debug, info};
use uuid::Uuid;

use crate::api::{
    bleuuid::BleUuid, Access, Accessible, CharPropFlags, CharacteristicId,
    CharacteristicProperties, Describable, ValueNotification,
};
use crate::{Error, Result};

/// Whether a central has asked to be told about value changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyState {
    #[default]
    Idle,
    Notifying,
}

/// A single characteristic of the local GATT database.
///
/// The UUID and flags are fixed at creation. The value starts out as a single zero byte and is
/// changed either by a central through [`Accessible::write`] or by the emulator's tick loop.
#[derive(Debug, Clone)]
pub struct Characteristic {
    id: CharacteristicId,
    uuid: Uuid,
    flags: CharPropFlags,
    value: Vec<u8>,
    state: NotifyState,
}

impl Characteristic {
    pub(crate) fn new(id: CharacteristicId, uuid: Uuid, flags: CharPropFlags) -> Self {
        Characteristic {
            id,
            uuid,
            flags,
            value: vec![0],
            state: NotifyState::Idle,
        }
    }

    pub fn id(&self) -> &CharacteristicId {
        &self.id
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn flags(&self) -> CharPropFlags {
        self.flags
    }

    pub fn state(&self) -> NotifyState {
        self.state
    }

    pub fn is_notifying(&self) -> bool {
        self.state == NotifyState::Notifying
    }

    /// Sets the initial value while the database is being built.
    pub(crate) fn set_value(&mut self, value: Vec<u8>) {
        self.value = value;
    }

    /// Replaces the value on behalf of the emulator. The new value is stored first; when a central
    /// is subscribed the returned notification carries it out, otherwise the update is silent.
    pub(crate) fn update_value(&mut self, value: Vec<u8>) -> Option<ValueNotification> {
        self.value = value;
        match self.state {
            NotifyState::Notifying => Some(ValueNotification {
                characteristic: self.id.clone(),
                uuid: self.uuid,
                value: self.value.clone(),
            }),
            NotifyState::Idle => None,
        }
    }

    fn check(&self, access: Access) -> Result<()> {
        if self.flags.permits(access) {
            Ok(())
        } else {
            debug!(
                "Rejected {} on {} ({:?})",
                access,
                self.uuid.to_short_string(),
                self.flags
            );
            Err(Error::InvalidAccess {
                uuid: self.uuid,
                access,
            })
        }
    }
}

impl Accessible for Characteristic {
    fn read(&self) -> Result<Vec<u8>> {
        self.check(Access::Read)?;
        Ok(self.value.clone())
    }

    fn write(&mut self, value: &[u8]) -> Result<()> {
        self.check(Access::Write)?;
        self.value = value.to_vec();
        info!(
            "Characteristic {} written: {:?}",
            self.uuid.to_short_string(),
            self.value
        );
        Ok(())
    }

    fn start_notify(&mut self) -> Result<()> {
        self.check(Access::Notify)?;
        if self.state == NotifyState::Notifying {
            return Ok(());
        }
        self.state = NotifyState::Notifying;
        info!("Notifications started for {}", self.uuid.to_short_string());
        Ok(())
    }

    fn stop_notify(&mut self) {
        self.state = NotifyState::Idle;
        info!("Notifications stopped for {}", self.uuid.to_short_string());
    }
}

impl Describable for Characteristic {
    type Properties = CharacteristicProperties;

    fn describe(&self) -> CharacteristicProperties {
        CharacteristicProperties {
            id: self.id.clone(),
            uuid: self.uuid,
            service: self.id.service().clone(),
            value: self.value.clone(),
            flags: self.flags,
            notifying: self.is_notifying(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{bleuuid::uuid_from_u16, ServiceId};

    fn characteristic(flags: CharPropFlags) -> Characteristic {
        let service = ServiceId::new("/test", 0);
        Characteristic::new(
            CharacteristicId::new(&service, 0),
            uuid_from_u16(0x2a37),
            flags,
        )
    }

    #[test]
    fn starts_idle_with_single_zero_byte() {
        let c = characteristic(CharPropFlags::READ);
        assert_eq!(c.read().unwrap(), vec![0]);
        assert_eq!(c.state(), NotifyState::Idle);
    }

    #[test]
    fn write_then_read_returns_written_value() {
        let mut c = characteristic(CharPropFlags::READ | CharPropFlags::WRITE);
        c.write(&[1, 2, 3]).unwrap();
        c.write(&[0xde, 0xad]).unwrap();
        assert_eq!(c.read().unwrap(), vec![0xde, 0xad]);
        c.write(&[]).unwrap();
        assert_eq!(c.read().unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn access_is_checked_against_flags() {
        let mut c = characteristic(CharPropFlags::NOTIFY);
        assert!(matches!(
            c.read(),
            Err(Error::InvalidAccess {
                access: Access::Read,
                ..
            })
        ));
        assert!(matches!(
            c.write(&[1]),
            Err(Error::InvalidAccess {
                access: Access::Write,
                ..
            })
        ));

        let mut c = characteristic(CharPropFlags::READ);
        assert!(matches!(
            c.start_notify(),
            Err(Error::InvalidAccess {
                access: Access::Notify,
                ..
            })
        ));
        assert!(!c.is_notifying());
    }

    #[test]
    fn start_and_stop_notify_are_idempotent() {
        let mut c = characteristic(CharPropFlags::READ | CharPropFlags::NOTIFY);
        c.stop_notify();
        assert_eq!(c.state(), NotifyState::Idle);

        c.start_notify().unwrap();
        c.start_notify().unwrap();
        assert_eq!(c.state(), NotifyState::Notifying);

        c.stop_notify();
        c.stop_notify();
        assert_eq!(c.state(), NotifyState::Idle);
    }

    #[test]
    fn update_value_only_notifies_while_notifying() {
        let mut c = characteristic(CharPropFlags::READ | CharPropFlags::NOTIFY);
        assert_eq!(c.update_value(vec![0, 70]), None);
        assert_eq!(c.read().unwrap(), vec![0, 70]);

        c.start_notify().unwrap();
        let notification = c.update_value(vec![0, 71]).unwrap();
        assert_eq!(notification.value, vec![0, 71]);
        assert_eq!(&notification.characteristic, c.id());
        assert_eq!(c.read().unwrap(), vec![0, 71]);
    }

    #[test]
    fn describe_reports_owning_service() {
        let mut c = characteristic(CharPropFlags::READ | CharPropFlags::NOTIFY);
        c.start_notify().unwrap();
        let properties = c.describe();
        assert_eq!(properties.service.as_str(), "/test/service1");
        assert_eq!(properties.id.as_str(), "/test/service1/char1");
        assert_eq!(properties.value, vec![0]);
        assert!(properties.notifying);
    }
}
