// hrm-emulator Source Code File
//
// Copyright 2026 The hrm-emulator Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! The `api` module contains the traits and types which the emulator uses to talk to a Bluetooth
//! stack, along with the snapshot types it hands out for discovery.
//!
//! A Bluetooth backend implements two traits:
//!
//! - [`Adapter`] configures the local radio (power, alias, discoverability).
//! - [`Stack`] exposes the GATT database to remote centrals, forwards their requests to the
//!   emulator through a [`RequestSender`] and delivers value notifications back out.

pub mod bleuuid;
mod request;

pub use request::{RequestSender, StackRequest};

use async_trait::async_trait;
use bitflags::bitflags;
use serde::{Serialize, Serializer};
use std::fmt::{self, Display, Formatter};
use uuid::Uuid;

use crate::Result;

bitflags! {
    /// A set of properties that indicate what operations are supported by a Characteristic.
    #[derive(Default, Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize)]
    #[serde(transparent)]
    pub struct CharPropFlags: u8 {
        const BROADCAST = 0x01;
        const READ = 0x02;
        const WRITE_WITHOUT_RESPONSE = 0x04;
        const WRITE = 0x08;
        const NOTIFY = 0x10;
        const INDICATE = 0x20;
        const AUTHENTICATED_SIGNED_WRITES = 0x40;
        const EXTENDED_PROPERTIES = 0x80;
    }
}

impl CharPropFlags {
    /// Returns true if the flags allow the given kind of access.
    pub fn permits(&self, access: Access) -> bool {
        match access {
            Access::Read => self.contains(CharPropFlags::READ),
            Access::Write => {
                self.intersects(CharPropFlags::WRITE | CharPropFlags::WRITE_WITHOUT_RESPONSE)
            }
            Access::Notify => self.intersects(CharPropFlags::NOTIFY | CharPropFlags::INDICATE),
        }
    }
}

/// The kinds of access a central may request on a characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Read,
    Write,
    Notify,
}

impl Display for Access {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Access::Read => write!(f, "read"),
            Access::Write => write!(f, "write"),
            Access::Notify => write!(f, "notify"),
        }
    }
}

/// Identifies a service within the emulator's GATT database. Rendered as an object path such as
/// `/org/bluez/example/service1`.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ServiceId(String);

impl ServiceId {
    pub(crate) fn new(base_path: &str, index: usize) -> Self {
        ServiceId(format!("{}/service{}", base_path, index + 1))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ServiceId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ServiceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Identifies a characteristic. The owning service is part of the identifier, which is how a
/// characteristic refers back to its service without holding on to it.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct CharacteristicId {
    service: ServiceId,
    path: String,
}

impl CharacteristicId {
    pub(crate) fn new(service: &ServiceId, index: usize) -> Self {
        CharacteristicId {
            service: service.clone(),
            path: format!("{}/char{}", service, index + 1),
        }
    }

    /// The service this characteristic belongs to.
    pub fn service(&self) -> &ServiceId {
        &self.service
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }
}

impl Display for CharacteristicId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl Serialize for CharacteristicId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A point-in-time snapshot of a characteristic, used for registration and introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacteristicProperties {
    pub id: CharacteristicId,
    pub uuid: Uuid,
    /// Path of the owning service.
    pub service: ServiceId,
    pub value: Vec<u8>,
    pub flags: CharPropFlags,
    pub notifying: bool,
}

/// A point-in-time snapshot of a service. Characteristics are listed by identifier, in the order
/// they were declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceProperties {
    pub id: ServiceId,
    pub uuid: Uuid,
    pub primary: bool,
    pub characteristics: Vec<CharacteristicId>,
}

/// A snapshot of the whole GATT database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationProperties {
    pub base_path: String,
    pub services: Vec<ServiceProperties>,
    pub characteristics: Vec<CharacteristicProperties>,
}

/// A notification or indication pushed to subscribed centrals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueNotification {
    /// Path of the characteristic whose value changed.
    pub characteristic: CharacteristicId,
    /// UUID of the characteristic that fired the notification.
    pub uuid: Uuid,
    /// The new value of the characteristic.
    pub value: Vec<u8>,
}

/// Anything that can produce a property snapshot of itself for discovery.
pub trait Describable {
    type Properties;

    fn describe(&self) -> Self::Properties;
}

/// The operations a remote central can perform on an attribute. Every method checks the
/// attribute's [`CharPropFlags`] and fails with [`Error::InvalidAccess`](crate::Error) when the
/// operation isn't allowed.
pub trait Accessible {
    fn read(&self) -> Result<Vec<u8>>;

    fn write(&mut self, value: &[u8]) -> Result<()>;

    /// Enables notifications. Calling this while notifications are already enabled does nothing.
    fn start_notify(&mut self) -> Result<()>;

    /// Disables notifications. Always succeeds, whatever the previous state was.
    fn stop_notify(&mut self);
}

/// The local Bluetooth radio. Configuration failures are reported as
/// [`Error::AdapterConfiguration`](crate::Error::AdapterConfiguration) and are not fatal for the
/// emulator.
#[async_trait]
pub trait Adapter: Send + Sync {
    async fn set_powered(&self, powered: bool) -> Result<()>;

    /// Sets the name centrals see when they scan for the device.
    async fn set_alias(&self, alias: &str) -> Result<()>;

    async fn set_discoverable(&self, discoverable: bool) -> Result<()>;
}

/// The Bluetooth stack that makes the GATT database visible to remote centrals.
///
/// Registration happens once during setup: every service and characteristic is registered, then
/// [`publish`](Stack::publish) makes the database live. From then on the stack turns central
/// requests into [`StackRequest`]s on the given [`RequestSender`], and the emulator calls
/// [`notify`](Stack::notify) whenever a subscribed characteristic changes.
#[async_trait]
pub trait Stack: Send + Sync {
    async fn register_service(&self, service: ServiceProperties) -> Result<()>;

    async fn register_characteristic(&self, characteristic: CharacteristicProperties)
        -> Result<()>;

    /// Publishes the registered database and starts advertising its primary services.
    async fn publish(&self, alias: &str, requests: RequestSender) -> Result<()>;

    /// Pushes a new value to every central subscribed to the characteristic.
    async fn notify(&self, notification: ValueNotification) -> Result<()>;

    /// Withdraws the database and stops advertising.
    async fn unpublish(&self) -> Result<()>;
}
