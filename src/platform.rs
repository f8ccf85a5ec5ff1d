//! The `platform` module re-exports the backend that drives a real radio on the current target.
//! Targets without one fall back to the [`loopback`](crate::loopback) backend. Refer to the `api`
//! module for the traits they implement.

#[cfg(target_os = "linux")]
pub use crate::bluez::{adapter::Adapter, manager::Manager, stack::GattStack as Stack};
#[cfg(not(target_os = "linux"))]
pub use crate::loopback::{LoopbackAdapter as Adapter, LoopbackStack as Stack};

use crate::api;
use crate::loopback::{LoopbackAdapter, LoopbackStack};
use static_assertions::assert_impl_all;
use std::fmt::Debug;

// Ensure that the exported types implement all the expected traits.
assert_impl_all!(Adapter: api::Adapter, Clone, Debug, Send, Sized, Sync);
assert_impl_all!(Stack: api::Stack, Clone, Debug, Send, Sized, Sync);
assert_impl_all!(LoopbackAdapter: api::Adapter, Clone, Debug, Send, Sized, Sync);
assert_impl_all!(LoopbackStack: api::Stack, Clone, Debug, Send, Sized, Sync);

/// Whether [`Adapter`] and [`Stack`] talk to a real Bluetooth controller.
pub const HAS_RADIO: bool = cfg!(target_os = "linux");
