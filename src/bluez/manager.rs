use super::{adapter::Adapter, stack::GattStack};
use crate::{Error, Result};
use log::info;

/// A connection to the BlueZ daemon.
#[derive(Clone)]
pub struct Manager {
    session: bluer::Session,
}

impl Manager {
    pub async fn new() -> Result<Self> {
        let session = bluer::Session::new()
            .await
            .map_err(|err| Error::StackUnavailable(err.to_string()))?;
        Ok(Self { session })
    }

    /// The adapter and GATT stack of the system's default controller.
    pub async fn default_adapter(&self) -> Result<(Adapter, GattStack)> {
        let adapter = self
            .session
            .default_adapter()
            .await
            .map_err(|err| Error::StackUnavailable(err.to_string()))?;
        info!("Using Bluetooth adapter {}", adapter.name());
        Ok((Adapter::new(adapter.clone()), GattStack::new(adapter)))
    }
}
