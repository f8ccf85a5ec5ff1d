use crate::{api, Error, Result};
use async_trait::async_trait;
use std::fmt;

/// Implementation of [api::Adapter](crate::api::Adapter).
#[derive(Clone)]
pub struct Adapter {
    adapter: bluer::Adapter,
}

impl Adapter {
    pub(crate) fn new(adapter: bluer::Adapter) -> Self {
        Self { adapter }
    }

    pub fn name(&self) -> &str {
        self.adapter.name()
    }
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter").field("name", &self.name()).finish()
    }
}

#[async_trait]
impl api::Adapter for Adapter {
    async fn set_powered(&self, powered: bool) -> Result<()> {
        self.adapter
            .set_powered(powered)
            .await
            .map_err(|err| configuration_error("Powered", err))
    }

    async fn set_alias(&self, alias: &str) -> Result<()> {
        self.adapter
            .set_alias(alias.to_string())
            .await
            .map_err(|err| configuration_error("Alias", err))
    }

    async fn set_discoverable(&self, discoverable: bool) -> Result<()> {
        self.adapter
            .set_discoverable(discoverable)
            .await
            .map_err(|err| configuration_error("Discoverable", err))
    }
}

fn configuration_error(property: &str, error: bluer::Error) -> Error {
    Error::AdapterConfiguration(format!("setting {} failed: {}", property, error))
}
