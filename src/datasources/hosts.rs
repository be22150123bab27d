//! `onos_hosts`: end-stations the controller has discovered.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::PLACEHOLDER_ID;
use crate::adapter::{ConfiguredClient, DataSource};
use crate::client::models::{Host, HostLocation};
use crate::client::OnosClient;
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeType, Block, NestedBlock, Schema};
use crate::value::{Attr, SetValue};

/// State of the hosts data source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostsState {
    /// Always [`PLACEHOLDER_ID`].
    pub id: Attr<String>,
    /// One entry per host, in controller order.
    pub hosts: Vec<HostModel>,
}

/// A host in state form.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostModel {
    pub id: Attr<String>,
    pub mac: Attr<String>,
    pub vlan: Attr<String>,
    pub innervlan: Attr<String>,
    pub outertpid: Attr<String>,
    pub configured: Attr<bool>,
    pub suspended: Attr<bool>,
    pub ipaddresses: SetValue,
    pub locations: Vec<LocationModel>,
}

/// A device port the host is attached to.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationModel {
    pub elementid: Attr<String>,
    pub port: Attr<String>,
}

impl HostsState {
    /// Map a decoded `/hosts` response.
    pub fn from_hosts(hosts: Vec<Host>) -> Result<Self, ProviderError> {
        Ok(Self {
            id: PLACEHOLDER_ID.into(),
            hosts: hosts
                .into_iter()
                .map(HostModel::try_from)
                .collect::<Result<_, _>>()?,
        })
    }
}

impl TryFrom<Host> for HostModel {
    type Error = ProviderError;

    fn try_from(host: Host) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Attr::from_option(host.id),
            mac: Attr::from_option(host.mac),
            vlan: Attr::from_option(host.vlan),
            innervlan: Attr::from_option(host.inner_vlan),
            outertpid: Attr::from_option(host.outer_tpid),
            configured: Attr::from_option(host.configured),
            suspended: Attr::from_option(host.suspended),
            ipaddresses: SetValue::from_elements(AttributeType::String, host.ip_addresses)?,
            locations: host.locations.into_iter().map(Into::into).collect(),
        })
    }
}

impl From<HostLocation> for LocationModel {
    fn from(location: HostLocation) -> Self {
        Self {
            elementid: Attr::from_option(location.element_id),
            port: Attr::from_option(location.port),
        }
    }
}

/// Reads all hosts.
#[derive(Debug, Default)]
pub struct HostsDataSource {
    client: ConfiguredClient,
}

impl HostsDataSource {
    /// An unconfigured data source.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for HostsDataSource {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_hosts", provider_type_name)
    }

    fn schema(&self) -> Schema {
        let location = Block::new()
            .with_attribute("elementid", Attribute::computed_string())
            .with_attribute("port", Attribute::computed_string());

        let host = Block::new()
            .with_attribute(
                "id",
                Attribute::computed_string()
                    .with_description("MAC and VLAN, e.g. 00:00:00:00:00:03/None"),
            )
            .with_attribute("mac", Attribute::computed_string())
            .with_attribute("vlan", Attribute::computed_string())
            .with_attribute("innervlan", Attribute::computed_string())
            .with_attribute("outertpid", Attribute::computed_string())
            .with_attribute("configured", Attribute::computed_bool())
            .with_attribute("suspended", Attribute::computed_bool())
            .with_attribute("ipaddresses", Attribute::computed_set(AttributeType::String))
            .with_block("locations", NestedBlock::list(location));

        Schema::v0()
            .with_description("End-stations discovered by the controller")
            .with_attribute("id", Attribute::computed_string())
            .with_block("hosts", NestedBlock::list(host))
    }

    async fn configure(&self, client: Option<Arc<OnosClient>>) {
        self.client.set(client).await;
    }

    #[instrument(skip_all)]
    async fn read(&self, _config: Value) -> Result<Value, ProviderError> {
        let client = self.client.get("onos_hosts").await?;
        let state = HostsState::from_hosts(client.get_hosts().await?)?;
        debug!(count = state.hosts.len(), "Mapped hosts");
        Ok(serde_json::to_value(state)?)
    }
}
