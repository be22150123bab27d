//! The ONOS provider root.
//!
//! Owns one adapter per type name, resolves the provider block into a shared
//! [`OnosClient`] and forwards every host call to the matching adapter.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::adapter::{ConfiguredClient, DataSource, Resource};
use crate::client::OnosClient;
use crate::config::ProviderConfig;
use crate::datasources::{FlowsDataSource, HostsDataSource};
use crate::error::ProviderError;
use crate::resources::IntentResource;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::validation::validate;

/// Type name prefix of every resource and data source.
pub const TYPE_NAME: &str = "onos";

/// Provider for an ONOS SDN controller.
pub struct OnosProvider {
    version: String,
    data_sources: BTreeMap<String, Box<dyn DataSource>>,
    resources: BTreeMap<String, Box<dyn Resource>>,
    client: ConfiguredClient,
}

impl OnosProvider {
    /// A provider with every data source and resource registered.
    pub fn new(version: impl Into<String>) -> Self {
        let data_sources: Vec<Box<dyn DataSource>> =
            vec![Box::new(FlowsDataSource::new()), Box::new(HostsDataSource::new())];
        let resources: Vec<Box<dyn Resource>> = vec![Box::new(IntentResource::new())];

        Self {
            version: version.into(),
            data_sources: data_sources
                .into_iter()
                .map(|d| (d.metadata(TYPE_NAME), d))
                .collect(),
            resources: resources
                .into_iter()
                .map(|r| (r.metadata(TYPE_NAME), r))
                .collect(),
            client: ConfiguredClient::new(),
        }
    }

    /// The provider's release version.
    pub fn version(&self) -> &str {
        &self.version
    }

    fn resource(&self, resource_type: &str) -> Result<&dyn Resource, ProviderError> {
        self.resources
            .get(resource_type)
            .map(|b| b.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source(&self, data_source_type: &str) -> Result<&dyn DataSource, ProviderError> {
        self.data_sources
            .get(data_source_type)
            .map(|b| b.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))
    }
}

#[async_trait]
impl ProviderService for OnosProvider {
    fn schema(&self) -> ProviderSchema {
        let schema = ProviderSchema::new().with_provider_config(ProviderConfig::schema());
        let schema = self
            .resources
            .iter()
            .fold(schema, |schema, (name, r)| schema.with_resource(name.as_str(), r.schema()));
        self.data_sources
            .iter()
            .fold(schema, |schema, (name, d)| schema.with_data_source(name.as_str(), d.schema()))
    }

    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&ProviderConfig::schema(), &config))
    }

    #[instrument(skip_all, fields(version = %self.version))]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let settings = match ProviderConfig::from_value(config)?.resolve() {
            Ok(settings) => settings,
            Err(diagnostics) => {
                warn!(count = diagnostics.len(), "Provider configuration rejected");
                return Ok(diagnostics);
            },
        };

        let client = match OnosClient::new(&settings) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                return Ok(vec![Diagnostic::error("Unable to Create ONOS API Client")
                    .with_detail(e.to_string())
                    .with_attribute("host")]);
            },
        };
        info!(
            base_url = %client.base_url(),
            username = %settings.username,
            "ONOS client configured"
        );

        for data_source in self.data_sources.values() {
            data_source.configure(Some(client.clone())).await;
        }
        for resource in self.resources.values() {
            resource.configure(Some(client.clone())).await;
        }
        if let Some(previous) = self.client.replace(client).await {
            previous.shutdown();
            debug!("Previous ONOS client shut down");
        }
        Ok(vec![])
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        if let Ok(client) = self.client.get(TYPE_NAME).await {
            client.shutdown();
            info!("ONOS client shut down");
        }
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&self.resource(resource_type)?.schema(), &config))
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        Ok(self.resource(resource_type)?.plan(prior_state.as_ref(), &proposed_state))
    }

    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.resource(resource_type)?.create(planned_state).await
    }

    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.resource(resource_type)?.read(current_state).await
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.resource(resource_type)?.update(prior_state, planned_state).await
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        self.resource(resource_type)?.delete(current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let importer = self.resource(resource_type)?.as_import_state().ok_or_else(|| {
            ProviderError::Unimplemented(format!(
                "Import not supported for resource type: {}",
                resource_type
            ))
        })?;
        let state = importer.import_state(id)?;
        Ok(vec![ImportedResource::new(resource_type, state)])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&self.data_source(data_source_type)?.schema(), &config))
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.data_source(data_source_type)?.read(config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registered_types() {
        let provider = OnosProvider::new("0.1.0");
        let metadata = provider.metadata();
        assert_eq!(metadata.resources, vec!["onos_intent"]);
        assert_eq!(metadata.data_sources, vec!["onos_flows", "onos_hosts"]);
        assert_eq!(provider.version(), "0.1.0");
    }

    #[test]
    fn test_schema_includes_provider_block() {
        let schema = OnosProvider::new("0.1.0").schema();
        assert!(schema.provider.block.attributes.contains_key("host"));
        assert!(schema.resources["onos_intent"].block.blocks.contains_key("intent"));
    }

    #[tokio::test]
    async fn test_unknown_type_is_rejected() {
        let provider = OnosProvider::new("0.1.0");
        let err = provider.read("onos_device", json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(ref name) if name == "onos_device"));
        assert!(provider.read_data_source("onos_intent", Value::Null).await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_host_is_a_diagnostic() {
        let provider = OnosProvider::new("0.1.0");
        let diagnostics = provider
            .configure(json!({"host": "localhost:8181", "username": "onos", "password": "rocks"}))
            .await
            .unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("host"));
    }

    #[tokio::test]
    async fn test_reconfigure_shuts_down_previous_client() {
        let provider = OnosProvider::new("0.1.0");
        let config = json!({"host": "http://onos-a:8181", "username": "onos", "password": "rocks"});
        assert!(provider.configure(config).await.unwrap().is_empty());
        let first = provider.client.get(TYPE_NAME).await.unwrap();

        let config = json!({"host": "http://onos-b:8181", "username": "onos", "password": "rocks"});
        assert!(provider.configure(config).await.unwrap().is_empty());
        let second = provider.client.get(TYPE_NAME).await.unwrap();

        assert!(first.is_shut_down());
        assert!(!second.is_shut_down());
        assert_eq!(second.base_url().host_str(), Some("onos-b"));
    }

    #[tokio::test]
    async fn test_stop_before_configure() {
        assert!(OnosProvider::new("0.1.0").stop().await.is_ok());
    }
}
