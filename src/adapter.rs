//! Lifecycle traits for data sources and resources.
//!
//! The provider root owns one boxed adapter per type name and forwards every
//! host call to it. Each adapter is handed the shared [`OnosClient`] through
//! [`DataSource::configure`] or [`Resource::configure`] once the provider
//! block has been resolved.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::client::OnosClient;
use crate::error::ProviderError;
use crate::plan::plan_resource;
use crate::schema::Schema;
use crate::types::PlanResult;

/// A read-only view of controller objects.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Full type name, given the provider's type name (e.g. `onos`).
    fn metadata(&self, provider_type_name: &str) -> String;

    /// Schema of the data source's state.
    fn schema(&self) -> Schema;

    /// Receive the shared client. `None` leaves the adapter as it was.
    async fn configure(&self, client: Option<Arc<OnosClient>>);

    /// Fetch the full collection and return it as the new state.
    async fn read(&self, config: Value) -> Result<Value, ProviderError>;
}

/// A controller object managed through its full lifecycle.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Full type name, given the provider's type name (e.g. `onos`).
    fn metadata(&self, provider_type_name: &str) -> String;

    /// Schema of the resource's state.
    fn schema(&self) -> Schema;

    /// Receive the shared client. `None` leaves the adapter as it was.
    async fn configure(&self, client: Option<Arc<OnosClient>>);

    /// Plan a change. Defaults to the schema-driven diff.
    fn plan(&self, prior: Option<&Value>, proposed: &Value) -> PlanResult {
        plan_resource(&self.schema(), prior, proposed)
    }

    /// Create the object and return the state as the controller reports it.
    async fn create(&self, planned: Value) -> Result<Value, ProviderError>;

    /// Refresh the state. `Value::Null` means the object is gone.
    async fn read(&self, current: Value) -> Result<Value, ProviderError>;

    /// Apply `planned` over `prior`.
    async fn update(&self, prior: Value, planned: Value) -> Result<Value, ProviderError>;

    /// Remove the object.
    async fn delete(&self, current: Value) -> Result<(), ProviderError>;

    /// The import capability, for resources that support it.
    fn as_import_state(&self) -> Option<&dyn ImportState> {
        None
    }
}

/// Adoption of an existing object by identifier.
pub trait ImportState: Send + Sync {
    /// Turn an import identifier into a state the next read can refresh.
    fn import_state(&self, id: &str) -> Result<Value, ProviderError>;
}

/// The client slot every adapter holds.
#[derive(Debug, Default)]
pub struct ConfiguredClient {
    client: RwLock<Option<Arc<OnosClient>>>,
}

impl ConfiguredClient {
    /// An empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `client`; `None` is ignored.
    pub async fn set(&self, client: Option<Arc<OnosClient>>) {
        if let Some(client) = client {
            *self.client.write().await = Some(client);
        }
    }

    /// Store `client` and hand back the one it displaces.
    pub async fn replace(&self, client: Arc<OnosClient>) -> Option<Arc<OnosClient>> {
        self.client.write().await.replace(client)
    }

    /// The stored client, or [`ProviderError::FailedPrecondition`] naming
    /// `type_name` when the provider was never configured.
    pub async fn get(&self, type_name: &str) -> Result<Arc<OnosClient>, ProviderError> {
        self.client.read().await.clone().ok_or_else(|| {
            ProviderError::FailedPrecondition(format!(
                "{} used before the provider was configured",
                type_name
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientSettings;

    fn client() -> Arc<OnosClient> {
        Arc::new(
            OnosClient::new(&ClientSettings {
                host: "http://localhost:8181".to_string(),
                username: "onos".to_string(),
                password: "rocks".to_string(),
            })
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_unconfigured_slot_fails() {
        let slot = ConfiguredClient::new();
        let err = slot.get("onos_flows").await.unwrap_err();
        assert!(matches!(err, ProviderError::FailedPrecondition(_)));
        assert!(err.to_string().contains("onos_flows"));
    }

    #[tokio::test]
    async fn test_configure_without_data_is_a_no_op() {
        let slot = ConfiguredClient::new();
        slot.set(None).await;
        assert!(slot.get("onos_hosts").await.is_err());

        let shared = client();
        slot.set(Some(shared.clone())).await;
        slot.set(None).await;
        assert!(Arc::ptr_eq(&slot.get("onos_hosts").await.unwrap(), &shared));
    }

    #[tokio::test]
    async fn test_replace_returns_previous() {
        let slot = ConfiguredClient::new();
        let first = client();
        assert!(slot.replace(first.clone()).await.is_none());

        let second = client();
        let displaced = slot.replace(second.clone()).await.unwrap();
        assert!(Arc::ptr_eq(&displaced, &first));
        assert!(Arc::ptr_eq(&slot.get("onos_flows").await.unwrap(), &second));
    }
}
