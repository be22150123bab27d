//! `onos_flows`: every flow rule installed on the controller's devices.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::PLACEHOLDER_ID;
use crate::adapter::{ConfiguredClient, DataSource};
use crate::client::models::{Criterion, Flow, Instruction, Selector, Treatment};
use crate::client::OnosClient;
use crate::error::ProviderError;
use crate::schema::{Attribute, Block, NestedBlock, Schema};
use crate::value::{widen, Attr};

/// State of the flows data source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowsState {
    /// Always [`PLACEHOLDER_ID`].
    pub id: Attr<String>,
    /// One entry per flow rule, in controller order.
    pub flows: Vec<FlowModel>,
}

/// A flow rule in state form.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowModel {
    pub app_id: Attr<String>,
    pub bytes: Attr<i64>,
    pub device_id: Attr<String>,
    pub group_id: Attr<i64>,
    pub id: Attr<String>,
    pub is_permanent: Attr<bool>,
    pub last_seen: Attr<i64>,
    pub life: Attr<i64>,
    pub live_type: Attr<String>,
    pub packets: Attr<i64>,
    pub priority: Attr<i64>,
    pub state: Attr<String>,
    pub table_id: Attr<i64>,
    pub table_name: Attr<String>,
    pub timeout: Attr<i64>,
    pub selector: SelectorModel,
    pub treatment: TreatmentModel,
}

/// Match criteria of a flow rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectorModel {
    /// Criteria in controller order.
    pub criteria: Vec<CriterionModel>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionModel {
    pub eth_type: Attr<String>,
    pub mac: Attr<String>,
    pub port: Attr<i64>,
    #[serde(rename = "type")]
    pub kind: Attr<String>,
}

/// Actions of a flow rule.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreatmentModel {
    pub clear_deferred: Attr<bool>,
    pub instructions: Vec<InstructionModel>,
    pub deferred: Vec<InstructionModel>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstructionModel {
    pub port: Attr<String>,
    #[serde(rename = "type")]
    pub kind: Attr<String>,
}

impl FlowsState {
    /// Map a decoded `/flows` response.
    pub fn from_flows(flows: Vec<Flow>) -> Result<Self, ProviderError> {
        Ok(Self {
            id: PLACEHOLDER_ID.into(),
            flows: flows
                .into_iter()
                .map(FlowModel::try_from)
                .collect::<Result<_, _>>()?,
        })
    }
}

impl TryFrom<Flow> for FlowModel {
    type Error = ProviderError;

    fn try_from(flow: Flow) -> Result<Self, Self::Error> {
        Ok(Self {
            app_id: Attr::from_option(flow.app_id),
            bytes: widen("bytes", flow.bytes)?,
            device_id: Attr::from_option(flow.device_id),
            group_id: widen("groupId", flow.group_id)?,
            id: Attr::from_option(flow.id),
            is_permanent: Attr::from_option(flow.is_permanent),
            last_seen: widen("lastSeen", flow.last_seen)?,
            life: widen("life", flow.life)?,
            live_type: Attr::from_option(flow.live_type),
            packets: widen("packets", flow.packets)?,
            priority: widen("priority", flow.priority)?,
            state: Attr::from_option(flow.state),
            table_id: widen("tableId", flow.table_id)?,
            table_name: Attr::from_option(flow.table_name),
            timeout: widen("timeout", flow.timeout)?,
            selector: SelectorModel::try_from(flow.selector)?,
            treatment: TreatmentModel::from(flow.treatment),
        })
    }
}

impl TryFrom<Selector> for SelectorModel {
    type Error = ProviderError;

    fn try_from(selector: Selector) -> Result<Self, Self::Error> {
        let criteria = selector
            .criteria
            .into_iter()
            .map(|c: Criterion| -> Result<CriterionModel, ProviderError> {
                Ok(CriterionModel {
                    eth_type: Attr::from_option(c.eth_type),
                    mac: Attr::from_option(c.mac),
                    port: widen("port", c.port)?,
                    kind: Attr::from_option(c.kind),
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { criteria })
    }
}

impl From<Treatment> for TreatmentModel {
    fn from(treatment: Treatment) -> Self {
        Self {
            clear_deferred: Attr::from_option(treatment.clear_deferred),
            instructions: treatment.instructions.into_iter().map(Into::into).collect(),
            deferred: treatment.deferred.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Instruction> for InstructionModel {
    fn from(instruction: Instruction) -> Self {
        Self {
            port: Attr::from_option(instruction.port),
            kind: Attr::from_option(instruction.kind),
        }
    }
}

fn instruction_block() -> Block {
    Block::new()
        .with_attribute("port", Attribute::computed_string())
        .with_attribute("type", Attribute::computed_string())
}

/// Reads all flow rules.
#[derive(Debug, Default)]
pub struct FlowsDataSource {
    client: ConfiguredClient,
}

impl FlowsDataSource {
    /// An unconfigured data source.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for FlowsDataSource {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_flows", provider_type_name)
    }

    fn schema(&self) -> Schema {
        let criteria = Block::new()
            .with_attribute("eth_type", Attribute::computed_string())
            .with_attribute("mac", Attribute::computed_string())
            .with_attribute("port", Attribute::computed_int64())
            .with_attribute("type", Attribute::computed_string());

        let flow = Block::new()
            .with_attribute("app_id", Attribute::computed_string())
            .with_attribute("bytes", Attribute::computed_int64())
            .with_attribute("device_id", Attribute::computed_string())
            .with_attribute("group_id", Attribute::computed_int64())
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("is_permanent", Attribute::computed_bool())
            .with_attribute("last_seen", Attribute::computed_int64())
            .with_attribute("life", Attribute::computed_int64())
            .with_attribute("live_type", Attribute::computed_string())
            .with_attribute("packets", Attribute::computed_int64())
            .with_attribute("priority", Attribute::computed_int64())
            .with_attribute("state", Attribute::computed_string())
            .with_attribute("table_id", Attribute::computed_int64())
            .with_attribute("table_name", Attribute::computed_string())
            .with_attribute("timeout", Attribute::computed_int64())
            .with_block(
                "selector",
                NestedBlock::single(
                    Block::new().with_block("criteria", NestedBlock::list(criteria)),
                ),
            )
            .with_block(
                "treatment",
                NestedBlock::single(
                    Block::new()
                        .with_attribute("clear_deferred", Attribute::computed_bool())
                        .with_block("instructions", NestedBlock::list(instruction_block()))
                        .with_block("deferred", NestedBlock::list(instruction_block())),
                ),
            );

        Schema::v0()
            .with_description("Flow rules installed on the controller's devices")
            .with_attribute("id", Attribute::computed_string())
            .with_block("flows", NestedBlock::list(flow))
    }

    async fn configure(&self, client: Option<Arc<OnosClient>>) {
        self.client.set(client).await;
    }

    #[instrument(skip_all)]
    async fn read(&self, _config: Value) -> Result<Value, ProviderError> {
        let client = self.client.get("onos_flows").await?;
        let state = FlowsState::from_flows(client.get_flows().await?)?;
        debug!(count = state.flows.len(), "Mapped flows");
        Ok(serde_json::to_value(state)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientSettings;
    use crate::validation::validate;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn lldp_flow() -> Value {
        json!({
            "groupId": 0,
            "state": "ADDED",
            "life": 1520,
            "liveType": "UNKNOWN",
            "lastSeen": 1700000000123u64,
            "packets": 304,
            "bytes": 42560,
            "id": "281475981553285",
            "appId": "org.onosproject.core",
            "priority": 40000,
            "timeout": 0,
            "isPermanent": true,
            "deviceId": "of:0000000000000001",
            "tableId": 0,
            "tableName": "0",
            "treatment": {
                "instructions": [{"type": "OUTPUT", "port": "CONTROLLER"}],
                "deferred": [],
                "clearDeferred": true
            },
            "selector": {
                "criteria": [
                    {"type": "ETH_TYPE", "ethType": "0x88cc"},
                    {"type": "IN_PORT", "port": 2}
                ]
            }
        })
    }

    async fn configured(server: &MockServer) -> FlowsDataSource {
        let client = OnosClient::new(&ClientSettings {
            host: server.uri(),
            username: "onos".to_string(),
            password: "rocks".to_string(),
        })
        .unwrap();
        let source = FlowsDataSource::new();
        source.configure(Some(Arc::new(client))).await;
        source
    }

    #[test]
    fn test_map_flow() {
        let flow: Flow = serde_json::from_value(lldp_flow()).unwrap();
        let model = FlowModel::try_from(flow).unwrap();

        assert_eq!(model.priority, Attr::Known(40000));
        assert_eq!(model.last_seen, Attr::Known(1700000000123));
        assert_eq!(model.selector.criteria.len(), 2);
        assert_eq!(model.selector.criteria[0].port, Attr::Null);
        assert_eq!(model.selector.criteria[1].port, Attr::Known(2));
        assert_eq!(model.treatment.instructions[0].port, Attr::Known("CONTROLLER".to_string()));
        assert!(model.treatment.deferred.is_empty());
    }

    #[test]
    fn test_absent_selector_and_treatment_are_empty() {
        let flow: Flow = serde_json::from_value(json!({"id": "1"})).unwrap();
        let value = serde_json::to_value(FlowModel::try_from(flow).unwrap()).unwrap();

        assert_eq!(value["selector"], json!({"criteria": []}));
        assert_eq!(
            value["treatment"],
            json!({"clear_deferred": null, "instructions": [], "deferred": []})
        );
        assert_eq!(value["bytes"], Value::Null);
    }

    #[test]
    fn test_counter_overflow_is_an_error() {
        let flow: Flow = serde_json::from_value(json!({"bytes": u64::MAX})).unwrap();
        let err = FlowModel::try_from(flow).unwrap_err();
        assert!(matches!(err, ProviderError::OutOfRange { field: "bytes", .. }));
    }

    #[test]
    fn test_schema_shape() {
        let schema = FlowsDataSource::new().schema();
        let flows = &schema.block.blocks["flows"].block;
        assert!(flows.blocks["selector"].block.blocks.contains_key("criteria"));
        assert!(flows.blocks["treatment"].block.blocks.contains_key("deferred"));
        assert!(validate(&schema, &json!({})).is_empty());
    }

    #[tokio::test]
    async fn test_read_replaces_collection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/onos/v1/flows"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"flows": [lldp_flow(), lldp_flow()]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let state = configured(&server).await.read(Value::Null).await.unwrap();
        assert_eq!(state["id"], PLACEHOLDER_ID);
        assert_eq!(state["flows"].as_array().unwrap().len(), 2);
        assert_eq!(state["flows"][0]["device_id"], "of:0000000000000001");
        assert_eq!(state["flows"][0]["selector"]["criteria"][0]["type"], "ETH_TYPE");
    }

    #[tokio::test]
    async fn test_read_empty_collection_is_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/onos/v1/flows"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"flows": []})))
            .mount(&server)
            .await;

        let state = configured(&server).await.read(Value::Null).await.unwrap();
        assert_eq!(state["flows"], json!([]));
    }

    #[test]
    fn test_negative_group_id_is_widened() {
        let flow: Flow = serde_json::from_value(json!({"id": "1", "groupId": -1})).unwrap();
        let model = FlowModel::try_from(flow).unwrap();
        assert_eq!(model.group_id, Attr::Known(-1));
        assert_eq!(model.table_id, Attr::Null);
    }

    #[tokio::test]
    async fn test_read_without_flows_key_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/onos/v1/flows"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"error": "proxy says hi"})),
            )
            .mount(&server)
            .await;

        let err = configured(&server).await.read(Value::Null).await.unwrap_err();
        assert!(matches!(err, ProviderError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_read_unconfigured_fails() {
        let err = FlowsDataSource::new().read(Value::Null).await.unwrap_err();
        assert!(matches!(err, ProviderError::FailedPrecondition(_)));
    }
}
