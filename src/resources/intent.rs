//! `onos_intent`: a host-to-host intent keyed by application id and key.
//!
//! The controller treats `POST /intents` as create-or-replace, so create and
//! update share one path: submit the full record, then read it back and adopt
//! what the controller reports. The practitioner's `appid` and `key` are kept
//! exactly as written; the controller may normalize them in its responses.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::adapter::{ConfiguredClient, ImportState, Resource};
use crate::client::models::Intent;
use crate::client::OnosClient;
use crate::error::ProviderError;
use crate::schema::{Attribute, Block, NestedBlock, Schema};
use crate::value::Attr;

const TYPE_NAME: &str = "onos_intent";

/// State of an intent resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentState {
    /// `"<appid>,<key>"`.
    #[serde(default)]
    pub id: Attr<String>,
    /// RFC 3339 time of the last create or update.
    #[serde(default)]
    pub last_updated: Attr<String>,
    /// The intent itself.
    #[serde(default)]
    pub intent: Option<IntentModel>,
}

/// The practitioner-facing intent block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentModel {
    /// Controller-assigned id.
    #[serde(default)]
    pub id: Attr<String>,
    /// Owning application, e.g. `org.onosproject.cli`.
    #[serde(default)]
    pub appid: Attr<String>,
    /// Key unique within the application.
    #[serde(default)]
    pub key: Attr<String>,
    /// Intent type, e.g. `HostToHostIntent`.
    #[serde(default, rename = "type")]
    pub kind: Attr<String>,
    /// Intent priority.
    #[serde(default)]
    pub priority: Attr<i64>,
    /// First endpoint host id.
    #[serde(default)]
    pub one: Attr<String>,
    /// Second endpoint host id.
    #[serde(default)]
    pub two: Attr<String>,
}

impl IntentState {
    fn from_value(value: Value) -> Result<Self, ProviderError> {
        Ok(serde_json::from_value(value)?)
    }

    fn model(&self) -> Result<&IntentModel, ProviderError> {
        self.intent
            .as_ref()
            .ok_or_else(|| ProviderError::Validation("intent block is required".to_string()))
    }

    /// The composite key, from the intent block or else from the state id.
    fn keys(&self) -> Result<(String, String), ProviderError> {
        if let Some(model) = &self.intent {
            if let (Some(app_id), Some(key)) = (model.appid.known(), model.key.known()) {
                return Ok((app_id.clone(), key.clone()));
            }
        }
        match self.id.known() {
            Some(id) => parse_import_id(id),
            None => Err(ProviderError::Validation(
                "intent state has neither an appid/key pair nor an id".to_string(),
            )),
        }
    }
}

impl IntentModel {
    fn to_wire(&self) -> Result<Intent, ProviderError> {
        let priority = match self.priority.known() {
            Some(&p) => Some(i32::try_from(p).map_err(|_| ProviderError::OutOfRange {
                field: "priority",
                value: p.to_string(),
            })?),
            None => None,
        };
        Ok(Intent {
            kind: known("intent.type", &self.kind)?,
            app_id: known("intent.appid", &self.appid)?,
            key: known("intent.key", &self.key)?,
            id: None,
            priority,
            one: self.one.known().cloned(),
            two: self.two.known().cloned(),
            state: None,
        })
    }

    /// The controller's view of this intent, under the requested keys.
    fn adopt(&self, intent: Intent) -> Self {
        Self {
            id: Attr::from_option(intent.id),
            appid: self.appid.clone(),
            key: self.key.clone(),
            kind: Attr::Known(intent.kind),
            priority: Attr::from_option(intent.priority.map(i64::from)),
            one: Attr::from_option(intent.one),
            two: Attr::from_option(intent.two),
        }
    }
}

fn known(path: &str, value: &Attr<String>) -> Result<String, ProviderError> {
    value
        .known()
        .cloned()
        .ok_or_else(|| ProviderError::Validation(format!("{} must be known before apply", path)))
}

fn state_id(app_id: &str, key: &str) -> String {
    format!("{},{}", app_id, key)
}

/// Split an import identifier of the form `"<appid>,<key>"`.
pub fn parse_import_id(id: &str) -> Result<(String, String), ProviderError> {
    let parts: Vec<&str> = id.split(',').collect();
    match parts.as_slice() {
        [app_id, key] if !app_id.is_empty() && !key.is_empty() => {
            Ok((app_id.to_string(), key.to_string()))
        },
        _ => Err(ProviderError::InvalidImportId {
            id: id.to_string(),
            reason: "expected <appid>,<key> with both parts non-empty".to_string(),
        }),
    }
}

/// Manages one intent.
#[derive(Debug, Default)]
pub struct IntentResource {
    client: ConfiguredClient,
}

impl IntentResource {
    /// An unconfigured resource.
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit `model`, read it back and stamp the result.
    async fn apply(
        &self,
        client: &OnosClient,
        model: &IntentModel,
    ) -> Result<Value, ProviderError> {
        let request = model.to_wire()?;
        client.submit_intent(&request).await?;

        let applied = client
            .get_intent(&request.app_id, &request.key)
            .await?
            .ok_or_else(|| {
                ProviderError::NotFound(format!(
                    "intent {}/{} not found after submit",
                    request.app_id, request.key
                ))
            })?;
        info!(app_id = %request.app_id, key = %request.key, id = ?applied.id, "Intent applied");

        let state = IntentState {
            id: state_id(&request.app_id, &request.key).into(),
            last_updated: Utc::now().to_rfc3339().into(),
            intent: Some(model.adopt(applied)),
        };
        Ok(serde_json::to_value(state)?)
    }
}

#[async_trait]
impl Resource for IntentResource {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_intent", provider_type_name)
    }

    fn schema(&self) -> Schema {
        let intent = Block::new()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "appid",
                Attribute::required_string()
                    .with_force_new()
                    .with_description("Owning application, e.g. org.onosproject.cli"),
            )
            .with_attribute(
                "key",
                Attribute::required_string()
                    .with_force_new()
                    .with_description("Key unique within the application"),
            )
            .with_attribute(
                "type",
                Attribute::required_string().with_description("Intent type, e.g. HostToHostIntent"),
            )
            .with_attribute("priority", Attribute::required_int64())
            .with_attribute("one", Attribute::required_string().with_description("First host id"))
            .with_attribute("two", Attribute::required_string().with_description("Second host id"));

        Schema::v0()
            .with_description("A host-to-host connectivity intent")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("last_updated", Attribute::computed_string())
            .with_block("intent", NestedBlock::required_single(intent))
    }

    async fn configure(&self, client: Option<Arc<OnosClient>>) {
        self.client.set(client).await;
    }

    #[instrument(skip_all)]
    async fn create(&self, planned: Value) -> Result<Value, ProviderError> {
        let client = self.client.get(TYPE_NAME).await?;
        let planned = IntentState::from_value(planned)?;
        self.apply(&client, planned.model()?).await
    }

    #[instrument(skip_all)]
    async fn read(&self, current: Value) -> Result<Value, ProviderError> {
        let client = self.client.get(TYPE_NAME).await?;
        let current = IntentState::from_value(current)?;
        let (app_id, key) = current.keys()?;

        let Some(intent) = client.get_intent(&app_id, &key).await? else {
            warn!(%app_id, %key, "Intent no longer exists, removing from state");
            return Ok(Value::Null);
        };

        let requested = IntentModel {
            appid: app_id.as_str().into(),
            key: key.as_str().into(),
            ..current.intent.clone().unwrap_or_default()
        };
        let state = IntentState {
            id: state_id(&app_id, &key).into(),
            last_updated: current.last_updated,
            intent: Some(requested.adopt(intent)),
        };
        Ok(serde_json::to_value(state)?)
    }

    #[instrument(skip_all)]
    async fn update(&self, _prior: Value, planned: Value) -> Result<Value, ProviderError> {
        let client = self.client.get(TYPE_NAME).await?;
        let planned = IntentState::from_value(planned)?;
        self.apply(&client, planned.model()?).await
    }

    #[instrument(skip_all)]
    async fn delete(&self, current: Value) -> Result<(), ProviderError> {
        let client = self.client.get(TYPE_NAME).await?;
        let (app_id, key) = IntentState::from_value(current)?.keys()?;
        client.delete_intent(&app_id, &key).await?;
        info!(%app_id, %key, "Intent deleted");
        Ok(())
    }

    fn as_import_state(&self) -> Option<&dyn ImportState> {
        Some(self)
    }
}

impl ImportState for IntentResource {
    fn import_state(&self, id: &str) -> Result<Value, ProviderError> {
        let (app_id, key) = parse_import_id(id)?;
        let state = IntentState {
            id: id.into(),
            last_updated: Attr::Null,
            intent: Some(IntentModel {
                appid: app_id.into(),
                key: key.into(),
                ..IntentModel::default()
            }),
        };
        Ok(serde_json::to_value(state)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientSettings;
    use crate::validation::validate;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const INTENT_PATH: &str = "/onos/v1/intents/org.onosproject.cli/0x99999";

    fn config(priority: i64) -> Value {
        json!({
            "id": null,
            "last_updated": null,
            "intent": {
                "id": null,
                "appid": "org.onosproject.cli",
                "key": "0x99999",
                "type": "HostToHostIntent",
                "priority": priority,
                "one": "00:00:00:00:00:99/None",
                "two": "00:00:00:00:00:00/None"
            }
        })
    }

    fn onos_intent(priority: i64) -> Value {
        json!({
            "type": "HostToHostIntent",
            "id": "0x1a",
            "key": "0x99999",
            "appId": "org.onosproject.cli",
            "resources": ["00:00:00:00:00:99/None", "00:00:00:00:00:00/None"],
            "state": "INSTALLED",
            "priority": priority,
            "one": "00:00:00:00:00:99/None",
            "two": "00:00:00:00:00:00/None"
        })
    }

    async fn configured(server: &MockServer) -> IntentResource {
        let client = OnosClient::new(&ClientSettings {
            host: server.uri(),
            username: "onos".to_string(),
            password: "rocks".to_string(),
        })
        .unwrap();
        let resource = IntentResource::new();
        resource.configure(Some(Arc::new(client))).await;
        resource
    }

    async fn mount_intent(server: &MockServer, priority: i64) {
        Mock::given(method("POST"))
            .and(path("/onos/v1/intents"))
            .and(body_json(json!({
                "type": "HostToHostIntent",
                "appId": "org.onosproject.cli",
                "key": "0x99999",
                "priority": priority,
                "one": "00:00:00:00:00:99/None",
                "two": "00:00:00:00:00:00/None"
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(INTENT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(onos_intent(priority)))
            .mount(server)
            .await;
    }

    #[test]
    fn test_parse_import_id() {
        assert_eq!(
            parse_import_id("org.onosproject.cli,0x99999").unwrap(),
            ("org.onosproject.cli".to_string(), "0x99999".to_string())
        );
        for bad in ["onlyonepart", "a,,", ",key", "app,", "a,b,c", ""] {
            let err = parse_import_id(bad).unwrap_err();
            assert!(matches!(err, ProviderError::InvalidImportId { .. }), "{bad}");
        }
    }

    #[test]
    fn test_import_state() {
        let state = IntentResource::new().import_state("org.onosproject.cli,0x99999").unwrap();
        assert_eq!(state["id"], "org.onosproject.cli,0x99999");
        assert_eq!(state["intent"]["appid"], "org.onosproject.cli");
        assert_eq!(state["intent"]["key"], "0x99999");
        assert_eq!(state["intent"]["priority"], Value::Null);
        assert!(IntentResource::new().import_state("onlyonepart").is_err());
    }

    #[test]
    fn test_schema_requires_intent_block() {
        let schema = IntentResource::new().schema();
        assert!(validate(&schema, &config(100)).is_empty());
        assert!(!validate(&schema, &json!({})).is_empty());
    }

    #[test]
    fn test_priority_must_fit_the_wire() {
        let mut model: IntentModel = serde_json::from_value(config(0)["intent"].clone()).unwrap();
        model.priority = Attr::Known(3_000_000_000);
        let err = model.to_wire().unwrap_err();
        assert!(matches!(err, ProviderError::OutOfRange { field: "priority", .. }));
    }

    #[tokio::test]
    async fn test_create_then_read_round_trip() {
        let server = MockServer::start().await;
        mount_intent(&server, 100).await;
        let resource = configured(&server).await;

        let created = assert_ok!(resource.create(config(100)).await);
        assert_eq!(created["id"], "org.onosproject.cli,0x99999");
        assert_eq!(created["intent"]["id"], "0x1a");
        let stamp = created["last_updated"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());

        let read = assert_ok!(resource.read(created.clone()).await);
        assert_eq!(read, created);
    }

    #[tokio::test]
    async fn test_read_from_imported_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(INTENT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(onos_intent(100)))
            .mount(&server)
            .await;
        let resource = configured(&server).await;

        let imported = resource.import_state("org.onosproject.cli,0x99999").unwrap();
        let read = assert_ok!(resource.read(imported).await);
        assert_eq!(read["intent"]["type"], "HostToHostIntent");
        assert_eq!(read["intent"]["priority"], 100);
        assert_eq!(read["last_updated"], Value::Null);
    }

    #[tokio::test]
    async fn test_read_missing_intent_is_null() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(INTENT_PATH))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let resource = configured(&server).await;

        let state = assert_ok!(resource.read(config(100)).await);
        assert!(state.is_null());
    }

    #[tokio::test]
    async fn test_create_fails_when_intent_vanishes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/onos/v1/intents"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(INTENT_PATH))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let resource = configured(&server).await;

        let err = assert_err!(resource.create(config(100)).await);
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_resubmits() {
        let server = MockServer::start().await;
        mount_intent(&server, 200).await;
        let resource = configured(&server).await;

        let mut prior = config(100);
        prior["id"] = json!("org.onosproject.cli,0x99999");
        prior["last_updated"] = json!("2024-01-01T00:00:00+00:00");

        let updated = assert_ok!(resource.update(prior, config(200)).await);
        assert_eq!(updated["intent"]["priority"], 200);
        assert_ne!(updated["last_updated"], "2024-01-01T00:00:00+00:00");
    }

    #[tokio::test]
    async fn test_delete() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(INTENT_PATH))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        let resource = configured(&server).await;

        assert_ok!(resource.delete(config(100)).await);
    }

    #[tokio::test]
    async fn test_delete_failure_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(INTENT_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
        let resource = configured(&server).await;

        let err = assert_err!(resource.delete(config(100)).await);
        assert!(matches!(err, ProviderError::Api { status: 500, .. }));
    }
}
