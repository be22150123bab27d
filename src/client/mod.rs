//! REST client for the ONOS controller.
//!
//! One [`OnosClient`] is built per provider session and shared by every data
//! source and resource through an `Arc`. Calls are never retried; a
//! non-success status is classified with [`ProviderError::from_status`] and
//! a body that does not decode is a [`ProviderError::Serialization`] error.

#[allow(missing_docs)]
pub mod models;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::{Client, Method, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::error::ProviderError;
use models::{Flow, FlowsResponse, Host, HostsResponse, Intent};

/// Path prefix of the ONOS northbound REST API.
pub const API_PREFIX: &str = "/onos/v1";

/// Per-request timeout for controller calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the controller.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Controller URL, e.g. `http://localhost:8181`.
    pub host: String,
    /// Basic-auth user.
    pub username: String,
    /// Basic-auth password.
    pub password: String,
}

impl std::fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSettings")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Authenticated client for the ONOS REST API.
#[derive(Debug)]
pub struct OnosClient {
    http: Client,
    base_url: Url,
    username: String,
    password: String,
    shut_down: AtomicBool,
}

impl OnosClient {
    /// Build a client for `settings.host`.
    ///
    /// The host may be given with or without the `/onos/v1` prefix and with
    /// or without a trailing slash.
    pub fn new(settings: &ClientSettings) -> Result<Self, ProviderError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: api_base_url(&settings.host)?,
            username: settings.username.clone(),
            password: settings.password.clone(),
            shut_down: AtomicBool::new(false),
        })
    }

    /// The resolved API root, always ending in `/onos/v1`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fail every later call with [`ProviderError::Unavailable`].
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }

    /// Whether [`OnosClient::shutdown`] has been called.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Fetch every flow rule.
    #[instrument(skip(self))]
    pub async fn get_flows(&self) -> Result<Vec<Flow>, ProviderError> {
        let response: FlowsResponse = self.get_json(&["flows"]).await?;
        debug!(count = response.flows.len(), "Fetched flows");
        Ok(response.flows)
    }

    /// Fetch every host.
    #[instrument(skip(self))]
    pub async fn get_hosts(&self) -> Result<Vec<Host>, ProviderError> {
        let response: HostsResponse = self.get_json(&["hosts"]).await?;
        debug!(count = response.hosts.len(), "Fetched hosts");
        Ok(response.hosts)
    }

    /// Fetch one intent; `None` when the controller does not know it.
    #[instrument(skip(self))]
    pub async fn get_intent(
        &self,
        app_id: &str,
        key: &str,
    ) -> Result<Option<Intent>, ProviderError> {
        match self.get_json(&["intents", app_id, key]).await {
            Ok(intent) => Ok(Some(intent)),
            Err(e) if e.is_not_found() => {
                debug!("Intent not found");
                Ok(None)
            },
            Err(e) => Err(e),
        }
    }

    /// Submit an intent. The controller creates it or replaces the intent
    /// with the same app id and key.
    #[instrument(skip(self, intent), fields(app_id = %intent.app_id, key = %intent.key))]
    pub async fn submit_intent(&self, intent: &Intent) -> Result<(), ProviderError> {
        let url = self.endpoint(&["intents"])?;
        let request = self.request(Method::POST, url)?.json(intent);
        check_status(request.send().await?).await?;
        Ok(())
    }

    /// Withdraw and remove an intent.
    #[instrument(skip(self))]
    pub async fn delete_intent(&self, app_id: &str, key: &str) -> Result<(), ProviderError> {
        let url = self.endpoint(&["intents", app_id, key])?;
        let request = self.request(Method::DELETE, url)?;
        check_status(request.send().await?).await?;
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ProviderError> {
        let url = self.endpoint(segments)?;
        let response = check_status(self.request(Method::GET, url)?.send().await?).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn request(&self, method: Method, url: Url) -> Result<reqwest::RequestBuilder, ProviderError> {
        if self.is_shut_down() {
            return Err(ProviderError::Unavailable(
                "provider is shutting down".to_string(),
            ));
        }
        debug!(%method, %url, "ONOS request");
        Ok(self
            .http
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password)))
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ProviderError::Configuration(format!("{} cannot be a base URL", self.base_url))
            })?
            .extend(segments);
        Ok(url)
    }
}

async fn check_status(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    debug!(status = status.as_u16(), "ONOS response");
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::from_status(status, body))
}

fn api_base_url(host: &str) -> Result<Url, ProviderError> {
    let trimmed = host.trim().trim_end_matches('/');
    let full = if trimmed.ends_with(API_PREFIX) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, API_PREFIX)
    };

    let url = Url::parse(&full)
        .map_err(|e| ProviderError::Configuration(format!("invalid ONOS host {:?}: {}", host, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ProviderError::Configuration(format!(
            "invalid ONOS host {:?}: expected an http:// or https:// URL",
            host
        )));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(host: &str) -> ClientSettings {
        ClientSettings {
            host: host.to_string(),
            username: "onos".to_string(),
            password: "rocks".to_string(),
        }
    }

    async fn client_for(server: &MockServer) -> OnosClient {
        OnosClient::new(&settings(&server.uri())).unwrap()
    }

    #[test]
    fn test_base_url_normalization() {
        for host in [
            "http://localhost:8181",
            "http://localhost:8181/",
            "http://localhost:8181/onos/v1",
            "http://localhost:8181/onos/v1/",
        ] {
            let url = assert_ok!(api_base_url(host));
            assert_eq!(url.as_str(), "http://localhost:8181/onos/v1", "host {host}");
        }
    }

    #[test]
    fn test_base_url_rejects_non_http() {
        assert_err!(api_base_url("localhost:8181"));
        assert_err!(api_base_url("ftp://onos"));
        assert_err!(api_base_url(""));
    }

    #[test]
    fn test_endpoint_escapes_segments() {
        let client = OnosClient::new(&settings("http://onos:8181")).unwrap();
        let url = client.endpoint(&["intents", "org.onosproject.cli", "a/b"]).unwrap();
        assert_eq!(url.as_str(), "http://onos:8181/onos/v1/intents/org.onosproject.cli/a%2Fb");
    }

    #[test]
    fn test_settings_debug_redacts_password() {
        let rendered = format!("{:?}", settings("http://onos:8181"));
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("rocks"));
    }

    #[tokio::test]
    async fn test_get_hosts_uses_basic_auth() {
        let server = MockServer::start().await;
        // base64("onos:rocks")
        Mock::given(method("GET"))
            .and(path("/onos/v1/hosts"))
            .and(header("authorization", "Basic b25vczpyb2Nrcw=="))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "hosts": [{"id": "00:00:00:00:00:03/None", "ipAddresses": ["10.0.0.3"]}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let hosts = client_for(&server).await.get_hosts().await.unwrap();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].ip_addresses, vec!["10.0.0.3"]);
    }

    #[tokio::test]
    async fn test_malformed_body_is_serialization_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/onos/v1/flows"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"flows\": ["))
            .mount(&server)
            .await;

        let err = client_for(&server).await.get_flows().await.unwrap_err();
        assert!(matches!(err, ProviderError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_error_status_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/onos/v1/flows"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/onos/v1/hosts"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(matches!(
            client.get_flows().await,
            Err(ProviderError::PermissionDenied(_))
        ));
        assert!(matches!(
            client.get_hosts().await,
            Err(ProviderError::Api { status: 500, ref message }) if message == "boom"
        ));
    }

    #[tokio::test]
    async fn test_get_intent_not_found_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/onos/v1/intents/org.onosproject.cli/0x1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let intent = client_for(&server)
            .await
            .get_intent("org.onosproject.cli", "0x1")
            .await
            .unwrap();
        assert!(intent.is_none());
    }

    #[tokio::test]
    async fn test_submit_and_delete_intent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/onos/v1/intents"))
            .and(body_json(serde_json::json!({
                "type": "HostToHostIntent",
                "appId": "org.onosproject.cli",
                "key": "0x99999",
                "priority": 100
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/onos/v1/intents/org.onosproject.cli/0x99999"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let intent = Intent {
            kind: "HostToHostIntent".to_string(),
            app_id: "org.onosproject.cli".to_string(),
            key: "0x99999".to_string(),
            priority: Some(100),
            ..Default::default()
        };
        assert_ok!(client.submit_intent(&intent).await);
        assert_ok!(client.delete_intent("org.onosproject.cli", "0x99999").await);
    }

    #[tokio::test]
    async fn test_shutdown_fails_fast() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"hosts": []})),
            )
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client.shutdown();
        assert!(client.is_shut_down());
        assert!(matches!(
            client.get_hosts().await,
            Err(ProviderError::Unavailable(_))
        ));
    }
}
