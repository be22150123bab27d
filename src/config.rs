//! Provider configuration.
//!
//! The practitioner may set `host`, `username` and `password` in the
//! provider block; each falls back to its `ONOS_*` environment variable.
//! An explicit value always wins, even an empty one.

use serde::Deserialize;
use serde_json::Value;

use crate::client::ClientSettings;
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::value::Attr;

/// Environment variable for the controller URL.
pub const HOST_ENV: &str = "ONOS_HOST";
/// Environment variable for the API user.
pub const USERNAME_ENV: &str = "ONOS_USERNAME";
/// Environment variable for the API password.
pub const PASSWORD_ENV: &str = "ONOS_PASSWORD";

/// The provider block as written by the practitioner.
#[derive(Clone, Default, PartialEq, Deserialize)]
pub struct ProviderConfig {
    /// Controller URL.
    #[serde(default)]
    pub host: Attr<String>,
    /// API user.
    #[serde(default)]
    pub username: Attr<String>,
    /// API password.
    #[serde(default)]
    pub password: Attr<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let password = match self.password {
            Attr::Known(_) => "<redacted>",
            Attr::Unknown => "<unknown>",
            Attr::Null => "<null>",
        };
        f.debug_struct("ProviderConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &password)
            .finish()
    }
}

struct Setting<'a> {
    attribute: &'static str,
    label: &'static str,
    env: &'static str,
    value: &'a Attr<String>,
}

impl ProviderConfig {
    /// Schema of the provider block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description("Connection settings for an ONOS controller")
            .with_attribute(
                "host",
                Attribute::optional_string().with_description(
                    "Controller URL, e.g. http://localhost:8181. Defaults to ONOS_HOST.",
                ),
            )
            .with_attribute(
                "username",
                Attribute::optional_string()
                    .with_description("API user. Defaults to ONOS_USERNAME."),
            )
            .with_attribute(
                "password",
                Attribute::optional_string()
                    .sensitive()
                    .with_description("API password. Defaults to ONOS_PASSWORD."),
            )
    }

    /// Parse the provider block; a missing block is an empty configuration.
    pub fn from_value(value: Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Resolve against the process environment.
    pub fn resolve(&self) -> Result<ClientSettings, Vec<Diagnostic>> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve with `lookup` standing in for the environment.
    ///
    /// Unknown values are reported first and stop resolution. Otherwise every
    /// setting that ends up empty gets its own diagnostic.
    pub fn resolve_with<F>(&self, lookup: F) -> Result<ClientSettings, Vec<Diagnostic>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings = self.settings();

        let unknown: Vec<Diagnostic> = settings
            .iter()
            .filter(|s| s.value.is_unknown())
            .map(|s| {
                Diagnostic::error(format!("Unknown ONOS API {}", s.label))
                    .with_detail(format!(
                        "The provider cannot create the ONOS API client as there is an unknown \
                         configuration value for the ONOS API {}. Either apply the source of the \
                         value first, set the value statically in the configuration, or use the \
                         {} environment variable.",
                        s.attribute, s.env
                    ))
                    .with_attribute(s.attribute)
            })
            .collect();
        if !unknown.is_empty() {
            return Err(unknown);
        }

        let mut diagnostics = Vec::new();
        let mut resolve = |setting: &Setting<'_>| -> String {
            let value = match setting.value.known() {
                Some(explicit) => explicit.clone(),
                None => lookup(setting.env).unwrap_or_default(),
            };
            if value.is_empty() {
                diagnostics.push(
                    Diagnostic::error(format!("Missing ONOS API {}", setting.label))
                        .with_detail(format!(
                            "The provider cannot create the ONOS API client as there is a missing \
                             or empty value for the ONOS API {}. Set the {} value in the \
                             configuration or use the {} environment variable. If either is \
                             already set, ensure the value is not empty.",
                            setting.attribute, setting.attribute, setting.env
                        ))
                        .with_attribute(setting.attribute),
                );
            }
            value
        };
        let [host, username, password] = &settings;
        let resolved = ClientSettings {
            host: resolve(host),
            username: resolve(username),
            password: resolve(password),
        };

        if diagnostics.is_empty() {
            Ok(resolved)
        } else {
            Err(diagnostics)
        }
    }

    fn settings(&self) -> [Setting<'_>; 3] {
        [
            Setting {
                attribute: "host",
                label: "Host",
                env: HOST_ENV,
                value: &self.host,
            },
            Setting {
                attribute: "username",
                label: "Username",
                env: USERNAME_ENV,
                value: &self.username,
            },
            Setting {
                attribute: "password",
                label: "Password",
                env: PASSWORD_ENV,
                value: &self.password,
            },
        ]
    }
}
