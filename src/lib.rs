//! ONOS provider
//!
//! A Hemmer provider plugin for the [ONOS](https://opennetworking.org/onos/)
//! SDN controller. It serves the `hemmer.provider.v1` gRPC protocol and
//! exposes the controller's REST API as:
//!
//! - **`onos_flows`** (data source): every flow rule, with its selector
//!   criteria and treatment instructions
//! - **`onos_hosts`** (data source): every discovered end-station, with its
//!   IP addresses and attachment points
//! - **`onos_intent`** (resource): a host-to-host intent keyed by
//!   `appid,key`, importable by that identifier
//!
//! # Configuration
//!
//! ```text
//! provider "onos" {
//!   host     = "http://localhost:8181"   # or ONOS_HOST
//!   username = "onos"                    # or ONOS_USERNAME
//!   password = "rocks"                   # or ONOS_PASSWORD
//! }
//! ```
//!
//! An explicit value always wins over the environment. Every setting that
//! ends up empty is reported as its own diagnostic.
//!
//! # Handshake Protocol
//!
//! When the provider starts via [`serve`], it writes a handshake line to
//! stdout:
//!
//! ```text
//! HEMMER_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `HEMMER_PROVIDER|<protocol_version>|<address>`. Logs go to stderr.
//!
//! # Layout
//!
//! - [`client`]: REST client and wire types
//! - [`datasources`] / [`resources`]: adapters mapping wire types to state
//! - [`provider`]: the provider root implementing [`ProviderService`]
//! - [`server`]: the gRPC wrapper, handshake and shutdown handling
//! - [`schema`], [`validation`], [`plan`], [`value`]: the state model

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod client;
pub mod config;
pub mod datasources;
pub mod error;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;
pub mod value;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

pub use adapter::{DataSource, ImportState, Resource};
pub use client::{ClientSettings, OnosClient};
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use logging::{init_logging, try_init_logging_with_default};
pub use provider::OnosProvider;
pub use schema::ProviderSchema;
pub use server::{serve, serve_with_options, ProviderService, ServeOptions};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
pub use validation::{is_valid, validate, validate_result};
pub use value::{Attr, SetValue, UNKNOWN_VALUE};
