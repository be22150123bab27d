//! `provider-onos`: serves the ONOS provider to a Hemmer host.

use onos_provider::{init_logging, serve, OnosProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting ONOS provider");
    serve(OnosProvider::new(env!("CARGO_PKG_VERSION"))).await
}
