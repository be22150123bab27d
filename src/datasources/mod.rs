//! Read-only data sources over controller collections.

pub mod flows;
pub mod hosts;

pub use flows::FlowsDataSource;
pub use hosts::HostsDataSource;

/// Identifier of collection data sources, which have no natural id.
pub const PLACEHOLDER_ID: &str = "placeholder";
