//! Managed resources.

pub mod intent;

pub use intent::IntentResource;
