//! Client for the external fulfillment provider's order status API.

pub mod client;

pub use client::{HttpProviderClient, ProviderConfig, STATUS_PATH};
