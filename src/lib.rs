//! Aidbox Provider
//!
//! This crate manages Aidbox licenses as infrastructure. It exposes a single
//! resource type, `aidbox_license`, backed by the Aidbox portal's YAML RPC
//! endpoint.
//!
//! # Overview
//!
//! The crate provides:
//!
//! - **RPC client**: [`LicenseClient`] and its HTTP implementation [`HttpClient`]
//! - **Resource adapter**: [`LicenseResource`] mapping lifecycle calls onto the client
//! - **ProviderService trait**: the lifecycle a host drives, implemented by [`AidboxProvider`]
//! - **Schema types**: descriptions of the provider config and the license resource
//! - **Error types**: one enum per layer
//! - **Logging**: integration with `tracing` for structured logging
//!
//! # Quick Start
//!
//! ```ignore
//! use aidbox_provider::{init_logging, AidboxProvider, ProviderService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!
//!     let provider = AidboxProvider::new(env!("CARGO_PKG_VERSION"));
//!     provider.configure(json!({"token": "..."})).await?;
//!
//!     let plan = provider
//!         .plan("aidbox_license", None, json!({"name": "dev", "type": "development"}), json!({}))
//!         .await?;
//!     let state = provider.create("aidbox_license", plan.planned_state).await?;
//!     println!("issued license {}", state["id"]);
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! - `endpoint`: RPC endpoint, defaults to `https://aidbox.app/rpc`
//! - `token`: API token, falls back to the `AIDBOX_API_TOKEN` environment variable
//!
//! # License Lifecycle
//!
//! Licenses cannot be modified in place. Changing `name`, `product` or `type`
//! plans a replacement. Reading a license the portal no longer shows yields
//! `None`, which tells the host to drop it from state.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use client::{is_not_found, HttpClient, LicenseClient};
pub use config::{EnvLookup, ProcessEnv, ProviderConfig, ResolvedConfig};
pub use error::{ClientError, ProviderError};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::{AidboxProvider, ProviderService, PROVIDER_TYPE_NAME};
pub use resource::{LicenseModel, LicenseResource, DEFAULT_PRODUCT, LICENSE_RESOURCE};
pub use schema::ProviderSchema;
pub use types::{
    AttributeChange, ImportedResource, License, LicenseResponse, PlanResult, ProviderMetadata,
};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
