//! m3ter provider
//!
//! This crate manages m3ter billing and metering entities declaratively. It
//! exposes a [`provider::M3terProvider`] front object that a host embeds:
//! the host configures it once with credentials, then drives create, read,
//! update, delete, import, and data source lookups by resource type name,
//! with entity state carried as JSON documents.
//!
//! # Overview
//!
//! The crate provides:
//!
//! - **Provider**: the [`M3terProvider`] registry and dispatcher
//! - **Resources**: products, plans, meters, aggregations, pricings,
//!   notifications, webhook destinations, and the organization config
//! - **Data sources**: read-only product and aggregation lookups
//! - **Schema types**: attribute schemas with validation constraints
//! - **Client**: an authenticated, rate-limited m3ter REST client
//! - **Logging**: `tracing` setup writing to stderr
//!
//! # Quick Start
//!
//! ```no_run
//! use m3ter_provider::{init_logging, M3terProvider};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!
//!     let mut provider = M3terProvider::builtin();
//!     provider.configure(&json!({
//!         "organization_id": "my-org",
//!         "access_key": "key",
//!         "secret_key": "secret"
//!     }))?;
//!
//!     let state = provider
//!         .create("m3ter_product", &json!({
//!             "name": "Storage",
//!             "code": "storage",
//!             "custom_fields": {}
//!         }))
//!         .await?;
//!     println!("created product {}", state["id"]);
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! Credentials can be set as provider attributes or through the
//! `M3TER_ORGANIZATION_ID`, `M3TER_ACCESS_KEY`, and `M3TER_SECRET_KEY`
//! environment variables. The client authenticates with OAuth2 client
//! credentials and paces requests to stay inside the API rate limit.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod crud;
pub mod data_sources;
pub mod error;
pub mod logging;
pub mod mapper;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod validation;
pub mod value;

// Re-export main types at crate root
pub use client::{Client, ClientConfig};
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::{
    M3terProvider, ProviderConfig, ProviderDataSource, ProviderMetadata, ProviderResource,
};
pub use schema::{Diagnostic, Diagnostics, ProviderSchema, Schema};
pub use validation::{is_valid, validate, validate_result};
pub use value::Value;

// Re-export async_trait for implementing resource traits downstream
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
