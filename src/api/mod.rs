//! Scaleway API interaction module
//!
//! # Module Structure
//!
//! - [`client`] - Main client: listing, fetching, mutations, cache warming
//! - [`http`] - HTTP utilities for REST API calls
//! - [`resolve`] - Name resolution with a single refresh on cache miss
//! - [`types`] - Resource payloads
//! - [`error`] - Transport, decode and remote errors
//!
//! # Example
//!
//! ```ignore
//! use scw::api::ScalewayClient;
//! use scw::cache::{CacheStore, ResourceKind};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let mut client = ScalewayClient::new(
//!         "https://api.cloud.online.net",
//!         "my-org",
//!         "my-token",
//!         CacheStore::default(),
//!     )?;
//!     let ids = client.resolve(ResourceKind::Server, "web").await?;
//!     client.sync()?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod http;
pub mod resolve;
pub mod types;

pub use client::ScalewayClient;
pub use error::ApiError;
pub use types::{ServerAction, ServerDefinition};
