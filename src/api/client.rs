//! Scaleway Client
//!
//! Combines the HTTP client with the resolution cache. Every successful read
//! warms the cache as a side effect.

use super::error::ApiError;
use super::http::ScalewayHttpClient;
use super::resolve::{self, ListSource};
use super::types::{
    Bootscript, Image, Resource, Server, ServerAction, ServerActionRequest, ServerDefinition,
    Snapshot,
};
use crate::cache::{Cache, CacheError, CacheStore, ResourceKind};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeSet;

/// Pull `key` out of a JSON envelope such as `{"servers": [...]}`
fn take_field<T: DeserializeOwned>(
    http: &ScalewayHttpClient,
    path: &str,
    body: Value,
    key: &str,
) -> Result<T, ApiError> {
    let decode_err = |source| ApiError::Decode {
        url: http.url(path),
        source,
    };

    let mut envelope: serde_json::Map<String, Value> =
        serde_json::from_value(body).map_err(decode_err)?;
    serde_json::from_value(envelope.remove(key).unwrap_or(Value::Null)).map_err(decode_err)
}

/// List a collection and record every item in `cache`
pub async fn fetch_list<R: Resource>(
    http: &ScalewayHttpClient,
    cache: &mut Cache,
    query: &[(&str, &str)],
) -> Result<Vec<R>, ApiError> {
    let path = R::KIND.collection();
    let body = http.get(path, query).await?;
    let items: Option<Vec<R>> = take_field(http, path, body, R::KIND.collection())?;
    let items = items.unwrap_or_default();

    for item in &items {
        cache.insert(R::KIND, item.identifier(), item.name());
    }

    tracing::debug!("Listed {} {}", items.len(), path);
    Ok(items)
}

/// Fetch one resource by identifier and record it in `cache`
pub async fn fetch_one<R: Resource>(
    http: &ScalewayHttpClient,
    cache: &mut Cache,
    id: &str,
) -> Result<R, ApiError> {
    let path = format!("{}/{}", R::KIND.collection(), id);
    let body = http.get(&path, &[]).await?;
    let item: R = take_field(http, &path, body, R::KIND.singular())?;

    cache.insert(R::KIND, item.identifier(), item.name());
    Ok(item)
}

impl ListSource for ScalewayHttpClient {
    async fn refresh(&self, kind: ResourceKind, cache: &mut Cache) -> Result<(), ApiError> {
        match kind {
            ResourceKind::Server => {
                fetch_list::<Server>(self, cache, &[]).await?;
            }
            ResourceKind::Image => {
                fetch_list::<Image>(self, cache, &[]).await?;
            }
            ResourceKind::Snapshot => {
                fetch_list::<Snapshot>(self, cache, &[]).await?;
            }
            ResourceKind::Bootscript => {
                fetch_list::<Bootscript>(self, cache, &[]).await?;
            }
        }
        Ok(())
    }
}

/// Main Scaleway client; owns the cache for the whole invocation
pub struct ScalewayClient {
    http: ScalewayHttpClient,
    organization: String,
    cache: Cache,
    store: CacheStore,
}

impl ScalewayClient {
    /// Create a client and load the cache matching `endpoint`
    pub fn new(
        endpoint: &str,
        organization: &str,
        token: &str,
        store: CacheStore,
    ) -> Result<Self, ApiError> {
        let http = ScalewayHttpClient::new(endpoint, token)?;
        let cache = store.load(endpoint);

        Ok(Self {
            http,
            organization: organization.to_string(),
            cache,
            store,
        })
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// List servers. Only running ones unless `all`; `limit` 0 means no limit.
    pub async fn list_servers(&mut self, all: bool, limit: usize) -> Result<Vec<Server>, ApiError> {
        let query: &[(&str, &str)] = if all { &[] } else { &[("state", "running")] };
        let mut servers = fetch_list::<Server>(&self.http, &mut self.cache, query).await?;

        // The API has no paging parameter; truncate after caching everything
        if limit > 0 && limit < servers.len() {
            servers.truncate(limit);
        }
        Ok(servers)
    }

    pub async fn list_images(&mut self) -> Result<Vec<Image>, ApiError> {
        fetch_list(&self.http, &mut self.cache, &[]).await
    }

    pub async fn list_snapshots(&mut self) -> Result<Vec<Snapshot>, ApiError> {
        fetch_list(&self.http, &mut self.cache, &[]).await
    }

    pub async fn list_bootscripts(&mut self) -> Result<Vec<Bootscript>, ApiError> {
        fetch_list(&self.http, &mut self.cache, &[]).await
    }

    // =========================================================================
    // Single resources
    // =========================================================================

    pub async fn get_server(&mut self, id: &str) -> Result<Server, ApiError> {
        fetch_one(&self.http, &mut self.cache, id).await
    }

    pub async fn get_image(&mut self, id: &str) -> Result<Image, ApiError> {
        fetch_one(&self.http, &mut self.cache, id).await
    }

    pub async fn get_snapshot(&mut self, id: &str) -> Result<Snapshot, ApiError> {
        fetch_one(&self.http, &mut self.cache, id).await
    }

    pub async fn get_bootscript(&mut self, id: &str) -> Result<Bootscript, ApiError> {
        fetch_one(&self.http, &mut self.cache, id).await
    }

    /// Fetch any resource as JSON, for display
    pub async fn inspect(&mut self, kind: ResourceKind, id: &str) -> Result<Value, ApiError> {
        let value = match kind {
            ResourceKind::Server => serde_json::to_value(self.get_server(id).await?),
            ResourceKind::Image => serde_json::to_value(self.get_image(id).await?),
            ResourceKind::Snapshot => serde_json::to_value(self.get_snapshot(id).await?),
            ResourceKind::Bootscript => serde_json::to_value(self.get_bootscript(id).await?),
        };
        value.map_err(ApiError::Encode)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a server and return its identifier
    pub async fn create_server(&mut self, mut definition: ServerDefinition) -> Result<String, ApiError> {
        definition.organization = self.organization.clone();

        let body = self.http.post("servers", &definition).await?;
        let server: Server = take_field(&self.http, "servers", body, "server")?;

        self.cache
            .insert(ResourceKind::Server, server.identifier(), server.name());
        tracing::info!("Created server {} ({})", server.id, server.name);
        Ok(server.id)
    }

    /// Post a power action on a server
    pub async fn server_action(&self, id: &str, action: ServerAction) -> Result<(), ApiError> {
        let path = format!("servers/{}/action", id);
        self.http
            .post(&path, &ServerActionRequest { action })
            .await?;
        tracing::info!("Posted {:?} on server {}", action, id);
        Ok(())
    }

    // =========================================================================
    // Resolution and persistence
    // =========================================================================

    /// Every identifier of `kind` matching `needle`, refreshing once on a miss
    pub async fn resolve(
        &mut self,
        kind: ResourceKind,
        needle: &str,
    ) -> Result<BTreeSet<String>, ApiError> {
        resolve::resolve(&self.http, &mut self.cache, kind, needle).await
    }

    /// Flush the cache to disk if anything changed
    pub fn sync(&mut self) -> Result<(), CacheError> {
        if !self.cache.is_dirty() {
            tracing::debug!("Cache unchanged, nothing to save");
            return Ok(());
        }
        self.store.save(&mut self.cache)
    }
}
