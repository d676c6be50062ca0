//! Name resolution with refresh-on-miss
//!
//! Query the cache; on an empty result, list the kind once from the API
//! (warming the cache) and query again. The second answer is final.

use super::error::ApiError;
use crate::cache::{Cache, ResourceKind};
use std::collections::BTreeSet;

/// Something that can repopulate the cache for one resource kind
#[allow(async_fn_in_trait)]
pub trait ListSource {
    /// List every resource of `kind`, inserting each into `cache`
    async fn refresh(&self, kind: ResourceKind, cache: &mut Cache) -> Result<(), ApiError>;
}

/// Resolve `needle` to every matching identifier of `kind`.
///
/// Makes at most one remote listing, and only when the cache has no match.
/// An empty set means "not found"; deciding what to do with zero or several
/// matches is up to the caller.
pub async fn resolve<S: ListSource>(
    source: &S,
    cache: &mut Cache,
    kind: ResourceKind,
    needle: &str,
) -> Result<BTreeSet<String>, ApiError> {
    let cached = cache.lookup(kind, needle);
    if !cached.is_empty() {
        tracing::debug!("resolve {} '{}': {} cached match(es)", kind, needle, cached.len());
        return Ok(cached);
    }

    tracing::debug!("resolve {} '{}': cache miss, refreshing", kind, needle);
    source.refresh(kind, cache).await?;

    Ok(cache.lookup(kind, needle))
}
