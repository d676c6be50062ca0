//! Integration tests for the Scaleway client using wiremock
//!
//! These tests drive the real HTTP client against mocked endpoints and check
//! both the API behavior and how the resolution cache is warmed and used.

use scw::api::{ApiError, ScalewayClient, ServerAction, ServerDefinition};
use scw::cache::{CacheStore, ResourceKind};
use serde_json::json;
use std::collections::BTreeSet;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ids(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn servers_body() -> serde_json::Value {
    json!({
        "servers": [
            {"id": "abc", "name": "web-1", "state": "running",
             "public_ip": {"address": "212.47.0.1"},
             "image": {"id": "img-1", "name": "Ubuntu Trusty"}},
            {"id": "def", "name": "db-1", "state": "stopped", "public_ip": null}
        ]
    })
}

fn client_for(server: &MockServer, dir: &TempDir) -> ScalewayClient {
    ScalewayClient::new(
        &server.uri(),
        "org-1",
        "test-token",
        CacheStore::new(dir.path().join("cache.json")),
    )
    .expect("client should build")
}

/// Test module for listing and fetching
mod fetch_tests {
    use super::*;

    /// Listing sends the auth header and warms the cache
    #[tokio::test]
    async fn test_list_servers_warms_cache() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/servers"))
            .and(header("X-Auth-Token", "test-token"))
            .and(header("Content-Type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(servers_body()))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client_for(&server, &dir);
        let servers = client.list_servers(true, 0).await.expect("listing should succeed");

        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].image.name, "Ubuntu Trusty");
        assert_eq!(
            client.cache().lookup(ResourceKind::Server, ""),
            ids(&["abc", "def"])
        );
        assert!(client.cache().is_dirty());
    }

    /// Running-only listing adds the state filter; limit truncates after caching
    #[tokio::test]
    async fn test_list_running_servers_with_limit() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/servers"))
            .and(query_param("state", "running"))
            .respond_with(ResponseTemplate::new(200).set_body_json(servers_body()))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client_for(&server, &dir);
        let servers = client.list_servers(false, 1).await.unwrap();

        assert_eq!(servers.len(), 1);
        assert_eq!(client.cache().lookup(ResourceKind::Server, "db").len(), 1);
    }

    /// Single fetch updates a renamed resource in place
    #[tokio::test]
    async fn test_get_image_updates_cache() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/images"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "images": [{"id": "img-1", "name": "old-name"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/images/img-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "image": {"id": "img-1", "name": "new-name",
                          "root_volume": {"id": "vol-1", "size": 20000000000i64}}
            })))
            .mount(&server)
            .await;

        let mut client = client_for(&server, &dir);
        client.list_images().await.unwrap();
        let image = client.get_image("img-1").await.unwrap();

        assert_eq!(image.root_volume.size, 20_000_000_000);
        let index = client.cache().index(ResourceKind::Image);
        assert_eq!(index.len(), 1);
        assert_eq!(index.name_of("img-1"), Some("new-name"));
    }

    /// Bootscripts are cached under their title
    #[tokio::test]
    async fn test_bootscripts_cached_by_title() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/bootscripts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "bootscripts": [{"id": "b1", "title": "Linux 3.19 docker"}]
            })))
            .mount(&server)
            .await;

        let mut client = client_for(&server, &dir);
        client.list_bootscripts().await.unwrap();
        assert_eq!(
            client.cache().lookup(ResourceKind::Bootscript, "docker"),
            ids(&["b1"])
        );
    }

    /// A listing without its envelope key is an empty listing
    #[tokio::test]
    async fn test_missing_envelope_is_empty_list() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/snapshots"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let mut client = client_for(&server, &dir);
        assert!(client.list_snapshots().await.unwrap().is_empty());
    }
}

/// Test module for error mapping
mod error_tests {
    use super::*;

    #[tokio::test]
    async fn test_remote_error_keeps_api_message() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/servers/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "message": "\"missing\" not found",
                "type": "unknown_resource"
            })))
            .mount(&server)
            .await;

        let mut client = client_for(&server, &dir);
        let err = client.get_server("missing").await.unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "\"missing\" not found");
        assert!(client.cache().is_empty());
    }

    #[tokio::test]
    async fn test_remote_error_without_body() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/images"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut client = client_for(&server, &dir);
        let err = client.list_images().await.unwrap_err();
        assert_eq!(err.to_string(), "invalid return code, got 500");
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/servers"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"servers\": 42}"))
            .mount(&server)
            .await;

        let mut client = client_for(&server, &dir);
        let err = client.list_servers(true, 0).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let dir = TempDir::new().unwrap();
        let mut client = ScalewayClient::new(
            "http://127.0.0.1:1",
            "org-1",
            "test-token",
            CacheStore::new(dir.path().join("cache.json")),
        )
        .unwrap();

        let err = client.list_images().await.unwrap_err();
        assert!(matches!(err, ApiError::Transport { .. }), "got {err:?}");
    }
}

/// Test module for the resolve-with-refresh protocol
mod resolve_tests {
    use super::*;

    /// Cold cache: one listing, both entries cached, one match
    #[tokio::test]
    async fn test_cold_resolve_lists_once() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/servers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "servers": [
                    {"id": "abc", "name": "web-1"},
                    {"id": "def", "name": "db-1"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client_for(&server, &dir);
        let found = client.resolve(ResourceKind::Server, "web").await.unwrap();

        assert_eq!(found, ids(&["abc"]));
        assert_eq!(
            client.cache().lookup(ResourceKind::Server, ""),
            ids(&["abc", "def"])
        );
    }

    /// Null fields in listed items do not prevent resolution
    #[tokio::test]
    async fn test_resolve_with_null_fields() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/servers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "servers": [
                    {"id": "abc", "name": "web-1", "image": null, "state": null},
                    {"id": "def", "name": "db-1", "state": null, "public_ip": null}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client_for(&server, &dir);
        let found = client.resolve(ResourceKind::Server, "web").await.unwrap();

        assert_eq!(found, ids(&["abc"]));
        assert_eq!(
            client.cache().lookup(ResourceKind::Server, ""),
            ids(&["abc", "def"])
        );
    }

    /// Warm cache: the API is not consulted, even when it is failing
    #[tokio::test]
    async fn test_warm_resolve_skips_remote() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/servers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "servers": [
                    {"id": "abc", "name": "web-1"},
                    {"id": "def", "name": "db-1"}
                ]
            })))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/servers"))
            .respond_with(ResponseTemplate::new(503))
            .expect(0)
            .mount(&server)
            .await;

        let mut client = client_for(&server, &dir);
        assert_eq!(
            client.resolve(ResourceKind::Server, "web").await.unwrap(),
            ids(&["abc"])
        );
        assert_eq!(
            client.resolve(ResourceKind::Server, "web").await.unwrap(),
            ids(&["abc"])
        );
    }

    /// Miss after refresh is an empty set, not an error
    #[tokio::test]
    async fn test_unknown_name_resolves_to_empty() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/servers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "servers": [
                    {"id": "abc", "name": "web-1"},
                    {"id": "def", "name": "db-1"}
                ]
            })))
            .expect(2)
            .mount(&server)
            .await;

        let mut client = client_for(&server, &dir);
        client.resolve(ResourceKind::Server, "web").await.unwrap();

        let found = client.resolve(ResourceKind::Server, "zzz").await.unwrap();
        assert!(found.is_empty());
    }

    /// A refresh failure propagates unchanged
    #[tokio::test]
    async fn test_refresh_failure_propagates() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/snapshots"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "message": "Authentication error",
                "type": "denied_authentication"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client_for(&server, &dir);
        let err = client
            .resolve(ResourceKind::Snapshot, "nightly")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(401));
    }

    /// A cache persisted by one invocation serves the next one offline
    #[tokio::test]
    async fn test_synced_cache_serves_next_invocation() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/images"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "images": [{"id": "img-1", "name": "Ubuntu Trusty"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut first = client_for(&server, &dir);
        first.list_images().await.unwrap();
        first.sync().expect("sync should succeed");

        let mut second = client_for(&server, &dir);
        assert!(!second.cache().is_dirty());
        assert_eq!(
            second.resolve(ResourceKind::Image, "Trusty").await.unwrap(),
            ids(&["img-1"])
        );
    }

    /// A cache built for another endpoint is not reused
    #[tokio::test]
    async fn test_cache_from_other_endpoint_is_discarded() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path().join("cache.json"));

        let mut cache = scw::cache::Cache::new("https://a.example.com");
        cache.insert(ResourceKind::Server, "abc", "web-1");
        store.save(&mut cache).unwrap();

        let server = MockServer::start().await;
        let client = client_for(&server, &dir);
        assert!(client.cache().is_empty());
        assert_eq!(client.cache().endpoint(), server.uri());
    }
}

/// Test module for mutations
mod mutation_tests {
    use super::*;

    /// Creation stamps the organization and caches the new server
    #[tokio::test]
    async fn test_create_server_caches_result() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("POST"))
            .and(path("/servers"))
            .and(body_json(json!({
                "name": "web-2",
                "image": "img-1",
                "bootscript": null,
                "organization": "org-1"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "server": {"id": "new-id", "name": "web-2", "state": "stopped"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client_for(&server, &dir);
        let id = client
            .create_server(ServerDefinition {
                name: "web-2".to_string(),
                image: "img-1".to_string(),
                ..ServerDefinition::default()
            })
            .await
            .unwrap();

        assert_eq!(id, "new-id");
        // Resolvable without a listing
        assert_eq!(
            client.resolve(ResourceKind::Server, "web-2").await.unwrap(),
            ids(&["new-id"])
        );
    }

    /// Actions accept an empty 202 response
    #[tokio::test]
    async fn test_server_action() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("POST"))
            .and(path("/servers/abc/action"))
            .and(body_json(json!({"action": "reboot"})))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, &dir);
        client
            .server_action("abc", ServerAction::Reboot)
            .await
            .expect("action should succeed");
    }

    /// Rejected actions surface the API's message
    #[tokio::test]
    async fn test_server_action_rejected() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("POST"))
            .and(path("/servers/abc/action"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "message": "server should be stopped",
                "type": "invalid_request_error"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, &dir);
        let err = client
            .server_action("abc", ServerAction::Poweron)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "server should be stopped");
    }
}

/// Test module for the command layer's ambiguity policy
mod command_tests {
    use super::*;
    use scw::commands::resolve_one;

    #[tokio::test]
    async fn test_resolve_one_policies() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/servers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "servers": [
                    {"id": "abc", "name": "web-1"},
                    {"id": "abd", "name": "web-2"}
                ]
            })))
            .mount(&server)
            .await;

        let mut client = client_for(&server, &dir);

        let id = resolve_one(&mut client, ResourceKind::Server, "web-2")
            .await
            .unwrap();
        assert_eq!(id, "abd");

        let err = resolve_one(&mut client, ResourceKind::Server, "web")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Too many candidates"));
        assert!(err.to_string().contains("abc web-1"));

        let err = resolve_one(&mut client, ResourceKind::Server, "nope")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No such server: nope");
    }
}
