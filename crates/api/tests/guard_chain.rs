//! Black-box tests for the authorization chain and credential cache.
//!
//! The app is built exactly as in prod but against the in-memory claims
//! store, bound to an ephemeral port, and driven over HTTP with minted
//! session tokens.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use reqwest::StatusCode;
use serde_json::json;

use clavis_api::app::build_app;
use clavis_api::config::{AppConfig, ProviderCredentials, ProviderId, RunMode};
use clavis_api::middleware::SESSION_TOKEN_HEADER;
use clavis_api::session::TokenCodec;
use clavis_auth::{Role, SessionClaims, normalize_scopes};
use clavis_core::UserId;
use clavis_infra::{ClaimsStore, InMemoryClaimsStore, memory::UserRecord};

const SECRET: &str = "black-box-test-secret";

fn test_config(refresh_interval_ms: u64) -> AppConfig {
    AppConfig {
        run_mode: RunMode::Development,
        bind_addr: "127.0.0.1:0".to_string(),
        database_url: "postgres://localhost/unused".to_string(),
        auth_secret: SECRET.to_string(),
        claims_refresh_interval_ms: refresh_interval_ms,
        session_max_age_secs: 3600,
        session_update_age_secs: 600,
        github: Some(ProviderCredentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
        }),
        google: None,
        default_provider: ProviderId::Github,
        trust_proxy_headers: false,
    }
}

struct TestServer {
    base_url: String,
    store: Arc<InMemoryClaimsStore>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(refresh_interval_ms: u64) -> Self {
        let store = Arc::new(InMemoryClaimsStore::new());
        let app = build_app(
            test_config(refresh_interval_ms),
            Arc::clone(&store) as Arc<dyn ClaimsStore>,
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            store,
            handle,
        }
    }

    async fn insert_user(&self, role: Role, scopes: &[&str], token_version: u64) -> UserId {
        let user_id = UserId::new();
        self.store
            .insert(
                user_id,
                UserRecord {
                    role,
                    scopes: normalize_scopes(scopes.iter().copied()),
                    token_version,
                },
            )
            .await;
        user_id
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn codec() -> TokenCodec {
    TokenCodec::new(SECRET, 3600)
}

fn mint_token(
    subject: UserId,
    role: Role,
    scopes: &[&str],
    token_version: u64,
    verified_secs_ago: i64,
) -> String {
    let claims = SessionClaims {
        subject: Some(subject),
        role,
        scopes: normalize_scopes(scopes.iter().copied()),
        token_version: Some(token_version),
        last_verified_at: Some(Utc::now() - ChronoDuration::seconds(verified_secs_ago)),
    };
    codec().encode(&claims, Utc::now()).expect("failed to encode token")
}

#[tokio::test]
async fn health_is_public() {
    let server = TestServer::spawn(60_000).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/rpc/health?ping=hi", server.base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["ping"], json!("hi"));
    assert_eq!(server.store.read_count(), 0);
}

#[tokio::test]
async fn me_requires_authentication() {
    let server = TestServer::spawn(60_000).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/rpc/me", server.base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], json!("unauthorized"));
}

#[tokio::test]
async fn fresh_credential_skips_the_store() {
    let server = TestServer::spawn(60_000).await;
    let client = reqwest::Client::new();
    let user = server.insert_user(Role::User, &[], 0).await;
    let token = mint_token(user, Role::User, &[], 0, 0);

    let res = client
        .get(format!("{}/rpc/me", server.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["user"]["id"], json!(user.to_string()));
    assert_eq!(server.store.read_count(), 0, "fresh credential must not hit the store");
}

#[tokio::test]
async fn stale_credential_reconciles_and_rolls_the_token() {
    let server = TestServer::spawn(5_000).await;
    let client = reqwest::Client::new();
    let user = server
        .insert_user(Role::User, &["auth:read"], 0)
        .await;
    // Verified long ago, but the version still matches the store.
    let token = mint_token(user, Role::User, &[], 0, 60);

    let res = client
        .get(format!("{}/rpc/me", server.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(server.store.read_count(), 1);

    // The refreshed credential is re-issued with the store's view.
    let reissued = res
        .headers()
        .get(SESSION_TOKEN_HEADER)
        .expect("refreshed token header")
        .to_str()
        .unwrap()
        .to_string();
    let refreshed = codec().decode(&reissued).expect("reissued token decodes");
    assert_eq!(refreshed.subject, Some(user));
    assert_eq!(refreshed.token_version, Some(0));
    assert_eq!(
        refreshed.scopes,
        normalize_scopes(["auth:read"]),
        "stale scopes are overwritten from the store"
    );
    assert!(refreshed.last_verified_at.is_some());
}

#[tokio::test]
async fn version_mismatch_invalidates_the_credential() {
    let server = TestServer::spawn(5_000).await;
    let client = reqwest::Client::new();
    let user = server.insert_user(Role::User, &[], 1).await;
    let token = mint_token(user, Role::User, &[], 0, 60);

    let res = client
        .get(format!("{}/rpc/me", server.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // The destroyed credential is re-issued cleared: no subject, no scopes.
    let reissued = res
        .headers()
        .get(SESSION_TOKEN_HEADER)
        .expect("invalidated token header")
        .to_str()
        .unwrap()
        .to_string();
    let cleared = codec().decode(&reissued).expect("reissued token decodes");
    assert_eq!(cleared.subject, None);
    assert_eq!(cleared.role, Role::User);
    assert!(cleared.scopes.is_empty());
}

#[tokio::test]
async fn strict_endpoint_rejects_revocation_within_the_freshness_window() {
    let server = TestServer::spawn(60_000).await;
    let client = reqwest::Client::new();
    // Store already moved to version 4; the credential still carries 3 and
    // is fresh enough to pass the cache. The strict guard catches it.
    let user = server.insert_user(Role::User, &["auth:read"], 4).await;
    let token = mint_token(user, Role::User, &["auth:read"], 3, 0);

    let res = client
        .get(format!("{}/rpc/auth-access", server.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn scope_gate_denies_then_admits() {
    let server = TestServer::spawn(60_000).await;
    let client = reqwest::Client::new();

    let without = server.insert_user(Role::User, &[], 0).await;
    let token = mint_token(without, Role::User, &[], 0, 0);
    let res = client
        .get(format!("{}/rpc/auth-access", server.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let with = server.insert_user(Role::User, &["auth:read"], 0).await;
    let token = mint_token(with, Role::User, &["auth:read"], 0, 0);
    let res = client
        .get(format!("{}/rpc/auth-access", server.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["role"], json!("user"));
    assert_eq!(body["scopes"], json!(["auth:read"]));
}

#[tokio::test]
async fn scope_grant_revokes_old_credential_then_admits_new_one() {
    let server = TestServer::spawn(60_000).await;
    let client = reqwest::Client::new();

    let admin = server.insert_user(Role::Admin, &[], 0).await;
    let target = server.insert_user(Role::User, &[], 0).await;
    let admin_token = mint_token(admin, Role::Admin, &[], 0, 0);
    let old_target_token = mint_token(target, Role::User, &[], 0, 0);

    // Without the scope: forbidden.
    let res = client
        .get(format!("{}/rpc/auth-access", server.base_url))
        .bearer_auth(&old_target_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Admin grants auth:read; the write bumps the target's version to 1.
    let res = client
        .post(format!(
            "{}/rpc/admin/users/{}/authorization",
            server.base_url, target
        ))
        .bearer_auth(&admin_token)
        .json(&json!({"role": "user", "scopes": ["auth:read"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["token_version"], json!(1));
    assert_eq!(body["scopes"], json!(["auth:read"]));

    // The old credential (version 0) is now rejected outright.
    let res = client
        .get(format!("{}/rpc/auth-access", server.base_url))
        .bearer_auth(&old_target_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Re-authenticated with current claims, the same endpoint succeeds.
    let new_target_token = mint_token(target, Role::User, &["auth:read"], 1, 0);
    let res = client
        .get(format!("{}/rpc/auth-access", server.base_url))
        .bearer_auth(&new_target_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn revoke_sessions_bumps_version_only() {
    let server = TestServer::spawn(5_000).await;
    let client = reqwest::Client::new();

    let admin = server.insert_user(Role::Admin, &[], 0).await;
    let target = server.insert_user(Role::User, &["auth:read"], 3).await;
    let admin_token = mint_token(admin, Role::Admin, &[], 0, 0);

    let res = client
        .post(format!(
            "{}/rpc/admin/users/{}/revoke-sessions",
            server.base_url, target
        ))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["token_version"], json!(4));

    // A credential cached at version 3 is rejected even though role and
    // scopes are untouched.
    let stale_token = mint_token(target, Role::User, &["auth:read"], 3, 60);
    let res = client
        .get(format!("{}/rpc/me", server.base_url))
        .bearer_auth(&stale_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_endpoints_are_role_gated() {
    let server = TestServer::spawn(60_000).await;
    let client = reqwest::Client::new();

    let user = server.insert_user(Role::User, &[], 0).await;
    let target = server.insert_user(Role::User, &[], 0).await;
    let token = mint_token(user, Role::User, &[], 0, 0);

    let res = client
        .post(format!(
            "{}/rpc/admin/users/{}/authorization",
            server.base_url, target
        ))
        .bearer_auth(&token)
        .json(&json!({"role": "admin", "scopes": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Unauthenticated callers are turned away before role evaluation.
    let res = client
        .post(format!(
            "{}/rpc/admin/users/{}/revoke-sessions",
            server.base_url, target
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn last_admin_demotion_conflicts() {
    let server = TestServer::spawn(60_000).await;
    let client = reqwest::Client::new();

    let sole_admin = server.insert_user(Role::Admin, &[], 0).await;
    let admin_token = mint_token(sole_admin, Role::Admin, &[], 0, 0);

    let res = client
        .post(format!(
            "{}/rpc/admin/users/{}/authorization",
            server.base_url, sole_admin
        ))
        .bearer_auth(&admin_token)
        .json(&json!({"role": "user", "scopes": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], json!("conflict"));
}

#[tokio::test]
async fn second_admin_allows_one_demotion() {
    let server = TestServer::spawn(60_000).await;
    let client = reqwest::Client::new();

    let first = server.insert_user(Role::Admin, &[], 0).await;
    let second = server.insert_user(Role::Admin, &[], 0).await;
    let token = mint_token(first, Role::Admin, &[], 0, 0);

    let res = client
        .post(format!(
            "{}/rpc/admin/users/{}/authorization",
            server.base_url, second
        ))
        .bearer_auth(&token)
        .json(&json!({"role": "user", "scopes": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["role"], json!("user"));
    assert_eq!(body["token_version"], json!(1));

    // The remaining administrator is now protected.
    let res = client
        .post(format!(
            "{}/rpc/admin/users/{}/authorization",
            server.base_url, first
        ))
        .bearer_auth(&token)
        .json(&json!({"role": "user", "scopes": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn updating_a_missing_user_is_not_found() {
    let server = TestServer::spawn(60_000).await;
    let client = reqwest::Client::new();

    let admin = server.insert_user(Role::Admin, &[], 0).await;
    let token = mint_token(admin, Role::Admin, &[], 0, 0);

    let res = client
        .post(format!(
            "{}/rpc/admin/users/{}/authorization",
            server.base_url,
            UserId::new()
        ))
        .bearer_auth(&token)
        .json(&json!({"role": "user", "scopes": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .post(format!(
            "{}/rpc/admin/users/{}/revoke-sessions",
            server.base_url,
            UserId::new()
        ))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_scopes_are_rejected_at_the_input_boundary() {
    let server = TestServer::spawn(60_000).await;
    let client = reqwest::Client::new();

    let admin = server.insert_user(Role::Admin, &[], 0).await;
    let target = server.insert_user(Role::User, &[], 0).await;
    let token = mint_token(admin, Role::Admin, &[], 0, 0);

    let res = client
        .post(format!(
            "{}/rpc/admin/users/{}/authorization",
            server.base_url, target
        ))
        .bearer_auth(&token)
        .json(&json!({"role": "user", "scopes": ["not a scope"]}))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_client_error());
}
