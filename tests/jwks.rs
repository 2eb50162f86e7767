//! Integration tests for JWKS-based JWT validation.
//!
//! These tests spin up a lightweight axum server that plays the identity
//! provider's `/keys` endpoint, then use `ScalekitVerifier` to validate
//! tokens signed with keys from that endpoint.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::Router;
use axum::routing::get;
use greeting_mcp::auth::{ScalekitSettings, ScalekitVerifier, TokenVerifier, VerifierError};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};
use tokio::sync::RwLock;

const AUDIENCE: &str = "http://localhost:3002/";

/// Test-only HMAC secrets and their base64url encodings.
const SECRET_1: &[u8] = b"greeting-mcp-jwks-test-secret-key!!!";
const SECRET_1_B64: &str = "Z3JlZXRpbmctbWNwLWp3a3MtdGVzdC1zZWNyZXQta2V5ISEh";
const SECRET_2: &[u8] = b"rotated-signing-key-for-greeting-mcp";
const SECRET_2_B64: &str = "cm90YXRlZC1zaWduaW5nLWtleS1mb3ItZ3JlZXRpbmctbWNw";

fn jwk(kid: &str, k: &str) -> Value {
    json!({"kty": "oct", "k": k, "kid": kid, "alg": "HS256"})
}

struct KeyServer {
    url: String,
    keys: Arc<RwLock<Value>>,
    fetches: Arc<AtomicUsize>,
    handle: tokio::task::JoinHandle<()>,
}

/// Spin up a mock key server returning the given JWK set JSON at `/keys`.
async fn start_key_server(initial: Value) -> KeyServer {
    let keys = Arc::new(RwLock::new(initial));
    let fetches = Arc::new(AtomicUsize::new(0));

    let app = {
        let keys = keys.clone();
        let fetches = fetches.clone();
        Router::new().route(
            "/keys",
            get(move || {
                let keys = keys.clone();
                let fetches = fetches.clone();
                async move {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    axum::Json(keys.read().await.clone())
                }
            }),
        )
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let url = format!("http://127.0.0.1:{}", addr.port());

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    KeyServer {
        url,
        keys,
        fetches,
        handle,
    }
}

fn settings(env_url: &str) -> ScalekitSettings {
    ScalekitSettings {
        env_url: env_url.to_string(),
        client_id: "skc_test".to_string(),
        client_secret: "test-secret".into(),
        expected_audience: AUDIENCE.to_string(),
    }
}

fn verifier(env_url: &str) -> ScalekitVerifier {
    ScalekitVerifier::builder(settings(env_url))
        .unwrap()
        .algorithms(vec![Algorithm::HS256])
        .build()
        .unwrap()
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn claims(issuer: &str) -> Value {
    json!({
        "sub": "user-42",
        "iss": issuer,
        "aud": AUDIENCE,
        "exp": now() + 3600,
        "scope": "usr:read",
        "client_id": "skc_test",
    })
}

/// Create a signed JWT with the given claims, key id and secret.
fn sign(claims: &Value, kid: &str, secret: &[u8]) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(kid.to_string());
    jsonwebtoken::encode(&header, claims, &EncodingKey::from_secret(secret)).unwrap()
}

#[tokio::test]
async fn test_valid_token() {
    let server = start_key_server(json!({"keys": [jwk("key-1", SECRET_1_B64)]})).await;
    let verifier = verifier(&server.url);

    let token = sign(&claims(&server.url), "key-1", SECRET_1);
    let claims = verifier.verify(&token).await.unwrap();

    assert_eq!(claims.sub.as_deref(), Some("user-42"));
    assert_eq!(claims.client_id.as_deref(), Some("skc_test"));
    assert!(claims.has_scope("usr:read"));
    assert!(claims.aud.unwrap().contains(AUDIENCE));

    server.handle.abort();
}

#[tokio::test]
async fn test_trailing_slash_env_url_matches_issuer() {
    let server = start_key_server(json!({"keys": [jwk("key-1", SECRET_1_B64)]})).await;
    let verifier = verifier(&format!("{}/", server.url));

    let token = sign(&claims(&server.url), "key-1", SECRET_1);
    assert!(verifier.verify(&token).await.is_ok());

    server.handle.abort();
}

#[tokio::test]
async fn test_keys_are_cached() {
    let server = start_key_server(json!({"keys": [jwk("key-1", SECRET_1_B64)]})).await;
    let verifier = verifier(&server.url);

    let token = sign(&claims(&server.url), "key-1", SECRET_1);
    for _ in 0..3 {
        assert!(verifier.verify(&token).await.is_ok());
    }
    assert_eq!(server.fetches.load(Ordering::SeqCst), 1);

    server.handle.abort();
}

#[tokio::test]
async fn test_wrong_audience() {
    let server = start_key_server(json!({"keys": [jwk("key-1", SECRET_1_B64)]})).await;
    let verifier = verifier(&server.url);

    let mut claims = claims(&server.url);
    claims["aud"] = json!("https://other.example.com/");
    let token = sign(&claims, "key-1", SECRET_1);

    assert!(matches!(
        verifier.verify(&token).await,
        Err(VerifierError::Token(_))
    ));

    server.handle.abort();
}

#[tokio::test]
async fn test_wrong_issuer() {
    let server = start_key_server(json!({"keys": [jwk("key-1", SECRET_1_B64)]})).await;
    let verifier = verifier(&server.url);

    let token = sign(&claims("https://evil.example.com"), "key-1", SECRET_1);
    assert!(matches!(
        verifier.verify(&token).await,
        Err(VerifierError::Token(_))
    ));

    server.handle.abort();
}

#[tokio::test]
async fn test_expired_token() {
    let server = start_key_server(json!({"keys": [jwk("key-1", SECRET_1_B64)]})).await;
    let verifier = verifier(&server.url);

    let mut claims = claims(&server.url);
    claims["exp"] = json!(now() - 3600);
    let token = sign(&claims, "key-1", SECRET_1);

    assert!(matches!(
        verifier.verify(&token).await,
        Err(VerifierError::Token(_))
    ));

    server.handle.abort();
}

#[tokio::test]
async fn test_bad_signature() {
    let server = start_key_server(json!({"keys": [jwk("key-1", SECRET_1_B64)]})).await;
    let verifier = verifier(&server.url);

    let token = sign(&claims(&server.url), "key-1", SECRET_2);
    assert!(matches!(
        verifier.verify(&token).await,
        Err(VerifierError::Token(_))
    ));

    server.handle.abort();
}

#[tokio::test]
async fn test_disallowed_algorithm() {
    let server = start_key_server(json!({"keys": [jwk("key-1", SECRET_1_B64)]})).await;
    // Default algorithm list is asymmetric only.
    let verifier = ScalekitVerifier::new(settings(&server.url)).unwrap();

    let token = sign(&claims(&server.url), "key-1", SECRET_1);
    assert!(matches!(
        verifier.verify(&token).await,
        Err(VerifierError::DisallowedAlgorithm(Algorithm::HS256))
    ));
    assert_eq!(server.fetches.load(Ordering::SeqCst), 0);

    server.handle.abort();
}

#[tokio::test]
async fn test_garbage_token() {
    let server = start_key_server(json!({"keys": [jwk("key-1", SECRET_1_B64)]})).await;
    let verifier = verifier(&server.url);

    assert!(matches!(
        verifier.verify("not-a-jwt").await,
        Err(VerifierError::Token(_))
    ));

    server.handle.abort();
}

#[tokio::test]
async fn test_unknown_kid_refreshes_after_rotation() {
    let server = start_key_server(json!({"keys": [jwk("key-1", SECRET_1_B64)]})).await;
    let verifier = ScalekitVerifier::builder(settings(&server.url))
        .unwrap()
        .algorithms(vec![Algorithm::HS256])
        .min_refresh_interval(Duration::ZERO)
        .build()
        .unwrap();

    let old = sign(&claims(&server.url), "key-1", SECRET_1);
    assert!(verifier.verify(&old).await.is_ok());

    *server.keys.write().await = json!({"keys": [jwk("key-2", SECRET_2_B64)]});

    let rotated = sign(&claims(&server.url), "key-2", SECRET_2);
    let claims = verifier.verify(&rotated).await.unwrap();
    assert_eq!(claims.sub.as_deref(), Some("user-42"));
    assert_eq!(server.fetches.load(Ordering::SeqCst), 2);

    server.handle.abort();
}

#[tokio::test]
async fn test_unknown_kid_refresh_is_rate_limited() {
    let server = start_key_server(json!({"keys": [jwk("key-1", SECRET_1_B64)]})).await;
    let verifier = verifier(&server.url);

    let known = sign(&claims(&server.url), "key-1", SECRET_1);
    assert!(verifier.verify(&known).await.is_ok());

    let unknown = sign(&claims(&server.url), "key-9", SECRET_1);
    for _ in 0..3 {
        assert!(matches!(
            verifier.verify(&unknown).await,
            Err(VerifierError::UnknownKey(Some(ref kid))) if kid == "key-9"
        ));
    }
    assert_eq!(server.fetches.load(Ordering::SeqCst), 1);

    server.handle.abort();
}

#[tokio::test]
async fn test_stale_keys_used_when_refresh_fails() {
    let server = start_key_server(json!({"keys": [jwk("key-1", SECRET_1_B64)]})).await;
    let verifier = ScalekitVerifier::builder(settings(&server.url))
        .unwrap()
        .algorithms(vec![Algorithm::HS256])
        .ttl(Duration::from_millis(50))
        .build()
        .unwrap();

    let token = sign(&claims(&server.url), "key-1", SECRET_1);
    assert!(verifier.verify(&token).await.is_ok());

    server.handle.abort();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(verifier.verify(&token).await.is_ok());
}

#[tokio::test]
async fn test_unreachable_key_server_without_cache() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());
    drop(listener);

    let verifier = verifier(&url);
    let token = sign(&claims(&url), "key-1", SECRET_1);

    assert!(matches!(
        verifier.verify(&token).await,
        Err(VerifierError::Jwks(_))
    ));
}
