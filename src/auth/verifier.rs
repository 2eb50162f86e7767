//! Access-token verification against the identity provider.
//!
//! [`TokenVerifier`] is the seam the auth gate depends on. The production
//! implementation, [`ScalekitVerifier`], validates JWTs locally using the
//! signing keys published at `<env_url>/keys`, enforcing issuer, audience and
//! expiry.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use url::Url;

use crate::secret::SecretString;

/// Audience claim value, which can be a single string or array of strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenAudience {
    Single(String),
    Multiple(Vec<String>),
}

impl TokenAudience {
    /// Check if the audience contains a specific value.
    pub fn contains(&self, value: &str) -> bool {
        match self {
            TokenAudience::Single(s) => s == value,
            TokenAudience::Multiple(v) => v.iter().any(|s| s == value),
        }
    }
}

/// Validated token claims extracted from an access token.
///
/// Contains standard JWT claims plus an `extra` map for custom claims.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user/client identifier).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<TokenAudience>,

    /// Expiration time (Unix timestamp).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,

    /// Space-delimited scope string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Additional claims not covered by standard fields.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl TokenClaims {
    /// Granted scopes.
    ///
    /// Merges the space-delimited `scope` claim with a `scopes` array claim,
    /// which is how the identity provider lists them.
    pub fn scopes(&self) -> HashSet<&str> {
        let from_string = self.scope.as_deref().unwrap_or("").split_whitespace();
        let from_array = self
            .extra
            .get("scopes")
            .and_then(|v| v.as_array())
            .into_iter()
            .flatten()
            .filter_map(|v| v.as_str());
        from_string.chain(from_array).collect()
    }

    /// Check if the token has a specific scope.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes().contains(scope)
    }
}

/// Why a token (or the verifier itself) was rejected.
#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    #[error("missing required setting {0}")]
    MissingSetting(&'static str),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to fetch signing keys: {0}")]
    Jwks(#[from] reqwest::Error),

    #[error("no signing key matches kid {0:?}")]
    UnknownKey(Option<String>),

    #[error("algorithm {0:?} is not allowed")]
    DisallowedAlgorithm(Algorithm),

    #[error("token rejected: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("token rejected: {0}")]
    Rejected(String),
}

/// Trait for validating OAuth access tokens.
///
/// # Example
///
/// ```rust
/// use greeting_mcp::auth::{TokenClaims, TokenVerifier, VerifierError};
///
/// #[derive(Clone)]
/// struct AllowAll;
///
/// impl TokenVerifier for AllowAll {
///     async fn verify(&self, _token: &str) -> Result<TokenClaims, VerifierError> {
///         Ok(TokenClaims::default())
///     }
/// }
/// ```
pub trait TokenVerifier: Clone + Send + Sync + 'static {
    /// Validate an access token and return the extracted claims.
    fn verify(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<TokenClaims, VerifierError>> + Send;
}

/// Connection settings for the Scalekit environment.
#[derive(Debug, Clone, Default)]
pub struct ScalekitSettings {
    /// Environment URL; also the expected token issuer.
    pub env_url: String,
    pub client_id: String,
    pub client_secret: SecretString,
    /// Audience tokens must be minted for.
    pub expected_audience: String,
}

const DEFAULT_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
    Algorithm::ES256,
    Algorithm::ES384,
    Algorithm::EdDSA,
];

const DEFAULT_JWKS_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

struct Inner {
    http: reqwest::Client,
    jwks_url: Url,
    issuer: String,
    audience: String,
    client_id: String,
    algorithms: Vec<Algorithm>,
    ttl: Duration,
    min_refresh_interval: Duration,
    cache: RwLock<Option<CachedKeys>>,
}

/// JWT verifier backed by the Scalekit environment's published signing keys.
///
/// Keys are fetched lazily on first use, cached for a TTL, and refetched
/// early when a token names a `kid` the cache does not know (rate limited by
/// a minimum refresh interval). If a refresh fails, stale keys stay in use.
///
/// ```rust
/// use greeting_mcp::auth::{ScalekitSettings, ScalekitVerifier};
///
/// let verifier = ScalekitVerifier::new(ScalekitSettings {
///     env_url: "https://acme.scalekit.dev".into(),
///     client_id: "skc_123".into(),
///     client_secret: "secret".into(),
///     expected_audience: "http://localhost:3002/".into(),
/// })
/// .unwrap();
/// assert_eq!(verifier.jwks_url().as_str(), "https://acme.scalekit.dev/keys");
/// ```
#[derive(Clone)]
pub struct ScalekitVerifier {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ScalekitVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScalekitVerifier")
            .field("jwks_url", &self.inner.jwks_url.as_str())
            .field("issuer", &self.inner.issuer)
            .field("audience", &self.inner.audience)
            .field("client_id", &self.inner.client_id)
            .finish_non_exhaustive()
    }
}

impl ScalekitVerifier {
    /// Build a verifier. Fails if any required setting is empty or the
    /// environment URL does not parse.
    pub fn new(settings: ScalekitSettings) -> Result<Self, VerifierError> {
        Self::builder(settings)?.build()
    }

    /// Start building a verifier with non-default tuning.
    pub fn builder(settings: ScalekitSettings) -> Result<ScalekitVerifierBuilder, VerifierError> {
        if settings.env_url.trim().is_empty() {
            return Err(VerifierError::MissingSetting("SK_ENV_URL"));
        }
        if settings.client_id.trim().is_empty() {
            return Err(VerifierError::MissingSetting("SK_CLIENT_ID"));
        }
        if settings.client_secret.is_empty() {
            return Err(VerifierError::MissingSetting("SK_CLIENT_SECRET"));
        }

        let issuer = settings.env_url.trim().trim_end_matches('/').to_string();
        let jwks_url = Url::parse(&format!("{}/keys", issuer))?;

        Ok(ScalekitVerifierBuilder {
            jwks_url,
            issuer,
            audience: settings.expected_audience,
            client_id: settings.client_id,
            algorithms: DEFAULT_ALGORITHMS.to_vec(),
            ttl: DEFAULT_JWKS_TTL,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            http: None,
        })
    }

    pub fn jwks_url(&self) -> &Url {
        &self.inner.jwks_url
    }

    pub fn client_id(&self) -> &str {
        &self.inner.client_id
    }

    async fn fetch_keys(&self) -> Result<JwkSet, VerifierError> {
        tracing::debug!(url = %self.inner.jwks_url, "Fetching signing keys");
        let keys = self
            .inner
            .http
            .get(self.inner.jwks_url.clone())
            .send()
            .await?
            .error_for_status()?
            .json::<JwkSet>()
            .await?;
        tracing::debug!(count = keys.keys.len(), "Fetched signing keys");
        Ok(keys)
    }

    /// Find the key for `kid`, refreshing the cache when it is empty, expired,
    /// or does not know the key.
    async fn signing_key(&self, kid: Option<&str>) -> Result<Jwk, VerifierError> {
        {
            let cache = self.inner.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                let fresh = cached.fetched_at.elapsed() < self.inner.ttl;
                if fresh {
                    if let Some(key) = select_key(&cached.keys, kid) {
                        return Ok(key.clone());
                    }
                    if cached.fetched_at.elapsed() < self.inner.min_refresh_interval {
                        return Err(VerifierError::UnknownKey(kid.map(String::from)));
                    }
                }
            }
        }

        let mut cache = self.inner.cache.write().await;
        match self.fetch_keys().await {
            Ok(keys) => {
                *cache = Some(CachedKeys {
                    keys,
                    fetched_at: Instant::now(),
                });
            }
            Err(e) => match cache.as_ref() {
                Some(_) => {
                    tracing::warn!(error = %e, "Signing key refresh failed, using cached keys")
                }
                None => return Err(e),
            },
        }

        cache
            .as_ref()
            .and_then(|cached| select_key(&cached.keys, kid))
            .cloned()
            .ok_or_else(|| VerifierError::UnknownKey(kid.map(String::from)))
    }
}

/// Pick the key named by `kid`; without a `kid`, only an unambiguous
/// single-key set matches.
fn select_key<'a>(keys: &'a JwkSet, kid: Option<&str>) -> Option<&'a Jwk> {
    match kid {
        Some(kid) => keys.find(kid),
        None if keys.keys.len() == 1 => keys.keys.first(),
        None => None,
    }
}

impl TokenVerifier for ScalekitVerifier {
    async fn verify(&self, token: &str) -> Result<TokenClaims, VerifierError> {
        let header = jsonwebtoken::decode_header(token)?;
        if !self.inner.algorithms.contains(&header.alg) {
            return Err(VerifierError::DisallowedAlgorithm(header.alg));
        }

        let jwk = self.signing_key(header.kid.as_deref()).await?;
        let key = DecodingKey::from_jwk(&jwk)?;

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[self.inner.issuer.as_str()]);
        validation.set_audience(&[self.inner.audience.as_str()]);

        let data = jsonwebtoken::decode::<TokenClaims>(token, &key, &validation)?;
        Ok(data.claims)
    }
}

/// Builder for [`ScalekitVerifier`].
pub struct ScalekitVerifierBuilder {
    jwks_url: Url,
    issuer: String,
    audience: String,
    client_id: String,
    algorithms: Vec<Algorithm>,
    ttl: Duration,
    min_refresh_interval: Duration,
    http: Option<reqwest::Client>,
}

impl ScalekitVerifierBuilder {
    /// Override where signing keys are fetched from.
    pub fn jwks_url(mut self, url: Url) -> Self {
        self.jwks_url = url;
        self
    }

    /// Algorithms a token header may name.
    pub fn algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.algorithms = algorithms;
        self
    }

    /// How long fetched keys are trusted before a refetch.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Minimum time between refetches triggered by unknown key ids.
    pub fn min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http = Some(client);
        self
    }

    pub fn build(self) -> Result<ScalekitVerifier, VerifierError> {
        let http = match self.http {
            Some(client) => client,
            None => reqwest::Client::builder().build()?,
        };
        Ok(ScalekitVerifier {
            inner: Arc::new(Inner {
                http,
                jwks_url: self.jwks_url,
                issuer: self.issuer,
                audience: self.audience,
                client_id: self.client_id,
                algorithms: self.algorithms,
                ttl: self.ttl,
                min_refresh_interval: self.min_refresh_interval,
                cache: RwLock::new(None),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ScalekitSettings {
        ScalekitSettings {
            env_url: "https://acme.scalekit.dev/".to_string(),
            client_id: "skc_123".to_string(),
            client_secret: SecretString::new("secret"),
            expected_audience: "http://localhost:3002/".to_string(),
        }
    }

    #[test]
    fn test_jwks_url_from_env_url() {
        let verifier = ScalekitVerifier::new(settings()).unwrap();
        assert_eq!(verifier.jwks_url().as_str(), "https://acme.scalekit.dev/keys");
        assert_eq!(verifier.client_id(), "skc_123");
    }

    #[test]
    fn test_missing_settings_fail() {
        let mut s = settings();
        s.env_url = String::new();
        assert!(matches!(
            ScalekitVerifier::new(s),
            Err(VerifierError::MissingSetting("SK_ENV_URL"))
        ));

        let mut s = settings();
        s.client_id = " ".to_string();
        assert!(matches!(
            ScalekitVerifier::new(s),
            Err(VerifierError::MissingSetting("SK_CLIENT_ID"))
        ));

        let mut s = settings();
        s.client_secret = SecretString::default();
        assert!(matches!(
            ScalekitVerifier::new(s),
            Err(VerifierError::MissingSetting("SK_CLIENT_SECRET"))
        ));
    }

    #[test]
    fn test_invalid_env_url_fails() {
        let mut s = settings();
        s.env_url = "not a url".to_string();
        assert!(matches!(
            ScalekitVerifier::new(s),
            Err(VerifierError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_debug_hides_secret() {
        let verifier = ScalekitVerifier::new(settings()).unwrap();
        let debug = format!("{:?}", verifier);
        assert!(debug.contains("skc_123"));
        assert!(!debug.contains("\"secret\""));
    }

    #[tokio::test]
    async fn test_malformed_token_rejected() {
        let verifier = ScalekitVerifier::new(settings()).unwrap();
        assert!(matches!(
            verifier.verify("not-a-jwt").await,
            Err(VerifierError::Token(_))
        ));
    }

    #[tokio::test]
    async fn test_disallowed_algorithm_rejected_before_fetch() {
        let verifier = ScalekitVerifier::new(settings()).unwrap();
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::new(Algorithm::HS256),
            &serde_json::json!({"sub": "x"}),
            &jsonwebtoken::EncodingKey::from_secret(b"k"),
        )
        .unwrap();
        assert!(matches!(
            verifier.verify(&token).await,
            Err(VerifierError::DisallowedAlgorithm(Algorithm::HS256))
        ));
    }

    #[test]
    fn test_scopes_merge_string_and_array() {
        let claims: TokenClaims = serde_json::from_value(serde_json::json!({
            "scope": "a b",
            "scopes": ["usr:read", 7]
        }))
        .unwrap();
        assert!(claims.has_scope("a"));
        assert!(claims.has_scope("b"));
        assert!(claims.has_scope("usr:read"));
        assert!(!claims.has_scope("usr:write"));
    }

    #[test]
    fn test_audience_forms() {
        let single: TokenClaims =
            serde_json::from_value(serde_json::json!({"aud": "x"})).unwrap();
        assert!(single.aud.unwrap().contains("x"));
        let multi: TokenClaims =
            serde_json::from_value(serde_json::json!({"aud": ["x", "y"]})).unwrap();
        assert!(multi.aud.unwrap().contains("y"));
    }
}
