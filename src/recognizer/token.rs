use crate::credentials::Credentials;
use crate::error::RecognizerError;
use jsonwebtoken::{Algorithm, Header};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Lifetime written into each token
const TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60);

/// Refresh well before Google rejects the token
const TOKEN_REFRESH_AFTER: Duration = Duration::from_secs(55 * 60);

/// Claims of a self-signed service-account JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceAccountClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

struct CachedToken {
    token: String,
    created_at: Instant,
}

/// Mints self-signed JWTs used directly as bearer tokens, so no OAuth
/// round-trip is needed before a session can start.
pub struct TokenSource {
    credentials: Credentials,
    audience: String,
    cached: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSource")
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl TokenSource {
    pub fn new(credentials: Credentials, audience: impl Into<String>) -> Self {
        Self {
            credentials,
            audience: audience.into(),
            cached: Mutex::new(None),
        }
    }

    /// Get a cached token or sign a new one
    pub fn bearer(&self) -> Result<String, RecognizerError> {
        let mut cached = self
            .cached
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(ref token) = *cached {
            if token.created_at.elapsed() < TOKEN_REFRESH_AFTER {
                return Ok(token.token.clone());
            }
        }

        let token = self.sign()?;
        *cached = Some(CachedToken {
            token: token.clone(),
            created_at: Instant::now(),
        });

        Ok(token)
    }

    fn sign(&self) -> Result<String, RecognizerError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.credentials.private_key_id().to_string());

        let now = chrono::Utc::now().timestamp();
        let claims = ServiceAccountClaims {
            iss: self.credentials.client_email().to_string(),
            sub: self.credentials.client_email().to_string(),
            aud: self.audience.clone(),
            iat: now,
            exp: now + TOKEN_LIFETIME.as_secs() as i64,
        };

        jsonwebtoken::encode(&header, &claims, self.credentials.encoding_key()).map_err(|e| {
            RecognizerError::Auth {
                reason: e.to_string(),
            }
        })
    }
}
