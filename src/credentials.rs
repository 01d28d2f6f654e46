//! Service-account credentials for the upstream speech service.
//!
//! Credentials are resolved once at startup, either from a base64-encoded
//! JSON blob or from a mounted key file, and kept in memory for the life of
//! the process.

use crate::config::SpeechConfig;
use base64::Engine;
use jsonwebtoken::EncodingKey;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use tracing::info;

/// Where the credentials were read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsSource {
    EncodedBlob,
    File(String),
}

/// Google service-account key file contents (the fields the relay needs)
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    pub private_key_id: String,
    pub private_key: String,
    pub client_email: String,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("client_email", &self.client_email)
            .finish_non_exhaustive()
    }
}

/// Validated, immutable credentials shared by every session
#[derive(Clone)]
pub struct Credentials {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    source: CredentialsSource,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_email", &self.key.client_email)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    /// Resolve credentials from the speech configuration.
    ///
    /// The encoded blob wins over the key file when both are present.
    pub fn resolve(config: &SpeechConfig) -> Result<Self, CredentialsError> {
        let blob = config
            .credentials_base64
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty());

        if let Some(blob) = blob {
            return Self::from_base64(blob);
        }

        match config.credentials_path.as_deref().filter(|p| !p.is_empty()) {
            Some(path) => Self::from_file(path),
            None => Err(CredentialsError::Missing),
        }
    }

    /// Decode a base64 service-account blob
    pub fn from_base64(blob: &str) -> Result<Self, CredentialsError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(blob.trim())
            .map_err(|e| CredentialsError::Decode {
                reason: e.to_string(),
            })?;

        let credentials = Self::from_json(&bytes, CredentialsSource::EncodedBlob)?;
        info!(
            client_email = %credentials.client_email(),
            "Google credentials decoded from environment"
        );
        Ok(credentials)
    }

    /// Read a service-account key file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CredentialsError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| CredentialsError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let credentials =
            Self::from_json(&bytes, CredentialsSource::File(path.display().to_string()))?;
        info!(
            client_email = %credentials.client_email(),
            path = %path.display(),
            "Google credentials loaded from file"
        );
        Ok(credentials)
    }

    fn from_json(bytes: &[u8], source: CredentialsSource) -> Result<Self, CredentialsError> {
        let key: ServiceAccountKey =
            serde_json::from_slice(bytes).map_err(|e| CredentialsError::Parse {
                reason: e.to_string(),
            })?;

        if let Some(kind) = key.key_type.as_deref() {
            if kind != "service_account" {
                return Err(CredentialsError::UnsupportedType(kind.to_string()));
            }
        }
        if key.client_email.trim().is_empty() {
            return Err(CredentialsError::Parse {
                reason: "client_email is empty".to_string(),
            });
        }

        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            CredentialsError::PrivateKey {
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            key,
            encoding_key,
            source,
        })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    pub fn private_key_id(&self) -> &str {
        &self.key.private_key_id
    }

    pub fn project_id(&self) -> Option<&str> {
        self.key.project_id.as_deref()
    }

    pub fn source(&self) -> &CredentialsSource {
        &self.source
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }
}

/// Credential resolution errors. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    #[error("no credentials configured: set GOOGLE_CREDENTIALS_BASE64 or GOOGLE_APPLICATION_CREDENTIALS")]
    Missing,

    #[error("GOOGLE_CREDENTIALS_BASE64 is not valid base64: {reason}")]
    Decode { reason: String },

    #[error("failed to read credentials file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("credentials are not a valid service-account key: {reason}")]
    Parse { reason: String },

    #[error("unsupported credentials type: {0}")]
    UnsupportedType(String),

    #[error("failed to parse service-account private key: {reason}")]
    PrivateKey { reason: String },
}
