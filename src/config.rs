use anyhow::{Context, Result};
use serde::Deserialize;

/// Default listening port when neither `PORT` nor the config file sets one.
pub const DEFAULT_PORT: u16 = 10000;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub speech: SpeechConfig,
    pub session: SessionSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    /// gRPC endpoint of the speech service
    pub endpoint: String,

    /// Base64-encoded service-account JSON (`GOOGLE_CREDENTIALS_BASE64`)
    #[serde(default)]
    pub credentials_base64: Option<String>,

    /// Path to a mounted service-account JSON file (`GOOGLE_APPLICATION_CREDENTIALS`)
    #[serde(default)]
    pub credentials_path: Option<String>,

    /// Give up connecting to the speech service after this long
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    /// How long to keep draining upstream results after the client leaves
    pub close_grace_ms: u64,
}

impl Config {
    /// Load configuration from defaults, an optional file, `STT_RELAY__*`
    /// variables and the platform variables (`PORT`, Google credentials).
    pub fn load(path: &str) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`], with platform variables read through `lookup`.
    pub fn load_with<F>(path: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = config::Config::builder()
            .set_default("service.name", "stt-relay")?
            .set_default("service.http.bind", "0.0.0.0")?
            .set_default("service.http.port", i64::from(DEFAULT_PORT))?
            .set_default("speech.endpoint", "https://speech.googleapis.com")?
            .set_default("speech.connect_timeout_ms", 10_000)?
            .set_default("session.close_grace_ms", 2000)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("STT_RELAY").separator("__"));

        if let Some(port) = lookup("PORT").filter(|p| !p.trim().is_empty()) {
            let port: u16 = port
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {}", port))?;
            builder = builder.set_override("service.http.port", i64::from(port))?;
        }
        if let Some(blob) = lookup("GOOGLE_CREDENTIALS_BASE64") {
            builder = builder.set_override("speech.credentials_base64", blob)?;
        }
        if let Some(path) = lookup("GOOGLE_APPLICATION_CREDENTIALS") {
            builder = builder.set_override("speech.credentials_path", path)?;
        }

        let settings = builder.build().context("Failed to build configuration")?;

        Ok(settings.try_deserialize()?)
    }
}
