use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use pocket_api::{ConsumerKey, CredentialStore, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONSUMER_KEY_ENV: &str = "POCKET_CONSUMER_KEY";

/// Consumer key baked in at build time, if the builder provided one.
const COMPILED_CONSUMER_KEY: Option<&str> = option_env!("POCKET_CONSUMER_KEY");

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pocket: PocketConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PocketConfig {
    pub consumer_key: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub store_path: Option<PathBuf>,
    pub callback_host: IpAddr,
    /// 0 waits for the browser forever.
    pub timeout_seconds: u64,
}

impl Default for PocketConfig {
    fn default() -> Self {
        Self {
            consumer_key: None,
            api_base: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            callback_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            timeout_seconds: 0,
        }
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        if let Some(proj_dirs) = ProjectDirs::from("com", "pocket", "pocket") {
            proj_dirs.config_dir().join("config.toml")
        } else {
            PathBuf::from("pocket.toml")
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// A missing file yields defaults; a malformed one is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn api_base(&self) -> Result<url::Url> {
        url::Url::parse(&self.pocket.api_base)
            .with_context(|| format!("Invalid api_base {:?}", self.pocket.api_base))
    }

    pub fn store(&self) -> Result<CredentialStore> {
        let path = match &self.auth.store_path {
            Some(path) => path.clone(),
            None => CredentialStore::default_path()?,
        };
        Ok(CredentialStore::new(path))
    }

    pub fn auth_deadline(&self) -> Option<Duration> {
        (self.auth.timeout_seconds > 0).then(|| Duration::from_secs(self.auth.timeout_seconds))
    }

    pub fn consumer_key(&self) -> Result<ConsumerKey> {
        resolve_consumer_key(
            std::env::var(CONSUMER_KEY_ENV).ok(),
            self.pocket.consumer_key.as_deref(),
            COMPILED_CONSUMER_KEY,
        )
    }
}

/// Environment wins over the config file, which wins over the compiled-in value.
pub fn resolve_consumer_key(
    env: Option<String>,
    configured: Option<&str>,
    compiled: Option<&str>,
) -> Result<ConsumerKey> {
    let candidate = env
        .filter(|v| !v.is_empty())
        .or_else(|| configured.filter(|v| !v.is_empty()).map(str::to_string))
        .or_else(|| compiled.filter(|v| !v.is_empty()).map(str::to_string))
        .ok_or_else(|| {
            anyhow!(
                "No Pocket consumer key configured. Set {CONSUMER_KEY_ENV} or pocket.consumer_key in the config file"
            )
        })?;
    ConsumerKey::new(candidate).ok_or_else(|| anyhow!("Pocket consumer key is malformed"))
}
