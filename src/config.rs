//! Configuration management using the prefer crate.
//!
//! Precedence, lowest first: built-in defaults, the config file (explicit
//! `--config`, a file next to the data directory, or prefer discovery), then
//! `EVIDENCE_*` environment variables.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::filter::DEFAULT_SEARCH_LIMIT;
use crate::import::{DEFAULT_IDLE_TIMEOUT, DEFAULT_PAGE_SIZE};
use crate::repository::credentials::url_with_key;
use crate::repository::util::is_postgres_url;
use crate::repository::{CredentialSource, DieselDbContext};

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "evidence.db";

const ENV_MODE: &str = "EVIDENCE_MODE";
const ENV_REMOTE_URL: &str = "EVIDENCE_REMOTE_URL";
const ENV_REMOTE_KEY: &str = "EVIDENCE_REMOTE_KEY";
const ENV_SECRETS: &str = "EVIDENCE_SECRETS";
const ENV_NO_TLS: &str = "EVIDENCE_NO_TLS";

/// Where records live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentMode {
    /// Local SQLite file under the data directory.
    #[default]
    Embedded,
    /// Hosted PostgreSQL reached with a URL and key.
    Remote,
}

impl DeploymentMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "embedded" | "local" | "sqlite" => Some(Self::Embedded),
            "remote" | "hosted" | "postgres" => Some(Self::Remote),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Embedded => "embedded",
            Self::Remote => "remote",
        }
    }
}

/// Remote store connection values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteSettings {
    pub url: Option<String>,
    pub key: Option<String>,
    pub no_tls: bool,
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename inside `data_dir`.
    pub database_filename: String,
    pub mode: DeploymentMode,
    pub remote: RemoteSettings,
    /// Deployment secrets file with a `[remote]` table.
    pub secrets_path: Option<PathBuf>,
    pub search_limit: i64,
    pub import_page_size: usize,
    /// Import sessions untouched this long are dropped.
    pub import_idle_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        // Documents dir, then home dir, then the current dir
        let data_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("energy-evidence");

        Self {
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            mode: DeploymentMode::Embedded,
            remote: RemoteSettings::default(),
            secrets_path: None,
            search_limit: DEFAULT_SEARCH_LIMIT,
            import_page_size: DEFAULT_PAGE_SIZE,
            import_idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

impl Settings {
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Full path to the embedded database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    pub fn ensure_directories(&self) -> std::io::Result<()> {
        if self.mode == DeploymentMode::Embedded {
            std::fs::create_dir_all(&self.data_dir)?;
        }
        Ok(())
    }

    /// Credentials source for the remote store. Fails when url or key is missing.
    pub fn remote_credentials(&self) -> StoreResult<RemoteCredentials> {
        let url = self
            .remote
            .url
            .clone()
            .ok_or_else(|| StoreError::Configuration("remote mode needs remote.url".into()))?;
        if !is_postgres_url(&url) {
            return Err(StoreError::Configuration(format!(
                "remote.url must be a postgres:// URL, got {}",
                crate::repository::util::redact_url_password(&url)
            )));
        }
        let credentials = RemoteCredentials {
            url,
            key: self.remote.key.clone(),
            secrets_path: self.secrets_path.clone(),
        };
        // Fail at startup rather than on the first query.
        credentials.current_key()?;
        Ok(credentials)
    }

    /// Open the configured store.
    pub fn create_db_context(&self) -> StoreResult<DieselDbContext> {
        match self.mode {
            DeploymentMode::Embedded => {
                let path = self.database_path();
                tracing::info!("Using embedded store at {}", path.display());
                Ok(DieselDbContext::from_sqlite_path(&path))
            }
            DeploymentMode::Remote => {
                let credentials = self.remote_credentials()?;
                tracing::info!(
                    "Using remote store at {}",
                    crate::repository::util::redact_url_password(&credentials.url)
                );
                let url = credentials.database_url()?;
                let ctx = DieselDbContext::from_url(&url, self.remote.no_tls)?;
                Ok(ctx.with_credentials(Arc::new(credentials)))
            }
        }
    }

    /// Apply `EVIDENCE_*` overrides from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(mode) = get(ENV_MODE) {
            match DeploymentMode::from_str(&mode) {
                Some(mode) => self.mode = mode,
                None => tracing::warn!("Ignoring unknown {}={:?}", ENV_MODE, mode),
            }
        }
        if let Some(url) = get(ENV_REMOTE_URL) {
            self.remote.url = Some(url);
        }
        if let Some(key) = get(ENV_REMOTE_KEY) {
            self.remote.key = Some(key);
        }
        if let Some(path) = get(ENV_SECRETS) {
            self.secrets_path = Some(PathBuf::from(shellexpand::tilde(&path).as_ref()));
        }
        if let Some(flag) = get(ENV_NO_TLS) {
            self.remote.no_tls = flag == "1" || flag.eq_ignore_ascii_case("true");
        }
    }
}

/// The `[remote]` table of the deployment secrets file.
#[derive(Debug, Clone, Default, Deserialize)]
struct SecretsFile {
    #[serde(default)]
    remote: SecretsRemote,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SecretsRemote {
    url: Option<String>,
    key: Option<String>,
}

fn read_secrets(path: &Path) -> StoreResult<SecretsRemote> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        StoreError::Configuration(format!("cannot read secrets {}: {}", path.display(), e))
    })?;
    let secrets: SecretsFile = toml::from_str(&contents).map_err(|e| {
        StoreError::Configuration(format!("cannot parse secrets {}: {}", path.display(), e))
    })?;
    Ok(secrets.remote)
}

/// Remote URL plus wherever the key currently lives.
///
/// Each call re-reads the secrets file, then the environment, so a rotated
/// key is picked up by the next credential refresh.
#[derive(Debug, Clone)]
pub struct RemoteCredentials {
    url: String,
    key: Option<String>,
    secrets_path: Option<PathBuf>,
}

impl RemoteCredentials {
    fn current_key(&self) -> StoreResult<String> {
        if let Some(path) = &self.secrets_path {
            match read_secrets(path) {
                Ok(SecretsRemote { key: Some(key), .. }) if !key.is_empty() => return Ok(key),
                Ok(_) => {}
                Err(e) => tracing::warn!("{}", e),
            }
        }
        std::env::var(ENV_REMOTE_KEY)
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.key.clone())
            .ok_or_else(|| StoreError::Configuration("remote mode needs remote.key".into()))
    }
}

impl CredentialSource for RemoteCredentials {
    fn database_url(&self) -> StoreResult<String> {
        url_with_key(&self.url, &self.current_key()?)
    }
}

/// Remote section of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct RemoteConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_tls: Option<bool>,
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Database filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// `embedded` or `remote`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default)]
    #[prefer(default)]
    pub remote: RemoteConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secrets_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_page_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_idle_minutes: Option<u64>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    #[prefer(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Discover an `evidence` config file with prefer.
    pub async fn load() -> Self {
        match prefer::load("evidence").await {
            Ok(found) => match found.source_path() {
                Some(path) => Self::load_from_path(path).await.unwrap_or_else(|e| {
                    tracing::warn!("{}", e);
                    Self::default()
                }),
                None => Self::default(),
            },
            Err(_) => Self::default(),
        }
    }

    /// Load from a file; the format follows the extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Directory of the config file, for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Expand `~` and resolve relative paths against `base_dir`.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(ref mode) = self.mode {
            match DeploymentMode::from_str(mode) {
                Some(mode) => settings.mode = mode,
                None => tracing::warn!("Ignoring unknown mode {:?} in config", mode),
            }
        }
        if let Some(ref url) = self.remote.url {
            settings.remote.url = Some(url.clone());
        }
        if let Some(ref key) = self.remote.key {
            settings.remote.key = Some(key.clone());
        }
        if let Some(no_tls) = self.remote.no_tls {
            settings.remote.no_tls = no_tls;
        }
        if let Some(ref secrets) = self.secrets_path {
            settings.secrets_path = Some(self.resolve_path(secrets, base_dir));
        }
        if let Some(limit) = self.search_limit {
            settings.search_limit = limit.max(1);
        }
        if let Some(size) = self.import_page_size {
            settings.import_page_size = size.max(1);
        }
        if let Some(minutes) = self.import_idle_minutes {
            settings.import_idle_timeout = Duration::from_secs(minutes.max(1) * 60);
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Resolve relative paths from the CWD instead of the config file's directory.
    pub use_cwd: bool,
    /// Data directory or database file.
    pub data: Option<PathBuf>,
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    }
}

fn is_db_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "db" || ext == "sqlite" || ext == "sqlite3")
        || path.is_file()
}

/// Look for `evidence.{ext}` or `config.{ext}` inside a data directory.
fn find_config_next_to_db(data_dir: &Path) -> Option<PathBuf> {
    let extensions = ["json", "yaml", "yml", "toml"];
    let basenames = ["evidence", "config"];

    for basename in basenames {
        for ext in extensions {
            let path = data_dir.join(format!("{}.{}", basename, ext));
            if path.exists() {
                return Some(path);
            }
        }
    }
    None
}

async fn load_file_config(options: &LoadOptions, data_dir: Option<&Path>) -> Config {
    if let Some(ref config_path) = options.config_path {
        return Config::load_from_path(config_path)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("{}", e);
                Config::default()
            });
    }

    if let Some(config_path) = data_dir.and_then(find_config_next_to_db) {
        tracing::debug!("Found config next to data dir: {}", config_path.display());
        return Config::load_from_path(&config_path)
            .await
            .unwrap_or_else(|_| Config::default());
    }

    Config::load().await
}

/// Load settings with explicit options.
pub async fn load_settings_with_options(options: LoadOptions) -> (Settings, Config) {
    // --data may name the database file itself or its directory
    let data = options.data.as_deref().map(absolute);
    let (data_dir, database_filename) = match &data {
        Some(path) if is_db_file(path) => (
            path.parent().map(Path::to_path_buf),
            path.file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string),
        ),
        Some(path) => (Some(path.clone()), None),
        None => (None, None),
    };

    let config = load_file_config(&options, data_dir.as_deref()).await;
    let mut settings = Settings::default();

    let base_dir = if options.use_cwd {
        absolute(Path::new("."))
    } else {
        config
            .base_dir()
            .unwrap_or_else(|| absolute(Path::new(".")))
    };
    config.apply_to_settings(&mut settings, &base_dir);

    if let Some(dir) = data_dir {
        settings.data_dir = dir;
    }
    if let Some(filename) = database_filename {
        settings.database_filename = filename;
    }

    settings.apply_env(|name| std::env::var(name).ok());
    (settings, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::with_data_dir(PathBuf::from("/data"));
        settings.apply_env(env(&[
            (ENV_MODE, "remote"),
            (ENV_REMOTE_URL, "postgres://evidence@db.example.org/evidence"),
            (ENV_REMOTE_KEY, "k1"),
            (ENV_NO_TLS, "true"),
        ]));
        assert_eq!(settings.mode, DeploymentMode::Remote);
        assert_eq!(settings.remote.key.as_deref(), Some("k1"));
        assert!(settings.remote.no_tls);
        assert_eq!(settings.database_path(), PathBuf::from("/data/evidence.db"));
    }

    #[test]
    fn test_remote_requires_url_and_key() {
        let mut settings = Settings::default();
        settings.mode = DeploymentMode::Remote;
        assert!(settings.remote_credentials().is_err());

        settings.remote.url = Some("https://example.org".to_string());
        settings.remote.key = Some("k".to_string());
        assert!(settings.remote_credentials().is_err());
    }

    #[test]
    fn test_secrets_file_supplies_key() {
        let dir = tempdir().unwrap();
        let secrets = dir.path().join("secrets.toml");
        std::fs::write(&secrets, "[remote]\nurl = \"ignored\"\nkey = \"from-file\"\n").unwrap();

        let mut settings = Settings::default();
        settings.remote.url = Some("postgres://evidence@db.example.org/evidence".to_string());
        settings.remote.key = Some("from-config".to_string());
        settings.secrets_path = Some(secrets.clone());

        let credentials = settings.remote_credentials().unwrap();
        let url = credentials.database_url().unwrap();
        assert!(url.contains(":from-file@"));

        std::fs::write(&secrets, "[remote]\nkey = \"rotated\"\n").unwrap();
        assert!(credentials.database_url().unwrap().contains(":rotated@"));
    }

    #[tokio::test]
    async fn test_load_toml_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("evidence.toml");
        std::fs::write(
            &path,
            "data_dir = \"./store\"\nmode = \"embedded\"\nsearch_limit = 50\nimport_idle_minutes = 5\n\n[remote]\nno_tls = true\n",
        )
        .unwrap();

        let config = Config::load_from_path(&path).await.unwrap();
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, &config.base_dir().unwrap());
        assert_eq!(settings.data_dir, dir.path().join("store"));
        assert_eq!(settings.search_limit, 50);
        assert_eq!(settings.import_idle_timeout, Duration::from_secs(300));
        assert!(settings.remote.no_tls);
        assert_eq!(settings.mode, DeploymentMode::Embedded);
    }
}
