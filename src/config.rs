//! Configuration file handling for kakeibo.
//!
//! The configuration file is stored at `$KAKEIBO_HOME/config.json` and says which backend holds the
//! expenses, how receipts are replaced and how long receipt links stay valid.

use crate::db::Db;
use crate::error::{ErrorType, IntoResult, Res, Result};
use crate::utils;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "kakeibo";
const CONFIG_VERSION: u8 = 1;
const SECRETS: &str = ".secrets";
const RECEIPTS_DIR: &str = "receipts";
const CONFIG_JSON: &str = "config.json";
const SESSION_JSON: &str = "session.json";
const KAKEIBO_SQLITE: &str = "kakeibo.sqlite";

/// How long a receipt preview link is valid, in seconds.
pub const DEFAULT_SIGNED_URL_TTL: u64 = 3600;

/// Where expense rows and receipt images are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Backend {
    /// The SQLite database and `receipts` directory inside `$KAKEIBO_HOME`.
    Local { user_id: String },
    /// A hosted Supabase project.
    Supabase { url: String, anon_key: String },
}

/// The order of the steps when an expense that already has a receipt gets a new one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptReplacement {
    /// Delete the old image, then upload the new one.
    #[default]
    DeleteFirst,
    /// Upload the new image and update the row, then delete the old image.
    UploadFirst,
}

serde_plain::derive_display_from_serialize!(ReceiptReplacement);
serde_plain::derive_fromstr_from_deserialize!(ReceiptReplacement);

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$KAKEIBO_HOME` and from there it loads `$KAKEIBO_HOME/config.json`. It provides
/// paths to the other items that live in the home directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    secrets: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
}

impl Config {
    /// Creates the data directory, its subdirectories and an initial `config.json`. For the local
    /// backend it also creates the SQLite database.
    ///
    /// # Errors
    /// - Returns an error if `config.json` already exists or any file operation fails.
    pub async fn create(dir: impl Into<PathBuf>, backend: Backend) -> Result<Self> {
        Self::create_inner(dir.into(), backend)
            .await
            .pub_result(ErrorType::Config)
    }

    /// This will
    /// - validate that `$KAKEIBO_HOME` exists and that the config file exists
    /// - load the config file
    /// - validate that the secrets directory exists
    pub async fn load(kakeibo_home: impl Into<PathBuf>) -> Result<Self> {
        Self::load_inner(kakeibo_home.into())
            .await
            .pub_result(ErrorType::Config)
    }

    async fn create_inner(maybe_relative: PathBuf, backend: Backend) -> Res<Self> {
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the kakeibo home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if config_path.exists() {
            bail!(
                "A configuration already exists at '{}'",
                config_path.display()
            );
        }

        let secrets = root.join(SECRETS);
        utils::make_dir(&secrets).await?;
        utils::make_dir(root.join(RECEIPTS_DIR)).await?;

        if let Backend::Local { .. } = &backend {
            Db::init(root.join(KAKEIBO_SQLITE))
                .await
                .context("Unable to create SQLite DB")?;
        }

        let config_file = ConfigFile::new(backend);
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            secrets,
            config_path,
            config_file,
        })
    }

    async fn load_inner(maybe_relative: PathBuf) -> Res<Self> {
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("Kakeibo home is missing, run 'kakeibo init' first")?;
        let _ = utils::read_dir(&root)
            .await
            .context("Kakeibo home is missing")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let config = Self {
            secrets: root.join(SECRETS),
            root,
            config_path,
            config_file,
        };
        if !config.secrets.is_dir() {
            bail!(
                "The secrets directory is missing '{}'",
                config.secrets.display()
            )
        }
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn backend(&self) -> &Backend {
        &self.config_file.backend
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    pub fn session_path(&self) -> PathBuf {
        self.secrets.join(SESSION_JSON)
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.root.join(KAKEIBO_SQLITE)
    }

    pub fn receipts_dir(&self) -> PathBuf {
        self.root.join(RECEIPTS_DIR)
    }

    pub fn receipt_replacement(&self) -> ReceiptReplacement {
        self.config_file.receipt_replacement
    }

    pub fn signed_url_ttl(&self) -> u64 {
        self.config_file.signed_url_ttl
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "kakeibo",
///   "config_version": 1,
///   "backend": {
///     "type": "supabase",
///     "url": "https://xyzcompany.supabase.co",
///     "anon_key": "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9..."
///   },
///   "receipt_replacement": "delete_first",
///   "signed_url_ttl": 3600
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "kakeibo"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    backend: Backend,

    #[serde(default)]
    receipt_replacement: ReceiptReplacement,

    /// Lifetime of receipt preview links, in seconds
    #[serde(default = "default_signed_url_ttl")]
    signed_url_ttl: u64,
}

fn default_signed_url_ttl() -> u64 {
    DEFAULT_SIGNED_URL_TTL
}

impl ConfigFile {
    fn new(backend: Backend) -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            backend,
            receipt_replacement: ReceiptReplacement::default(),
            signed_url_ttl: DEFAULT_SIGNED_URL_TTL,
        }
    }

    /// Loads a ConfigFile from `path`, checking that it belongs to this program.
    async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        anyhow::ensure!(
            config.config_version <= CONFIG_VERSION,
            "Config file version {} is newer than this program supports ({})",
            config.config_version,
            CONFIG_VERSION
        );

        Ok(config)
    }

    async fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use tempfile::TempDir;

    fn supabase() -> Backend {
        Backend::Supabase {
            url: "https://abc.supabase.co".to_string(),
            anon_key: "anon".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_local() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("kakeibo_home");
        let backend = Backend::Local {
            user_id: "user-1".to_string(),
        };
        let config = Config::create(&home, backend.clone()).await.unwrap();

        assert_eq!(config.backend(), &backend);
        assert!(config.secrets().is_dir());
        assert!(config.receipts_dir().is_dir());
        assert!(config.sqlite_path().is_file());
        assert_eq!(config.receipt_replacement(), ReceiptReplacement::DeleteFirst);
        assert_eq!(config.signed_url_ttl(), 3600);

        let loaded = Config::load(&home).await.unwrap();
        assert_eq!(loaded.backend(), &backend);
        assert_eq!(loaded.root(), config.root());
    }

    #[tokio::test]
    async fn test_create_supabase_has_no_db() {
        let dir = TempDir::new().unwrap();
        let config = Config::create(dir.path(), supabase()).await.unwrap();
        assert!(!config.sqlite_path().exists());
        assert_eq!(
            config.session_path(),
            config.root().join(".secrets").join("session.json")
        );
    }

    #[tokio::test]
    async fn test_create_twice_fails() {
        let dir = TempDir::new().unwrap();
        Config::create(dir.path(), supabase()).await.unwrap();
        assert!(Config::create(dir.path(), supabase()).await.is_err());
    }

    #[tokio::test]
    async fn test_load_missing_home() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(dir.path().join("nope")).await.unwrap_err();
        assert!(format!("{err:#}").contains("kakeibo init"));
    }

    #[tokio::test]
    async fn test_load_minimal_file() {
        let dir = TempDir::new().unwrap();
        let json = r#"{
            "app_name": "kakeibo",
            "config_version": 1,
            "backend": { "type": "local", "user_id": "u" }
        }"#;
        utils::write(dir.path().join("config.json"), json).await.unwrap();
        utils::make_dir(dir.path().join(".secrets")).await.unwrap();

        let config = Config::load(dir.path()).await.unwrap();
        assert_eq!(
            config.backend(),
            &Backend::Local {
                user_id: "u".to_string()
            }
        );
        assert_eq!(config.receipt_replacement(), ReceiptReplacement::DeleteFirst);
        assert_eq!(config.signed_url_ttl(), DEFAULT_SIGNED_URL_TTL);
    }

    #[tokio::test]
    async fn test_load_invalid_app_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let json = r#"{
            "app_name": "ledger",
            "config_version": 1,
            "backend": { "type": "local", "user_id": "u" }
        }"#;
        utils::write(&path, json).await.unwrap();
        let err = ConfigFile::load(&path).await.unwrap_err();
        assert!(err.to_string().contains("Invalid app_name"));
    }

    #[tokio::test]
    async fn test_save_and_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let mut original = ConfigFile::new(supabase());
        original.receipt_replacement = ReceiptReplacement::UploadFirst;
        original.signed_url_ttl = 60;
        original.save(&path).await.unwrap();

        let text = utils::read(&path).await.unwrap();
        assert!(text.contains(r#""type": "supabase""#));
        assert!(text.contains(r#""receipt_replacement": "upload_first""#));
        assert_eq!(ConfigFile::load(&path).await.unwrap(), original);
    }

    #[test]
    fn test_receipt_replacement_strings() {
        assert_eq!(ReceiptReplacement::DeleteFirst.to_string(), "delete_first");
        assert_eq!(
            ReceiptReplacement::from_str("upload_first").unwrap(),
            ReceiptReplacement::UploadFirst
        );
    }
}
