use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use directories_next::ProjectDirs;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind")]
    pub bind: IpAddr,
    pub port: u16,
    pub storage: Storage,
    pub limits: Limits,
    pub health: Option<Health>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    pub kind: StorageKind,
    pub file: Option<FileStorage>,
    pub sql: Option<SqlStorage>,
    #[cfg(feature = "s3")]
    pub s3: Option<S3Storage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileStorage {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SqlStorage {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[cfg(feature = "s3")]
pub struct S3Storage {
    pub bucket: String,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    #[serde(default = "default_s3_prefix")]
    pub prefix: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    File,
    Sql,
    #[cfg(feature = "s3")]
    S3,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Limits {
    pub max_upload_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Health {
    pub ping_url: String,
    #[serde(default = "default_ping_interval")]
    pub interval_secs: u64,
}

fn default_bind() -> IpAddr {
    [127, 0, 0, 1].into()
}

fn default_max_connections() -> u32 {
    5
}

#[cfg(feature = "s3")]
fn default_s3_prefix() -> String {
    "pastes/".to_owned()
}

fn default_ping_interval() -> u64 {
    300
}

impl Config {
    /// Read and parse a TOML config file.
    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        text.parse()
    }

    /// The config file used when none is given: the platform config directory if
    /// it has one, otherwise `config.toml` in the working directory.
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "tinybin")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .filter(|path| path.exists())
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}

impl std::str::FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("failed to parse config")
    }
}
