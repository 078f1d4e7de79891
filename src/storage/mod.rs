//! Paste persistence.
//!
//! Every backend stores whole [`PasteRecord`]s keyed by id. Liveness is not
//! the store's concern: expired records are returned like any other.

use anyhow::Context;
use thiserror::Error;
use tracing::info;

use crate::config::{self, StorageKind};
use crate::models::PasteRecord;

pub mod file;
#[cfg(feature = "s3")]
pub mod s3;
pub mod sql;

pub use file::FileStorage;
#[cfg(feature = "s3")]
pub use self::s3::S3Storage;
pub use sql::SqlStorage;

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StorageError {
    #[error("paste {id} already exists")]
    Duplicate { id: String },
    #[error("IO error")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("database error")]
    Database {
        #[from]
        source: sqlx::Error,
    },
    #[error("malformed stored record")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
    #[error("malformed stored timestamp")]
    Timestamp {
        #[from]
        source: chrono::ParseError,
    },
    #[error("S3 error")]
    #[cfg(feature = "s3")]
    S3 {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

#[allow(async_fn_in_trait)]
pub trait Storage {
    /// Persist a new paste.
    async fn put(&mut self, paste: &PasteRecord) -> StorageResult<()>;

    /// Get a paste by id, whether or not it has expired.
    async fn get(&mut self, id: &str) -> StorageResult<Option<PasteRecord>>;

    /// Get every stored paste, in no particular order.
    async fn list_all(&mut self) -> StorageResult<Vec<PasteRecord>>;

    /// Bump the view counter of a paste. Best effort under concurrent readers.
    async fn increment_views(&mut self, id: &str) -> StorageResult<()>;

    /// Release any resources held by the backend.
    async fn close(&mut self) -> StorageResult<()> {
        Ok(())
    }
}

#[derive(Clone)]
pub enum AnyStorage {
    File(FileStorage),
    Sql(SqlStorage),
    #[cfg(feature = "s3")]
    S3(S3Storage),
}

impl AnyStorage {
    /// Open the backend selected in the config.
    pub async fn open(config: &config::Storage) -> anyhow::Result<Self> {
        info!("opening {:?} storage", config.kind);

        let storage: AnyStorage = match config.kind {
            StorageKind::File => {
                let file = config
                    .file
                    .as_ref()
                    .context("missing [storage.file] config")?;
                FileStorage::new(file.dir.clone()).await?.into()
            }
            StorageKind::Sql => {
                let sql = config.sql.as_ref().context("missing [storage.sql] config")?;
                SqlStorage::connect(&sql.url, sql.max_connections)
                    .await
                    .context("failed to connect to database")?
                    .into()
            }
            #[cfg(feature = "s3")]
            StorageKind::S3 => {
                let s3 = config.s3.as_ref().context("missing [storage.s3] config")?;
                S3Storage::new(
                    &s3.bucket,
                    s3.region.as_deref(),
                    s3.endpoint.as_deref(),
                    &s3.prefix,
                )
                .await
                .into()
            }
        };

        Ok(storage)
    }
}

impl Storage for AnyStorage {
    async fn put(&mut self, paste: &PasteRecord) -> StorageResult<()> {
        match self {
            AnyStorage::File(file) => file.put(paste).await,
            AnyStorage::Sql(sql) => sql.put(paste).await,
            #[cfg(feature = "s3")]
            AnyStorage::S3(s3) => s3.put(paste).await,
        }
    }

    async fn get(&mut self, id: &str) -> StorageResult<Option<PasteRecord>> {
        match self {
            AnyStorage::File(file) => file.get(id).await,
            AnyStorage::Sql(sql) => sql.get(id).await,
            #[cfg(feature = "s3")]
            AnyStorage::S3(s3) => s3.get(id).await,
        }
    }

    async fn list_all(&mut self) -> StorageResult<Vec<PasteRecord>> {
        match self {
            AnyStorage::File(file) => file.list_all().await,
            AnyStorage::Sql(sql) => sql.list_all().await,
            #[cfg(feature = "s3")]
            AnyStorage::S3(s3) => s3.list_all().await,
        }
    }

    async fn increment_views(&mut self, id: &str) -> StorageResult<()> {
        match self {
            AnyStorage::File(file) => file.increment_views(id).await,
            AnyStorage::Sql(sql) => sql.increment_views(id).await,
            #[cfg(feature = "s3")]
            AnyStorage::S3(s3) => s3.increment_views(id).await,
        }
    }

    async fn close(&mut self) -> StorageResult<()> {
        match self {
            AnyStorage::File(file) => file.close().await,
            AnyStorage::Sql(sql) => sql.close().await,
            #[cfg(feature = "s3")]
            AnyStorage::S3(s3) => s3.close().await,
        }
    }
}

impl From<FileStorage> for AnyStorage {
    fn from(value: FileStorage) -> Self {
        AnyStorage::File(value)
    }
}

impl From<SqlStorage> for AnyStorage {
    fn from(value: SqlStorage) -> Self {
        AnyStorage::Sql(value)
    }
}

#[cfg(feature = "s3")]
impl From<S3Storage> for AnyStorage {
    fn from(value: S3Storage) -> Self {
        AnyStorage::S3(value)
    }
}
