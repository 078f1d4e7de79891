use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::bail;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_stream::wrappers::ReadDirStream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{Storage, StorageError, StorageResult};
use crate::models::PasteRecord;

const CONTENT_EXT: &str = "txt";
const SIDECAR_EXT: &str = "json";

/// Stores each paste as `<id>.txt` holding the content next to an `<id>.json`
/// sidecar holding everything else.
///
/// A paste exists once its sidecar does. Both files are written to a temporary
/// name and renamed into place, content first.
#[derive(Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Sidecar {
    id: String,
    title: String,
    syntax: String,
    visibility: String,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    views: i64,
}

impl Sidecar {
    fn from_record(paste: &PasteRecord) -> Self {
        Sidecar {
            id: paste.id.clone(),
            title: paste.title.clone(),
            syntax: paste.syntax.clone(),
            visibility: paste.visibility.clone(),
            created_at: paste.created_at,
            expires_at: paste.expires_at,
            views: paste.views,
        }
    }

    fn into_record(self, content: String) -> PasteRecord {
        PasteRecord {
            id: self.id,
            content,
            title: self.title,
            syntax: self.syntax,
            visibility: self.visibility,
            created_at: self.created_at,
            expires_at: self.expires_at,
            views: self.views,
        }
    }
}

impl FileStorage {
    /// Open a storage directory, creating it if needed.
    pub async fn new(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir: PathBuf = dir.into();

        fs::create_dir_all(&dir).await?;

        if !fs::metadata(&dir).await?.is_dir() {
            bail!("not a directory: {}", dir.display());
        }

        Ok(FileStorage { dir })
    }

    /// Path of a paste's file, or `None` if the id can't name a file in our directory.
    fn path(&self, id: &str, ext: &str) -> Option<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| self.dir.join(format!("{id}.{ext}")))
    }

    async fn write_atomic(&self, path: &Path, data: &[u8]) -> std::io::Result<()> {
        let tmp = self.dir.join(format!(".{}.tmp", Uuid::new_v4().simple()));

        let mut file = fs::File::create(&tmp).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        if let Err(error) = fs::rename(&tmp, path).await {
            _ = fs::remove_file(&tmp).await;
            return Err(error);
        }
        Ok(())
    }

    async fn read_sidecar(&self, id: &str) -> StorageResult<Option<Sidecar>> {
        let Some(path) = self.path(id, SIDECAR_EXT) else {
            return Ok(None);
        };

        match fs::read(&path).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    async fn read(&self, id: &str) -> StorageResult<Option<PasteRecord>> {
        let Some(sidecar) = self.read_sidecar(id).await? else {
            return Ok(None);
        };
        let Some(path) = self.path(id, CONTENT_EXT) else {
            return Ok(None);
        };

        let content = fs::read_to_string(path).await?;
        Ok(Some(sidecar.into_record(content)))
    }
}

impl Storage for FileStorage {
    async fn put(&mut self, paste: &PasteRecord) -> StorageResult<()> {
        let (Some(content_path), Some(sidecar_path)) = (
            self.path(&paste.id, CONTENT_EXT),
            self.path(&paste.id, SIDECAR_EXT),
        ) else {
            return Err(std::io::Error::new(ErrorKind::InvalidInput, "invalid paste id").into());
        };

        match fs::metadata(&sidecar_path).await {
            Ok(_) => {
                return Err(StorageError::Duplicate {
                    id: paste.id.clone(),
                })
            }
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => return Err(error.into()),
        }

        let sidecar = serde_json::to_vec_pretty(&Sidecar::from_record(paste))?;

        self.write_atomic(&content_path, paste.content.as_bytes())
            .await?;
        self.write_atomic(&sidecar_path, &sidecar).await?;

        Ok(())
    }

    async fn get(&mut self, id: &str) -> StorageResult<Option<PasteRecord>> {
        self.read(id).await
    }

    async fn list_all(&mut self) -> StorageResult<Vec<PasteRecord>> {
        let mut entries = ReadDirStream::new(fs::read_dir(&self.dir).await?);

        let mut ids = Vec::new();
        while let Some(entry) = entries.next().await {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(SIDECAR_EXT) {
                continue;
            }
            match path.file_stem().and_then(|stem| stem.to_str()) {
                Some(id) if !id.starts_with('.') => ids.push(id.to_owned()),
                _ => debug!("skipping unexpected file {}", path.display()),
            }
        }

        // a broken record shouldn't hide every other paste
        let results = join_all(ids.iter().map(|id| self.read(id))).await;
        let pastes = ids
            .iter()
            .zip(results)
            .filter_map(|(id, result)| match result {
                Ok(paste) => paste,
                Err(error) => {
                    warn!("skipping unreadable paste '{id}': {error:?}");
                    None
                }
            })
            .collect();
        Ok(pastes)
    }

    async fn increment_views(&mut self, id: &str) -> StorageResult<()> {
        let Some(mut sidecar) = self.read_sidecar(id).await? else {
            return Ok(());
        };
        let Some(path) = self.path(id, SIDECAR_EXT) else {
            return Ok(());
        };

        sidecar.views += 1;
        self.write_atomic(&path, &serde_json::to_vec_pretty(&sidecar)?)
            .await?;

        Ok(())
    }
}
