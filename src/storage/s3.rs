use aws_config::retry::RetryConfig;
use aws_sdk_s3 as s3;
use futures_util::future::try_join_all;
use tracing::debug;

use super::{Storage, StorageError, StorageResult};
use crate::models::PasteRecord;

/// One JSON object per paste, under a common key prefix.
#[derive(Clone)]
pub struct S3Storage {
    client: s3::Client,
    bucket: String,
    prefix: String,
}

fn s3_error(source: impl std::error::Error + Send + Sync + 'static) -> StorageError {
    StorageError::S3 {
        source: Box::new(source),
    }
}

impl S3Storage {
    pub async fn new(
        bucket: &str,
        region: Option<&str>,
        endpoint: Option<&str>,
        prefix: &str,
    ) -> Self {
        let client = {
            let mut config_loader = aws_config::from_env().retry_config(RetryConfig::disabled());
            if let Some(region) = region {
                config_loader = config_loader.region(s3::config::Region::new(region.to_owned()));
            }
            if let Some(endpoint) = endpoint {
                config_loader = config_loader.endpoint_url(endpoint);
            }
            let sdk_config = config_loader.load().await;

            s3::Client::new(&sdk_config)
        };

        S3Storage {
            client,
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    fn key(&self, id: &str) -> String {
        format!("{}{id}.json", self.prefix)
    }

    async fn read_key(&self, key: &str) -> StorageResult<Option<PasteRecord>> {
        let object = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(object) => object,
            Err(error) => {
                let error = error.into_service_error();
                if error.is_no_such_key() {
                    return Ok(None);
                }
                return Err(s3_error(error));
            }
        };

        let bytes = object.body.collect().await.map_err(s3_error)?.into_bytes();
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn write(&self, paste: &PasteRecord) -> StorageResult<()> {
        let data = serde_json::to_vec(paste)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.key(&paste.id))
            .content_type("application/json")
            .body(bytes::Bytes::from(data).into())
            .send()
            .await
            .map_err(s3_error)?;
        Ok(())
    }

    async fn exists(&self, id: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(self.key(id))
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(error) => {
                let error = error.into_service_error();
                if error.is_not_found() {
                    Ok(false)
                } else {
                    Err(s3_error(error))
                }
            }
        }
    }
}

impl Storage for S3Storage {
    async fn put(&mut self, paste: &PasteRecord) -> StorageResult<()> {
        if self.exists(&paste.id).await? {
            return Err(StorageError::Duplicate {
                id: paste.id.clone(),
            });
        }
        self.write(paste).await
    }

    async fn get(&mut self, id: &str) -> StorageResult<Option<PasteRecord>> {
        self.read_key(&self.key(id)).await
    }

    async fn list_all(&mut self) -> StorageResult<Vec<PasteRecord>> {
        let mut keys = Vec::new();
        let mut continuation_token = None;

        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&self.prefix)
                .set_continuation_token(continuation_token)
                .send()
                .await
                .map_err(s3_error)?;

            keys.extend(
                page.contents()
                    .unwrap_or_default()
                    .iter()
                    .filter_map(|object| object.key())
                    .filter(|key| key.ends_with(".json"))
                    .map(str::to_owned),
            );

            match page.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_owned()),
                None => break,
            }
        }

        debug!("listing {} pastes from s3", keys.len());

        let pastes = try_join_all(keys.iter().map(|key| self.read_key(key))).await?;
        Ok(pastes.into_iter().flatten().collect())
    }

    async fn increment_views(&mut self, id: &str) -> StorageResult<()> {
        if let Some(mut paste) = self.get(id).await? {
            paste.views += 1;
            self.write(&paste).await?;
        }
        Ok(())
    }
}
