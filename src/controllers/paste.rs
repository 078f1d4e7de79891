use chrono::{DateTime, Utc};
use rand::{thread_rng, Rng};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::expiry::parse_expiry;
use crate::models::{NewPaste, PasteRecord};
use crate::storage::Storage;

/// Paste lifecycle on top of any [`Storage`] backend.
#[derive(Clone)]
pub struct PasteService<S> {
    storage: S,
}

/// A fresh random paste id: 16 hex digits.
pub fn generate_id() -> String {
    format!("{:016x}", thread_rng().gen::<u64>())
}

impl<S: Storage> PasteService<S> {
    pub fn new(storage: S) -> Self {
        PasteService { storage }
    }

    /// Store a new paste, returning its id.
    pub async fn create_paste(&mut self, new: NewPaste) -> AppResult<String> {
        let now = Utc::now();
        let paste = PasteRecord {
            id: generate_id(),
            expires_at: parse_expiry(now, &new.expires),
            content: new.content,
            title: new.title,
            syntax: new.syntax,
            visibility: new.visibility,
            created_at: now,
            views: 0,
        };

        info!(
            "new paste: id='{id}', size={size}, expires={expires:?}",
            id = paste.id,
            size = paste.content.len(),
            expires = paste.expires_at,
        );

        self.storage.put(&paste).await?;
        Ok(paste.id)
    }

    /// Fetch a paste that hasn't expired, counting the view.
    pub async fn get_live_paste(&mut self, id: &str) -> AppResult<PasteRecord> {
        let mut paste = match self.storage.get(id).await? {
            Some(paste) if paste.is_live(Utc::now()) => paste,
            _ => return Err(AppError::NotFound),
        };

        self.storage.increment_views(id).await?;
        paste.views += 1;

        Ok(paste)
    }

    /// The `n` largest live pastes, largest first.
    pub async fn list_top(&mut self, n: usize) -> AppResult<Vec<PasteRecord>> {
        let mut pastes = self.live_pastes(Utc::now()).await?;
        pastes.sort_by(|a, b| {
            b.size()
                .cmp(&a.size())
                .then_with(|| a.id.cmp(&b.id))
        });
        pastes.truncate(n);
        Ok(pastes)
    }

    /// The `n` most recently created live pastes, newest first.
    pub async fn list_recent(&mut self, n: usize) -> AppResult<Vec<PasteRecord>> {
        let mut pastes = self.live_pastes(Utc::now()).await?;
        pastes.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        pastes.truncate(n);
        Ok(pastes)
    }

    /// Release the underlying storage.
    pub async fn close(&mut self) -> AppResult<()> {
        Ok(self.storage.close().await?)
    }

    async fn live_pastes(&mut self, now: DateTime<Utc>) -> AppResult<Vec<PasteRecord>> {
        let mut pastes = self.storage.list_all().await?;
        pastes.retain(|paste| paste.is_live(now));
        Ok(pastes)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use chrono::Duration;
    use tempfile::TempDir;

    use super::*;
    use crate::models::tests::record;
    use crate::storage::FileStorage;

    async fn service() -> (PasteService<FileStorage>, FileStorage, TempDir) {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).await.unwrap();
        (PasteService::new(storage.clone()), storage, dir)
    }

    fn ids(pastes: &[PasteRecord]) -> Vec<&str> {
        pastes.iter().map(|paste| paste.id.as_str()).collect()
    }

    #[test]
    fn ids_are_long_hex() {
        let id = generate_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(generate_id(), generate_id());
    }

    #[tokio::test]
    async fn created_paste_can_be_read() {
        let (mut service, _, _dir) = service().await;

        let id = service
            .create_paste(NewPaste::new("hello").title("greeting"))
            .await
            .unwrap();
        let paste = service.get_live_paste(&id).await.unwrap();

        assert_eq!(paste.id, id);
        assert_eq!(paste.content, "hello");
        assert_eq!(paste.title, "greeting");
        assert_eq!(paste.syntax, "none");
        assert_eq!(paste.visibility, "public");
        assert_eq!(paste.expires_at, None);
    }

    #[tokio::test]
    async fn expiry_is_derived_from_creation_time() {
        let (mut service, mut storage, _dir) = service().await;

        let id = service
            .create_paste(NewPaste::new("soon gone").expires("2h"))
            .await
            .unwrap();
        let paste = storage.get(&id).await.unwrap().unwrap();

        assert_eq!(paste.expires_at, Some(paste.created_at + Duration::hours(2)));
    }

    #[tokio::test]
    async fn malformed_expiry_never_expires() {
        let (mut service, mut storage, _dir) = service().await;

        let id = service
            .create_paste(NewPaste::new("kept").expires("tomorrow"))
            .await
            .unwrap();

        assert_eq!(storage.get(&id).await.unwrap().unwrap().expires_at, None);
    }

    #[tokio::test]
    async fn unknown_paste_is_not_found() {
        let (mut service, _, _dir) = service().await;
        assert!(matches!(
            service.get_live_paste("0000000000000000").await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn expired_paste_is_not_found() {
        let (mut service, mut storage, _dir) = service().await;
        let now = Utc::now();
        let mut paste = record("aaaa", "stale", now - Duration::hours(2));
        paste.expires_at = Some(now - Duration::hours(1));
        storage.put(&paste).await.unwrap();

        assert!(matches!(
            service.get_live_paste("aaaa").await,
            Err(AppError::NotFound)
        ));
        // still stored, just hidden
        assert!(storage.get("aaaa").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn short_lived_paste_expires() {
        let (mut service, _, _dir) = service().await;

        let id = service
            .create_paste(NewPaste::new("hello").expires("1s"))
            .await
            .unwrap();
        assert!(service.get_live_paste(&id).await.is_ok());

        tokio::time::sleep(StdDuration::from_millis(1100)).await;

        assert!(matches!(
            service.get_live_paste(&id).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn views_are_counted() {
        let (mut service, _, _dir) = service().await;
        let id = service.create_paste(NewPaste::new("look")).await.unwrap();

        let first = service.get_live_paste(&id).await.unwrap().views;
        let second = service.get_live_paste(&id).await.unwrap().views;

        assert!(first >= 1);
        assert!(second >= first);
    }

    #[tokio::test]
    async fn top_is_largest_first() {
        let (mut service, mut storage, _dir) = service().await;
        let now = Utc::now();
        for (id, content) in [("a", "12345"), ("b", "1"), ("c", "123456789"), ("d", "123")] {
            storage.put(&record(id, content, now)).await.unwrap();
        }

        let top = service.list_top(3).await.unwrap();

        assert_eq!(ids(&top), ["c", "a", "d"]);
    }

    #[tokio::test]
    async fn top_skips_expired() {
        let (mut service, mut storage, _dir) = service().await;
        let now = Utc::now();
        let mut big = record("big", &"x".repeat(100), now - Duration::days(1));
        big.expires_at = Some(now - Duration::minutes(1));
        storage.put(&big).await.unwrap();
        storage.put(&record("small", "x", now)).await.unwrap();

        assert_eq!(ids(&service.list_top(10).await.unwrap()), ["small"]);
        assert_eq!(ids(&service.list_recent(10).await.unwrap()), ["small"]);
    }

    #[tokio::test]
    async fn top_ties_are_stable() {
        let (mut service, mut storage, _dir) = service().await;
        let now = Utc::now();
        for id in ["m", "z", "b", "q"] {
            storage.put(&record(id, "same", now)).await.unwrap();
        }

        let first = service.list_top(10).await.unwrap();
        let second = service.list_top(10).await.unwrap();

        assert_eq!(ids(&first), ["b", "m", "q", "z"]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn recent_is_newest_first() {
        let (mut service, mut storage, _dir) = service().await;
        let t1 = Utc::now() - Duration::minutes(3);
        let t2 = t1 + Duration::minutes(1);
        let t3 = t2 + Duration::minutes(1);
        storage.put(&record("t2", "x", t2)).await.unwrap();
        storage.put(&record("t3", "x", t3)).await.unwrap();
        storage.put(&record("t1", "x", t1)).await.unwrap();

        let recent = service.list_recent(2).await.unwrap();

        assert_eq!(ids(&recent), ["t3", "t2"]);
    }

    #[tokio::test]
    async fn empty_store_lists_nothing() {
        let (mut service, _, _dir) = service().await;
        assert!(service.list_top(10).await.unwrap().is_empty());
        assert!(service.list_recent(10).await.unwrap().is_empty());
    }
}
