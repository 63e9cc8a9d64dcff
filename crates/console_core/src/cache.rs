//! Per-page snapshot cache backed by a durable store.
//!
//! Reads are served from memory. Writes land in memory first and are then
//! written through to the store; a failed durable write is logged and the
//! in-memory value keeps serving the session.

use std::{collections::BTreeMap, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use shared::{
    domain::{PageNumber, PageSnapshot},
    error::ReorderResult,
};
use storage::{Storage, StoredSession};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Durable key space: one entry per page, the current page, the session.
#[async_trait]
pub trait PageStore: Send + Sync {
    async fn list_pages(&self) -> Result<Vec<PageNumber>>;
    async fn load_snapshot(&self, page: PageNumber) -> Result<Option<PageSnapshot>>;
    async fn save_snapshot(&self, page: PageNumber, snapshot: &PageSnapshot) -> Result<()>;
    async fn load_current_page(&self) -> Result<Option<PageNumber>>;
    async fn save_current_page(&self, page: PageNumber) -> Result<()>;
    async fn load_session(&self) -> Result<Option<StoredSession>>;
    async fn save_session(&self, session: &StoredSession) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

#[async_trait]
impl PageStore for Storage {
    async fn list_pages(&self) -> Result<Vec<PageNumber>> {
        self.list_snapshot_pages().await
    }

    async fn load_snapshot(&self, page: PageNumber) -> Result<Option<PageSnapshot>> {
        self.load_page_snapshot(page).await
    }

    async fn save_snapshot(&self, page: PageNumber, snapshot: &PageSnapshot) -> Result<()> {
        self.save_page_snapshot(page, snapshot).await
    }

    async fn load_current_page(&self) -> Result<Option<PageNumber>> {
        Storage::load_current_page(self).await
    }

    async fn save_current_page(&self, page: PageNumber) -> Result<()> {
        Storage::save_current_page(self, page).await
    }

    async fn load_session(&self) -> Result<Option<StoredSession>> {
        Storage::load_session(self).await
    }

    async fn save_session(&self, session: &StoredSession) -> Result<()> {
        Storage::save_session(self, session).await
    }

    async fn clear(&self) -> Result<()> {
        self.clear_all().await
    }
}

pub struct PageCache {
    store: Arc<dyn PageStore>,
    entries: RwLock<BTreeMap<PageNumber, PageSnapshot>>,
    // Serialises read-modify-write cycles and keeps durable writes in the
    // same order as the in-memory ones.
    writer: Mutex<()>,
}

impl PageCache {
    /// Loads every persisted snapshot. Unreadable entries are skipped.
    pub async fn restore(store: Arc<dyn PageStore>) -> Self {
        let mut entries = BTreeMap::new();
        match store.list_pages().await {
            Ok(pages) => {
                for page in pages {
                    match store.load_snapshot(page).await {
                        Ok(Some(snapshot)) => {
                            entries.insert(page, snapshot);
                        }
                        Ok(None) => {}
                        Err(err) => {
                            warn!(
                                page = page.get(),
                                error = %err,
                                "skipping unreadable page snapshot"
                            )
                        }
                    }
                }
            }
            Err(err) => warn!(error = %err, "failed to list persisted page snapshots"),
        }
        debug!(pages = entries.len(), "page cache restored");

        Self {
            store,
            entries: RwLock::new(entries),
            writer: Mutex::new(()),
        }
    }

    pub async fn get(&self, page: PageNumber) -> Option<PageSnapshot> {
        self.entries.read().await.get(&page).cloned()
    }

    pub async fn cached_pages(&self) -> Vec<PageNumber> {
        self.entries.read().await.keys().copied().collect()
    }

    pub async fn put(&self, page: PageNumber, snapshot: PageSnapshot) {
        let _writer = self.writer.lock().await;
        self.write_through(page, snapshot).await;
    }

    /// Atomic read-modify-write of one page. `apply` sees the current
    /// snapshot (if any) and returns the replacement, or `None` to leave it
    /// as is. Returns whatever the page holds afterwards.
    pub async fn update<F>(&self, page: PageNumber, apply: F) -> ReorderResult<Option<PageSnapshot>>
    where
        F: FnOnce(Option<&PageSnapshot>) -> ReorderResult<Option<PageSnapshot>>,
    {
        let _writer = self.writer.lock().await;
        let current = self.get(page).await;
        match apply(current.as_ref())? {
            Some(next) => {
                self.write_through(page, next.clone()).await;
                Ok(Some(next))
            }
            None => Ok(current),
        }
    }

    pub async fn clear(&self) {
        let _writer = self.writer.lock().await;
        self.entries.write().await.clear();
        if let Err(err) = self.store.clear().await {
            warn!(error = %err, "failed to clear durable console state");
        }
    }

    async fn write_through(&self, page: PageNumber, snapshot: PageSnapshot) {
        self.entries.write().await.insert(page, snapshot.clone());
        if let Err(err) = self.store.save_snapshot(page, &snapshot).await {
            warn!(
                page = page.get(),
                error = %err,
                "durable snapshot write failed; serving in-memory order for this session"
            );
        }
    }
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod tests;
