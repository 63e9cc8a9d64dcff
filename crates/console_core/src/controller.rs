//! Reconciles fetched pages with drag-driven reordering.
//!
//! Each page keeps two sequences: the order last returned by the fetcher and
//! the order currently displayed. Moves touch only the latter. A completed
//! fetch replaces both, so moves issued while a reload was in flight are
//! dropped (last fetch wins). A response is written to the cache only if it
//! answers the most recently issued load; anything older is discarded.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use shared::{
    domain::{first_duplicate_id, Item, PageNumber, PageSnapshot},
    error::{ReorderError, ReorderResult},
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{cache::PageCache, fetcher::PageFetcher, session::SessionGate};

/// Tag for one in-flight load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    page: PageNumber,
    seq: u64,
}

#[derive(Debug, Default)]
struct LoadTracker {
    active_page: Option<PageNumber>,
    issued: u64,
}

pub struct OrderedListController {
    cache: Arc<PageCache>,
    fetcher: Arc<dyn PageFetcher>,
    session: Arc<dyn SessionGate>,
    page_size: u32,
    loads: Mutex<LoadTracker>,
}

impl OrderedListController {
    pub fn new(
        cache: Arc<PageCache>,
        fetcher: Arc<dyn PageFetcher>,
        session: Arc<dyn SessionGate>,
        page_size: u32,
    ) -> Self {
        Self {
            cache,
            fetcher,
            session,
            page_size: page_size.max(1),
            loads: Mutex::new(LoadTracker::default()),
        }
    }

    pub fn cache(&self) -> &Arc<PageCache> {
        &self.cache
    }

    pub async fn active_page(&self) -> Option<PageNumber> {
        self.loads.lock().await.active_page
    }

    pub async fn load_page(&self, page: PageNumber) -> ReorderResult<Vec<Item>> {
        let token = self.valid_token()?;
        let ticket = self.begin_load(page).await;
        let fetched = self
            .fetcher
            .fetch_page(&token, page, self.page_size)
            .await;
        self.complete_load(ticket, fetched).await
    }

    /// Marks `page` as the displayed page and tags the request for it.
    pub async fn begin_load(&self, page: PageNumber) -> LoadTicket {
        let mut loads = self.loads.lock().await;
        loads.active_page = Some(page);
        loads.issued += 1;
        debug!(page = page.get(), seq = loads.issued, "page load started");
        LoadTicket {
            page,
            seq: loads.issued,
        }
    }

    /// Applies a fetch result if it answers the most recent load and its
    /// page is still the active one.
    pub async fn complete_load(
        &self,
        ticket: LoadTicket,
        fetched: Result<Vec<Item>>,
    ) -> ReorderResult<Vec<Item>> {
        let page = ticket.page;
        // Held until the cache write lands so a concurrent logout cannot
        // clear the cache in between and then see this page reappear.
        let loads = self.loads.lock().await;
        match loads.active_page {
            Some(active) if active == page && ticket.seq == loads.issued => {}
            Some(active) => {
                info!(
                    requested = page.get(),
                    active = active.get(),
                    seq = ticket.seq,
                    latest = loads.issued,
                    "discarding response superseded by a newer load"
                );
                return Err(ReorderError::Superseded {
                    requested: page,
                    active,
                });
            }
            None => {
                info!(page = page.get(), "discarding response received after sign-out");
                return Err(ReorderError::Unauthenticated);
            }
        }

        let items = match fetched {
            Ok(items) => items,
            Err(err) => {
                warn!(page = page.get(), error = %err, "page fetch failed; keeping cached order");
                return Err(ReorderError::fetch_failed(page, format!("{err:#}")));
            }
        };
        if let Some(duplicate) = first_duplicate_id(&items) {
            warn!(page = page.get(), item = %duplicate, "fetched page repeats an item");
            return Err(ReorderError::fetch_failed(
                page,
                format!("item {duplicate} appears more than once"),
            ));
        }

        let snapshot = PageSnapshot::from_fetch(items, Utc::now());
        let working = snapshot.working_order().to_vec();
        self.cache.put(page, snapshot).await;
        drop(loads);

        info!(page = page.get(), items = working.len(), "page loaded");
        Ok(working)
    }

    /// Forgets the active page so in-flight responses are dropped.
    pub async fn abandon_loads(&self) {
        self.loads.lock().await.active_page = None;
    }

    /// Fails with `Unauthenticated` unless a usable token is present.
    pub fn ensure_session(&self) -> ReorderResult<()> {
        self.valid_token().map(|_| ())
    }

    /// Relocates one item: removed at `from`, reinserted at `to`.
    pub async fn move_item(
        &self,
        page: PageNumber,
        from: usize,
        to: usize,
    ) -> ReorderResult<Vec<Item>> {
        let updated = self
            .cache
            .update(page, |current| {
                let working = current.map(PageSnapshot::working_order).unwrap_or_default();
                let len = working.len();
                if from >= len || to >= len {
                    return Err(ReorderError::IndexOutOfRange { from, to, len });
                }
                if from == to {
                    return Ok(None);
                }
                Ok(current.map(|snapshot| snapshot.with_working_order(relocate(working, from, to))))
            })
            .await;

        match updated {
            Ok(snapshot) => {
                debug!(page = page.get(), from, to, "item moved");
                Ok(working_of(snapshot))
            }
            Err(err) => {
                debug!(page = page.get(), from, to, error = %err, "move rejected");
                Err(err)
            }
        }
    }

    pub async fn reset_order(&self, page: PageNumber) -> ReorderResult<Vec<Item>> {
        let snapshot = self
            .cache
            .update(page, |current| match current {
                Some(snapshot) => Ok(Some(snapshot.reset())),
                None => Err(ReorderError::NoSnapshot { page }),
            })
            .await?;
        info!(page = page.get(), "order reset to fetched order");
        Ok(working_of(snapshot))
    }

    pub async fn current_order(&self, page: PageNumber) -> Vec<Item> {
        working_of(self.cache.get(page).await)
    }

    pub async fn snapshot(&self, page: PageNumber) -> Option<PageSnapshot> {
        self.cache.get(page).await
    }

    fn valid_token(&self) -> ReorderResult<String> {
        if !self.session.is_authenticated() {
            return Err(ReorderError::Unauthenticated);
        }
        self.session
            .current_token()
            .filter(|token| !token.is_empty())
            .ok_or(ReorderError::Unauthenticated)
    }
}

fn working_of(snapshot: Option<PageSnapshot>) -> Vec<Item> {
    snapshot
        .map(|snapshot| snapshot.working_order().to_vec())
        .unwrap_or_default()
}

/// Single-element move; intervening items shift by one.
pub fn relocate(items: &[Item], from: usize, to: usize) -> Vec<Item> {
    let mut reordered = items.to_vec();
    let moved = reordered.remove(from);
    reordered.insert(to, moved);
    reordered
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
