use std::sync::Arc;

use shared::{
    domain::{Item, PageNumber},
    error::{ReorderError, ReorderResult},
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{cache::PageStore, controller::OrderedListController};

/// Result of moving to a page: the page always changes, the load may fail.
#[derive(Debug)]
pub struct PageLoad {
    pub page: PageNumber,
    pub items: ReorderResult<Vec<Item>>,
}

pub struct PaginationController {
    lists: Arc<OrderedListController>,
    store: Arc<dyn PageStore>,
    current: Mutex<PageNumber>,
}

impl PaginationController {
    /// Starts at the persisted page, or page 1 when none is stored.
    pub async fn restore(lists: Arc<OrderedListController>, store: Arc<dyn PageStore>) -> Self {
        let current = match store.load_current_page().await {
            Ok(page) => page.unwrap_or(PageNumber::FIRST),
            Err(err) => {
                warn!(error = %err, "failed to read persisted page; starting at page 1");
                PageNumber::FIRST
            }
        };
        debug!(page = current.get(), "pagination restored");
        Self {
            lists,
            store,
            current: Mutex::new(current),
        }
    }

    pub async fn current_page(&self) -> PageNumber {
        *self.current.lock().await
    }

    /// No upper bound: past the last page the fetcher returns an empty list.
    /// Signed out, the page stays where it is.
    pub async fn next_page(&self) -> PageLoad {
        if let Err(err) = self.lists.ensure_session() {
            return self.refused(err).await;
        }
        let page = {
            let mut current = self.current.lock().await;
            *current = current.next();
            *current
        };
        self.persist_and_load(page).await
    }

    /// `None` at page 1.
    pub async fn prev_page(&self) -> Option<PageLoad> {
        if let Err(err) = self.lists.ensure_session() {
            return Some(self.refused(err).await);
        }
        let page = {
            let mut current = self.current.lock().await;
            let prev = current.prev()?;
            *current = prev;
            prev
        };
        Some(self.persist_and_load(page).await)
    }

    pub async fn reload(&self) -> PageLoad {
        let page = self.current_page().await;
        PageLoad {
            page,
            items: self.lists.load_page(page).await,
        }
    }

    /// Back to page 1 without fetching; used after sign-out.
    pub async fn reset(&self) {
        *self.current.lock().await = PageNumber::FIRST;
    }

    async fn refused(&self, err: ReorderError) -> PageLoad {
        let page = self.current_page().await;
        debug!(page = page.get(), error = %err, "page change refused");
        PageLoad {
            page,
            items: Err(err),
        }
    }

    async fn persist_and_load(&self, page: PageNumber) -> PageLoad {
        if let Err(err) = self.store.save_current_page(page).await {
            warn!(page = page.get(), error = %err, "failed to persist current page");
        }
        PageLoad {
            page,
            items: self.lists.load_page(page).await,
        }
    }
}

#[cfg(test)]
#[path = "tests/pagination_tests.rs"]
mod tests;
