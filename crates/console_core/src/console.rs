//! Operator-facing facade: session, pagination and the ordered list wired
//! together with a single lifetime (opened at start, cleared at sign-out).

use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{
    domain::{Item, PageNumber, Role},
    error::{ReorderError, ReorderResult},
};
use storage::StoredSession;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{
    auth::{Authenticator, LoginError},
    cache::{PageCache, PageStore},
    controller::OrderedListController,
    drag::{DragGesture, MoveIntent},
    fetcher::PageFetcher,
    pagination::{PageLoad, PaginationController},
    session::{SessionAction, SessionGate, SessionState, SessionStore},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsoleStatus {
    pub authenticated: bool,
    pub role: Option<Role>,
    pub current_page: PageNumber,
    pub cached_pages: Vec<PageNumber>,
    pub reordered: bool,
    pub fetched_at: Option<DateTime<Utc>>,
}

pub struct AdminConsole {
    session: Arc<SessionStore>,
    authenticator: Arc<dyn Authenticator>,
    store: Arc<dyn PageStore>,
    lists: Arc<OrderedListController>,
    pagination: PaginationController,
}

impl AdminConsole {
    pub async fn open(
        store: Arc<dyn PageStore>,
        fetcher: Arc<dyn PageFetcher>,
        authenticator: Arc<dyn Authenticator>,
        page_size: u32,
    ) -> Arc<Self> {
        let session = Arc::new(SessionStore::new());
        match store.load_session().await {
            Ok(Some(stored)) => {
                session.dispatch(SessionAction::Login {
                    token: stored.token,
                    role: stored.role,
                });
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "failed to restore persisted session"),
        }

        let cache = Arc::new(PageCache::restore(Arc::clone(&store)).await);
        let gate: Arc<dyn SessionGate> = session.clone();
        let lists = Arc::new(OrderedListController::new(
            cache, fetcher, gate, page_size,
        ));
        let pagination =
            PaginationController::restore(Arc::clone(&lists), Arc::clone(&store)).await;

        Arc::new(Self {
            session,
            authenticator,
            store,
            lists,
            pagination,
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn lists(&self) -> &Arc<OrderedListController> {
        &self.lists
    }

    pub fn pagination(&self) -> &PaginationController {
        &self.pagination
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<SessionState, LoginError> {
        let grant = self.authenticator.login(email, password).await?;
        let state = self.session.dispatch(SessionAction::Login {
            token: grant.token.clone(),
            role: grant.role.clone(),
        });
        if let Err(err) = self
            .store
            .save_session(&StoredSession {
                token: grant.token,
                role: grant.role,
            })
            .await
        {
            warn!(error = %err, "failed to persist session; sign-in lasts for this run only");
        }
        Ok(state)
    }

    pub async fn logout(&self) {
        self.session.dispatch(SessionAction::Logout);
        self.handle_signed_out().await;
    }

    /// Drops every cached page and the persisted state, and returns to page 1.
    pub async fn handle_signed_out(&self) {
        self.lists.abandon_loads().await;
        self.lists.cache().clear().await;
        self.pagination.reset().await;
        info!("console state cleared after sign-out");
    }

    /// Reacts to sign-outs dispatched by anyone holding the session store.
    /// The task ends once the console is dropped.
    pub fn watch_session(self: &Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.session.subscribe();
        // Sampled before spawning so a sign-out racing the first poll still
        // counts as a transition.
        let mut was_authenticated = rx.borrow_and_update().is_authenticated();
        let console: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let authenticated = rx.borrow_and_update().is_authenticated();
                if was_authenticated && !authenticated {
                    let Some(console) = console.upgrade() else {
                        break;
                    };
                    console.handle_signed_out().await;
                }
                was_authenticated = authenticated;
            }
        })
    }

    pub async fn current_page(&self) -> PageNumber {
        self.pagination.current_page().await
    }

    pub async fn show(&self) -> (PageNumber, Vec<Item>) {
        let page = self.current_page().await;
        (page, self.lists.current_order(page).await)
    }

    pub async fn refresh(&self) -> PageLoad {
        self.pagination.reload().await
    }

    pub async fn next_page(&self) -> PageLoad {
        self.pagination.next_page().await
    }

    pub async fn prev_page(&self) -> Option<PageLoad> {
        self.pagination.prev_page().await
    }

    pub async fn move_item(&self, intent: MoveIntent) -> ReorderResult<Vec<Item>> {
        self.require_session()?;
        let page = self.current_page().await;
        self.lists.move_item(page, intent.from, intent.to).await
    }

    /// Replays a drag that started at `start` and hovered over `hovers` in
    /// turn. Stops at the first rejected move; earlier moves stay applied.
    pub async fn drag(&self, start: usize, hovers: &[usize]) -> ReorderResult<Vec<Item>> {
        self.require_session()?;
        let page = self.current_page().await;
        let mut gesture = DragGesture::start(start);
        let mut order = self.lists.current_order(page).await;
        for intent in hovers.iter().filter_map(|hover| gesture.hover(*hover)) {
            order = self.lists.move_item(page, intent.from, intent.to).await?;
        }
        Ok(order)
    }

    pub async fn reset_order(&self) -> ReorderResult<Vec<Item>> {
        self.require_session()?;
        let page = self.current_page().await;
        self.lists.reset_order(page).await
    }

    pub async fn status(&self) -> ConsoleStatus {
        let state = self.session.snapshot();
        let current_page = self.current_page().await;
        let snapshot = self.lists.snapshot(current_page).await;
        ConsoleStatus {
            authenticated: state.is_authenticated(),
            role: state.role().cloned(),
            current_page,
            cached_pages: self.lists.cache().cached_pages().await,
            reordered: snapshot.as_ref().is_some_and(|s| s.is_reordered()),
            fetched_at: snapshot.map(|s| s.fetched_at()),
        }
    }

    fn require_session(&self) -> ReorderResult<()> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(ReorderError::Unauthenticated)
        }
    }
}

#[cfg(test)]
#[path = "tests/console_tests.rs"]
mod tests;
