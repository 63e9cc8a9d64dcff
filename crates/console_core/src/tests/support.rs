//! Fakes shared by the unit tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::domain::{Item, PageNumber, PageSnapshot, Role};
use storage::{Storage, StoredSession};
use tokio::sync::{oneshot, Mutex};

use crate::{
    auth::{AuthGrant, Authenticator, LoginError},
    cache::{PageCache, PageStore},
    controller::OrderedListController,
    fetcher::PageFetcher,
    session::{SessionAction, SessionGate, SessionStore},
};

pub(crate) const PAGE_SIZE: u32 = 10;

pub(crate) fn page(n: u32) -> PageNumber {
    PageNumber::new(n).expect("page")
}

/// One item per label; the id is the label's first byte.
pub(crate) fn items(labels: &[&str]) -> Vec<Item> {
    labels
        .iter()
        .map(|label| Item::new(i64::from(label.as_bytes()[0]), *label, format!("{label} video")))
        .collect()
}

pub(crate) fn titles(items: &[Item]) -> Vec<&str> {
    items.iter().map(|item| item.title.as_str()).collect()
}

pub(crate) enum Reply {
    Items(Vec<Item>),
    Fail(&'static str),
    Gated(oneshot::Receiver<()>, Box<Reply>),
}

impl Reply {
    pub(crate) fn gated(inner: Reply) -> (oneshot::Sender<()>, Reply) {
        let (release, gate) = oneshot::channel();
        (release, Reply::Gated(gate, Box::new(inner)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FetchCall {
    pub token: String,
    pub page: u32,
    pub page_size: u32,
}

/// Replies are queued per page; an exhausted queue answers with an empty page.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    replies: Mutex<HashMap<u32, VecDeque<Reply>>>,
    calls: Mutex<Vec<FetchCall>>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) async fn push(&self, page: u32, reply: Reply) {
        self.replies
            .lock()
            .await
            .entry(page)
            .or_default()
            .push_back(reply);
    }

    pub(crate) async fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch_page(
        &self,
        token: &str,
        page: PageNumber,
        page_size: u32,
    ) -> Result<Vec<Item>> {
        self.calls.lock().await.push(FetchCall {
            token: token.to_string(),
            page: page.get(),
            page_size,
        });
        let mut reply = self
            .replies
            .lock()
            .await
            .get_mut(&page.get())
            .and_then(VecDeque::pop_front);
        loop {
            match reply {
                None => return Ok(Vec::new()),
                Some(Reply::Items(items)) => return Ok(items),
                Some(Reply::Fail(message)) => return Err(anyhow!(message)),
                Some(Reply::Gated(gate, inner)) => {
                    let _ = gate.await;
                    reply = Some(*inner);
                }
            }
        }
    }
}

/// Real sqlite store whose writes can be switched to fail.
pub(crate) struct FlakyStore {
    inner: Storage,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub(crate) fn new(inner: Storage) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_writes: AtomicBool::new(false),
        })
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(anyhow!("storage quota exceeded"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PageStore for FlakyStore {
    async fn list_pages(&self) -> Result<Vec<PageNumber>> {
        PageStore::list_pages(&self.inner).await
    }

    async fn load_snapshot(&self, page: PageNumber) -> Result<Option<PageSnapshot>> {
        PageStore::load_snapshot(&self.inner, page).await
    }

    async fn save_snapshot(&self, page: PageNumber, snapshot: &PageSnapshot) -> Result<()> {
        self.check_write()?;
        PageStore::save_snapshot(&self.inner, page, snapshot).await
    }

    async fn load_current_page(&self) -> Result<Option<PageNumber>> {
        PageStore::load_current_page(&self.inner).await
    }

    async fn save_current_page(&self, page: PageNumber) -> Result<()> {
        self.check_write()?;
        PageStore::save_current_page(&self.inner, page).await
    }

    async fn load_session(&self) -> Result<Option<StoredSession>> {
        PageStore::load_session(&self.inner).await
    }

    async fn save_session(&self, session: &StoredSession) -> Result<()> {
        self.check_write()?;
        PageStore::save_session(&self.inner, session).await
    }

    async fn clear(&self) -> Result<()> {
        self.check_write()?;
        PageStore::clear(&self.inner).await
    }
}

pub(crate) async fn memory_storage() -> Storage {
    Storage::new("sqlite::memory:").await.expect("db")
}

pub(crate) fn signed_in(token: &str) -> Arc<SessionStore> {
    let session = Arc::new(SessionStore::new());
    session.dispatch(SessionAction::Login {
        token: token.to_string(),
        role: Some(Role::admin()),
    });
    session
}

pub(crate) async fn controller(
    fetcher: Arc<ScriptedFetcher>,
    store: Arc<dyn PageStore>,
    session: Arc<SessionStore>,
) -> Arc<OrderedListController> {
    let cache = Arc::new(PageCache::restore(store).await);
    let gate: Arc<dyn SessionGate> = session;
    Arc::new(OrderedListController::new(cache, fetcher, gate, PAGE_SIZE))
}

pub(crate) struct StaticAuthenticator {
    pub token: Option<&'static str>,
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn login(&self, email: &str, password: &str) -> Result<AuthGrant, LoginError> {
        crate::auth::validate_credentials(email, password)?;
        match self.token {
            Some(token) => Ok(AuthGrant {
                token: token.to_string(),
                role: Some(Role::admin()),
            }),
            None => Err(LoginError::InvalidCredentials),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CapturedRequest {
    pub path: &'static str,
    pub authorization: Option<String>,
    pub project: Option<String>,
    pub body: serde_json::Value,
}

#[derive(Clone, Default)]
pub(crate) struct MockApi {
    pub requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

pub(crate) const GOOD_TOKEN: &str = "good-token";

fn header(headers: &axum::http::HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

async fn mock_paginate(
    axum::extract::State(api): axum::extract::State<MockApi>,
    headers: axum::http::HeaderMap,
    axum::Json(body): axum::Json<shared::protocol::PaginateRequest>,
) -> (axum::http::StatusCode, axum::Json<serde_json::Value>) {
    use axum::http::StatusCode;
    use serde_json::json;

    let authorization = header(&headers, "authorization");
    api.requests.lock().await.push(CapturedRequest {
        path: crate::transport::PAGINATE_PATH,
        authorization: authorization.clone(),
        project: header(&headers, crate::transport::PROJECT_HEADER),
        body: serde_json::to_value(&body).unwrap_or_default(),
    });

    if authorization.as_deref() != Some(format!("Bearer {GOOD_TOKEN}").as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            axum::Json(json!({ "error": true, "message": "TOKEN_INVALID" })),
        );
    }

    let reply = match body.page {
        1 => json!({
            "error": false,
            "list": [
                { "id": 11, "title": "first", "description": "one", "photo": "a.png", "like": 4 },
                { "id": 12, "title": "second", "description": "two", "photo": "b.png", "like": 0 }
            ],
            "page": 1,
            "limit": body.limit,
            "total": 2,
            "num_pages": 1
        }),
        99 => json!({ "error": true, "message": "page exploded" }),
        page => json!({ "error": false, "list": [], "page": page, "limit": body.limit }),
    };
    (StatusCode::OK, axum::Json(reply))
}

async fn mock_login(
    axum::extract::State(api): axum::extract::State<MockApi>,
    headers: axum::http::HeaderMap,
    axum::Json(body): axum::Json<shared::protocol::LoginRequest>,
) -> (axum::http::StatusCode, axum::Json<serde_json::Value>) {
    use axum::http::StatusCode;
    use serde_json::json;

    api.requests.lock().await.push(CapturedRequest {
        path: crate::transport::LOGIN_PATH,
        authorization: header(&headers, "authorization"),
        project: header(&headers, crate::transport::PROJECT_HEADER),
        body: serde_json::to_value(&body).unwrap_or_default(),
    });

    if body.password == "secret" && body.role == "admin" {
        (
            StatusCode::OK,
            axum::Json(json!({
                "error": false,
                "token": GOOD_TOKEN,
                "role": "admin",
                "user_id": 7
            })),
        )
    } else {
        (
            StatusCode::FORBIDDEN,
            axum::Json(json!({ "error": true, "message": "Invalid Credentials" })),
        )
    }
}

/// Serves the paginate and login endpoints on an ephemeral port.
pub(crate) async fn spawn_mock_api() -> Result<(String, MockApi)> {
    use axum::{routing::post, Router};
    use tokio::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let api = MockApi::default();
    let app = Router::new()
        .route(&format!("/{}", crate::transport::PAGINATE_PATH), post(mock_paginate))
        .route(&format!("/{}", crate::transport::LOGIN_PATH), post(mock_login))
        .with_state(api.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), api))
}
