use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::{Item, PageNumber},
    protocol::{PaginateRequest, PaginateResponse},
};
use tracing::debug;

use crate::transport::{ApiEndpoint, PAGINATE_PATH, PROJECT_HEADER};

/// Source of one page of items. A page past the last one is an empty list,
/// not an error.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, token: &str, page: PageNumber, page_size: u32)
        -> Result<Vec<Item>>;
}

pub struct HttpPageFetcher {
    http: Client,
    endpoint: ApiEndpoint,
}

impl HttpPageFetcher {
    pub fn new(endpoint: ApiEndpoint) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(http: Client, endpoint: ApiEndpoint) -> Self {
        Self { http, endpoint }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(
        &self,
        token: &str,
        page: PageNumber,
        page_size: u32,
    ) -> Result<Vec<Item>> {
        let body: PaginateResponse = self
            .http
            .post(self.endpoint.url(PAGINATE_PATH)?)
            .header(PROJECT_HEADER, self.endpoint.project_header())
            .bearer_auth(token)
            .json(&PaginateRequest::new(page.get(), page_size))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if body.error {
            return Err(anyhow!(
                "server rejected page {page}: {}",
                body.message.as_deref().unwrap_or("no reason given")
            ));
        }

        debug!(
            page = page.get(),
            items = body.list.len(),
            total = ?body.total,
            "fetched page"
        );
        Ok(body.list)
    }
}

#[cfg(test)]
#[path = "tests/fetcher_tests.rs"]
mod tests;
