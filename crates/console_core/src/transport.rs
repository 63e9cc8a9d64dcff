//! Remote admin API addressing and the headers every request carries.

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use url::Url;

pub const PROJECT_HEADER: &str = "x-project";
pub const PAGINATE_PATH: &str = "v1/api/rest/video/PAGINATE";
pub const LOGIN_PATH: &str = "v2/api/lambda/login";

#[derive(Debug, Clone)]
pub struct ApiEndpoint {
    base: Url,
    project_header: String,
}

impl ApiEndpoint {
    pub fn new(base_url: &str, project_id: &str, project_secret: &str) -> Result<Self> {
        let mut base = Url::parse(base_url.trim())
            .with_context(|| format!("invalid api base url '{base_url}'"))?;
        if base.cannot_be_a_base() {
            return Err(anyhow!("api base url '{base_url}' cannot carry paths"));
        }
        // `Url::join` drops the last segment unless the path ends with '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            base,
            project_header: encode_project_header(project_id, project_secret),
        })
    }

    pub fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("failed to build url for '{path}'"))
    }

    pub fn project_header(&self) -> &str {
        &self.project_header
    }
}

pub fn encode_project_header(project_id: &str, project_secret: &str) -> String {
    STANDARD.encode(format!("{project_id}:{project_secret}"))
}
