//! Operator-facing notices for reorder and sign-in outcomes.

use console_core::auth::LoginError;
use shared::error::{ErrorCode, ReorderError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeCategory {
    Success,
    Auth,
    Transport,
    Validation,
    Conflict,
}

#[derive(Debug, Clone)]
pub struct Notice {
    category: NoticeCategory,
    message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            category: NoticeCategory::Success,
            message: message.into(),
        }
    }

    pub fn from_reorder_error(err: &ReorderError) -> Self {
        let category = match err.code() {
            ErrorCode::Unauthorized => NoticeCategory::Auth,
            ErrorCode::Unavailable => NoticeCategory::Transport,
            ErrorCode::Validation | ErrorCode::NotFound => NoticeCategory::Validation,
            ErrorCode::Conflict => NoticeCategory::Conflict,
        };
        let message = match err {
            ReorderError::FetchFailed { page, .. } => {
                format!(
                    "{err}. Showing the last known order for page {page}; retry with `refresh`."
                )
            }
            ReorderError::NoSnapshot { .. } => format!("{err}. Run `refresh` first."),
            _ => err.to_string(),
        };
        Self { category, message }
    }

    pub fn from_login_error(err: &LoginError) -> Self {
        match err {
            LoginError::InvalidInput(_) => Self {
                category: NoticeCategory::Validation,
                message: err.to_string(),
            },
            LoginError::InvalidCredentials => Self {
                category: NoticeCategory::Auth,
                message: "Invalid credentials".to_string(),
            },
            LoginError::Transport(source) => Self {
                category: NoticeCategory::Transport,
                message: classify_login_failure(&format!("{source:#}")),
            },
        }
    }

    pub fn requires_reauth(&self) -> bool {
        self.category == NoticeCategory::Auth
    }

    pub fn category(&self) -> NoticeCategory {
        self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn render(&self) -> String {
        let tag = match self.category {
            NoticeCategory::Success => "ok",
            NoticeCategory::Auth => "auth",
            NoticeCategory::Transport => "network",
            NoticeCategory::Validation => "invalid",
            NoticeCategory::Conflict => "stale",
        };
        let mut line = format!("[{tag}] {}", self.message);
        if self.requires_reauth() {
            line.push_str(
                "\n       sign in with `admin-console login --email <email> --password <password>`",
            );
        }
        line
    }
}

pub fn classify_login_failure(message: &str) -> String {
    let lower = message.to_ascii_lowercase();
    if lower.contains("failed to connect")
        || lower.contains("connection refused")
        || lower.contains("dns")
        || lower.contains("timed out")
        || lower.contains("error sending request")
    {
        "Server unreachable; check the api url/network and retry sign-in.".to_string()
    } else {
        format!("Login/API error: {message}")
    }
}
