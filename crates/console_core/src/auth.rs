use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::Role,
    protocol::{LoginRequest, LoginResponse},
};
use thiserror::Error;
use tracing::info;

use crate::transport::{ApiEndpoint, LOGIN_PATH, PROJECT_HEADER};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthGrant {
    pub token: String,
    pub role: Option<Role>,
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("login request failed: {0}")]
    Transport(#[from] anyhow::Error),
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<AuthGrant, LoginError>;
}

pub struct AuthClient {
    http: Client,
    endpoint: ApiEndpoint,
    role: String,
}

impl AuthClient {
    pub fn new(endpoint: ApiEndpoint, role: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint,
            role: role.into(),
        }
    }
}

pub fn validate_credentials(email: &str, password: &str) -> Result<(), LoginError> {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return Err(LoginError::InvalidInput("email must be a valid address"));
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(LoginError::InvalidInput("email must be a valid address"));
    }
    if password.is_empty() {
        return Err(LoginError::InvalidInput("password is required"));
    }
    Ok(())
}

#[async_trait]
impl Authenticator for AuthClient {
    async fn login(&self, email: &str, password: &str) -> Result<AuthGrant, LoginError> {
        validate_credentials(email, password)?;

        let response = self
            .http
            .post(self.endpoint.url(LOGIN_PATH)?)
            .header(PROJECT_HEADER, self.endpoint.project_header())
            .json(&LoginRequest {
                email: email.trim().to_string(),
                password: password.to_string(),
                role: self.role.clone(),
            })
            .send()
            .await
            .map_err(anyhow::Error::from)?;

        // The API answers bad credentials with a 4xx carrying `error: true`.
        let body: LoginResponse = match response.json().await {
            Ok(body) => body,
            Err(_) => return Err(LoginError::InvalidCredentials),
        };

        match body {
            LoginResponse {
                error: false,
                token: Some(token),
                role,
                ..
            } if !token.is_empty() => {
                info!("login succeeded");
                Ok(AuthGrant {
                    token,
                    role: Some(Role(role.unwrap_or_else(|| self.role.clone()))),
                })
            }
            _ => Err(LoginError::InvalidCredentials),
        }
    }
}

#[cfg(test)]
#[path = "tests/auth_tests.rs"]
mod tests;
