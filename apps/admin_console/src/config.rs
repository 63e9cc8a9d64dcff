use std::{fs, io, path::Path};

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    pub api_base_url: String,
    pub project_id: String,
    pub project_secret: String,
    pub database_url: String,
    pub page_size: u32,
    pub login_role: String,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            api_base_url: "https://reacttask.mkdlabs.com".into(),
            project_id: "reacttask".into(),
            project_secret: String::new(),
            database_url: "sqlite://./data/console.db".into(),
            page_size: 10,
            login_role: "admin".into(),
        }
    }
}

pub fn load_settings(path: &Path) -> anyhow::Result<ConsoleSettings> {
    load_settings_with(path, |key| std::env::var(key).ok())
}

/// Defaults, then the toml file (if present), then environment overrides.
pub fn load_settings_with(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<ConsoleSettings> {
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => toml::from_str::<ConsoleSettings>(&raw)
            .with_context(|| format!("invalid settings file '{}'", path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => ConsoleSettings::default(),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()))
        }
    };

    let first = |keys: &[&str]| keys.iter().find_map(|key| env(*key));

    if let Some(v) = first(&["APP__API_BASE_URL", "API_BASE_URL"]) {
        settings.api_base_url = v;
    }
    if let Some(v) = first(&["APP__DATABASE_URL", "DATABASE_URL"]) {
        settings.database_url = v;
    }
    if let Some(v) = first(&["APP__PROJECT_ID"]) {
        settings.project_id = v;
    }
    if let Some(v) = first(&["APP__PROJECT_SECRET"]) {
        settings.project_secret = v;
    }
    if let Some(v) = first(&["APP__PAGE_SIZE"]) {
        if let Ok(parsed) = v.trim().parse::<u32>() {
            settings.page_size = parsed;
        }
    }
    if let Some(v) = first(&["APP__LOGIN_ROLE"]) {
        settings.login_role = v;
    }

    settings.page_size = settings.page_size.max(1);
    settings.database_url = normalize_database_url(&settings.database_url);
    Ok(settings)
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return ConsoleSettings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
