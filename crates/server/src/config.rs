use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub session_ttl_seconds: i64,
    /// Enables the hosted story generator when set.
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    pub checkout_base_url: String,
    pub webhook_secret: String,
    pub pro_price_id: String,
    pub pro_price_cents: i64,
    pub pro_membership_months: u32,
    pub parental_approval_threshold_cents: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:5000".into(),
            database_url: "sqlite://./data/server.db".into(),
            jwt_secret: "dev-jwt-secret".into(),
            session_ttl_seconds: 7 * 24 * 3600,
            google_api_key: None,
            gemini_model: "gemini-2.5-flash".into(),
            checkout_base_url: "https://checkout.example.com/pay".into(),
            webhook_secret: "dev-webhook-secret".into(),
            pro_price_id: "price_pro_yearly".into(),
            pro_price_cents: 4999,
            pro_membership_months: 12,
            parental_approval_threshold_cents: 1000,
        }
    }
}

/// Keys accepted in `server.toml`. Anything omitted keeps its default.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    bind_addr: Option<String>,
    database_url: Option<String>,
    jwt_secret: Option<String>,
    session_ttl_seconds: Option<i64>,
    google_api_key: Option<String>,
    gemini_model: Option<String>,
    checkout_base_url: Option<String>,
    webhook_secret: Option<String>,
    pro_price_id: Option<String>,
    pro_price_cents: Option<i64>,
    pro_membership_months: Option<u32>,
    parental_approval_threshold_cents: Option<i64>,
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new("server.toml"), |key| std::env::var(key).ok())
}

/// Defaults, then the toml file at `path` (if readable), then environment
/// variables. For each setting the `APP__` form wins over the bare name.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => apply_file(&mut settings, file_cfg),
            Err(error) => warn!(path = %path.display(), %error, "ignoring invalid settings file"),
        }
    }

    let lookup = |names: &[&str]| names.iter().rev().find_map(|name| env(name));

    if let Some(v) = lookup(&["SERVER_BIND", "APP__BIND_ADDR"]) {
        settings.server_bind = v;
    }
    if let Some(v) = lookup(&["DATABASE_URL", "APP__DATABASE_URL"]) {
        settings.database_url = v;
    }
    if let Some(v) = lookup(&["JWT_SECRET", "APP__JWT_SECRET"]) {
        settings.jwt_secret = v;
    }
    if let Some(v) = parse_setting(
        "SESSION_TTL_SECONDS",
        lookup(&["SESSION_TTL_SECONDS", "APP__SESSION_TTL_SECONDS"]),
    ) {
        settings.session_ttl_seconds = v;
    }
    if let Some(v) = lookup(&["GOOGLE_API_KEY", "APP__GOOGLE_API_KEY"]) {
        settings.google_api_key = Some(v);
    }
    if let Some(v) = lookup(&["GEMINI_MODEL", "APP__GEMINI_MODEL"]) {
        settings.gemini_model = v;
    }
    if let Some(v) = lookup(&["CHECKOUT_BASE_URL", "APP__CHECKOUT_BASE_URL"]) {
        settings.checkout_base_url = v;
    }
    if let Some(v) = lookup(&["WEBHOOK_SECRET", "APP__WEBHOOK_SECRET"]) {
        settings.webhook_secret = v;
    }
    if let Some(v) = lookup(&["PRO_PRICE_ID", "APP__PRO_PRICE_ID"]) {
        settings.pro_price_id = v;
    }
    if let Some(v) = parse_setting(
        "PRO_PRICE_CENTS",
        lookup(&["PRO_PRICE_CENTS", "APP__PRO_PRICE_CENTS"]),
    ) {
        settings.pro_price_cents = v;
    }
    if let Some(v) = parse_setting(
        "PRO_MEMBERSHIP_MONTHS",
        lookup(&["PRO_MEMBERSHIP_MONTHS", "APP__PRO_MEMBERSHIP_MONTHS"]),
    ) {
        settings.pro_membership_months = v;
    }
    if let Some(v) = parse_setting(
        "PARENTAL_APPROVAL_THRESHOLD_CENTS",
        lookup(&[
            "PARENTAL_APPROVAL_THRESHOLD_CENTS",
            "APP__PARENTAL_APPROVAL_THRESHOLD_CENTS",
        ]),
    ) {
        settings.parental_approval_threshold_cents = v;
    }

    if settings
        .google_api_key
        .as_deref()
        .is_some_and(|key| key.trim().is_empty())
    {
        settings.google_api_key = None;
    }

    settings
}

fn parse_setting<T: FromStr>(name: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(setting = name, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    let FileSettings {
        bind_addr,
        database_url,
        jwt_secret,
        session_ttl_seconds,
        google_api_key,
        gemini_model,
        checkout_base_url,
        webhook_secret,
        pro_price_id,
        pro_price_cents,
        pro_membership_months,
        parental_approval_threshold_cents,
    } = file_cfg;

    if let Some(v) = bind_addr {
        settings.server_bind = v;
    }
    if let Some(v) = database_url {
        settings.database_url = v;
    }
    if let Some(v) = jwt_secret {
        settings.jwt_secret = v;
    }
    if let Some(v) = session_ttl_seconds {
        settings.session_ttl_seconds = v;
    }
    if google_api_key.is_some() {
        settings.google_api_key = google_api_key;
    }
    if let Some(v) = gemini_model {
        settings.gemini_model = v;
    }
    if let Some(v) = checkout_base_url {
        settings.checkout_base_url = v;
    }
    if let Some(v) = webhook_secret {
        settings.webhook_secret = v;
    }
    if let Some(v) = pro_price_id {
        settings.pro_price_id = v;
    }
    if let Some(v) = pro_price_cents {
        settings.pro_price_cents = v;
    }
    if let Some(v) = pro_membership_months {
        settings.pro_membership_months = v;
    }
    if let Some(v) = parental_approval_threshold_cents {
        settings.parental_approval_threshold_cents = v;
    }
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") {
        return raw_database_url.to_string();
    }

    let path = if let Some(path) = raw_database_url.strip_prefix("sqlite://") {
        path
    } else if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        path
    } else if raw_database_url.contains("://") {
        return raw_database_url.to_string();
    } else {
        raw_database_url
    };

    let path = path.replace('\\', "/");
    if has_windows_drive_prefix(&path) {
        format!("sqlite:{path}")
    } else {
        format!("sqlite://{path}")
    }
}

fn has_windows_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
