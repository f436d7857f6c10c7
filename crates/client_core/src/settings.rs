use std::{path::Path, sync::Arc, time::Duration};

use anyhow::Context;
use config::{Config, Environment, File};
use serde::Deserialize;
use shared::story::MAX_PAGES;

use crate::{
    controller::StoryController,
    error::GatewayError,
    gateway::{GenerationGateway, HttpGenerationGateway, MissingGenerationGateway},
    random::{RandomSource, StdRandomSource},
};

pub const DEFAULT_SETTINGS_FILE: &str = "storyteller.toml";
const ENV_PREFIX: &str = "STORYTELLER";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Base URL of the generation and account server. Blank disables the
    /// gateway so every page uses fallback content.
    pub gateway_url: String,
    pub request_timeout_secs: u64,
    pub max_pages: u32,
    pub rng_seed: Option<u64>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            gateway_url: "http://127.0.0.1:5000".into(),
            request_timeout_secs: 30,
            max_pages: MAX_PAGES,
            rng_seed: None,
        }
    }
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn gateway(&self) -> Result<Arc<dyn GenerationGateway>, GatewayError> {
        if self.gateway_url.trim().is_empty() {
            return Ok(Arc::new(MissingGenerationGateway));
        }
        Ok(Arc::new(HttpGenerationGateway::new(
            &self.gateway_url,
            self.request_timeout(),
        )?))
    }

    pub fn random_source(&self) -> Box<dyn RandomSource> {
        match self.rng_seed {
            Some(seed) => Box::new(StdRandomSource::seeded(seed)),
            None => Box::new(StdRandomSource::from_entropy()),
        }
    }

    pub fn build_controller(&self) -> Result<StoryController, GatewayError> {
        Ok(
            StoryController::with_random_source(self.gateway()?, self.random_source())
                .with_max_pages(self.max_pages),
        )
    }
}

/// Reads `storyteller.toml` from the working directory (if present), then
/// applies `STORYTELLER__*` environment overrides.
pub fn load_client_settings() -> anyhow::Result<ClientSettings> {
    load_client_settings_from(Path::new(DEFAULT_SETTINGS_FILE))
}

pub fn load_client_settings_from(path: &Path) -> anyhow::Result<ClientSettings> {
    Config::builder()
        .add_source(File::from(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("failed to read client settings from {}", path.display()))?
        .try_deserialize()
        .context("invalid client settings")
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
