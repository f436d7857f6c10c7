use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use shared::protocol::{
    GenerateImageRequest, GenerateImageResponse, GenerateStoryRequest, GenerateStoryResponse,
};
use tracing::debug;
use url::Url;

use crate::error::GatewayError;

const STORY_ROUTE: &str = "api/generate-story";
const IMAGE_ROUTE: &str = "api/generate-image";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedStory {
    pub story_text: String,
    pub prompt_text: String,
}

/// Stateless text and illustration service consumed by the story controller.
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    async fn generate_story(
        &self,
        request: &GenerateStoryRequest,
    ) -> Result<GeneratedStory, GatewayError>;

    /// Returns an absolute illustration reference for the page.
    async fn generate_image(&self, request: &GenerateImageRequest) -> Result<String, GatewayError>;
}

/// Gateway used when no backend is configured; every call fails so the
/// controller serves fallback content.
pub struct MissingGenerationGateway;

#[async_trait]
impl GenerationGateway for MissingGenerationGateway {
    async fn generate_story(
        &self,
        _request: &GenerateStoryRequest,
    ) -> Result<GeneratedStory, GatewayError> {
        Err(GatewayError::Unavailable)
    }

    async fn generate_image(
        &self,
        _request: &GenerateImageRequest,
    ) -> Result<String, GatewayError> {
        Err(GatewayError::Unavailable)
    }
}

pub struct HttpGenerationGateway {
    http: Client,
    base_url: Url,
}

impl HttpGenerationGateway {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, GatewayError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url: normalize_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute references pass through; origin-relative ones are resolved
    /// against the gateway. Blank references count as missing.
    pub fn resolve_image_url(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if raw.starts_with("http://") || raw.starts_with("https://") || raw.starts_with("data:") {
            return Some(raw.to_string());
        }
        self.base_url.join(raw).ok().map(String::from)
    }
}

fn normalize_base_url(raw: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(raw.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[async_trait]
impl GenerationGateway for HttpGenerationGateway {
    async fn generate_story(
        &self,
        request: &GenerateStoryRequest,
    ) -> Result<GeneratedStory, GatewayError> {
        let response = self
            .http
            .post(self.base_url.join(STORY_ROUTE)?)
            .json(request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(GatewayError::Status {
                status: response.status().as_u16(),
            });
        }

        let body: GenerateStoryResponse = response.json().await?;
        if body.story_text.trim().is_empty() {
            return Err(GatewayError::Malformed("empty storyText".into()));
        }
        if body.prompt_text.trim().is_empty() {
            return Err(GatewayError::Malformed("empty promptText".into()));
        }
        debug!(page_number = request.page_number, "story text generated");
        Ok(GeneratedStory {
            story_text: body.story_text,
            prompt_text: body.prompt_text,
        })
    }

    async fn generate_image(&self, request: &GenerateImageRequest) -> Result<String, GatewayError> {
        let response = self
            .http
            .post(self.base_url.join(IMAGE_ROUTE)?)
            .json(request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(GatewayError::Status {
                status: response.status().as_u16(),
            });
        }

        let body: GenerateImageResponse = response.json().await?;
        body.image_url
            .as_deref()
            .and_then(|raw| self.resolve_image_url(raw))
            .ok_or_else(|| GatewayError::Malformed("missing imageUrl".into()))
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
