use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{
        GenerateImageRequest, GenerateImageResponse, GenerateStoryRequest, GenerateStoryResponse,
    },
    story::{
        continuation_text, opening_text, story_page_image_url, CONTINUATION_PHRASES,
        SERVER_PHRASE_COUNT, SERVER_PROMPT,
    },
};
use tracing::{debug, error};

use crate::ApiContext;

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Produces the narrative text for one story page.
#[async_trait]
pub trait StoryGenerator: Send + Sync {
    async fn story_text(&self, request: &GenerateStoryRequest) -> anyhow::Result<String>;

    fn name(&self) -> &'static str;
}

/// Canned text used when no model API key is configured.
pub struct TemplateStoryGenerator;

#[async_trait]
impl StoryGenerator for TemplateStoryGenerator {
    async fn story_text(&self, request: &GenerateStoryRequest) -> anyhow::Result<String> {
        if request.page_number == 1 {
            return Ok(opening_text(&request.story_idea));
        }
        let phrase = CONTINUATION_PHRASES[request.page_number as usize % SERVER_PHRASE_COUNT];
        Ok(continuation_text(phrase))
    }

    fn name(&self) -> &'static str {
        "template"
    }
}

pub struct GeminiStoryGenerator {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: [GeminiContent<'a>; 1],
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: [GeminiPart<'a>; 1],
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Deserialize)]
struct GeminiCandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiStoryGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build model http client")?;
        Ok(Self {
            http,
            endpoint: GEMINI_ENDPOINT.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Points the generator at another host serving the same REST surface.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl StoryGenerator for GeminiStoryGenerator {
    async fn story_text(&self, request: &GenerateStoryRequest) -> anyhow::Result<String> {
        let prompt = story_prompt(request);
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        );
        let body = GeminiRequest {
            contents: [GeminiContent {
                parts: [GeminiPart { text: &prompt }],
            }],
        };
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("model request failed")?
            .error_for_status()
            .context("model returned an error status")?;
        let body: GeminiResponse = response.json().await.context("invalid model response")?;

        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().map(|part| part.text).collect())
            .unwrap_or_default();
        let text = text.trim();
        if text.is_empty() {
            return Err(anyhow!("model returned no text"));
        }
        Ok(text.to_string())
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

pub fn story_prompt(request: &GenerateStoryRequest) -> String {
    if request.page_number == 1 {
        return format!(
            "Create the beginning of a children's story (ages 6-12) based on this idea: \"{}\". \
             Write 2-3 sentences that introduce the main character and setting. \
             Make it engaging and age-appropriate.",
            request.story_idea
        );
    }

    let mut prompt = String::new();
    if !request.previous_story.trim().is_empty() {
        prompt.push_str(&format!(
            "Here is the story so far: \"{}\".\n",
            request.previous_story.trim()
        ));
    }
    prompt.push_str(&format!(
        "Continue this children's story based on the user's response: \"{}\". \
         Write 2-3 sentences that advance the plot. \
         Make it engaging and age-appropriate for ages 6-12.",
        request.user_response.as_deref().unwrap_or_default()
    ));
    prompt
}

pub async fn generate_story(
    ctx: &ApiContext,
    request: &GenerateStoryRequest,
) -> Result<GenerateStoryResponse, ApiError> {
    if request.story_idea.trim().is_empty() {
        return Err(ApiError::new(ErrorCode::Validation, "Story idea is required"));
    }

    let story_text = ctx.generator.story_text(request).await.map_err(|err| {
        error!(
            generator = ctx.generator.name(),
            page_number = request.page_number,
            error = %err,
            "story generation failed"
        );
        ApiError::new(ErrorCode::Internal, "Failed to generate story")
    })?;
    debug!(
        generator = ctx.generator.name(),
        page_number = request.page_number,
        "story page generated"
    );

    Ok(GenerateStoryResponse {
        success: true,
        story_text,
        prompt_text: SERVER_PROMPT.to_string(),
        page_number: Some(request.page_number),
    })
}

pub fn generate_image(request: &GenerateImageRequest) -> GenerateImageResponse {
    GenerateImageResponse {
        success: true,
        image_url: Some(story_page_image_url(request.page_number)),
    }
}

#[cfg(test)]
#[path = "tests/generation_tests.rs"]
mod tests;
