use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shared::{
    domain::{NavigationState, Page, StoryStats},
    protocol::{GenerateImageRequest, GenerateStoryRequest},
    story::MAX_PAGES,
};
use tracing::{debug, info, warn};

use crate::{
    fallback::{fallback_image_url, fallback_story},
    gateway::{GeneratedStory, GenerationGateway},
    random::{RandomSource, StdRandomSource},
    session::{CycleTicket, SessionPhase, StorySession},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// A page was generated and appended.
    Created(Page),
    /// Another generation cycle is in flight; nothing happened.
    Busy,
    /// `advance` was called before `initialize`.
    NotStarted,
    /// The story already holds the maximum number of pages.
    StoryComplete,
    /// The story was reset or restarted while this cycle was in flight; its
    /// page was discarded.
    Superseded,
}

impl GenerationOutcome {
    pub fn page(&self) -> Option<&Page> {
        match self {
            Self::Created(page) => Some(page),
            _ => None,
        }
    }

    pub fn into_page(self) -> Option<Page> {
        match self {
            Self::Created(page) => Some(page),
            _ => None,
        }
    }
}

/// Owns one story session and drives the generation gateway for it.
///
/// All operations take `&self`; the session sits behind a mutex that is never
/// held across an await, so the controller can be shared between tasks while
/// still allowing at most one generation cycle in flight.
pub struct StoryController {
    gateway: Arc<dyn GenerationGateway>,
    random: Mutex<Box<dyn RandomSource>>,
    session: Mutex<StorySession>,
    max_pages: u32,
}

/// Clears the in-flight flag when the cycle ends, however it ends.
struct GenerationGuard<'a> {
    session: &'a Mutex<StorySession>,
    epoch: u64,
}

impl Drop for GenerationGuard<'_> {
    fn drop(&mut self) {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .release(self.epoch);
    }
}

impl StoryController {
    pub fn new(gateway: Arc<dyn GenerationGateway>) -> Self {
        Self::with_random_source(gateway, Box::new(StdRandomSource::from_entropy()))
    }

    pub fn with_random_source(
        gateway: Arc<dyn GenerationGateway>,
        random: Box<dyn RandomSource>,
    ) -> Self {
        Self {
            gateway,
            random: Mutex::new(random),
            session: Mutex::new(StorySession::new()),
            max_pages: MAX_PAGES,
        }
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    fn lock(&self) -> MutexGuard<'_, StorySession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a new story from `story_idea` and generates its first page.
    /// Callers validate that the idea is non-blank.
    pub async fn initialize(&self, story_idea: &str) -> GenerationOutcome {
        let ticket = {
            let mut session = self.lock();
            session.start(story_idea.to_string());
            session.claim()
        };
        let Some(ticket) = ticket else {
            return GenerationOutcome::Busy;
        };
        info!(story_idea, "starting new story");
        self.run_cycle(ticket, None).await
    }

    /// Generates the next page from the user's continuation.
    pub async fn advance(&self, user_response: &str) -> GenerationOutcome {
        let ticket = {
            let mut session = self.lock();
            match session.phase(self.max_pages) {
                SessionPhase::Empty => return GenerationOutcome::NotStarted,
                SessionPhase::Complete => return GenerationOutcome::StoryComplete,
                SessionPhase::Active => {}
            }
            session.claim()
        };
        let Some(ticket) = ticket else {
            debug!("advance ignored: generation already in flight");
            return GenerationOutcome::Busy;
        };
        self.run_cycle(ticket, Some(user_response.to_string())).await
    }

    async fn run_cycle(
        &self,
        ticket: CycleTicket,
        user_response: Option<String>,
    ) -> GenerationOutcome {
        let _guard = GenerationGuard {
            session: &self.session,
            epoch: ticket.epoch,
        };
        let page_number = ticket.page_number;

        let story_request = GenerateStoryRequest {
            story_idea: ticket.story_idea.clone(),
            user_response: user_response.clone(),
            page_number,
            previous_story: ticket.narrative_history.clone(),
        };
        let (story, from_gateway) = match self.gateway.generate_story(&story_request).await {
            Ok(story) => (story, true),
            Err(error) => {
                warn!(page_number, %error, "story generation failed; using fallback text");
                (self.fallback_story(page_number, &ticket.story_idea), false)
            }
        };

        let image_request = GenerateImageRequest {
            story_text: story.story_text.clone(),
            page_number,
        };
        let image_url = match self.gateway.generate_image(&image_request).await {
            Ok(url) => url,
            Err(error) => {
                warn!(page_number, %error, "image generation failed; using placeholder");
                fallback_image_url(page_number)
            }
        };

        let page = Page {
            page_number,
            image_url,
            story_text: story.story_text,
            prompt_text: story.prompt_text,
            user_response,
        };
        let generated_text = from_gateway.then_some(page.story_text.as_str());
        let committed = self.lock().commit(&ticket, page.clone(), generated_text);
        if committed {
            info!(page_number, fallback = !from_gateway, "story page created");
            GenerationOutcome::Created(page)
        } else {
            info!(page_number, "discarding page from superseded story");
            GenerationOutcome::Superseded
        }
    }

    fn fallback_story(&self, page_number: u32, story_idea: &str) -> GeneratedStory {
        let mut random = self.random.lock().unwrap_or_else(PoisonError::into_inner);
        fallback_story(page_number, story_idea, random.as_mut())
    }

    pub fn go_to_previous_page(&self) -> Option<Page> {
        self.lock().go_to_previous().cloned()
    }

    pub fn go_to_next_page(&self) -> Option<Page> {
        self.lock().go_to_next().cloned()
    }

    pub fn reset(&self) {
        self.lock().reset();
        info!("story reset");
    }

    pub fn current_page(&self) -> Option<Page> {
        self.lock().current_page().cloned()
    }

    pub fn pages(&self) -> Vec<Page> {
        self.lock().pages().to_vec()
    }

    pub fn story_idea(&self) -> String {
        self.lock().story_idea().to_string()
    }

    pub fn narrative_history(&self) -> String {
        self.lock().narrative_history().to_string()
    }

    pub fn is_generating(&self) -> bool {
        self.lock().is_generating()
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock().phase(self.max_pages)
    }

    pub fn is_at_first_page(&self) -> bool {
        self.lock().is_at_first_page()
    }

    pub fn is_at_last_page(&self) -> bool {
        self.lock().is_at_last_page()
    }

    pub fn should_show_conclusion(&self) -> bool {
        self.lock().should_show_conclusion(self.max_pages)
    }

    pub fn navigation_state(&self) -> NavigationState {
        self.lock().navigation_state(self.max_pages)
    }

    pub fn story_stats(&self) -> StoryStats {
        self.lock().stats(self.max_pages)
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
