//! View-agnostic adapter between a story UI and the [`StoryController`].
//!
//! The presenter validates user input, decides which screen is showing, and
//! turns controller results into [`ViewUpdate`]s a renderer can draw. It never
//! touches session state except through controller operations.

use std::sync::Arc;

use shared::domain::{NavigationState, Page, StoryStats};
use tracing::debug;

use crate::controller::{GenerationOutcome, StoryController};

pub const EMPTY_IDEA_MESSAGE: &str = "Please tell me your story idea!";
pub const EMPTY_CONTINUATION_MESSAGE: &str = "Please tell me what happens next!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Intro,
    Story,
    Conclusion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    SubmitIdea(String),
    SubmitContinuation(String),
    GoBack,
    GoNext,
    Restart,
    ViewStory,
    NewStory,
    Share,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewUpdate {
    ShowIntro,
    ShowPage {
        page: Page,
        navigation: NavigationState,
    },
    ShowConclusion(StoryStats),
    InputError(String),
    ShareText(String),
    Unchanged,
}

pub fn share_text(stats: &StoryStats) -> String {
    format!(
        "I just created an amazing {}-page adventure story with Imaginarium!",
        stats.total_pages
    )
}

pub struct StoryPresenter {
    controller: Arc<StoryController>,
    screen: Screen,
}

impl StoryPresenter {
    pub fn new(controller: Arc<StoryController>) -> Self {
        Self {
            controller,
            screen: Screen::Intro,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn controller(&self) -> &Arc<StoryController> {
        &self.controller
    }

    pub async fn handle(&mut self, action: UserAction) -> ViewUpdate {
        match action {
            UserAction::SubmitIdea(idea) => self.submit_idea(&idea).await,
            UserAction::SubmitContinuation(response) => self.submit_continuation(&response).await,
            UserAction::GoBack => self.show_moved(self.controller.go_to_previous_page()),
            UserAction::GoNext => self.show_moved(self.controller.go_to_next_page()),
            UserAction::Restart | UserAction::NewStory => {
                self.controller.reset();
                self.screen = Screen::Intro;
                ViewUpdate::ShowIntro
            }
            UserAction::ViewStory => match self.controller.current_page() {
                Some(page) => {
                    self.screen = Screen::Story;
                    self.show_page(page)
                }
                None => {
                    self.screen = Screen::Intro;
                    ViewUpdate::ShowIntro
                }
            },
            UserAction::Share => ViewUpdate::ShareText(share_text(&self.controller.story_stats())),
        }
    }

    async fn submit_idea(&mut self, idea: &str) -> ViewUpdate {
        let idea = idea.trim();
        if idea.is_empty() {
            return ViewUpdate::InputError(EMPTY_IDEA_MESSAGE.to_string());
        }

        match self.controller.initialize(idea).await {
            GenerationOutcome::Created(page) => self.after_created(page),
            outcome => {
                debug!(?outcome, "story start produced no page");
                ViewUpdate::Unchanged
            }
        }
    }

    async fn submit_continuation(&mut self, response: &str) -> ViewUpdate {
        let response = response.trim();
        if response.is_empty() {
            return ViewUpdate::InputError(EMPTY_CONTINUATION_MESSAGE.to_string());
        }
        if self.controller.is_generating() {
            return ViewUpdate::Unchanged;
        }

        match self.controller.advance(response).await {
            GenerationOutcome::Created(page) => self.after_created(page),
            GenerationOutcome::StoryComplete => self.show_conclusion(),
            outcome => {
                debug!(?outcome, "continuation produced no page");
                ViewUpdate::Unchanged
            }
        }
    }

    fn after_created(&mut self, page: Page) -> ViewUpdate {
        if self.controller.should_show_conclusion() {
            return self.show_conclusion();
        }
        self.screen = Screen::Story;
        self.show_page(page)
    }

    fn show_conclusion(&mut self) -> ViewUpdate {
        self.screen = Screen::Conclusion;
        ViewUpdate::ShowConclusion(self.controller.story_stats())
    }

    fn show_moved(&mut self, moved: Option<Page>) -> ViewUpdate {
        match moved {
            Some(page) => {
                self.screen = Screen::Story;
                self.show_page(page)
            }
            None => ViewUpdate::Unchanged,
        }
    }

    fn show_page(&self, page: Page) -> ViewUpdate {
        ViewUpdate::ShowPage {
            page,
            navigation: self.controller.navigation_state(),
        }
    }
}

#[cfg(test)]
#[path = "tests/presenter_tests.rs"]
mod tests;
