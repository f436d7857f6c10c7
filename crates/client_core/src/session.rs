use shared::{
    domain::{NavigationState, Page, StoryStats},
    story::completion_percentage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Empty,
    Active,
    Complete,
}

/// State of one authoring episode. Owned by [`crate::StoryController`];
/// everything public here is a read.
#[derive(Debug, Clone, Default)]
pub struct StorySession {
    story_idea: String,
    pages: Vec<Page>,
    current_index: usize,
    narrative_history: String,
    is_generating: bool,
    epoch: u64,
}

/// Snapshot taken when a generation cycle claims the session.
#[derive(Debug, Clone)]
pub(crate) struct CycleTicket {
    pub(crate) epoch: u64,
    pub(crate) page_number: u32,
    pub(crate) story_idea: String,
    pub(crate) narrative_history: String,
}

impl StorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn story_idea(&self) -> &str {
        &self.story_idea
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn narrative_history(&self) -> &str {
        &self.narrative_history
    }

    pub fn is_generating(&self) -> bool {
        self.is_generating
    }

    pub fn phase(&self, max_pages: u32) -> SessionPhase {
        if self.pages.is_empty() {
            SessionPhase::Empty
        } else if self.total_pages() >= max_pages {
            SessionPhase::Complete
        } else {
            SessionPhase::Active
        }
    }

    pub fn total_pages(&self) -> u32 {
        self.pages.len() as u32
    }

    pub fn current_page(&self) -> Option<&Page> {
        self.pages.get(self.current_index)
    }

    pub fn is_at_first_page(&self) -> bool {
        self.current_index == 0
    }

    pub fn is_at_last_page(&self) -> bool {
        self.current_index + 1 >= self.pages.len()
    }

    pub fn should_show_conclusion(&self, max_pages: u32) -> bool {
        self.phase(max_pages) == SessionPhase::Complete
    }

    pub fn navigation_state(&self, max_pages: u32) -> NavigationState {
        NavigationState {
            can_go_back: !self.is_at_first_page(),
            can_go_next: !self.is_at_last_page(),
            current_page: if self.pages.is_empty() {
                0
            } else {
                self.current_index as u32 + 1
            },
            total_pages: self.total_pages(),
            should_show_conclusion: self.should_show_conclusion(max_pages),
        }
    }

    pub fn stats(&self, max_pages: u32) -> StoryStats {
        StoryStats {
            total_pages: self.total_pages(),
            max_pages,
            story_idea: self.story_idea.clone(),
            completion_percentage: completion_percentage(self.total_pages(), max_pages),
        }
    }

    pub(crate) fn go_to_previous(&mut self) -> Option<&Page> {
        if self.is_at_first_page() {
            return None;
        }
        self.current_index -= 1;
        self.pages.get(self.current_index)
    }

    pub(crate) fn go_to_next(&mut self) -> Option<&Page> {
        if self.is_at_last_page() {
            return None;
        }
        self.current_index += 1;
        self.pages.get(self.current_index)
    }

    /// Clears the previous story and records a new seed. Any cycle still in
    /// flight belongs to the old epoch and will be discarded.
    pub(crate) fn start(&mut self, story_idea: String) {
        self.reset();
        self.story_idea = story_idea;
    }

    pub(crate) fn reset(&mut self) {
        let epoch = self.epoch.wrapping_add(1);
        *self = Self {
            epoch,
            ..Self::default()
        };
    }

    /// Marks a generation cycle in flight. `None` when one already is.
    pub(crate) fn claim(&mut self) -> Option<CycleTicket> {
        if self.is_generating {
            return None;
        }
        self.is_generating = true;
        Some(CycleTicket {
            epoch: self.epoch,
            page_number: self.total_pages() + 1,
            story_idea: self.story_idea.clone(),
            narrative_history: self.narrative_history.clone(),
        })
    }

    /// Clears the in-flight flag unless a newer epoch has taken over.
    pub(crate) fn release(&mut self, epoch: u64) {
        if self.epoch == epoch {
            self.is_generating = false;
        }
    }

    /// Appends the page produced for `ticket`. Returns false when the ticket's
    /// epoch was superseded, in which case nothing changes.
    pub(crate) fn commit(
        &mut self,
        ticket: &CycleTicket,
        page: Page,
        generated_text: Option<&str>,
    ) -> bool {
        if self.epoch != ticket.epoch || page.page_number != self.total_pages() + 1 {
            return false;
        }
        if let Some(text) = generated_text {
            if !self.narrative_history.is_empty() {
                self.narrative_history.push(' ');
            }
            self.narrative_history.push_str(text);
        }
        self.pages.push(page);
        self.current_index = self.pages.len() - 1;
        true
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
