//! Story constants and text templates used by both the client fallback and the
//! server's template generator.

/// Number of pages after which a story is complete.
pub const MAX_PAGES: u32 = 5;

pub const PLACEHOLDER_PALETTE: [&str; 6] =
    ["6c5ce7", "74b9ff", "fd79a8", "fdcb6e", "00b894", "e17055"];

pub const CONTINUATION_PHRASES: [&str; 8] = [
    "The brave adventurer decided to explore the mysterious path ahead.",
    "A wise old wizard appeared with an important message.",
    "The adventurer discovered a hidden treasure chest.",
    "A friendly dragon offered to help on the journey.",
    "The path led to a magical forest filled with talking animals.",
    "A storm began to brew, changing everything.",
    "The adventurer met a group of helpful friends.",
    "A secret door appeared in the ancient castle wall.",
];

/// The server's template generator only cycles through the first five phrases.
pub const SERVER_PHRASE_COUNT: usize = 5;

pub const OPENING_PROMPT: &str = "What happens next in your adventure?";
pub const CONTINUATION_PROMPT: &str = "What should happen next?";
pub const SERVER_PROMPT: &str = "What happens next in your adventure? Choose something exciting!";

pub fn opening_text(story_idea: &str) -> String {
    format!(
        "Once upon a time, in a magical world filled with wonder, there was a brave adventurer who discovered something amazing: \"{story_idea}\". The journey was about to begin, and every choice would shape the destiny of this incredible tale."
    )
}

pub fn continuation_text(phrase: &str) -> String {
    format!(
        "Following the previous adventure, {phrase} This opened up new possibilities and exciting challenges ahead."
    )
}

pub fn placeholder_color(page_number: u32) -> &'static str {
    PLACEHOLDER_PALETTE[page_number as usize % PLACEHOLDER_PALETTE.len()]
}

pub fn placeholder_image_url(page_number: u32) -> String {
    format!(
        "https://via.placeholder.com/400x300/{}/ffffff?text=Page+{page_number}",
        placeholder_color(page_number)
    )
}

/// Illustration served by the generation endpoint for `page_number`.
pub fn story_page_image_url(page_number: u32) -> String {
    format!(
        "https://via.placeholder.com/400x300/{}/ffffff?text=Story+Page+{page_number}",
        placeholder_color(page_number)
    )
}

/// `round(100 * total / max)`, rounding halves up. A zero `max` reports 0.
pub fn completion_percentage(total_pages: u32, max_pages: u32) -> u32 {
    if max_pages == 0 {
        return 0;
    }
    let total = u64::from(total_pages);
    let max = u64::from(max_pages);
    ((200 * total + max) / (2 * max)) as u32
}
