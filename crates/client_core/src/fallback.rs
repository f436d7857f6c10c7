//! Locally synthesized content served when the generation gateway fails.

use shared::story::{
    continuation_text, opening_text, placeholder_image_url, CONTINUATION_PHRASES,
    CONTINUATION_PROMPT, OPENING_PROMPT,
};

use crate::{gateway::GeneratedStory, random::RandomSource};

pub fn fallback_story(
    page_number: u32,
    story_idea: &str,
    random: &mut dyn RandomSource,
) -> GeneratedStory {
    if page_number <= 1 {
        return GeneratedStory {
            story_text: opening_text(story_idea),
            prompt_text: OPENING_PROMPT.to_string(),
        };
    }

    let phrase = CONTINUATION_PHRASES[random.pick(CONTINUATION_PHRASES.len())];
    GeneratedStory {
        story_text: continuation_text(phrase),
        prompt_text: CONTINUATION_PROMPT.to_string(),
    }
}

pub fn fallback_image_url(page_number: u32) -> String {
    placeholder_image_url(page_number)
}
