use super::*;

fn page(number: u32) -> Page {
    Page {
        page_number: number,
        image_url: format!("https://img.test/{number}.png"),
        story_text: format!("text {number}"),
        prompt_text: "next?".to_string(),
        user_response: (number > 1).then(|| format!("response {number}")),
    }
}

fn session_with_pages(count: u32) -> StorySession {
    let mut session = StorySession::new();
    session.start("seed".to_string());
    for number in 1..=count {
        let ticket = session.claim().expect("claim");
        assert!(session.commit(&ticket, page(number), Some(&format!("text {number}"))));
        session.release(ticket.epoch);
    }
    session
}

#[test]
fn empty_session_reports_no_movement() {
    let session = StorySession::new();
    assert_eq!(session.phase(5), SessionPhase::Empty);
    assert!(session.current_page().is_none());
    assert!(session.is_at_first_page());
    assert!(session.is_at_last_page());

    let nav = session.navigation_state(5);
    assert!(!nav.can_go_back);
    assert!(!nav.can_go_next);
    assert_eq!(nav.current_page, 0);
    assert_eq!(nav.total_pages, 0);
    assert!(!nav.should_show_conclusion);
}

#[test]
fn phase_tracks_page_count_against_cap() {
    assert_eq!(session_with_pages(1).phase(5), SessionPhase::Active);
    assert_eq!(session_with_pages(4).phase(5), SessionPhase::Active);
    assert_eq!(session_with_pages(5).phase(5), SessionPhase::Complete);
    assert_eq!(session_with_pages(2).phase(2), SessionPhase::Complete);
}

#[test]
fn navigation_is_idempotent_at_boundaries() {
    let mut session = session_with_pages(3);
    assert_eq!(session.current_index(), 2);
    assert!(session.go_to_next().is_none());
    assert_eq!(session.current_index(), 2);

    assert_eq!(session.go_to_previous().map(|p| p.page_number), Some(2));
    assert_eq!(session.go_to_previous().map(|p| p.page_number), Some(1));
    assert!(session.go_to_previous().is_none());
    assert_eq!(session.current_index(), 0);

    let nav = session.navigation_state(5);
    assert!(!nav.can_go_back);
    assert!(nav.can_go_next);
    assert_eq!(nav.current_page, 1);
    assert_eq!(nav.total_pages, 3);
}

#[test]
fn history_joins_generated_text_with_single_spaces() {
    let session = session_with_pages(3);
    assert_eq!(session.narrative_history(), "text 1 text 2 text 3");
}

#[test]
fn fallback_pages_do_not_extend_history() {
    let mut session = StorySession::new();
    session.start("seed".to_string());
    let ticket = session.claim().expect("claim");
    assert!(session.commit(&ticket, page(1), None));
    assert_eq!(session.narrative_history(), "");
    assert_eq!(session.total_pages(), 1);
}

#[test]
fn claim_is_exclusive_until_released() {
    let mut session = session_with_pages(1);
    let ticket = session.claim().expect("first claim");
    assert_eq!(ticket.page_number, 2);
    assert_eq!(ticket.narrative_history, "text 1");
    assert!(session.is_generating());
    assert!(session.claim().is_none());

    session.release(ticket.epoch);
    assert!(!session.is_generating());
    assert!(session.claim().is_some());
}

#[test]
fn reset_supersedes_in_flight_cycle() {
    let mut session = session_with_pages(2);
    let stale = session.claim().expect("claim");
    session.reset();

    assert!(!session.is_generating());
    assert!(!session.commit(&stale, page(3), Some("late")));
    assert_eq!(session.total_pages(), 0);
    assert_eq!(session.story_idea(), "");
    assert_eq!(session.narrative_history(), "");

    session.start("fresh".to_string());
    let fresh = session.claim().expect("fresh claim");
    session.release(stale.epoch);
    assert!(session.is_generating(), "stale release must not unlock the new cycle");
    session.release(fresh.epoch);
    assert!(!session.is_generating());
}

#[test]
fn stats_report_completion_percentage() {
    let stats = session_with_pages(2).stats(5);
    assert_eq!(stats.total_pages, 2);
    assert_eq!(stats.max_pages, 5);
    assert_eq!(stats.story_idea, "seed");
    assert_eq!(stats.completion_percentage, 40);
}
