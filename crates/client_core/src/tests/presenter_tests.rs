use super::*;
use crate::{gateway::MissingGenerationGateway, random::StdRandomSource};

fn presenter() -> StoryPresenter {
    let controller = StoryController::with_random_source(
        Arc::new(MissingGenerationGateway),
        Box::new(StdRandomSource::seeded(11)),
    );
    StoryPresenter::new(Arc::new(controller))
}

#[tokio::test]
async fn blank_idea_is_rejected_without_starting_a_story() {
    let mut presenter = presenter();
    let update = presenter.handle(UserAction::SubmitIdea("   ".into())).await;
    assert_eq!(update, ViewUpdate::InputError(EMPTY_IDEA_MESSAGE.into()));
    assert_eq!(presenter.screen(), Screen::Intro);
    assert!(presenter.controller().pages().is_empty());
}

#[tokio::test]
async fn submitting_idea_shows_first_page() {
    let mut presenter = presenter();
    let update = presenter
        .handle(UserAction::SubmitIdea("  a lost puppy ".into()))
        .await;

    let ViewUpdate::ShowPage { page, navigation } = update else {
        panic!("expected a page, got {update:?}");
    };
    assert_eq!(page.page_number, 1);
    assert!(page.story_text.contains("\"a lost puppy\""));
    assert_eq!(navigation.current_page, 1);
    assert!(!navigation.can_go_back);
    assert_eq!(presenter.screen(), Screen::Story);
    assert_eq!(presenter.controller().story_idea(), "a lost puppy");
}

#[tokio::test]
async fn blank_continuation_is_rejected() {
    let mut presenter = presenter();
    presenter
        .handle(UserAction::SubmitIdea("a lost puppy".into()))
        .await;
    let update = presenter
        .handle(UserAction::SubmitContinuation("\n".into()))
        .await;
    assert_eq!(
        update,
        ViewUpdate::InputError(EMPTY_CONTINUATION_MESSAGE.into())
    );
    assert_eq!(presenter.controller().pages().len(), 1);
}

#[tokio::test]
async fn final_continuation_routes_to_conclusion() {
    let mut presenter = presenter();
    presenter
        .handle(UserAction::SubmitIdea("a lost puppy".into()))
        .await;
    for response in ["finds a map", "follows it", "meets a cat"] {
        let update = presenter
            .handle(UserAction::SubmitContinuation(response.into()))
            .await;
        assert!(matches!(update, ViewUpdate::ShowPage { .. }));
    }

    let update = presenter
        .handle(UserAction::SubmitContinuation("finds home".into()))
        .await;
    let ViewUpdate::ShowConclusion(stats) = update else {
        panic!("expected conclusion, got {update:?}");
    };
    assert_eq!(stats.total_pages, 5);
    assert_eq!(stats.completion_percentage, 100);
    assert_eq!(presenter.screen(), Screen::Conclusion);

    let again = presenter
        .handle(UserAction::SubmitContinuation("and then".into()))
        .await;
    assert!(matches!(again, ViewUpdate::ShowConclusion(_)));
    assert_eq!(presenter.controller().pages().len(), 5);
}

#[tokio::test]
async fn navigation_updates_only_when_cursor_moves() {
    let mut presenter = presenter();
    presenter
        .handle(UserAction::SubmitIdea("a lost puppy".into()))
        .await;
    presenter
        .handle(UserAction::SubmitContinuation("finds a map".into()))
        .await;

    assert_eq!(
        presenter.handle(UserAction::GoNext).await,
        ViewUpdate::Unchanged
    );
    let update = presenter.handle(UserAction::GoBack).await;
    let ViewUpdate::ShowPage { page, navigation } = update else {
        panic!("expected a page, got {update:?}");
    };
    assert_eq!(page.page_number, 1);
    assert!(navigation.can_go_next);
    assert_eq!(
        presenter.handle(UserAction::GoBack).await,
        ViewUpdate::Unchanged
    );
}

#[tokio::test]
async fn view_story_and_new_story_from_conclusion() {
    let mut presenter = presenter();
    presenter
        .handle(UserAction::SubmitIdea("a lost puppy".into()))
        .await;
    for response in ["a", "b", "c", "d"] {
        presenter
            .handle(UserAction::SubmitContinuation(response.into()))
            .await;
    }
    assert_eq!(presenter.screen(), Screen::Conclusion);

    let update = presenter.handle(UserAction::ViewStory).await;
    assert!(matches!(update, ViewUpdate::ShowPage { ref page, .. } if page.page_number == 5));
    assert_eq!(presenter.screen(), Screen::Story);

    let share = presenter.handle(UserAction::Share).await;
    assert_eq!(
        share,
        ViewUpdate::ShareText(
            "I just created an amazing 5-page adventure story with Imaginarium!".into()
        )
    );

    assert_eq!(
        presenter.handle(UserAction::NewStory).await,
        ViewUpdate::ShowIntro
    );
    assert_eq!(presenter.screen(), Screen::Intro);
    assert_eq!(presenter.controller().story_stats().total_pages, 0);
}

#[tokio::test]
async fn restart_clears_story() {
    let mut presenter = presenter();
    presenter
        .handle(UserAction::SubmitIdea("a lost puppy".into()))
        .await;
    assert_eq!(
        presenter.handle(UserAction::Restart).await,
        ViewUpdate::ShowIntro
    );
    assert!(presenter.controller().current_page().is_none());
    assert_eq!(
        presenter.handle(UserAction::ViewStory).await,
        ViewUpdate::ShowIntro
    );
}
