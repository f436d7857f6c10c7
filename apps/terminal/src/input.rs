use client_core::{Screen, UserAction};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Action(UserAction),
    Help,
    Quit,
    Unknown(String),
}

pub const HELP: &str = "\
commands:
  :back     previous page
  :next     next page
  :view     re-read the story from the conclusion screen
  :restart  start over
  :new      start a new story
  :share    print share text
  :help     show this help
  :quit     exit
anything else is your story idea or what happens next";

/// Maps one line of terminal input to an action for the current screen.
/// Plain text is the idea on the intro screen and a continuation elsewhere.
pub fn parse_input(screen: Screen, line: &str) -> Input {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix(':') else {
        return Input::Action(match screen {
            Screen::Intro => UserAction::SubmitIdea(line.to_string()),
            Screen::Story | Screen::Conclusion => UserAction::SubmitContinuation(line.to_string()),
        });
    };

    match command.to_ascii_lowercase().as_str() {
        "back" | "b" => Input::Action(UserAction::GoBack),
        "next" | "n" => Input::Action(UserAction::GoNext),
        "view" => Input::Action(UserAction::ViewStory),
        "restart" => Input::Action(UserAction::Restart),
        "new" => Input::Action(UserAction::NewStory),
        "share" => Input::Action(UserAction::Share),
        "help" | "h" | "?" => Input::Help,
        "quit" | "q" | "exit" => Input::Quit,
        other => Input::Unknown(other.to_string()),
    }
}
