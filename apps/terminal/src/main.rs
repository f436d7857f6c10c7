use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    load_client_settings, AccountClient, ClientSettings, StoryPresenter, ViewUpdate,
};
use shared::domain::UserId;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod input;

use input::{parse_input, Input, HELP};

#[derive(Parser, Debug)]
#[command(name = "storyteller", about = "Interactive picture-story builder")]
struct Args {
    /// Generation and account server; overrides storyteller.toml.
    #[arg(long)]
    gateway_url: Option<String>,
    /// Pages per story.
    #[arg(long)]
    max_pages: Option<u32>,
    /// Seed for fallback phrase selection.
    #[arg(long)]
    seed: Option<u64>,
    /// Never contact the server; every page uses fallback content.
    #[arg(long)]
    offline: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a story interactively (the default).
    Story,
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        child: bool,
        #[arg(long)]
        parent_email: Option<String>,
    },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout {
        #[arg(long)]
        token: String,
    },
    Membership {
        user_id: i64,
        #[arg(long)]
        token: String,
    },
    /// Print where a signed-in user should land.
    Route {
        #[arg(long)]
        token: Option<String>,
    },
    Upgrade {
        #[arg(long)]
        token: String,
        #[arg(long)]
        price_id: String,
        #[arg(long, default_value = "https://localhost/success")]
        success_url: String,
        #[arg(long, default_value = "https://localhost/cancel")]
        cancel_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    let settings = apply_overrides(load_client_settings()?, &args);

    match args.command.unwrap_or(Command::Story) {
        Command::Story => run_story(&settings).await,
        command => {
            let client = AccountClient::new(&settings.gateway_url)
                .context("invalid account server url")?;
            run_account_command(&client, command).await;
            Ok(())
        }
    }
}

fn apply_overrides(mut settings: ClientSettings, args: &Args) -> ClientSettings {
    if let Some(url) = &args.gateway_url {
        settings.gateway_url = url.clone();
    }
    if args.offline {
        settings.gateway_url.clear();
    }
    if let Some(max_pages) = args.max_pages {
        settings.max_pages = max_pages;
    }
    if args.seed.is_some() {
        settings.rng_seed = args.seed;
    }
    settings
}

async fn run_story(settings: &ClientSettings) -> Result<()> {
    let controller = settings
        .build_controller()
        .context("invalid generation gateway url")?;
    debug!(
        gateway = %settings.gateway_url,
        max_pages = settings.max_pages,
        "story session ready"
    );
    let mut presenter = StoryPresenter::new(Arc::new(controller));
    println!("Welcome to Imaginarium! Type your story idea, or :help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_input(presenter.screen(), &line) {
            Input::Quit => break,
            Input::Help => println!("{HELP}"),
            Input::Unknown(command) => println!("unknown command ':{command}' (try :help)"),
            Input::Action(action) => {
                let update = presenter.handle(action).await;
                render(&update);
            }
        }
    }
    Ok(())
}

fn render(update: &ViewUpdate) {
    match update {
        ViewUpdate::ShowIntro => {
            println!("\nWhat story would you like to tell?");
        }
        ViewUpdate::ShowPage { page, navigation } => {
            println!(
                "\n--- Page {} of {} ---",
                navigation.current_page, navigation.total_pages
            );
            println!("[illustration: {}]", page.image_url);
            println!("{}", page.story_text);
            if let Some(response) = &page.user_response {
                println!("(you said: {response})");
            }
            if navigation.can_go_next {
                println!("(:next to read on)");
            } else {
                println!("\n{}", page.prompt_text);
            }
        }
        ViewUpdate::ShowConclusion(stats) => {
            println!(
                "\nThe End! \"{}\" is complete with {} pages ({}%).",
                stats.story_idea, stats.total_pages, stats.completion_percentage
            );
            println!("(:view to re-read, :share, :new for another story)");
        }
        ViewUpdate::InputError(message) => println!("{message}"),
        ViewUpdate::ShareText(text) => println!("{text}"),
        ViewUpdate::Unchanged => {}
    }
}

async fn run_account_command(client: &AccountClient, command: Command) {
    match command {
        Command::Story => {}
        Command::Register {
            email,
            password,
            child,
            parent_email,
        } => {
            let outcome = client
                .register_user(&email, &password, child, parent_email.as_deref())
                .await;
            match (outcome.user, outcome.token) {
                (Some(user), Some(token)) => {
                    println!(
                        "registered user_id={} tier={}",
                        user.user_id.0, user.membership_level
                    );
                    println!("token={token}");
                }
                _ => println!("registration failed: {}", outcome.error.unwrap_or_default()),
            }
        }
        Command::Login { email, password } => {
            let outcome = client.login_user(&email, &password).await;
            match (outcome.user, outcome.token) {
                (Some(user), Some(token)) => {
                    println!(
                        "logged in user_id={} tier={}",
                        user.user_id.0, user.membership_level
                    );
                    println!("token={token}");
                }
                _ => println!("login failed: {}", outcome.error.unwrap_or_default()),
            }
        }
        Command::Logout { token } => {
            client.set_token(Some(token));
            let outcome = client.logout_user().await;
            if outcome.success {
                println!("logged out");
            } else {
                println!("logout failed: {}", outcome.error.unwrap_or_default());
            }
        }
        Command::Membership { user_id, token } => {
            client.set_token(Some(token));
            let status = client.check_membership_status(UserId(user_id)).await;
            match status.level {
                Some(level) => println!("tier={level} valid={}", status.valid),
                None => println!("no membership found (valid=false)"),
            }
        }
        Command::Route { token } => {
            client.set_token(token);
            let route = client.restore_session().await;
            println!("{}", route.path());
        }
        Command::Upgrade {
            token,
            price_id,
            success_url,
            cancel_url,
        } => {
            client.set_token(Some(token));
            let outcome = client
                .upgrade_to_pro(&price_id, &success_url, &cancel_url)
                .await;
            match outcome.url {
                Some(url) => println!("complete your purchase at {url}"),
                None => println!("upgrade failed: {}", outcome.error.unwrap_or_default()),
            }
        }
    }
}
