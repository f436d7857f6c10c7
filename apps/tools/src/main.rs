use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use shared::domain::MembershipLevel;
use storage::Storage;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/server.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    ShowUser {
        email: String,
    },
    SetMembership {
        #[arg(long)]
        email: String,
        /// kids or pro
        #[arg(long)]
        level: MembershipLevel,
        /// Pro expiry relative to now; omitted means no expiry.
        #[arg(long)]
        expires_in_days: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::ShowUser { email } => {
            let Some(user) = storage.find_user_by_email(&email).await? else {
                bail!("no user registered as {email}");
            };
            println!(
                "user_id={} email={} tier={} expiry={} child={} parent={}",
                user.user_id.0,
                user.email,
                user.membership_level,
                user.membership_expiry
                    .map(|expiry| expiry.to_rfc3339())
                    .unwrap_or_else(|| "-".into()),
                user.is_child,
                user.parent_email.as_deref().unwrap_or("-"),
            );
        }
        Command::SetMembership {
            email,
            level,
            expires_in_days,
        } => {
            let user = storage
                .find_user_by_email(&email)
                .await?
                .with_context(|| format!("no user registered as {email}"))?;
            let expiry = match (level, expires_in_days) {
                (MembershipLevel::Kids, _) => None,
                (MembershipLevel::Pro, Some(days)) => Some(Utc::now() + Duration::days(days)),
                (MembershipLevel::Pro, None) => None,
            };
            storage.update_membership(user.user_id, level, expiry).await?;
            println!("user_id={} tier={level}", user.user_id.0);
        }
    }

    Ok(())
}
