use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use uuid::Uuid;

use shared::domain::{AccountSummary, CheckoutStatus, MembershipLevel, UserId};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub password_salt: &'a str,
    pub is_child: bool,
    pub parent_email: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    pub user_id: UserId,
    pub email: String,
    pub is_child: bool,
    pub parent_email: Option<String>,
    pub membership_level: MembershipLevel,
    pub membership_expiry: Option<DateTime<Utc>>,
}

impl StoredUser {
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            user_id: self.user_id,
            email: self.email.clone(),
            is_child: self.is_child,
            parent_email: self.parent_email.clone(),
            membership_level: self.membership_level,
            membership_expiry: self.membership_expiry,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoredCredentials {
    pub user_id: UserId,
    pub password_hash: String,
    pub password_salt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCheckoutSession {
    pub session_id: String,
    pub user_id: UserId,
    pub price_id: String,
    pub amount_cents: i64,
    pub status: CheckoutStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

const USER_COLUMNS: &str =
    "id, email, is_child, parent_email, membership_level, membership_expiry";

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Inserts a Kids-tier account. Returns `None` when the email is taken.
    pub async fn create_user(&self, user: NewUser<'_>) -> Result<Option<UserId>> {
        let row = sqlx::query(
            "INSERT INTO users (email, password_hash, password_salt, is_child, parent_email)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(email) DO NOTHING
             RETURNING id",
        )
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.password_salt)
        .bind(user.is_child)
        .bind(user.parent_email)
        .fetch_optional(&self.pool)
        .await
        .context("failed to insert user")?;
        Ok(row.map(|r| UserId(r.get::<i64, _>(0))))
    }

    pub async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<StoredCredentials>> {
        let row = sqlx::query("SELECT id, password_hash, password_salt FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| StoredCredentials {
            user_id: UserId(r.get::<i64, _>("id")),
            password_hash: r.get("password_hash"),
            password_salt: r.get("password_salt"),
        }))
    }

    pub async fn load_user(&self, user_id: UserId) -> Result<Option<StoredUser>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(user_id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<StoredUser>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    /// Returns false when no such user exists.
    pub async fn update_membership(
        &self,
        user_id: UserId,
        level: MembershipLevel,
        expiry: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let result =
            sqlx::query("UPDATE users SET membership_level = ?, membership_expiry = ? WHERE id = ?")
                .bind(level.as_str())
                .bind(expiry)
                .bind(user_id.0)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn insert_auth_session(
        &self,
        jti: &str,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("INSERT INTO auth_sessions (jti, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(jti)
            .bind(user_id.0)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .context("failed to insert auth session")?;
        Ok(())
    }

    /// True when the session exists for this user, has not been revoked, and
    /// has not expired at `now`.
    pub async fn auth_session_active(
        &self,
        jti: &str,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let row = sqlx::query(
            "SELECT expires_at, revoked_at FROM auth_sessions WHERE jti = ? AND user_id = ?",
        )
        .bind(jti)
        .bind(user_id.0)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(false);
        };
        let expires_at: DateTime<Utc> = row.try_get("expires_at")?;
        let revoked_at: Option<DateTime<Utc>> = row.try_get("revoked_at")?;
        Ok(revoked_at.is_none() && now < expires_at)
    }

    /// Returns false when the session was unknown or already revoked.
    pub async fn revoke_auth_session(&self, jti: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE auth_sessions SET revoked_at = ? WHERE jti = ? AND revoked_at IS NULL",
        )
        .bind(Utc::now())
        .bind(jti)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn create_checkout_session(
        &self,
        user_id: UserId,
        price_id: &str,
        amount_cents: i64,
    ) -> Result<String> {
        let session_id = format!("cs_{}", Uuid::new_v4().simple());
        sqlx::query(
            "INSERT INTO checkout_sessions (id, user_id, price_id, amount_cents, status)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(session_id.as_str())
        .bind(user_id.0)
        .bind(price_id)
        .bind(amount_cents)
        .bind(CheckoutStatus::Pending.as_str())
        .execute(&self.pool)
        .await
        .context("failed to insert checkout session")?;
        Ok(session_id)
    }

    pub async fn load_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<Option<StoredCheckoutSession>> {
        let row = sqlx::query(
            "SELECT id, user_id, price_id, amount_cents, status, completed_at
             FROM checkout_sessions WHERE id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(checkout_from_row).transpose()
    }

    /// Moves a pending checkout to `status`. Returns false when the session is
    /// unknown or has already left the pending state.
    pub async fn mark_checkout_status(
        &self,
        session_id: &str,
        status: CheckoutStatus,
    ) -> Result<bool> {
        let completed_at = (status == CheckoutStatus::Completed).then(Utc::now);
        let result = sqlx::query(
            "UPDATE checkout_sessions SET status = ?, completed_at = ?
             WHERE id = ? AND status = 'pending'",
        )
        .bind(status.as_str())
        .bind(completed_at)
        .bind(session_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Completes a pending checkout and upgrades its user to Pro until
    /// `expiry`, in one transaction. Returns the upgraded user, or `None` when
    /// the session was unknown or no longer pending.
    pub async fn complete_checkout(
        &self,
        session_id: &str,
        expiry: DateTime<Utc>,
    ) -> Result<Option<UserId>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            "UPDATE checkout_sessions SET status = ?, completed_at = ?
             WHERE id = ? AND status = 'pending'
             RETURNING user_id",
        )
        .bind(CheckoutStatus::Completed.as_str())
        .bind(Utc::now())
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };
        let user_id = UserId(row.get::<i64, _>(0));

        sqlx::query("UPDATE users SET membership_level = ?, membership_expiry = ? WHERE id = ?")
            .bind(MembershipLevel::Pro.as_str())
            .bind(expiry)
            .bind(user_id.0)
            .execute(&mut *tx)
            .await
            .context("failed to upgrade membership")?;
        tx.commit().await?;
        Ok(Some(user_id))
    }
}

fn user_from_row(row: &SqliteRow) -> Result<StoredUser> {
    let level: String = row.try_get("membership_level")?;
    Ok(StoredUser {
        user_id: UserId(row.try_get("id")?),
        email: row.try_get("email")?,
        is_child: row.try_get("is_child")?,
        parent_email: row.try_get("parent_email")?,
        membership_level: MembershipLevel::from_str(&level).map_err(|e| anyhow!(e))?,
        membership_expiry: row.try_get("membership_expiry")?,
    })
}

fn checkout_from_row(row: &SqliteRow) -> Result<StoredCheckoutSession> {
    let status: String = row.try_get("status")?;
    Ok(StoredCheckoutSession {
        session_id: row.try_get("id")?,
        user_id: UserId(row.try_get("user_id")?),
        price_id: row.try_get("price_id")?,
        amount_cents: row.try_get("amount_cents")?,
        status: CheckoutStatus::from_str(&status).map_err(|e| anyhow!(e))?,
        completed_at: row.try_get("completed_at")?,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
