use super::*;
use chrono::Duration;

fn new_user<'a>(email: &'a str, is_child: bool, parent_email: Option<&'a str>) -> NewUser<'a> {
    NewUser {
        email,
        password_hash: "hash",
        password_salt: "salt",
        is_child,
        parent_email,
    }
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("storage.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[tokio::test]
async fn new_users_start_on_kids_tier() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let id = storage
        .create_user(new_user("kid@example.com", true, Some("parent@example.com")))
        .await
        .expect("insert")
        .expect("fresh email");

    let user = storage.load_user(id).await.expect("load").expect("user");
    assert_eq!(user.email, "kid@example.com");
    assert!(user.is_child);
    assert_eq!(user.parent_email.as_deref(), Some("parent@example.com"));
    assert_eq!(user.membership_level, MembershipLevel::Kids);
    assert_eq!(user.membership_expiry, None);
    assert_eq!(user.summary().user_id, id);
}

#[tokio::test]
async fn duplicate_email_is_rejected_case_insensitively() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .create_user(new_user("ann@example.com", false, None))
        .await
        .expect("insert")
        .expect("fresh email");
    let duplicate = storage
        .create_user(new_user("ANN@example.com", false, None))
        .await
        .expect("insert");
    assert_eq!(duplicate, None);
}

#[tokio::test]
async fn credentials_are_found_by_email() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let id = storage
        .create_user(new_user("ann@example.com", false, None))
        .await
        .expect("insert")
        .expect("fresh email");

    let creds = storage
        .find_credentials_by_email("ann@example.com")
        .await
        .expect("query")
        .expect("credentials");
    assert_eq!(creds.user_id, id);
    assert_eq!(creds.password_hash, "hash");
    assert_eq!(creds.password_salt, "salt");
    assert!(storage
        .find_credentials_by_email("bob@example.com")
        .await
        .expect("query")
        .is_none());
}

#[tokio::test]
async fn membership_updates_round_trip_expiry() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let id = storage
        .create_user(new_user("ann@example.com", false, None))
        .await
        .expect("insert")
        .expect("fresh email");
    let expiry = Utc::now() + Duration::days(30);

    assert!(storage
        .update_membership(id, MembershipLevel::Pro, Some(expiry))
        .await
        .expect("update"));
    let user = storage.load_user(id).await.expect("load").expect("user");
    assert_eq!(user.membership_level, MembershipLevel::Pro);
    assert_eq!(user.membership_expiry, Some(expiry));

    assert!(!storage
        .update_membership(UserId(999), MembershipLevel::Pro, None)
        .await
        .expect("update"));
}

#[tokio::test]
async fn auth_sessions_expire_and_revoke() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let id = storage
        .create_user(new_user("ann@example.com", false, None))
        .await
        .expect("insert")
        .expect("fresh email");
    let now = Utc::now();
    storage
        .insert_auth_session("jti-1", id, now + Duration::hours(1))
        .await
        .expect("session");

    assert!(storage.auth_session_active("jti-1", id, now).await.expect("check"));
    assert!(!storage
        .auth_session_active("jti-1", id, now + Duration::hours(2))
        .await
        .expect("check"));
    assert!(!storage
        .auth_session_active("jti-1", UserId(id.0 + 1), now)
        .await
        .expect("check"));

    assert!(storage.revoke_auth_session("jti-1").await.expect("revoke"));
    assert!(!storage.revoke_auth_session("jti-1").await.expect("revoke"));
    assert!(!storage.auth_session_active("jti-1", id, now).await.expect("check"));
}

#[tokio::test]
async fn checkout_leaves_pending_only_once() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let id = storage
        .create_user(new_user("ann@example.com", false, None))
        .await
        .expect("insert")
        .expect("fresh email");
    let session_id = storage
        .create_checkout_session(id, "price_pro", 4999)
        .await
        .expect("checkout");
    assert!(session_id.starts_with("cs_"));

    let pending = storage
        .load_checkout_session(&session_id)
        .await
        .expect("load")
        .expect("session");
    assert_eq!(pending.status, CheckoutStatus::Pending);
    assert_eq!(pending.amount_cents, 4999);
    assert_eq!(pending.user_id, id);

    assert!(storage
        .mark_checkout_status(&session_id, CheckoutStatus::Expired)
        .await
        .expect("mark"));
    assert!(!storage
        .mark_checkout_status(&session_id, CheckoutStatus::Completed)
        .await
        .expect("mark"));
    let expired = storage
        .load_checkout_session(&session_id)
        .await
        .expect("load")
        .expect("session");
    assert_eq!(expired.status, CheckoutStatus::Expired);
    assert_eq!(expired.completed_at, None);
}

#[tokio::test]
async fn completing_checkout_upgrades_user_once() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let id = storage
        .create_user(new_user("ann@example.com", false, None))
        .await
        .expect("insert")
        .expect("fresh email");
    let session_id = storage
        .create_checkout_session(id, "price_pro", 4999)
        .await
        .expect("checkout");
    let expiry = Utc::now() + Duration::days(365);

    let upgraded = storage
        .complete_checkout(&session_id, expiry)
        .await
        .expect("complete");
    assert_eq!(upgraded, Some(id));
    let user = storage.load_user(id).await.expect("load").expect("user");
    assert_eq!(user.membership_level, MembershipLevel::Pro);
    assert_eq!(user.membership_expiry, Some(expiry));

    let again = storage
        .complete_checkout(&session_id, expiry + Duration::days(365))
        .await
        .expect("complete");
    assert_eq!(again, None);
    let user = storage.load_user(id).await.expect("load").expect("user");
    assert_eq!(user.membership_expiry, Some(expiry));

    assert_eq!(
        storage
            .complete_checkout("cs_unknown", expiry)
            .await
            .expect("complete"),
        None
    );
}
