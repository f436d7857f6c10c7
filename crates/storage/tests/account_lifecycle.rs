use chrono::{Duration, Utc};
use shared::domain::{CheckoutStatus, MembershipLevel};
use storage::{NewUser, Storage};

#[tokio::test]
async fn account_survives_reopen_and_upgrade() {
    let dir = tempfile::tempdir().expect("tempdir");
    let database_url = format!(
        "sqlite://{}",
        dir.path()
            .join("accounts.db")
            .to_string_lossy()
            .replace('\\', "/")
    );

    let storage = Storage::new(&database_url).await.expect("db");
    let user_id = storage
        .create_user(NewUser {
            email: "kid@example.com",
            password_hash: "hash",
            password_salt: "salt",
            is_child: true,
            parent_email: Some("parent@example.com"),
        })
        .await
        .expect("insert")
        .expect("fresh email");
    let session_id = storage
        .create_checkout_session(user_id, "price_pro", 4999)
        .await
        .expect("checkout");
    drop(storage);

    let reopened = Storage::new(&database_url).await.expect("reopen");
    let expiry = Utc::now() + Duration::days(365);
    assert_eq!(
        reopened
            .complete_checkout(&session_id, expiry)
            .await
            .expect("complete"),
        Some(user_id)
    );

    let user = reopened
        .find_user_by_email("kid@example.com")
        .await
        .expect("query")
        .expect("user");
    assert_eq!(user.membership_level, MembershipLevel::Pro);
    assert_eq!(user.membership_expiry, Some(expiry));

    let session = reopened
        .load_checkout_session(&session_id)
        .await
        .expect("load")
        .expect("session");
    assert_eq!(session.status, CheckoutStatus::Completed);
    assert!(session.completed_at.is_some());
}
