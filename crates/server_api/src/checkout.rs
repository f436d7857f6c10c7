use chrono::{Months, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    domain::{CheckoutStatus, UserId},
    error::{ApiError, ErrorCode},
    protocol::{CheckoutSessionRequest, CheckoutSessionResponse, CheckoutWebhookEvent},
};
use tracing::info;

use crate::{accounts::check_parental_approval, auth::secrets_match, internal, ApiContext};

#[derive(Debug, Clone)]
pub struct BillingConfig {
    /// Hosted checkout page; the session id is appended as a path segment.
    pub checkout_base_url: String,
    pub webhook_secret: String,
    pub pro_price_id: String,
    pub pro_price_cents: i64,
    pub pro_membership_months: u32,
    pub parental_approval_threshold_cents: i64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            checkout_base_url: "https://checkout.example.com/pay".into(),
            webhook_secret: "dev-webhook-secret".into(),
            pro_price_id: "price_pro_yearly".into(),
            pro_price_cents: 4999,
            pro_membership_months: 12,
            parental_approval_threshold_cents: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    Upgraded,
    Expired,
    /// The session had already left the pending state.
    AlreadyProcessed,
}

pub async fn create_checkout_session(
    ctx: &ApiContext,
    user_id: UserId,
    request: &CheckoutSessionRequest,
) -> Result<CheckoutSessionResponse, ApiError> {
    if request.price_id != ctx.billing.pro_price_id {
        return Err(ApiError::new(ErrorCode::Validation, "unknown price"));
    }
    if request.success_url.trim().is_empty() || request.cancel_url.trim().is_empty() {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "success and cancel urls are required",
        ));
    }

    let approval = check_parental_approval(ctx, user_id, ctx.billing.pro_price_cents).await;
    if approval.requires_approval {
        let message = match approval.parent_email {
            Some(parent) => format!("parental approval required from {parent}"),
            None => "parental approval required".to_string(),
        };
        return Err(ApiError::new(ErrorCode::Forbidden, message));
    }

    let session_id = ctx
        .storage
        .create_checkout_session(user_id, &request.price_id, ctx.billing.pro_price_cents)
        .await
        .map_err(internal)?;
    info!(user_id = user_id.0, %session_id, "checkout session created");
    let url = format!(
        "{}/{session_id}",
        ctx.billing.checkout_base_url.trim_end_matches('/')
    );
    Ok(CheckoutSessionResponse { session_id, url })
}

pub async fn handle_checkout_event(
    ctx: &ApiContext,
    secret: Option<&str>,
    event: &CheckoutWebhookEvent,
) -> Result<WebhookOutcome, ApiError> {
    let authorized =
        secret.is_some_and(|secret| secrets_match(secret, &ctx.billing.webhook_secret));
    if !authorized {
        return Err(ApiError::new(
            ErrorCode::Unauthorized,
            "invalid webhook secret",
        ));
    }

    let session_id = event.session_id();
    let changed = match event {
        CheckoutWebhookEvent::CheckoutCompleted { .. } => {
            let expiry = Utc::now()
                .checked_add_months(Months::new(ctx.billing.pro_membership_months))
                .ok_or_else(|| ApiError::new(ErrorCode::Internal, "membership expiry overflow"))?;
            let upgraded = ctx
                .storage
                .complete_checkout(session_id, expiry)
                .await
                .map_err(internal)?;
            if let Some(user_id) = upgraded {
                info!(user_id = user_id.0, session_id, %expiry, "membership upgraded to pro");
            }
            upgraded.is_some()
        }
        CheckoutWebhookEvent::CheckoutExpired { .. } => ctx
            .storage
            .mark_checkout_status(session_id, CheckoutStatus::Expired)
            .await
            .map_err(internal)?,
    };
    if changed {
        return Ok(match event {
            CheckoutWebhookEvent::CheckoutCompleted { .. } => WebhookOutcome::Upgraded,
            CheckoutWebhookEvent::CheckoutExpired { .. } => WebhookOutcome::Expired,
        });
    }

    ctx.storage
        .load_checkout_session(session_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::new(ErrorCode::NotFound, "checkout session not found"))?;
    Ok(WebhookOutcome::AlreadyProcessed)
}

#[cfg(test)]
#[path = "tests/checkout_tests.rs"]
mod tests;
