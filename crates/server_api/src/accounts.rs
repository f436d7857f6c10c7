use chrono::{DateTime, Utc};
use shared::{
    domain::{LandingRoute, MembershipLevel, MembershipStatus, UserId},
    error::{ApiError, ErrorCode},
    protocol::{
        LandingRouteResponse, LoginRequest, ParentalApproval, RegisterRequest, SessionResponse,
    },
};
use storage::{NewUser, StoredUser};
use tracing::{info, warn};

use crate::{
    auth::{hash_password, mint_session_token, new_salt, verify_password, verify_session_token},
    internal, ApiContext,
};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub jti: String,
}

fn normalize_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_ascii_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
    if !valid {
        return Err(ApiError::new(ErrorCode::Validation, "invalid email address"));
    }
    Ok(email)
}

pub async fn register_user(
    ctx: &ApiContext,
    request: &RegisterRequest,
) -> Result<SessionResponse, ApiError> {
    let email = normalize_email(&request.email)?;
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::new(
            ErrorCode::Validation,
            format!("password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    let parent_email = match request.parent_email.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(normalize_email(raw)?),
        _ if request.is_child => {
            return Err(ApiError::new(
                ErrorCode::Validation,
                "parent email is required for child accounts",
            ))
        }
        _ => None,
    };

    let salt = new_salt();
    let password_hash = hash_password(&request.password, &salt);
    let user_id = ctx
        .storage
        .create_user(NewUser {
            email: &email,
            password_hash: &password_hash,
            password_salt: &salt,
            is_child: request.is_child,
            parent_email: parent_email.as_deref(),
        })
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::new(ErrorCode::Conflict, "email already registered"))?;
    info!(user_id = user_id.0, is_child = request.is_child, "account registered");

    issue_session(ctx, user_id).await
}

pub async fn login_user(
    ctx: &ApiContext,
    request: &LoginRequest,
) -> Result<SessionResponse, ApiError> {
    let invalid = || ApiError::new(ErrorCode::Unauthorized, "invalid email or password");
    let email = normalize_email(&request.email).map_err(|_| invalid())?;
    let credentials = ctx
        .storage
        .find_credentials_by_email(&email)
        .await
        .map_err(internal)?
        .ok_or_else(invalid)?;
    if !verify_password(
        &request.password,
        &credentials.password_salt,
        &credentials.password_hash,
    ) {
        warn!(user_id = credentials.user_id.0, "login rejected");
        return Err(invalid());
    }

    issue_session(ctx, credentials.user_id).await
}

async fn issue_session(ctx: &ApiContext, user_id: UserId) -> Result<SessionResponse, ApiError> {
    let user = load_existing_user(ctx, user_id).await?;
    let issued = mint_session_token(&ctx.auth, user_id)
        .map_err(|e| ApiError::new(ErrorCode::Internal, format!("token mint failed: {e}")))?;
    ctx.storage
        .insert_auth_session(&issued.jti, user_id, issued.expires_at)
        .await
        .map_err(internal)?;
    Ok(SessionResponse {
        user: user.summary(),
        token: issued.token,
    })
}

async fn load_existing_user(ctx: &ApiContext, user_id: UserId) -> Result<StoredUser, ApiError> {
    ctx.storage
        .load_user(user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::new(ErrorCode::NotFound, "user not found"))
}

/// Resolves a bearer token to a live, unrevoked session.
pub async fn authenticate(ctx: &ApiContext, token: &str) -> Result<AuthenticatedUser, ApiError> {
    let unauthorized = || ApiError::new(ErrorCode::Unauthorized, "invalid or expired session");
    let claims = verify_session_token(&ctx.auth, token).ok_or_else(unauthorized)?;
    let active = ctx
        .storage
        .auth_session_active(&claims.jti, claims.user_id, Utc::now())
        .await
        .map_err(internal)?;
    if !active {
        return Err(unauthorized());
    }
    Ok(AuthenticatedUser {
        user_id: claims.user_id,
        jti: claims.jti,
    })
}

/// Like [`authenticate`], but the session must belong to `user_id`.
pub async fn authorize_user(
    ctx: &ApiContext,
    token: &str,
    user_id: UserId,
) -> Result<AuthenticatedUser, ApiError> {
    let session = authenticate(ctx, token).await?;
    if session.user_id != user_id {
        warn!(
            caller = session.user_id.0,
            requested = user_id.0,
            "account access denied"
        );
        return Err(ApiError::new(
            ErrorCode::Forbidden,
            "session does not belong to this account",
        ));
    }
    Ok(session)
}

pub async fn logout_user(ctx: &ApiContext, token: &str) -> Result<(), ApiError> {
    let session = authenticate(ctx, token).await?;
    ctx.storage
        .revoke_auth_session(&session.jti)
        .await
        .map_err(internal)?;
    info!(user_id = session.user_id.0, "session revoked");
    Ok(())
}

/// Kids membership never lapses; Pro is valid until its expiry.
pub fn membership_status_for(user: Option<&StoredUser>, now: DateTime<Utc>) -> MembershipStatus {
    let Some(user) = user else {
        return MembershipStatus::invalid();
    };
    let valid = match user.membership_level {
        MembershipLevel::Kids => true,
        MembershipLevel::Pro => user.membership_expiry.is_some_and(|expiry| now < expiry),
    };
    MembershipStatus {
        valid,
        level: Some(user.membership_level),
        is_child: Some(user.is_child),
    }
}

pub async fn check_membership_status(
    ctx: &ApiContext,
    user_id: UserId,
) -> Result<MembershipStatus, ApiError> {
    let user = ctx.storage.load_user(user_id).await.map_err(internal)?;
    Ok(membership_status_for(user.as_ref(), Utc::now()))
}

pub fn route_for_membership(status: Option<&MembershipStatus>) -> LandingRoute {
    match status {
        None => LandingRoute::Home,
        Some(status) if !status.valid => LandingRoute::MembershipRenewal,
        Some(status) => match status.level {
            Some(MembershipLevel::Pro) => LandingRoute::ProDashboard,
            Some(MembershipLevel::Kids) => LandingRoute::KidsDashboard,
            None => LandingRoute::MembershipRenewal,
        },
    }
}

/// Where a visitor with this (optional) bearer token should land.
pub async fn restore_session(
    ctx: &ApiContext,
    token: Option<&str>,
) -> Result<LandingRouteResponse, ApiError> {
    let membership = match token {
        Some(token) => {
            let session = authenticate(ctx, token).await?;
            Some(check_membership_status(ctx, session.user_id).await?)
        }
        None => None,
    };
    let route = route_for_membership(membership.as_ref());
    Ok(LandingRouteResponse {
        route,
        path: route.path().to_string(),
        membership,
    })
}

/// Child accounts need a parent's sign-off above the configured threshold.
/// Unknown users and lookup failures always require approval.
pub async fn check_parental_approval(
    ctx: &ApiContext,
    user_id: UserId,
    amount_cents: i64,
) -> ParentalApproval {
    let user = match ctx.storage.load_user(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return ParentalApproval {
                requires_approval: true,
                parent_email: None,
            }
        }
        Err(err) => {
            warn!(user_id = user_id.0, error = %err, "parental approval lookup failed");
            return ParentalApproval {
                requires_approval: true,
                parent_email: None,
            };
        }
    };
    let requires_approval =
        user.is_child && amount_cents > ctx.billing.parental_approval_threshold_cents;
    ParentalApproval {
        requires_approval,
        parent_email: requires_approval.then_some(user.parent_email).flatten(),
    }
}

#[cfg(test)]
#[path = "tests/accounts_tests.rs"]
mod tests;
