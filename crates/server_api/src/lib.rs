//! Request handling behind the HTTP routes: story generation, accounts,
//! membership rules, and checkout. Every operation returns `ApiError` so the
//! router only has to pick a status code.

use std::sync::Arc;

use shared::error::{ApiError, ErrorCode};
use storage::Storage;

pub mod accounts;
pub mod auth;
pub mod checkout;
pub mod generation;

pub use accounts::{
    authenticate, authorize_user, check_membership_status, check_parental_approval, login_user,
    logout_user, membership_status_for, register_user, restore_session, route_for_membership,
    AuthenticatedUser,
};
pub use auth::AuthConfig;
pub use checkout::{create_checkout_session, handle_checkout_event, BillingConfig, WebhookOutcome};
pub use generation::{
    generate_image, generate_story, GeminiStoryGenerator, StoryGenerator, TemplateStoryGenerator,
};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub auth: AuthConfig,
    pub billing: BillingConfig,
    pub generator: Arc<dyn StoryGenerator>,
}

pub(crate) fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
