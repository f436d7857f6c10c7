use std::sync::Arc;

use shared::protocol::{RegisterRequest, SessionResponse};
use storage::Storage;

use crate::{
    register_user, ApiContext, AuthConfig, BillingConfig, StoryGenerator, TemplateStoryGenerator,
};

pub(crate) async fn context() -> ApiContext {
    context_with(Arc::new(TemplateStoryGenerator)).await
}

pub(crate) async fn context_with(generator: Arc<dyn StoryGenerator>) -> ApiContext {
    ApiContext {
        storage: Storage::new("sqlite::memory:").await.expect("db"),
        auth: AuthConfig {
            jwt_secret: "test-secret".into(),
            session_ttl_seconds: 3600,
        },
        billing: BillingConfig::default(),
        generator,
    }
}

pub(crate) async fn register(
    ctx: &ApiContext,
    email: &str,
    is_child: bool,
    parent_email: Option<&str>,
) -> SessionResponse {
    register_user(
        ctx,
        &RegisterRequest {
            email: email.into(),
            password: "secret1".into(),
            is_child,
            parent_email: parent_email.map(str::to_string),
        },
    )
    .await
    .expect("register")
}
