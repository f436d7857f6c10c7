use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use server_api::{
    auth::AuthConfig, authenticate, authorize_user, check_membership_status,
    check_parental_approval, create_checkout_session, generate_image, generate_story,
    handle_checkout_event, login_user, logout_user, register_user, restore_session, ApiContext,
    BillingConfig, GeminiStoryGenerator, StoryGenerator, TemplateStoryGenerator, WebhookOutcome,
};
use shared::{
    domain::{MembershipStatus, UserId},
    error::{ApiError, ErrorCode},
    protocol::{
        CheckoutSessionRequest, CheckoutSessionResponse, CheckoutWebhookEvent,
        GenerateImageRequest, GenerateImageResponse, GenerateStoryRequest, GenerateStoryResponse,
        LandingRouteResponse, LoginRequest, ParentalApproval, RegisterRequest, SessionResponse,
    },
};
use storage::Storage;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, prepare_database_url, Settings};

const MAX_REQUEST_BYTES: usize = 64 * 1024;
const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[derive(Debug, Deserialize)]
struct ParentalApprovalQuery {
    user_id: i64,
    amount_cents: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct WebhookResponse {
    status: WebhookOutcome,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    let generator = story_generator(&settings)?;
    info!(generator = generator.name(), "story generator ready");

    let api = ApiContext {
        storage,
        auth: AuthConfig {
            jwt_secret: settings.jwt_secret.clone(),
            session_ttl_seconds: settings.session_ttl_seconds,
        },
        billing: BillingConfig {
            checkout_base_url: settings.checkout_base_url.clone(),
            webhook_secret: settings.webhook_secret.clone(),
            pro_price_id: settings.pro_price_id.clone(),
            pro_price_cents: settings.pro_price_cents,
            pro_membership_months: settings.pro_membership_months,
            parental_approval_threshold_cents: settings.parental_approval_threshold_cents,
        },
        generator,
    };
    let app = build_router(Arc::new(AppState { api }));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn story_generator(settings: &Settings) -> anyhow::Result<Arc<dyn StoryGenerator>> {
    match settings.google_api_key.as_deref() {
        Some(key) => Ok(Arc::new(GeminiStoryGenerator::new(
            key,
            settings.gemini_model.as_str(),
        )?)),
        None => {
            info!("GOOGLE_API_KEY not set; using template story text");
            Ok(Arc::new(TemplateStoryGenerator))
        }
    }
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/generate-story", post(http_generate_story))
        .route("/api/generate-image", post(http_generate_image))
        .route("/api/register", post(http_register))
        .route("/api/login", post(http_login))
        .route("/api/logout", post(http_logout))
        .route("/api/session", get(http_session))
        .route("/api/membership/:user_id", get(http_membership))
        .route("/api/parental-approval", get(http_parental_approval))
        .route("/create-checkout-session", post(http_create_checkout_session))
        .route("/webhooks/checkout", post(http_checkout_webhook))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(err: ApiError) -> (StatusCode, Json<ApiError>) {
    (status_for(err.code), Json(err))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn require_bearer(headers: &HeaderMap) -> Result<&str, (StatusCode, Json<ApiError>)> {
    bearer_token(headers).ok_or_else(|| {
        reject(ApiError::new(
            ErrorCode::Unauthorized,
            "missing bearer token",
        ))
    })
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, StatusCode> {
    state.api.storage.health_check().await.map_err(|error| {
        error!(%error, "health check failed");
        StatusCode::SERVICE_UNAVAILABLE
    })?;
    Ok("ok")
}

async fn http_generate_story(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateStoryRequest>,
) -> ApiResult<GenerateStoryResponse> {
    generate_story(&state.api, &req).await.map(Json).map_err(reject)
}

async fn http_generate_image(Json(req): Json<GenerateImageRequest>) -> Json<GenerateImageResponse> {
    Json(generate_image(&req))
}

async fn http_register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<SessionResponse> {
    register_user(&state.api, &req).await.map(Json).map_err(reject)
}

async fn http_login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<SessionResponse> {
    login_user(&state.api, &req).await.map(Json).map_err(reject)
}

async fn http_logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    let token = require_bearer(&headers)?;
    logout_user(&state.api, token).await.map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn http_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<LandingRouteResponse> {
    restore_session(&state.api, bearer_token(&headers))
        .await
        .map(Json)
        .map_err(reject)
}

async fn http_membership(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(user_id): Path<i64>,
) -> ApiResult<MembershipStatus> {
    let token = require_bearer(&headers)?;
    let session = authorize_user(&state.api, token, UserId(user_id))
        .await
        .map_err(reject)?;
    check_membership_status(&state.api, session.user_id)
        .await
        .map(Json)
        .map_err(reject)
}

async fn http_parental_approval(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(q): Query<ParentalApprovalQuery>,
) -> ApiResult<ParentalApproval> {
    let token = require_bearer(&headers)?;
    let session = authorize_user(&state.api, token, UserId(q.user_id))
        .await
        .map_err(reject)?;
    Ok(Json(
        check_parental_approval(&state.api, session.user_id, q.amount_cents).await,
    ))
}

async fn http_create_checkout_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CheckoutSessionRequest>,
) -> ApiResult<CheckoutSessionResponse> {
    let token = require_bearer(&headers)?;
    let session = authenticate(&state.api, token).await.map_err(reject)?;
    create_checkout_session(&state.api, session.user_id, &req)
        .await
        .map(Json)
        .map_err(reject)
}

async fn http_checkout_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(event): Json<CheckoutWebhookEvent>,
) -> ApiResult<WebhookResponse> {
    let secret = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());
    handle_checkout_event(&state.api, secret, &event)
        .await
        .map(|status| Json(WebhookResponse { status }))
        .map_err(reject)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
