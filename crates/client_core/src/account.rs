//! HTTP client for registration, login, membership, and checkout.
//!
//! Every public operation folds failures into its returned shape
//! (`success: false` / `valid: false` / `requires_approval: true`) instead of
//! returning an error.

use std::sync::{Mutex, PoisonError};

use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{AccountSummary, LandingRoute, MembershipStatus, UserId},
    error::ApiError,
    protocol::{
        CheckoutSessionRequest, CheckoutSessionResponse, LandingRouteResponse, LoginRequest,
        ParentalApproval, RegisterRequest, SessionResponse,
    },
};
use tracing::warn;
use url::Url;

use crate::error::AccountError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthOutcome {
    pub success: bool,
    pub user: Option<AccountSummary>,
    pub token: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogoutOutcome {
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutOutcome {
    pub success: bool,
    pub session_id: Option<String>,
    /// Hosted checkout page the user should be sent to.
    pub url: Option<String>,
    pub error: Option<String>,
}

pub struct AccountClient {
    http: Client,
    base_url: Url,
    token: Mutex<Option<String>>,
}

impl AccountClient {
    pub fn new(base_url: &str) -> Result<Self, AccountError> {
        let mut base_url = Url::parse(base_url.trim())?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base_url,
            token: Mutex::new(None),
        })
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Restores a token saved from an earlier login.
    pub fn set_token(&self, token: Option<String>) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = token;
    }

    pub async fn register_user(
        &self,
        email: &str,
        password: &str,
        is_child: bool,
        parent_email: Option<&str>,
    ) -> AuthOutcome {
        let request = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            is_child,
            parent_email: parent_email.map(str::to_string),
        };
        let result = self.post_session("api/register", &request).await;
        self.finish_auth(result)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> AuthOutcome {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let result = self.post_session("api/login", &request).await;
        self.finish_auth(result)
    }

    pub async fn logout_user(&self) -> LogoutOutcome {
        let Some(token) = self.token() else {
            return LogoutOutcome {
                success: true,
                error: None,
            };
        };
        let result = match self.url("api/logout") {
            Ok(url) => self.send(self.http.post(url).bearer_auth(&token)).await,
            Err(err) => Err(err),
        };
        self.set_token(None);
        match result {
            Ok(_) => LogoutOutcome {
                success: true,
                error: None,
            },
            Err(err) => {
                warn!(%err, "logout failed");
                LogoutOutcome {
                    success: false,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    pub async fn check_membership_status(&self, user_id: UserId) -> MembershipStatus {
        let result = match self.url(&format!("api/membership/{}", user_id.0)) {
            Ok(url) => {
                self.send_json::<MembershipStatus>(self.with_session(self.http.get(url)))
                    .await
            }
            Err(err) => Err(err),
        };
        result.unwrap_or_else(|err| {
            warn!(user_id = user_id.0, %err, "membership check failed");
            MembershipStatus::invalid()
        })
    }

    /// Landing route for the signed-in user, or [`LandingRoute::Home`] when
    /// there is no usable session.
    pub async fn restore_session(&self) -> LandingRoute {
        let Some(token) = self.token() else {
            return LandingRoute::Home;
        };
        let result = match self.url("api/session") {
            Ok(url) => {
                self.send_json::<LandingRouteResponse>(self.http.get(url).bearer_auth(token))
                    .await
            }
            Err(err) => Err(err),
        };
        match result {
            Ok(response) => response.route,
            Err(err) => {
                warn!(%err, "session restore failed");
                LandingRoute::Home
            }
        }
    }

    pub async fn check_parental_approval(
        &self,
        user_id: UserId,
        amount_cents: i64,
    ) -> ParentalApproval {
        let result = match self.url("api/parental-approval") {
            Ok(url) => {
                self.send_json::<ParentalApproval>(self.with_session(
                    self.http
                        .get(url)
                        .query(&[("user_id", user_id.0), ("amount_cents", amount_cents)]),
                ))
                .await
            }
            Err(err) => Err(err),
        };
        result.unwrap_or_else(|err| {
            warn!(user_id = user_id.0, %err, "parental approval check failed");
            ParentalApproval {
                requires_approval: true,
                parent_email: None,
            }
        })
    }

    /// Opens a hosted checkout for the Pro tier.
    pub async fn upgrade_to_pro(
        &self,
        price_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> CheckoutOutcome {
        let result = self.create_checkout(price_id, success_url, cancel_url).await;
        match result {
            Ok(session) => CheckoutOutcome {
                success: true,
                session_id: Some(session.session_id),
                url: Some(session.url),
                error: None,
            },
            Err(err) => {
                warn!(%err, "checkout creation failed");
                CheckoutOutcome {
                    success: false,
                    session_id: None,
                    url: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    async fn create_checkout(
        &self,
        price_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSessionResponse, AccountError> {
        let token = self.token().ok_or(AccountError::NotAuthenticated)?;
        let request = CheckoutSessionRequest {
            price_id: price_id.to_string(),
            success_url: success_url.to_string(),
            cancel_url: cancel_url.to_string(),
        };
        self.send_json(
            self.http
                .post(self.url("create-checkout-session")?)
                .bearer_auth(token)
                .json(&request),
        )
        .await
    }

    async fn post_session<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<SessionResponse, AccountError> {
        self.send_json(self.http.post(self.url(path)?).json(body))
            .await
    }

    /// Attaches the stored bearer token, if any. Without one the server
    /// rejects the call and the caller falls back to its safe default.
    fn with_session(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn url(&self, path: &str) -> Result<Url, AccountError> {
        Ok(self.base_url.join(path)?)
    }

    fn finish_auth(&self, result: Result<SessionResponse, AccountError>) -> AuthOutcome {
        match result {
            Ok(session) => {
                self.set_token(Some(session.token.clone()));
                AuthOutcome {
                    success: true,
                    user: Some(session.user),
                    token: Some(session.token),
                    error: None,
                }
            }
            Err(err) => AuthOutcome {
                success: false,
                user: None,
                token: None,
                error: Some(err.to_string()),
            },
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, AccountError> {
        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        match response.json::<ApiError>().await {
            Ok(api_error) => Err(AccountError::Api(api_error)),
            Err(_) => Err(AccountError::Status { status }),
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, AccountError> {
        Ok(self.send(request).await?.json().await?)
    }
}

#[cfg(test)]
#[path = "tests/account_tests.rs"]
mod tests;
