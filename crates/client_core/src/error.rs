use shared::error::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("generation gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("generation gateway returned status {status}")]
    Status { status: u16 },
    #[error("malformed generation gateway response: {0}")]
    Malformed(String),
    #[error("invalid generation gateway url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("generation gateway is unavailable")]
    Unavailable,
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("account service request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{}", .0.message)]
    Api(ApiError),
    #[error("account service returned status {status}")]
    Status { status: u16 },
    #[error("invalid account service url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("User not authenticated")]
    NotAuthenticated,
}
