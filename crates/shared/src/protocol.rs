use serde::{Deserialize, Serialize};

use crate::domain::{AccountSummary, LandingRoute, MembershipStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateStoryRequest {
    #[serde(default)]
    pub story_idea: String,
    #[serde(default)]
    pub user_response: Option<String>,
    #[serde(default = "first_page")]
    pub page_number: u32,
    #[serde(default)]
    pub previous_story: String,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateStoryResponse {
    #[serde(default)]
    pub success: bool,
    pub story_text: String,
    pub prompt_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageRequest {
    pub story_text: String,
    pub page_number: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub is_child: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned by register and login: the account plus a bearer token for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user: AccountSummary,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandingRouteResponse {
    pub route: LandingRoute,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub membership: Option<MembershipStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentalApproval {
    pub requires_approval: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionRequest {
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionResponse {
    pub session_id: String,
    pub url: String,
}

/// Notifications pushed by the payment processor once a hosted checkout ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum CheckoutWebhookEvent {
    CheckoutCompleted { session_id: String },
    CheckoutExpired { session_id: String },
}

impl CheckoutWebhookEvent {
    pub fn session_id(&self) -> &str {
        match self {
            Self::CheckoutCompleted { session_id } | Self::CheckoutExpired { session_id } => {
                session_id
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn story_request_uses_camel_case_and_defaults_previous_story() {
        let req: GenerateStoryRequest = serde_json::from_value(json!({
            "storyIdea": "a dragon",
            "userResponse": null,
            "pageNumber": 1
        }))
        .expect("request");
        assert_eq!(req.story_idea, "a dragon");
        assert!(req.previous_story.is_empty());

        let wire = serde_json::to_value(&GenerateImageResponse {
            success: true,
            image_url: None,
        })
        .expect("json");
        assert_eq!(wire, json!({ "success": true }));
    }

    #[test]
    fn empty_story_request_defaults_to_blank_first_page() {
        let req: GenerateStoryRequest = serde_json::from_value(json!({})).expect("request");
        assert_eq!(req.story_idea, "");
        assert_eq!(req.user_response, None);
        assert_eq!(req.page_number, 1);
    }

    #[test]
    fn webhook_events_are_tagged_by_type() {
        let event: CheckoutWebhookEvent = serde_json::from_value(json!({
            "type": "checkout_expired",
            "payload": { "session_id": "cs_1" }
        }))
        .expect("event");
        assert!(matches!(event, CheckoutWebhookEvent::CheckoutExpired { .. }));
        assert_eq!(event.session_id(), "cs_1");
    }
}
