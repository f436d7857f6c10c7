use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(UserId);

/// Membership tier stored on every account. `Kids` is the free tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MembershipLevel {
    #[default]
    Kids,
    Pro,
}

impl MembershipLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kids => "Kids",
            Self::Pro => "Pro",
        }
    }
}

impl fmt::Display for MembershipLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MembershipLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.eq_ignore_ascii_case("kids") {
            Ok(Self::Kids)
        } else if value.eq_ignore_ascii_case("pro") {
            Ok(Self::Pro)
        } else {
            Err(format!("unknown membership level '{value}'"))
        }
    }
}

/// One generated step of a story. Pages are never edited after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub page_number: u32,
    pub image_url: String,
    pub story_text: String,
    pub prompt_text: String,
    pub user_response: Option<String>,
}

impl Page {
    pub fn id(&self) -> String {
        format!("page-{}", self.page_number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationState {
    pub can_go_back: bool,
    pub can_go_next: bool,
    /// 1-based position of the read cursor, 0 while the story is empty.
    pub current_page: u32,
    pub total_pages: u32,
    pub should_show_conclusion: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryStats {
    pub total_pages: u32,
    pub max_pages: u32,
    pub story_idea: String,
    pub completion_percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipStatus {
    pub valid: bool,
    pub level: Option<MembershipLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_child: Option<bool>,
}

impl MembershipStatus {
    pub fn invalid() -> Self {
        Self {
            valid: false,
            level: None,
            is_child: None,
        }
    }
}

/// Where a visitor lands once their sign-in state and membership are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandingRoute {
    Home,
    KidsDashboard,
    ProDashboard,
    MembershipRenewal,
}

impl LandingRoute {
    pub fn path(self) -> &'static str {
        match self {
            Self::Home => "/index.html",
            Self::KidsDashboard => "/kids/dashboard.html",
            Self::ProDashboard => "/pro/dashboard.html",
            Self::MembershipRenewal => "/membership-renewal.html",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub user_id: UserId,
    pub email: String,
    pub is_child: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_email: Option<String>,
    pub membership_level: MembershipLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub membership_expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    Pending,
    Completed,
    Expired,
}

impl CheckoutStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Expired => "expired",
        }
    }
}

impl FromStr for CheckoutStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "expired" => Ok(Self::Expired),
            other => Err(format!("unknown checkout status '{other}'")),
        }
    }
}
