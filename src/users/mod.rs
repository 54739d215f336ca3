/// User accounts: registration, login, and profile management
///
/// Request and response types live here; the operations themselves are
/// on [`UserService`].

mod service;

pub use service::UserService;

use crate::db::user::{AccountKind, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Payload for registering a new account
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Email format is invalid"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "Display name is required"))]
    pub display_name: String,
    #[validate(length(min = 1, message = "Family name is required"))]
    pub family_name: String,
    pub account_kind: AccountKind,
}

/// Payload for password login
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "Email format is invalid"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Payload for Google login
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GoogleLoginRequest {
    #[validate(length(min = 1, message = "Google ID token is required"))]
    pub id_token: String,
}

/// Payload for editing a profile; omitted or empty fields are left unchanged
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub family_name: Option<String>,
    pub profile_image_url: Option<String>,
}

/// Public view of a user; never carries credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    pub family_name: String,
    pub account_kind: AccountKind,
    pub profile_image_url: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub active: bool,
    pub google_login_enabled: bool,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            family_name: user.family_name,
            account_kind: user.account_kind,
            profile_image_url: user.profile_image_url,
            registered_at: user.registered_at,
            active: user.active,
            google_login_enabled: user.google_login_enabled,
        }
    }
}

/// Successful login response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

/// Confirmation body for operations with no resource to return
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessResponse {
    pub successful: String,
    pub message: String,
    pub status_code: u16,
    pub timestamp: DateTime<Utc>,
}
