/// User records as stored in the database
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account tier of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum AccountKind {
    Normal,
    Artist,
}

/// A user row from the users table
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    /// Absent for accounts created through federated login
    pub password_hash: Option<String>,
    pub display_name: String,
    pub family_name: String,
    pub account_kind: AccountKind,
    pub profile_image_url: Option<String>,
    pub registered_at: DateTime<Utc>,
    /// Cleared by soft deletion; never set back
    pub active: bool,
    /// Google subject identifier, set at federated signup or linking
    pub google_uid: Option<String>,
    pub google_login_enabled: bool,
}
