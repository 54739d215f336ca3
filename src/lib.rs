/// User identity and authentication service
///
/// Registration, password and Google federated login, and owner-only
/// profile management backed by SQLite, issuing HMAC-signed session
/// tokens.

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod google;
pub mod password;
pub mod server;
pub mod token;
pub mod users;
