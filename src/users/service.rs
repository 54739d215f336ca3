/// Account operations: registration, both login flows, and owner-only
/// profile access.
use crate::db::user::{AccountKind, User};
use crate::error::{ApiError, ApiResult};
use crate::google::{IdentityVerifier, VerifiedIdentity};
use crate::password;
use crate::token::TokenSigner;
use crate::users::{AuthResponse, RegisterRequest, UpdateProfileRequest, UserProfile};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Display name given to federated signups whose token carries no name
const DEFAULT_DISPLAY_NAME: &str = "Usuario";

const USER_COLUMNS: &str = "id, email, password_hash, display_name, family_name, account_kind, \
     profile_image_url, registered_at, active, google_uid, google_login_enabled";

/// Service for user account management
pub struct UserService {
    db: SqlitePool,
    tokens: Arc<TokenSigner>,
    verifier: Arc<dyn IdentityVerifier>,
}

impl UserService {
    pub fn new(
        db: SqlitePool,
        tokens: Arc<TokenSigner>,
        verifier: Arc<dyn IdentityVerifier>,
    ) -> Self {
        Self {
            db,
            tokens,
            verifier,
        }
    }

    /// Register a new account with a password
    pub async fn register(&self, req: RegisterRequest) -> ApiResult<User> {
        if self.email_exists(&req.email).await? {
            return Err(ApiError::EmailTaken(req.email));
        }

        let user = self.insert_user(req).await?;
        tracing::info!("Registered account {}", user.id);

        Ok(user)
    }

    async fn insert_user(&self, req: RegisterRequest) -> ApiResult<User> {
        let password_hash = password::hash(&req.password)?;
        let registered_at = Utc::now();

        let result = sqlx::query(
            "INSERT INTO users (email, password_hash, display_name, family_name, account_kind, \
             profile_image_url, registered_at, active, google_uid, google_login_enabled) \
             VALUES (?, ?, ?, ?, ?, NULL, ?, 1, NULL, 0)",
        )
        .bind(&req.email)
        .bind(&password_hash)
        .bind(&req.display_name)
        .bind(&req.family_name)
        .bind(req.account_kind)
        .bind(registered_at)
        .execute(&self.db)
        .await
        .map_err(|e| match &e {
            // Two concurrent registrations can both pass the existence
            // check; the unique index settles the race
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                ApiError::EmailTaken(req.email.clone())
            }
            _ => ApiError::Database(e),
        })?;

        Ok(User {
            id: result.last_insert_rowid(),
            email: req.email,
            password_hash: Some(password_hash),
            display_name: req.display_name,
            family_name: req.family_name,
            account_kind: req.account_kind,
            profile_image_url: None,
            registered_at,
            active: true,
            google_uid: None,
            google_login_enabled: false,
        })
    }

    /// Authenticate with email and password, returning a session token
    pub async fn login_password(&self, email: &str, password: &str) -> ApiResult<AuthResponse> {
        let user = self
            .find_by_email(email)
            .await?
            .ok_or(ApiError::InvalidCredentials)?;

        if !user.active {
            return Err(ApiError::AccountInactive);
        }

        let hash = match user.password_hash.as_deref() {
            Some(hash) if !hash.is_empty() => hash,
            _ => return Err(ApiError::PasswordLoginUnavailable),
        };

        if !password::verify(password, hash)? {
            return Err(ApiError::InvalidCredentials);
        }

        let token = self.tokens.issue(user.id, &user.email)?;

        Ok(AuthResponse {
            token,
            user: user.into(),
        })
    }

    /// Authenticate with a Google ID token
    ///
    /// Resolves the account by Google subject id first, then by email.
    /// An email match with no stored subject id gets linked; a missing
    /// account is created from the asserted identity.
    pub async fn login_google(&self, id_token: &str) -> ApiResult<AuthResponse> {
        let identity = self.verifier.verify(id_token).await?;

        let existing = match self.find_by_google_uid(&identity.subject_id).await? {
            Some(user) => Some(user),
            None => self.find_by_email(&identity.email).await?,
        };

        let user = match existing {
            Some(user) => {
                if !user.google_login_enabled {
                    return Err(ApiError::FederatedLoginDisabled);
                }
                if !user.active {
                    return Err(ApiError::AccountInactive);
                }
                if user.google_uid.as_deref().unwrap_or("").is_empty() {
                    self.link_google_uid(user.id, &identity.subject_id).await?
                } else {
                    user
                }
            }
            None => self.create_from_identity(&identity).await?,
        };

        let token = self.tokens.issue(user.id, &user.email)?;

        Ok(AuthResponse {
            token,
            user: user.into(),
        })
    }

    /// Fetch a profile; only the account owner may read it
    pub async fn get_user(&self, id: i64, requester_email: &str) -> ApiResult<UserProfile> {
        let user = self.get_by_id(id).await?;
        ensure_owner(&user, requester_email)?;

        Ok(user.into())
    }

    /// Edit a profile; empty or omitted fields are left unchanged
    pub async fn update_user(
        &self,
        id: i64,
        requester_email: &str,
        req: UpdateProfileRequest,
    ) -> ApiResult<UserProfile> {
        let user = self.get_by_id(id).await?;
        ensure_owner(&user, requester_email)?;

        let display_name = non_empty(req.display_name).unwrap_or(user.display_name);
        let family_name = non_empty(req.family_name).unwrap_or(user.family_name);
        let profile_image_url = non_empty(req.profile_image_url).or(user.profile_image_url);

        sqlx::query(
            "UPDATE users SET display_name = ?, family_name = ?, profile_image_url = ? \
             WHERE id = ?",
        )
        .bind(&display_name)
        .bind(&family_name)
        .bind(&profile_image_url)
        .bind(id)
        .execute(&self.db)
        .await
        .map_err(|e| ApiError::Database(e))?;

        let updated = self.get_by_id(id).await?;
        Ok(updated.into())
    }

    /// Soft-delete an account by clearing its active flag
    ///
    /// Inactive accounts cannot log in, but the owner can still read
    /// and edit the profile with a token issued earlier.
    pub async fn deactivate_user(&self, id: i64, requester_email: &str) -> ApiResult<()> {
        let user = self.get_by_id(id).await?;
        ensure_owner(&user, requester_email)?;

        sqlx::query("UPDATE users SET active = 0 WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(|e| ApiError::Database(e))?;

        tracing::info!("Deactivated account {}", id);

        Ok(())
    }

    async fn link_google_uid(&self, id: i64, subject_id: &str) -> ApiResult<User> {
        sqlx::query("UPDATE users SET google_uid = ? WHERE id = ?")
            .bind(subject_id)
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(|e| ApiError::Database(e))?;

        tracing::info!("Linked Google identity to account {}", id);

        self.get_by_id(id).await
    }

    async fn create_from_identity(&self, identity: &VerifiedIdentity) -> ApiResult<User> {
        let (display_name, family_name) = split_full_name(identity.name.as_deref());
        let registered_at = Utc::now();

        let result = sqlx::query(
            "INSERT INTO users (email, password_hash, display_name, family_name, account_kind, \
             profile_image_url, registered_at, active, google_uid, google_login_enabled) \
             VALUES (?, NULL, ?, ?, ?, ?, ?, 1, ?, 1)",
        )
        .bind(&identity.email)
        .bind(&display_name)
        .bind(&family_name)
        .bind(AccountKind::Normal)
        .bind(&identity.picture)
        .bind(registered_at)
        .bind(&identity.subject_id)
        .execute(&self.db)
        .await?;

        let id = result.last_insert_rowid();
        tracing::info!("Created account {} from Google identity", id);

        Ok(User {
            id,
            email: identity.email.clone(),
            password_hash: None,
            display_name,
            family_name,
            account_kind: AccountKind::Normal,
            profile_image_url: identity.picture.clone(),
            registered_at,
            active: true,
            google_uid: Some(identity.subject_id.clone()),
            google_login_enabled: true,
        })
    }

    async fn get_by_id(&self, id: i64) -> ApiResult<User> {
        let query = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| ApiError::Database(e))?
            .ok_or_else(|| ApiError::NotFound(format!("user {}", id)))
    }

    async fn find_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);

        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| ApiError::Database(e))
    }

    async fn find_by_google_uid(&self, uid: &str) -> ApiResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE google_uid = ?", USER_COLUMNS);

        sqlx::query_as::<_, User>(&query)
            .bind(uid)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| ApiError::Database(e))
    }

    async fn email_exists(&self, email: &str) -> ApiResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.db)
            .await
            .map_err(|e| ApiError::Database(e))?;

        Ok(count > 0)
    }
}

fn ensure_owner(user: &User, requester_email: &str) -> ApiResult<()> {
    if user.email != requester_email {
        return Err(ApiError::Forbidden(
            "You do not have permission to access this user".to_string(),
        ));
    }

    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Split a full name into display and family parts at the first
/// whitespace run. A missing or empty name gets a placeholder; note a
/// whitespace-only name does not.
fn split_full_name(full_name: Option<&str>) -> (String, String) {
    let full_name = match full_name {
        Some(name) if !name.is_empty() => name,
        _ => return (DEFAULT_DISPLAY_NAME.to_string(), String::new()),
    };

    let trimmed = full_name.trim();
    match trimmed.split_once(char::is_whitespace) {
        Some((first, rest)) => (first.to_string(), rest.trim_start().to_string()),
        None => (trimmed.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::Duration;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    struct StaticVerifier {
        identity: Option<VerifiedIdentity>,
    }

    #[async_trait::async_trait]
    impl IdentityVerifier for StaticVerifier {
        async fn verify(&self, _id_token: &str) -> ApiResult<VerifiedIdentity> {
            self.identity
                .clone()
                .ok_or_else(|| ApiError::InvalidFederatedToken("Token rejected".to_string()))
        }
    }

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        pool
    }

    fn test_signer() -> Arc<TokenSigner> {
        Arc::new(TokenSigner::new(SECRET, Duration::seconds(3600)))
    }

    fn service_over(pool: SqlitePool, verifier: StaticVerifier) -> UserService {
        UserService::new(pool, test_signer(), Arc::new(verifier))
    }

    async fn test_service() -> UserService {
        service_over(test_pool().await, StaticVerifier { identity: None })
    }

    async fn google_service(identity: VerifiedIdentity) -> UserService {
        service_over(
            test_pool().await,
            StaticVerifier {
                identity: Some(identity),
            },
        )
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "hunter2hunter2".to_string(),
            display_name: "Ada".to_string(),
            family_name: "Lovelace".to_string(),
            account_kind: AccountKind::Normal,
        }
    }

    fn google_identity(uid: &str, email: &str, name: Option<&str>) -> VerifiedIdentity {
        VerifiedIdentity {
            subject_id: uid.to_string(),
            email: email.to_string(),
            name: name.map(String::from),
            picture: Some("https://example.com/photo.jpg".to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_creates_active_account() {
        let service = test_service().await;

        let user = service
            .register(register_request("ada@example.com"))
            .await
            .unwrap();

        assert!(user.id > 0);
        assert!(user.active);
        assert!(!user.google_login_enabled);
        assert!(user.google_uid.is_none());
        assert!(user.password_hash.is_some());
        assert_eq!(user.account_kind, AccountKind::Normal);
    }

    #[tokio::test]
    async fn test_register_duplicate_email_rejected() {
        let service = test_service().await;

        service
            .register(register_request("ada@example.com"))
            .await
            .unwrap();
        let err = service
            .register(register_request("ada@example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::EmailTaken(_)));
    }

    #[tokio::test]
    async fn test_register_duplicate_rejected_even_after_deactivation() {
        let service = test_service().await;

        let user = service
            .register(register_request("ada@example.com"))
            .await
            .unwrap();
        service
            .deactivate_user(user.id, "ada@example.com")
            .await
            .unwrap();

        let err = service
            .register(register_request("ada@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::EmailTaken(_)));
    }

    #[tokio::test]
    async fn test_duplicate_insert_race_maps_to_email_taken() {
        let service = test_service().await;

        service
            .register(register_request("ada@example.com"))
            .await
            .unwrap();

        // A racing registration that already passed the existence check
        // lands on the unique index instead
        let err = service
            .insert_user(register_request("ada@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::EmailTaken(_)));
    }

    #[tokio::test]
    async fn test_password_login_round_trip() {
        let pool = test_pool().await;
        let signer = test_signer();
        let service = UserService::new(
            pool,
            signer.clone(),
            Arc::new(StaticVerifier { identity: None }),
        );

        service
            .register(register_request("ada@example.com"))
            .await
            .unwrap();
        let auth = service
            .login_password("ada@example.com", "hunter2hunter2")
            .await
            .unwrap();

        let claims = signer.verify(&auth.token).unwrap();
        assert_eq!(claims.sub, "ada@example.com");
        assert_eq!(claims.user_id, auth.user.id);
        assert_eq!(auth.user.email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let service = test_service().await;
        service
            .register(register_request("ada@example.com"))
            .await
            .unwrap();

        let unknown = service
            .login_password("nobody@example.com", "hunter2hunter2")
            .await
            .unwrap_err();
        let wrong = service
            .login_password("ada@example.com", "wrong-password")
            .await
            .unwrap_err();

        assert!(matches!(unknown, ApiError::InvalidCredentials));
        assert!(matches!(wrong, ApiError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn test_login_inactive_account_rejected_before_password_check() {
        let service = test_service().await;

        let user = service
            .register(register_request("ada@example.com"))
            .await
            .unwrap();
        service
            .deactivate_user(user.id, "ada@example.com")
            .await
            .unwrap();

        // Wrong password on an inactive account still reports inactive
        let err = service
            .login_password("ada@example.com", "wrong-password")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::AccountInactive));
    }

    #[tokio::test]
    async fn test_password_login_unavailable_for_federated_account() {
        let service =
            google_service(google_identity("g-123", "grace@example.com", Some("Grace"))).await;

        service.login_google("id-token").await.unwrap();

        let err = service
            .login_password("grace@example.com", "any-password")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::PasswordLoginUnavailable));
    }

    #[tokio::test]
    async fn test_google_login_creates_account() {
        let pool = test_pool().await;
        let signer = test_signer();
        let service = UserService::new(
            pool,
            signer.clone(),
            Arc::new(StaticVerifier {
                identity: Some(google_identity(
                    "g-123",
                    "grace@example.com",
                    Some("Grace Hopper"),
                )),
            }),
        );

        let auth = service.login_google("id-token").await.unwrap();

        assert_eq!(auth.user.email, "grace@example.com");
        assert_eq!(auth.user.display_name, "Grace");
        assert_eq!(auth.user.family_name, "Hopper");
        assert_eq!(auth.user.account_kind, AccountKind::Normal);
        assert!(auth.user.google_login_enabled);
        assert_eq!(
            auth.user.profile_image_url.as_deref(),
            Some("https://example.com/photo.jpg")
        );

        let claims = signer.verify(&auth.token).unwrap();
        assert_eq!(claims.sub, "grace@example.com");
    }

    #[tokio::test]
    async fn test_google_login_without_name_uses_placeholder() {
        let service = google_service(google_identity("g-123", "grace@example.com", None)).await;

        let auth = service.login_google("id-token").await.unwrap();

        assert_eq!(auth.user.display_name, "Usuario");
        assert_eq!(auth.user.family_name, "");
    }

    #[tokio::test]
    async fn test_google_login_invalid_token_rejected() {
        let service = test_service().await;

        let err = service.login_google("bad-token").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidFederatedToken(_)));
    }

    #[tokio::test]
    async fn test_google_login_links_enabled_password_account() {
        let pool = test_pool().await;
        let password_service = service_over(pool.clone(), StaticVerifier { identity: None });

        let user = password_service
            .register(register_request("ada@example.com"))
            .await
            .unwrap();
        sqlx::query("UPDATE users SET google_login_enabled = 1 WHERE id = ?")
            .bind(user.id)
            .execute(&pool)
            .await
            .unwrap();

        let google_service = service_over(
            pool.clone(),
            StaticVerifier {
                identity: Some(google_identity("g-123", "ada@example.com", Some("Ada"))),
            },
        );
        let auth = google_service.login_google("id-token").await.unwrap();
        assert_eq!(auth.user.id, user.id);

        // Once linked, the subject id alone resolves the account even
        // when the token asserts a different email
        let relogin_service = service_over(
            pool,
            StaticVerifier {
                identity: Some(google_identity("g-123", "other@example.com", Some("Ada"))),
            },
        );
        let relogin = relogin_service.login_google("id-token").await.unwrap();
        assert_eq!(relogin.user.id, user.id);
        assert_eq!(relogin.user.email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_google_login_disabled_account_rejected() {
        let service =
            google_service(google_identity("g-123", "ada@example.com", Some("Ada"))).await;

        service
            .register(register_request("ada@example.com"))
            .await
            .unwrap();

        let err = service.login_google("id-token").await.unwrap_err();
        assert!(matches!(err, ApiError::FederatedLoginDisabled));
    }

    #[tokio::test]
    async fn test_google_login_disabled_reported_before_inactive() {
        let service =
            google_service(google_identity("g-123", "ada@example.com", Some("Ada"))).await;

        let user = service
            .register(register_request("ada@example.com"))
            .await
            .unwrap();
        service
            .deactivate_user(user.id, "ada@example.com")
            .await
            .unwrap();

        let err = service.login_google("id-token").await.unwrap_err();
        assert!(matches!(err, ApiError::FederatedLoginDisabled));
    }

    #[tokio::test]
    async fn test_google_login_inactive_account_rejected() {
        let pool = test_pool().await;
        let service = service_over(
            pool.clone(),
            StaticVerifier {
                identity: Some(google_identity("g-123", "ada@example.com", Some("Ada"))),
            },
        );

        let user = service
            .register(register_request("ada@example.com"))
            .await
            .unwrap();
        sqlx::query("UPDATE users SET google_login_enabled = 1 WHERE id = ?")
            .bind(user.id)
            .execute(&pool)
            .await
            .unwrap();
        service
            .deactivate_user(user.id, "ada@example.com")
            .await
            .unwrap();

        let err = service.login_google("id-token").await.unwrap_err();
        assert!(matches!(err, ApiError::AccountInactive));
    }

    #[tokio::test]
    async fn test_get_profile_owner_only() {
        let service = test_service().await;

        let ada = service
            .register(register_request("ada@example.com"))
            .await
            .unwrap();
        service
            .register(register_request("grace@example.com"))
            .await
            .unwrap();

        let profile = service.get_user(ada.id, "ada@example.com").await.unwrap();
        assert_eq!(profile.email, "ada@example.com");

        let err = service
            .get_user(ada.id, "grace@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_get_unknown_user_reports_not_found() {
        let service = test_service().await;

        let err = service.get_user(9999, "ada@example.com").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_inactive_owner_can_still_read_profile() {
        let service = test_service().await;

        let user = service
            .register(register_request("ada@example.com"))
            .await
            .unwrap();
        service
            .deactivate_user(user.id, "ada@example.com")
            .await
            .unwrap();

        let profile = service.get_user(user.id, "ada@example.com").await.unwrap();
        assert!(!profile.active);
    }

    #[tokio::test]
    async fn test_update_skips_empty_fields() {
        let service = test_service().await;

        let user = service
            .register(register_request("ada@example.com"))
            .await
            .unwrap();

        let profile = service
            .update_user(
                user.id,
                "ada@example.com",
                UpdateProfileRequest {
                    display_name: Some("Augusta".to_string()),
                    family_name: Some(String::new()),
                    profile_image_url: Some("https://example.com/new.jpg".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(profile.display_name, "Augusta");
        assert_eq!(profile.family_name, "Lovelace");
        assert_eq!(
            profile.profile_image_url.as_deref(),
            Some("https://example.com/new.jpg")
        );

        // An empty image value leaves the stored one in place
        let profile = service
            .update_user(
                user.id,
                "ada@example.com",
                UpdateProfileRequest {
                    display_name: None,
                    family_name: None,
                    profile_image_url: Some(String::new()),
                },
            )
            .await
            .unwrap();
        assert_eq!(
            profile.profile_image_url.as_deref(),
            Some("https://example.com/new.jpg")
        );
    }

    #[tokio::test]
    async fn test_update_forbidden_for_other_user() {
        let service = test_service().await;

        let ada = service
            .register(register_request("ada@example.com"))
            .await
            .unwrap();

        let err = service
            .update_user(
                ada.id,
                "grace@example.com",
                UpdateProfileRequest {
                    display_name: Some("Hijacked".to_string()),
                    family_name: None,
                    profile_image_url: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_deactivate_is_idempotent() {
        let service = test_service().await;

        let user = service
            .register(register_request("ada@example.com"))
            .await
            .unwrap();

        service
            .deactivate_user(user.id, "ada@example.com")
            .await
            .unwrap();
        service
            .deactivate_user(user.id, "ada@example.com")
            .await
            .unwrap();
    }

    #[test]
    fn test_split_full_name() {
        assert_eq!(split_full_name(None), ("Usuario".to_string(), String::new()));
        assert_eq!(
            split_full_name(Some("")),
            ("Usuario".to_string(), String::new())
        );
        assert_eq!(split_full_name(Some("   ")), (String::new(), String::new()));
        assert_eq!(
            split_full_name(Some("Ada")),
            ("Ada".to_string(), String::new())
        );
        assert_eq!(
            split_full_name(Some("Ada Lovelace")),
            ("Ada".to_string(), "Lovelace".to_string())
        );
        assert_eq!(
            split_full_name(Some("Ada  Lovelace King")),
            ("Ada".to_string(), "Lovelace King".to_string())
        );
    }
}
