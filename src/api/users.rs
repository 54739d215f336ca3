/// User account endpoints
use crate::{
    auth::AuthUser,
    context::AppContext,
    error::{ApiError, ApiResult},
    users::{
        AuthResponse, GoogleLoginRequest, LoginRequest, RegisterRequest, SuccessResponse,
        UpdateProfileRequest, UserProfile,
    },
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use validator::{Validate, ValidationErrors};

/// Build user routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/usuarios", post(register))
        .route("/api/usuarios/login", post(login))
        .route("/api/usuarios/login/google", post(login_google))
        .route(
            "/api/usuarios/:id",
            get(get_user).put(update_user).delete(deactivate_user),
        )
}

/// Register endpoint
async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    req.validate()
        .map_err(|e| ApiError::Validation(format_validation_errors(&e)))?;

    let user = ctx.users.register(req).await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Password login endpoint
async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()
        .map_err(|e| ApiError::Validation(format_validation_errors(&e)))?;

    let auth = ctx.users.login_password(&req.email, &req.password).await?;

    Ok(Json(auth))
}

/// Google login endpoint
async fn login_google(
    State(ctx): State<AppContext>,
    Json(req): Json<GoogleLoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()
        .map_err(|e| ApiError::Validation(format_validation_errors(&e)))?;

    let auth = ctx.users.login_google(&req.id_token).await?;

    Ok(Json(auth))
}

/// Get profile endpoint
async fn get_user(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
    auth: AuthUser,
) -> ApiResult<Json<UserProfile>> {
    let profile = ctx.users.get_user(id, &auth.email).await?;

    Ok(Json(profile))
}

/// Edit profile endpoint
async fn update_user(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
    auth: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UserProfile>> {
    let profile = ctx.users.update_user(id, &auth.email, req).await?;

    Ok(Json(profile))
}

/// Deactivate account endpoint
async fn deactivate_user(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
    auth: AuthUser,
) -> ApiResult<Json<SuccessResponse>> {
    ctx.users.deactivate_user(id, &auth.email).await?;

    Ok(Json(SuccessResponse {
        successful: "successful_user_deletion".to_string(),
        message: "The user account was deleted successfully".to_string(),
        status_code: StatusCode::OK.as_u16(),
        timestamp: Utc::now(),
    }))
}

/// Flatten field validation failures into one message
fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "is invalid".to_string());
                format!("{}: {}", field, message)
            })
        })
        .collect();
    parts.sort();
    parts.join("; ")
}
