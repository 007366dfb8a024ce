use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{LoginRequest, LoginResponse, RegisterRequest, User, UserResponse},
    state::AppState,
    utils::{
        jwt::create_access_token,
        password::{hash_password, verify_password},
    },
};

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), AppError> {
    payload.validate()?;

    if state.users.find_by_email(&payload.email).await?.is_some() {
        return Err(AppError::Conflict(
            "Email is already registered".to_string(),
        ));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = User::new(
        payload.name,
        payload.email,
        password_hash,
        payload.role.unwrap_or_default(),
    );
    let user = state.users.create(&user).await?;

    let token = issue_token(&state, &user)?;
    Ok((
        StatusCode::CREATED,
        Json(LoginResponse {
            token,
            user: UserResponse::from(user),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = state
        .users
        .find_by_email(&payload.email)
        .await?
        .ok_or_else(invalid_credentials)?;

    let matches = verify_password(&payload.password, &user.password_hash)?;
    if !matches {
        return Err(invalid_credentials());
    }

    let token = issue_token(&state, &user)?;
    Ok(Json(LoginResponse {
        token,
        user: UserResponse::from(user),
    }))
}

pub async fn profile(Extension(user): Extension<User>) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

fn issue_token(state: &AppState, user: &User) -> Result<String, AppError> {
    let token = create_access_token(
        user.id.clone(),
        user.email.clone(),
        user.role.as_str().to_string(),
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )?;
    Ok(token)
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid email or password".to_string())
}
