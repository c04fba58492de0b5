use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::{Duration, Utc};
use serde_json::{Value, json};

use crate::{
    auth::{
        MIN_PASSWORD_LEN, SessionRecord, generate_access_token, hash_access_token, hash_password,
        verify_password,
    },
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::*,
    store::public_view,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/logout", post(logout))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn find_user_by_email(state: &AppState, email: &str) -> Result<Option<Value>, ApiError> {
    let matches = state
        .store
        .list("users", &[("email".to_string(), email.to_string())])?;
    Ok(matches.into_iter().next())
}

/* ============================================================
   POST /auth/signup
   ============================================================ */

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let name = req.name.trim();
    let email = normalize_email(&req.email);
    if name.is_empty() || email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "name and a valid email are required".into(),
        ));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            format!("password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }

    if find_user_by_email(&state, &email)?.is_some() {
        return Err(ApiError::Conflict(
            "USER_EXISTS",
            "User with this email already exists".into(),
        ));
    }

    let password_hash = hash_password(&req.password).map_err(ApiError::Internal)?;

    let created = state.store.insert(
        "users",
        json!({
            "name": name,
            "email": email,
            "passwordHash": password_hash,
            "phone": "",
            "dateOfBirth": "",
            "gender": "",
            "bloodType": "",
            "address": "",
            "emergencyContact": { "name": "", "relationship": "", "phone": "" }
        }),
    )?;
    tracing::info!(user_id = %created["id"], "user signed up");

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            data: public_view("users", created),
        }),
    ))
}

/* ============================================================
   POST /auth/login
   ============================================================ */

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = normalize_email(&req.email);
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "email and password are required".into(),
        ));
    }

    let user = find_user_by_email(&state, &email)?.ok_or_else(ApiError::invalid_credentials)?;

    // Accounts without a hash (e.g. imported with a plaintext password) can
    // never log in.
    let stored_hash = user
        .get("passwordHash")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if !verify_password(&req.password, stored_hash) {
        return Err(ApiError::invalid_credentials());
    }

    let user_id = user
        .get("id")
        .and_then(RecordId::from_json)
        .ok_or_else(|| ApiError::Internal("user record has no id".into()))?;

    let access_token = generate_access_token();
    let expires_at = Utc::now() + Duration::hours(state.session_ttl_hours);
    state.sessions.insert(
        hash_access_token(&access_token),
        SessionRecord {
            user_id: user_id.clone(),
            expires_at,
        },
    );
    tracing::info!(%user_id, "user logged in");

    Ok(Json(LoginResponse {
        data: LoginResponseData {
            access_token,
            expires_at,
            user: public_view("users", user),
        },
    }))
}

/* ============================================================
   GET /auth/me
   ============================================================ */

pub async fn me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<MeResponse>, ApiError> {
    let user = state
        .store
        .get("users", auth.user_id.as_str())
        .map_err(|_| ApiError::session_expired())?;

    Ok(Json(MeResponse {
        data: MeResponseData {
            user: public_view("users", user),
            expires_at: auth.expires_at,
        },
    }))
}

/* ============================================================
   POST /auth/logout
   ============================================================ */

pub async fn logout(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<OkResponse>, ApiError> {
    if !state.sessions.revoke(&auth.token_hash) {
        return Err(ApiError::session_expired());
    }

    Ok(Json(OkResponse {
        data: OkData { ok: true },
    }))
}
