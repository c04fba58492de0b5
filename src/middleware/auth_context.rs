use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use chrono::{DateTime, Utc};
use headers::{Authorization, authorization::Bearer};

use crate::auth::hash_access_token;
use crate::error::ApiError;
use crate::models::{AppState, RecordId};

#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: RecordId,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            // Extract Authorization: Bearer <token>
            let TypedHeader(authz): TypedHeader<Authorization<Bearer>> =
                TypedHeader::from_request_parts(parts, state)
                    .await
                    .map_err(|_| ApiError::session_expired())?;

            let token_hash = hash_access_token(authz.token());

            let session = state
                .sessions
                .lookup(&token_hash, Utc::now())
                .ok_or_else(ApiError::session_expired)?;

            // A session is only as good as the user record it points at.
            state
                .store
                .get("users", session.user_id.as_str())
                .map_err(|_| ApiError::session_expired())?;

            Ok(AuthContext {
                user_id: session.user_id,
                token_hash,
                expires_at: session.expires_at,
            })
        }
    }
}
