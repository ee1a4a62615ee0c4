use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;

use super::ApiError;
use crate::inbound::http::middleware::bearer_token;
use crate::inbound::http::router::AppState;

/// End the session behind the bearer token. Expired tokens are accepted so a
/// client can always clean up.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = bearer_token(&headers)?;

    state.auth_service.logout(token).await?;

    Ok(StatusCode::NO_CONTENT)
}
