//! Token issuer endpoint.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::error::ServerError;
use crate::state::AppState;
use crate::token::TokenRequest;

/// Query parameters for the token endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenQuery {
    /// Client identifier the token is bound to. Blank means anonymous.
    #[serde(default)]
    pub client_id: Option<String>,
}

/// GET /api/token?clientId=...
pub async fn token_handler(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<TokenRequest>, ServerError> {
    let client_id = query
        .client_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());

    let token = state.tokens.issue(client_id).await?;

    tracing::info!(
        client_id = client_id.unwrap_or("<anonymous>"),
        channel = %state.tokens.channel(),
        "Issued token request"
    );

    Ok(Json(token))
}
