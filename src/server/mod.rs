use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    routing::put,
    Json, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::app_state::{AppError, AppState};
use crate::cache::Cache;
use crate::config::Config;
use crate::models::request::RequestRow;

const JWKS_TTL: Duration = Duration::from_secs(60 * 60 * 24);

/// Bearer validation against the auth service's JWKS document. Admin
/// endpoints require the `scanner.trigger` permission.
#[derive(Debug)]
pub struct JwtValidator {
    jwks_url: String,
    issuer: Option<String>,
    client: reqwest::Client,
    keys: Cache<(), JwkSet>,
}

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    permissions: Vec<String>,
}

impl JwtValidator {
    pub fn new(config: &Config) -> Self {
        Self {
            jwks_url: config.jwks_url.clone(),
            issuer: config.jwt_issuer.clone(),
            client: reqwest::Client::new(),
            keys: Cache::new(JWKS_TTL),
        }
    }

    async fn jwks(&self) -> anyhow::Result<JwkSet> {
        self.keys
            .get_or_fill((), || async {
                let res = self.client.get(&self.jwks_url).send().await?;
                Ok::<_, anyhow::Error>(res.json().await?)
            })
            .await
    }

    pub async fn validate(&self, token: &str, scopes: &[&str]) -> Result<(), AppError> {
        let claims = self
            .decode_token(token)
            .await
            .map_err(|e| AppError::forbidden(format!("Could not validate credentials: {e}")))?;
        for scope in scopes {
            if !claims.permissions.iter().any(|p| p == scope) {
                return Err(AppError::forbidden(format!(
                    "Missing permissions {}",
                    scopes.join(", ")
                )));
            }
        }
        Ok(())
    }

    async fn decode_token(&self, token: &str) -> anyhow::Result<Claims> {
        let header = decode_header(token)?;
        let jwks = self.jwks().await?;
        let jwk = match &header.kid {
            Some(kid) => jwks.find(kid),
            None => jwks.keys.first(),
        }
        .ok_or_else(|| anyhow::anyhow!("no matching key in the jwks document"))?;
        let key = DecodingKey::from_jwk(jwk)?;
        let mut validation = Validation::new(
            jwk.common
                .key_algorithm
                .and_then(|a| a.to_string().parse::<Algorithm>().ok())
                .unwrap_or(header.alg),
        );
        validation.validate_aud = false;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        let data = decode::<Claims>(token, &key, &validation)?;
        Ok(data.claims)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/scan", put(trigger_scan).get(scan_status))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Trigger a full scan of the filesystem, looking for new videos and
/// removing the deleted ones.
async fn trigger_scan(
    State(state): State<AppState>,
    TypedHeader(bearer): TypedHeader<Authorization<Bearer>>,
) -> Result<StatusCode, AppError> {
    state.jwt.validate(bearer.token(), &["scanner.trigger"]).await?;
    let scanner = state.scanner;
    tokio::spawn(async move {
        if let Err(e) = scanner.scan(true).await {
            tracing::error!("Triggered scan failed: {e}");
        }
    });
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct StatusQuery {
    status: Option<String>,
}

/// Scan status: which requests are pending, running or failed.
async fn scan_status(
    State(state): State<AppState>,
    TypedHeader(bearer): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<RequestRow>>, AppError> {
    state.jwt.validate(bearer.token(), &["scanner.trigger"]).await?;
    if let Some(status) = query.status.as_deref() {
        if !matches!(status, "pending" | "running" | "failed") {
            return Err(AppError::bad_request(format!("unknown status {status}")));
        }
    }
    let rows = state.queue.list(query.status.as_deref()).await?;
    Ok(Json(rows))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

async fn ready(State(state): State<AppState>) -> axum::response::Response {
    match state.db.healthy().await {
        Ok(()) => Json(serde_json::json!({
            "status": "healthy",
            "database": "healthy",
        }))
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "status": "unhealthy",
                "database": e.to_string(),
            })),
        )
            .into_response(),
    }
}
