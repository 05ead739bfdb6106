//! Service-level endpoints: index, liveness and refresh status.

use axum::{Json, extract::State};
use chrono::Utc;
use globus_core::{
  country::RefreshStatus, render::ArtifactRenderer, source::CountrySource,
  store::CountryStore,
};
use serde_json::{Value, json};

use crate::{AppState, error::ApiError};

/// `GET /`
pub async fn index() -> Json<Value> {
  Json(json!({
    "message": "Country Currency & Exchange API",
    "status": "running",
    "timestamp": Utc::now(),
    "endpoints": {
      "refresh": "POST /countries/refresh",
      "list": "GET /countries?region=&currency=&sort=",
      "create": "POST /countries",
      "get": "GET /countries/:name",
      "delete": "DELETE /countries/:name",
      "image": "GET /countries/image",
      "status": "GET /status",
      "health": "GET /health",
    },
  }))
}

/// `GET /health`
pub async fn health() -> Json<Value> {
  Json(json!({ "status": "OK", "timestamp": Utc::now() }))
}

/// `GET /status`
pub async fn status<S, D, R>(
  State(state): State<AppState<S, D, R>>,
) -> Result<Json<RefreshStatus>, ApiError>
where
  S: CountryStore,
  D: CountrySource,
  R: ArtifactRenderer,
{
  let status = state
    .store
    .status()
    .await
    .map_err(|e| state.fail(globus_core::Error::from_store(e)))?;
  Ok(Json(status))
}
