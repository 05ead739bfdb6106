//! Handlers for `/countries` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/countries/refresh` | 503 if either upstream fails |
//! | `GET`    | `/countries` | Optional `?region=&currency=&sort=` |
//! | `POST`   | `/countries` | Body: `{"name":"..","population":1,"currency_code":".."}` |
//! | `GET`    | `/countries/image` | 404 until the first refresh renders one |
//! | `GET`    | `/countries/{name}` | Case-insensitive; 404 if not found |
//! | `DELETE` | `/countries/{name}` | Case-insensitive; 404 if not found |

use std::collections::BTreeMap;

use axum::{
  Json,
  extract::{Path, Query, State, rejection::{JsonRejection, PathRejection, QueryRejection}},
  http::{StatusCode, header},
  response::IntoResponse,
};
use globus_core::{
  Error,
  country::{Country, CountryUpsert},
  query::CountryQuery,
  refresh::RefreshReport,
  render::ArtifactRenderer,
  source::CountrySource,
  store::CountryStore,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{AppState, error::ApiError};

// ─── Refresh ──────────────────────────────────────────────────────────────────

/// `POST /countries/refresh`
pub async fn refresh<S, D, R>(
  State(state): State<AppState<S, D, R>>,
) -> Result<Json<RefreshReport>, ApiError>
where
  S: CountryStore,
  D: CountrySource,
  R: ArtifactRenderer,
{
  let report = state.refresher.run().await.map_err(|e| state.fail(e))?;
  Ok(Json(report))
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /countries[?region=<r>&currency=<c>&sort=<key>]`
pub async fn list<S, D, R>(
  State(state): State<AppState<S, D, R>>,
  query: Result<Query<CountryQuery>, QueryRejection>,
) -> Result<Json<Vec<Country>>, ApiError>
where
  S: CountryStore,
  D: CountrySource,
  R: ArtifactRenderer,
{
  let Query(query) = query?;
  let countries = query.run(&*state.store).await.map_err(|e| state.fail(e))?;
  Ok(Json(countries))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name:          Option<String>,
  pub capital:       Option<String>,
  pub region:        Option<String>,
  pub population:    Option<i64>,
  pub currency_code: Option<String>,
  pub exchange_rate: Option<f64>,
  pub estimated_gdp: Option<f64>,
  pub flag_url:      Option<String>,
}

impl CreateBody {
  /// Check required fields, collecting every problem keyed by field name.
  fn validate(self) -> Result<CountryUpsert, Error> {
    let mut errors = BTreeMap::new();

    let name = trimmed(self.name);
    if name.is_none() {
      errors.insert("name".to_owned(), "is required".to_owned());
    }
    let population = match self.population {
      None => {
        errors.insert("population".to_owned(), "is required".to_owned());
        None
      }
      Some(p) => match u64::try_from(p) {
        Ok(p) => Some(p),
        Err(_) => {
          errors.insert("population".to_owned(), "must be a non-negative number".to_owned());
          None
        }
      },
    };
    let currency_code = trimmed(self.currency_code);
    if currency_code.is_none() {
      errors.insert("currency_code".to_owned(), "is required".to_owned());
    }

    match (name, population) {
      (Some(name), Some(population)) if errors.is_empty() => Ok(CountryUpsert {
        name,
        capital: self.capital,
        region: self.region,
        population,
        currency_code,
        exchange_rate: self.exchange_rate,
        estimated_gdp: self.estimated_gdp,
        flag_url: self.flag_url,
      }),
      _ => Err(Error::ValidationFailed(errors)),
    }
  }
}

fn trimmed(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

/// `POST /countries`
pub async fn create<S, D, R>(
  State(state): State<AppState<S, D, R>>,
  body: Result<Json<CreateBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CountryStore,
  D: CountrySource,
  R: ArtifactRenderer,
{
  let Json(body) = body?;
  let mut input = body.validate().map_err(|e| state.fail(e))?;
  if input.estimated_gdp.is_none() {
    input.estimated_gdp =
      Some(state.estimator.estimate(input.population, input.exchange_rate));
  }

  let country = state
    .store
    .insert(input)
    .await
    .map_err(|e| state.fail(Error::from_store(e)))?;
  info!(country = %country.name, "country created");
  Ok((StatusCode::CREATED, Json(country)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /countries/{name}`
pub async fn get_one<S, D, R>(
  State(state): State<AppState<S, D, R>>,
  name: Result<Path<String>, PathRejection>,
) -> Result<Json<Country>, ApiError>
where
  S: CountryStore,
  D: CountrySource,
  R: ArtifactRenderer,
{
  let Path(name) = name?;
  let country = state
    .store
    .get_by_name(&name)
    .await
    .map_err(|e| state.fail(Error::from_store(e)))?
    .ok_or_else(ApiError::country_not_found)?;
  Ok(Json(country))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /countries/{name}`
pub async fn delete_one<S, D, R>(
  State(state): State<AppState<S, D, R>>,
  name: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CountryStore,
  D: CountrySource,
  R: ArtifactRenderer,
{
  let Path(name) = name?;
  let deleted = state
    .store
    .delete_by_name(&name)
    .await
    .map_err(|e| state.fail(Error::from_store(e)))?;
  if !deleted {
    return Err(ApiError::country_not_found());
  }
  info!(country = %name, "country deleted");
  Ok(Json(json!({ "message": "Country deleted successfully" })))
}

// ─── Image ────────────────────────────────────────────────────────────────────

/// `GET /countries/image`
pub async fn image<S, D, R>(
  State(state): State<AppState<S, D, R>>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CountryStore,
  D: CountrySource,
  R: ArtifactRenderer,
{
  let artifact = state
    .renderer
    .load()
    .await
    .map_err(|e| ApiError::internal(&e, state.expose_error_details))?
    .ok_or(ApiError::NotFound("Summary image not found"))?;
  Ok(([(header::CONTENT_TYPE, artifact.content_type)], artifact.bytes))
}
