use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{PopError, Result};
use crate::io::population::{normalize_city, parse_integral, Dataset};
use crate::model::estimator::{estimate, Estimate};
use crate::model::growth::{GrowthModel, DEFAULT_BASE_YEAR};

/// Shared read-only state. The dataset is loaded once before serving.
#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<Dataset>,
    pub growth: Arc<GrowthModel>,
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn new(dataset: Dataset, growth: GrowthModel, static_dir: impl Into<PathBuf>) -> Self {
        Self {
            dataset: Arc::new(dataset),
            growth: Arc::new(growth),
            static_dir: static_dir.into(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/cities", get(list_cities))
        .route("/predict", get(predict_estimate).post(predict_growth))
        .with_state(state)
}

/// `GET /predict` parameters, kept as strings so a bad `year` maps to the
/// same 400 as a missing one.
#[derive(Debug, Default)]
pub struct PredictQuery {
    pub city: Option<String>,
    pub year: Option<String>,
}

impl PredictQuery {
    /// Collect from raw query pairs. The first value of a repeated key wins.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut q = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "city" if q.city.is_none() => q.city = Some(value),
                "year" if q.year.is_none() => q.year = Some(value),
                _ => {}
            }
        }
        q
    }

    pub fn validate(&self) -> Result<(String, i64)> {
        let city = self
            .city
            .as_deref()
            .map(normalize_city)
            .filter(|c| !c.is_empty())
            .ok_or(PopError::InvalidRequest)?;
        let year = self
            .year
            .as_deref()
            .and_then(|y| y.trim().parse::<i64>().ok())
            .ok_or(PopError::InvalidRequest)?;
        Ok((city, year))
    }
}

/// JSON `year` as sent: a number or a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum YearArg {
    Int(i64),
    Float(f64),
    Text(String),
}

impl YearArg {
    /// Integer year; floats truncate toward zero, strings must be integral.
    pub fn to_year(&self) -> Option<i64> {
        match self {
            YearArg::Int(v) => Some(*v),
            YearArg::Float(f) if f.is_finite() && f.abs() < i64::MAX as f64 => Some(f.trunc() as i64),
            YearArg::Float(_) => None,
            YearArg::Text(s) => parse_integral(s),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GrowthRequest {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub year: Option<YearArg>,
}

#[derive(Debug, Serialize)]
pub struct GrowthResponse {
    pub city: String,
    pub year: i64,
    pub predicted_population: i64,
}

pub async fn healthz() -> impl IntoResponse {
    Json(json!({"ok": true}))
}

pub async fn index(State(st): State<AppState>) -> Response {
    let path = st.static_dir.join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(body) => Html(body).into_response(),
        Err(e) => {
            tracing::debug!(path = %path.display(), "index unavailable: {e}");
            (StatusCode::NOT_FOUND, Json(json!({"error": "index.html not found"}))).into_response()
        }
    }
}

pub async fn list_cities(State(st): State<AppState>) -> Json<Vec<String>> {
    Json(st.dataset.cities())
}

/// Recorded value for the year, or the linear trend when the year is absent.
pub async fn predict_estimate(
    State(st): State<AppState>,
    query: std::result::Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<Estimate>> {
    let Query(pairs) = query.map_err(|e| {
        tracing::debug!("unreadable query string: {e}");
        PopError::InvalidRequest
    })?;
    let (city, year) = PredictQuery::from_pairs(pairs).validate()?;
    Ok(Json(estimate(&st.dataset, &city, year)?))
}

/// Dataset-free compound-growth forecast. Missing fields default to "" and 2025.
pub async fn predict_growth(
    State(st): State<AppState>,
    body: std::result::Result<Json<GrowthRequest>, JsonRejection>,
) -> Result<Json<GrowthResponse>> {
    let Json(req) = body.map_err(|e| {
        tracing::debug!("unreadable growth request: {e}");
        PopError::InvalidRequest
    })?;
    let city = normalize_city(req.city.as_deref().unwrap_or(""));
    let year = match &req.year {
        Some(arg) => arg.to_year().ok_or(PopError::InvalidRequest)?,
        None => DEFAULT_BASE_YEAR,
    };
    let predicted_population = st.growth.predict(&city, year);
    tracing::debug!(city = %city, year, predicted_population, "growth forecast");
    Ok(Json(GrowthResponse {
        city,
        year,
        predicted_population,
    }))
}
