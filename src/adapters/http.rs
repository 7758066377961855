//! HTTP routes. Handlers only read [`AppState`]; nothing here reloads the model.

use crate::adapters::pages;
use crate::core::artifact::ModelHandle;
use crate::core::predict::{PredictionService, DEFAULT_FIELD};
use crate::core::weather::WeatherTable;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use url::form_urlencoded;

#[derive(Debug, Clone)]
pub struct AppState {
    pub predictions: PredictionService,
    pub weather: Arc<WeatherTable>,
    pub static_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(handle: ModelHandle, weather: WeatherTable, static_dir: PathBuf) -> Self {
        Self {
            predictions: PredictionService::new(Arc::new(handle)),
            weather: Arc::new(weather),
            static_dir: Arc::new(static_dir),
        }
    }

    pub fn model(&self) -> &Arc<ModelHandle> {
        self.predictions.handle()
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct PredictForm {
    pub theoretical_power: Option<String>,
    pub windspeed: Option<String>,
}

impl PredictForm {
    /// 寬鬆解析表單：重複欄位取第一個值，不合法的百分比編碼保留原樣
    pub fn from_urlencoded(body: &[u8]) -> Self {
        let mut form = Self::default();
        for (key, value) in form_urlencoded::parse(body) {
            let slot = match &*key {
                "theoretical_power" => &mut form.theoretical_power,
                "windspeed" => &mut form.windspeed,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        form
    }

    /// Bodies with a non-form content type carry no fields.
    pub fn from_request(headers: &HeaderMap, body: &[u8]) -> Self {
        let is_form = headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim_start().starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(true);
        if is_form {
            Self::from_urlencoded(body)
        } else {
            tracing::debug!("ignoring non-form body on /y_predict");
            Self::default()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    #[serde(default)]
    pub city: String,
}

#[derive(Debug, Serialize)]
struct CityNotFound {
    error: &'static str,
    city: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: ModelStatus,
}

#[derive(Debug, Serialize)]
pub struct ModelStatus {
    pub available: bool,
    pub strategy: Option<String>,
    pub kind: Option<String>,
    pub path: String,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl From<&ModelHandle> for ModelStatus {
    fn from(handle: &ModelHandle) -> Self {
        match handle {
            ModelHandle::Loaded(loaded) => Self {
                available: true,
                strategy: Some(loaded.strategy.to_string()),
                kind: Some(loaded.predictor.kind().to_string()),
                path: loaded.path.display().to_string(),
                loaded_at: Some(loaded.loaded_at),
            },
            ModelHandle::Unavailable { path, .. } => Self {
                available: false,
                strategy: None,
                kind: None,
                path: path.display().to_string(),
                loaded_at: None,
            },
        }
    }
}

pub fn router(state: AppState) -> Router {
    let static_files = ServeDir::new(state.static_dir.as_path());

    Router::new()
        .route("/", get(index))
        .route("/y_predict", get(predict_form).post(predict_submit))
        .route("/weather", get(weather))
        .route("/healthz", get(health))
        .nest_service("/static", static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Html<String> {
    let hero = pages::select_hero_image(&state.static_dir);
    Html(pages::render_index(hero))
}

async fn predict_form(State(state): State<AppState>) -> Html<String> {
    Html(pages::render_predict(&state.weather.cities(), None, None))
}

async fn predict_submit(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Html<String> {
    let form = PredictForm::from_request(&headers, &body);
    let theo = form.theoretical_power.as_deref().unwrap_or(DEFAULT_FIELD);
    let wind = form.windspeed.as_deref().unwrap_or(DEFAULT_FIELD);

    let cities = state.weather.cities();
    match state.predictions.predict(theo, wind) {
        Ok(value) => Html(pages::render_predict(&cities, Some(value), None)),
        Err(e) => {
            tracing::warn!("⚠️ Prediction failed: {}", e);
            Html(pages::render_predict(&cities, None, Some(&e.to_string())))
        }
    }
}

async fn weather(State(state): State<AppState>, Query(query): Query<WeatherQuery>) -> Response {
    match state.weather.get(&query.city) {
        Some(record) => Json(*record).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(CityNotFound {
                error: "city not found",
                city: query.city,
            }),
        )
            .into_response(),
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model: ModelStatus::from(&**state.model()),
    })
}
