use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use wind_power_web::core::artifact::{encode_bincode, encode_safetensors};
use wind_power_web::core::regression::{LinearRegression, RegressionModel};
use wind_power_web::{router, AppState, ArtifactLoader, WeatherTable};

const MISSING_MODEL: &str = "Model not found — place `power_prediction.sav` in the project root.";

fn state_for(root: &Path) -> AppState {
    let handle = ArtifactLoader::default().load(&root.join("power_prediction.sav"));
    AppState::new(handle, WeatherTable::sample(), root.join("static"))
}

fn write_model(root: &Path, model: &RegressionModel) {
    let bytes = encode_safetensors(model).unwrap();
    std::fs::write(root.join("power_prediction.sav"), bytes).unwrap();
}

fn linear() -> RegressionModel {
    RegressionModel::Linear(LinearRegression::new(vec![0.9, 20.0], 0.005))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_form(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/y_predict")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_weather_known_city() -> Result<()> {
    let root = TempDir::new()?;
    let app = router(state_for(root.path()));

    let (status, body) = send(&app, get("/weather?city=Delhi")).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body)?;
    assert_eq!(
        json,
        serde_json::json!({"temp_c": 30.1, "humidity": 45, "pressure_mm": 1005, "wind_mps": 3.2})
    );
    assert_eq!(
        body,
        r#"{"temp_c":30.1,"humidity":45,"pressure_mm":1005,"wind_mps":3.2}"#
    );
    Ok(())
}

#[tokio::test]
async fn test_weather_unknown_city() -> Result<()> {
    let root = TempDir::new()?;
    let app = router(state_for(root.path()));

    let (status, body) = send(&app, get("/weather?city=Nowhere")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"city not found","city":"Nowhere"}"#);

    let (status, body) = send(&app, get("/weather")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"city not found","city":""}"#);
    Ok(())
}

#[tokio::test]
async fn test_predict_form_lists_sorted_cities() -> Result<()> {
    let root = TempDir::new()?;
    let app = router(state_for(root.path()));

    let (status, body) = send(&app, get("/y_predict")).await;
    assert_eq!(status, StatusCode::OK);
    let positions: Vec<usize> = ["Agartala", "Chennai", "Delhi", "Kolkata", "Mumbai"]
        .iter()
        .map(|city| body.find(city).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert!(!body.contains("class=\"prediction\""));
    assert!(!body.contains("class=\"error\""));
    Ok(())
}

#[tokio::test]
async fn test_prediction_with_model() -> Result<()> {
    let root = TempDir::new()?;
    write_model(root.path(), &linear());
    let app = router(state_for(root.path()));

    // 0.9 * 1500 + 20 * 5 + 0.005 = 1450.005
    let (status, body) = send(&app, post_form("theoretical_power=1500.0&windspeed=5.0")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Predicted energy output: 1450"), "{}", body);
    Ok(())
}

#[tokio::test]
async fn test_prediction_is_deterministic() -> Result<()> {
    let root = TempDir::new()?;
    write_model(root.path(), &linear());
    let state = state_for(root.path());

    let first = state.predictions.predict("1500.0", "5.0");
    let second = state.predictions.predict("1500.0", "5.0");
    tokio_test::assert_ok!(&first);
    assert_eq!(first, second);

    let app = router(state);
    let (_, a) = send(&app, post_form("theoretical_power=1500.0&windspeed=5.0")).await;
    let (_, b) = send(&app, post_form("theoretical_power=1500.0&windspeed=5.0")).await;
    assert_eq!(a, b);
    Ok(())
}

#[tokio::test]
async fn test_invalid_input_is_reported_in_page() -> Result<()> {
    let root = TempDir::new()?;
    write_model(root.path(), &linear());
    let app = router(state_for(root.path()));

    let (status, body) = send(&app, post_form("theoretical_power=abc&windspeed=5")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(
        "Invalid input or prediction error: could not convert string to float: &#x27;abc&#x27;"
    ));
    Ok(())
}

#[tokio::test]
async fn test_missing_fields_default_to_zero() -> Result<()> {
    let root = TempDir::new()?;
    write_model(
        root.path(),
        &RegressionModel::Linear(LinearRegression::new(vec![3.0, 7.0], 42.0)),
    );
    let app = router(state_for(root.path()));

    let (status, body) = send(&app, post_form("")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Predicted energy output: 42.0"), "{}", body);
    Ok(())
}

#[tokio::test]
async fn test_post_without_content_type_is_handled() -> Result<()> {
    let root = TempDir::new()?;
    write_model(
        root.path(),
        &RegressionModel::Linear(LinearRegression::new(vec![3.0, 7.0], 42.0)),
    );
    let app = router(state_for(root.path()));

    let request = Request::builder()
        .method("POST")
        .uri("/y_predict")
        .body(Body::empty())?;
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Predicted energy output: 42.0"), "{}", body);

    let request = Request::builder()
        .method("POST")
        .uri("/y_predict")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("theoretical_power=%zz&windspeed=1"))?;
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("could not convert string to float: &#x27;%zz&#x27;"), "{}", body);
    Ok(())
}

#[tokio::test]
async fn test_missing_model_reports_unavailable() -> Result<()> {
    let root = TempDir::new()?;
    let state = state_for(root.path());
    assert!(!state.model().is_available());
    let app = router(state);

    let (status, body) = send(&app, post_form("theoretical_power=1500&windspeed=5")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(MISSING_MODEL), "{}", body);

    // other routes still work without a model
    let (status, _) = send(&app, get("/weather?city=Mumbai")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_wrong_feature_count_is_prediction_error() -> Result<()> {
    let root = TempDir::new()?;
    write_model(
        root.path(),
        &RegressionModel::Linear(LinearRegression::new(vec![1.0, 2.0, 3.0], 0.0)),
    );
    let app = router(state_for(root.path()));

    let (status, body) = send(&app, post_form("theoretical_power=1&windspeed=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(
        "Invalid input or prediction error: X has 2 features, but LinearRegression is expecting 3 features as input"
    ));
    Ok(())
}

#[tokio::test]
async fn test_model_is_loaded_once() -> Result<()> {
    let root = TempDir::new()?;
    let artifact = root.path().join("power_prediction.sav");
    std::fs::write(&artifact, encode_bincode(&linear())?)?;

    let state = state_for(root.path());
    let before = Arc::clone(state.model().predictor().unwrap());
    let app = router(state.clone());

    std::fs::remove_file(&artifact)?;

    let (_, body) = send(&app, post_form("theoretical_power=1500.0&windspeed=5.0")).await;
    assert!(body.contains("Predicted energy output: 1450"), "{}", body);
    let (_, body) = send(&app, post_form("theoretical_power=10&windspeed=1")).await;
    assert!(body.contains("Predicted energy output: 29.0"), "{}", body);

    let after = state.model().predictor().unwrap();
    assert!(Arc::ptr_eq(&before, after));
    Ok(())
}

#[tokio::test]
async fn test_index_uses_hero_fallback_and_static_files() -> Result<()> {
    let root = TempDir::new()?;
    let img = root.path().join("static").join("img");
    std::fs::create_dir_all(&img)?;
    std::fs::write(img.join("wind.svg"), "<svg/>")?;
    let app = router(state_for(root.path()));

    let (status, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("/static/img/wind.svg"));

    std::fs::write(img.join("turbine.png"), b"png")?;
    let (_, body) = send(&app, get("/")).await;
    assert!(body.contains("/static/img/turbine.png"));

    let (status, body) = send(&app, get("/static/img/wind.svg")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<svg/>");
    Ok(())
}

#[tokio::test]
async fn test_health_reports_model_status() -> Result<()> {
    let root = TempDir::new()?;
    let app = router(state_for(root.path()));
    let (status, body) = send(&app, get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body)?;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["model"]["available"], false);
    assert!(json["model"]["strategy"].is_null());

    write_model(root.path(), &linear());
    let app = router(state_for(root.path()));
    let (_, body) = send(&app, get("/healthz")).await;
    let json: serde_json::Value = serde_json::from_str(&body)?;
    assert_eq!(json["model"]["available"], true);
    assert_eq!(json["model"]["strategy"], "safetensors");
    assert_eq!(json["model"]["kind"], "LinearRegression");
    Ok(())
}
