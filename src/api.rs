// Diamond Price Estimator - HTTP surface
// JSON API + static form page over the same prediction flow as the TUI.

use crate::catalog::{Clarity, Color, Cut, DiamondInput, DiamondRecord, Grade, NumericField};
use crate::flow::{Prediction, PriceEstimator};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub estimator: Arc<PriceEstimator>,
}

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub fingerprint: String,
    pub records: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NumericInputSpec {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub step: f64,
}

/// Everything a client needs to render the form
#[derive(Debug, Serialize, Deserialize)]
pub struct FormSchema {
    pub numeric: Vec<NumericInputSpec>,
    pub cut: Vec<String>,
    pub color: Vec<String>,
    pub clarity: Vec<String>,
}

impl FormSchema {
    fn build() -> Self {
        FormSchema {
            numeric: NumericField::ALL
                .iter()
                .map(|field| {
                    let bounds = field.bounds();
                    NumericInputSpec {
                        name: field.name().to_string(),
                        min: bounds.min,
                        max: bounds.max,
                        default: bounds.default,
                        step: bounds.step,
                    }
                })
                .collect(),
            cut: labels::<Cut>(),
            color: labels::<Color>(),
            clarity: labels::<Clarity>(),
        }
    }
}

fn labels<G: Grade>() -> Vec<String> {
    G::ALL.iter().map(|g| g.label().to_string()).collect()
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

/// Extractor failures answered inside the usual envelope
fn rejected<T: Serialize>(status: StatusCode, message: String) -> Response {
    (status, Json(ApiResponse::<T>::error(message))).into_response()
}

fn internal_error<T: Serialize>(context: &str, e: anyhow::Error) -> Response {
    error!(error = %format!("{:#}", e), "{}", context);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<T>::error(format!("{}: {}", context, e))),
    )
        .into_response()
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check(State(state): State<AppState>) -> Response {
    let estimator = state.estimator.clone();

    match tokio::task::spawn_blocking(move || estimator.store().count()).await {
        Ok(Ok(records)) => Json(ApiResponse::ok(HealthResponse {
            status: "OK".to_string(),
            model: state.estimator.model_name().to_string(),
            fingerprint: state.estimator.fingerprint().to_string(),
            records,
        }))
        .into_response(),
        Ok(Err(e)) => internal_error::<HealthResponse>("Error counting records", e),
        Err(e) => internal_error::<HealthResponse>("Health check failed", e.into()),
    }
}

/// GET /api/form - Input bounds and choices
async fn get_form() -> impl IntoResponse {
    Json(ApiResponse::ok(FormSchema::build()))
}

/// POST /api/predict - Estimate, store, and return recent records
async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<DiamondInput>, JsonRejection>,
) -> Response {
    let input = match payload {
        Ok(Json(input)) => input,
        Err(e) => return rejected::<Prediction>(e.status(), e.body_text()),
    };

    if let Err(e) = input.validate() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::<Prediction>::error(e.to_string())),
        )
            .into_response();
    }

    let estimator = state.estimator.clone();
    match tokio::task::spawn_blocking(move || estimator.submit(input)).await {
        Ok(Ok(prediction)) => (StatusCode::OK, Json(ApiResponse::ok(prediction))).into_response(),
        Ok(Err(e)) => internal_error::<Prediction>("Error predicting price", e),
        Err(e) => internal_error::<Prediction>("Prediction task failed", e.into()),
    }
}

/// GET /api/diamonds - Every stored record
async fn get_diamonds(State(state): State<AppState>) -> Response {
    let estimator = state.estimator.clone();

    match tokio::task::spawn_blocking(move || estimator.store().load_all()).await {
        Ok(Ok(records)) => (StatusCode::OK, Json(ApiResponse::ok(records))).into_response(),
        Ok(Err(e)) => internal_error::<Vec<DiamondRecord>>("Error getting diamonds", e),
        Err(e) => internal_error::<Vec<DiamondRecord>>("Query task failed", e.into()),
    }
}

/// GET /api/diamonds/recent?limit=N - Most recent records, oldest first
async fn get_recent_diamonds(
    State(state): State<AppState>,
    query: Result<Query<RecentQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(e) => return rejected::<Vec<DiamondRecord>>(e.status(), e.body_text()),
    };

    let estimator = state.estimator.clone();
    let limit = query.limit.unwrap_or_else(|| estimator.recent_limit());

    match tokio::task::spawn_blocking(move || estimator.store().load_recent(limit)).await {
        Ok(Ok(records)) => (StatusCode::OK, Json(ApiResponse::ok(records))).into_response(),
        Ok(Err(e)) => internal_error::<Vec<DiamondRecord>>("Error getting recent diamonds", e),
        Err(e) => internal_error::<Vec<DiamondRecord>>("Query task failed", e.into()),
    }
}

/// GET / - Serve the form page
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

pub fn router(estimator: Arc<PriceEstimator>) -> Router {
    let state = AppState { estimator };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/form", get(get_form))
        .route("/predict", post(predict))
        .route("/diamonds", get(get_diamonds))
        .route("/diamonds/recent", get(get_recent_diamonds))
        .with_state(state);

    // Build main router
    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::bootstrap;
    use crate::db::Store;
    use crate::features::FeatureVector;
    use crate::model::{LinearModel, ModelArtifacts, TrainedModel};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use serde::de::DeserializeOwned;
    use tempfile::{tempdir, TempDir};
    use tower::ServiceExt;

    fn test_app() -> (TempDir, Router) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("diamonds.db");
        bootstrap(&db_path, &dir.path().join("none.csv")).unwrap();

        let features = FeatureVector::new(vec!["carat".into(), "cut_Ideal".into()]).unwrap();
        let model = TrainedModel::Linear(LinearModel {
            intercept: 0.0,
            coefficients: vec![1000.0, 250.0],
        });
        let artifacts = ModelArtifacts::from_parts(model, features, "0".repeat(64)).unwrap();
        let estimator = PriceEstimator::new(artifacts, Store::new(db_path));

        (dir, router(Arc::new(estimator)))
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> ApiResponse<T> {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn predict_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_model() {
        let (_dir, app) = test_app();

        let response = app.oneshot(get_request("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: ApiResponse<HealthResponse> = read_json(response).await;
        let health = body.data.unwrap();
        assert!(body.success);
        assert_eq!(health.model, "linear");
        assert_eq!(health.fingerprint, "000000000000");
        assert_eq!(health.records, 0);
    }

    #[tokio::test]
    async fn test_form_schema_lists_choices() {
        let (_dir, app) = test_app();

        let response = app.oneshot(get_request("/api/form")).await.unwrap();
        let schema = read_json::<FormSchema>(response).await.data.unwrap();

        assert_eq!(schema.numeric.len(), 6);
        assert_eq!(schema.numeric[0].name, "carat");
        assert_eq!(schema.numeric[0].max, 5.0);
        assert_eq!(schema.cut[2], "Very Good");
        assert_eq!(schema.color.len(), 7);
        assert_eq!(schema.clarity.last().unwrap(), "IF");
    }

    #[tokio::test]
    async fn test_predict_stores_and_returns_recent() {
        let (_dir, app) = test_app();
        let body = serde_json::json!({
            "carat": 0.5, "depth": 61.5, "table": 55.0,
            "x": 5.1, "y": 5.1, "z": 3.1,
            "cut": "Ideal", "color": "E", "clarity": "SI1"
        });

        let response = app.clone().oneshot(predict_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let prediction: serde_json::Value = read_json::<serde_json::Value>(response).await.data.unwrap();
        assert_eq!(prediction["record"]["price"], 750.0);
        assert_eq!(prediction["record"]["cut"], "Ideal");
        assert_eq!(prediction["recent"].as_array().unwrap().len(), 1);

        let response = app.oneshot(get_request("/api/diamonds")).await.unwrap();
        let records = read_json::<Vec<DiamondRecord>>(response).await.data.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].price, 750.0);
    }

    #[tokio::test]
    async fn test_out_of_range_input_is_rejected() {
        let (_dir, app) = test_app();
        let body = serde_json::json!({
            "carat": 7.0, "depth": 61.5, "table": 55.0,
            "x": 5.1, "y": 5.1, "z": 3.1,
            "cut": "Ideal", "color": "E", "clarity": "SI1"
        });

        let response = app.clone().oneshot(predict_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: ApiResponse<serde_json::Value> = read_json(response).await;
        assert!(!body.success);
        assert!(body.error.unwrap().contains("carat"));

        let response = app.oneshot(get_request("/api/health")).await.unwrap();
        let health = read_json::<HealthResponse>(response).await.data.unwrap();
        assert_eq!(health.records, 0);
    }

    #[tokio::test]
    async fn test_unknown_grade_is_rejected() {
        let (_dir, app) = test_app();
        let body = serde_json::json!({
            "carat": 0.5, "depth": 61.5, "table": 55.0,
            "x": 5.1, "y": 5.1, "z": 3.1,
            "cut": "Excellent", "color": "E", "clarity": "SI1"
        });

        let response = app.oneshot(predict_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: ApiResponse<serde_json::Value> = read_json(response).await;
        assert!(!body.success);
        assert!(body.data.is_none());
        assert!(body.error.unwrap().contains("Excellent"));
    }

    #[tokio::test]
    async fn test_malformed_json_body_uses_envelope() {
        let (_dir, app) = test_app();
        let request = Request::builder()
            .method("POST")
            .uri("/api/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ApiResponse<serde_json::Value> = read_json(response).await;
        assert!(!body.success);
        assert!(body.error.is_some());
    }

    #[tokio::test]
    async fn test_bad_recent_limit_uses_envelope() {
        let (_dir, app) = test_app();

        let response = app
            .oneshot(get_request("/api/diamonds/recent?limit=ten"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ApiResponse<Vec<DiamondRecord>> = read_json(response).await;
        assert!(!body.success);
        assert!(body.error.unwrap().contains("query string"));
    }

    #[tokio::test]
    async fn test_recent_honors_limit() {
        let (_dir, app) = test_app();
        for carat in [0.3, 0.4, 0.5] {
            let body = serde_json::json!({
                "carat": carat, "depth": 61.5, "table": 55.0,
                "x": 5.1, "y": 5.1, "z": 3.1,
                "cut": "Good", "color": "F", "clarity": "VS2"
            });
            let response = app.clone().oneshot(predict_request(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .oneshot(get_request("/api/diamonds/recent?limit=2"))
            .await
            .unwrap();
        let records = read_json::<Vec<DiamondRecord>>(response).await.data.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].input.carat, 0.4);
        assert_eq!(records[1].input.carat, 0.5);
    }

    #[tokio::test]
    async fn test_index_page_is_served() {
        let (_dir, app) = test_app();

        let response = app.oneshot(get_request("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("Diamond Price"));
    }
}
