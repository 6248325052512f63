use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use pangkalan_core::{
    default_runner, generate_sample, load_document, map_center, rank_by_distance, sanitize,
    unique_categories, validate_text, LoadedDocument, LocationFilter, NoticeContainer,
    PipelineError, ValidationResult,
};
use pangkalan_model::{density_marker_class, Category, LatLng, LocationDocument, TimeOfDay};
use pangkalan_report::{
    render_html, HtmlReportContext, ReportSummary, ReportSummaryContext, ValidationReport,
};

const DEFAULT_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const SAMPLE_FILE_NAME: &str = "sample_pangkalan.geojson";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = WebConfig::from_env();
    let dataset = initial_dataset(&config)?;
    tracing::info!(
        "serving {} locations from {}",
        dataset.document.len(),
        dataset.source
    );
    let state = AppState::new(dataset);
    let app = app(state, config.max_upload_bytes);

    let listener = TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("bind {}", config.addr))?;
    tracing::info!("listening on {}", config.addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn app(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/version", get(version))
        .route("/api/locations", get(list_locations).post(upload_locations))
        .route("/api/validate", post(validate))
        .route("/api/report", post(report_json))
        .route("/api/report.html", post(report_html))
        .route("/api/sample.geojson", get(sample))
        .route("/api/categories", get(categories))
        .route("/api/nearest", get(nearest))
        .route("/api/center", get(center))
        .route("/api/dataset", get(dataset_info))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

struct WebConfig {
    addr: String,
    data_path: Option<PathBuf>,
    max_upload_bytes: usize,
}

impl WebConfig {
    fn from_env() -> Self {
        Self {
            addr: std::env::var("PANGKALAN_WEB_ADDR")
                .unwrap_or_else(|_| DEFAULT_ADDR.to_string()),
            data_path: std::env::var("PANGKALAN_WEB_DATA_PATH")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from),
            max_upload_bytes: std::env::var("PANGKALAN_WEB_MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        }
    }
}

/// The file at `PANGKALAN_WEB_DATA_PATH`, or the sample document.
fn initial_dataset(config: &WebConfig) -> anyhow::Result<Dataset> {
    let (text, source) = match config.data_path.as_ref() {
        Some(path) => (
            std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?,
            path.display().to_string(),
        ),
        None => (generate_sample(), SAMPLE_FILE_NAME.to_string()),
    };
    let loaded = load_document(&text).map_err(|err| {
        anyhow::anyhow!("{} rejected: {}", source, err.messages().join("; "))
    })?;
    Ok(Dataset::new(loaded, source))
}

/// The single active dataset. Replaced wholesale by a successful upload.
struct Dataset {
    document: LocationDocument,
    source: String,
    loaded_at: DateTime<Utc>,
}

impl Dataset {
    fn new(loaded: LoadedDocument, source: String) -> Self {
        Self {
            document: loaded.document,
            source,
            loaded_at: Utc::now(),
        }
    }
}

#[derive(Clone)]
struct AppState {
    dataset: Arc<RwLock<Dataset>>,
}

impl AppState {
    fn new(dataset: Dataset) -> Self {
        Self {
            dataset: Arc::new(RwLock::new(dataset)),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&Dataset) -> T) -> Result<T, ApiError> {
        let dataset = self
            .dataset
            .read()
            .map_err(|_| ApiError::internal("dataset lock poisoned"))?;
        Ok(f(&dataset))
    }

    fn replace(&self, dataset: Dataset) -> Result<(), ApiError> {
        let mut active = self
            .dataset
            .write()
            .map_err(|_| ApiError::internal("dataset lock poisoned"))?;
        *active = dataset;
        Ok(())
    }
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Debug, Serialize)]
struct VersionResponse {
    version: String,
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct LocationQuery {
    q: Option<String>,
    /// Comma-separated category names.
    category: Option<String>,
    min_density: Option<u8>,
    max_density: Option<u8>,
    busy_at: Option<String>,
}

impl LocationQuery {
    fn to_filter(&self) -> Result<LocationFilter, ApiError> {
        let categories = match self.category.as_deref() {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| {
                    name.parse::<Category>().map_err(|_| {
                        ApiError::bad_request(format!(
                            "unknown category '{}'. Allowed categories: {}",
                            name,
                            Category::allowed_list()
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };
        let busy_at = match self.busy_at.as_deref() {
            Some(value) => Some(
                TimeOfDay::parse(value).map_err(|err| ApiError::bad_request(err.to_string()))?,
            ),
            None => None,
        };
        Ok(LocationFilter {
            search: self.q.clone(),
            categories,
            min_density: self.min_density,
            max_density: self.max_density,
            busy_at,
        })
    }
}

/// Matching locations as a FeatureCollection. `markers` runs parallel to
/// `features` and carries the map styling for each one.
async fn list_locations(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> Result<Json<Value>, ApiError> {
    let filter = query.to_filter()?;
    state.read(|dataset| {
        let matches = filter.apply(&dataset.document);
        let markers: Vec<Value> = matches
            .iter()
            .map(|record| {
                json!({
                    "iconColor": record.properties.category.icon_color(),
                    "densityClass": density_marker_class(
                        i64::from(record.properties.density_level.value())
                    ),
                })
            })
            .collect();
        Json(json!({
            "type": "FeatureCollection",
            "features": matches,
            "markers": markers,
        }))
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    #[serde(flatten)]
    result: ValidationResult,
    location_count: usize,
}

async fn upload_locations(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let text = body_text(body)?;
    let loaded = tokio::task::spawn_blocking(move || load_document(&text))
        .await
        .map_err(|err| ApiError::internal(format!("join error: {}", err)))?;

    match loaded {
        Ok(loaded) => {
            let result = ValidationResult {
                is_valid: true,
                errors: Vec::new(),
                warnings: loaded.warnings(),
            };
            let location_count = loaded.document.len();
            state.replace(Dataset::new(loaded, "upload".to_string()))?;
            tracing::info!("active dataset replaced with {} locations", location_count);
            Ok((
                StatusCode::OK,
                Json(UploadResponse {
                    result,
                    location_count,
                }),
            ))
        }
        Err(PipelineError::Rejected { notices }) => Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(UploadResponse {
                result: ValidationResult::from(&notices),
                location_count: 0,
            }),
        )),
        Err(err @ PipelineError::Conversion(_)) => Err(ApiError::internal(err.to_string())),
    }
}

async fn validate(body: Bytes) -> Result<Json<ValidationResult>, ApiError> {
    let text = body_text(body)?;
    let result =
        tokio::task::spawn_blocking(move || validate_text(&text, &default_runner()).result())
            .await
            .map_err(|err| ApiError::internal(format!("join error: {}", err)))?;
    Ok(Json(result))
}

async fn report_json(body: Bytes) -> Result<Json<ValidationReport>, ApiError> {
    let (notices, summary) = summarize_upload(body).await?;
    Ok(Json(ValidationReport::from_container_with_summary(
        &notices, summary,
    )))
}

async fn report_html(body: Bytes) -> Result<Html<String>, ApiError> {
    let (notices, summary) = summarize_upload(body).await?;
    let context = HtmlReportContext::from_summary(&summary, "upload");
    Ok(Html(render_html(&notices, &summary, &context)))
}

/// Validates once; the summary lists categories only for an accepted document.
async fn summarize_upload(body: Bytes) -> Result<(NoticeContainer, ReportSummary), ApiError> {
    let text = body_text(body)?;
    tokio::task::spawn_blocking(move || {
        let outcome = validate_text(&text, &default_runner());
        let location_count = outcome.document.as_ref().map_or(0, |document| document.len());
        let accepted = outcome
            .document
            .as_ref()
            .filter(|_| outcome.is_valid())
            .and_then(|document| LocationDocument::try_from(&sanitize(document)).ok());
        let summary = ReportSummary::from_context(ReportSummaryContext {
            source: Some("upload".to_string()),
            validator_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            validation_time_seconds: None,
            notices: &outcome.notices,
            location_count,
            document: accepted.as_ref(),
        });
        (outcome.notices, summary)
    })
    .await
    .map_err(|err| ApiError::internal(format!("join error: {}", err)))
}

async fn sample() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/geo+json"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"sample_pangkalan.geojson\"",
            ),
        ],
        generate_sample(),
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CategoryResponse {
    name: &'static str,
    icon_color: &'static str,
    count: usize,
}

/// Categories present in the active dataset, first-seen order.
async fn categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    state.read(|dataset| {
        let categories = unique_categories(&dataset.document)
            .into_iter()
            .map(|category| CategoryResponse {
                name: category.as_str(),
                icon_color: category.icon_color(),
                count: dataset
                    .document
                    .iter()
                    .filter(|record| record.properties.category == category)
                    .count(),
            })
            .collect();
        Json(categories)
    })
}

#[derive(Debug, Deserialize)]
struct NearestQuery {
    lat: f64,
    lng: f64,
    limit: Option<usize>,
}

async fn nearest(
    State(state): State<AppState>,
    Query(query): Query<NearestQuery>,
) -> Result<Json<Value>, ApiError> {
    let origin = LatLng::checked(query.lat, query.lng)
        .map_err(|err| ApiError::bad_request(err.to_string()))?;
    let limit = query.limit.unwrap_or(1);
    if limit == 0 {
        return Err(ApiError::bad_request("limit must be at least 1"));
    }
    state.read(|dataset| {
        let ranked: Vec<_> = rank_by_distance(&dataset.document, origin)
            .into_iter()
            .take(limit)
            .collect();
        Json(json!(ranked))
    })
}

async fn center(State(state): State<AppState>) -> Result<Json<LatLng>, ApiError> {
    state.read(|dataset| Json(map_center(&dataset.document)))
}

async fn dataset_info(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.read(|dataset| {
        Json(json!({
            "source": dataset.source,
            "loadedAt": dataset.loaded_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            "locationCount": dataset.document.len(),
        }))
    })
}

fn body_text(body: Bytes) -> Result<String, ApiError> {
    String::from_utf8(body.to_vec())
        .map_err(|err| ApiError::bad_request(format!("request body is not valid UTF-8: {}", err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use pangkalan_core::validate_document;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let loaded = load_document(&generate_sample()).unwrap();
        app(
            AppState::new(Dataset::new(loaded, SAMPLE_FILE_NAME.to_string())),
            DEFAULT_MAX_UPLOAD_BYTES,
        )
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_request(uri: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/geo+json")
            .body(body.into())
            .unwrap()
    }

    fn upload_document() -> String {
        json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {
                    "nama_lokasi": " Pangkalan Pantai Losari ",
                    "jenis_lokasi": "Pinggir jalan",
                    "jam_ramainya": "16:00 - 21:00",
                    "tingkat_kepadatan": 4,
                    "tingkat_keamanan": 3,
                    "akses_internet": 3,
                    "kenyamanan": 4,
                    "fasilitas": "Warung",
                    "alamat": "Jl. Penghibur, Makassar"
                },
                "geometry": {"type": "Point", "coordinates": [119.4066, -5.1434]}
            }]
        })
        .to_string()
    }

    #[tokio::test]
    async fn health_and_version() {
        let app = test_app();
        let response = app.clone().oneshot(get_request("/healthz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (status, body) = send(&app, get_request("/version")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn lists_and_filters_locations() {
        let app = test_app();
        let (status, body) = send(&app, get_request("/api/locations")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["features"].as_array().unwrap().len(), 2);
        assert_eq!(body["markers"][0]["iconColor"], "red");
        assert_eq!(body["markers"][0]["densityClass"], "text-red-500");

        let (_, body) = send(
            &app,
            get_request("/api/locations?category=Minimarket&busy_at=08:00"),
        )
        .await;
        let features = body["features"].as_array().unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0]["properties"]["nama_lokasi"], "Contoh Minimarket");

        let (status, _) = send(&app, get_request("/api/locations?category=Restoran")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upload_replaces_dataset_only_when_valid() {
        let app = test_app();

        let (status, body) = send(&app, post_request("/api/locations", "{\"type\": \"Feature\"}")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["isValid"], false);
        assert_eq!(
            body["errors"][0],
            "GeoJSON must be of type 'FeatureCollection'"
        );
        let (_, body) = send(&app, get_request("/api/locations")).await;
        assert_eq!(body["features"].as_array().unwrap().len(), 2);

        let (status, body) = send(&app, post_request("/api/locations", upload_document())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isValid"], true);
        assert_eq!(body["locationCount"], 1);

        let (_, body) = send(&app, get_request("/api/locations")).await;
        let features = body["features"].as_array().unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(
            features[0]["properties"]["nama_lokasi"],
            "Pangkalan Pantai Losari"
        );
    }

    #[tokio::test]
    async fn validate_reports_without_replacing() {
        let app = test_app();
        let (status, body) = send(&app, post_request("/api/validate", "not json")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isValid"], false);
        assert_eq!(body["errors"].as_array().unwrap().len(), 1);

        let (_, body) = send(&app, post_request("/api/validate", upload_document())).await;
        assert_eq!(body["isValid"], true);
        assert_eq!(body["warnings"], json!([]));

        let (_, body) = send(&app, get_request("/api/dataset")).await;
        assert_eq!(body["locationCount"], 2);
    }

    #[tokio::test]
    async fn report_endpoints() {
        let app = test_app();
        let (status, body) = send(&app, post_request("/api/report", upload_document())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isValid"], true);
        assert_eq!(body["summary"]["categories"], json!(["Pinggir jalan"]));

        let response = app
            .clone()
            .oneshot(post_request("/api/report.html", "[]"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("document_not_object"));

        let (status, body) = send(&app, post_request("/api/report", "[]")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isValid"], false);
        assert!(body["summary"].get("categories").is_none());
    }

    #[tokio::test]
    async fn rejects_body_that_is_not_utf8() {
        let app = test_app();
        let sample = generate_sample();
        let mut bytes = sample.clone().into_bytes();
        let at = sample.find("Contoh Terminal Bus").unwrap();
        bytes[at] = 0xFF;

        for uri in [
            "/api/locations",
            "/api/validate",
            "/api/report",
            "/api/report.html",
        ] {
            let (status, body) = send(&app, post_request(uri, bytes.clone())).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert!(body["error"].as_str().unwrap().contains("UTF-8"));
        }

        let (_, body) = send(&app, get_request("/api/locations")).await;
        assert_eq!(
            body["features"][0]["properties"]["nama_lokasi"],
            "Contoh Terminal Bus"
        );
    }

    #[tokio::test]
    async fn sample_download() {
        let app = test_app();
        let response = app
            .clone()
            .oneshot(get_request("/api/sample.geojson"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/geo+json"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(validate_document(&value).is_valid);
    }

    #[tokio::test]
    async fn categories_nearest_and_center() {
        let app = test_app();
        let (_, body) = send(&app, get_request("/api/categories")).await;
        assert_eq!(body[0]["name"], "Terminal");
        assert_eq!(body[0]["count"], 1);
        assert_eq!(body[1]["name"], "Minimarket");

        let (status, body) = send(&app, get_request("/api/nearest?lat=-6.25&lng=106.82&limit=2")).await;
        assert_eq!(status, StatusCode::OK);
        let ranked = body.as_array().unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0]["record"]["properties"]["nama_lokasi"], "Contoh Minimarket");
        assert_eq!(ranked[0]["index"], 1);

        let (status, body) = send(&app, get_request("/api/nearest?lat=120&lng=0")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "latitude must be between -90 and 90");

        let (status, _) = send(&app, get_request("/api/nearest?lat=-6.2&lng=106.8&limit=0")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = send(&app, get_request("/api/center")).await;
        let lat = body["lat"].as_f64().unwrap();
        assert!((lat - (-6.2088 - 6.25) / 2.0).abs() < 1e-9);
    }
}
