use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use subway_outlets::core::config::{AppConfig, AppPaths};
use subway_outlets::core::errors::{ApiError, INTERNAL_DETAIL};
use subway_outlets::llm::{AnswerGenerator, EmbeddingProvider};
use subway_outlets::memory::Turn;
use subway_outlets::outlets::{Match, Outlet, OutletStore, SqliteOutletStore};
use subway_outlets::server::router;
use subway_outlets::state::AppState;

struct FixedEmbedder;

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    fn model_id(&self) -> &str {
        "fixed"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ApiError> {
        Ok(vec![1.0, 0.0])
    }
}

#[derive(Default)]
struct RecordingGenerator {
    calls: Mutex<Vec<(String, usize)>>,
    fail: bool,
}

#[async_trait]
impl AnswerGenerator for RecordingGenerator {
    async fn generate(&self, prompt: &str, history: &[Turn]) -> Result<String, ApiError> {
        if self.fail {
            return Err(ApiError::Upstream("401 invalid api key".to_string()));
        }
        let mut calls = self.calls.lock().unwrap();
        calls.push((prompt.to_string(), history.len()));
        Ok(format!("Reply {}", calls.len()))
    }
}

/// Stalls far past any query timeout on its first call, then answers at once.
#[derive(Default)]
struct StallOnceGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl AnswerGenerator for StallOnceGenerator {
    async fn generate(&self, _prompt: &str, history: &[Turn]) -> Result<String, ApiError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Ok(format!("Reply with {} prior turns", history.len()))
    }
}

struct UnavailableStore;

#[async_trait]
impl OutletStore for UnavailableStore {
    async fn select_all(&self) -> Result<Vec<Outlet>, ApiError> {
        Err(ApiError::internal("database is locked"))
    }
    async fn select_by_key(&self, _address: &str) -> Result<Option<Outlet>, ApiError> {
        Err(ApiError::internal("database is locked"))
    }
    async fn nearest_neighbors(
        &self,
        _query_embedding: &[f32],
        _threshold: f32,
        _limit: usize,
    ) -> Result<Vec<Match>, ApiError> {
        Err(ApiError::internal("database is locked"))
    }
    async fn upsert_by_key(&self, _outlet: &Outlet) -> Result<(), ApiError> {
        Err(ApiError::internal("database is locked"))
    }
    async fn upsert_batch(&self, _outlets: &[Outlet]) -> Result<(), ApiError> {
        Err(ApiError::internal("database is locked"))
    }
    async fn set_embedding(&self, _address: &str, _embedding: &[f32]) -> Result<bool, ApiError> {
        Err(ApiError::internal("database is locked"))
    }
    async fn count(&self) -> Result<usize, ApiError> {
        Err(ApiError::internal("database is locked"))
    }
    async fn count_embedded(&self) -> Result<usize, ApiError> {
        Err(ApiError::internal("database is locked"))
    }
    async fn missing_embeddings(&self) -> Result<Vec<Outlet>, ApiError> {
        Err(ApiError::internal("database is locked"))
    }
    async fn embedding_model(&self) -> Result<Option<String>, ApiError> {
        Err(ApiError::internal("database is locked"))
    }
    async fn set_embedding_model(&self, _model: &str) -> Result<(), ApiError> {
        Err(ApiError::internal("database is locked"))
    }
    async fn clear_embeddings(&self) -> Result<(), ApiError> {
        Err(ApiError::internal("database is locked"))
    }
}

struct TestApp<G> {
    router: Router,
    state: Arc<AppState>,
    generator: Arc<G>,
    _dir: tempfile::TempDir,
}

fn klcc() -> Outlet {
    Outlet::new(
        "Subway Suria KLCC",
        "Lot C-27, Suria KLCC, 50088 Kuala Lumpur",
        "Monday - Sunday, 10:00 AM - 10:00 PM",
        "https://waze.com/ul?ll=3.1579,101.7116",
    )
    .with_coordinates(Some((3.1579, 101.7116)))
}

fn pavilion() -> Outlet {
    Outlet::new(
        "Subway Pavilion",
        "Lot 1.02, Pavilion, 55100 Kuala Lumpur",
        "Daily 9:00 AM - 9:00 PM",
        "Not available",
    )
    .with_coordinates(Some((3.1490, 101.7133)))
}

async fn spawn_app(generator: RecordingGenerator) -> TestApp<RecordingGenerator> {
    spawn_app_with(AppConfig::default(), generator).await
}

async fn spawn_app_with<G>(config: AppConfig, generator: G) -> TestApp<G>
where
    G: AnswerGenerator + 'static,
{
    let dir = tempfile::tempdir().unwrap();
    let paths = AppPaths::with_data_dir(dir.path().to_path_buf(), dir.path().join("data"));

    let store = SqliteOutletStore::new(&paths).await.unwrap();
    store.upsert_batch(&[klcc(), pavilion()]).await.unwrap();
    store.set_embedding(&klcc().address, &[1.0, 0.0]).await.unwrap();
    store.set_embedding(&pavilion().address, &[0.0, 1.0]).await.unwrap();

    let generator = Arc::new(generator);
    let state = Arc::new(AppState::from_parts(
        config,
        Arc::new(store),
        Arc::new(FixedEmbedder),
        generator.clone(),
    ));

    TestApp {
        router: router(state.clone()),
        state,
        generator,
        _dir: dir,
    }
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn health_reports_counts() {
    let app = spawn_app(RecordingGenerator::default()).await;

    let (status, body) = get(&app.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["outlets_count"], 2);
    assert_eq!(body["embedded_count"], 2);
}

#[tokio::test]
async fn health_is_unavailable_when_store_fails() {
    let state = AppState::from_parts(
        AppConfig::default(),
        Arc::new(UnavailableStore),
        Arc::new(FixedEmbedder),
        Arc::new(RecordingGenerator::default()),
    );
    let app = router(Arc::new(state));

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");

    let (status, body) = get(&app, "/outlets/").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], INTERNAL_DETAIL);
}

#[tokio::test]
async fn root_greets() {
    let app = spawn_app(RecordingGenerator::default()).await;
    let (status, body) = get(&app.router, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("/query/"));
}

#[tokio::test]
async fn outlets_are_listed_with_and_without_trailing_slash() {
    let app = spawn_app(RecordingGenerator::default()).await;

    for uri in ["/outlets/", "/outlets"] {
        let (status, body) = get(&app.router, uri).await;
        assert_eq!(status, StatusCode::OK);
        let outlets = body.as_array().unwrap();
        assert_eq!(outlets.len(), 2);
        assert!(outlets
            .iter()
            .any(|o| o["name"] == "Subway Suria KLCC" && o["lat"] == 3.1579));
    }
}

#[tokio::test]
async fn density_validates_radius() {
    let app = spawn_app(RecordingGenerator::default()).await;

    let (status, body) = get(&app.router, "/outlets/density?radius_km=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outlets"][0]["nearby_count"], 1);

    for radius in ["0", "-1", "51"] {
        let (status, body) = get(&app.router, &format!("/outlets/density?radius_km={radius}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("radius_km"));
    }
}

#[tokio::test]
async fn invalid_queries_are_rejected_without_generation() {
    let app = spawn_app(RecordingGenerator::default()).await;
    let long = "a".repeat(501);

    for uri in [
        "/query/?q=".to_string(),
        "/query/?q=%20%20%20".to_string(),
        "/query/".to_string(),
        format!("/query/?q={long}"),
    ] {
        let (status, body) = get(&app.router, &uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(
            body["detail"],
            "Query must be non-empty and at most 500 characters."
        );
    }

    assert!(app.generator.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn query_answers_from_matched_outlets() {
    let app = spawn_app(RecordingGenerator::default()).await;

    let (status, body) = get(&app.router, "/query/?q=What%20are%20the%20hours%20at%20KLCC%3F").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "Reply 1");
    assert_eq!(body.as_object().unwrap().len(), 1);

    let calls = app.generator.calls.lock().unwrap();
    let (prompt, history_len) = &calls[0];
    assert!(prompt.contains("Subway Suria KLCC"));
    assert!(prompt.contains("10:00 AM - 10:00 PM"));
    assert!(prompt.contains("What are the hours at KLCC?"));
    assert!(!prompt.contains("Subway Pavilion"));
    assert_eq!(*history_len, 0);
}

#[tokio::test]
async fn follow_ups_share_history_within_a_session_only() {
    let app = spawn_app(RecordingGenerator::default()).await;

    get(&app.router, "/query?q=Where%20is%20KLCC&session_id=alice").await;
    get(&app.router, "/query?q=And%20its%20hours&session_id=alice").await;
    get(&app.router, "/query?q=And%20its%20hours&session_id=bob").await;
    get(&app.router, "/query?q=Hello").await;

    let calls = app.generator.calls.lock().unwrap();
    let history_lens: Vec<usize> = calls.iter().map(|(_, len)| *len).collect();
    assert_eq!(history_lens, vec![0, 1, 0, 0]);
}

#[tokio::test]
async fn generation_failure_is_an_opaque_server_error() {
    let app = spawn_app(RecordingGenerator {
        fail: true,
        ..Default::default()
    })
    .await;

    let (status, body) = get(&app.router, "/query/?q=hello").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], INTERNAL_DETAIL);

    let (_, health) = get(&app.router, "/health").await;
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn timed_out_query_is_opaque_and_records_no_turn() {
    let mut config = AppConfig::default();
    config.retrieval.query_timeout_secs = 1;
    let app = spawn_app_with(config, StallOnceGenerator::default()).await;

    let (status, body) = get(&app.router, "/query/?q=Where%20is%20KLCC&session_id=alice").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], INTERNAL_DETAIL);
    assert_eq!(app.state.memory().len("alice").await, 0);

    let (status, body) = get(&app.router, "/query/?q=And%20its%20hours&session_id=alice").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "Reply with 0 prior turns");
    assert_eq!(app.state.memory().len("alice").await, 1);
    assert_eq!(app.generator.calls.load(Ordering::SeqCst), 2);
}
