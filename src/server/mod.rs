mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::path::Path;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::campaign::CampaignService;
use crate::core::CreativeError;

/// Largest accepted multipart body (brief plus two reference images)
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub service: CampaignService,
}

pub fn router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route(
            "/process-brief",
            post(handlers::process_brief).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/list-campaigns", get(handlers::list_campaigns))
        .fallback_service(ServeDir::new(static_dir).append_index_html_on_directories(true))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(addr: SocketAddr, state: AppState, static_dir: &Path) -> anyhow::Result<()> {
    let app = router(state, static_dir);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Creative Forge gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}

impl CreativeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CreativeError::InvalidBrief(_) | CreativeError::InvalidCampaignName => {
                StatusCode::BAD_REQUEST
            }
            CreativeError::CampaignExists(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CreativeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("An unexpected pipeline failure occurred: {}", self);
        } else {
            tracing::warn!(%status, "Request rejected: {}", self);
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::tests::{output_in, FakeConnector, MemoryStore};
    use crate::campaign::CampaignService;
    use crate::creative::testing::{png_bytes, ScriptedModel};
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "forge-test-boundary";

    const BRIEF: &str = r#"{
        "campaign_name": "Summer Sale 2024!",
        "region": "EU",
        "audience": "Students",
        "message": "Cool deals",
        "brand_colors": ["red"],
        "products": { "Soda": { "description": "Citrus soda" } }
    }"#;

    fn text_part(body: &mut Vec<u8>, name: &str, value: &str) {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }

    fn file_part(body: &mut Vec<u8>, name: &str, bytes: &[u8]) {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"ref.png\"\r\nContent-Type: image/png\r\n\r\n",
                BOUNDARY, name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    fn multipart_request(mut body: Vec<u8>) -> Request<Body> {
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        Request::builder()
            .method("POST")
            .uri("/process-brief")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn app(dir: &Path, connector: Arc<FakeConnector>) -> Router {
        let state = AppState {
            service: CampaignService::new(connector, output_in(dir)),
        };
        router(state, &dir.join("frontend"))
    }

    #[tokio::test]
    async fn processes_a_brief() {
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(FakeConnector::new(MemoryStore::default(), ScriptedModel::default()));

        let mut body = Vec::new();
        text_part(&mut body, "brief_data", BRIEF);
        file_part(&mut body, "base_image_1", &png_bytes(4, 4));
        text_part(&mut body, "base_image_desc_1", "brand logo");
        // file without a description is ignored
        file_part(&mut body, "base_image_2", &png_bytes(4, 4));

        let response = app(dir.path(), connector.clone())
            .oneshot(multipart_request(body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["message"], "Brief processed successfully.");
        assert_eq!(json["image_urls"].as_array().unwrap().len(), 3);
        for call in connector.model.calls() {
            assert_eq!(call.references, vec!["brand logo".to_string()]);
        }
    }

    #[tokio::test]
    async fn invalid_brief_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(FakeConnector::new(MemoryStore::default(), ScriptedModel::default()));

        let mut body = Vec::new();
        text_part(&mut body, "brief_data", r#"{"campaign_name": "x"}"#);
        let response = app(dir.path(), connector.clone())
            .oneshot(multipart_request(body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert!(json["detail"].as_str().unwrap().starts_with("Invalid brief format"));
        assert!(connector.model.calls().is_empty());
    }

    #[tokio::test]
    async fn unusable_campaign_name_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(FakeConnector::new(MemoryStore::default(), ScriptedModel::default()));

        let mut body = Vec::new();
        text_part(&mut body, "brief_data", &BRIEF.replace("Summer Sale 2024!", "!!!"));
        let response = app(dir.path(), connector)
            .oneshot(multipart_request(body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_campaign_is_409() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::default();
        store.folders.lock().unwrap().insert("/Summer_Sale_2024".to_string());
        let connector = Arc::new(FakeConnector::new(store, ScriptedModel::default()));

        let mut body = Vec::new();
        text_part(&mut body, "brief_data", BRIEF);
        let response = app(dir.path(), connector.clone())
            .oneshot(multipart_request(body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = json_body(response).await;
        assert!(json["detail"].as_str().unwrap().contains("already exists"));
        assert!(connector.model.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_storage_config_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let mut connector = FakeConnector::new(MemoryStore::default(), ScriptedModel::default());
        connector.store = None;
        let connector = Arc::new(connector);

        let request = Request::builder()
            .uri("/list-campaigns")
            .body(Body::empty())
            .unwrap();
        let response = app(dir.path(), connector).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(response).await;
        assert_eq!(json["detail"], "Dropbox environment variables are not configured.");
    }

    #[test]
    fn setup_errors_map_to_500() {
        assert_eq!(
            CreativeError::MissingConfig("GEMINI_IMG_MODEL").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            CreativeError::ProbeFailed { model: "m".into(), message: "401".into() }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
