//! Request handlers.

use super::error::ApiError;
use super::AppState;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::response::Html;
use axum::Json;
use fable_core::{CaptionRecord, ImageInput, PipelineError};
use serde_json::json;
use std::sync::Arc;

const INDEX_HTML: &str = include_str!("../../assets/index.html");

/// Serve the upload page.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Liveness probe; also reports whether the narrative stage is configured.
pub async fn healthz(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let enhancer = if state.pipeline.enhancer_available().await {
        "ready"
    } else {
        "unconfigured"
    };
    Json(json!({
        "status": "ok",
        "service": "fable",
        "version": fable_core::VERSION,
        "enhancer": enhancer,
    }))
}

/// Caption an uploaded image.
///
/// Expects a multipart form with a `file` field; an optional `enhance`
/// field set to `false` or `0` skips the narrative stage.
pub async fn caption(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<CaptionRecord>, ApiError> {
    let mut image: Option<ImageInput> = None;
    let mut enhance = true;

    while let Some(field) = multipart.next_field().await.map_err(bad_upload)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let content_type = field.content_type().map(str::to_string);
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(bad_upload)?;

                if let Some(ct) = &content_type {
                    if !ct.starts_with("image/") {
                        return Err(ApiError(PipelineError::InvalidImage {
                            message: format!("Unsupported content type: {ct}"),
                        }));
                    }
                }

                let mut input = ImageInput::new(bytes.to_vec());
                if let Some(hint) = content_type.or(file_name) {
                    input = input.with_hint(hint);
                }
                image = Some(input);
            }
            "enhance" => {
                let value = field.text().await.map_err(bad_upload)?;
                enhance = !matches!(value.trim(), "false" | "0");
            }
            _ => {}
        }
    }

    let image = image.ok_or_else(|| {
        ApiError(PipelineError::InvalidImage {
            message: "Missing 'file' field in upload".to_string(),
        })
    })?;

    let record = state.pipeline.run_with(&image, enhance).await?;
    Ok(Json(record))
}

fn bad_upload(e: MultipartError) -> ApiError {
    ApiError(PipelineError::InvalidImage {
        message: format!("Malformed upload: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::router;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use fable_core::config::EnhancerConfig;
    use fable_core::enhancer::{
        NarrativeEnhancer, NarrativeProvider, NarrativeRequest, NarrativeResponse,
    };
    use fable_core::{CaptionPipeline, Captioner, LiteralCaption};
    use http_body_util::BodyExt;
    use tower::util::ServiceExt;

    const BOUNDARY: &str = "fable-test-boundary";

    struct StubCaptioner;

    #[async_trait]
    impl Captioner for StubCaptioner {
        fn name(&self) -> &str {
            "stub"
        }

        async fn caption(&self, _image: &ImageInput) -> Result<LiteralCaption, PipelineError> {
            Ok(LiteralCaption {
                text: "a dog running on the beach".to_string(),
                model: "stub-blip".to_string(),
                latency_ms: 5,
            })
        }
    }

    struct StubProvider {
        fail: bool,
    }

    #[async_trait]
    impl NarrativeProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn is_available(&self) -> bool {
            !self.fail
        }

        async fn generate(
            &self,
            _request: &NarrativeRequest,
        ) -> Result<NarrativeResponse, PipelineError> {
            if self.fail {
                return Err(PipelineError::CredentialMissing {
                    message: "No Gemini API key configured".to_string(),
                });
            }
            Ok(NarrativeResponse {
                text: "A dog bounds across golden sand under a wide sky.".to_string(),
                model: "stub-gemini".to_string(),
                tokens_used: None,
                latency_ms: 7,
            })
        }
    }

    fn test_router(fail_enhancer: bool) -> axum::Router {
        let enhancer = NarrativeEnhancer::new(
            Box::new(StubProvider {
                fail: fail_enhancer,
            }),
            EnhancerConfig::default(),
        );
        let pipeline = CaptionPipeline::new(
            Arc::new(StubCaptioner),
            Arc::new(enhancer),
            true,
        );
        router(Arc::new(AppState {
            pipeline,
            max_upload_mb: 25,
        }))
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    /// Build a multipart POST; `content_type` of `None` means a plain
    /// text field (no filename).
    fn caption_request(parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
        let mut body = Vec::new();
        for (name, content_type, data) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            if let Some(ct) = content_type {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"upload.png\"\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(format!("Content-Type: {ct}\r\n\r\n").as_bytes());
            } else {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
            }
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/caption")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_index_serves_upload_page() {
        let response = test_router(false).oneshot(get_request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("Fable"));
    }

    #[tokio::test]
    async fn test_healthz_reports_enhancer_state() {
        let response = test_router(false)
            .oneshot(get_request("/healthz"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["enhancer"], "ready");
    }

    #[tokio::test]
    async fn test_caption_returns_both_captions() {
        let request = caption_request(&[("file", Some("image/png"), b"fake-png-bytes")]);
        let response = test_router(false).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["literal"]["text"], "a dog running on the beach");
        assert!(body["narrative"]["text"]
            .as_str()
            .unwrap()
            .contains("dog"));
    }

    #[tokio::test]
    async fn test_caption_enhance_false_omits_narrative() {
        let request = caption_request(&[
            ("file", Some("image/png"), b"fake-png-bytes"),
            ("enhance", None, b"false"),
        ]);
        let response = test_router(false).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["literal"]["text"], "a dog running on the beach");
        assert!(body.get("narrative").is_none());
    }

    #[tokio::test]
    async fn test_caption_missing_image_field() {
        let request = caption_request(&[("enhance", None, b"true")]);
        let response = test_router(false).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["error"]["kind"], "invalid_image");
    }

    #[tokio::test]
    async fn test_caption_rejects_non_image_content_type() {
        let request = caption_request(&[("file", Some("text/plain"), b"hello")]);
        let response = test_router(false).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Unsupported content type"));
    }

    #[tokio::test]
    async fn test_caption_maps_credential_missing_to_503() {
        let request = caption_request(&[("file", Some("image/png"), b"fake-png-bytes")]);
        let response = test_router(true).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = json_body(response).await;
        assert_eq!(body["error"]["kind"], "credential_missing");
    }
}
