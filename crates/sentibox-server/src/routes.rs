//! Route handlers: chat page, prediction endpoint, health probe.

use std::sync::Arc;

use actix_web::http::header::ContentType;
use actix_web::{HttpResponse, web};
use sentibox_ai::SentimentPipeline;
use sentibox_core::{HealthResponse, PredictRequest, PredictResponse};
use tracing::{debug, error};

use crate::error::ApiError;

/// The chat page, compiled into the binary.
pub const INDEX_HTML: &str = include_str!("../static/index.html");

/// State shared by every worker.
///
/// `pipeline` is `None` only when the server was started with missing
/// artifacts allowed; predictions then answer 503.
#[derive(Clone, Default)]
pub struct AppState {
    pub pipeline: Option<Arc<SentimentPipeline>>,
}

impl AppState {
    pub fn new(pipeline: SentimentPipeline) -> Self {
        Self {
            pipeline: Some(Arc::new(pipeline)),
        }
    }

    pub fn unloaded() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.pipeline.is_some()
    }
}

/// Register every route plus the JSON extractor config on `cfg`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    let json = web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into());

    cfg.app_data(json)
        .route("/", web::get().to(index))
        .route("/predict", web::post().to(predict))
        .route("/health", web::get().to(health));
}

async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(INDEX_HTML)
}

async fn predict(
    state: web::Data<AppState>,
    body: web::Json<PredictRequest>,
) -> Result<HttpResponse, ApiError> {
    let pipeline = state.pipeline.clone().ok_or(ApiError::NotLoaded)?;
    let text = body.into_inner().text;
    debug!(chars = text.chars().count(), "predict request");

    let prediction = web::block(move || pipeline.predict(&text))
        .await?
        .map_err(|e| {
            error!(error = %format!("{e:#}"), "prediction failed");
            ApiError::Inference(e)
        })?;

    Ok(HttpResponse::Ok().json(PredictResponse::ok(
        prediction.label,
        prediction.probability,
    )))
}

async fn health(state: web::Data<AppState>) -> HttpResponse {
    let model_loaded = state.is_loaded();
    HttpResponse::Ok().json(HealthResponse {
        status: if model_loaded { "ok" } else { "degraded" }.to_string(),
        model_loaded,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use sentibox_ai::{Classifier, Features, Vectorizer, WordVectors};
    use sentibox_core::{ERROR_LABEL, LabelPolicy};

    use super::*;

    /// Scores the first embedding component: "love" pushes up, "hate" down.
    #[derive(Default)]
    struct Lexicon {
        calls: AtomicUsize,
        fail: bool,
    }

    impl Classifier for Lexicon {
        fn predict(&self, features: &Features) -> anyhow::Result<f32> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            anyhow::ensure!(!self.fail, "session exploded");
            let v = features.to_f32();
            Ok(0.5 + 0.4 * v[0])
        }
    }

    fn pipeline(classifier: Arc<Lexicon>) -> SentimentPipeline {
        let table = WordVectors::from_entries(
            2,
            vec![
                ("love".into(), vec![1.0, 0.0]),
                ("hate".into(), vec![-1.0, 0.0]),
            ],
        )
        .unwrap();
        SentimentPipeline::new(
            Vectorizer::EmbeddingAverage(table),
            Box::new(classifier),
            LabelPolicy::Wide65_35,
        )
        .unwrap()
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .configure(configure),
            )
            .await
        };
    }

    fn post_json(body: &str) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/predict")
            .insert_header(ContentType::json())
            .set_payload(body.to_string())
    }

    #[actix_web::test]
    async fn index_serves_chat_page() {
        let app = app!(AppState::unloaded());
        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.starts_with("text/html"), "{content_type}");
        let body = test::read_body(resp).await;
        assert_eq!(body, INDEX_HTML.as_bytes());
    }

    #[actix_web::test]
    async fn positive_text() {
        let app = app!(AppState::new(pipeline(Arc::default())));
        let resp: PredictResponse =
            test::call_and_read_body_json(&app, post_json(r#"{"text":"I love this"}"#).to_request())
                .await;
        assert_eq!(resp.label, "Positive");
        assert!((resp.probability - 0.9).abs() < 1e-6);
        assert!(resp.error.is_none());
    }

    #[actix_web::test]
    async fn negative_text() {
        let app = app!(AppState::new(pipeline(Arc::default())));
        let resp: PredictResponse =
            test::call_and_read_body_json(&app, post_json(r#"{"text":"I HATE it!!"}"#).to_request())
                .await;
        assert_eq!(resp.label, "Negative");
        assert!((0.0..=1.0).contains(&resp.probability));
    }

    #[actix_web::test]
    async fn empty_and_missing_text_are_neutral() {
        let clf = Arc::new(Lexicon::default());
        let app = app!(AppState::new(pipeline(clf.clone())));

        for body in [r#"{"text":""}"#, "{}", r#"{"text":null}"#, r#"{"text":"?!? 42"}"#] {
            let req = post_json(body).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK, "{body}");
            let resp: PredictResponse = test::read_body_json(resp).await;
            assert_eq!(resp.label, "Neutral", "{body}");
            assert_eq!(resp.probability, 0.5);
        }
        assert_eq!(clf.calls.load(Ordering::SeqCst), 4);
    }

    #[actix_web::test]
    async fn malformed_json_is_bad_request() {
        let clf = Arc::new(Lexicon::default());
        let app = app!(AppState::new(pipeline(clf.clone())));

        let resp = test::call_service(&app, post_json("{not json").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: PredictResponse = test::read_body_json(resp).await;
        assert_eq!(body.label, ERROR_LABEL);
        assert_eq!(body.probability, 0.0);
        assert!(body.error.is_some());
        assert_eq!(clf.calls.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn unloaded_pipeline_is_unavailable() {
        let app = app!(AppState::unloaded());
        let resp = test::call_service(&app, post_json(r#"{"text":"hi"}"#).to_request()).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: PredictResponse = test::read_body_json(resp).await;
        assert_eq!(body.label, ERROR_LABEL);
        assert_eq!(body.error.as_deref(), Some("model not loaded"));
    }

    #[actix_web::test]
    async fn classifier_failure_is_server_error() {
        let clf = Arc::new(Lexicon {
            fail: true,
            ..Default::default()
        });
        let app = app!(AppState::new(pipeline(clf)));
        let resp = test::call_service(&app, post_json(r#"{"text":"love"}"#).to_request()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: PredictResponse = test::read_body_json(resp).await;
        assert_eq!(body.label, ERROR_LABEL);
        assert!(body.error.unwrap().contains("session exploded"));
    }

    #[actix_web::test]
    async fn health_reports_model_state() {
        let app = app!(AppState::unloaded());
        let resp: HealthResponse =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request())
                .await;
        assert_eq!(resp.status, "degraded");
        assert!(!resp.model_loaded);

        let app = app!(AppState::new(pipeline(Arc::default())));
        let resp: HealthResponse =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request())
                .await;
        assert_eq!(resp.status, "ok");
        assert!(resp.model_loaded);
    }

    #[actix_web::test]
    async fn page_is_unaffected_by_predictions() {
        let clf = Arc::new(Lexicon::default());
        let app = app!(AppState::new(pipeline(clf.clone())));

        let before = test::call_and_read_body(&app, test::TestRequest::get().uri("/").to_request()).await;
        let _: PredictResponse =
            test::call_and_read_body_json(&app, post_json(r#"{"text":"love"}"#).to_request()).await;
        let calls = clf.calls.load(Ordering::SeqCst);
        let after = test::call_and_read_body(&app, test::TestRequest::get().uri("/").to_request()).await;

        assert_eq!(before, after);
        assert_eq!(calls, 1);
        assert_eq!(clf.calls.load(Ordering::SeqCst), 1);
    }
}
