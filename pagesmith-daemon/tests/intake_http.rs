use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use pagesmith_core::NotificationPayload;
use pagesmith_daemon::{build_router, AppState};
use pagesmith_generator::TemplateGenerator;
use pagesmith_pipeline::{
    CallbackTransport, HostingOp, InMemoryHosting, Pipeline, PipelineConfig, TransportError,
};

const SECRET: &str = "s3cret";

#[derive(Default)]
struct Callback {
    received: Mutex<Vec<NotificationPayload>>,
}

#[async_trait]
impl CallbackTransport for Callback {
    async fn post(&self, _url: &str, payload: &NotificationPayload) -> Result<u16, TransportError> {
        self.received.lock().unwrap().push(payload.clone());
        Ok(200)
    }
}

struct Harness {
    app: Router,
    hosting: Arc<InMemoryHosting>,
    callback: Arc<Callback>,
}

fn harness() -> Harness {
    let hosting = Arc::new(InMemoryHosting::new("octo"));
    let callback = Arc::new(Callback::default());
    let pipeline = Pipeline::new(
        Arc::new(TemplateGenerator::new(None, "octo").unwrap()),
        hosting.clone(),
        callback.clone(),
        PipelineConfig::default(),
    );
    let app = build_router(AppState::new(SECRET, Arc::new(pipeline)));
    Harness {
        app,
        hosting,
        callback,
    }
}

fn deploy_body(secret: &str) -> Value {
    json!({
        "secret": secret,
        "email": "student@example.com",
        "task": "quiz",
        "round": 1,
        "nonce": "n-7",
        "brief": "Build a one-question quiz.",
        "checks": ["Button #submit exists"],
        "evaluation_url": "https://eval.example.com/notify",
        "attachments": []
    })
}

fn post_deploy(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/deploy")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn read_json(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_running() {
    let h = harness();
    let resp = h
        .app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(read_json(resp).await["status"], "running");
}

#[tokio::test(start_paused = true)]
async fn valid_secret_is_accepted_and_pipeline_runs_in_background() {
    let h = harness();
    let resp = h
        .app
        .oneshot(post_deploy(deploy_body(SECRET).to_string()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert_eq!(body["status"], "accepted");

    // Past the readiness wait the callback has fired.
    tokio::time::sleep(Duration::from_secs(121)).await;
    let received = h.callback.received.lock().unwrap().clone();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].nonce, "n-7");
    assert!(received[0].repo_url.ends_with("/quiz-r1"));
    assert_eq!(h.hosting.count(HostingOp::CreateRepository), 1);
}

#[tokio::test(start_paused = true)]
async fn wrong_secret_is_forbidden_and_starts_nothing() {
    let h = harness();
    let resp = h
        .app
        .oneshot(post_deploy(deploy_body("guess").to_string()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(read_json(resp).await["error"].is_string());

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert!(h.hosting.calls().is_empty());
    assert!(h.callback.received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_json_is_a_bad_request() {
    let h = harness();
    let resp = h.app.oneshot(post_deploy("{not json".to_string())).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(read_json(resp).await["error"].is_string());
    assert!(h.hosting.calls().is_empty());
}

#[tokio::test]
async fn missing_required_field_is_a_bad_request() {
    let h = harness();
    let mut body = deploy_body(SECRET);
    body.as_object_mut().unwrap().remove("evaluation_url");
    let resp = h.app.oneshot(post_deploy(body.to_string())).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn absent_checks_and_attachments_are_accepted() {
    let h = harness();
    let mut body = deploy_body(SECRET);
    let obj = body.as_object_mut().unwrap();
    obj.remove("checks");
    obj.remove("attachments");
    let resp = h.app.oneshot(post_deploy(body.to_string())).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
