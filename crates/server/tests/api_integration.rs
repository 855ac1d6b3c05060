//! API integration tests against an in-process router with mock
//! collaborators behind the orchestrator.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use groupci_core::{
    load_config_from_str,
    testing::{fixtures, MockBuildHost, MockGerritClient},
    BuildCause, BuildKey, BuildOrchestrator, OrchestratorConfig, SubmitGroup, CAUSE_PARAMETER,
};
use groupci_server::{api::create_router, state::AppState};

const CONFIG_TOML: &str = r#"
[server]
host = "127.0.0.1"
port = 8080

[gerrit]
url = "https://gerrit.example.com"
username = "builder"
http_password = "secret"

[jenkins]
url = "https://jenkins.example.com"
username = "builder"
api_token = "token"

[[jenkins.jobs]]
name = "api-verify"
git_urls = ["https://gerrit.example.com/a/core/api"]
"#;

struct TestFixture {
    router: Router,
    gerrit: Arc<MockGerritClient>,
    build_host: Arc<MockBuildHost>,
    orchestrator: Arc<BuildOrchestrator>,
}

impl TestFixture {
    fn new() -> Self {
        let config = load_config_from_str(CONFIG_TOML).unwrap();
        let gerrit = Arc::new(MockGerritClient::new());
        let build_host = Arc::new(MockBuildHost::new());
        let orchestrator = Arc::new(BuildOrchestrator::new(
            OrchestratorConfig::default(),
            Arc::clone(&gerrit) as Arc<dyn groupci_core::GerritClient>,
            Arc::clone(&build_host) as Arc<dyn groupci_core::BuildHost>,
        ));
        let state = Arc::new(AppState::new(config, Arc::clone(&orchestrator)));
        Self {
            router: create_router(state),
            gerrit,
            build_host,
            orchestrator,
        }
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        Self::split(response).await
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::post(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        Self::split(response).await
    }

    async fn split(response: axum::response::Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }
}

fn started_notification() -> Value {
    let cause = BuildCause {
        group: SubmitGroup::new([fixtures::change(5, 1)]),
        build: BuildKey::new("core/api", "main"),
    };
    json!({
        "name": "api-verify",
        "build": {
            "full_url": "http://jenkins/job/api-verify/7/",
            "phase": "STARTED",
            "parameters": {
                CAUSE_PARAMETER: serde_json::to_string(&cause).unwrap(),
            }
        }
    })
}

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new();
    let (status, body) = fixture.get("/api/v1/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_config_is_sanitized() {
    let fixture = TestFixture::new();
    let (status, body) = fixture.get("/api/v1/config").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["gerrit"]["url"], "https://gerrit.example.com");
    assert_eq!(body["gerrit"]["http_password_configured"], true);
    assert_eq!(body["jenkins"]["api_token_configured"], true);

    let raw = body.to_string();
    assert!(!raw.contains("secret"));
}

#[tokio::test]
async fn test_status_reflects_tracked_groups() {
    let fixture = TestFixture::new();

    let (status, body) = fixture.get("/api/v1/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tracked_groups"], 0);
    assert_eq!(body["running"], false);

    fixture.gerrit.add_open_change(fixtures::change(5, 1)).await;
    fixture
        .gerrit
        .set_bundle(
            5,
            1,
            vec![("core/api".to_string(), fixtures::bundle_text("main"))],
        )
        .await;
    fixture
        .build_host
        .add_job(fixtures::job_for_project("api-verify", "core/api"))
        .await;
    fixture.orchestrator.refresh_now().await.unwrap();

    let (_, body) = fixture.get("/api/v1/status").await;
    assert_eq!(body["tracked_groups"], 1);
    assert!(body["last_refresh"].is_string());
}

#[tokio::test]
async fn test_manual_refresh_is_accepted() {
    let fixture = TestFixture::new();
    let (status, body) = fixture.post("/api/v1/refresh", json!({})).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["message"], "refresh queued");
}

#[tokio::test]
async fn test_gerrit_hook_accepts_allowed_event() {
    let fixture = TestFixture::new();
    let (status, _) = fixture
        .post("/hooks/gerrit", json!({"type": "patchset-created"}))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_build_hook_routes_started_notification() {
    let fixture = TestFixture::new();

    // Without a tracked group, a started run is stale and gets cancelled.
    let (status, _) = fixture.post("/hooks/build", started_notification()).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(
        fixture.build_host.cancelled_builds().await,
        vec!["http://jenkins/job/api-verify/7/"]
    );
}

#[tokio::test]
async fn test_build_hook_ignores_runs_without_cause() {
    let fixture = TestFixture::new();
    let notification = json!({
        "name": "api-verify",
        "build": {
            "full_url": "http://jenkins/job/api-verify/8/",
            "phase": "STARTED",
            "parameters": {}
        }
    });

    let (status, _) = fixture.post("/hooks/build", notification).await;
    assert_eq!(status, StatusCode::OK);
    assert!(fixture.build_host.cancelled_builds().await.is_empty());
}

#[tokio::test]
async fn test_full_cycle_through_webhooks() {
    let fixture = TestFixture::new();
    fixture.gerrit.add_open_change(fixtures::change(5, 1)).await;
    fixture
        .gerrit
        .set_bundle(
            5,
            1,
            vec![("core/api".to_string(), fixtures::bundle_text("main"))],
        )
        .await;
    fixture
        .build_host
        .add_job(fixtures::job_for_project("api-verify", "core/api"))
        .await;

    assert_eq!(fixture.orchestrator.refresh_now().await.unwrap(), 1);

    fixture.post("/hooks/build", started_notification()).await;

    let mut finalized = started_notification();
    finalized["build"]["phase"] = json!("FINALIZED");
    finalized["build"]["status"] = json!("SUCCESS");
    fixture.post("/hooks/build", finalized).await;

    let reviews = fixture.gerrit.posted_reviews().await;
    assert_eq!(reviews.len(), 2);
    assert_eq!(reviews[0].score, 0);
    assert_eq!(reviews[1].score, 1);
    assert!(reviews[1].notify);

    let (_, body) = fixture.get("/api/v1/status").await;
    assert_eq!(body["tracked_groups"], 0);
}
