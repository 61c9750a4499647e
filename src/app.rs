use std::net::SocketAddr;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use time::OffsetDateTime;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::state::AppState;
use crate::{auth, query};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(query::router())
                .route("/health", get(health)),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

/// `status` is declared empty so `on_response` can fill it in.
fn request_span(req: &axum::http::Request<axum::body::Body>) -> tracing::Span {
    let method = req.method().clone();
    let uri = req.uri().clone();
    tracing::info_span!(
        "http_request",
        %method,
        uri = %uri,
        status = tracing::field::Empty
    )
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: state.config.service_name.clone(),
        timestamp: OffsetDateTime::now_utc(),
    })
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod api_tests {
    use std::sync::{atomic::Ordering, Arc};

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::memory::InMemoryCredentialStore;
    use crate::query::services::fakes::{CountingEngine, FixedContext};

    struct Harness {
        app: Router,
        store: Arc<InMemoryCredentialStore>,
        engine: Arc<CountingEngine>,
    }

    fn harness() -> Harness {
        let base = AppState::fake();
        let store = Arc::new(InMemoryCredentialStore::default());
        let engine = Arc::new(CountingEngine::default());
        let state = AppState::from_parts(
            base.config,
            store.clone(),
            Arc::new(FixedContext(json!({"sites": ["north pit"]}))),
            engine.clone(),
        );
        Harness {
            app: build_app(state),
            store,
            engine,
        }
    }

    async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn post_raw(app: &Router, uri: &str, body: &'static str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).expect("error body is JSON");
        (status, json)
    }

    async fn register_alice(app: &Router) -> String {
        let (status, body) = post_json(
            app,
            "/api/auth/register",
            json!({"username": "alice", "email": "a@x.com", "full_name": "Alice A"}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["password"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn register_then_login_round_trip() {
        let h = harness();
        let (status, body) = post_json(
            &h.app,
            "/api/auth/register",
            json!({"username": "alice", "email": "a@x.com", "full_name": "Alice A"}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "User registered successfully");
        assert!(body["warning"].as_str().unwrap().contains("will not be shown again"));
        let password = body["password"].as_str().unwrap();
        assert_eq!(password.len(), 12);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));

        let (status, body) = post_json(&h.app, "/api/auth/login", json!({"password": password})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Login successful");
        assert_eq!(body["user"]["username"], "alice");
        assert_eq!(body["user"]["email"], "a@x.com");
        assert_eq!(body["user"]["full_name"], "Alice A");
        assert_eq!(body["user"]["role"], "user");
        assert_eq!(
            body["user"]["id"].as_str().unwrap(),
            h.store.snapshot()[0].id.to_string()
        );

        let (status, body) = post_json(&h.app, "/api/auth/login", json!({"password": "wrong"})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid password");
    }

    #[tokio::test]
    async fn register_rejects_missing_or_blank_fields() {
        let h = harness();
        for body in [
            json!({"username": "alice", "email": "a@x.com"}),
            json!({"username": "", "email": "a@x.com", "full_name": "Alice A"}),
            json!({"username": "alice", "email": "   ", "full_name": "Alice A"}),
            json!({}),
        ] {
            let (status, resp) = post_json(&h.app, "/api/auth/register", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(resp["message"], "Missing required fields");
        }
        assert!(h.store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let h = harness();
        let password = register_alice(&h.app).await;

        let (status, body) = post_json(
            &h.app,
            "/api/auth/register",
            json!({"username": "alice-2", "email": "a@x.com", "full_name": "Someone"}),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Username or email already exists");

        assert_eq!(h.store.snapshot().len(), 1);
        let (status, _) = post_json(&h.app, "/api/auth/login", json!({"password": password})).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn login_requires_password() {
        let h = harness();
        for body in [json!({}), json!({"password": ""})] {
            let (status, resp) = post_json(&h.app, "/api/auth/login", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(resp["message"], "Password is required");
        }
    }

    #[tokio::test]
    async fn responses_never_contain_password_hash() {
        let h = harness();
        let password = register_alice(&h.app).await;
        let hash = h.store.snapshot()[0].password_hash.clone();

        for (uri, pw) in [
            ("/api/auth/login", password.as_str()),
            ("/api/auth/login", "nope"),
            ("/api/auth/profile", password.as_str()),
            ("/api/auth/profile", "nope"),
        ] {
            let (_, body) = post_json(&h.app, uri, json!({"password": pw})).await;
            let text = body.to_string();
            assert!(!text.contains("password_hash"));
            assert!(!text.contains(&hash));
        }
    }

    #[tokio::test]
    async fn profile_returns_record_without_touching_last_login() {
        let h = harness();
        let password = register_alice(&h.app).await;

        let (status, body) = post_json(&h.app, "/api/auth/profile", json!({"password": password})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["username"], "alice");
        assert!(body["user"]["created_at"].is_string());
        assert!(body["user"]["last_login"].is_null());
        assert!(h.store.snapshot()[0].last_login.is_none());

        post_json(&h.app, "/api/auth/login", json!({"password": password})).await;
        let (_, body) = post_json(&h.app, "/api/auth/profile", json!({"password": password})).await;
        assert!(body["user"]["last_login"].is_string());

        let (status, _) = post_json(&h.app, "/api/auth/profile", json!({"password": "bad"})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn storage_outage_is_a_server_error() {
        let h = harness();
        h.store.set_unavailable(true);

        let (status, body) = post_json(
            &h.app,
            "/api/auth/register",
            json!({"username": "alice", "email": "a@x.com", "full_name": "Alice A"}),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Database connection failed");

        let (status, _) = post_json(&h.app, "/api/auth/login", json!({"password": "x"})).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn blank_query_is_rejected_before_engine() {
        let h = harness();
        for body in [json!({"query": ""}), json!({"query": "   "}), json!({})] {
            let (status, resp) = post_json(&h.app, "/api/query", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(resp["message"], "Query is required");
        }
        assert_eq!(h.engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn query_is_forwarded_with_context() {
        let h = harness();
        let (status, body) = post_json(&h.app, "/api/query", json!({"query": "which pit is idle?"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["query"], "which pit is idle?");
        assert_eq!(body["response"], "echo: which pit is idle?");
        assert_eq!(body["query_type"], "general");
        assert_eq!(body["data"]["sites"][0], "north pit");
        assert!(body["timestamp"].is_string());
        assert_eq!(h.engine.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn undecodable_bodies_are_json_bad_requests() {
        let h = harness();
        let cases = [
            ("/api/auth/login", r#"{"password": 12345}"#),
            ("/api/auth/profile", r#"{"password": ["x"]}"#),
            ("/api/auth/register", r#"{"username": 1, "email": "a@x.com", "full_name": "A"}"#),
            ("/api/query", "not json"),
            ("/api/query", r#"{"query": 42}"#),
        ];
        for (uri, body) in cases {
            let (status, resp) = post_raw(&h.app, uri, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri} {body}");
            assert!(resp["message"].is_string(), "{uri} {body}");
        }
        assert!(h.store.snapshot().is_empty());
        assert_eq!(h.engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn register_accepts_any_non_empty_email() {
        let h = harness();
        let (status, body) = post_json(
            &h.app,
            "/api/auth/register",
            json!({"username": "bob", "email": "bob@localhost", "full_name": "Bob"}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["password"].as_str().unwrap().len(), 12);
    }

    #[test]
    fn request_span_declares_status_field() {
        let req = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();
        let span = request_span(&req);
        let fields = span.metadata().expect("span metadata").fields();
        assert!(fields.field("status").is_some());
        assert!(fields.field("method").is_some());
        assert!(fields.field("uri").is_some());
    }

    #[tokio::test]
    async fn health_reports_service_name() {
        let h = harness();
        let request = Request::builder()
            .method("GET")
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();
        let response = h.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "test-service");
        assert!(body["timestamp"].is_string());
    }
}
