//! HTTP inbound adapter.
//!
//! Queue management for operators and the MCP tool interface for agents, both
//! thin layers over the [`ControlPlane`].

pub mod auth;
pub mod mcp;
pub mod queue;
pub mod response;
pub mod tools;

use crate::application::ControlPlane;
use auth::AuthToken;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub control: ControlPlane,
    pub auth: AuthToken,
}

impl AppState {
    pub fn new(control: ControlPlane, auth: AuthToken) -> Self {
        Self { control, auth }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/status", get(queue::status))
        .route("/queue", get(queue::list))
        .route("/queue/add", post(queue::add))
        .route("/queue/priority", post(queue::priority))
        .route("/queue/clear", post(queue::clear))
        .route("/stream/interrupt", post(queue::interrupt))
        .route("/", post(mcp::rpc))
        .route("/mcp/tools", get(mcp::list_tools))
        .route("/mcp/call", post(mcp::call_tool))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ProcessHandle;
    use crate::domain::{MediaItem, Playlist};
    use crate::ports::duration::MockDurationProvider;
    use crate::ports::process::MockProcessLifecycle;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct Harness {
        app: Router,
        playlist: Arc<Playlist>,
        process: Arc<ProcessHandle>,
    }

    fn harness(token: Option<&str>, lifecycle: MockProcessLifecycle) -> Harness {
        let mut durations = MockDurationProvider::new();
        durations
            .expect_resolve()
            .returning(|item| if item.as_str().ends_with(".mp4") { 93.5 } else { 0.0 });

        let playlist = Arc::new(Playlist::new());
        let process = Arc::new(ProcessHandle::new(Arc::new(lifecycle), None));
        let control = ControlPlane::new(
            playlist.clone(),
            process.clone(),
            Arc::new(durations),
            MediaItem::from("videos/News_Intro.mp4"),
        );
        let app = router(AppState::new(
            control,
            AuthToken::new(token.map(str::to_string)),
        ));
        Harness {
            app,
            playlist,
            process,
        }
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if body.is_some() {
            request = request.header(header::CONTENT_TYPE, "application/json");
        }
        let request = request
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_status_and_queue_are_public() {
        let h = harness(Some("s3cret"), MockProcessLifecycle::new());
        h.playlist.push_back("a.mp4".into());

        let (status, body) = send(&h.app, Method::GET, "/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "status": "running", "server": "mychannel", "fallback_video": "videos/News_Intro.mp4" })
        );

        let (status, body) = send(&h.app, Method::GET, "/queue", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "queue": ["a.mp4"], "size": 1 }));
    }

    #[tokio::test]
    async fn test_add_requires_token() {
        let h = harness(Some("s3cret"), MockProcessLifecycle::new());

        let (status, body) = send(&h.app, Method::POST, "/queue/add?path=a.mp4", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "status": "error", "message": "Authentication required" }));
        assert!(h.playlist.is_empty());

        let (status, body) = send(
            &h.app,
            Method::POST,
            "/queue/add?url=https%3A%2F%2Fyoutu.be%2Fabc&token=s3cret",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["item"], "https://youtu.be/abc");
        assert_eq!(h.playlist.snapshot(), vec![MediaItem::from("https://youtu.be/abc")]);
    }

    #[tokio::test]
    async fn test_bearer_header_is_accepted() {
        let h = harness(Some("s3cret"), MockProcessLifecycle::new());
        let request = Request::builder()
            .method(Method::POST)
            .uri("/queue/clear")
            .header(header::AUTHORIZATION, "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        h.playlist.push_back("a.mp4".into());

        let response = h.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(h.playlist.is_empty());
    }

    #[tokio::test]
    async fn test_missing_source_is_bad_request() {
        let h = harness(None, MockProcessLifecycle::new());
        let (status, body) = send(&h.app, Method::POST, "/queue/add", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Missing url or path parameter");
    }

    #[tokio::test(start_paused = true)]
    async fn test_priority_interrupts_current_stream() {
        let mut lifecycle = MockProcessLifecycle::new();
        lifecycle.expect_graceful_stop().times(1).returning(|_| Ok(()));
        lifecycle.expect_is_alive().returning(|_| false);
        let h = harness(None, lifecycle);
        h.playlist.push_back("a.mp4".into());
        let id = h.process.begin_generation("a.mp4".into());
        h.process.record_process_id(id, 500);

        let (status, body) = send(&h.app, Method::POST, "/queue/priority?path=breaking.mp4", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["item"], "breaking.mp4");
        assert_eq!(h.playlist.pop_front(), Some(MediaItem::from("breaking.mp4")));
        assert!(h.process.should_terminate());
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let h = harness(Some("s3cret"), MockProcessLifecycle::new());
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/queue/add")
            .header(header::ORIGIN, "https://dashboard.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = h.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[tokio::test]
    async fn test_rpc_initialize_and_list() {
        let h = harness(Some("s3cret"), MockProcessLifecycle::new());

        let (_, body) = send(
            &h.app,
            Method::POST,
            "/",
            Some(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#),
        )
        .await;
        assert_eq!(body["id"], 1);
        assert_eq!(body["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(body["result"]["serverInfo"]["name"], "mychannel");

        let (_, body) = send(
            &h.app,
            Method::POST,
            "/",
            Some(r#"{"jsonrpc":"2.0","id":"list","method":"tools/list"}"#),
        )
        .await;
        assert_eq!(body["id"], "list");
        assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_rpc_errors() {
        let h = harness(Some("s3cret"), MockProcessLifecycle::new());

        let (_, body) = send(&h.app, Method::POST, "/", Some("{not json")).await;
        assert_eq!(body["id"], Value::Null);
        assert_eq!(body["error"]["code"], -32700);

        let (_, body) = send(
            &h.app,
            Method::POST,
            "/",
            Some(r#"{"jsonrpc":"2.0","id":2,"method":"resources/list"}"#),
        )
        .await;
        assert_eq!(body["error"]["code"], -32601);

        let (_, body) = send(
            &h.app,
            Method::POST,
            "/",
            Some(r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"clear_streaming_queue"}}"#),
        )
        .await;
        assert_eq!(body["error"]["code"], -32001);

        let (_, body) = send(
            &h.app,
            Method::POST,
            "/?token=s3cret",
            Some(r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"launch_rocket"}}"#),
        )
        .await;
        assert_eq!(body["error"]["code"], -32601);
        assert_eq!(body["error"]["message"], "Tool not found: launch_rocket");
    }

    #[tokio::test]
    async fn test_rpc_notification_has_no_body() {
        let h = harness(None, MockProcessLifecycle::new());
        let (status, body) = send(
            &h.app,
            Method::POST,
            "/",
            Some(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body, Value::Null);
    }

    #[tokio::test]
    async fn test_rpc_tool_call_wraps_result_as_text() {
        let h = harness(None, MockProcessLifecycle::new());
        let (_, body) = send(
            &h.app,
            Method::POST,
            "/",
            Some(
                r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"add_video_to_queue","arguments":{"source":"clip.mp4","position":"front"}}}"#,
            ),
        )
        .await;

        let content = &body["result"]["content"][0];
        assert_eq!(content["type"], "text");
        let inner: Value = serde_json::from_str(content["text"].as_str().unwrap()).unwrap();
        assert_eq!(
            inner,
            json!({ "status": "success", "result": "Video added to queue: clip.mp4" })
        );
        assert_eq!(h.playlist.snapshot(), vec![MediaItem::from("clip.mp4")]);
    }

    #[tokio::test]
    async fn test_plain_tool_routes() {
        let h = harness(Some("s3cret"), MockProcessLifecycle::new());

        let (status, body) = send(&h.app, Method::GET, "/mcp/tools", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tools"].as_array().unwrap().len(), 8);

        let call = r#"{"tool":"validate_video_source","params":{"source":"clip.mp4"}}"#;
        let (status, _) = send(&h.app, Method::POST, "/mcp/call", Some(call)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(&h.app, Method::POST, "/mcp/call?token=s3cret", Some(call)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["result"]["is_valid"], true);
        assert_eq!(body["result"]["source_type"], "local_file");
        assert_eq!(body["result"]["duration"], 93.5);

        let (_, body) = send(
            &h.app,
            Method::POST,
            "/mcp/call?token=s3cret",
            Some(r#"{"tool":"get_video_duration","params":{}}"#),
        )
        .await;
        assert_eq!(
            body,
            json!({ "status": "error", "message": "Missing required parameter: source" })
        );

        let (_, body) = send(
            &h.app,
            Method::POST,
            "/mcp/call?token=s3cret",
            Some(r#"{"tool":"nope"}"#),
        )
        .await;
        assert_eq!(body["message"], "Unknown tool: nope");
    }

    #[tokio::test]
    async fn test_stream_status_tool() {
        let h = harness(None, MockProcessLifecycle::new());
        h.playlist.push_back("a.mp4".into());
        h.process.begin_generation("b.mp4".into());

        let (_, body) = send(
            &h.app,
            Method::POST,
            "/mcp/call",
            Some(r#"{"tool":"get_stream_status"}"#),
        )
        .await;
        let result = &body["result"];
        assert_eq!(result["is_streaming"], true);
        assert_eq!(result["queue_size"], 1);
        assert_eq!(result["now_playing"], "b.mp4");
        assert_eq!(result["server_status"], "running");
    }
}
