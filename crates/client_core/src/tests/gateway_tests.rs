use super::*;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct Recorded {
    bodies: Arc<Mutex<Vec<Value>>>,
}

async fn spawn_server(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

fn story_request(page_number: u32) -> GenerateStoryRequest {
    GenerateStoryRequest {
        story_idea: "a lost puppy".to_string(),
        user_response: (page_number > 1).then(|| "puppy finds a map".to_string()),
        page_number,
        previous_story: "Once there was a puppy.".to_string(),
    }
}

#[tokio::test]
async fn story_request_uses_camel_case_contract() {
    let recorded = Recorded::default();
    let app = Router::new()
        .route(
            "/api/generate-story",
            post(
                |State(recorded): State<Recorded>, Json(body): Json<Value>| async move {
                    recorded.bodies.lock().await.push(body);
                    Json(json!({
                        "success": true,
                        "storyText": "The puppy sniffed the map.",
                        "promptText": "Where does the map lead?",
                        "pageNumber": 2
                    }))
                },
            ),
        )
        .with_state(recorded.clone());
    let base = spawn_server(app).await;

    let gateway = HttpGenerationGateway::new(&base, None).expect("gateway");
    let story = gateway
        .generate_story(&story_request(2))
        .await
        .expect("story");
    assert_eq!(story.story_text, "The puppy sniffed the map.");
    assert_eq!(story.prompt_text, "Where does the map lead?");

    let bodies = recorded.bodies.lock().await;
    assert_eq!(bodies[0]["storyIdea"], "a lost puppy");
    assert_eq!(bodies[0]["userResponse"], "puppy finds a map");
    assert_eq!(bodies[0]["pageNumber"], 2);
    assert_eq!(bodies[0]["previousStory"], "Once there was a puppy.");
}

#[tokio::test]
async fn first_page_request_sends_null_user_response() {
    let recorded = Recorded::default();
    let app = Router::new()
        .route(
            "/api/generate-story",
            post(
                |State(recorded): State<Recorded>, Json(body): Json<Value>| async move {
                    recorded.bodies.lock().await.push(body);
                    Json(json!({ "storyText": "Once.", "promptText": "Next?" }))
                },
            ),
        )
        .with_state(recorded.clone());
    let base = spawn_server(app).await;

    let gateway = HttpGenerationGateway::new(&base, None).expect("gateway");
    gateway
        .generate_story(&story_request(1))
        .await
        .expect("story");
    assert!(recorded.bodies.lock().await[0]["userResponse"].is_null());
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let app = Router::new().route(
        "/api/generate-story",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to generate story" })),
            )
        }),
    );
    let base = spawn_server(app).await;

    let gateway = HttpGenerationGateway::new(&base, None).expect("gateway");
    let err = gateway
        .generate_story(&story_request(1))
        .await
        .expect_err("should fail");
    assert!(matches!(err, GatewayError::Status { status: 500 }));
}

#[tokio::test]
async fn blank_story_text_is_malformed() {
    let app = Router::new().route(
        "/api/generate-story",
        post(|| async { Json(json!({ "storyText": "  ", "promptText": "Next?" })) }),
    );
    let base = spawn_server(app).await;

    let gateway = HttpGenerationGateway::new(&base, None).expect("gateway");
    let err = gateway
        .generate_story(&story_request(1))
        .await
        .expect_err("should fail");
    assert!(matches!(err, GatewayError::Malformed(_)));
}

#[tokio::test]
async fn relative_image_url_is_resolved_against_gateway() {
    let app = Router::new().route(
        "/api/generate-image",
        post(|Json(body): Json<Value>| async move {
            Json(json!({
                "success": true,
                "imageUrl": format!("/images/page-{}.png", body["pageNumber"])
            }))
        }),
    );
    let base = spawn_server(app).await;

    let gateway = HttpGenerationGateway::new(&base, None).expect("gateway");
    let url = gateway
        .generate_image(&GenerateImageRequest {
            story_text: "The puppy sniffed the map.".to_string(),
            page_number: 3,
        })
        .await
        .expect("image");
    assert_eq!(url, format!("{base}/images/page-3.png"));
}

#[tokio::test]
async fn missing_image_url_is_malformed() {
    let app = Router::new().route(
        "/api/generate-image",
        post(|| async { Json(json!({ "success": true })) }),
    );
    let base = spawn_server(app).await;

    let gateway = HttpGenerationGateway::new(&base, None).expect("gateway");
    let err = gateway
        .generate_image(&GenerateImageRequest {
            story_text: "text".to_string(),
            page_number: 1,
        })
        .await
        .expect_err("should fail");
    assert!(matches!(err, GatewayError::Malformed(_)));
}

#[tokio::test]
async fn unreachable_gateway_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let gateway = HttpGenerationGateway::new(
        &format!("http://{addr}"),
        Some(std::time::Duration::from_secs(2)),
    )
    .expect("gateway");
    let err = gateway
        .generate_story(&story_request(1))
        .await
        .expect_err("should fail");
    assert!(matches!(err, GatewayError::Transport(_)));
}

#[test]
fn base_url_with_path_keeps_its_prefix() {
    let gateway = HttpGenerationGateway::new("https://stories.example.com/app", None)
        .expect("gateway");
    assert_eq!(gateway.base_url().as_str(), "https://stories.example.com/app/");
    assert_eq!(
        gateway.resolve_image_url("img/1.png").as_deref(),
        Some("https://stories.example.com/app/img/1.png")
    );
    assert_eq!(
        gateway.resolve_image_url("/img/1.png").as_deref(),
        Some("https://stories.example.com/img/1.png")
    );
    assert_eq!(
        gateway
            .resolve_image_url("https://cdn.example.com/a.png")
            .as_deref(),
        Some("https://cdn.example.com/a.png")
    );
    assert_eq!(gateway.resolve_image_url("   "), None);
}

#[test]
fn invalid_base_url_is_rejected() {
    assert!(matches!(
        HttpGenerationGateway::new("not a url", None),
        Err(GatewayError::InvalidUrl(_))
    ));
}
