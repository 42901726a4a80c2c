mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::{APPLICATION, CANDIDATE, REGISTRATION, TestApp, webhook_body};
use std::time::Duration;
use talent_sync::routes::create_routes;
use talent_sync::store::SyncStore;
use tower::ServiceExt;

async fn post_webhook(app: &TestApp, body: String) -> (StatusCode, serde_json::Value) {
    let response = create_routes(app.state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/webhooks/hire")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_webhook_delivery_creates_applicant() {
    let app = TestApp::start().await;
    app.mount_candidate_in_stage("BACKGROUND IN PROGRESS", 1)
        .await;

    let (status, body) = post_webhook(
        &app,
        webhook_body("APPLICATION_STATUS_CHANGE", REGISTRATION, APPLICATION),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "ack": "success" }));

    app.wait_for_notifications(1).await;

    let record = app
        .store
        .get_processed_record(CANDIDATE)
        .await
        .unwrap()
        .expect("record written");
    assert_eq!(record.system_id, 42);
    assert_eq!(record.candidate_email, "ada@example.com");

    let sent = app.notifier.sent().await;
    assert!(sent[0].succeeded);
    assert_eq!(sent[0].candidate_name, "Ada Lovelace");
}

#[tokio::test]
async fn test_duplicate_webhook_delivery_creates_once() {
    let app = TestApp::start().await;
    app.mount_candidate_in_stage("BACKGROUND IN PROGRESS", 1)
        .await;

    let body = webhook_body("APPLICATION_STATUS_CHANGE", REGISTRATION, APPLICATION);
    for _ in 0..3 {
        let (status, _) = post_webhook(&app, body.clone()).await;
        assert_eq!(status, StatusCode::OK);
    }

    app.wait_for_notifications(1).await;
    // Let the remaining deliveries run into the dedup check.
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(app.store.processed_count().await, 1);
    assert_eq!(app.notifier.sent().await.len(), 1);
}

#[tokio::test]
async fn test_other_stage_is_not_synchronized() {
    let app = TestApp::start().await;
    app.mount_candidate_in_stage("NEW", 0).await;

    let (status, _) = post_webhook(
        &app,
        webhook_body("APPLICATION_UPDATE", REGISTRATION, APPLICATION),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(app.store.processed_count().await, 0);
    assert!(app.notifier.sent().await.is_empty());
}

#[tokio::test]
async fn test_malformed_webhooks_are_acknowledged() {
    let app = TestApp::start().await;

    let bodies = vec![
        String::new(),
        "{not json".to_string(),
        r#"{"message":{"data":"@@@","messageId":"m"}}"#.to_string(),
        webhook_body("SOMETHING_ELSE", REGISTRATION, APPLICATION),
    ];

    for body in bodies {
        let (status, ack) = post_webhook(&app, body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ack["ack"], "success");
    }
}
