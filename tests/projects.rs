mod common;

use common::{issue_service_token, unique_channel_id, unique_platform_user_id, TestApp};
use serde_json::json;

#[tokio::test]
async fn missing_bearer_token_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .client
        .post(app.url("/api/v1/projects"))
        .json(&json!({ "name": "Launch Deck", "hub_channel_id": unique_channel_id() }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn create_and_fetch_project() {
    let app = TestApp::new().await;
    let secret = app.service_auth_secret();
    let token = issue_service_token(&secret, &unique_platform_user_id(), "test-team-projects", false);
    let channel_id = unique_channel_id();

    let create = app
        .client
        .post(app.url("/api/v1/projects"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Launch Deck", "hub_channel_id": channel_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(create.status(), 200);
    let project: serde_json::Value = create.json().await.unwrap();
    assert_eq!(project["name"], "Launch Deck");
    assert_eq!(project["hub_channel_id"], channel_id);

    let project_id = project["id"].as_str().unwrap();
    let fetched = app
        .client
        .get(app.url(&format!("/api/v1/projects/{}", project_id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(fetched.status(), 200);
}

#[tokio::test]
async fn fetching_unknown_project_is_404_with_error_code() {
    let app = TestApp::new().await;
    let secret = app.service_auth_secret();
    let token = issue_service_token(&secret, &unique_platform_user_id(), "test-team-projects-404", false);

    let response = app
        .client
        .get(app.url(&format!("/api/v1/projects/{}", uuid::Uuid::now_v7())))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "PROJECT_NOT_FOUND");
}

#[tokio::test]
async fn rebinding_a_channel_to_a_second_project_is_rejected() {
    let app = TestApp::new().await;
    let secret = app.service_auth_secret();
    let token = issue_service_token(&secret, &unique_platform_user_id(), "test-team-projects-dup", false);
    let channel_id = unique_channel_id();

    let first = app
        .client
        .post(app.url("/api/v1/projects"))
        .bearer_auth(&token)
        .json(&json!({ "name": "First", "hub_channel_id": channel_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 200);

    let second = app
        .client
        .post(app.url("/api/v1/projects"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Second", "hub_channel_id": channel_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 409);
}
