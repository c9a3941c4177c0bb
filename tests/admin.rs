mod common;

use common::{issue_service_token, unique_channel_id, unique_platform_user_id, TestApp};
use reqwest::multipart;
use serde_json::json;

#[tokio::test]
async fn secure_delete_is_refused_without_admin_claim() {
    let app = TestApp::new().await;
    let secret = app.service_auth_secret();
    let token = issue_service_token(&secret, &unique_platform_user_id(), "test-team-admin-gate", false);

    let response = app
        .client
        .post(app.url(&format!("/api/v1/admin/content/{}/secure-delete", "a".repeat(64))))
        .bearer_auth(&token)
        .json(&json!({ "reason": "cleanup" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn force_release_requires_admin_claim() {
    let app = TestApp::new().await;
    let secret = app.service_auth_secret();
    let owner = issue_service_token(&secret, &unique_platform_user_id(), "test-team-force", false);
    let non_admin = issue_service_token(&secret, &unique_platform_user_id(), "test-team-force", false);
    let admin = issue_service_token(&secret, &unique_platform_user_id(), "test-team-force", true);

    let project = app
        .client
        .post(app.url("/api/v1/projects"))
        .bearer_auth(&owner)
        .json(&json!({ "name": "Force Release", "hub_channel_id": unique_channel_id() }))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    let project_id = project["id"].as_str().unwrap();

    let file = app
        .client
        .post(app.url(&format!("/api/v1/projects/{}/files", project_id)))
        .bearer_auth(&owner)
        .multipart(
            multipart::Form::new().text("name", "stuck.ai").part("content", multipart::Part::bytes(b"data".to_vec())),
        )
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    let file_id = file["id"].as_str().unwrap();

    app.client.post(app.url(&format!("/api/v1/files/{}/checkout", file_id))).bearer_auth(&owner).send().await.unwrap();

    let denied = app
        .client
        .delete(app.url(&format!("/api/v1/files/{}/lock?force=true", file_id)))
        .bearer_auth(&non_admin)
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), 403);

    let allowed = app
        .client
        .delete(app.url(&format!("/api/v1/files/{}/lock?force=true", file_id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(allowed.status(), 204);
}

#[tokio::test]
async fn compliance_report_counts_events_in_range() {
    let app = TestApp::new().await;
    let secret = app.service_auth_secret();
    let token = issue_service_token(&secret, &unique_platform_user_id(), "test-team-compliance", false);

    let project = app
        .client
        .post(app.url("/api/v1/projects"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Compliance", "hub_channel_id": unique_channel_id() }))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    let project_id = project["id"].as_str().unwrap();

    app.client
        .post(app.url(&format!("/api/v1/projects/{}/files", project_id)))
        .bearer_auth(&token)
        .multipart(
            multipart::Form::new().text("name", "report.txt").part("content", multipart::Part::bytes(b"data".to_vec())),
        )
        .send()
        .await
        .unwrap();

    let from = chrono::Utc::now() - chrono::Duration::hours(1);
    let to = chrono::Utc::now() + chrono::Duration::hours(1);
    let report = app
        .client
        .get(app.url(&format!(
            "/api/v1/projects/{}/compliance-report?from={}&to={}",
            project_id,
            from.to_rfc3339(),
            to.to_rfc3339(),
        )))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(report.status(), 200);
    let body: serde_json::Value = report.json().await.unwrap();
    assert!(body["total_events"].as_u64().unwrap() >= 1);
    assert_eq!(body["by_kind"]["FILE_UPLOAD"], 1);
}
