use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use lapak::config::Config;
use tower::ServiceExt;

/// Default admin credentials seeded by migration (must match m20260315_initial.rs)
const ADMIN_USERNAME: &str = "admin";
const ADMIN_PASSWORD: &str = "lapak_change_me";

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.general.images_path = std::env::temp_dir()
        .join(format!("lapak-test-{}", uuid::Uuid::new_v4().simple()))
        .to_string_lossy()
        .into_owned();

    let state = lapak::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");
    lapak::api::router(state).await
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Log in and return the session cookie to replay on later requests.
async fn login(app: &Router, username: &str, password: &str) -> String {
    let payload = serde_json::json!({ "username": username, "password": password });

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_string(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK, "login failed");

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login did not set a session cookie")
        .to_str()
        .unwrap();

    cookie.split(';').next().unwrap().to_string()
}

async fn signup(app: &Router, username: &str, email: &str, password: &str) -> StatusCode {
    let payload = serde_json::json!({
        "username": username,
        "email": email,
        "password": password,
    });

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/signup")
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_string(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    response.status()
}

/// 1x1 PNG produced through the image crate, the smallest valid upload.
fn tiny_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(1, 1, image::Rgb([120, 80, 40]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
    bytes
}

const BOUNDARY: &str = "lapak-test-boundary";

fn multipart_listing(id: &str, name: &str, status: &str, png: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();

    for (field, value) in [("id", id), ("name", name), ("status", status)] {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }

    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"shot.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(png);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    body
}

async fn create_listing(app: &Router, cookie: &str, id: &str, name: &str, status: &str) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/listings")
                .header("Cookie", cookie)
                .header(
                    "Content-Type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(multipart_listing(id, name, status, &tiny_png())))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> axum::response::Response {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("Cookie", cookie);
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: &str,
    payload: &serde_json::Value,
) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("Cookie", cookie)
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_string(payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn send_empty(app: &Router, method: &str, uri: &str, cookie: &str) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("Cookie", cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_admin_routes_require_admin_session() {
    let app = spawn_app().await;

    // Anonymous
    let response = get(&app, "/api/trash", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Logged in, but not an admin
    assert_eq!(
        signup(&app, "buyer", "buyer@example.com", "hunter2").await,
        StatusCode::CREATED
    );
    let cookie = login(&app, "buyer", "hunter2").await;

    let response = get(&app, "/api/trash", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The public catalog stays open
    let response = get(&app, "/api/listings", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let app = spawn_app().await;

    let payload = serde_json::json!({ "username": ADMIN_USERNAME, "password": "wrong" });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_string(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_check() {
    let app = spawn_app().await;

    let response = get(&app, "/api/auth/session", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["is_logged_in"], false);

    let cookie = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let response = get(&app, "/api/auth/session", Some(&cookie)).await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["is_logged_in"], true);
    assert_eq!(body["data"]["username"], ADMIN_USERNAME);
    assert_eq!(body["data"]["role"], "admin");
}

#[tokio::test]
async fn test_listing_lifecycle_over_http() {
    let app = spawn_app().await;
    let cookie = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;

    // Create
    let response = create_listing(&app, &cookie, "ml-77", "Mythic Account", "available").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let image = body["data"]["image"].as_str().unwrap().to_string();
    assert!(image.ends_with(".webp"));

    // Duplicate active id
    let response = create_listing(&app, &cookie, "ml-77", "Mythic Again", "available").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Shows up in the catalog
    let response = get(&app, "/api/listings", None).await;
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["id"], "ml-77");
    assert_eq!(body["data"][0]["image"], format!("/img/{image}"));

    // Update
    let payload = serde_json::json!({
        "id": "ml-77",
        "name": "Mythic Account (sold)",
        "status": "sold",
        "image": image,
    });
    let response = send_json(&app, "PATCH", "/api/listings", &cookie, &payload).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["data"]["status"], "sold");

    // Soft delete moves it to the trash
    let response = send_empty(&app, "DELETE", "/api/listings/ml-77", &cookie).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&app, "/api/listings", None).await;
    let body = body_json(response).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let response = get(&app, "/api/trash", Some(&cookie)).await;
    let body = body_json(response).await;
    assert_eq!(body["data"][0]["id"], "ml-77");

    // Restore brings it back
    let response = send_empty(&app, "POST", "/api/trash/ml-77/restore", &cookie).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&app, "/api/listings", None).await;
    let body = body_json(response).await;
    assert_eq!(body["data"][0]["name"], "Mythic Account (sold)");

    // Trash again, purge, gone for good
    send_empty(&app, "DELETE", "/api/listings/ml-77", &cookie).await;
    let response = send_empty(&app, "DELETE", "/api/trash/ml-77", &cookie).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send_empty(&app, "POST", "/api/trash/ml-77/restore", &cookie).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_rejects_id_sitting_in_trash() {
    let app = spawn_app().await;
    let cookie = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;

    let response = create_listing(&app, &cookie, "tr-1", "Original", "available").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send_empty(&app, "DELETE", "/api/listings/tr-1", &cookie).await;
    assert_eq!(response.status(), StatusCode::OK);

    // The id is still claimed by the trashed row
    let response = create_listing(&app, &cookie, "tr-1", "Impostor", "available").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Restore works and keeps the original attributes
    let response = send_empty(&app, "POST", "/api/trash/tr-1/restore", &cookie).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&app, "/api/listings", None).await;
    let body = body_json(response).await;
    assert_eq!(body["data"][0]["name"], "Original");
}

#[tokio::test]
async fn test_create_listing_requires_all_fields() {
    let app = spawn_app().await;
    let cookie = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;

    // Multipart with no image field
    let mut body = Vec::new();
    for (field, value) in [("id", "no-img"), ("name", "No Image")] {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/listings")
                .header("Cookie", &cookie)
                .header(
                    "Content-Type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Unknown status value
    let response = create_listing(&app, &cookie, "bad-status", "Bad Status", "banned").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_catalog_sorting() {
    let app = spawn_app().await;
    let cookie = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;

    create_listing(&app, &cookie, "s-1", "Zulu", "available").await;
    create_listing(&app, &cookie, "s-2", "Alpha", "available").await;

    let response = get(&app, "/api/listings?sort=z-a", None).await;
    let body = body_json(response).await;
    assert_eq!(body["data"][0]["name"], "Zulu");

    // Unrecognized keys fall back to a-z
    let response = get(&app, "/api/listings?sort=bogus", None).await;
    let body = body_json(response).await;
    assert_eq!(body["data"][0]["name"], "Alpha");
}

#[tokio::test]
async fn test_bulk_update_skips_unknown_ids() {
    let app = spawn_app().await;
    let cookie = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;

    create_listing(&app, &cookie, "b-1", "First", "available").await;
    create_listing(&app, &cookie, "b-2", "Second", "available").await;

    let payload = serde_json::json!({
        "data": [
            { "id": "b-1", "name": "First Sold", "status": "sold" },
            { "id": "b-2", "name": "Second Hacked", "status": "hacked" },
            { "id": "ghost", "name": "Not There", "status": "sold" },
        ]
    });

    let response = send_json(&app, "PATCH", "/api/listings/bulk", &cookie, &payload).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["message"], "Updated 2 listings");

    // Missing data array is a validation error
    let response = send_json(
        &app,
        "PATCH",
        "/api/listings/bulk",
        &cookie,
        &serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_groups_by_status() {
    let app = spawn_app().await;
    let cookie = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;

    create_listing(&app, &cookie, "acc-1", "Dragon Slayer", "available").await;
    create_listing(&app, &cookie, "acc-2", "Dragon Hoard", "sold").await;
    create_listing(&app, &cookie, "acc-3", "Phoenix", "available").await;

    let response = get(&app, "/api/search?q=dragon", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["total"], 2);

    let groups = body["data"]["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["status"], "available");
    assert_eq!(groups[0]["listings"][0]["name"], "Dragon Slayer");
    assert_eq!(groups[1]["status"], "sold");

    // Ids match too
    let response = get(&app, "/api/search?q=acc-3", None).await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["total"], 1);

    // Blank query is rejected
    let response = get(&app, "/api/search?q=%20%20", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // No hits: empty result, not an error
    let response = get(&app, "/api/search?q=nothing-here", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["total"], 0);
    assert!(body["data"]["groups"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_purge_all_on_empty_trash_is_rejected() {
    let app = spawn_app().await;
    let cookie = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;

    let response = send_empty(&app, "DELETE", "/api/trash", &cookie).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Trash is empty");
}

#[tokio::test]
async fn test_admin_accounts_cannot_be_deleted() {
    let app = spawn_app().await;
    let cookie = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;

    signup(&app, "mortal", "mortal@example.com", "hunter2").await;

    let response = get(&app, "/api/users", Some(&cookie)).await;
    let body = body_json(response).await;
    let users = body["data"].as_array().unwrap();
    assert_eq!(users.len(), 2);

    let admin_id = users
        .iter()
        .find(|u| u["username"] == ADMIN_USERNAME)
        .unwrap()["id"]
        .as_i64()
        .unwrap();
    let mortal_id = users.iter().find(|u| u["username"] == "mortal").unwrap()["id"]
        .as_i64()
        .unwrap();

    // Single delete of an admin
    let response = send_empty(&app, "DELETE", &format!("/api/users/{admin_id}"), &cookie).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // One admin in the batch aborts the whole batch
    let payload = serde_json::json!({ "ids": [admin_id, mortal_id] });
    let response = send_json(&app, "POST", "/api/users/bulk-delete", &cookie, &payload).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get(&app, "/api/users", Some(&cookie)).await;
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    // A batch of only regular users goes through
    let payload = serde_json::json!({ "ids": [mortal_id] });
    let response = send_json(&app, "POST", "/api/users/bulk-delete", &cookie, &payload).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_system_status() {
    let app = spawn_app().await;
    let cookie = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;

    create_listing(&app, &cookie, "st-1", "Status Check", "available").await;

    let response = get(&app, "/api/system/status", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["database_ok"], true);
    assert_eq!(body["data"]["active_listings"], 1);
    assert_eq!(body["data"]["trashed_listings"], 0);
    assert_eq!(body["data"]["users"], 1);
}

#[tokio::test]
async fn test_signup_conflicts() {
    let app = spawn_app().await;

    assert_eq!(
        signup(&app, "alice", "alice@example.com", "hunter2").await,
        StatusCode::CREATED
    );
    // Same username
    assert_eq!(
        signup(&app, "alice", "other@example.com", "hunter2").await,
        StatusCode::CONFLICT
    );
    // Same email
    assert_eq!(
        signup(&app, "bob", "alice@example.com", "hunter2").await,
        StatusCode::CONFLICT
    );
    // Too-short password
    assert_eq!(
        signup(&app, "carol", "carol@example.com", "abc").await,
        StatusCode::BAD_REQUEST
    );
}
