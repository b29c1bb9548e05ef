// tests/api_tests.rs
//
// HTTP-level tests against a live Postgres. Run with a migrated database:
//   DATABASE_URL=postgres://... cargo test -- --ignored

use std::sync::Arc;

use reviewdb::{config::Config, routes, state::AppState, utils::notify::TracingNotifier};
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345") and a pool for
/// seeding/inspecting test data.
async fn spawn_app() -> (String, PgPool) {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        admin_username: None,
        admin_email: None,
    };

    let state = AppState::new(pool.clone(), config, Arc::new(TracingNotifier));
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

async fn signup(client: &reqwest::Client, address: &str, username: &str) -> reqwest::Response {
    client
        .post(format!("{}/auth/signup", address))
        .json(&serde_json::json!({
            "username": username,
            "email": format!("{}@example.com", username),
        }))
        .send()
        .await
        .expect("Signup request failed")
}

async fn stored_code(pool: &PgPool, username: &str) -> String {
    sqlx::query_scalar::<_, Option<String>>(
        "SELECT confirmation_code FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_one(pool)
    .await
    .expect("User row missing")
    .expect("Confirmation code missing")
}

/// Full signup → token → profile round trip, plus code reuse.
async fn obtain_token(
    client: &reqwest::Client,
    address: &str,
    pool: &PgPool,
    username: &str,
) -> String {
    let resp = signup(client, address, username).await;
    assert_eq!(resp.status().as_u16(), 200);

    let code = stored_code(pool, username).await;

    let resp = client
        .post(format!("{}/auth/token", address))
        .json(&serde_json::json!({
            "username": username,
            "confirmation_code": code,
        }))
        .send()
        .await
        .expect("Token request failed");
    assert_eq!(resp.status().as_u16(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    body["token"].as_str().expect("Token not found").to_string()
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a migrated Postgres"]
async fn unknown_route_404() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a migrated Postgres"]
async fn signup_and_token_flow_works() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let username = unique_name("u");

    let token = obtain_token(&client, &address, &pool, &username).await;

    // The token opens the profile endpoint.
    let me = client
        .get(format!("{}/users/me", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(me.status().as_u16(), 200);

    let body: serde_json::Value = me.json().await.unwrap();
    assert_eq!(body["username"], username.as_str());
    assert_eq!(body["role"], "user");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a migrated Postgres"]
async fn signup_rejects_reserved_username() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let resp = signup(&client, &address, "me").await;

    assert_eq!(resp.status().as_u16(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["kind"], "username_reserved");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a migrated Postgres"]
async fn resignup_regenerates_code_without_conflict() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let username = unique_name("u");

    assert_eq!(signup(&client, &address, &username).await.status().as_u16(), 200);
    let first_code = stored_code(&pool, &username).await;

    // Same identity again: 200 and a fresh code.
    assert_eq!(signup(&client, &address, &username).await.status().as_u16(), 200);
    let second_code = stored_code(&pool, &username).await;
    assert_ne!(first_code, second_code);

    // Same username, different email: conflict.
    let resp = client
        .post(format!("{}/auth/signup", address))
        .json(&serde_json::json!({
            "username": username,
            "email": format!("other_{}@example.com", username),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["kind"], "duplicate_identity");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a migrated Postgres"]
async fn token_with_wrong_code_or_unknown_user() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let username = unique_name("u");

    assert_eq!(signup(&client, &address, &username).await.status().as_u16(), 200);

    let resp = client
        .post(format!("{}/auth/token", address))
        .json(&serde_json::json!({
            "username": username,
            "confirmation_code": "definitely-wrong",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = client
        .post(format!("{}/auth/token", address))
        .json(&serde_json::json!({
            "username": unique_name("ghost"),
            "confirmation_code": "whatever",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a migrated Postgres"]
async fn confirmation_code_is_reusable() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let username = unique_name("u");

    assert_eq!(signup(&client, &address, &username).await.status().as_u16(), 200);
    let code = stored_code(&pool, &username).await;

    // Codes are not rotated on use: both exchanges succeed.
    for _ in 0..2 {
        let resp = client
            .post(format!("{}/auth/token", address))
            .json(&serde_json::json!({
                "username": username,
                "confirmation_code": code,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a migrated Postgres"]
async fn self_patch_cannot_escalate_role() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let username = unique_name("u");

    let token = obtain_token(&client, &address, &pool, &username).await;

    // The payload names a new role; the request succeeds but the field is
    // dropped, not applied.
    let resp = client
        .patch(format!("{}/users/me", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "role": "admin",
            "bio": "just a user",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["role"], "user");
    assert_eq!(body["bio"], "just a user");
}
