// tests/review_tests.rs
//
// Catalog + review flows against a live Postgres. Run with a migrated
// database:
//   DATABASE_URL=postgres://... cargo test -- --ignored

use std::sync::Arc;

use reviewdb::{config::Config, routes, state::AppState, utils::notify::TracingNotifier};
use sqlx::postgres::{PgPool, PgPoolOptions};

async fn spawn_app() -> (String, PgPool) {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "review_test_secret".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_username: None,
        admin_email: None,
    };

    let state = AppState::new(pool.clone(), config, Arc::new(TracingNotifier));
    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
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

/// Registers a user and exchanges the stored code for a token.
async fn register_user(
    client: &reqwest::Client,
    address: &str,
    pool: &PgPool,
    username: &str,
) -> String {
    let resp = client
        .post(format!("{}/auth/signup", address))
        .json(&serde_json::json!({
            "username": username,
            "email": format!("{}@example.com", username),
        }))
        .send()
        .await
        .expect("Signup failed");
    assert_eq!(resp.status().as_u16(), 200);

    let code = sqlx::query_scalar::<_, Option<String>>(
        "SELECT confirmation_code FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_one(pool)
    .await
    .unwrap()
    .unwrap();

    let resp = client
        .post(format!("{}/auth/token", address))
        .json(&serde_json::json!({
            "username": username,
            "confirmation_code": code,
        }))
        .send()
        .await
        .expect("Token exchange failed");
    assert_eq!(resp.status().as_u16(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

/// Registers a user and promotes them to the given role directly in the
/// database (role elevation endpoints are themselves admin-gated).
async fn register_with_role(
    client: &reqwest::Client,
    address: &str,
    pool: &PgPool,
    username: &str,
    role: &str,
) -> String {
    register_user(client, address, pool, username).await;

    sqlx::query("UPDATE users SET role = $1::user_role WHERE username = $2")
        .bind(role)
        .bind(username)
        .execute(pool)
        .await
        .unwrap();

    // Re-issue the token so the claims carry the new role.
    let code = sqlx::query_scalar::<_, Option<String>>(
        "SELECT confirmation_code FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_one(pool)
    .await
    .unwrap()
    .unwrap();

    let resp = client
        .post(format!("{}/auth/token", address))
        .json(&serde_json::json!({
            "username": username,
            "confirmation_code": code,
        }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

/// Creates a category and a title in it, returning the title id.
async fn seed_title(client: &reqwest::Client, address: &str, admin_token: &str) -> i64 {
    let slug = unique_name("cat");

    let resp = client
        .post(format!("{}/categories", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({ "name": "Films", "slug": slug }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    let resp = client
        .post(format!("{}/titles", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({
            "name": unique_name("title"),
            "year": 1999,
            "description": "A film",
            "category": slug,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    let body: serde_json::Value = resp.json().await.unwrap();
    body["id"].as_i64().unwrap()
}

async fn post_review(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    title_id: i64,
    score: i32,
) -> reqwest::Response {
    client
        .post(format!("{}/titles/{}/reviews", address, title_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "text": "watchable", "score": score }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a migrated Postgres"]
async fn catalog_writes_require_admin() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let user_token = register_user(&client, &address, &pool, &unique_name("u")).await;

    // Anonymous write: 401.
    let resp = client
        .post(format!("{}/categories", address))
        .json(&serde_json::json!({ "name": "Films", "slug": unique_name("cat") }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    // Plain user write: 403.
    let resp = client
        .post(format!("{}/categories", address))
        .header("Authorization", format!("Bearer {}", user_token))
        .json(&serde_json::json!({ "name": "Films", "slug": unique_name("cat") }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    // Anonymous read: 200.
    let resp = client
        .get(format!("{}/categories", address))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a migrated Postgres"]
async fn duplicate_slug_is_rejected() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let admin =
        register_with_role(&client, &address, &pool, &unique_name("adm"), "admin").await;
    let slug = unique_name("cat");

    let resp = client
        .post(format!("{}/categories", address))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&serde_json::json!({ "name": "Films", "slug": slug }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    let resp = client
        .post(format!("{}/categories", address))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&serde_json::json!({ "name": "Films again", "slug": slug }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["kind"], "duplicate_slug");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a migrated Postgres"]
async fn one_review_per_user_per_title() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let admin =
        register_with_role(&client, &address, &pool, &unique_name("adm"), "admin").await;
    let title_id = seed_title(&client, &address, &admin).await;

    let user = register_user(&client, &address, &pool, &unique_name("u")).await;

    let resp = post_review(&client, &address, &user, title_id, 8).await;
    assert_eq!(resp.status().as_u16(), 201);

    let resp = post_review(&client, &address, &user, title_id, 9).await;
    assert_eq!(resp.status().as_u16(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["kind"], "duplicate_review");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a migrated Postgres"]
async fn rating_is_rounded_mean_of_scores() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let admin =
        register_with_role(&client, &address, &pool, &unique_name("adm"), "admin").await;
    let title_id = seed_title(&client, &address, &admin).await;

    // No reviews yet: rating is null, not 0.
    let resp = client
        .get(format!("{}/titles/{}", address, title_id))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["rating"].is_null());

    for score in [7, 8] {
        let user = register_user(&client, &address, &pool, &unique_name("u")).await;
        let resp = post_review(&client, &address, &user, title_id, score).await;
        assert_eq!(resp.status().as_u16(), 201);
    }

    // Mean 7.5 rounds half away from zero to 8.
    let resp = client
        .get(format!("{}/titles/{}", address, title_id))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["rating"], 8);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a migrated Postgres"]
async fn review_mutation_rights() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let admin =
        register_with_role(&client, &address, &pool, &unique_name("adm"), "admin").await;
    let title_id = seed_title(&client, &address, &admin).await;

    let author = register_user(&client, &address, &pool, &unique_name("author")).await;
    let resp = post_review(&client, &address, &author, title_id, 9).await;
    assert_eq!(resp.status().as_u16(), 201);
    let review: serde_json::Value = resp.json().await.unwrap();
    let review_id = review["id"].as_i64().unwrap();

    // A stranger may read but not delete.
    let stranger = register_user(&client, &address, &pool, &unique_name("u")).await;
    let url = format!("{}/titles/{}/reviews/{}", address, title_id, review_id);

    let resp = client.get(&url).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = client
        .delete(&url)
        .header("Authorization", format!("Bearer {}", stranger))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    // A moderator may.
    let moderator =
        register_with_role(&client, &address, &pool, &unique_name("mod"), "moderator").await;
    let resp = client
        .delete(&url)
        .header("Authorization", format!("Bearer {}", moderator))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);
}
