// src/main.rs

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use reviewdb::config::Config;
use reviewdb::error::AppError;
use reviewdb::models::user::{NewUser, UserRole};
use reviewdb::repo::Repository;
use reviewdb::routes;
use reviewdb::state::AppState;
use reviewdb::utils::code::generate_confirmation_code;
use reviewdb::utils::notify::TracingNotifier;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to connect to database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    // Create AppState
    let state = AppState::new(pool, config, Arc::new(TracingNotifier));

    // Seed Bootstrap Admin
    if let Err(e) = seed_admin_user(&state).await {
        tracing::error!("Failed to seed admin user: {:?}", e);
    }

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    // Start the server
    axum::serve(listener, app).await.unwrap();
}

/// Seeds the bootstrap superuser from the environment, if configured.
///
/// Role elevation normally requires an admin actor, so the first admin has
/// to come from here. The confirmation code goes out through the notifier
/// like any other signup.
async fn seed_admin_user(state: &AppState) -> Result<(), AppError> {
    let (Some(username), Some(email)) =
        (&state.config.admin_username, &state.config.admin_email)
    else {
        return Ok(());
    };

    if state.users.find_by_username(username).await?.is_some() {
        return Ok(());
    }

    tracing::info!("Seeding admin user: {}", username);
    let code = generate_confirmation_code();

    state
        .users
        .create(NewUser {
            username: username.clone(),
            email: email.clone(),
            first_name: None,
            last_name: None,
            bio: None,
            role: UserRole::Admin,
            is_superuser: true,
            confirmation_code: code.clone(),
        })
        .await?;

    state
        .notifier
        .send_confirmation_code(username, email, &code)
        .await?;

    tracing::info!("Admin user created successfully.");
    Ok(())
}
