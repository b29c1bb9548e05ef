// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, catalog, reviews, users},
    state::AppState,
    utils::jwt::actor_middleware,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, users, catalog, reviews).
/// * Resolves every request's actor once, up front; handlers consult the
///   permission engine with it.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/token", post(auth::token));

    let user_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        // Static before wildcard: "me" never resolves as a username.
        .route("/me", get(users::get_me).patch(users::update_me))
        .route(
            "/{username}",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        );

    let category_routes = Router::new()
        .route(
            "/",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route(
            "/{slug}",
            get(catalog::get_category)
                .patch(catalog::update_category)
                .delete(catalog::delete_category),
        );

    let genre_routes = Router::new()
        .route("/", get(catalog::list_genres).post(catalog::create_genre))
        .route(
            "/{slug}",
            get(catalog::get_genre)
                .patch(catalog::update_genre)
                .delete(catalog::delete_genre),
        );

    let title_routes = Router::new()
        .route("/", get(catalog::list_titles).post(catalog::create_title))
        .route(
            "/{title_id}",
            get(catalog::get_title)
                .patch(catalog::update_title)
                .delete(catalog::delete_title),
        )
        .route(
            "/{title_id}/reviews",
            get(reviews::list_reviews).post(reviews::create_review),
        )
        .route(
            "/{title_id}/reviews/{review_id}",
            get(reviews::get_review)
                .patch(reviews::update_review)
                .delete(reviews::delete_review),
        )
        .route(
            "/{title_id}/reviews/{review_id}/comments",
            get(reviews::list_comments).post(reviews::create_comment),
        )
        .route(
            "/{title_id}/reviews/{review_id}/comments/{comment_id}",
            get(reviews::get_comment)
                .patch(reviews::update_comment)
                .delete(reviews::delete_comment),
        );

    Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/categories", category_routes)
        .nest("/genres", genre_routes)
        .nest("/titles", title_routes)
        // Global Middleware (applied from outside in)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            actor_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
