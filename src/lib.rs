//! Personal Site Backend - library for app logic and testing

pub mod db;
pub mod domain;
pub mod logging;
pub mod routes;

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    services::ServeDir, trace::TraceLayer,
};

/// Configure CORS from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .and_then(|s| {
            let origins: Vec<HeaderValue> = s
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                None
            } else {
                Some(origins)
            }
        })
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(|| {
            vec![
                "http://localhost:3000".parse().unwrap(),
                "http://127.0.0.1:3000".parse().unwrap(),
            ]
        });

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

fn public_routes() -> Router {
    Router::new()
        .route("/api/blog", get(routes::blog::list_posts))
        .route("/api/blog/{slug}", get(routes::blog::get_post))
        .route("/api/books", get(routes::books::list_books))
        .route("/api/gear", get(routes::gear::list_gear))
        .route("/api/projects", get(routes::projects::list_projects))
        .route("/api/social-links", get(routes::social_links::list_social_links))
        .route("/api/sports", get(routes::sports::list_sports))
        .route("/api/sports/{sport_type}", get(routes::sports::get_sport_detail))
        .route("/rss.xml", get(routes::rss::rss_feed))
}

fn auth_routes() -> Router {
    Router::new()
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/verify", post(routes::auth::verify_token))
        .route("/api/auth/refresh", post(routes::auth::refresh))
        .route("/api/auth/logout", post(routes::auth::logout))
}

fn admin_routes() -> Router {
    Router::new()
        .route("/api/admin/dashboard", get(routes::dashboard::dashboard))
        .route(
            "/api/admin/blog",
            get(routes::blog::admin_list_posts).post(routes::blog::create_post),
        )
        .route(
            "/api/admin/blog/{id}",
            get(routes::blog::admin_get_post)
                .patch(routes::blog::update_post)
                .delete(routes::blog::delete_post),
        )
        .route("/api/admin/blog/{id}/publish", patch(routes::blog::publish_post))
        .route("/api/admin/blog/{id}/unpublish", patch(routes::blog::unpublish_post))
        .route(
            "/api/admin/blog/{id}/featured-image",
            delete(routes::blog::purge_featured_image),
        )
        .route(
            "/api/admin/books",
            get(routes::books::admin_list_books).post(routes::books::create_book),
        )
        .route(
            "/api/admin/books/{id}",
            get(routes::books::admin_get_book)
                .patch(routes::books::update_book)
                .delete(routes::books::delete_book),
        )
        .route(
            "/api/admin/books/{id}/cover-image",
            delete(routes::books::purge_cover_image),
        )
        .route(
            "/api/admin/gear",
            get(routes::gear::admin_list_gear).post(routes::gear::create_gear_item),
        )
        .route(
            "/api/admin/gear/{id}",
            get(routes::gear::admin_get_gear_item)
                .patch(routes::gear::update_gear_item)
                .delete(routes::gear::delete_gear_item),
        )
        .route(
            "/api/admin/gear/{id}/product-image",
            delete(routes::gear::purge_product_image),
        )
        .route(
            "/api/admin/projects",
            get(routes::projects::admin_list_projects).post(routes::projects::create_project),
        )
        .route(
            "/api/admin/projects/{id}",
            get(routes::projects::admin_get_project)
                .patch(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route(
            "/api/admin/social-links",
            get(routes::social_links::admin_list_social_links)
                .post(routes::social_links::create_social_link),
        )
        .route(
            "/api/admin/social-links/{id}",
            get(routes::social_links::admin_get_social_link)
                .patch(routes::social_links::update_social_link)
                .delete(routes::social_links::delete_social_link),
        )
        .route(
            "/api/admin/sports",
            get(routes::sports::admin_list_sports).post(routes::sports::create_sport_activity),
        )
        .route(
            "/api/admin/sports/{id}",
            get(routes::sports::admin_get_sport_activity)
                .patch(routes::sports::update_sport_activity)
                .delete(routes::sports::delete_sport_activity),
        )
        .route(
            "/api/admin/uploads",
            get(routes::uploads::list_images).post(routes::uploads::upload_image),
        )
        .route(
            "/api/admin/uploads/{filename}",
            delete(routes::uploads::delete_image),
        )
}

fn health_routes() -> Router {
    Router::new()
        .route("/health", get(routes::health::health_ping))
        .route("/health/detailed", get(routes::health::health_detailed))
        .route("/health/database", get(routes::health::health_database))
        .route("/health/ready", get(routes::health::health_ready))
}

/// Create and configure the application router.
pub fn create_app() -> Router {
    let cors = configure_cors();
    tracing::info!("CORS configured");

    Router::new()
        .merge(public_routes())
        .merge(auth_routes())
        .merge(admin_routes())
        .merge(health_routes())
        .nest_service("/uploads/images", ServeDir::new("uploads/images"))
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        // Compress responses with gzip/br/zstd automatically
        .layer(CompressionLayer::new())
        // Global 8 MB request body cap, sized for a 5 MB image upload plus
        // multipart overhead; uploads enforce the 5 MB file limit after
        // reading.
        .layer(RequestBodyLimitLayer::new(8 * 1024 * 1024))
        .layer(cors)
}

/// Run the server (used by main).
pub async fn run() {
    dotenvy::dotenv().ok();

    // Guards MUST be held for the programme's lifetime; dropping them early
    // shuts down background log-writer threads and loses buffered log lines.
    let _log_guards = logging::init();

    routes::health::init_start_time();

    // Refuse to start in production with the insecure default JWT secret.
    let environment = std::env::var("ENVIRONMENT").unwrap_or_default();
    if environment == "production" {
        let secret = std::env::var("JWT_SECRET").unwrap_or_default();
        if secret.is_empty() || secret == "default-jwt-secret-change-in-production" {
            panic!(
                "FATAL: JWT_SECRET must be set to a secure, unique value in production. \
                 Refusing to start with the default secret."
            );
        }

        // Warn (don't panic) about default admin credentials in production.
        let admin_email = std::env::var("ADMIN_EMAIL").unwrap_or_default();
        let admin_password_set =
            std::env::var("ADMIN_HASH_PASSWORD").is_ok() || std::env::var("ADMIN_PASSWORD").is_ok();

        if admin_email.is_empty() || admin_email == "admin@example.com" {
            tracing::warn!(
                "SECURITY: ADMIN_EMAIL is using an insecure default. \
                 Set ADMIN_EMAIL env var to a real address."
            );
        }
        if !admin_password_set {
            tracing::warn!(
                "SECURITY: Neither ADMIN_HASH_PASSWORD nor ADMIN_PASSWORD is set. \
                 The fallback default password 'admin123' is insecure. \
                 Set ADMIN_HASH_PASSWORD to a bcrypt hash of a strong password."
            );
        }
    }

    if std::env::var("DATABASE_URL").is_ok() {
        match db::init_pool(None).await {
            Ok(pool) => {
                if let Err(e) = db::run_migrations(&pool).await {
                    tracing::error!("Failed to run database migrations: {}", e);
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to initialize database pool: {}. Continuing without database.",
                    e
                );
            }
        }
    } else {
        tracing::info!("DATABASE_URL not set. Running without database connection.");
    }

    let app = create_app();

    // Bind address is configurable via HOST / PORT env vars, defaulting to
    // 127.0.0.1:3001 so existing dev setups keep working unchanged.
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3001);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .expect("Invalid HOST/PORT configuration");
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[test]
    fn test_create_app_returns_router() {
        let _app = create_app();
    }

    #[tokio::test]
    async fn test_admin_routes_require_auth() {
        for uri in [
            "/api/admin/dashboard",
            "/api/admin/blog",
            "/api/admin/books",
            "/api/admin/gear",
            "/api/admin/projects",
            "/api/admin/social-links",
            "/api/admin/sports",
            "/api/admin/uploads",
        ] {
            let res = create_app()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{} should 401", uri);
        }
    }

    #[tokio::test]
    async fn test_public_routes_respond_without_auth() {
        // Without a database pool these return 503, never 401.
        for uri in ["/api/blog", "/api/books", "/api/gear", "/api/projects"] {
            let res = create_app()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_ne!(res.status(), StatusCode::UNAUTHORIZED, "{} should be public", uri);
        }
    }

    #[tokio::test]
    async fn test_unknown_sport_type_is_not_found() {
        let res = create_app()
            .oneshot(
                Request::get("/api/sports/swimming")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
