/**
 * Dashboard Routes
 * Admin overview: entity counts, publish-state breakdown, and the most
 * recent records across the content types.
 */
use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sqlx::PgPool;

use crate::db::{
    self,
    models::{BlogPost, Book, Project, SportActivity},
};
use crate::routes::{db_unavailable, verify_auth};

const RECENT_LIMIT: i64 = 5;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCounts {
    pub blog_posts: i64,
    pub books: i64,
    pub gear_items: i64,
    pub projects: i64,
    pub social_links: i64,
    pub sport_activities: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub published_posts: i64,
    pub draft_posts: i64,
    pub total_views: i64,
    pub featured_books: i64,
    pub active_projects: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub counts: DashboardCounts,
    pub stats: DashboardStats,
    pub recent_posts: Vec<BlogPost>,
    pub recent_books: Vec<Book>,
    pub recent_projects: Vec<Project>,
    pub recent_activities: Vec<SportActivity>,
}

async fn count(pool: &PgPool, sql: &str) -> i64 {
    sqlx::query_scalar(sql)
        .fetch_one(pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Database error counting for dashboard: {}", e);
            0
        })
}

async fn recent<T>(pool: &PgPool, table: &str) -> Vec<T>
where
    T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    let sql = format!(
        "SELECT * FROM {} ORDER BY created_at DESC LIMIT {}",
        table, RECENT_LIMIT
    );
    sqlx::query_as::<_, T>(&sql)
        .fetch_all(pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Database error listing recent {}: {}", table, e);
            vec![]
        })
}

/// GET /api/admin/dashboard
pub async fn dashboard(headers: HeaderMap) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };
    let pool = pool.as_ref();

    let counts = DashboardCounts {
        blog_posts: count(pool, "SELECT COUNT(*) FROM blog_posts").await,
        books: count(pool, "SELECT COUNT(*) FROM books").await,
        gear_items: count(pool, "SELECT COUNT(*) FROM gear_items").await,
        projects: count(pool, "SELECT COUNT(*) FROM projects").await,
        social_links: count(pool, "SELECT COUNT(*) FROM social_links").await,
        sport_activities: count(pool, "SELECT COUNT(*) FROM sport_activities").await,
    };

    let stats = DashboardStats {
        published_posts: count(
            pool,
            "SELECT COUNT(*) FROM blog_posts \
             WHERE published_at IS NOT NULL AND published_at <= now()",
        )
        .await,
        draft_posts: count(pool, "SELECT COUNT(*) FROM blog_posts WHERE published_at IS NULL")
            .await,
        total_views: count(pool, "SELECT COALESCE(SUM(views_count), 0) FROM blog_posts").await,
        featured_books: count(pool, "SELECT COUNT(*) FROM books WHERE featured = true").await,
        active_projects: count(pool, "SELECT COUNT(*) FROM projects WHERE status = 'active'")
            .await,
    };

    let recent_posts: Vec<BlogPost> = recent(pool, "blog_posts").await;
    let recent_books: Vec<Book> = recent(pool, "books").await;
    let recent_projects: Vec<Project> = recent(pool, "projects").await;
    let recent_activities: Vec<SportActivity> = recent(pool, "sport_activities").await;

    (
        StatusCode::OK,
        Json(DashboardResponse {
            counts,
            stats,
            recent_posts,
            recent_books,
            recent_projects,
            recent_activities,
        }),
    )
        .into_response()
}
