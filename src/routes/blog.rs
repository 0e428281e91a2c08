/**
 * Blog Routes
 * Public blog listing/detail plus admin CRUD and the publish lifecycle.
 */
use axum::{
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::{self, models::BlogPost};
use crate::domain::publish::{self, PublishStatus};
use crate::domain::richtext::{self, RichText};
use crate::domain::slug;
use crate::domain::validate::ValidationErrors;
use crate::routes::{
    self, conflict, db_error, db_unavailable, not_found, uploads, validation_failed, verify_auth,
    SuccessResponse,
};

const COLUMNS: &str = "id, title, slug, excerpt_html, content_html, published_at, viral, \
                       featured, views_count, reading_time, featured_image, created_at, updated_at";

/// Public list cap; the site never renders more than a page of posts at once.
const PUBLIC_LIST_LIMIT: i64 = 20;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for GET /api/blog
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicBlogQuery {
    /// Optional named scope: featured | viral | popular
    pub scope: Option<String>,
    pub year: Option<i32>,
    /// Case-insensitive substring search over title and body
    pub q: Option<String>,
    pub limit: Option<i64>,
}

/// Query parameters for GET /api/admin/blog
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminBlogQuery {
    /// published | draft | scheduled
    pub status: Option<String>,
    pub viral: Option<bool>,
    pub featured: Option<bool>,
    pub year: Option<i32>,
    pub search: Option<String>,
}

/// Blog post summary (for list views)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub status: PublishStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub viral: bool,
    pub featured: bool,
    pub views_count: i64,
    pub reading_time: Option<i32>,
    pub featured_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Full blog post response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostDetail {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt_html: Option<String>,
    pub content_html: Option<String>,
    pub status: PublishStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub formatted_published_date: String,
    pub viral: bool,
    pub featured: bool,
    pub views_count: i64,
    pub reading_time: Option<i32>,
    pub featured_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicBlogListResponse {
    pub posts: Vec<BlogPostSummary>,
    /// Distinct publication years, newest first, for the archive filter
    pub years: Vec<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicBlogDetailResponse {
    #[serde(flatten)]
    pub post: BlogPostDetail,
    pub related_posts: Vec<BlogPostSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminBlogListResponse {
    pub posts: Vec<BlogPostSummary>,
    pub total: usize,
}

/// Request body for POST /api/admin/blog
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlogPostRequest {
    pub title: String,
    /// Blank or omitted: derived from the title
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub viral: Option<bool>,
    pub featured: Option<bool>,
    /// Uploaded image filename from the uploads endpoint
    pub featured_image: Option<String>,
}

/// Request body for PATCH /api/admin/blog/:id
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBlogPostRequest {
    pub title: Option<String>,
    /// Explicit empty string requests re-derivation from the title
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub viral: Option<bool>,
    pub featured: Option<bool>,
    pub featured_image: Option<String>,
}

fn to_summary(post: &BlogPost, now: DateTime<Utc>) -> BlogPostSummary {
    BlogPostSummary {
        id: post.id,
        title: post.title.clone(),
        slug: post.slug.clone(),
        excerpt: RichText::new(post.excerpt_html.as_deref()).excerpt(150),
        status: publish::publish_status(post.published_at, now),
        published_at: post.published_at,
        viral: post.viral,
        featured: post.featured,
        views_count: post.views_count,
        reading_time: post.reading_time,
        featured_image_url: uploads::public_url(post.featured_image.as_deref()),
        created_at: post.created_at,
    }
}

fn to_detail(post: &BlogPost, now: DateTime<Utc>) -> BlogPostDetail {
    BlogPostDetail {
        id: post.id,
        title: post.title.clone(),
        slug: post.slug.clone(),
        excerpt_html: post.excerpt_html.clone(),
        content_html: post.content_html.clone(),
        status: publish::publish_status(post.published_at, now),
        published_at: post.published_at,
        formatted_published_date: publish::formatted_published_date(post.published_at, now),
        viral: post.viral,
        featured: post.featured,
        views_count: post.views_count,
        reading_time: post.reading_time,
        featured_image_url: uploads::public_url(post.featured_image.as_deref()),
        created_at: post.created_at,
        updated_at: post.updated_at,
    }
}

// ============================================================================
// Query building
// ============================================================================

/// Append the public scope filters. Everything public starts from the
/// published scope: `published_at` set and elapsed.
fn push_public_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &PublicBlogQuery) {
    qb.push(" WHERE published_at IS NOT NULL AND published_at <= now()");

    match query.scope.as_deref() {
        Some("featured") => {
            qb.push(" AND featured = true");
        }
        Some("viral") => {
            qb.push(" AND viral = true");
        }
        _ => {}
    }

    if let Some(year) = query.year {
        qb.push(" AND EXTRACT(YEAR FROM published_at) = ");
        qb.push_bind(year);
    }

    if let Some(q) = query.q.as_ref().filter(|q| !q.trim().is_empty()) {
        let pattern = format!("%{}%", q.trim());
        qb.push(" AND (title ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR excerpt_html ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR content_html ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }

    if query.scope.as_deref() == Some("popular") {
        qb.push(" ORDER BY views_count DESC");
    } else {
        qb.push(" ORDER BY published_at DESC");
    }
}

/// Append the admin filter set. Admin lists default to creation order and
/// see drafts and scheduled posts too.
fn push_admin_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &AdminBlogQuery) {
    qb.push(" WHERE 1=1");

    match query.status.as_deref() {
        Some("published") => {
            qb.push(" AND published_at IS NOT NULL AND published_at <= now()");
        }
        Some("draft") => {
            qb.push(" AND published_at IS NULL");
        }
        Some("scheduled") => {
            qb.push(" AND published_at > now()");
        }
        _ => {}
    }

    if query.viral == Some(true) {
        qb.push(" AND viral = true");
    }
    if query.featured == Some(true) {
        qb.push(" AND featured = true");
    }

    if let Some(year) = query.year {
        qb.push(" AND EXTRACT(YEAR FROM published_at) = ");
        qb.push_bind(year);
    }

    if let Some(search) = query.search.as_ref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        qb.push(" AND (title ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR excerpt_html ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR content_html ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }

    qb.push(" ORDER BY created_at DESC");
}

/// Searches select DISTINCT so a match in several columns (or, with joined
/// rich-text storage, several joined rows) still yields one row per post.
fn select_prefix(searching: bool) -> String {
    if searching {
        format!("SELECT DISTINCT {} FROM blog_posts", COLUMNS)
    } else {
        format!("SELECT {} FROM blog_posts", COLUMNS)
    }
}

// ============================================================================
// Write-path helpers
// ============================================================================

struct BlogPostAttrs {
    title: String,
    slug: Option<String>,
    excerpt_html: Option<String>,
    content_html: Option<String>,
    published_at: Option<DateTime<Utc>>,
    viral: bool,
    featured: bool,
    featured_image: Option<String>,
    reading_time: Option<i32>,
}

fn validate_post(attrs: &BlogPostAttrs) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.require("title", &attrs.title);

    if let Some(s) = attrs.slug.as_deref() {
        if !s.is_empty() && !slug::is_valid_slug(s) {
            errors.add(
                "slug",
                "must contain only lowercase letters, numbers, and hyphens",
            );
        }
    }

    errors
}

fn sanitized(input: Option<&str>) -> Option<String> {
    input
        .filter(|s| !s.trim().is_empty())
        .map(richtext::sanitize)
}

/// Recompute reading time from the content about to be stored. Runs on
/// every save where content is present.
fn compute_reading_time(content_html: Option<&str>) -> Option<i32> {
    richtext::reading_time_minutes(&RichText::new(content_html))
}

/// Resolve the slug to store: an explicit valid slug wins, anything blank
/// gets derived from the title and uniquified before the insert/update.
async fn resolve_slug(
    pool: &PgPool,
    requested: Option<&str>,
    title: &str,
    exclude_id: Option<Uuid>,
) -> Result<String, sqlx::Error> {
    match requested {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => slug::generate_unique_slug(pool, title, exclude_id).await,
    }
}

async fn find_post(pool: &PgPool, id: Uuid) -> Result<BlogPost, Response> {
    let sql = format!("SELECT {} FROM blog_posts WHERE id = $1", COLUMNS);
    match sqlx::query_as::<_, BlogPost>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
    {
        Ok(Some(post)) => Ok(post),
        Ok(None) => Err(not_found()),
        Err(e) => Err(db_error("fetching blog post", e)),
    }
}

// ============================================================================
// Public handlers
// ============================================================================

/// GET /api/blog - Published posts with optional scope/year/search filters
pub async fn list_posts(Query(query): Query<PublicBlogQuery>) -> Response {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let limit = routes::clamp_limit(query.limit, PUBLIC_LIST_LIMIT, 100);

    let searching = query.q.as_ref().is_some_and(|q| !q.trim().is_empty());
    let mut qb = QueryBuilder::new(select_prefix(searching));
    push_public_filters(&mut qb, &query);
    qb.push(" LIMIT ");
    qb.push_bind(limit);

    let posts: Vec<BlogPost> = match qb.build_query_as().fetch_all(pool.as_ref()).await {
        Ok(rows) => rows,
        Err(e) => return db_error("listing blog posts", e),
    };

    let years: Vec<i32> = sqlx::query_scalar(
        r#"
        SELECT DISTINCT EXTRACT(YEAR FROM published_at)::int
        FROM blog_posts
        WHERE published_at IS NOT NULL AND published_at <= now()
        ORDER BY 1 DESC
        "#,
    )
    .fetch_all(pool.as_ref())
    .await
    .unwrap_or_else(|e| {
        tracing::error!("Database error listing publication years: {}", e);
        vec![]
    });

    let now = Utc::now();
    let posts = posts.iter().map(|p| to_summary(p, now)).collect();

    (StatusCode::OK, Json(PublicBlogListResponse { posts, years })).into_response()
}

/// GET /api/blog/:slug - Published post detail; increments the view counter
pub async fn get_post(Path(slug_param): Path<String>) -> Response {
    if !slug::is_valid_slug(&slug_param) {
        return not_found();
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let sql = format!("SELECT {} FROM blog_posts WHERE slug = $1", COLUMNS);
    let mut post = match sqlx::query_as::<_, BlogPost>(&sql)
        .bind(&slug_param)
        .fetch_optional(pool.as_ref())
        .await
    {
        Ok(Some(post)) => post,
        Ok(None) => return not_found(),
        Err(e) => return db_error("fetching blog post", e),
    };

    let now = Utc::now();

    // Drafts and scheduled posts are invisible to the public site.
    if !publish::is_published(post.published_at, now) {
        return not_found();
    }

    // Atomic in SQL; the response carries the incremented count. A lost
    // increment is not worth failing the read.
    match sqlx::query_scalar::<_, i64>(
        "UPDATE blog_posts SET views_count = views_count + 1 WHERE id = $1 RETURNING views_count",
    )
    .bind(post.id)
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(views) => post.views_count = views,
        Err(e) => tracing::warn!("Failed to increment view count for {}: {}", post.slug, e),
    }

    let related_sql = format!(
        "SELECT {} FROM blog_posts \
         WHERE published_at IS NOT NULL AND published_at <= now() AND id <> $1 \
         ORDER BY published_at DESC LIMIT 3",
        COLUMNS
    );
    let related: Vec<BlogPost> = sqlx::query_as(&related_sql)
        .bind(post.id)
        .fetch_all(pool.as_ref())
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Database error fetching related posts: {}", e);
            vec![]
        });

    let response = PublicBlogDetailResponse {
        post: to_detail(&post, now),
        related_posts: related.iter().map(|p| to_summary(p, now)).collect(),
    };

    (StatusCode::OK, Json(response)).into_response()
}

// ============================================================================
// Admin handlers
// ============================================================================

/// GET /api/admin/blog - All posts with status/viral/featured/year/search filters
pub async fn admin_list_posts(
    headers: HeaderMap,
    Query(query): Query<AdminBlogQuery>,
) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let searching = query.search.as_ref().is_some_and(|s| !s.trim().is_empty());
    let mut qb = QueryBuilder::new(select_prefix(searching));
    push_admin_filters(&mut qb, &query);

    let posts: Vec<BlogPost> = match qb.build_query_as().fetch_all(pool.as_ref()).await {
        Ok(rows) => rows,
        Err(e) => return db_error("listing blog posts", e),
    };

    let now = Utc::now();
    let posts: Vec<BlogPostSummary> = posts.iter().map(|p| to_summary(p, now)).collect();
    let total = posts.len();

    (StatusCode::OK, Json(AdminBlogListResponse { posts, total })).into_response()
}

/// GET /api/admin/blog/:id
pub async fn admin_get_post(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match find_post(pool.as_ref(), id).await {
        Ok(post) => (StatusCode::OK, Json(to_detail(&post, Utc::now()))).into_response(),
        Err(response) => response,
    }
}

/// POST /api/admin/blog - Create a post
pub async fn create_post(
    headers: HeaderMap,
    Json(payload): Json<CreateBlogPostRequest>,
) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let content_html = sanitized(payload.content.as_deref());
    let attrs = BlogPostAttrs {
        title: payload.title.trim().to_string(),
        slug: payload.slug.clone(),
        excerpt_html: sanitized(payload.excerpt.as_deref()),
        reading_time: compute_reading_time(content_html.as_deref()),
        content_html,
        published_at: payload.published_at,
        viral: payload.viral.unwrap_or(false),
        featured: payload.featured.unwrap_or(false),
        featured_image: payload.featured_image,
    };

    let errors = validate_post(&attrs);
    if !errors.is_empty() {
        return validation_failed(errors);
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let slug_value = match resolve_slug(pool.as_ref(), attrs.slug.as_deref(), &attrs.title, None).await
    {
        Ok(s) => s,
        Err(e) => return db_error("deriving slug", e),
    };

    let sql = format!(
        "INSERT INTO blog_posts \
         (title, slug, excerpt_html, content_html, published_at, viral, featured, reading_time, featured_image) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING {}",
        COLUMNS
    );

    match sqlx::query_as::<_, BlogPost>(&sql)
        .bind(&attrs.title)
        .bind(&slug_value)
        .bind(&attrs.excerpt_html)
        .bind(&attrs.content_html)
        .bind(attrs.published_at)
        .bind(attrs.viral)
        .bind(attrs.featured)
        .bind(attrs.reading_time)
        .bind(&attrs.featured_image)
        .fetch_one(pool.as_ref())
        .await
    {
        Ok(post) => (StatusCode::CREATED, Json(to_detail(&post, Utc::now()))).into_response(),
        Err(e) if routes::is_unique_violation(&e) => conflict("slug", "has already been taken"),
        Err(e) => db_error("creating blog post", e),
    }
}

/// PATCH /api/admin/blog/:id - Partial update; the merged record is revalidated
pub async fn update_post(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBlogPostRequest>,
) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let existing = match find_post(pool.as_ref(), id).await {
        Ok(post) => post,
        Err(response) => return response,
    };

    let title = payload
        .title
        .map(|t| t.trim().to_string())
        .unwrap_or(existing.title);
    let excerpt_html = sanitized(payload.excerpt.as_deref()).or(existing.excerpt_html);
    let content_html = sanitized(payload.content.as_deref()).or(existing.content_html);
    let published_at = payload.published_at.or(existing.published_at);

    let attrs = BlogPostAttrs {
        title,
        slug: payload.slug.clone(),
        reading_time: compute_reading_time(content_html.as_deref()),
        excerpt_html,
        content_html,
        published_at,
        viral: payload.viral.unwrap_or(existing.viral),
        featured: payload.featured.unwrap_or(existing.featured),
        featured_image: payload.featured_image.or(existing.featured_image),
    };

    let errors = validate_post(&attrs);
    if !errors.is_empty() {
        return validation_failed(errors);
    }

    // Omitted slug keeps the current one; blank slug asks for re-derivation.
    let slug_value = match payload.slug.as_deref() {
        None => existing.slug.clone(),
        Some(requested) => {
            match resolve_slug(pool.as_ref(), Some(requested), &attrs.title, Some(id)).await {
                Ok(s) => s,
                Err(e) => return db_error("deriving slug", e),
            }
        }
    };

    let sql = format!(
        "UPDATE blog_posts SET \
         title = $1, slug = $2, excerpt_html = $3, content_html = $4, published_at = $5, \
         viral = $6, featured = $7, reading_time = $8, featured_image = $9, updated_at = now() \
         WHERE id = $10 RETURNING {}",
        COLUMNS
    );

    match sqlx::query_as::<_, BlogPost>(&sql)
        .bind(&attrs.title)
        .bind(&slug_value)
        .bind(&attrs.excerpt_html)
        .bind(&attrs.content_html)
        .bind(attrs.published_at)
        .bind(attrs.viral)
        .bind(attrs.featured)
        .bind(attrs.reading_time)
        .bind(&attrs.featured_image)
        .bind(id)
        .fetch_one(pool.as_ref())
        .await
    {
        Ok(post) => (StatusCode::OK, Json(to_detail(&post, Utc::now()))).into_response(),
        Err(e) if routes::is_unique_violation(&e) => conflict("slug", "has already been taken"),
        Err(e) => db_error("updating blog post", e),
    }
}

/// DELETE /api/admin/blog/:id - Hard delete
pub async fn delete_post(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query("DELETE FROM blog_posts WHERE id = $1")
        .bind(id)
        .execute(pool.as_ref())
        .await
    {
        Ok(result) if result.rows_affected() == 0 => not_found(),
        Ok(_) => (StatusCode::OK, Json(SuccessResponse { success: true })).into_response(),
        Err(e) => db_error("deleting blog post", e),
    }
}

/// PATCH /api/admin/blog/:id/publish - Set published_at to now
pub async fn publish_post(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }
    set_published_at(id, true).await
}

/// PATCH /api/admin/blog/:id/unpublish - Back to draft from any state
pub async fn unpublish_post(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }
    set_published_at(id, false).await
}

async fn set_published_at(id: Uuid, publish: bool) -> Response {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let sql = if publish {
        format!(
            "UPDATE blog_posts SET published_at = now(), updated_at = now() WHERE id = $1 RETURNING {}",
            COLUMNS
        )
    } else {
        format!(
            "UPDATE blog_posts SET published_at = NULL, updated_at = now() WHERE id = $1 RETURNING {}",
            COLUMNS
        )
    };

    match sqlx::query_as::<_, BlogPost>(&sql)
        .bind(id)
        .fetch_optional(pool.as_ref())
        .await
    {
        Ok(Some(post)) => (StatusCode::OK, Json(to_detail(&post, Utc::now()))).into_response(),
        Ok(None) => not_found(),
        Err(e) => db_error("updating publish state", e),
    }
}

/// DELETE /api/admin/blog/:id/featured-image - Purge the attached image
pub async fn purge_featured_image(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let existing = match find_post(pool.as_ref(), id).await {
        Ok(post) => post,
        Err(response) => return response,
    };

    let filename = match existing.featured_image {
        Some(f) => f,
        None => {
            return routes::error_response(StatusCode::UNPROCESSABLE_ENTITY, "No featured image to remove")
        }
    };

    if let Err(e) = sqlx::query("UPDATE blog_posts SET featured_image = NULL, updated_at = now() WHERE id = $1")
        .bind(id)
        .execute(pool.as_ref())
        .await
    {
        return db_error("purging featured image", e);
    }

    uploads::purge_file(&filename).await;

    (StatusCode::OK, Json(SuccessResponse { success: true })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_title() {
        let attrs = BlogPostAttrs {
            title: "  ".to_string(),
            slug: None,
            excerpt_html: None,
            content_html: None,
            published_at: None,
            viral: false,
            featured: false,
            featured_image: None,
            reading_time: None,
        };
        let errors = validate_post(&attrs);
        assert!(errors.errors.contains_key("title"));
    }

    #[test]
    fn test_validate_rejects_malformed_slug() {
        let attrs = BlogPostAttrs {
            title: "A Post".to_string(),
            slug: Some("Not A Slug".to_string()),
            excerpt_html: None,
            content_html: None,
            published_at: None,
            viral: false,
            featured: false,
            featured_image: None,
            reading_time: None,
        };
        let errors = validate_post(&attrs);
        assert!(errors.errors.contains_key("slug"));
    }

    #[test]
    fn test_validate_accepts_blank_slug_for_derivation() {
        let attrs = BlogPostAttrs {
            title: "A Post".to_string(),
            slug: Some("".to_string()),
            excerpt_html: None,
            content_html: None,
            published_at: None,
            viral: false,
            featured: false,
            featured_image: None,
            reading_time: None,
        };
        assert!(validate_post(&attrs).is_empty());
    }

    #[test]
    fn test_compute_reading_time_follows_content() {
        let body = vec!["word"; 400].join(" ");
        assert_eq!(compute_reading_time(Some(&format!("<p>{}</p>", body))), Some(2));
        assert_eq!(compute_reading_time(Some("<p>word</p>")), Some(1));
        assert_eq!(compute_reading_time(None), None);
    }

    #[test]
    fn test_public_filters_default_to_published_scope() {
        let mut qb = QueryBuilder::new(select_prefix(false));
        push_public_filters(&mut qb, &PublicBlogQuery::default());
        let sql = qb.sql();
        assert!(sql.contains("published_at IS NOT NULL AND published_at <= now()"));
        assert!(sql.contains("ORDER BY published_at DESC"));
        assert!(!sql.contains("DISTINCT"));
    }

    #[test]
    fn test_public_popular_scope_orders_by_views() {
        let mut qb = QueryBuilder::new(select_prefix(false));
        push_public_filters(
            &mut qb,
            &PublicBlogQuery {
                scope: Some("popular".to_string()),
                ..Default::default()
            },
        );
        assert!(qb.sql().contains("ORDER BY views_count DESC"));
    }

    #[test]
    fn test_search_uses_distinct_and_all_text_columns() {
        let query = PublicBlogQuery {
            q: Some("Rails".to_string()),
            ..Default::default()
        };
        let mut qb = QueryBuilder::new(select_prefix(true));
        push_public_filters(&mut qb, &query);
        let sql = qb.sql();
        assert!(sql.starts_with("SELECT DISTINCT"));
        assert!(sql.contains("title ILIKE"));
        assert!(sql.contains("excerpt_html ILIKE"));
        assert!(sql.contains("content_html ILIKE"));
    }

    #[test]
    fn test_admin_status_filters() {
        for (status, fragment) in [
            ("published", "published_at IS NOT NULL AND published_at <= now()"),
            ("draft", "published_at IS NULL"),
            ("scheduled", "published_at > now()"),
        ] {
            let mut qb = QueryBuilder::new(select_prefix(false));
            push_admin_filters(
                &mut qb,
                &AdminBlogQuery {
                    status: Some(status.to_string()),
                    ..Default::default()
                },
            );
            assert!(qb.sql().contains(fragment), "missing filter for {}", status);
        }
    }

    #[test]
    fn test_detail_reflects_incremented_view_count() {
        let now = Utc::now();
        let mut post = BlogPost {
            id: Uuid::new_v4(),
            title: "A Post".to_string(),
            slug: "a-post".to_string(),
            excerpt_html: None,
            content_html: None,
            published_at: Some(now - chrono::Duration::hours(1)),
            viral: false,
            featured: false,
            views_count: 7,
            reading_time: None,
            featured_image: None,
            created_at: now,
            updated_at: now,
        };
        // The read path bumps the counter and folds the returned value back
        // into the row before building the response.
        post.views_count += 1;
        assert_eq!(to_detail(&post, now).views_count, 8);
    }

    #[test]
    fn test_admin_flag_and_year_filters_compose() {
        let mut qb = QueryBuilder::new(select_prefix(false));
        push_admin_filters(
            &mut qb,
            &AdminBlogQuery {
                viral: Some(true),
                featured: Some(true),
                year: Some(2026),
                ..Default::default()
            },
        );
        let sql = qb.sql();
        assert!(sql.contains("viral = true"));
        assert!(sql.contains("featured = true"));
        assert!(sql.contains("EXTRACT(YEAR FROM published_at)"));
        assert!(sql.contains("ORDER BY created_at DESC"));
    }
}
