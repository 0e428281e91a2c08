/**
 * Book Routes
 * Public reading-list endpoint plus admin CRUD over books.
 */
use axum::{
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::{self, models::Book};
use crate::domain::richtext::{self, RichText};
use crate::domain::validate::{normalize_category, ValidationErrors};
use crate::routes::{
    db_error, db_unavailable, error_response, not_found, uploads, validation_failed, verify_auth,
    SuccessResponse,
};

const COLUMNS: &str = "id, title, author, category, rating, review_html, notes_html, read_date, \
                       featured, isbn, cover_url, cover_image, affiliate_link, created_at, updated_at";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicBooksQuery {
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminBooksQuery {
    pub category: Option<String>,
    pub rating: Option<i32>,
    pub featured: Option<bool>,
    pub reviewed: Option<bool>,
    pub search: Option<String>,
}

/// Book with computed display fields
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookView {
    #[serde(flatten)]
    pub book: Book,
    pub cover_image_url: Option<String>,
    pub has_review: bool,
    pub has_notes: bool,
    pub review_excerpt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicBooksResponse {
    pub books: Vec<BookView>,
    pub categories: Vec<String>,
    pub featured: Vec<BookView>,
    pub top_rated: Vec<BookView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminBooksResponse {
    pub books: Vec<BookView>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    pub category: Option<String>,
    pub rating: Option<i32>,
    pub review: Option<String>,
    pub notes: Option<String>,
    pub read_date: Option<NaiveDate>,
    pub featured: Option<bool>,
    pub isbn: Option<String>,
    pub cover_url: Option<String>,
    pub cover_image: Option<String>,
    pub affiliate_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub rating: Option<i32>,
    pub review: Option<String>,
    pub notes: Option<String>,
    pub read_date: Option<NaiveDate>,
    pub featured: Option<bool>,
    pub isbn: Option<String>,
    pub cover_url: Option<String>,
    pub cover_image: Option<String>,
    pub affiliate_link: Option<String>,
}

fn to_view(book: Book) -> BookView {
    let review = RichText::new(book.review_html.as_deref());
    BookView {
        cover_image_url: uploads::resolve_image_url(
            book.cover_image.as_deref(),
            book.cover_url.as_deref(),
        ),
        has_review: review.is_present(),
        has_notes: RichText::new(book.notes_html.as_deref()).is_present(),
        review_excerpt: review.excerpt(150),
        book,
    }
}

// ============================================================================
// Validation
// ============================================================================

struct BookAttrs {
    title: String,
    author: String,
    rating: Option<i32>,
    affiliate_link: Option<String>,
}

fn validate_book(attrs: &BookAttrs) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.require("title", &attrs.title);
    errors.require("author", &attrs.author);
    errors.check_range("rating", attrs.rating, 1, 5);
    errors.check_optional_url("affiliate_link", attrs.affiliate_link.as_deref());
    errors
}

// ============================================================================
// Query building
// ============================================================================

fn push_admin_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &AdminBooksQuery) {
    qb.push(" WHERE 1=1");

    if let Some(category) = query.category.as_ref().filter(|c| !c.trim().is_empty()) {
        qb.push(" AND category = ");
        qb.push_bind(normalize_category(category));
    }
    if let Some(rating) = query.rating {
        qb.push(" AND rating = ");
        qb.push_bind(rating);
    }
    if query.featured == Some(true) {
        qb.push(" AND featured = true");
    }
    if query.reviewed == Some(true) {
        qb.push(" AND review_html IS NOT NULL");
    }
    if let Some(search) = query.search.as_ref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        qb.push(" AND (title ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR author ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }

    qb.push(" ORDER BY read_date DESC NULLS LAST, created_at DESC");
}

async fn fetch_books(pool: &PgPool, sql: &str) -> Vec<Book> {
    sqlx::query_as::<_, Book>(sql)
        .fetch_all(pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Database error listing books: {}", e);
            vec![]
        })
}

async fn find_book(pool: &PgPool, id: Uuid) -> Result<Book, Response> {
    let sql = format!("SELECT {} FROM books WHERE id = $1", COLUMNS);
    match sqlx::query_as::<_, Book>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
    {
        Ok(Some(book)) => Ok(book),
        Ok(None) => Err(not_found()),
        Err(e) => Err(db_error("fetching book", e)),
    }
}

// ============================================================================
// Public handlers
// ============================================================================

/// GET /api/books - Reviewed books (optionally by category) plus the
/// featured and top-rated shelves
pub async fn list_books(Query(query): Query<PublicBooksQuery>) -> Response {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    // "Reviewed" scope: only books with a review, newest read first.
    let books: Vec<Book> = match query.category.as_ref().filter(|c| !c.trim().is_empty()) {
        Some(category) => {
            let sql = format!(
                "SELECT {} FROM books WHERE review_html IS NOT NULL AND category = $1 \
                 ORDER BY read_date DESC NULLS LAST",
                COLUMNS
            );
            sqlx::query_as(&sql)
                .bind(normalize_category(category))
                .fetch_all(pool.as_ref())
                .await
                .unwrap_or_else(|e| {
                    tracing::error!("Database error listing books: {}", e);
                    vec![]
                })
        }
        None => {
            fetch_books(
                pool.as_ref(),
                &format!(
                    "SELECT {} FROM books WHERE review_html IS NOT NULL \
                     ORDER BY read_date DESC NULLS LAST",
                    COLUMNS
                ),
            )
            .await
        }
    };

    let categories: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT category FROM books WHERE category IS NOT NULL ORDER BY category",
    )
    .fetch_all(pool.as_ref())
    .await
    .unwrap_or_else(|e| {
        tracing::error!("Database error listing book categories: {}", e);
        vec![]
    });

    let featured = fetch_books(
        pool.as_ref(),
        &format!(
            "SELECT {} FROM books WHERE featured = true ORDER BY read_date DESC NULLS LAST LIMIT 3",
            COLUMNS
        ),
    )
    .await;

    let top_rated = fetch_books(
        pool.as_ref(),
        &format!(
            "SELECT {} FROM books WHERE rating BETWEEN 4 AND 5 \
             ORDER BY rating DESC, read_date DESC NULLS LAST LIMIT 5",
            COLUMNS
        ),
    )
    .await;

    (
        StatusCode::OK,
        Json(PublicBooksResponse {
            books: books.into_iter().map(to_view).collect(),
            categories,
            featured: featured.into_iter().map(to_view).collect(),
            top_rated: top_rated.into_iter().map(to_view).collect(),
        }),
    )
        .into_response()
}

// ============================================================================
// Admin handlers
// ============================================================================

/// GET /api/admin/books
pub async fn admin_list_books(
    headers: HeaderMap,
    Query(query): Query<AdminBooksQuery>,
) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let mut qb = QueryBuilder::new(format!("SELECT {} FROM books", COLUMNS));
    push_admin_filters(&mut qb, &query);

    let books: Vec<Book> = match qb.build_query_as().fetch_all(pool.as_ref()).await {
        Ok(rows) => rows,
        Err(e) => return db_error("listing books", e),
    };

    let books: Vec<BookView> = books.into_iter().map(to_view).collect();
    let total = books.len();

    (StatusCode::OK, Json(AdminBooksResponse { books, total })).into_response()
}

/// GET /api/admin/books/:id
pub async fn admin_get_book(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match find_book(pool.as_ref(), id).await {
        Ok(book) => (StatusCode::OK, Json(to_view(book))).into_response(),
        Err(response) => response,
    }
}

/// POST /api/admin/books
pub async fn create_book(headers: HeaderMap, Json(payload): Json<CreateBookRequest>) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let category = payload
        .category
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .map(normalize_category);

    let attrs = BookAttrs {
        title: payload.title.trim().to_string(),
        author: payload.author.trim().to_string(),
        rating: payload.rating,
        affiliate_link: payload.affiliate_link.clone(),
    };

    let errors = validate_book(&attrs);
    if !errors.is_empty() {
        return validation_failed(errors);
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let sql = format!(
        "INSERT INTO books \
         (title, author, category, rating, review_html, notes_html, read_date, featured, isbn, \
          cover_url, cover_image, affiliate_link) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING {}",
        COLUMNS
    );

    match sqlx::query_as::<_, Book>(&sql)
        .bind(&attrs.title)
        .bind(&attrs.author)
        .bind(&category)
        .bind(attrs.rating)
        .bind(payload.review.as_deref().filter(|s| !s.trim().is_empty()).map(richtext::sanitize))
        .bind(payload.notes.as_deref().filter(|s| !s.trim().is_empty()).map(richtext::sanitize))
        .bind(payload.read_date)
        .bind(payload.featured.unwrap_or(false))
        .bind(&payload.isbn)
        .bind(&payload.cover_url)
        .bind(&payload.cover_image)
        .bind(&payload.affiliate_link)
        .fetch_one(pool.as_ref())
        .await
    {
        Ok(book) => (StatusCode::CREATED, Json(to_view(book))).into_response(),
        Err(e) => db_error("creating book", e),
    }
}

/// PATCH /api/admin/books/:id
pub async fn update_book(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBookRequest>,
) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let existing = match find_book(pool.as_ref(), id).await {
        Ok(book) => book,
        Err(response) => return response,
    };

    let category = payload
        .category
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .map(normalize_category)
        .or(existing.category);
    let rating = payload.rating.or(existing.rating);
    let affiliate_link = payload.affiliate_link.or(existing.affiliate_link);

    let attrs = BookAttrs {
        title: payload
            .title
            .map(|t| t.trim().to_string())
            .unwrap_or(existing.title),
        author: payload
            .author
            .map(|a| a.trim().to_string())
            .unwrap_or(existing.author),
        rating,
        affiliate_link: affiliate_link.clone(),
    };

    let errors = validate_book(&attrs);
    if !errors.is_empty() {
        return validation_failed(errors);
    }

    let review_html = payload
        .review
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(richtext::sanitize)
        .or(existing.review_html);
    let notes_html = payload
        .notes
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(richtext::sanitize)
        .or(existing.notes_html);

    let sql = format!(
        "UPDATE books SET \
         title = $1, author = $2, category = $3, rating = $4, review_html = $5, notes_html = $6, \
         read_date = $7, featured = $8, isbn = $9, cover_url = $10, cover_image = $11, \
         affiliate_link = $12, updated_at = now() \
         WHERE id = $13 RETURNING {}",
        COLUMNS
    );

    match sqlx::query_as::<_, Book>(&sql)
        .bind(&attrs.title)
        .bind(&attrs.author)
        .bind(&category)
        .bind(rating)
        .bind(&review_html)
        .bind(&notes_html)
        .bind(payload.read_date.or(existing.read_date))
        .bind(payload.featured.unwrap_or(existing.featured))
        .bind(payload.isbn.or(existing.isbn))
        .bind(payload.cover_url.or(existing.cover_url))
        .bind(payload.cover_image.or(existing.cover_image))
        .bind(&affiliate_link)
        .bind(id)
        .fetch_one(pool.as_ref())
        .await
    {
        Ok(book) => (StatusCode::OK, Json(to_view(book))).into_response(),
        Err(e) => db_error("updating book", e),
    }
}

/// DELETE /api/admin/books/:id
pub async fn delete_book(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query("DELETE FROM books WHERE id = $1")
        .bind(id)
        .execute(pool.as_ref())
        .await
    {
        Ok(result) if result.rows_affected() == 0 => not_found(),
        Ok(_) => (StatusCode::OK, Json(SuccessResponse { success: true })).into_response(),
        Err(e) => db_error("deleting book", e),
    }
}

/// DELETE /api/admin/books/:id/cover-image - Purge the uploaded cover
pub async fn purge_cover_image(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let existing = match find_book(pool.as_ref(), id).await {
        Ok(book) => book,
        Err(response) => return response,
    };

    let filename = match existing.cover_image {
        Some(f) => f,
        None => {
            return error_response(StatusCode::UNPROCESSABLE_ENTITY, "No cover image to remove")
        }
    };

    if let Err(e) =
        sqlx::query("UPDATE books SET cover_image = NULL, updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(pool.as_ref())
            .await
    {
        return db_error("purging cover image", e);
    }

    uploads::purge_file(&filename).await;

    (StatusCode::OK, Json(SuccessResponse { success: true })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_attrs() -> BookAttrs {
        BookAttrs {
            title: "The Dispossessed".to_string(),
            author: "Ursula K. Le Guin".to_string(),
            rating: Some(5),
            affiliate_link: None,
        }
    }

    #[test]
    fn test_valid_book_passes() {
        assert!(validate_book(&base_attrs()).is_empty());
    }

    #[test]
    fn test_title_and_author_required() {
        let mut attrs = base_attrs();
        attrs.title = "".to_string();
        attrs.author = "  ".to_string();
        let errors = validate_book(&attrs);
        assert!(errors.errors.contains_key("title"));
        assert!(errors.errors.contains_key("author"));
    }

    #[test]
    fn test_rating_bounds() {
        for rating in [1, 2, 3, 4, 5] {
            let mut attrs = base_attrs();
            attrs.rating = Some(rating);
            assert!(validate_book(&attrs).is_empty(), "rating {} should pass", rating);
        }
        for rating in [0, 6] {
            let mut attrs = base_attrs();
            attrs.rating = Some(rating);
            assert!(
                validate_book(&attrs).errors.contains_key("rating"),
                "rating {} should fail",
                rating
            );
        }
        let mut attrs = base_attrs();
        attrs.rating = None;
        assert!(validate_book(&attrs).is_empty());
    }

    #[test]
    fn test_affiliate_link_format() {
        let mut attrs = base_attrs();
        attrs.affiliate_link = Some("https://example.com".to_string());
        assert!(validate_book(&attrs).is_empty());

        attrs.affiliate_link = Some("not-a-url".to_string());
        assert!(validate_book(&attrs).errors.contains_key("affiliate_link"));
    }

    #[test]
    fn test_admin_filters_compose() {
        let mut qb = QueryBuilder::new(format!("SELECT {} FROM books", COLUMNS));
        push_admin_filters(
            &mut qb,
            &AdminBooksQuery {
                category: Some("Fiction".to_string()),
                rating: Some(5),
                featured: Some(true),
                reviewed: Some(true),
                search: Some("guin".to_string()),
            },
        );
        let sql = qb.sql();
        assert!(sql.contains("category = "));
        assert!(sql.contains("rating = "));
        assert!(sql.contains("featured = true"));
        assert!(sql.contains("review_html IS NOT NULL"));
        assert!(sql.contains("title ILIKE"));
        assert!(sql.contains("author ILIKE"));
        assert!(sql.contains("ORDER BY read_date DESC NULLS LAST, created_at DESC"));
    }

    #[test]
    fn test_admin_filters_default_to_plain_list() {
        let mut qb = QueryBuilder::new(format!("SELECT {} FROM books", COLUMNS));
        push_admin_filters(&mut qb, &AdminBooksQuery::default());
        let sql = qb.sql();
        assert!(sql.contains("WHERE 1=1 ORDER BY"));
    }
}
