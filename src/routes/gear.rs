/**
 * Gear Routes
 * Public gear listing grouped by category plus admin CRUD. Items are
 * manually ordered within each category via `position`.
 */
use axum::{
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::{self, models::GearItem};
use crate::domain::richtext;
use crate::domain::validate::{normalize_category, ValidationErrors};
use crate::routes::{
    db_error, db_unavailable, error_response, not_found, uploads, validation_failed, verify_auth,
    SuccessResponse,
};

const COLUMNS: &str = "id, name, description_html, category, price, featured, position, \
                       image_url, product_image, affiliate_link, created_at, updated_at";

const HOME_SECTION_LIMIT: i64 = 6;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicGearQuery {
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminGearQuery {
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub price_range: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GearItemView {
    #[serde(flatten)]
    pub item: GearItem,
    pub product_image_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicGearResponse {
    pub items: Vec<GearItemView>,
    pub categories: Vec<String>,
    pub featured: Vec<GearItemView>,
    pub tech: Vec<GearItemView>,
    pub fitness: Vec<GearItemView>,
    pub everyday: Vec<GearItemView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminGearResponse {
    pub items: Vec<GearItemView>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGearItemRequest {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub price: Option<Decimal>,
    pub featured: Option<bool>,
    pub position: Option<i32>,
    pub image_url: Option<String>,
    pub product_image: Option<String>,
    pub affiliate_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGearItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub featured: Option<bool>,
    pub position: Option<i32>,
    pub image_url: Option<String>,
    pub product_image: Option<String>,
    pub affiliate_link: Option<String>,
}

fn to_view(item: GearItem) -> GearItemView {
    GearItemView {
        product_image_url: uploads::resolve_image_url(
            item.product_image.as_deref(),
            item.image_url.as_deref(),
        ),
        item,
    }
}

// ============================================================================
// Validation
// ============================================================================

struct GearAttrs {
    name: String,
    category: String,
    price: Option<Decimal>,
    position: Option<i32>,
    affiliate_link: Option<String>,
}

fn validate_gear(attrs: &GearAttrs) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.require("name", &attrs.name);
    errors.require("category", &attrs.category);
    if let Some(price) = attrs.price {
        if price < Decimal::ZERO {
            errors.add("price", "must be greater than or equal to 0");
        }
    }
    errors.check_non_negative("position", attrs.position);
    errors.check_optional_url("affiliate_link", attrs.affiliate_link.as_deref());
    errors
}

// ============================================================================
// Query building
// ============================================================================

fn push_admin_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &AdminGearQuery) {
    qb.push(" WHERE 1=1");

    if let Some(category) = query.category.as_ref().filter(|c| !c.trim().is_empty()) {
        qb.push(" AND category = ");
        qb.push_bind(normalize_category(category));
    }
    if query.featured == Some(true) {
        qb.push(" AND featured = true");
    }
    match query.price_range.as_deref() {
        Some("under_100") => {
            qb.push(" AND price < 100");
        }
        Some("100_500") => {
            qb.push(" AND price >= 100 AND price < 500");
        }
        Some("500_1000") => {
            qb.push(" AND price >= 500 AND price < 1000");
        }
        Some("over_1000") => {
            qb.push(" AND price >= 1000");
        }
        _ => {}
    }
    if let Some(search) = query.search.as_ref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        qb.push(" AND (name ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR description_html ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }

    qb.push(" ORDER BY position ASC, created_at DESC");
}

async fn fetch_items(pool: &PgPool, sql: &str) -> Vec<GearItem> {
    sqlx::query_as::<_, GearItem>(sql)
        .fetch_all(pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Database error listing gear: {}", e);
            vec![]
        })
}

async fn find_item(pool: &PgPool, id: Uuid) -> Result<GearItem, Response> {
    let sql = format!("SELECT {} FROM gear_items WHERE id = $1", COLUMNS);
    match sqlx::query_as::<_, GearItem>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
    {
        Ok(Some(item)) => Ok(item),
        Ok(None) => Err(not_found()),
        Err(e) => Err(db_error("fetching gear item", e)),
    }
}

/// Position 0 or absent means "append to the category". Checked on every
/// save, not just creation.
fn needs_position_assignment(position: Option<i32>) -> bool {
    !matches!(position, Some(p) if p > 0)
}

/// Next position within a category: max + 1, starting from 1. Concurrent
/// creates can collide; ordering ties are broken by created_at.
async fn next_position(pool: &PgPool, category: &str) -> Result<i32, sqlx::Error> {
    let max: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(position), 0) FROM gear_items WHERE category = $1",
    )
    .bind(category)
    .fetch_one(pool)
    .await?;
    Ok(max + 1)
}

// ============================================================================
// Public handlers
// ============================================================================

/// GET /api/gear - Gear (optionally by category) plus the category list,
/// featured picks, and per-section highlights for the home page
pub async fn list_gear(Query(query): Query<PublicGearQuery>) -> Response {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let items: Vec<GearItem> = match query.category.as_ref().filter(|c| !c.trim().is_empty()) {
        Some(category) => {
            let sql = format!(
                "SELECT {} FROM gear_items WHERE category = $1 \
                 ORDER BY position ASC, created_at DESC",
                COLUMNS
            );
            sqlx::query_as(&sql)
                .bind(normalize_category(category))
                .fetch_all(pool.as_ref())
                .await
                .unwrap_or_else(|e| {
                    tracing::error!("Database error listing gear: {}", e);
                    vec![]
                })
        }
        None => {
            fetch_items(
                pool.as_ref(),
                &format!(
                    "SELECT {} FROM gear_items ORDER BY position ASC, created_at DESC",
                    COLUMNS
                ),
            )
            .await
        }
    };

    let categories: Vec<String> =
        sqlx::query_scalar("SELECT DISTINCT category FROM gear_items ORDER BY category")
            .fetch_all(pool.as_ref())
            .await
            .unwrap_or_else(|e| {
                tracing::error!("Database error listing gear categories: {}", e);
                vec![]
            });

    let featured = fetch_items(
        pool.as_ref(),
        &format!(
            "SELECT {} FROM gear_items WHERE featured = true \
             ORDER BY position ASC, created_at DESC LIMIT {}",
            COLUMNS, HOME_SECTION_LIMIT
        ),
    )
    .await;

    // Fixed home-page sections; other categories appear via the filter.
    let tech = fetch_section(pool.as_ref(), "tech").await;
    let fitness = fetch_section(pool.as_ref(), "fitness").await;
    let everyday = fetch_section(pool.as_ref(), "everyday").await;

    (
        StatusCode::OK,
        Json(PublicGearResponse {
            items: items.into_iter().map(to_view).collect(),
            categories,
            featured: featured.into_iter().map(to_view).collect(),
            tech: tech.into_iter().map(to_view).collect(),
            fitness: fitness.into_iter().map(to_view).collect(),
            everyday: everyday.into_iter().map(to_view).collect(),
        }),
    )
        .into_response()
}

async fn fetch_section(pool: &PgPool, category: &str) -> Vec<GearItem> {
    let sql = format!(
        "SELECT {} FROM gear_items WHERE category = $1 \
         ORDER BY position ASC, created_at DESC LIMIT {}",
        COLUMNS, HOME_SECTION_LIMIT
    );
    sqlx::query_as(&sql)
        .bind(category)
        .fetch_all(pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Database error listing gear section {}: {}", category, e);
            vec![]
        })
}

// ============================================================================
// Admin handlers
// ============================================================================

/// GET /api/admin/gear
pub async fn admin_list_gear(headers: HeaderMap, Query(query): Query<AdminGearQuery>) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let mut qb = QueryBuilder::new(format!("SELECT {} FROM gear_items", COLUMNS));
    push_admin_filters(&mut qb, &query);

    let items: Vec<GearItem> = match qb.build_query_as().fetch_all(pool.as_ref()).await {
        Ok(rows) => rows,
        Err(e) => return db_error("listing gear", e),
    };

    let items: Vec<GearItemView> = items.into_iter().map(to_view).collect();
    let total = items.len();

    (StatusCode::OK, Json(AdminGearResponse { items, total })).into_response()
}

/// GET /api/admin/gear/:id
pub async fn admin_get_gear_item(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match find_item(pool.as_ref(), id).await {
        Ok(item) => (StatusCode::OK, Json(to_view(item))).into_response(),
        Err(response) => response,
    }
}

/// POST /api/admin/gear
pub async fn create_gear_item(
    headers: HeaderMap,
    Json(payload): Json<CreateGearItemRequest>,
) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let category = normalize_category(&payload.category);

    let attrs = GearAttrs {
        name: payload.name.trim().to_string(),
        category: category.clone(),
        price: payload.price,
        position: payload.position,
        affiliate_link: payload.affiliate_link.clone(),
    };

    let errors = validate_gear(&attrs);
    if !errors.is_empty() {
        return validation_failed(errors);
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let position = if needs_position_assignment(payload.position) {
        match next_position(pool.as_ref(), &category).await {
            Ok(p) => p,
            Err(e) => return db_error("assigning gear position", e),
        }
    } else {
        payload.position.unwrap_or_default()
    };

    let sql = format!(
        "INSERT INTO gear_items \
         (name, description_html, category, price, featured, position, image_url, \
          product_image, affiliate_link) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
        COLUMNS
    );

    match sqlx::query_as::<_, GearItem>(&sql)
        .bind(&attrs.name)
        .bind(
            payload
                .description
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(richtext::sanitize),
        )
        .bind(&category)
        .bind(payload.price)
        .bind(payload.featured.unwrap_or(false))
        .bind(position)
        .bind(&payload.image_url)
        .bind(&payload.product_image)
        .bind(&payload.affiliate_link)
        .fetch_one(pool.as_ref())
        .await
    {
        Ok(item) => (StatusCode::CREATED, Json(to_view(item))).into_response(),
        Err(e) => db_error("creating gear item", e),
    }
}

/// PATCH /api/admin/gear/:id
pub async fn update_gear_item(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateGearItemRequest>,
) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let existing = match find_item(pool.as_ref(), id).await {
        Ok(item) => item,
        Err(response) => return response,
    };

    let category = payload
        .category
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .map(normalize_category)
        .unwrap_or(existing.category);
    let price = payload.price.or(existing.price);
    let merged_position = payload.position.unwrap_or(existing.position);
    let position = if needs_position_assignment(Some(merged_position)) {
        match next_position(pool.as_ref(), &category).await {
            Ok(p) => p,
            Err(e) => return db_error("assigning gear position", e),
        }
    } else {
        merged_position
    };
    let affiliate_link = payload.affiliate_link.or(existing.affiliate_link);

    let attrs = GearAttrs {
        name: payload
            .name
            .map(|n| n.trim().to_string())
            .unwrap_or(existing.name),
        category: category.clone(),
        price,
        position: Some(position),
        affiliate_link: affiliate_link.clone(),
    };

    let errors = validate_gear(&attrs);
    if !errors.is_empty() {
        return validation_failed(errors);
    }

    let description_html = payload
        .description
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(richtext::sanitize)
        .or(existing.description_html);

    let sql = format!(
        "UPDATE gear_items SET \
         name = $1, description_html = $2, category = $3, price = $4, featured = $5, \
         position = $6, image_url = $7, product_image = $8, affiliate_link = $9, \
         updated_at = now() \
         WHERE id = $10 RETURNING {}",
        COLUMNS
    );

    match sqlx::query_as::<_, GearItem>(&sql)
        .bind(&attrs.name)
        .bind(&description_html)
        .bind(&category)
        .bind(price)
        .bind(payload.featured.unwrap_or(existing.featured))
        .bind(position)
        .bind(payload.image_url.or(existing.image_url))
        .bind(payload.product_image.or(existing.product_image))
        .bind(&affiliate_link)
        .bind(id)
        .fetch_one(pool.as_ref())
        .await
    {
        Ok(item) => (StatusCode::OK, Json(to_view(item))).into_response(),
        Err(e) => db_error("updating gear item", e),
    }
}

/// DELETE /api/admin/gear/:id
pub async fn delete_gear_item(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query("DELETE FROM gear_items WHERE id = $1")
        .bind(id)
        .execute(pool.as_ref())
        .await
    {
        Ok(result) if result.rows_affected() == 0 => not_found(),
        Ok(_) => (StatusCode::OK, Json(SuccessResponse { success: true })).into_response(),
        Err(e) => db_error("deleting gear item", e),
    }
}

/// DELETE /api/admin/gear/:id/product-image
pub async fn purge_product_image(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let existing = match find_item(pool.as_ref(), id).await {
        Ok(item) => item,
        Err(response) => return response,
    };

    let filename = match existing.product_image {
        Some(f) => f,
        None => {
            return error_response(StatusCode::UNPROCESSABLE_ENTITY, "No product image to remove")
        }
    };

    if let Err(e) =
        sqlx::query("UPDATE gear_items SET product_image = NULL, updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(pool.as_ref())
            .await
    {
        return db_error("purging product image", e);
    }

    uploads::purge_file(&filename).await;

    (StatusCode::OK, Json(SuccessResponse { success: true })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_attrs() -> GearAttrs {
        GearAttrs {
            name: "Standing Desk".to_string(),
            category: "tech".to_string(),
            price: Some(Decimal::new(49900, 2)),
            position: Some(1),
            affiliate_link: None,
        }
    }

    #[test]
    fn test_valid_gear_passes() {
        assert!(validate_gear(&base_attrs()).is_empty());
    }

    #[test]
    fn test_position_zero_or_absent_gets_reassigned() {
        // Zero means "append to the category" whether it arrives on create
        // or survives a merge on update.
        assert!(needs_position_assignment(None));
        assert!(needs_position_assignment(Some(0)));
        assert!(needs_position_assignment(Some(-1)));
        assert!(!needs_position_assignment(Some(3)));
    }

    #[test]
    fn test_name_and_category_required() {
        let mut attrs = base_attrs();
        attrs.name = " ".to_string();
        attrs.category = "".to_string();
        let errors = validate_gear(&attrs);
        assert!(errors.errors.contains_key("name"));
        assert!(errors.errors.contains_key("category"));
    }

    #[test]
    fn test_negative_price_rejected() {
        let mut attrs = base_attrs();
        attrs.price = Some(Decimal::new(-100, 2));
        assert!(validate_gear(&attrs).errors.contains_key("price"));

        attrs.price = Some(Decimal::ZERO);
        assert!(validate_gear(&attrs).is_empty());

        attrs.price = None;
        assert!(validate_gear(&attrs).is_empty());
    }

    #[test]
    fn test_negative_position_rejected() {
        let mut attrs = base_attrs();
        attrs.position = Some(-1);
        assert!(validate_gear(&attrs).errors.contains_key("position"));
    }

    #[test]
    fn test_price_range_filters() {
        for (range, fragment) in [
            ("under_100", "price < 100"),
            ("100_500", "price >= 100 AND price < 500"),
            ("500_1000", "price >= 500 AND price < 1000"),
            ("over_1000", "price >= 1000"),
        ] {
            let mut qb = QueryBuilder::new(format!("SELECT {} FROM gear_items", COLUMNS));
            push_admin_filters(
                &mut qb,
                &AdminGearQuery {
                    price_range: Some(range.to_string()),
                    ..Default::default()
                },
            );
            assert!(qb.sql().contains(fragment), "range {} missing fragment", range);
        }
    }

    #[test]
    fn test_unknown_price_range_ignored() {
        let mut qb = QueryBuilder::new(format!("SELECT {} FROM gear_items", COLUMNS));
        push_admin_filters(
            &mut qb,
            &AdminGearQuery {
                price_range: Some("cheap".to_string()),
                ..Default::default()
            },
        );
        let sql = qb.sql();
        assert!(!sql.contains("price <") && !sql.contains("price >="));
    }

    #[test]
    fn test_admin_ordering() {
        let mut qb = QueryBuilder::new(format!("SELECT {} FROM gear_items", COLUMNS));
        push_admin_filters(&mut qb, &AdminGearQuery::default());
        assert!(qb.sql().ends_with("ORDER BY position ASC, created_at DESC"));
    }
}
