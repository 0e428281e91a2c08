/**
 * Sport Activity Routes
 * Public training log (benchmarks, recent workouts, upcoming events) with
 * a per-sport detail page, plus admin CRUD.
 */
use axum::{
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::{self, models::SportActivity};
use crate::domain::richtext;
use crate::domain::sport::{self, ActivityCategory, SportType};
use crate::domain::validate::ValidationErrors;
use crate::routes::{
    db_error, db_unavailable, not_found, validation_failed, verify_auth, SuccessResponse,
};

const COLUMNS: &str = "id, sport_type, sub_type, category, title, value, unit, date, \
                       description_html, personal_record, event_name, location, result_url, \
                       created_at, updated_at";

const RECENT_WORKOUTS_LIMIT: i64 = 15;
const UPCOMING_EVENTS_LIMIT: i64 = 10;
const DETAIL_WORKOUTS_LIMIT: i64 = 20;

const CATEGORIES: &[&str] = &["benchmark", "workout", "event"];
const SUB_TYPES: &[&str] = &["road", "trail"];

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSportsQuery {
    pub sport_type: Option<String>,
    pub category: Option<String>,
    pub personal_record: Option<bool>,
    pub search: Option<String>,
}

/// Activity with computed display fields
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SportActivityView {
    #[serde(flatten)]
    pub activity: SportActivity,
    pub sport_display_name: String,
    pub sport_emoji: &'static str,
    pub formatted_value: String,
    pub upcoming: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSportsResponse {
    pub crossfit_benchmarks: Vec<SportActivityView>,
    pub hyrox_benchmarks: Vec<SportActivityView>,
    pub running_benchmarks: Vec<SportActivityView>,
    pub recent_workouts: Vec<SportActivityView>,
    pub upcoming_events: Vec<SportActivityView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SportDetailResponse {
    pub sport_type: &'static str,
    pub display_name: String,
    pub emoji: &'static str,
    pub benchmarks: Vec<SportActivityView>,
    pub workouts: Vec<SportActivityView>,
    pub upcoming_events: Vec<SportActivityView>,
    pub past_events: Vec<SportActivityView>,
    pub personal_records: Vec<SportActivityView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSportsResponse {
    pub activities: Vec<SportActivityView>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSportActivityRequest {
    pub sport_type: String,
    pub sub_type: Option<String>,
    pub category: String,
    pub title: String,
    pub value: String,
    pub unit: String,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub personal_record: Option<bool>,
    pub event_name: Option<String>,
    pub location: Option<String>,
    pub result_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSportActivityRequest {
    pub sport_type: Option<String>,
    pub sub_type: Option<String>,
    pub category: Option<String>,
    pub title: Option<String>,
    pub value: Option<String>,
    pub unit: Option<String>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
    pub personal_record: Option<bool>,
    pub event_name: Option<String>,
    pub location: Option<String>,
    pub result_url: Option<String>,
}

fn to_view(activity: SportActivity) -> SportActivityView {
    let today = Utc::now().date_naive();
    SportActivityView {
        sport_display_name: sport::sport_display_name(
            &activity.sport_type,
            activity.sub_type.as_deref(),
        ),
        sport_emoji: sport::sport_emoji(&activity.sport_type),
        formatted_value: sport::formatted_value(&activity.value, &activity.unit),
        upcoming: sport::is_upcoming(&activity.category, activity.date, today),
        activity,
    }
}

// ============================================================================
// Validation
// ============================================================================

struct SportActivityAttrs {
    sport_type: String,
    sub_type: Option<String>,
    category: String,
    title: String,
    value: String,
    unit: String,
    result_url: Option<String>,
}

fn validate_activity(attrs: &SportActivityAttrs) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.require("sport_type", &attrs.sport_type);
    errors.check_inclusion("sport_type", &attrs.sport_type, &SportType::all_names());
    if let Some(sub) = attrs.sub_type.as_deref().filter(|s| !s.is_empty()) {
        errors.check_inclusion("sub_type", sub, SUB_TYPES);
    }
    errors.require("category", &attrs.category);
    errors.check_inclusion("category", &attrs.category, CATEGORIES);
    errors.require("title", &attrs.title);
    errors.require("value", &attrs.value);
    errors.require("unit", &attrs.unit);
    errors.check_optional_url("result_url", attrs.result_url.as_deref());
    errors
}

// ============================================================================
// Query building
// ============================================================================

fn push_admin_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &AdminSportsQuery) {
    qb.push(" WHERE 1=1");

    if let Some(sport) = query
        .sport_type
        .as_ref()
        .and_then(|s| SportType::parse(s))
    {
        qb.push(" AND sport_type = ");
        qb.push_bind(sport.as_str());
    }
    if let Some(category) = query
        .category
        .as_ref()
        .and_then(|c| ActivityCategory::parse(c))
    {
        qb.push(" AND category = ");
        qb.push_bind(category.as_str());
    }
    if query.personal_record == Some(true) {
        qb.push(" AND personal_record = true");
    }
    if let Some(search) = query.search.as_ref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        qb.push(" AND (title ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR description_html ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }

    qb.push(" ORDER BY date DESC, created_at DESC");
}

async fn fetch_activities(pool: &PgPool, sql: &str) -> Vec<SportActivity> {
    sqlx::query_as::<_, SportActivity>(sql)
        .fetch_all(pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Database error listing sport activities: {}", e);
            vec![]
        })
}

async fn fetch_benchmarks(pool: &PgPool, sport: SportType) -> Vec<SportActivity> {
    let sql = format!(
        "SELECT {} FROM sport_activities \
         WHERE sport_type = $1 AND category = 'benchmark' \
         ORDER BY date DESC",
        COLUMNS
    );
    sqlx::query_as(&sql)
        .bind(sport.as_str())
        .fetch_all(pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Database error listing benchmarks: {}", e);
            vec![]
        })
}

async fn find_activity(pool: &PgPool, id: Uuid) -> Result<SportActivity, Response> {
    let sql = format!("SELECT {} FROM sport_activities WHERE id = $1", COLUMNS);
    match sqlx::query_as::<_, SportActivity>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
    {
        Ok(Some(activity)) => Ok(activity),
        Ok(None) => Err(not_found()),
        Err(e) => Err(db_error("fetching sport activity", e)),
    }
}

// ============================================================================
// Public handlers
// ============================================================================

/// GET /api/sports - Benchmarks per sport, the recent training log, and
/// upcoming events
pub async fn list_sports() -> Response {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let crossfit = fetch_benchmarks(pool.as_ref(), SportType::Crossfit).await;
    let hyrox = fetch_benchmarks(pool.as_ref(), SportType::Hyrox).await;
    let running = fetch_benchmarks(pool.as_ref(), SportType::Running).await;

    let recent_workouts = fetch_activities(
        pool.as_ref(),
        &format!(
            "SELECT {} FROM sport_activities WHERE category = 'workout' \
             ORDER BY date DESC, created_at DESC LIMIT {}",
            COLUMNS, RECENT_WORKOUTS_LIMIT
        ),
    )
    .await;

    let upcoming_events = fetch_activities(
        pool.as_ref(),
        &format!(
            "SELECT {} FROM sport_activities \
             WHERE category = 'event' AND date >= CURRENT_DATE \
             ORDER BY date ASC LIMIT {}",
            COLUMNS, UPCOMING_EVENTS_LIMIT
        ),
    )
    .await;

    (
        StatusCode::OK,
        Json(PublicSportsResponse {
            crossfit_benchmarks: crossfit.into_iter().map(to_view).collect(),
            hyrox_benchmarks: hyrox.into_iter().map(to_view).collect(),
            running_benchmarks: running.into_iter().map(to_view).collect(),
            recent_workouts: recent_workouts.into_iter().map(to_view).collect(),
            upcoming_events: upcoming_events.into_iter().map(to_view).collect(),
        }),
    )
        .into_response()
}

/// GET /api/sports/{sport_type} - Everything for one sport. Unknown sport
/// types 404.
pub async fn get_sport_detail(Path(sport_type): Path<String>) -> Response {
    let sport = match SportType::parse(&sport_type) {
        Some(s) => s,
        None => return not_found(),
    };

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let benchmarks = fetch_benchmarks(pool.as_ref(), sport).await;

    let workouts_sql = format!(
        "SELECT {} FROM sport_activities \
         WHERE sport_type = $1 AND category = 'workout' \
         ORDER BY date DESC LIMIT {}",
        COLUMNS, DETAIL_WORKOUTS_LIMIT
    );
    let workouts: Vec<SportActivity> = sqlx::query_as(&workouts_sql)
        .bind(sport.as_str())
        .fetch_all(pool.as_ref())
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Database error listing workouts: {}", e);
            vec![]
        });

    // Today's events still count as upcoming.
    let upcoming_sql = format!(
        "SELECT {} FROM sport_activities \
         WHERE sport_type = $1 AND category = 'event' AND date >= CURRENT_DATE \
         ORDER BY date ASC",
        COLUMNS
    );
    let upcoming_events: Vec<SportActivity> = sqlx::query_as(&upcoming_sql)
        .bind(sport.as_str())
        .fetch_all(pool.as_ref())
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Database error listing events: {}", e);
            vec![]
        });

    let past_sql = format!(
        "SELECT {} FROM sport_activities \
         WHERE sport_type = $1 AND category = 'event' AND date < CURRENT_DATE \
         ORDER BY date DESC",
        COLUMNS
    );
    let past_events: Vec<SportActivity> = sqlx::query_as(&past_sql)
        .bind(sport.as_str())
        .fetch_all(pool.as_ref())
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Database error listing events: {}", e);
            vec![]
        });

    let records_sql = format!(
        "SELECT {} FROM sport_activities \
         WHERE sport_type = $1 AND personal_record = true \
         ORDER BY date DESC",
        COLUMNS
    );
    let personal_records: Vec<SportActivity> = sqlx::query_as(&records_sql)
        .bind(sport.as_str())
        .fetch_all(pool.as_ref())
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Database error listing personal records: {}", e);
            vec![]
        });

    (
        StatusCode::OK,
        Json(SportDetailResponse {
            sport_type: sport.as_str(),
            display_name: sport::sport_display_name(sport.as_str(), None),
            emoji: sport::sport_emoji(sport.as_str()),
            benchmarks: benchmarks.into_iter().map(to_view).collect(),
            workouts: workouts.into_iter().map(to_view).collect(),
            upcoming_events: upcoming_events.into_iter().map(to_view).collect(),
            past_events: past_events.into_iter().map(to_view).collect(),
            personal_records: personal_records.into_iter().map(to_view).collect(),
        }),
    )
        .into_response()
}

// ============================================================================
// Admin handlers
// ============================================================================

/// GET /api/admin/sports
pub async fn admin_list_sports(
    headers: HeaderMap,
    Query(query): Query<AdminSportsQuery>,
) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let mut qb = QueryBuilder::new(format!("SELECT {} FROM sport_activities", COLUMNS));
    push_admin_filters(&mut qb, &query);

    let activities: Vec<SportActivity> = match qb.build_query_as().fetch_all(pool.as_ref()).await {
        Ok(rows) => rows,
        Err(e) => return db_error("listing sport activities", e),
    };

    let activities: Vec<SportActivityView> = activities.into_iter().map(to_view).collect();
    let total = activities.len();

    (StatusCode::OK, Json(AdminSportsResponse { activities, total })).into_response()
}

/// GET /api/admin/sports/:id
pub async fn admin_get_sport_activity(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match find_activity(pool.as_ref(), id).await {
        Ok(activity) => (StatusCode::OK, Json(to_view(activity))).into_response(),
        Err(response) => response,
    }
}

/// POST /api/admin/sports
pub async fn create_sport_activity(
    headers: HeaderMap,
    Json(payload): Json<CreateSportActivityRequest>,
) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    // Sub-type only applies to running; blank normalizes to NULL.
    let sub_type = payload
        .sub_type
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let attrs = SportActivityAttrs {
        sport_type: payload.sport_type.trim().to_lowercase(),
        sub_type: sub_type.clone(),
        category: payload.category.trim().to_lowercase(),
        title: payload.title.trim().to_string(),
        value: payload.value.trim().to_string(),
        unit: payload.unit.trim().to_string(),
        result_url: payload.result_url.clone(),
    };

    let errors = validate_activity(&attrs);
    if !errors.is_empty() {
        return validation_failed(errors);
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let sql = format!(
        "INSERT INTO sport_activities \
         (sport_type, sub_type, category, title, value, unit, date, description_html, \
          personal_record, event_name, location, result_url) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING {}",
        COLUMNS
    );

    match sqlx::query_as::<_, SportActivity>(&sql)
        .bind(&attrs.sport_type)
        .bind(&sub_type)
        .bind(&attrs.category)
        .bind(&attrs.title)
        .bind(&attrs.value)
        .bind(&attrs.unit)
        .bind(payload.date)
        .bind(
            payload
                .description
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(richtext::sanitize),
        )
        .bind(payload.personal_record.unwrap_or(false))
        .bind(&payload.event_name)
        .bind(&payload.location)
        .bind(&payload.result_url)
        .fetch_one(pool.as_ref())
        .await
    {
        Ok(activity) => (StatusCode::CREATED, Json(to_view(activity))).into_response(),
        Err(e) => db_error("creating sport activity", e),
    }
}

/// PATCH /api/admin/sports/:id
pub async fn update_sport_activity(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSportActivityRequest>,
) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let existing = match find_activity(pool.as_ref(), id).await {
        Ok(activity) => activity,
        Err(response) => return response,
    };

    let sub_type = match payload.sub_type {
        // Explicit blank clears the sub-type.
        Some(s) if s.trim().is_empty() => None,
        Some(s) => Some(s.trim().to_lowercase()),
        None => existing.sub_type,
    };

    let attrs = SportActivityAttrs {
        sport_type: payload
            .sport_type
            .map(|s| s.trim().to_lowercase())
            .unwrap_or(existing.sport_type),
        sub_type: sub_type.clone(),
        category: payload
            .category
            .map(|c| c.trim().to_lowercase())
            .unwrap_or(existing.category),
        title: payload
            .title
            .map(|t| t.trim().to_string())
            .unwrap_or(existing.title),
        value: payload
            .value
            .map(|v| v.trim().to_string())
            .unwrap_or(existing.value),
        unit: payload
            .unit
            .map(|u| u.trim().to_string())
            .unwrap_or(existing.unit),
        result_url: payload.result_url.clone().or(existing.result_url.clone()),
    };

    let errors = validate_activity(&attrs);
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
        "UPDATE sport_activities SET \
         sport_type = $1, sub_type = $2, category = $3, title = $4, value = $5, unit = $6, \
         date = $7, description_html = $8, personal_record = $9, event_name = $10, \
         location = $11, result_url = $12, updated_at = now() \
         WHERE id = $13 RETURNING {}",
        COLUMNS
    );

    match sqlx::query_as::<_, SportActivity>(&sql)
        .bind(&attrs.sport_type)
        .bind(&sub_type)
        .bind(&attrs.category)
        .bind(&attrs.title)
        .bind(&attrs.value)
        .bind(&attrs.unit)
        .bind(payload.date.unwrap_or(existing.date))
        .bind(&description_html)
        .bind(payload.personal_record.unwrap_or(existing.personal_record))
        .bind(payload.event_name.or(existing.event_name))
        .bind(payload.location.or(existing.location))
        .bind(&attrs.result_url)
        .bind(id)
        .fetch_one(pool.as_ref())
        .await
    {
        Ok(activity) => (StatusCode::OK, Json(to_view(activity))).into_response(),
        Err(e) => db_error("updating sport activity", e),
    }
}

/// DELETE /api/admin/sports/:id
pub async fn delete_sport_activity(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query("DELETE FROM sport_activities WHERE id = $1")
        .bind(id)
        .execute(pool.as_ref())
        .await
    {
        Ok(result) if result.rows_affected() == 0 => not_found(),
        Ok(_) => (StatusCode::OK, Json(SuccessResponse { success: true })).into_response(),
        Err(e) => db_error("deleting sport activity", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_attrs() -> SportActivityAttrs {
        SportActivityAttrs {
            sport_type: "crossfit".to_string(),
            sub_type: None,
            category: "benchmark".to_string(),
            title: "Fran".to_string(),
            value: "3:45".to_string(),
            unit: "min".to_string(),
            result_url: None,
        }
    }

    #[test]
    fn test_valid_activity_passes() {
        assert!(validate_activity(&base_attrs()).is_empty());
    }

    #[test]
    fn test_sport_type_enumerated() {
        let mut attrs = base_attrs();
        attrs.sport_type = "swimming".to_string();
        assert!(validate_activity(&attrs).errors.contains_key("sport_type"));

        attrs.sport_type = "ocr".to_string();
        assert!(validate_activity(&attrs).is_empty());
    }

    #[test]
    fn test_category_enumerated() {
        let mut attrs = base_attrs();
        attrs.category = "result".to_string();
        assert!(validate_activity(&attrs).errors.contains_key("category"));

        attrs.category = "workout".to_string();
        assert!(validate_activity(&attrs).is_empty());
    }

    #[test]
    fn test_sub_type_blank_ok_but_enumerated() {
        let mut attrs = base_attrs();
        attrs.sub_type = None;
        assert!(validate_activity(&attrs).is_empty());

        attrs.sub_type = Some("trail".to_string());
        assert!(validate_activity(&attrs).is_empty());

        attrs.sub_type = Some("track".to_string());
        assert!(validate_activity(&attrs).errors.contains_key("sub_type"));
    }

    #[test]
    fn test_value_unit_title_required() {
        let mut attrs = base_attrs();
        attrs.title = "".to_string();
        attrs.value = " ".to_string();
        attrs.unit = "".to_string();
        let errors = validate_activity(&attrs);
        assert!(errors.errors.contains_key("title"));
        assert!(errors.errors.contains_key("value"));
        assert!(errors.errors.contains_key("unit"));
    }

    #[test]
    fn test_admin_filters_reject_unknown_enum_values() {
        let mut qb = QueryBuilder::new(format!("SELECT {} FROM sport_activities", COLUMNS));
        push_admin_filters(
            &mut qb,
            &AdminSportsQuery {
                sport_type: Some("swimming".to_string()),
                category: Some("result".to_string()),
                ..Default::default()
            },
        );
        let sql = qb.sql();
        assert!(!sql.contains("sport_type = "));
        assert!(!sql.contains("AND category = "));
    }

    #[test]
    fn test_admin_filters_compose() {
        let mut qb = QueryBuilder::new(format!("SELECT {} FROM sport_activities", COLUMNS));
        push_admin_filters(
            &mut qb,
            &AdminSportsQuery {
                sport_type: Some("hyrox".to_string()),
                category: Some("event".to_string()),
                personal_record: Some(true),
                search: Some("doha".to_string()),
            },
        );
        let sql = qb.sql();
        assert!(sql.contains("sport_type = "));
        assert!(sql.contains("AND category = "));
        assert!(sql.contains("personal_record = true"));
        assert!(sql.contains("title ILIKE"));
        assert!(sql.contains("ORDER BY date DESC, created_at DESC"));
    }

    #[test]
    fn test_view_marks_upcoming_events() {
        let now = Utc::now();
        let future = now.date_naive() + chrono::Duration::days(10);
        let view = to_view(SportActivity {
            id: Uuid::new_v4(),
            sport_type: "hyrox".to_string(),
            sub_type: None,
            category: "event".to_string(),
            title: "Hyrox Berlin".to_string(),
            value: "0".to_string(),
            unit: "tbd".to_string(),
            date: future,
            description_html: None,
            personal_record: false,
            event_name: Some("Hyrox Berlin".to_string()),
            location: Some("Berlin".to_string()),
            result_url: None,
            created_at: now,
            updated_at: now,
        });
        assert!(view.upcoming);
        assert_eq!(view.sport_emoji, "\u{26A1}");
        assert_eq!(view.formatted_value, "0 tbd");
    }

    #[test]
    fn test_view_display_name_uses_sub_type() {
        let now = Utc::now();
        let view = to_view(SportActivity {
            id: Uuid::new_v4(),
            sport_type: "running".to_string(),
            sub_type: Some("trail".to_string()),
            category: "workout".to_string(),
            title: "Long run".to_string(),
            value: "18".to_string(),
            unit: "km".to_string(),
            date: now.date_naive(),
            description_html: None,
            personal_record: false,
            event_name: None,
            location: None,
            result_url: None,
            created_at: now,
            updated_at: now,
        });
        assert_eq!(view.sport_display_name, "Trail Running");
        assert!(!view.upcoming);
    }
}
