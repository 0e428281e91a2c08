/**
 * Project Routes
 * Public project showcase (startups, side projects, experiments) plus
 * admin CRUD. Ordering is manual via `position` within each type.
 */
use axum::{
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::{self, models::Project};
use crate::domain::richtext;
use crate::domain::tech_stack;
use crate::domain::validate::ValidationErrors;
use crate::routes::{
    db_error, db_unavailable, not_found, validation_failed, verify_auth, SuccessResponse,
};

const COLUMNS: &str = "id, name, description_html, url, logo_url, project_type, status, \
                       tech_stack, featured, position, created_at, updated_at";

pub const PROJECT_TYPES: &[&str] = &["startup", "side_project", "experiment"];
pub const PROJECT_STATUSES: &[&str] = &["active", "archived", "in_development"];

const FEATURED_LIMIT: i64 = 6;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProjectsQuery {
    #[serde(rename = "type")]
    pub project_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProjectsQuery {
    #[serde(rename = "type")]
    pub project_type: Option<String>,
    pub status: Option<String>,
    pub featured: Option<bool>,
    pub search: Option<String>,
}

/// Project with the tech stack parsed out of its storage form
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    #[serde(flatten)]
    pub project: Project,
    pub tech_stack_list: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProjectsResponse {
    pub projects: Vec<ProjectView>,
    pub featured: Vec<ProjectView>,
    pub startups: Vec<ProjectView>,
    pub side_projects: Vec<ProjectView>,
    pub experiments: Vec<ProjectView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProjectsResponse {
    pub projects: Vec<ProjectView>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub logo_url: Option<String>,
    pub project_type: String,
    pub status: Option<String>,
    pub tech_stack: Option<Vec<String>>,
    pub featured: Option<bool>,
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub logo_url: Option<String>,
    pub project_type: Option<String>,
    pub status: Option<String>,
    pub tech_stack: Option<Vec<String>>,
    pub featured: Option<bool>,
    pub position: Option<i32>,
}

fn to_view(project: Project) -> ProjectView {
    ProjectView {
        tech_stack_list: tech_stack::parse(project.tech_stack.as_deref()),
        project,
    }
}

// ============================================================================
// Validation
// ============================================================================

struct ProjectAttrs {
    name: String,
    project_type: String,
    status: String,
    url: Option<String>,
    position: Option<i32>,
}

fn validate_project(attrs: &ProjectAttrs) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.require("name", &attrs.name);
    errors.require("project_type", &attrs.project_type);
    errors.check_inclusion("project_type", &attrs.project_type, PROJECT_TYPES);
    errors.check_inclusion("status", &attrs.status, PROJECT_STATUSES);
    errors.check_optional_url("url", attrs.url.as_deref());
    errors.check_non_negative("position", attrs.position);
    errors
}

// ============================================================================
// Query building
// ============================================================================

fn push_admin_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &AdminProjectsQuery) {
    qb.push(" WHERE 1=1");

    if let Some(pt) = query
        .project_type
        .as_ref()
        .filter(|t| PROJECT_TYPES.contains(&t.as_str()))
    {
        qb.push(" AND project_type = ");
        qb.push_bind(pt.clone());
    }
    if let Some(status) = query
        .status
        .as_ref()
        .filter(|s| PROJECT_STATUSES.contains(&s.as_str()))
    {
        qb.push(" AND status = ");
        qb.push_bind(status.clone());
    }
    if query.featured == Some(true) {
        qb.push(" AND featured = true");
    }
    if let Some(search) = query.search.as_ref().filter(|s| !s.trim().is_empty()) {
        qb.push(" AND name ILIKE ");
        qb.push_bind(format!("%{}%", search.trim()));
    }

    qb.push(" ORDER BY position ASC, created_at DESC");
}

async fn fetch_projects(pool: &PgPool, sql: &str) -> Vec<Project> {
    sqlx::query_as::<_, Project>(sql)
        .fetch_all(pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Database error listing projects: {}", e);
            vec![]
        })
}

async fn fetch_by_type(pool: &PgPool, project_type: &str) -> Vec<Project> {
    let sql = format!(
        "SELECT {} FROM projects WHERE project_type = $1 \
         ORDER BY position ASC, created_at DESC",
        COLUMNS
    );
    sqlx::query_as(&sql)
        .bind(project_type)
        .fetch_all(pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Database error listing projects: {}", e);
            vec![]
        })
}

async fn find_project(pool: &PgPool, id: Uuid) -> Result<Project, Response> {
    let sql = format!("SELECT {} FROM projects WHERE id = $1", COLUMNS);
    match sqlx::query_as::<_, Project>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
    {
        Ok(Some(project)) => Ok(project),
        Ok(None) => Err(not_found()),
        Err(e) => Err(db_error("fetching project", e)),
    }
}

/// Position 0 or absent means "append to the project type". Checked on
/// every save, not just creation.
fn needs_position_assignment(position: Option<i32>) -> bool {
    !matches!(position, Some(p) if p > 0)
}

/// Next position within a project type: max + 1, starting from 1.
async fn next_position(pool: &PgPool, project_type: &str) -> Result<i32, sqlx::Error> {
    let max: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(position), 0) FROM projects WHERE project_type = $1",
    )
    .bind(project_type)
    .fetch_one(pool)
    .await?;
    Ok(max + 1)
}

// ============================================================================
// Public handlers
// ============================================================================

/// GET /api/projects - All projects (optionally by type) plus featured
/// picks and per-type groupings
pub async fn list_projects(Query(query): Query<PublicProjectsQuery>) -> Response {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let projects: Vec<Project> = match query
        .project_type
        .as_ref()
        .filter(|t| PROJECT_TYPES.contains(&t.as_str()))
    {
        Some(pt) => fetch_by_type(pool.as_ref(), pt).await,
        None => {
            fetch_projects(
                pool.as_ref(),
                &format!(
                    "SELECT {} FROM projects ORDER BY position ASC, created_at DESC",
                    COLUMNS
                ),
            )
            .await
        }
    };

    let featured = fetch_projects(
        pool.as_ref(),
        &format!(
            "SELECT {} FROM projects WHERE featured = true \
             ORDER BY position ASC, created_at DESC LIMIT {}",
            COLUMNS, FEATURED_LIMIT
        ),
    )
    .await;

    let startups = fetch_by_type(pool.as_ref(), "startup").await;
    let side_projects = fetch_by_type(pool.as_ref(), "side_project").await;
    let experiments = fetch_by_type(pool.as_ref(), "experiment").await;

    (
        StatusCode::OK,
        Json(PublicProjectsResponse {
            projects: projects.into_iter().map(to_view).collect(),
            featured: featured.into_iter().map(to_view).collect(),
            startups: startups.into_iter().map(to_view).collect(),
            side_projects: side_projects.into_iter().map(to_view).collect(),
            experiments: experiments.into_iter().map(to_view).collect(),
        }),
    )
        .into_response()
}

// ============================================================================
// Admin handlers
// ============================================================================

/// GET /api/admin/projects
pub async fn admin_list_projects(
    headers: HeaderMap,
    Query(query): Query<AdminProjectsQuery>,
) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let mut qb = QueryBuilder::new(format!("SELECT {} FROM projects", COLUMNS));
    push_admin_filters(&mut qb, &query);

    let projects: Vec<Project> = match qb.build_query_as().fetch_all(pool.as_ref()).await {
        Ok(rows) => rows,
        Err(e) => return db_error("listing projects", e),
    };

    let projects: Vec<ProjectView> = projects.into_iter().map(to_view).collect();
    let total = projects.len();

    (StatusCode::OK, Json(AdminProjectsResponse { projects, total })).into_response()
}

/// GET /api/admin/projects/:id
pub async fn admin_get_project(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match find_project(pool.as_ref(), id).await {
        Ok(project) => (StatusCode::OK, Json(to_view(project))).into_response(),
        Err(response) => response,
    }
}

/// POST /api/admin/projects
pub async fn create_project(
    headers: HeaderMap,
    Json(payload): Json<CreateProjectRequest>,
) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let status = payload
        .status
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "active".to_string());

    let attrs = ProjectAttrs {
        name: payload.name.trim().to_string(),
        project_type: payload.project_type.clone(),
        status: status.clone(),
        url: payload.url.clone(),
        position: payload.position,
    };

    let errors = validate_project(&attrs);
    if !errors.is_empty() {
        return validation_failed(errors);
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let position = if needs_position_assignment(payload.position) {
        match next_position(pool.as_ref(), &payload.project_type).await {
            Ok(p) => p,
            Err(e) => return db_error("assigning project position", e),
        }
    } else {
        payload.position.unwrap_or_default()
    };

    let sql = format!(
        "INSERT INTO projects \
         (name, description_html, url, logo_url, project_type, status, tech_stack, featured, \
          position) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
        COLUMNS
    );

    match sqlx::query_as::<_, Project>(&sql)
        .bind(&attrs.name)
        .bind(
            payload
                .description
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(richtext::sanitize),
        )
        .bind(&payload.url)
        .bind(&payload.logo_url)
        .bind(&payload.project_type)
        .bind(&status)
        .bind(payload.tech_stack.as_deref().and_then(tech_stack::serialize))
        .bind(payload.featured.unwrap_or(false))
        .bind(position)
        .fetch_one(pool.as_ref())
        .await
    {
        Ok(project) => (StatusCode::CREATED, Json(to_view(project))).into_response(),
        Err(e) => db_error("creating project", e),
    }
}

/// PATCH /api/admin/projects/:id
pub async fn update_project(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProjectRequest>,
) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let existing = match find_project(pool.as_ref(), id).await {
        Ok(project) => project,
        Err(response) => return response,
    };

    let project_type = payload.project_type.unwrap_or(existing.project_type);
    let status = payload
        .status
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(existing.status);
    let url = payload.url.or(existing.url);
    let merged_position = payload.position.unwrap_or(existing.position);
    let position = if needs_position_assignment(Some(merged_position)) {
        match next_position(pool.as_ref(), &project_type).await {
            Ok(p) => p,
            Err(e) => return db_error("assigning project position", e),
        }
    } else {
        merged_position
    };

    let attrs = ProjectAttrs {
        name: payload
            .name
            .map(|n| n.trim().to_string())
            .unwrap_or(existing.name),
        project_type: project_type.clone(),
        status: status.clone(),
        url: url.clone(),
        position: Some(position),
    };

    let errors = validate_project(&attrs);
    if !errors.is_empty() {
        return validation_failed(errors);
    }

    let description_html = payload
        .description
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(richtext::sanitize)
        .or(existing.description_html);
    let tech_stack_value = payload
        .tech_stack
        .as_deref()
        .and_then(tech_stack::serialize)
        .or(existing.tech_stack);

    let sql = format!(
        "UPDATE projects SET \
         name = $1, description_html = $2, url = $3, logo_url = $4, project_type = $5, \
         status = $6, tech_stack = $7, featured = $8, position = $9, updated_at = now() \
         WHERE id = $10 RETURNING {}",
        COLUMNS
    );

    match sqlx::query_as::<_, Project>(&sql)
        .bind(&attrs.name)
        .bind(&description_html)
        .bind(&url)
        .bind(payload.logo_url.or(existing.logo_url))
        .bind(&project_type)
        .bind(&status)
        .bind(&tech_stack_value)
        .bind(payload.featured.unwrap_or(existing.featured))
        .bind(position)
        .bind(id)
        .fetch_one(pool.as_ref())
        .await
    {
        Ok(project) => (StatusCode::OK, Json(to_view(project))).into_response(),
        Err(e) => db_error("updating project", e),
    }
}

/// DELETE /api/admin/projects/:id
pub async fn delete_project(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(id)
        .execute(pool.as_ref())
        .await
    {
        Ok(result) if result.rows_affected() == 0 => not_found(),
        Ok(_) => (StatusCode::OK, Json(SuccessResponse { success: true })).into_response(),
        Err(e) => db_error("deleting project", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_attrs() -> ProjectAttrs {
        ProjectAttrs {
            name: "Side Thing".to_string(),
            project_type: "side_project".to_string(),
            status: "active".to_string(),
            url: None,
            position: Some(1),
        }
    }

    #[test]
    fn test_valid_project_passes() {
        assert!(validate_project(&base_attrs()).is_empty());
    }

    #[test]
    fn test_position_zero_or_absent_gets_reassigned() {
        assert!(needs_position_assignment(None));
        assert!(needs_position_assignment(Some(0)));
        assert!(!needs_position_assignment(Some(2)));
    }

    #[test]
    fn test_project_type_required_and_enumerated() {
        let mut attrs = base_attrs();
        attrs.project_type = "".to_string();
        assert!(validate_project(&attrs).errors.contains_key("project_type"));

        attrs.project_type = "hobby".to_string();
        assert!(validate_project(&attrs).errors.contains_key("project_type"));

        for ok in PROJECT_TYPES {
            attrs.project_type = ok.to_string();
            assert!(validate_project(&attrs).is_empty(), "{} should pass", ok);
        }
    }

    #[test]
    fn test_status_enumerated() {
        let mut attrs = base_attrs();
        attrs.status = "paused".to_string();
        assert!(validate_project(&attrs).errors.contains_key("status"));

        for ok in PROJECT_STATUSES {
            attrs.status = ok.to_string();
            assert!(validate_project(&attrs).is_empty(), "{} should pass", ok);
        }
    }

    #[test]
    fn test_url_must_be_valid_when_present() {
        let mut attrs = base_attrs();
        attrs.url = Some("nope".to_string());
        assert!(validate_project(&attrs).errors.contains_key("url"));

        attrs.url = Some("https://example.com".to_string());
        assert!(validate_project(&attrs).is_empty());
    }

    #[test]
    fn test_admin_filters_ignore_unknown_values() {
        let mut qb = QueryBuilder::new(format!("SELECT {} FROM projects", COLUMNS));
        push_admin_filters(
            &mut qb,
            &AdminProjectsQuery {
                project_type: Some("bogus".to_string()),
                status: Some("bogus".to_string()),
                ..Default::default()
            },
        );
        let sql = qb.sql();
        assert!(!sql.contains("project_type = "));
        assert!(!sql.contains("status = "));
    }

    #[test]
    fn test_admin_filters_compose() {
        let mut qb = QueryBuilder::new(format!("SELECT {} FROM projects", COLUMNS));
        push_admin_filters(
            &mut qb,
            &AdminProjectsQuery {
                project_type: Some("startup".to_string()),
                status: Some("active".to_string()),
                featured: Some(true),
                search: Some("asdf".to_string()),
            },
        );
        let sql = qb.sql();
        assert!(sql.contains("project_type = "));
        assert!(sql.contains("status = "));
        assert!(sql.contains("featured = true"));
        assert!(sql.contains("name ILIKE"));
    }
}
