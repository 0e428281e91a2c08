/**
 * Social Link Routes
 * Public header links plus admin CRUD. Platform metadata (icon, color,
 * display name) is resolved from the static platform table, never stored.
 */
use axum::{
    extract::Path,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{self, models::SocialLink};
use crate::domain::platform::{self, SocialPlatform};
use crate::domain::validate::ValidationErrors;
use crate::routes::{
    db_error, db_unavailable, not_found, validation_failed, verify_auth, SuccessResponse,
};

const COLUMNS: &str =
    "id, platform, url, follower_count, username, display_in_header, created_at, updated_at";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Social link enriched with static platform metadata
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLinkView {
    #[serde(flatten)]
    pub link: SocialLink,
    pub display_name: &'static str,
    pub icon: &'static str,
    pub color_class: &'static str,
    pub formatted_follower_count: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSocialLinksResponse {
    pub header_links: Vec<SocialLinkView>,
    pub with_followers: Vec<SocialLinkView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSocialLinksResponse {
    pub links: Vec<SocialLinkView>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSocialLinkRequest {
    pub platform: String,
    pub url: String,
    pub follower_count: Option<i32>,
    pub username: Option<String>,
    pub display_in_header: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSocialLinkRequest {
    pub platform: Option<String>,
    pub url: Option<String>,
    pub follower_count: Option<i32>,
    pub username: Option<String>,
    pub display_in_header: Option<bool>,
}

fn to_view(link: SocialLink) -> SocialLinkView {
    let meta = platform::meta_for(&link.platform);
    SocialLinkView {
        display_name: meta.display_name,
        icon: meta.icon,
        color_class: meta.color_class,
        formatted_follower_count: link.follower_count.map(platform::format_follower_count),
        link,
    }
}

// ============================================================================
// Validation
// ============================================================================

struct SocialLinkAttrs {
    platform: String,
    url: String,
    follower_count: Option<i32>,
}

/// New links show in the header unless the request says otherwise, matching
/// the column default.
fn display_in_header_or_default(value: Option<bool>) -> bool {
    value.unwrap_or(true)
}

fn validate_link(attrs: &SocialLinkAttrs) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.require("platform", &attrs.platform);
    errors.check_inclusion("platform", &attrs.platform, &SocialPlatform::all_names());
    errors.require("url", &attrs.url);
    errors.check_optional_url("url", Some(&attrs.url));
    errors.check_non_negative("follower_count", attrs.follower_count);
    errors
}

async fn find_link(pool: &PgPool, id: Uuid) -> Result<SocialLink, Response> {
    let sql = format!("SELECT {} FROM social_links WHERE id = $1", COLUMNS);
    match sqlx::query_as::<_, SocialLink>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
    {
        Ok(Some(link)) => Ok(link),
        Ok(None) => Err(not_found()),
        Err(e) => Err(db_error("fetching social link", e)),
    }
}

// ============================================================================
// Public handlers
// ============================================================================

/// GET /api/social-links - Header links in creation order, plus links
/// that carry a follower count for the stats strip
pub async fn list_social_links() -> Response {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let header_sql = format!(
        "SELECT {} FROM social_links WHERE display_in_header = true ORDER BY created_at ASC",
        COLUMNS
    );
    let header_links: Vec<SocialLink> = sqlx::query_as(&header_sql)
        .fetch_all(pool.as_ref())
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Database error listing social links: {}", e);
            vec![]
        });

    let followers_sql = format!(
        "SELECT {} FROM social_links WHERE follower_count IS NOT NULL \
         ORDER BY follower_count DESC",
        COLUMNS
    );
    let with_followers: Vec<SocialLink> = sqlx::query_as(&followers_sql)
        .fetch_all(pool.as_ref())
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Database error listing social links: {}", e);
            vec![]
        });

    (
        StatusCode::OK,
        Json(PublicSocialLinksResponse {
            header_links: header_links.into_iter().map(to_view).collect(),
            with_followers: with_followers.into_iter().map(to_view).collect(),
        }),
    )
        .into_response()
}

// ============================================================================
// Admin handlers
// ============================================================================

/// GET /api/admin/social-links
pub async fn admin_list_social_links(headers: HeaderMap) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let sql = format!("SELECT {} FROM social_links ORDER BY created_at ASC", COLUMNS);
    let links: Vec<SocialLink> = match sqlx::query_as(&sql).fetch_all(pool.as_ref()).await {
        Ok(rows) => rows,
        Err(e) => return db_error("listing social links", e),
    };

    let links: Vec<SocialLinkView> = links.into_iter().map(to_view).collect();
    let total = links.len();

    (StatusCode::OK, Json(AdminSocialLinksResponse { links, total })).into_response()
}

/// GET /api/admin/social-links/:id
pub async fn admin_get_social_link(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match find_link(pool.as_ref(), id).await {
        Ok(link) => (StatusCode::OK, Json(to_view(link))).into_response(),
        Err(response) => response,
    }
}

/// POST /api/admin/social-links
pub async fn create_social_link(
    headers: HeaderMap,
    Json(payload): Json<CreateSocialLinkRequest>,
) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let attrs = SocialLinkAttrs {
        platform: payload.platform.trim().to_lowercase(),
        url: payload.url.trim().to_string(),
        follower_count: payload.follower_count,
    };

    let errors = validate_link(&attrs);
    if !errors.is_empty() {
        return validation_failed(errors);
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let sql = format!(
        "INSERT INTO social_links (platform, url, follower_count, username, display_in_header) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {}",
        COLUMNS
    );

    match sqlx::query_as::<_, SocialLink>(&sql)
        .bind(&attrs.platform)
        .bind(&attrs.url)
        .bind(payload.follower_count)
        .bind(&payload.username)
        .bind(display_in_header_or_default(payload.display_in_header))
        .fetch_one(pool.as_ref())
        .await
    {
        Ok(link) => (StatusCode::CREATED, Json(to_view(link))).into_response(),
        Err(e) => db_error("creating social link", e),
    }
}

/// PATCH /api/admin/social-links/:id
pub async fn update_social_link(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSocialLinkRequest>,
) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    let existing = match find_link(pool.as_ref(), id).await {
        Ok(link) => link,
        Err(response) => return response,
    };

    let follower_count = payload.follower_count.or(existing.follower_count);

    let attrs = SocialLinkAttrs {
        platform: payload
            .platform
            .map(|p| p.trim().to_lowercase())
            .unwrap_or(existing.platform),
        url: payload
            .url
            .map(|u| u.trim().to_string())
            .unwrap_or(existing.url),
        follower_count,
    };

    let errors = validate_link(&attrs);
    if !errors.is_empty() {
        return validation_failed(errors);
    }

    let sql = format!(
        "UPDATE social_links SET \
         platform = $1, url = $2, follower_count = $3, username = $4, display_in_header = $5, \
         updated_at = now() \
         WHERE id = $6 RETURNING {}",
        COLUMNS
    );

    match sqlx::query_as::<_, SocialLink>(&sql)
        .bind(&attrs.platform)
        .bind(&attrs.url)
        .bind(follower_count)
        .bind(payload.username.or(existing.username))
        .bind(payload.display_in_header.unwrap_or(existing.display_in_header))
        .bind(id)
        .fetch_one(pool.as_ref())
        .await
    {
        Ok(link) => (StatusCode::OK, Json(to_view(link))).into_response(),
        Err(e) => db_error("updating social link", e),
    }
}

/// DELETE /api/admin/social-links/:id
pub async fn delete_social_link(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if let Err(err) = verify_auth(&headers) {
        return err;
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable(),
    };

    match sqlx::query("DELETE FROM social_links WHERE id = $1")
        .bind(id)
        .execute(pool.as_ref())
        .await
    {
        Ok(result) if result.rows_affected() == 0 => not_found(),
        Ok(_) => (StatusCode::OK, Json(SuccessResponse { success: true })).into_response(),
        Err(e) => db_error("deleting social link", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn base_attrs() -> SocialLinkAttrs {
        SocialLinkAttrs {
            platform: "github".to_string(),
            url: "https://github.com/someone".to_string(),
            follower_count: Some(1200),
        }
    }

    #[test]
    fn test_valid_link_passes() {
        assert!(validate_link(&base_attrs()).is_empty());
    }

    #[test]
    fn test_new_links_default_to_header_visible() {
        assert!(display_in_header_or_default(None));
        assert!(display_in_header_or_default(Some(true)));
        assert!(!display_in_header_or_default(Some(false)));
    }

    #[test]
    fn test_platform_must_be_known() {
        let mut attrs = base_attrs();
        attrs.platform = "myspace".to_string();
        assert!(validate_link(&attrs).errors.contains_key("platform"));

        attrs.platform = "".to_string();
        assert!(validate_link(&attrs).errors.contains_key("platform"));
    }

    #[test]
    fn test_url_required_and_well_formed() {
        let mut attrs = base_attrs();
        attrs.url = "".to_string();
        assert!(validate_link(&attrs).errors.contains_key("url"));

        attrs.url = "not-a-url".to_string();
        assert!(validate_link(&attrs).errors.contains_key("url"));
    }

    #[test]
    fn test_follower_count_non_negative() {
        let mut attrs = base_attrs();
        attrs.follower_count = Some(-5);
        assert!(validate_link(&attrs).errors.contains_key("follower_count"));

        attrs.follower_count = None;
        assert!(validate_link(&attrs).is_empty());
    }

    #[test]
    fn test_view_enriches_with_platform_meta() {
        let now = Utc::now();
        let view = to_view(SocialLink {
            id: Uuid::new_v4(),
            platform: "twitter".to_string(),
            url: "https://twitter.com/x".to_string(),
            follower_count: Some(2_500_000),
            username: None,
            display_in_header: true,
            created_at: now,
            updated_at: now,
        });
        assert_eq!(view.icon, "twitter-x");
        assert_eq!(view.color_class, "text-blue-400");
        assert_eq!(view.formatted_follower_count.as_deref(), Some("2.5M"));
    }

    #[test]
    fn test_view_tolerates_unknown_platform() {
        let now = Utc::now();
        let view = to_view(SocialLink {
            id: Uuid::new_v4(),
            platform: "myspace".to_string(),
            url: "https://myspace.com/x".to_string(),
            follower_count: None,
            username: None,
            display_in_header: false,
            created_at: now,
            updated_at: now,
        });
        assert_eq!(view.icon, "link");
        assert_eq!(view.formatted_follower_count, None);
    }
}
