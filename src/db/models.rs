//! Database Models - structs representing database tables (used by sqlx/serde).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Blog post row. Publish state is derived from `published_at`, never stored.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt_html: Option<String>,
    pub content_html: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub viral: bool,
    pub featured: bool,
    pub views_count: i64,
    pub reading_time: Option<i32>,
    pub featured_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Book row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub category: Option<String>,
    pub rating: Option<i32>,
    pub review_html: Option<String>,
    pub notes_html: Option<String>,
    pub read_date: Option<NaiveDate>,
    pub featured: bool,
    pub isbn: Option<String>,
    pub cover_url: Option<String>,
    pub cover_image: Option<String>,
    pub affiliate_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Gear item row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GearItem {
    pub id: Uuid,
    pub name: String,
    pub description_html: Option<String>,
    pub category: String,
    pub price: Option<Decimal>,
    pub featured: bool,
    pub position: i32,
    pub image_url: Option<String>,
    pub product_image: Option<String>,
    pub affiliate_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Project row. `tech_stack` is a serialized JSON array (legacy rows may be
/// comma-separated text; see domain::tech_stack).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description_html: Option<String>,
    pub url: Option<String>,
    pub logo_url: Option<String>,
    pub project_type: String,
    pub status: String,
    pub tech_stack: Option<String>,
    pub featured: bool,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Social link row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLink {
    pub id: Uuid,
    pub platform: String,
    pub url: String,
    pub follower_count: Option<i32>,
    pub username: Option<String>,
    pub display_in_header: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sport activity row (authoritative schema: value/unit/date NOT NULL,
/// `workout` category, optional running sub_type)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SportActivity {
    pub id: Uuid,
    pub sport_type: String,
    pub sub_type: Option<String>,
    pub category: String,
    pub title: String,
    pub value: String,
    pub unit: String,
    pub date: NaiveDate,
    pub description_html: Option<String>,
    pub personal_record: bool,
    pub event_name: Option<String>,
    pub location: Option<String>,
    pub result_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
