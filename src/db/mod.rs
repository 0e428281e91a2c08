pub mod models;

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;
use tokio::sync::OnceCell;

static DB_POOL: OnceCell<Arc<PgPool>> = OnceCell::const_new();

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/personal_site".to_string()),
            max_connections: std::env::var("DB_POOL_MAX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            min_connections: std::env::var("DB_POOL_MIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            connect_timeout_secs: std::env::var("DB_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            idle_timeout_secs: std::env::var("DB_IDLE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
        }
    }
}

pub async fn init_pool(config: Option<DbConfig>) -> Result<Arc<PgPool>, sqlx::Error> {
    let config = config.unwrap_or_default();

    tracing::info!("Initializing database connection pool...");
    tracing::debug!(
        "Database URL: {}",
        config.url.replace(
            |c: char| !c.is_ascii_alphanumeric() && c != ':' && c != '/' && c != '@' && c != '.',
            "*"
        )
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(std::time::Duration::from_secs(3))
        .idle_timeout(std::time::Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(std::time::Duration::from_secs(1800))
        .test_before_acquire(true)
        .connect(&config.url)
        .await?;

    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    tracing::info!("Database connection pool initialized successfully");

    let pool = Arc::new(pool);
    let _ = DB_POOL.set(pool.clone());

    Ok(pool)
}

pub fn get_pool() -> Option<Arc<PgPool>> {
    DB_POOL.get().cloned()
}

pub async fn health_check() -> Result<std::time::Duration, sqlx::Error> {
    let pool = get_pool()
        .ok_or_else(|| sqlx::Error::Configuration("Database pool not initialized".into()))?;

    let start = std::time::Instant::now();
    sqlx::query("SELECT 1").fetch_one(pool.as_ref()).await?;

    Ok(start.elapsed())
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS blog_posts (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            title TEXT NOT NULL,
            slug TEXT UNIQUE NOT NULL,
            excerpt_html TEXT,
            content_html TEXT,
            published_at TIMESTAMPTZ,
            viral BOOLEAN NOT NULL DEFAULT false,
            featured BOOLEAN NOT NULL DEFAULT false,
            views_count BIGINT NOT NULL DEFAULT 0,
            reading_time INTEGER,
            featured_image TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::raw_sql(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_blog_posts_slug
            ON blog_posts(slug);
        CREATE INDEX IF NOT EXISTS idx_blog_posts_published_at
            ON blog_posts(published_at DESC);
        CREATE INDEX IF NOT EXISTS idx_blog_posts_viral
            ON blog_posts(viral);
        CREATE INDEX IF NOT EXISTS idx_blog_posts_views_count
            ON blog_posts(views_count DESC)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            category TEXT,
            rating INTEGER,
            review_html TEXT,
            notes_html TEXT,
            read_date DATE,
            featured BOOLEAN NOT NULL DEFAULT false,
            isbn TEXT,
            cover_url TEXT,
            cover_image TEXT,
            affiliate_link TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::raw_sql(
        r#"
        CREATE INDEX IF NOT EXISTS idx_books_category ON books(category);
        CREATE INDEX IF NOT EXISTS idx_books_featured ON books(featured);
        CREATE INDEX IF NOT EXISTS idx_books_rating ON books(rating);
        CREATE INDEX IF NOT EXISTS idx_books_read_date ON books(read_date DESC)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS gear_items (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name TEXT NOT NULL,
            description_html TEXT,
            category TEXT NOT NULL,
            price NUMERIC(10, 2),
            featured BOOLEAN NOT NULL DEFAULT false,
            position INTEGER NOT NULL DEFAULT 0,
            image_url TEXT,
            product_image TEXT,
            affiliate_link TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::raw_sql(
        r#"
        CREATE INDEX IF NOT EXISTS idx_gear_items_category ON gear_items(category);
        CREATE INDEX IF NOT EXISTS idx_gear_items_featured ON gear_items(featured);
        CREATE INDEX IF NOT EXISTS idx_gear_items_position ON gear_items(position)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name TEXT NOT NULL,
            description_html TEXT,
            url TEXT,
            logo_url TEXT,
            project_type TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'active',
            tech_stack TEXT,
            featured BOOLEAN NOT NULL DEFAULT false,
            position INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::raw_sql(
        r#"
        CREATE INDEX IF NOT EXISTS idx_projects_project_type ON projects(project_type);
        CREATE INDEX IF NOT EXISTS idx_projects_featured ON projects(featured);
        CREATE INDEX IF NOT EXISTS idx_projects_position ON projects(position)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS social_links (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            platform TEXT NOT NULL,
            url TEXT NOT NULL,
            follower_count INTEGER,
            username TEXT,
            display_in_header BOOLEAN NOT NULL DEFAULT true,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::raw_sql("CREATE INDEX IF NOT EXISTS idx_social_links_platform ON social_links(platform)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sport_activities (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            sport_type TEXT NOT NULL,
            sub_type TEXT,
            category TEXT NOT NULL,
            title TEXT NOT NULL,
            value TEXT NOT NULL,
            unit TEXT NOT NULL,
            date DATE NOT NULL,
            description_html TEXT,
            personal_record BOOLEAN NOT NULL DEFAULT false,
            event_name TEXT,
            location TEXT,
            result_url TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::raw_sql(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sport_activities_sport_type ON sport_activities(sport_type);
        CREATE INDEX IF NOT EXISTS idx_sport_activities_sub_type ON sport_activities(sub_type);
        CREATE INDEX IF NOT EXISTS idx_sport_activities_category ON sport_activities(category);
        CREATE INDEX IF NOT EXISTS idx_sport_activities_date ON sport_activities(date);
        CREATE INDEX IF NOT EXISTS idx_sport_activities_personal_record ON sport_activities(personal_record)
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_config_default_uses_env_or_fallback() {
        let config = DbConfig::default();
        assert!(config.max_connections >= 1);
        assert!(config.connect_timeout_secs >= 1);
        assert!(config.idle_timeout_secs >= 1);
        assert!(!config.url.is_empty());
    }

    #[test]
    fn test_get_pool_none_before_init() {
        let pool = get_pool();
        assert!(pool.is_none());
    }

    #[tokio::test]
    async fn test_health_check_fails_without_pool() {
        let result = health_check().await;
        assert!(result.is_err());
    }
}
