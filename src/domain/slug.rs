//! Slug derivation for blog posts.
//!
//! A missing slug is derived from the title at write time: lowercase,
//! non-alphanumeric runs collapsed to single hyphens, leading/trailing
//! hyphens trimmed. If the candidate is taken, `-1`, `-2`, ... suffixes are
//! tried sequentially until a free slug is found. This runs before the
//! unique index gets a say, so a clean title never 409s against itself.

use regex::Regex;
use sqlx::PgPool;
use uuid::Uuid;

lazy_static::lazy_static! {
    /// Valid slug pattern: lowercase letters, numbers, and hyphens
    static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_REGEX.is_match(slug)
}

/// Turn a title into a URL-safe slug.
pub fn parameterize(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    out
}

/// Derive a slug from `title` that is not yet taken by another post.
///
/// `exclude_id` lets an update keep its own slug without tripping the
/// existence check against itself.
pub async fn generate_unique_slug(
    pool: &PgPool,
    title: &str,
    exclude_id: Option<Uuid>,
) -> Result<String, sqlx::Error> {
    let base = parameterize(title);
    let base = if base.is_empty() {
        "post".to_string()
    } else {
        base
    };

    let mut candidate = base.clone();
    let mut counter = 1;

    while slug_taken(pool, &candidate, exclude_id).await? {
        candidate = format!("{}-{}", base, counter);
        counter += 1;
    }

    Ok(candidate)
}

async fn slug_taken(
    pool: &PgPool,
    slug: &str,
    exclude_id: Option<Uuid>,
) -> Result<bool, sqlx::Error> {
    let taken: bool = match exclude_id {
        Some(id) => {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM blog_posts WHERE slug = $1 AND id <> $2)")
                .bind(slug)
                .bind(id)
                .fetch_one(pool)
                .await?
        }
        None => {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM blog_posts WHERE slug = $1)")
                .bind(slug)
                .fetch_one(pool)
                .await?
        }
    };

    Ok(taken)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameterize_lowercases_and_hyphenates() {
        assert_eq!(parameterize("Hello World"), "hello-world");
        assert_eq!(parameterize("Rails & Rust: A Story"), "rails-rust-a-story");
    }

    #[test]
    fn test_parameterize_collapses_repeats() {
        assert_eq!(parameterize("a   --  b"), "a-b");
        assert_eq!(parameterize("one...two"), "one-two");
    }

    #[test]
    fn test_parameterize_trims_edges() {
        assert_eq!(parameterize("  spaced out  "), "spaced-out");
        assert_eq!(parameterize("!!!bang!!!"), "bang");
    }

    #[test]
    fn test_parameterize_empty_and_symbolic() {
        assert_eq!(parameterize(""), "");
        assert_eq!(parameterize("???"), "");
    }

    #[test]
    fn test_is_valid_slug() {
        assert!(is_valid_slug("hello-world-2"));
        assert!(is_valid_slug("a"));
        assert!(!is_valid_slug("Hello"));
        assert!(!is_valid_slug("-leading"));
        assert!(!is_valid_slug("trailing-"));
        assert!(!is_valid_slug("double--hyphen"));
        assert!(!is_valid_slug(""));
    }
}
