//! Blog post publish lifecycle.
//!
//! There is no status column. `published_at` is the single source of truth
//! and the three states are pure functions of it and the clock: a scheduled
//! post becomes published the moment its timestamp elapses, with no write.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    Draft,
    Scheduled,
    Published,
}

pub fn publish_status(published_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> PublishStatus {
    match published_at {
        None => PublishStatus::Draft,
        Some(t) if t > now => PublishStatus::Scheduled,
        Some(_) => PublishStatus::Published,
    }
}

pub fn is_published(published_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    publish_status(published_at, now) == PublishStatus::Published
}

pub fn is_scheduled(published_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    publish_status(published_at, now) == PublishStatus::Scheduled
}

/// Human label for the detail views: "Draft", "Scheduled for June 03, 2026",
/// or the publication date.
pub fn formatted_published_date(
    published_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> String {
    match publish_status(published_at, now) {
        PublishStatus::Draft => "Draft".to_string(),
        PublishStatus::Scheduled => format!(
            "Scheduled for {}",
            published_at.map(|t| t.format("%B %d, %Y").to_string()).unwrap_or_default()
        ),
        PublishStatus::Published => published_at
            .map(|t| t.format("%B %d, %Y").to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_null_timestamp_is_draft() {
        let now = Utc::now();
        assert_eq!(publish_status(None, now), PublishStatus::Draft);
        assert!(!is_published(None, now));
    }

    #[test]
    fn test_future_timestamp_is_scheduled() {
        let now = Utc::now();
        let at = Some(now + Duration::days(3));
        assert_eq!(publish_status(at, now), PublishStatus::Scheduled);
        assert!(is_scheduled(at, now));
        assert!(!is_published(at, now));
    }

    #[test]
    fn test_elapsed_timestamp_is_published_without_any_write() {
        let at = Some(Utc::now() + Duration::days(3));
        let later = Utc::now() + Duration::days(4);
        // Same stored value, only the comparison time moved.
        assert!(is_published(at, later));
        assert!(!is_scheduled(at, later));
    }

    #[test]
    fn test_exact_now_counts_as_published() {
        let now = Utc::now();
        assert_eq!(publish_status(Some(now), now), PublishStatus::Published);
    }

    #[test]
    fn test_formatted_date_labels() {
        let now = Utc::now();
        assert_eq!(formatted_published_date(None, now), "Draft");
        let future = formatted_published_date(Some(now + Duration::days(2)), now);
        assert!(future.starts_with("Scheduled for "));
        let past = formatted_published_date(Some(now - Duration::days(2)), now);
        assert!(!past.starts_with("Scheduled"));
        assert!(!past.is_empty());
    }
}
