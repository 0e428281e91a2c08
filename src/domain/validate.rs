//! Field-keyed validation.
//!
//! Every create/update path validates the full merged attribute set and
//! returns errors keyed by field name, so forms can annotate individual
//! inputs instead of showing one flattened message.

use serde::Serialize;
use std::collections::BTreeMap;
use url::Url;

#[derive(Debug, Default, Clone, Serialize)]
pub struct ValidationErrors {
    pub errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Presence check for required string fields.
    pub fn require(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, "can't be blank");
        }
    }

    /// Enumerated-membership check; blank values are left to `require`.
    pub fn check_inclusion(&mut self, field: &str, value: &str, allowed: &[&str]) {
        if !value.is_empty() && !allowed.contains(&value) {
            self.add(field, "is not included in the list");
        }
    }

    /// Optional http(s) URL fields: blank is fine, anything else must parse.
    pub fn check_optional_url(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value {
            if !v.trim().is_empty() && !is_http_url(v) {
                self.add(field, "must be a valid URL");
            }
        }
    }

    pub fn check_non_negative(&mut self, field: &str, value: Option<i32>) {
        if let Some(v) = value {
            if v < 0 {
                self.add(field, "must be greater than or equal to 0");
            }
        }
    }

    /// Inclusive integer range check for optional fields.
    pub fn check_range(&mut self, field: &str, value: Option<i32>, min: i32, max: i32) {
        if let Some(v) = value {
            if v < min || v > max {
                self.add(field, "is not included in the list");
            }
        }
    }
}

/// Well-formed absolute URL with an http or https scheme and a host.
pub fn is_http_url(s: &str) -> bool {
    match Url::parse(s) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.has_host(),
        Err(_) => false,
    }
}

/// Lowercase-trimmed form for category-like free-text fields, so that
/// case-insensitive grouping scopes behave consistently.
pub fn normalize_category(category: &str) -> String {
    category.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_http_url_accepts_http_and_https() {
        assert!(is_http_url("https://example.com"));
        assert!(is_http_url("http://example.com/x"));
    }

    #[test]
    fn test_is_http_url_rejects_garbage_and_other_schemes() {
        assert!(!is_http_url("not-a-url"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("javascript:alert(1)"));
        assert!(!is_http_url(""));
    }

    #[test]
    fn test_optional_url_allows_blank() {
        let mut errors = ValidationErrors::new();
        errors.check_optional_url("affiliate_link", None);
        errors.check_optional_url("affiliate_link", Some(""));
        assert!(errors.is_empty());

        errors.check_optional_url("affiliate_link", Some("not-a-url"));
        assert_eq!(errors.errors["affiliate_link"], vec!["must be a valid URL"]);
    }

    #[test]
    fn test_require_flags_blank() {
        let mut errors = ValidationErrors::new();
        errors.require("title", "  ");
        errors.require("author", "Ursula K. Le Guin");
        assert_eq!(errors.errors.len(), 1);
        assert!(errors.errors.contains_key("title"));
    }

    #[test]
    fn test_range_check_rating_bounds() {
        for ok in [1, 3, 5] {
            let mut errors = ValidationErrors::new();
            errors.check_range("rating", Some(ok), 1, 5);
            assert!(errors.is_empty(), "rating {} should pass", ok);
        }
        for bad in [0, 6] {
            let mut errors = ValidationErrors::new();
            errors.check_range("rating", Some(bad), 1, 5);
            assert!(!errors.is_empty(), "rating {} should fail", bad);
        }
        let mut errors = ValidationErrors::new();
        errors.check_range("rating", None, 1, 5);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_errors_accumulate_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add("url", "can't be blank");
        errors.add("url", "must be a valid URL");
        assert_eq!(errors.errors["url"].len(), 2);
    }

    #[test]
    fn test_normalize_category() {
        assert_eq!(normalize_category("TECH"), "tech");
        assert_eq!(normalize_category("  Fitness "), "fitness");
    }
}
