//! Project tech-stack serialization.
//!
//! The stored value is a JSON array, but legacy rows hold plain
//! comma-separated text. Reads try JSON first and fall back to a comma
//! split; writes always emit JSON.

/// Parse a stored tech-stack value into a list of entries.
pub fn parse(raw: Option<&str>) -> Vec<String> {
    let raw = match raw {
        Some(r) if !r.trim().is_empty() => r,
        _ => return Vec::new(),
    };

    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(list) => list,
        Err(_) => raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    }
}

/// Serialize a list for storage. Empty lists store as NULL.
pub fn serialize(stack: &[String]) -> Option<String> {
    if stack.is_empty() {
        None
    } else {
        serde_json::to_string(stack).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_array() {
        assert_eq!(
            parse(Some(r#"["Rust","Axum","PostgreSQL"]"#)),
            vec!["Rust", "Axum", "PostgreSQL"]
        );
    }

    #[test]
    fn test_parse_falls_back_to_comma_split() {
        assert_eq!(
            parse(Some("Rust, Axum ,PostgreSQL")),
            vec!["Rust", "Axum", "PostgreSQL"]
        );
    }

    #[test]
    fn test_parse_blank_is_empty() {
        assert!(parse(None).is_empty());
        assert!(parse(Some("")).is_empty());
        assert!(parse(Some("  ")).is_empty());
    }

    #[test]
    fn test_serialize_round_trip() {
        let stack = vec!["Rails".to_string(), "Hotwire".to_string()];
        let stored = serialize(&stack).unwrap();
        assert_eq!(parse(Some(&stored)), stack);
    }

    #[test]
    fn test_serialize_empty_is_null() {
        assert_eq!(serialize(&[]), None);
    }
}
