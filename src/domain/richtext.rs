//! Rich-text handling.
//!
//! Rich fields (post content, book reviews, descriptions) are stored as
//! sanitized HTML columns. `RichText` is the only thing the rest of the
//! domain sees: presence, plain-text rendering, word counts, and
//! word-boundary excerpts. Sanitization happens once, on write.

/// Words-per-minute assumed for reading-time estimates.
const READING_SPEED_WPM: usize = 200;

/// Sanitize untrusted HTML before it is stored.
pub fn sanitize(html: &str) -> String {
    ammonia::clean(html)
}

/// A stored rich-text value. Blank markup counts as absent.
#[derive(Debug, Clone, Default)]
pub struct RichText(Option<String>);

impl RichText {
    pub fn new(html: Option<&str>) -> Self {
        match html {
            Some(h) if !h.trim().is_empty() => RichText(Some(h.to_string())),
            _ => RichText(None),
        }
    }

    pub fn is_present(&self) -> bool {
        self.0.is_some()
    }

    /// Strip tags and decode the entities ammonia emits, collapsing
    /// whitespace runs to single spaces.
    pub fn to_plain_text(&self) -> String {
        let html = match &self.0 {
            Some(h) => h,
            None => return String::new(),
        };

        let mut text = String::with_capacity(html.len());
        let mut in_tag = false;
        for c in html.chars() {
            match c {
                '<' => in_tag = true,
                '>' => {
                    in_tag = false;
                    text.push(' ');
                }
                c if !in_tag => text.push(c),
                _ => {}
            }
        }

        let decoded = text
            .replace("&nbsp;", " ")
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&apos;", "'");

        decoded.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Whitespace-delimited token count of the plain-text rendering.
    pub fn word_count(&self) -> usize {
        self.to_plain_text().split_whitespace().count()
    }

    /// Plain-text excerpt truncated at a word boundary, with an ellipsis
    /// when anything was cut. `max_len` is in bytes; the cut point backs up
    /// to a char boundary so multi-byte text never splits mid-character.
    pub fn excerpt(&self, max_len: usize) -> String {
        let plain = self.to_plain_text();
        if plain.len() <= max_len {
            return plain;
        }

        let mut end = max_len;
        while !plain.is_char_boundary(end) {
            end -= 1;
        }

        let mut cut = &plain[..end];
        if let Some(idx) = cut.rfind(' ') {
            cut = &cut[..idx];
        }
        format!("{}...", cut.trim_end())
    }
}

/// Reading time in minutes at 200 wpm, rounded up. `None` when there is no
/// content to read.
pub fn reading_time_minutes(content: &RichText) -> Option<i32> {
    if !content.is_present() {
        return None;
    }
    let words = content.word_count();
    Some(words.div_ceil(READING_SPEED_WPM) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_html_is_absent() {
        assert!(!RichText::new(None).is_present());
        assert!(!RichText::new(Some("   ")).is_present());
        assert!(RichText::new(Some("<p>hi</p>")).is_present());
    }

    #[test]
    fn test_to_plain_text_strips_tags() {
        let rt = RichText::new(Some("<p>Hello <strong>world</strong></p>"));
        assert_eq!(rt.to_plain_text(), "Hello world");
    }

    #[test]
    fn test_to_plain_text_decodes_entities() {
        let rt = RichText::new(Some("<p>fish &amp; chips&nbsp;&lt;3</p>"));
        assert_eq!(rt.to_plain_text(), "fish & chips <3");
    }

    #[test]
    fn test_word_count() {
        let rt = RichText::new(Some("<p>one two</p><p>three</p>"));
        assert_eq!(rt.word_count(), 3);
    }

    #[test]
    fn test_reading_time_400_words_is_two_minutes() {
        let body = vec!["word"; 400].join(" ");
        let rt = RichText::new(Some(&format!("<p>{}</p>", body)));
        assert_eq!(reading_time_minutes(&rt), Some(2));
    }

    #[test]
    fn test_reading_time_single_word_is_one_minute() {
        let rt = RichText::new(Some("<p>word</p>"));
        assert_eq!(reading_time_minutes(&rt), Some(1));
    }

    #[test]
    fn test_reading_time_absent_content() {
        assert_eq!(reading_time_minutes(&RichText::new(None)), None);
    }

    #[test]
    fn test_excerpt_truncates_at_word_boundary() {
        let rt = RichText::new(Some("<p>the quick brown fox jumps over</p>"));
        assert_eq!(rt.excerpt(12), "the quick...");
    }

    #[test]
    fn test_excerpt_backs_up_to_char_boundary() {
        // 149 ASCII bytes followed by a two-byte character straddling the
        // default 150-byte cut point.
        let body = format!("{}é voilà", "a".repeat(149));
        let rt = RichText::new(Some(&format!("<p>{}</p>", body)));
        let out = rt.excerpt(150);
        assert!(out.ends_with("..."));
        assert!(!out.contains('é'));

        // All multi-byte, no spaces: still must not panic.
        let rt = RichText::new(Some(&"é".repeat(200)));
        let out = rt.excerpt(150);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_excerpt_short_text_untouched() {
        let rt = RichText::new(Some("<p>short</p>"));
        assert_eq!(rt.excerpt(100), "short");
    }

    #[test]
    fn test_sanitize_removes_scripts() {
        let clean = sanitize("<p>ok</p><script>alert(1)</script>");
        assert!(!clean.contains("script"));
        assert!(clean.contains("ok"));
    }
}
