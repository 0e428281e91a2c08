//! Social platform metadata.
//!
//! One static table maps each supported platform to its display metadata.
//! Adding a platform means adding an enum variant and one table row.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialPlatform {
    Twitter,
    Youtube,
    Github,
    Linkedin,
    Instagram,
    Facebook,
    Tiktok,
    Twitch,
    Discord,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PlatformMeta {
    pub display_name: &'static str,
    pub icon: &'static str,
    pub color_class: &'static str,
}

pub static PLATFORM_TABLE: &[(SocialPlatform, PlatformMeta)] = &[
    (SocialPlatform::Twitter, PlatformMeta { display_name: "Twitter", icon: "twitter-x", color_class: "text-blue-400" }),
    (SocialPlatform::Youtube, PlatformMeta { display_name: "Youtube", icon: "youtube", color_class: "text-red-500" }),
    (SocialPlatform::Github, PlatformMeta { display_name: "Github", icon: "github", color_class: "text-gray-400" }),
    (SocialPlatform::Linkedin, PlatformMeta { display_name: "Linkedin", icon: "linkedin", color_class: "text-blue-600" }),
    (SocialPlatform::Instagram, PlatformMeta { display_name: "Instagram", icon: "instagram", color_class: "text-pink-500" }),
    (SocialPlatform::Facebook, PlatformMeta { display_name: "Facebook", icon: "facebook", color_class: "text-blue-500" }),
    (SocialPlatform::Tiktok, PlatformMeta { display_name: "Tiktok", icon: "tiktok", color_class: "text-black" }),
    (SocialPlatform::Twitch, PlatformMeta { display_name: "Twitch", icon: "twitch", color_class: "text-purple-500" }),
    (SocialPlatform::Discord, PlatformMeta { display_name: "Discord", icon: "discord", color_class: "text-indigo-500" }),
];

/// Fallback metadata for rows persisted before a platform was delisted.
pub static UNKNOWN_PLATFORM_META: PlatformMeta = PlatformMeta {
    display_name: "Link",
    icon: "link",
    color_class: "text-gray-500",
};

impl SocialPlatform {
    pub fn parse(s: &str) -> Option<Self> {
        PLATFORM_TABLE
            .iter()
            .find(|(p, _)| p.as_str() == s)
            .map(|(p, _)| *p)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SocialPlatform::Twitter => "twitter",
            SocialPlatform::Youtube => "youtube",
            SocialPlatform::Github => "github",
            SocialPlatform::Linkedin => "linkedin",
            SocialPlatform::Instagram => "instagram",
            SocialPlatform::Facebook => "facebook",
            SocialPlatform::Tiktok => "tiktok",
            SocialPlatform::Twitch => "twitch",
            SocialPlatform::Discord => "discord",
        }
    }

    pub fn meta(&self) -> &'static PlatformMeta {
        PLATFORM_TABLE
            .iter()
            .find(|(p, _)| p == self)
            .map(|(_, m)| m)
            .unwrap_or(&UNKNOWN_PLATFORM_META)
    }

    pub fn all_names() -> Vec<&'static str> {
        PLATFORM_TABLE.iter().map(|(p, _)| p.as_str()).collect()
    }
}

/// Metadata for a stored platform string, tolerating unknown values.
pub fn meta_for(platform: &str) -> &'static PlatformMeta {
    SocialPlatform::parse(platform)
        .map(|p| p.meta())
        .unwrap_or(&UNKNOWN_PLATFORM_META)
}

/// Compact follower counts: 1.2M, 3.4K, or the plain number.
pub fn format_follower_count(count: i32) -> String {
    let count = count as f64;
    if count >= 1_000_000.0 {
        format!("{:.1}M", (count / 1_000_000.0 * 10.0).round() / 10.0)
    } else if count >= 1_000.0 {
        format!("{:.1}K", (count / 1_000.0 * 10.0).round() / 10.0)
    } else {
        format!("{}", count as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_every_table_row() {
        for (platform, _) in PLATFORM_TABLE {
            assert_eq!(SocialPlatform::parse(platform.as_str()), Some(*platform));
        }
        assert_eq!(SocialPlatform::parse("myspace"), None);
    }

    #[test]
    fn test_meta_lookup() {
        assert_eq!(SocialPlatform::Twitter.meta().icon, "twitter-x");
        assert_eq!(SocialPlatform::Github.meta().color_class, "text-gray-400");
        assert_eq!(meta_for("discord").display_name, "Discord");
    }

    #[test]
    fn test_unknown_platform_falls_back() {
        assert_eq!(meta_for("myspace").icon, "link");
        assert_eq!(meta_for("myspace").color_class, "text-gray-500");
    }

    #[test]
    fn test_format_follower_count() {
        assert_eq!(format_follower_count(999), "999");
        assert_eq!(format_follower_count(1_500), "1.5K");
        assert_eq!(format_follower_count(12_340), "12.3K");
        assert_eq!(format_follower_count(2_500_000), "2.5M");
        assert_eq!(format_follower_count(0), "0");
    }
}
