//! Platform classification from submitted URLs

/// Supported source platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    YouTube,
    TikTok,
    Instagram,
    Unknown,
}

impl Platform {
    /// Classifies a URL by case-insensitive substring match against known
    /// domain markers. Total function: never fails, never touches the network.
    pub fn classify(url: &str) -> Self {
        let url = url.to_lowercase();

        if url.contains("youtube.com") || url.contains("youtu.be") {
            Platform::YouTube
        } else if url.contains("tiktok.com") {
            Platform::TikTok
        } else if url.contains("instagram.com") {
            Platform::Instagram
        } else {
            Platform::Unknown
        }
    }

    /// YouTube gets the full two-level quality menu; other platforms only
    /// offer the fixed "best" quick choices.
    pub fn has_quality_menu(&self) -> bool {
        matches!(self, Platform::YouTube)
    }

    /// Emoji shown next to the title in the metadata summary.
    pub fn emoji(&self) -> &'static str {
        match self {
            Platform::YouTube => "▶️",
            Platform::TikTok => "📱",
            Platform::Instagram => "📸",
            Platform::Unknown => "🎥",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_domains() {
        assert_eq!(Platform::classify("https://www.youtube.com/watch?v=abc"), Platform::YouTube);
        assert_eq!(Platform::classify("https://youtu.be/abc"), Platform::YouTube);
        assert_eq!(
            Platform::classify("https://www.tiktok.com/@x/video/1"),
            Platform::TikTok
        );
        assert_eq!(Platform::classify("https://instagram.com/reel/xyz"), Platform::Instagram);
        assert_eq!(Platform::classify("https://vimeo.com/123"), Platform::Unknown);
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(Platform::classify("HTTPS://YOUTU.BE/x"), Platform::YouTube);
        assert_eq!(Platform::classify("https://WWW.TikTok.COM/@a"), Platform::TikTok);
    }

    #[test]
    fn classification_is_idempotent() {
        let url = "https://youtu.be/dQw4w9WgXcQ";
        assert_eq!(Platform::classify(url), Platform::classify(url));
    }

    #[test]
    fn only_youtube_has_quality_menu() {
        assert!(Platform::YouTube.has_quality_menu());
        assert!(!Platform::TikTok.has_quality_menu());
        assert!(!Platform::Instagram.has_quality_menu());
        assert!(!Platform::Unknown.has_quality_menu());
    }
}
