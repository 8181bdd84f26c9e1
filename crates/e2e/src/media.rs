//! How the bookreader renders links and media inside a comment.
//!
//! Annotation cases use these rules to work out what the page should show
//! for a given comment body: which URLs become anchors, how their labels
//! are truncated, and which embedded element a media preview contains.

use once_cell::sync::Lazy;
use regex::Regex;

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(https?)://[-A-Za-z0-9+&@#/%?=~_|!:,.;]*[-A-Za-z0-9+&@#/%=~_|]")
        .expect("static URL pattern")
});

/// Longest anchor label shown before truncation
pub const LINK_LABEL_LIMIT: usize = 32;

/// Every URL in a comment, in order of appearance
pub fn find_urls(text: &str) -> Vec<&str> {
    URL_RE.find_iter(text).map(|m| m.as_str()).collect()
}

/// The anchor text the page shows for `url`.
///
/// The `http://` prefix is dropped; when what remains is too long the label
/// is cut from the full URL instead and suffixed with `...`.
pub fn link_label(url: &str) -> String {
    // Only the first occurrence, so embedded URLs keep their scheme.
    let name = url.replacen("http://", "", 1);
    if name.chars().count() > LINK_LABEL_LIMIT {
        let head: String = url.chars().take(LINK_LABEL_LIMIT).collect();
        format!("{head}...")
    } else {
        name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Image,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
        }
    }
}

/// A recognised media source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaService {
    YouTube,
    Vimeo,
    Twitpic,
    YFrog,
    DirectImage,
    DirectAudio,
    SoundCloud,
}

struct Rule {
    service: MediaService,
    pattern: Regex,
}

// Checked in this order; the first matching rule wins.
static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    [
        (MediaService::YouTube, r"youtube.com"),
        (MediaService::Vimeo, r"vimeo.com"),
        (MediaService::Twitpic, r"twitpic.com"),
        (MediaService::YFrog, r"yfrog.com"),
        (MediaService::DirectImage, r"(\.png|\.gif|\.jpg)$"),
        (MediaService::DirectAudio, r"(\.ogg|\.mp3)$"),
        (MediaService::SoundCloud, r"soundcloud.com"),
    ]
    .into_iter()
    .map(|(service, pattern)| Rule {
        service,
        pattern: Regex::new(pattern).expect("static media pattern"),
    })
    .collect()
});

static YOUTUBE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"v=[a-zA-Z0-9]+").expect("static"));
static VIMEO_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"vimeo.com/[0-9]+$").expect("static"));
static TWITPIC_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"twitpic.com/\w+$").expect("static"));

impl MediaService {
    /// The service whose rule first matches `url`
    pub fn classify(url: &str) -> Option<Self> {
        RULES
            .iter()
            .find(|rule| rule.pattern.is_match(url))
            .map(|rule| rule.service)
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            MediaService::YouTube | MediaService::Vimeo => MediaKind::Video,
            MediaService::Twitpic | MediaService::YFrog | MediaService::DirectImage => {
                MediaKind::Image
            }
            MediaService::DirectAudio | MediaService::SoundCloud => MediaKind::Audio,
        }
    }

    /// Tag name of the element embedded in the preview
    pub fn element(&self) -> &'static str {
        match self {
            MediaService::YouTube | MediaService::Vimeo | MediaService::SoundCloud => "object",
            MediaService::Twitpic | MediaService::YFrog | MediaService::DirectImage => "img",
            MediaService::DirectAudio => "audio",
        }
    }

    /// Whether `url` carries what the service needs to build an embed.
    /// Without it the preview container is rendered empty.
    pub fn embeds(&self, url: &str) -> bool {
        match self {
            MediaService::YouTube => YOUTUBE_ID.is_match(url),
            MediaService::Vimeo => VIMEO_ID.is_match(url),
            MediaService::Twitpic => TWITPIC_ID.is_match(url),
            _ => true,
        }
    }
}

/// What a media preview for a URL should contain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preview {
    pub service: MediaService,
    pub kind: MediaKind,
    pub element: &'static str,
}

impl Preview {
    /// `None` when the URL produces no embedded element
    pub fn for_url(url: &str) -> Option<Self> {
        let service = MediaService::classify(url)?;
        if !service.embeds(url) {
            return None;
        }
        Some(Self {
            service,
            kind: service.kind(),
            element: service.element(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("http://www.youtube.com/watch?v=dQw4w9WgXcQ", MediaService::YouTube, "object" ; "youtube")]
    #[test_case("http://vimeo.com/2696386", MediaService::Vimeo, "object" ; "vimeo")]
    #[test_case("http://twitpic.com/4t3m1k", MediaService::Twitpic, "img" ; "twitpic")]
    #[test_case("http://yfrog.com/h4xlzcj", MediaService::YFrog, "img" ; "yfrog")]
    #[test_case("http://soundcloud.com/forss/flickermood", MediaService::SoundCloud, "object" ; "soundcloud")]
    #[test_case("http://example.com/a.png", MediaService::DirectImage, "img" ; "png")]
    #[test_case("http://example.com/a.gif", MediaService::DirectImage, "img" ; "gif")]
    #[test_case("http://example.com/a.jpg", MediaService::DirectImage, "img" ; "jpg")]
    #[test_case("http://example.com/a.ogg", MediaService::DirectAudio, "audio" ; "ogg")]
    #[test_case("http://example.com/a.mp3", MediaService::DirectAudio, "audio" ; "mp3")]
    fn test_preview_for_url(url: &str, service: MediaService, element: &str) {
        let preview = Preview::for_url(url).expect("preview");
        assert_eq!(preview.service, service);
        assert_eq!(preview.element, element);
        assert_eq!(preview.kind, service.kind());
    }

    #[test]
    fn test_first_rule_wins() {
        // A PNG hosted on twitpic is treated as twitpic.
        assert_eq!(
            MediaService::classify("http://twitpic.com/show/a.png"),
            Some(MediaService::Twitpic)
        );
        // Soundcloud is checked after the audio suffix rule.
        assert_eq!(
            MediaService::classify("http://soundcloud.com/x/track.mp3"),
            Some(MediaService::DirectAudio)
        );
    }

    #[test]
    fn test_no_embed_without_id() {
        assert_eq!(
            MediaService::classify("http://www.youtube.com/user/foo"),
            Some(MediaService::YouTube)
        );
        assert!(Preview::for_url("http://www.youtube.com/user/foo").is_none());
        assert!(Preview::for_url("http://vimeo.com/channels/staff").is_none());
        assert!(Preview::for_url("http://example.com/page.html").is_none());
    }

    #[test]
    fn test_kinds() {
        assert_eq!(MediaService::SoundCloud.kind(), MediaKind::Audio);
        assert_eq!(MediaService::Vimeo.kind(), MediaKind::Video);
        assert_eq!(MediaService::YFrog.kind(), MediaKind::Image);
        assert_eq!(MediaKind::Audio.as_str(), "audio");
    }

    #[test]
    fn test_find_urls() {
        let text = "see http://example.com/a and https://foo.org/b?c=1, then stop.";
        assert_eq!(find_urls(text), vec!["http://example.com/a", "https://foo.org/b?c=1"]);
        assert!(find_urls("no links here").is_empty());
    }

    #[test]
    fn test_link_label_short() {
        assert_eq!(link_label("http://example.com/"), "example.com/");
        assert_eq!(link_label("https://example.com/"), "https://example.com/");
    }

    #[test]
    fn test_link_label_truncates_from_full_url() {
        let url = "http://example.com/a/really/long/path/to/something";
        assert_eq!(link_label(url), "http://example.com/a/really/long...");
        assert_eq!(link_label(url).len(), LINK_LABEL_LIMIT + 3);
    }

    #[test]
    fn test_link_label_strips_first_scheme_only() {
        assert_eq!(link_label("http://a.io/r?u=http://b.io"), "a.io/r?u=http://b.io");
    }
}
