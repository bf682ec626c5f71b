use serde::Serialize;
use std::fmt;

/// The video-hosting service a URL points to.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Tiktok,
    Instagram,
    Facebook,
    Pinterest,
    Twitter,
    Unknown,
}

/// Checked top to bottom, first hit wins.
const RULES: &[(&[&str], Platform)] = &[
    (&["youtube.com", "youtu.be"], Platform::Youtube),
    (&["tiktok.com"], Platform::Tiktok),
    (&["instagram.com"], Platform::Instagram),
    (&["facebook.com", "fb.watch"], Platform::Facebook),
    (&["pinterest."], Platform::Pinterest),
    (&["twitter.com", "x.com"], Platform::Twitter),
];

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Tiktok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::Pinterest => "pinterest",
            Platform::Twitter => "twitter",
            Platform::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Labels a URL by case-insensitive substring match. Never fails.
pub fn classify(url: &str) -> Platform {
    let lowered = url.to_lowercase();
    RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| lowered.contains(n)))
        .map(|(_, platform)| *platform)
        .unwrap_or(Platform::Unknown)
}
