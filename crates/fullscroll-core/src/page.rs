#![forbid(unsafe_code)]

//! Page classification by URL.

use url::Url;

use crate::config::SiteConfig;

/// What kind of page a URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Canonical single-video watch page; emulation may activate.
    Watch,
    /// Short-form video page; never activatable.
    Shorts,
    /// Anything else, including unparseable URLs and foreign origins.
    Other,
}

impl PageKind {
    #[must_use]
    pub const fn is_watchable(self) -> bool {
        matches!(self, Self::Watch)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Watch => "watch",
            Self::Shorts => "shorts",
            Self::Other => "other",
        }
    }
}

impl SiteConfig {
    /// Classify an absolute URL.
    #[must_use]
    pub fn classify(&self, href: &str) -> PageKind {
        let Ok(url) = Url::parse(href) else {
            return PageKind::Other;
        };
        if !self.is_site_origin(&url) {
            return PageKind::Other;
        }
        let path = url.path();
        if path.starts_with(&self.shorts_prefix) {
            return PageKind::Shorts;
        }
        if path != self.watch_path {
            return PageKind::Other;
        }
        let has_video = url
            .query_pairs()
            .any(|(key, value)| key == self.video_param.as_str() && !value.trim().is_empty());
        if has_video {
            PageKind::Watch
        } else {
            PageKind::Other
        }
    }

    #[must_use]
    pub fn is_watchable(&self, href: &str) -> bool {
        self.classify(href).is_watchable()
    }

    fn is_site_origin(&self, url: &Url) -> bool {
        let origin = url.origin();
        if !origin.is_tuple() {
            return false;
        }
        let serialized = origin.ascii_serialization();
        self.origins
            .iter()
            .any(|allowed| allowed.trim_end_matches('/').eq_ignore_ascii_case(&serialized))
    }
}
