#![forbid(unsafe_code)]

//! Controller configuration.
//!
//! Everything has a working default for the stock site layout; the content
//! entry point may pass a JSON document that overrides any subset of fields.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Page elements the controller reads or adjusts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    /// Main page content container; reserves space for the masthead.
    ContentContainer,
    /// Outer player container inside the watch layout.
    PlayerContainer,
    /// Theater/full-bleed wrapper around the player.
    FullBleedContainer,
    /// The video player itself; its width drives the scrubber correction.
    Player,
    /// Bottom control bar holding the progress bar.
    ProgressBar,
    /// Inner scrubber track, preferred source for the base width.
    Scrubber,
    /// The player's native fullscreen toggle button.
    FullscreenButton,
    /// Surface that receives double-clicks on the video.
    VideoSurface,
}

impl Target {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ContentContainer => "content-container",
            Self::PlayerContainer => "player-container",
            Self::FullBleedContainer => "full-bleed-container",
            Self::Player => "player",
            Self::ProgressBar => "progress-bar",
            Self::Scrubber => "scrubber",
            Self::FullscreenButton => "fullscreen-button",
            Self::VideoSurface => "video-surface",
        }
    }

    #[must_use]
    pub const fn all() -> [Self; 8] {
        [
            Self::ContentContainer,
            Self::PlayerContainer,
            Self::FullBleedContainer,
            Self::Player,
            Self::ProgressBar,
            Self::Scrubber,
            Self::FullscreenButton,
            Self::VideoSurface,
        ]
    }
}

/// CSS selectors for each [`Target`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Selectors {
    pub content_container: String,
    pub player_container: String,
    pub full_bleed_container: String,
    pub player: String,
    pub progress_bar: String,
    pub scrubber: String,
    pub fullscreen_button: String,
    pub video_surface: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            content_container: "#page-manager".to_owned(),
            player_container: "#player-container-outer".to_owned(),
            full_bleed_container: "#full-bleed-container".to_owned(),
            player: "#movie_player".to_owned(),
            progress_bar: "#movie_player .ytp-chrome-bottom".to_owned(),
            scrubber: "#movie_player .ytp-progress-bar-container".to_owned(),
            fullscreen_button: ".ytp-fullscreen-button.ytp-button".to_owned(),
            video_surface: "#movie_player .html5-video-container, #movie_player video.html5-main-video"
                .to_owned(),
        }
    }
}

impl Selectors {
    #[must_use]
    pub fn get(&self, target: Target) -> &str {
        match target {
            Target::ContentContainer => &self.content_container,
            Target::PlayerContainer => &self.player_container,
            Target::FullBleedContainer => &self.full_bleed_container,
            Target::Player => &self.player,
            Target::ProgressBar => &self.progress_bar,
            Target::Scrubber => &self.scrubber,
            Target::FullscreenButton => &self.fullscreen_button,
            Target::VideoSurface => &self.video_surface,
        }
    }
}

/// One inline style forced onto a target while emulation is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleOverride {
    pub target: Target,
    pub property: String,
    pub value: String,
}

impl StyleOverride {
    pub fn new(target: Target, property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            target,
            property: property.into(),
            value: value.into(),
        }
    }
}

fn default_overrides() -> Vec<StyleOverride> {
    vec![
        StyleOverride::new(Target::ContentContainer, "margin-top", "0px"),
        StyleOverride::new(Target::ContentContainer, "padding-top", "0px"),
        StyleOverride::new(Target::PlayerContainer, "margin-left", "0px"),
        StyleOverride::new(Target::PlayerContainer, "margin-right", "0px"),
        StyleOverride::new(Target::PlayerContainer, "padding-top", "0px"),
        StyleOverride::new(Target::PlayerContainer, "max-width", "none"),
        StyleOverride::new(Target::FullBleedContainer, "top", "0px"),
        StyleOverride::new(Target::FullBleedContainer, "padding-top", "0px"),
        StyleOverride::new(Target::FullBleedContainer, "max-height", "none"),
    ]
}

/// Which URLs count as watchable and which as short-form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Origins (`scheme://host[:port]`) the watch page may live on.
    pub origins: Vec<String>,
    /// Exact path of the watch page.
    pub watch_path: String,
    /// Query parameter that must carry a non-empty video id.
    pub video_param: String,
    /// Path prefix of short-form video pages.
    pub shorts_prefix: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            origins: vec![
                "https://www.youtube.com".to_owned(),
                "https://youtube.com".to_owned(),
                "https://m.youtube.com".to_owned(),
            ],
            watch_path: "/watch".to_owned(),
            video_param: "v".to_owned(),
            shorts_prefix: "/shorts/".to_owned(),
        }
    }
}

/// Full controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ControllerConfig {
    /// Toggle key, matched case-insensitively.
    pub hotkey: char,
    pub element_wait_timeout_ms: u64,
    pub pending_navigation_timeout_ms: u64,
    pub relay_reply_timeout_ms: u64,
    /// Class toggled on `<html>` and `<body>` while active.
    pub marker_class: String,
    /// Id of the injected `<style>` element.
    pub style_element_id: String,
    /// Query flag that enables the debug log (`?<flag>=1`).
    pub debug_query_flag: String,
    pub debug_log_capacity: usize,
    pub site: SiteConfig,
    pub selectors: Selectors,
    pub overrides: Vec<StyleOverride>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            hotkey: 'f',
            element_wait_timeout_ms: 8_000,
            pending_navigation_timeout_ms: 5_000,
            relay_reply_timeout_ms: 3_000,
            marker_class: "fullscroll-active".to_owned(),
            style_element_id: "fullscroll-style".to_owned(),
            debug_query_flag: "fullscroll-debug".to_owned(),
            debug_log_capacity: 500,
            site: SiteConfig::default(),
            selectors: Selectors::default(),
            overrides: default_overrides(),
        }
    }
}

impl ControllerConfig {
    /// Parse a (possibly partial) JSON document and validate it.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the controller relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.hotkey.is_ascii_alphabetic() {
            return Err(ConfigError::InvalidHotkey(self.hotkey));
        }
        for (field, value) in [
            ("element-wait-timeout-ms", self.element_wait_timeout_ms),
            (
                "pending-navigation-timeout-ms",
                self.pending_navigation_timeout_ms,
            ),
            ("relay-reply-timeout-ms", self.relay_reply_timeout_ms),
            ("debug-log-capacity", self.debug_log_capacity as u64),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroValue { field });
            }
        }
        for (field, value) in [
            ("marker-class", &self.marker_class),
            ("style-element-id", &self.style_element_id),
            ("debug-query-flag", &self.debug_query_flag),
        ] {
            if !is_css_token(value) {
                return Err(ConfigError::InvalidToken {
                    field,
                    value: value.clone(),
                });
            }
        }
        for target in Target::all() {
            if self.selectors.get(target).trim().is_empty() {
                return Err(ConfigError::EmptySelector(target.as_str()));
            }
        }
        for origin in &self.site.origins {
            let parsed = url::Url::parse(origin)
                .map_err(|_| ConfigError::InvalidOrigin(origin.clone()))?;
            if !parsed.origin().is_tuple() {
                return Err(ConfigError::InvalidOrigin(origin.clone()));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn is_hotkey(&self, key: &str) -> bool {
        let mut chars = key.chars();
        matches!(
            (chars.next(), chars.next()),
            (Some(ch), None) if ch.eq_ignore_ascii_case(&self.hotkey)
        )
    }

    #[must_use]
    pub const fn element_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.element_wait_timeout_ms)
    }

    #[must_use]
    pub const fn pending_navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.pending_navigation_timeout_ms)
    }

    #[must_use]
    pub const fn relay_reply_timeout(&self) -> Duration {
        Duration::from_millis(self.relay_reply_timeout_ms)
    }

    /// Distinct override targets, in first-seen order.
    #[must_use]
    pub fn override_targets(&self) -> Vec<Target> {
        let mut targets = Vec::new();
        for item in &self.overrides {
            if !targets.contains(&item.target) {
                targets.push(item.target);
            }
        }
        targets
    }
}

fn is_css_token(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        ControllerConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            ControllerConfig::from_json(r#"{"hotkey":"g","site":{"watch-path":"/view"}}"#)
                .unwrap();
        assert_eq!(config.hotkey, 'g');
        assert_eq!(config.site.watch_path, "/view");
        assert_eq!(config.site.video_param, "v");
        assert_eq!(config.pending_navigation_timeout_ms, 5_000);
    }

    #[test]
    fn rejects_non_letter_hotkey() {
        let err = ControllerConfig::from_json(r#"{"hotkey":"7"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHotkey('7')));
    }

    #[test]
    fn rejects_zero_timeouts() {
        let err = ControllerConfig::from_json(r#"{"element-wait-timeout-ms":0}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ZeroValue {
                field: "element-wait-timeout-ms"
            }
        ));
    }

    #[test]
    fn rejects_marker_class_with_spaces() {
        let err = ControllerConfig::from_json(r#"{"marker-class":"a b"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidToken { .. }));
    }

    #[test]
    fn rejects_opaque_origin() {
        let err =
            ControllerConfig::from_json(r#"{"site":{"origins":["data:text/plain,hi"]}}"#)
                .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOrigin(_)));
    }

    #[test]
    fn hotkey_is_case_insensitive_single_char() {
        let config = ControllerConfig::default();
        assert!(config.is_hotkey("f"));
        assert!(config.is_hotkey("F"));
        assert!(!config.is_hotkey("ff"));
        assert!(!config.is_hotkey("Escape"));
        assert!(!config.is_hotkey(""));
    }

    #[test]
    fn override_targets_are_deduplicated() {
        assert_eq!(
            ControllerConfig::default().override_targets(),
            vec![
                Target::ContentContainer,
                Target::PlayerContainer,
                Target::FullBleedContainer
            ]
        );
    }
}
