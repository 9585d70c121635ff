#![forbid(unsafe_code)]

//! Progress-bar geometry while emulation is active.
//!
//! The player's control bar is laid out for the player's normal width. When
//! the player grows to fill the viewport the bar has to follow. Scaling it
//! with a transform compounds on every resize, so instead the bar is pinned
//! to `left: 0`, given an explicit pixel width equal to the player width, and
//! any transform is cleared. The ratio against the original width is still
//! published for styles that want it.
//!
//! The base width is resolved once per activation and then cached: after the
//! first correction the bar's own rect already reflects the new width.

/// Custom property carrying the current scale on the progress bar.
pub const SCALE_PROPERTY: &str = "--fullscroll-scrubber-scale";

/// Widths available when resolving the base width, in preference order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseWidthSources {
    /// Inner scrubber track width, when the element exists.
    pub scrubber: Option<f64>,
    /// Progress-bar container rect width, when the element exists.
    pub container: Option<f64>,
    pub viewport: f64,
}

impl BaseWidthSources {
    /// First usable (finite, positive) width in preference order.
    #[must_use]
    pub fn resolve(self) -> Option<f64> {
        [self.scrubber, self.container, Some(self.viewport)]
            .into_iter()
            .flatten()
            .find(|width| usable(*width))
    }
}

fn usable(width: f64) -> bool {
    width.is_finite() && width > 0.0
}

/// Corrected layout for the progress bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrubberLayout {
    pub player_width: f64,
    pub base_width: f64,
    pub scale: f64,
}

impl ScrubberLayout {
    /// `None` when either width is unusable.
    #[must_use]
    pub fn compute(player_width: f64, base_width: f64) -> Option<Self> {
        if !usable(player_width) || !usable(base_width) {
            return None;
        }
        Some(Self {
            player_width,
            base_width,
            scale: player_width / base_width,
        })
    }

    /// Inline declarations to apply, all with `!important`.
    #[must_use]
    pub fn declarations(&self) -> [(&'static str, String); 5] {
        let width = format_px(self.player_width);
        [
            ("left", "0px".to_owned()),
            ("width", width.clone()),
            ("max-width", width),
            ("transform", "none".to_owned()),
            (SCALE_PROPERTY, format_scale(self.scale)),
        ]
    }
}

/// Format a pixel length, dropping a zero fraction (`1280px`, `853.33px`).
#[must_use]
pub fn format_px(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}px")
    } else {
        format!("{rounded}px")
    }
}

fn format_scale(scale: f64) -> String {
    let rounded = (scale * 10_000.0).round() / 10_000.0;
    format!("{rounded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_width_prefers_scrubber_then_container_then_viewport() {
        let all = BaseWidthSources {
            scrubber: Some(600.0),
            container: Some(640.0),
            viewport: 1920.0,
        };
        assert_eq!(all.resolve(), Some(600.0));
        assert_eq!(
            BaseWidthSources {
                scrubber: Some(0.0),
                ..all
            }
            .resolve(),
            Some(640.0)
        );
        assert_eq!(
            BaseWidthSources {
                scrubber: None,
                container: Some(f64::NAN),
                viewport: 1920.0,
            }
            .resolve(),
            Some(1920.0)
        );
        assert_eq!(
            BaseWidthSources {
                scrubber: None,
                container: None,
                viewport: 0.0,
            }
            .resolve(),
            None
        );
    }

    #[test]
    fn layout_pins_bar_without_transform() {
        let layout = ScrubberLayout::compute(1920.0, 640.0).unwrap();
        assert_eq!(layout.scale, 3.0);
        let decls = layout.declarations();
        assert_eq!(decls[0], ("left", "0px".to_owned()));
        assert_eq!(decls[1], ("width", "1920px".to_owned()));
        assert_eq!(decls[2], ("max-width", "1920px".to_owned()));
        assert_eq!(decls[3], ("transform", "none".to_owned()));
        assert_eq!(decls[4], (SCALE_PROPERTY, "3".to_owned()));
    }

    #[test]
    fn layout_rejects_degenerate_widths() {
        assert_eq!(ScrubberLayout::compute(0.0, 640.0), None);
        assert_eq!(ScrubberLayout::compute(1920.0, -1.0), None);
        assert_eq!(ScrubberLayout::compute(f64::INFINITY, 640.0), None);
    }

    #[test]
    fn px_formatting() {
        assert_eq!(format_px(1280.0), "1280px");
        assert_eq!(format_px(853.333_333), "853.33px");
        assert_eq!(format_px(0.004), "0px");
    }
}
