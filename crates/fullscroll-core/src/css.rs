#![forbid(unsafe_code)]

//! Stylesheet injected once per page. Every rule is gated on the marker
//! class, so the sheet is inert until the controller activates.

/// Build the emulation stylesheet for `marker` (a validated class token).
#[must_use]
pub fn emulation_stylesheet(marker: &str) -> String {
    format!(
        "\
html.{m}, body.{m} {{
  overflow-x: hidden !important;
  overflow-y: auto !important;
  height: auto !important;
}}
body.{m} ytd-masthead,
body.{m} #masthead-container,
body.{m} #secondary.ytd-watch-flexy {{
  display: none !important;
}}
body.{m} #page-manager.ytd-app {{
  margin-top: 0 !important;
}}
body.{m} #columns,
body.{m} #primary,
body.{m} #primary-inner {{
  max-width: none !important;
}}
body.{m} #player-container-outer,
body.{m} #full-bleed-container,
body.{m} #player.ytd-watch-flexy {{
  width: 100vw !important;
  height: 100vh !important;
  max-height: none !important;
}}
body.{m} .html5-video-player,
body.{m} .html5-video-container,
body.{m} .video-stream.html5-main-video {{
  width: 100% !important;
  height: 100% !important;
  left: 0 !important;
  top: 0 !important;
}}
body.{m} .video-stream.html5-main-video {{
  object-fit: contain !important;
}}
",
        m = marker
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_rule_is_gated_on_the_marker() {
        let css = emulation_stylesheet("fullscroll-active");
        let selector_lines = css
            .lines()
            .map(str::trim)
            .filter(|line| line.ends_with(',') || line.ends_with('{'));
        for selector_line in selector_lines {
            assert!(
                selector_line.contains(".fullscroll-active"),
                "ungated selector: {selector_line}"
            );
        }
    }

    #[test]
    fn braces_balance() {
        let css = emulation_stylesheet("m");
        assert_eq!(css.matches('{').count(), css.matches('}').count());
    }
}
