#![forbid(unsafe_code)]

//! Host-neutral description of the page input the controller reacts to.
//!
//! The web host translates DOM `KeyboardEvent`/`MouseEvent` values into these
//! types; tests build them directly.

use bitflags::bitflags;

bitflags! {
    /// Modifier keys held during an input event.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
        const META  = 0b1000;
    }
}

impl Modifiers {
    #[must_use]
    pub fn from_flags(shift: bool, alt: bool, ctrl: bool, meta: bool) -> Self {
        let mut mods = Self::empty();
        mods.set(Self::SHIFT, shift);
        mods.set(Self::ALT, alt);
        mods.set(Self::CTRL, ctrl);
        mods.set(Self::META, meta);
        mods
    }

    /// Ctrl, Alt or Meta held; these turn a letter into a browser shortcut.
    #[must_use]
    pub const fn has_command(self) -> bool {
        self.intersects(Self::ALT.union(Self::CTRL).union(Self::META))
    }
}

/// What currently has keyboard focus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FocusContext {
    /// Lowercase tag name of the focused element (`""` for none/body).
    pub tag: String,
    pub content_editable: bool,
    pub editable_ancestor: bool,
}

impl FocusContext {
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// True when a letter key belongs to the focused element: text entry,
    /// or keyboard activation of a button/select.
    #[must_use]
    pub fn is_typing(&self) -> bool {
        self.content_editable
            || self.editable_ancestor
            || matches!(
                self.tag.as_str(),
                "input" | "textarea" | "button" | "select"
            )
    }
}

/// A `keydown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInput {
    /// DOM `KeyboardEvent.key`.
    pub key: String,
    pub modifiers: Modifiers,
    pub repeat: bool,
    pub focus: FocusContext,
}

impl KeyInput {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            modifiers: Modifiers::empty(),
            repeat: false,
            focus: FocusContext::default(),
        }
    }

    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    #[must_use]
    pub fn with_focus(mut self, focus: FocusContext) -> Self {
        self.focus = focus;
        self
    }

    #[must_use]
    pub fn repeated(mut self) -> Self {
        self.repeat = true;
        self
    }

    #[must_use]
    pub fn is_escape(&self) -> bool {
        self.key == "Escape" || self.key == "Esc"
    }
}

/// Whether the host should swallow the DOM event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Handled here; prevent default and stop propagation.
    Consumed,
    /// Let the page handle it.
    Ignored,
}

impl Disposition {
    #[must_use]
    pub const fn consumed(handled: bool) -> Self {
        if handled { Self::Consumed } else { Self::Ignored }
    }

    #[must_use]
    pub const fn is_consumed(self) -> bool {
        matches!(self, Self::Consumed)
    }
}

/// Primary mouse button as reported by `MouseEvent.button`.
pub const PRIMARY_BUTTON: i16 = 0;

/// A click on a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkClick {
    /// Absolute destination URL.
    pub href: String,
    pub button: i16,
    pub modifiers: Modifiers,
    /// `target="_blank"` or a `download` link.
    pub opens_elsewhere: bool,
}

impl LinkClick {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            button: PRIMARY_BUTTON,
            modifiers: Modifiers::empty(),
            opens_elsewhere: false,
        }
    }

    /// Left click with no modifiers that navigates this tab.
    #[must_use]
    pub fn is_plain_navigation(&self) -> bool {
        self.button == PRIMARY_BUTTON && self.modifiers.is_empty() && !self.opens_elsewhere
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_contexts() {
        assert!(FocusContext::element("INPUT").is_typing());
        assert!(FocusContext::element("textarea").is_typing());
        assert!(FocusContext::element("button").is_typing());
        assert!(FocusContext::element("select").is_typing());
        assert!(!FocusContext::element("div").is_typing());
        assert!(!FocusContext::default().is_typing());
        assert!(
            FocusContext {
                tag: "div".into(),
                content_editable: true,
                editable_ancestor: false,
            }
            .is_typing()
        );
        assert!(
            FocusContext {
                tag: "span".into(),
                content_editable: false,
                editable_ancestor: true,
            }
            .is_typing()
        );
    }

    #[test]
    fn shift_is_not_a_command_modifier() {
        assert!(!Modifiers::SHIFT.has_command());
        assert!(Modifiers::CTRL.has_command());
        assert!(Modifiers::from_flags(false, true, false, false).has_command());
        assert!((Modifiers::SHIFT | Modifiers::META).has_command());
    }

    #[test]
    fn plain_navigation_requires_primary_button_and_no_modifiers() {
        let link = LinkClick::new("https://www.youtube.com/feed/trending");
        assert!(link.is_plain_navigation());
        assert!(
            !LinkClick {
                button: 1,
                ..link.clone()
            }
            .is_plain_navigation()
        );
        assert!(
            !LinkClick {
                modifiers: Modifiers::SHIFT,
                ..link.clone()
            }
            .is_plain_navigation()
        );
        assert!(
            !LinkClick {
                opens_elsewhere: true,
                ..link
            }
            .is_plain_navigation()
        );
    }
}
