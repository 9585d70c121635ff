#![forbid(unsafe_code)]
#![allow(dead_code)]

//! In-memory page host that records every call the controller makes.

use core::time::Duration;
use std::collections::{BTreeMap, HashMap};

use fullscroll_core::coalesce::Schedule;
use fullscroll_core::controller::{Controller, PageHost, Target, Timer};
use fullscroll_core::message::{FullscreenResponse, SetFullscreenRequest, WindowState};
use fullscroll_core::snapshot::StyleValue;
use fullscroll_core::ControllerConfig;

pub const WATCH_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
pub const OTHER_WATCH_URL: &str = "https://www.youtube.com/watch?v=9bZkp7q19f0";
pub const HOME_URL: &str = "https://www.youtube.com/";
pub const SHORTS_URL: &str = "https://www.youtube.com/shorts/abc123";

pub type ElementId = u32;

pub const CONTENT: ElementId = 1;
pub const PLAYER_CONTAINER: ElementId = 2;
pub const FULL_BLEED: ElementId = 3;
pub const PLAYER: ElementId = 4;
pub const PROGRESS_BAR: ElementId = 5;
pub const SCRUBBER: ElementId = 6;

#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    InstallStylesheet(String),
    SetStyle(ElementId, String, StyleValue),
    RemoveStyle(ElementId, String),
    Marker(bool),
    ResizeListener(bool),
    SyntheticResize,
    Schedule(Timer, Schedule),
    Cancel(Timer),
    AwaitElement(Target, Duration),
    CancelWaits,
    ArmButtonWatch,
    ExitNativeFullscreen,
    Notify(SetFullscreenRequest),
}

impl HostCall {
    /// Calls that change the document.
    pub fn mutates_dom(&self) -> bool {
        matches!(
            self,
            Self::SetStyle(..)
                | Self::RemoveStyle(..)
                | Self::Marker(_)
                | Self::SyntheticResize
                | Self::InstallStylesheet(_)
        )
    }
}

#[derive(Debug, Clone)]
pub struct FakePage {
    pub url: String,
    pub elements: HashMap<Target, ElementId>,
    pub styles: HashMap<ElementId, BTreeMap<String, StyleValue>>,
    pub widths: HashMap<ElementId, f64>,
    pub viewport: f64,
    pub marker: bool,
    pub resize_listener: bool,
    pub timers: HashMap<Timer, Schedule>,
    pub waits: Vec<Target>,
    pub calls: Vec<HostCall>,
}

impl FakePage {
    /// A watch page in its normal (non-fullscreen) layout.
    pub fn watch_page() -> Self {
        let elements = HashMap::from([
            (Target::ContentContainer, CONTENT),
            (Target::PlayerContainer, PLAYER_CONTAINER),
            (Target::FullBleedContainer, FULL_BLEED),
            (Target::Player, PLAYER),
            (Target::ProgressBar, PROGRESS_BAR),
            (Target::Scrubber, SCRUBBER),
        ]);
        let mut styles: HashMap<ElementId, BTreeMap<String, StyleValue>> = HashMap::new();
        styles
            .entry(CONTENT)
            .or_default()
            .insert("margin-top".into(), StyleValue::new("56px", false));
        styles
            .entry(PROGRESS_BAR)
            .or_default()
            .insert("width".into(), StyleValue::new("1256px", false));
        styles
            .entry(PROGRESS_BAR)
            .or_default()
            .insert("left".into(), StyleValue::new("12px", false));
        styles
            .entry(PROGRESS_BAR)
            .or_default()
            .insert("transform".into(), StyleValue::new("scale(1)", true));
        let widths = HashMap::from([(PLAYER, 1280.0), (PROGRESS_BAR, 1256.0), (SCRUBBER, 1256.0)]);
        Self {
            url: WATCH_URL.to_owned(),
            elements,
            styles,
            widths,
            viewport: 1920.0,
            marker: false,
            resize_listener: false,
            timers: HashMap::new(),
            waits: Vec::new(),
            calls: Vec::new(),
        }
    }

    pub fn at(mut self, url: &str) -> Self {
        self.url = url.to_owned();
        self
    }

    pub fn without(mut self, target: Target) -> Self {
        self.elements.remove(&target);
        self
    }

    pub fn style(&self, element: ElementId, property: &str) -> Option<&StyleValue> {
        self.styles.get(&element).and_then(|map| map.get(property))
    }

    pub fn style_value(&self, element: ElementId, property: &str) -> Option<&str> {
        self.style(element, property).map(|value| value.value.as_str())
    }

    pub fn sent(&self) -> Vec<SetFullscreenRequest> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                HostCall::Notify(request) => Some(*request),
                _ => None,
            })
            .collect()
    }

    pub fn dom_mutations(&self) -> usize {
        self.calls.iter().filter(|call| call.mutates_dom()).count()
    }

    pub fn count(&self, wanted: &HostCall) -> usize {
        self.calls.iter().filter(|call| *call == wanted).count()
    }
}

impl PageHost for FakePage {
    type Element = ElementId;

    fn location(&self) -> String {
        self.url.clone()
    }

    fn find(&self, target: Target) -> Option<ElementId> {
        self.elements.get(&target).copied()
    }

    fn inline_style(&self, element: &ElementId, property: &str) -> Option<StyleValue> {
        self.style(*element, property).cloned()
    }

    fn set_inline_style(&mut self, element: &ElementId, property: &str, value: &StyleValue) {
        self.styles
            .entry(*element)
            .or_default()
            .insert(property.to_owned(), value.clone());
        self.calls
            .push(HostCall::SetStyle(*element, property.to_owned(), value.clone()));
    }

    fn remove_inline_style(&mut self, element: &ElementId, property: &str) {
        if let Some(map) = self.styles.get_mut(element) {
            map.remove(property);
            if map.is_empty() {
                self.styles.remove(element);
            }
        }
        self.calls
            .push(HostCall::RemoveStyle(*element, property.to_owned()));
    }

    /// An explicit inline pixel width wins over the layout width, as in a
    /// real document.
    fn width(&self, element: &ElementId) -> f64 {
        self.style_value(*element, "width")
            .and_then(|value| value.strip_suffix("px"))
            .and_then(|value| value.parse().ok())
            .or_else(|| self.widths.get(element).copied())
            .unwrap_or(0.0)
    }

    fn viewport_width(&self) -> f64 {
        self.viewport
    }

    fn install_stylesheet(&mut self, _id: &str, css: &str) {
        if !self
            .calls
            .iter()
            .any(|call| matches!(call, HostCall::InstallStylesheet(_)))
        {
            self.calls.push(HostCall::InstallStylesheet(css.to_owned()));
        }
    }

    fn set_marker_class(&mut self, _class: &str, active: bool) {
        self.marker = active;
        self.calls.push(HostCall::Marker(active));
    }

    fn set_resize_listener(&mut self, enabled: bool) {
        self.resize_listener = enabled;
        self.calls.push(HostCall::ResizeListener(enabled));
    }

    fn dispatch_synthetic_resize(&mut self) {
        self.calls.push(HostCall::SyntheticResize);
    }

    fn schedule(&mut self, timer: Timer, when: Schedule) {
        self.timers.insert(timer, when);
        self.calls.push(HostCall::Schedule(timer, when));
    }

    fn cancel(&mut self, timer: Timer) {
        self.timers.remove(&timer);
        self.calls.push(HostCall::Cancel(timer));
    }

    fn await_element(&mut self, target: Target, timeout: Duration) {
        self.waits.push(target);
        self.calls.push(HostCall::AwaitElement(target, timeout));
    }

    fn cancel_element_waits(&mut self) {
        self.waits.clear();
        self.calls.push(HostCall::CancelWaits);
    }

    fn arm_fullscreen_button_watch(&mut self) {
        self.calls.push(HostCall::ArmButtonWatch);
    }

    fn exit_native_fullscreen(&mut self) {
        self.calls.push(HostCall::ExitNativeFullscreen);
    }

    fn notify_relay(&mut self, request: SetFullscreenRequest) {
        self.calls.push(HostCall::Notify(request));
    }
}

pub fn controller(page: FakePage) -> Controller<FakePage> {
    let mut controller =
        Controller::new(page, ControllerConfig::default()).expect("default config is valid");
    controller.start();
    controller
}

/// Answer the oldest outstanding relay request as the relay would.
pub fn settle(controller: &mut Controller<FakePage>) {
    let activate = controller
        .host()
        .sent()
        .last()
        .is_some_and(|request| request.activate);
    let state = if activate {
        WindowState::Fullscreen
    } else {
        WindowState::Normal
    };
    controller.on_relay_settled(Ok(FullscreenResponse::applied(state)));
}

/// Deliver the synthetic resize the controller dispatched, as the browser would.
pub fn deliver_synthetic_resize(controller: &mut Controller<FakePage>) {
    if controller.host().resize_listener {
        controller.on_resize();
    }
}

/// Fire `timer` if it is armed. Returns whether it was.
pub fn fire(controller: &mut Controller<FakePage>, timer: Timer) -> bool {
    if controller.host_mut().timers.remove(&timer).is_some() {
        controller.on_timer(timer);
        true
    } else {
        false
    }
}
