//! In-page element-highlighting agent.
//!
//! Runs inside an untrusted page's script context. Owns the overlay,
//! tooltip, and highlight DOM nodes; tracks hover and text selection; and
//! exposes exactly one command surface (`dispatch`) plus the read-only
//! state the host probes (`initialized`, `mode`, `highlightCount`) on the
//! page-global object.
//!
//! Installation is idempotent: a page-global flag marks "install in
//! progress" and the global's `initialized` property marks "fully
//! installed"; running the bundle again while either is set is a no-op.
//! When `document.body` is not available yet, initialization defers to
//! `DOMContentLoaded` or a bounded retry loop instead of failing.

use std::cell::RefCell;

use js_sys::Reflect;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{console, Document, Element, HtmlElement, Window};

use hilite_protocol::{
    AgentCommand, HighlighterMode, AGENT_GLOBAL, DETAIL_CURSOR_CLASS, ELEMENT_CURSOR_CLASS,
    INIT_RETRY_DELAY_MS, INIT_RETRY_LIMIT, INSTALLING_FLAG,
};

mod describe;
mod dom;
mod events;
mod selection;

thread_local! {
    static AGENT: RefCell<Option<Agent>> = RefCell::new(None);
}

/// A node currently marked by the agent, tracked so it can be reversed.
pub(crate) enum Highlight {
    /// Mark element wrapping a text-only selection; unwrapping restores the
    /// original text nodes.
    Wrapped(Element),
    /// Element carrying the highlight class; reversal removes the class.
    Classed(Element),
}

/// Page-local agent state. At most one per page context.
pub(crate) struct Agent {
    mode: HighlighterMode,
    overlay: HtmlElement,
    tooltip: HtmlElement,
    current_element: Option<Element>,
    highlights: Vec<Highlight>,
    is_selecting: bool,
}

#[wasm_bindgen(start)]
pub fn start() {
    install();
}

/// Installs the agent into this page context. Idempotent.
#[wasm_bindgen]
pub fn install() {
    console_error_panic_hook::set_once();
    let Some(window) = web_sys::window() else {
        return;
    };
    if agent_initialized(&window) {
        console::log_1(&"hilite: agent already installed, skipping".into());
        return;
    }
    if installing(&window) {
        console::log_1(&"hilite: agent installation in progress, skipping".into());
        return;
    }
    set_installing(&window, true);
    init_with_retry(0);
}

fn init_with_retry(attempt: u32) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };

    if document.body().is_none() {
        if document.ready_state() == "loading" {
            let once = Closure::once_into_js(move || init_with_retry(attempt));
            let _ = document
                .add_event_listener_with_callback("DOMContentLoaded", once.unchecked_ref());
        } else if attempt < INIT_RETRY_LIMIT {
            // readyState is interactive/complete but body is still missing;
            // retry shortly.
            schedule(move || init_with_retry(attempt + 1), INIT_RETRY_DELAY_MS);
        } else {
            console::warn_1(&"hilite: document.body never appeared, giving up".into());
            set_installing(&window, false);
        }
        return;
    }

    if let Err(err) = finish_install(&window, &document) {
        console::error_1(&err);
        set_installing(&window, false);
    }
}

fn finish_install(window: &Window, document: &Document) -> Result<(), JsValue> {
    let overlay = dom::create_overlay(document)?;
    let tooltip = dom::create_tooltip(document)?;
    dom::inject_styles(document)?;

    AGENT.with(|cell| {
        *cell.borrow_mut() = Some(Agent {
            mode: HighlighterMode::Off,
            overlay,
            tooltip,
            current_element: None,
            highlights: Vec::new(),
            is_selecting: false,
        });
    });

    events::attach_listeners(window, document)?;
    register_global(window)?;
    set_installing(window, false);
    console::log_1(&"hilite: agent installed".into());
    Ok(())
}

/// Registers the page-global object carrying the probe-visible state and
/// the `dispatch` command entry point.
fn register_global(window: &Window) -> Result<(), JsValue> {
    let global = js_sys::Object::new();
    Reflect::set(&global, &"initialized".into(), &true.into())?;
    Reflect::set(&global, &"mode".into(), &HighlighterMode::Off.as_str().into())?;
    Reflect::set(&global, &"highlightCount".into(), &JsValue::from(0u32))?;

    let dispatch = Closure::<dyn FnMut(String)>::new(|payload: String| {
        dispatch_payload(&payload);
    });
    Reflect::set(&global, &"dispatch".into(), dispatch.as_ref())?;
    dispatch.forget();

    Reflect::set(window, &AGENT_GLOBAL.into(), &global)?;
    Ok(())
}

/// Deserializes one command payload and dispatches it. The single switch
/// over [`AgentCommand`] is the agent's entire command surface.
fn dispatch_payload(payload: &str) {
    match serde_json::from_str::<AgentCommand>(payload) {
        Ok(AgentCommand::SetMode { mode }) => with_agent(|agent| agent.set_mode(mode)),
        Ok(AgentCommand::ClearHighlights) => with_agent(|agent| agent.clear_highlights()),
        Err(err) => {
            console::warn_1(&format!("hilite: bad command payload: {err}").into());
        }
    }
}

/// Runs `f` against the installed agent, if any. Re-entrant calls (an
/// event firing while a previous handler still holds the borrow) are
/// dropped rather than panicking.
pub(crate) fn with_agent(f: impl FnOnce(&mut Agent)) {
    AGENT.with(|cell| {
        if let Ok(mut borrow) = cell.try_borrow_mut() {
            if let Some(agent) = borrow.as_mut() {
                f(agent);
            }
        }
    });
}

/// Mirrors `mode` and the highlight count onto the page-global object so
/// host probes see them without calling into wasm.
pub(crate) fn publish_state(mode: HighlighterMode, highlight_count: u32) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Ok(global) = Reflect::get(&window, &AGENT_GLOBAL.into()) else {
        return;
    };
    if global.is_undefined() || global.is_null() {
        return;
    }
    let _ = Reflect::set(&global, &"mode".into(), &mode.as_str().into());
    let _ = Reflect::set(&global, &"highlightCount".into(), &highlight_count.into());
}

/// Schedules `f` to run once after `delay_ms`.
pub(crate) fn schedule<F: FnOnce() + 'static>(f: F, delay_ms: i32) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let callback = Closure::once_into_js(f);
    if window
        .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), delay_ms)
        .is_err()
    {
        console::warn_1(&"hilite: failed to schedule timer".into());
    }
}

fn agent_initialized(window: &Window) -> bool {
    Reflect::get(window, &AGENT_GLOBAL.into())
        .ok()
        .filter(|global| !global.is_undefined() && !global.is_null())
        .and_then(|global| Reflect::get(&global, &"initialized".into()).ok())
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

fn installing(window: &Window) -> bool {
    Reflect::get(window, &INSTALLING_FLAG.into())
        .ok()
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

fn set_installing(window: &Window, value: bool) {
    let _ = Reflect::set(window, &INSTALLING_FLAG.into(), &value.into());
}

impl Agent {
    /// Transitions to `mode`. Mode uniquely determines overlay/tooltip
    /// visibility and the body cursor class; highlights are preserved
    /// across ordinary mode switches (only Escape clears them).
    pub(crate) fn set_mode(&mut self, mode: HighlighterMode) {
        let previous = self.mode;
        self.mode = mode;
        self.is_selecting = false;
        self.current_element = None;
        self.hide_hover_ui();

        if let Some(document) = web_sys::window().and_then(|w| w.document()) {
            if let Some(body) = document.body() {
                let classes = body.class_list();
                let _ = classes.remove_2(ELEMENT_CURSOR_CLASS, DETAIL_CURSOR_CLASS);
                if let Some(class) = describe::cursor_class(mode) {
                    let _ = classes.add_1(class);
                }
            }
            dom::show_mode_indicator(&document, mode);
        }

        publish_state(mode, self.highlights.len() as u32);
        if previous != mode {
            console::log_1(&format!("hilite: mode {previous} -> {mode}").into());
        }
    }

    pub(crate) fn mode(&self) -> HighlighterMode {
        self.mode
    }
}
