//! Capture-phase event wiring.
//!
//! All document listeners attach in the capture phase so the agent sees
//! events before page handlers can swallow them; pages are third-party and
//! frequently stop propagation themselves. Listener closures are leaked
//! (`forget`) on purpose: they live as long as the page context itself.

use wasm_bindgen::prelude::Closure;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use web_sys::{console, Document, Element, Event, KeyboardEvent, MouseEvent, Window};

use hilite_protocol::{HighlighterMode, CLICK_FLASH_MS, SELECTION_COMMIT_MS};

use crate::{describe, dom, schedule, with_agent, Agent};

pub(crate) fn attach_listeners(window: &Window, document: &Document) -> Result<(), JsValue> {
    // Pointer tracking for element mode; mouseover doubles as insurance on
    // pages that throttle mousemove.
    for event_name in ["mousemove", "mouseover"] {
        let on_move = Closure::<dyn FnMut(MouseEvent)>::new(|event: MouseEvent| {
            with_agent(|agent| {
                if agent.mode() == HighlighterMode::Element {
                    if let Some(target) = target_element(event.as_ref()) {
                        agent.highlight_element(target, &event);
                    }
                }
            });
        });
        document.add_event_listener_with_callback_and_bool(
            event_name,
            on_move.as_ref().unchecked_ref(),
            true,
        )?;
        on_move.forget();
    }

    // Clicks are fully suppressed in active modes; element mode replaces
    // them with a selection report.
    let on_click = Closure::<dyn FnMut(MouseEvent)>::new(|event: MouseEvent| {
        with_agent(|agent| {
            if agent.mode() == HighlighterMode::Off {
                return;
            }
            suppress(event.as_ref());
            if agent.mode() == HighlighterMode::Element {
                if let Some(target) = target_element(event.as_ref()) {
                    select_element(&target);
                }
            }
        });
    });
    document.add_event_listener_with_callback_and_bool(
        "click",
        on_click.as_ref().unchecked_ref(),
        true,
    )?;
    on_click.forget();

    // Keep the user inside the selection workflow: links and buttons must
    // not navigate while a mode is active.
    let on_mousedown = Closure::<dyn FnMut(MouseEvent)>::new(|event: MouseEvent| {
        with_agent(|agent| {
            if agent.mode() == HighlighterMode::Off {
                return;
            }
            if let Some(target) = target_element(event.as_ref()) {
                if target.closest("a, button").ok().flatten().is_some() {
                    suppress(event.as_ref());
                }
            }
            if agent.mode() == HighlighterMode::Detail {
                // Highlights persist across re-selections; nothing cleared.
                agent.begin_selection();
            }
        });
    });
    document.add_event_listener_with_callback_and_bool(
        "mousedown",
        on_mousedown.as_ref().unchecked_ref(),
        true,
    )?;
    on_mousedown.forget();

    let on_mouseup = Closure::<dyn FnMut(MouseEvent)>::new(|_event: MouseEvent| {
        with_agent(|agent| {
            if agent.mode() == HighlighterMode::Detail && agent.end_selection() {
                // Let the browser finish updating the selection first.
                schedule(
                    || with_agent(|agent| agent.commit_selection()),
                    SELECTION_COMMIT_MS,
                );
            }
        });
    });
    document.add_event_listener_with_callback_and_bool(
        "mouseup",
        on_mouseup.as_ref().unchecked_ref(),
        true,
    )?;
    on_mouseup.forget();

    let on_keydown = Closure::<dyn FnMut(KeyboardEvent)>::new(|event: KeyboardEvent| {
        with_agent(|agent| match event.key().as_str() {
            "Escape" if agent.mode() != HighlighterMode::Off => {
                event.prevent_default();
                agent.clear_highlights();
                agent.set_mode(HighlighterMode::Off);
            }
            "Enter" if agent.mode() == HighlighterMode::Detail => {
                // Confirm: collapse the browser selection, keep the marks.
                event.prevent_default();
                if let Some(selection) =
                    web_sys::window().and_then(|w| w.get_selection().ok()).flatten()
                {
                    let _ = selection.remove_all_ranges();
                }
            }
            _ => {}
        });
    });
    document.add_event_listener_with_callback_and_bool(
        "keydown",
        on_keydown.as_ref().unchecked_ref(),
        true,
    )?;
    on_keydown.forget();

    let on_scroll = Closure::<dyn FnMut(Event)>::new(|_event: Event| {
        with_agent(|agent| {
            if agent.mode() == HighlighterMode::Element {
                agent.refresh_overlay();
            }
        });
    });
    document.add_event_listener_with_callback_and_bool(
        "scroll",
        on_scroll.as_ref().unchecked_ref(),
        true,
    )?;
    on_scroll.forget();

    let on_resize = Closure::<dyn FnMut(Event)>::new(|_event: Event| {
        with_agent(|agent| {
            if agent.mode() == HighlighterMode::Element {
                agent.refresh_overlay();
            }
        });
    });
    window.add_event_listener_with_callback("resize", on_resize.as_ref().unchecked_ref())?;
    on_resize.forget();

    // Form submits and auxiliary clicks would navigate away mid-selection.
    for event_name in ["submit", "dblclick", "auxclick"] {
        let on_other = Closure::<dyn FnMut(Event)>::new(|event: Event| {
            with_agent(|agent| {
                if agent.mode() != HighlighterMode::Off {
                    event.prevent_default();
                    event.stop_propagation();
                }
            });
        });
        document.add_event_listener_with_callback_and_bool(
            event_name,
            on_other.as_ref().unchecked_ref(),
            true,
        )?;
        on_other.forget();
    }

    Ok(())
}

fn target_element(event: &Event) -> Option<Element> {
    event.target()?.dyn_into::<Element>().ok()
}

fn suppress(event: &Event) {
    event.prevent_default();
    event.stop_propagation();
    event.stop_immediate_propagation();
}

/// Reports a clicked element through the page console (the only return
/// path available from this trust domain) and flashes it.
fn select_element(element: &Element) {
    let rect = element.get_bounding_client_rect();
    let description = describe::element_description(
        &element.tag_name(),
        &element.id(),
        &element.class_name(),
        rect.width(),
        rect.height(),
        &element.outer_html(),
    );
    console::log_1(&description.into());
    dom::flash_outline(element, CLICK_FLASH_MS);
}

impl Agent {
    pub(crate) fn begin_selection(&mut self) {
        self.is_selecting = true;
    }

    /// Ends a pointer selection; returns whether one was in progress.
    pub(crate) fn end_selection(&mut self) -> bool {
        std::mem::take(&mut self.is_selecting)
    }
}
