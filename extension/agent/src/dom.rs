//! Overlay, tooltip, stylesheet, and mode-indicator DOM management.

use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use web_sys::{console, Document, Element, HtmlElement, MouseEvent};

use hilite_protocol::{
    HighlighterMode, DETAIL_CURSOR_CLASS, ELEMENT_CURSOR_CLASS, HIGHLIGHT_CLASS, INDICATOR_HIDE_MS,
    INDICATOR_ID, MARK_CLASS, OVERLAY_ID, STYLE_ID, TOOLTIP_ID,
};

use crate::describe;
use crate::{schedule, Agent};

const TOOLTIP_OFFSET_PX: f64 = 15.0;

/// Creates the hover overlay rectangle, replacing any stale one left over
/// from a previous agent instance.
pub(crate) fn create_overlay(document: &Document) -> Result<HtmlElement, JsValue> {
    if let Some(existing) = document.get_element_by_id(OVERLAY_ID) {
        existing.remove();
    }
    let overlay: HtmlElement = document.create_element("div")?.dyn_into()?;
    overlay.set_id(OVERLAY_ID);
    overlay.style().set_css_text(
        "position: fixed; \
         pointer-events: none; \
         z-index: 2147483647; \
         display: none; \
         box-shadow: 0 0 0 1px rgba(66, 133, 244, 0.8) inset, \
                     0 0 0 9999px rgba(66, 133, 244, 0.15); \
         outline: 1px solid rgba(66, 133, 244, 0.8);",
    );
    body_of(document)?.append_child(&overlay)?;
    Ok(overlay)
}

/// Creates the hover tooltip, replacing any stale one.
pub(crate) fn create_tooltip(document: &Document) -> Result<HtmlElement, JsValue> {
    if let Some(existing) = document.get_element_by_id(TOOLTIP_ID) {
        existing.remove();
    }
    let tooltip: HtmlElement = document.create_element("div")?.dyn_into()?;
    tooltip.set_id(TOOLTIP_ID);
    tooltip.style().set_css_text(
        "position: fixed; \
         background: rgba(0, 0, 0, 0.9); \
         color: white; \
         padding: 6px 10px; \
         border-radius: 4px; \
         font-size: 11px; \
         font-family: system-ui, sans-serif; \
         pointer-events: none; \
         z-index: 2147483647; \
         display: none; \
         white-space: nowrap; \
         box-shadow: 0 2px 8px rgba(0, 0, 0, 0.3);",
    );
    body_of(document)?.append_child(&tooltip)?;
    Ok(tooltip)
}

/// Injects the highlight/cursor stylesheet once per page.
pub(crate) fn inject_styles(document: &Document) -> Result<(), JsValue> {
    if document.get_element_by_id(STYLE_ID).is_some() {
        return Ok(());
    }
    let style = document.create_element("style")?;
    style.set_id(STYLE_ID);
    style.set_text_content(Some(&format!(
        r#"
.{HIGHLIGHT_CLASS} {{
    background-color: rgba(255, 235, 59, 0.35) !important;
    outline: 2px solid rgba(255, 193, 7, 0.9) !important;
    outline-offset: 1px !important;
}}

mark.{MARK_CLASS} {{
    background-color: rgba(255, 235, 59, 0.5) !important;
    color: inherit !important;
    padding: 2px 0 !important;
    border-radius: 2px !important;
}}

.{ELEMENT_CURSOR_CLASS} * {{
    cursor: crosshair !important;
}}

.{DETAIL_CURSOR_CLASS} * {{
    cursor: text !important;
}}

#{INDICATOR_ID} {{
    position: fixed;
    bottom: 20px;
    right: 20px;
    background: rgba(0, 0, 0, 0.85);
    color: white;
    padding: 10px 16px;
    border-radius: 6px;
    font-family: system-ui, sans-serif;
    font-size: 13px;
    font-weight: 500;
    z-index: 2147483647;
    pointer-events: none;
    box-shadow: 0 4px 12px rgba(0, 0, 0, 0.4);
    display: none;
}}
"#
    )));
    match document.head() {
        Some(head) => head.append_child(&style)?,
        None => body_of(document)?.append_child(&style)?,
    };
    Ok(())
}

/// Shows the transient mode indicator. Persists while a mode is active;
/// auto-hides only when the new mode is off.
pub(crate) fn show_mode_indicator(document: &Document, mode: HighlighterMode) {
    let indicator = match document.get_element_by_id(INDICATOR_ID) {
        Some(el) => el,
        None => {
            let Ok(el) = document.create_element("div") else {
                return;
            };
            el.set_id(INDICATOR_ID);
            let appended = document
                .body()
                .map(|body| body.append_child(&el).is_ok())
                .unwrap_or(false);
            if !appended {
                return;
            }
            el
        }
    };

    indicator.set_text_content(Some(describe::mode_label(mode)));
    if let Some(html) = indicator.dyn_ref::<HtmlElement>() {
        let _ = html.style().set_property("display", "block");
    }

    if mode == HighlighterMode::Off {
        schedule(
            || {
                let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                    return;
                };
                if let Some(el) = document.get_element_by_id(INDICATOR_ID) {
                    if let Some(html) = el.dyn_ref::<HtmlElement>() {
                        let _ = html.style().set_property("display", "none");
                    }
                }
            },
            INDICATOR_HIDE_MS,
        );
    }
}

/// Briefly outlines a clicked element, then restores its original styles.
pub(crate) fn flash_outline(element: &Element, duration_ms: i32) {
    let Some(html) = element.dyn_ref::<HtmlElement>() else {
        return;
    };
    let style = html.style();
    let original_outline = style.get_property_value("outline").unwrap_or_default();
    let original_offset = style
        .get_property_value("outline-offset")
        .unwrap_or_default();
    let _ = style.set_property("outline", "3px solid #4caf50");
    let _ = style.set_property("outline-offset", "2px");

    let element = element.clone();
    schedule(
        move || {
            if let Some(html) = element.dyn_ref::<HtmlElement>() {
                let style = html.style();
                let _ = style.set_property("outline", &original_outline);
                let _ = style.set_property("outline-offset", &original_offset);
            }
        },
        duration_ms,
    );
}

fn body_of(document: &Document) -> Result<HtmlElement, JsValue> {
    document
        .body()
        .ok_or_else(|| JsValue::from_str("hilite: document.body missing"))
}

impl Agent {
    /// Repositions the overlay and tooltip to follow `target`. Skips the
    /// agent's own nodes so the overlay never highlights itself.
    pub(crate) fn highlight_element(&mut self, target: Element, event: &MouseEvent) {
        if target.id() == OVERLAY_ID || target.id() == TOOLTIP_ID || target.id() == INDICATOR_ID {
            return;
        }

        // The page may have torn our nodes out; re-append rather than fail.
        if self.overlay.parent_node().is_none() {
            if let Some(body) = web_sys::window()
                .and_then(|w| w.document())
                .and_then(|d| d.body())
            {
                let _ = body.append_child(&self.overlay);
                console::warn_1(&"hilite: overlay was detached, re-appending".into());
            }
        }

        self.update_overlay_position(&target);
        self.update_tooltip(&target, event);
        self.current_element = Some(target);
    }

    /// Re-anchors the overlay to the current element (scroll/resize).
    pub(crate) fn refresh_overlay(&self) {
        if let Some(element) = &self.current_element {
            self.update_overlay_position(element);
        }
    }

    fn update_overlay_position(&self, element: &Element) {
        let rect = element.get_bounding_client_rect();
        let style = self.overlay.style();
        let _ = style.set_property("display", "block");
        // Fixed positioning uses viewport coordinates; no scroll offset.
        let _ = style.set_property("left", &format!("{}px", rect.left()));
        let _ = style.set_property("top", &format!("{}px", rect.top()));
        let _ = style.set_property("width", &format!("{}px", rect.width()));
        let _ = style.set_property("height", &format!("{}px", rect.height()));
    }

    fn update_tooltip(&self, element: &Element, event: &MouseEvent) {
        let rect = element.get_bounding_client_rect();
        let label = describe::tooltip_label(
            &element.tag_name(),
            &element.id(),
            &describe::filtered_classes(&element.class_name()),
            rect.width(),
            rect.height(),
        );
        self.tooltip.set_text_content(Some(&label));
        let style = self.tooltip.style();
        let _ = style.set_property("display", "block");

        // Keep the tooltip inside the viewport, flipping to the other side
        // of the pointer when it would overflow.
        let tooltip_rect = self.tooltip.get_bounding_client_rect();
        let viewport_width = viewport_dimension(web_sys::Window::inner_width);
        let viewport_height = viewport_dimension(web_sys::Window::inner_height);
        let mut left = event.client_x() as f64 + TOOLTIP_OFFSET_PX;
        let mut top = event.client_y() as f64 + TOOLTIP_OFFSET_PX;
        if left + tooltip_rect.width() > viewport_width {
            left = event.client_x() as f64 - tooltip_rect.width() - TOOLTIP_OFFSET_PX;
        }
        if top + tooltip_rect.height() > viewport_height {
            top = event.client_y() as f64 - tooltip_rect.height() - TOOLTIP_OFFSET_PX;
        }
        let _ = style.set_property("left", &format!("{left}px"));
        let _ = style.set_property("top", &format!("{top}px"));
    }

    pub(crate) fn hide_hover_ui(&self) {
        let _ = self.overlay.style().set_property("display", "none");
        let _ = self.tooltip.style().set_property("display", "none");
    }
}

fn viewport_dimension(get: fn(&web_sys::Window) -> Result<JsValue, JsValue>) -> f64 {
    web_sys::window()
        .and_then(|w| get(&w).ok())
        .and_then(|v| v.as_f64())
        .unwrap_or(f64::MAX)
}
