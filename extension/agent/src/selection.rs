//! Selection commit and highlight reversal for detail mode.
//!
//! A committed selection takes one of two shapes:
//!
//! - **text-only** (the selection lives inside text, with no element nodes
//!   other than line breaks): the exact range is wrapped in a mark element.
//!   `surroundContents` throws when the range partially selects a
//!   non-text node, so a range spanning element boundaries falls back to
//!   extract-and-reinsert.
//! - **element selection**: every element node the range intersects gets
//!   the highlight class, found by a tree walk whose filter accepts only
//!   intersected nodes.
//!
//! Every produced node is tracked in the agent's highlight list so
//! reversal can restore the original DOM: marks are unwrapped back into
//! their parent (followed by a text-node normalize pass), classed elements
//! just lose the class.

use wasm_bindgen::prelude::Closure;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use web_sys::{console, Document, DocumentFragment, Element, Node, NodeFilter, Range};

use hilite_protocol::{HIGHLIGHT_CLASS, MARK_CLASS};

use crate::{publish_state, Agent, Highlight};

const TEXT_NODE: u16 = 3;
const ELEMENT_NODE: u16 = 1;

const SHOW_ELEMENT: u32 = 0x1;
const SHOW_ALL: u32 = 0xFFFF_FFFF;
const FILTER_ACCEPT: u32 = 1;
const FILTER_REJECT: u32 = 2;

impl Agent {
    /// Commits the current browser selection as highlights. Scheduled a
    /// short debounce after mouseup so the selection has settled.
    pub(crate) fn commit_selection(&mut self) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };
        let Some(selection) = window.get_selection().ok().flatten() else {
            return;
        };
        if selection.range_count() == 0 || selection.is_collapsed() {
            return;
        }
        let Ok(range) = selection.get_range_at(0) else {
            return;
        };
        let Ok(fragment) = range.clone_contents() else {
            return;
        };

        let text = fragment.text_content().unwrap_or_default();
        if is_text_only(&document, &range, &fragment) && !text.trim().is_empty() {
            match wrap_text_range(&document, &range) {
                Ok(mark) => {
                    self.highlights.push(Highlight::Wrapped(mark));
                    let _ = selection.remove_all_ranges();
                }
                Err(err) => {
                    console::warn_1(&err);
                }
            }
        } else {
            for element in intersected_elements(&document, &range) {
                if element.class_list().contains(HIGHLIGHT_CLASS) {
                    continue;
                }
                let _ = element.class_list().add_1(HIGHLIGHT_CLASS);
                self.highlights.push(Highlight::Classed(element));
            }
        }

        publish_state(self.mode, self.highlights.len() as u32);
    }

    /// Reverses every tracked highlight, restoring the original DOM.
    pub(crate) fn clear_highlights(&mut self) {
        for highlight in self.highlights.drain(..) {
            match highlight {
                Highlight::Wrapped(mark) => unwrap_mark(&mark),
                Highlight::Classed(element) => {
                    let _ = element.class_list().remove_1(HIGHLIGHT_CLASS);
                }
            }
        }
        publish_state(self.mode, 0);
    }
}

/// A selection is text-only when its common ancestor is a text node, or
/// its cloned fragment contains no element nodes besides line breaks.
fn is_text_only(document: &Document, range: &Range, fragment: &DocumentFragment) -> bool {
    if let Ok(container) = range.common_ancestor_container() {
        if container.node_type() == TEXT_NODE {
            return true;
        }
    }

    let Ok(walker) = document.create_tree_walker_with_what_to_show(fragment, SHOW_ALL) else {
        return false;
    };
    while let Ok(Some(node)) = walker.next_node() {
        if node.node_type() == ELEMENT_NODE && node.node_name() != "BR" {
            return false;
        }
    }
    true
}

/// Wraps the exact selected range in a mark element and returns it.
fn wrap_text_range(document: &Document, range: &Range) -> Result<Element, JsValue> {
    let mark = document.create_element("mark")?;
    mark.set_class_name(MARK_CLASS);

    if range.surround_contents(&mark).is_err() {
        // The range spans element boundaries; extract and reinsert.
        let fragment = range.extract_contents()?;
        mark.append_child(&fragment)?;
        range.insert_node(&mark)?;
    }
    Ok(mark)
}

/// Collects every element node the range intersects.
fn intersected_elements(document: &Document, range: &Range) -> Vec<Element> {
    let Ok(container) = range.common_ancestor_container() else {
        return Vec::new();
    };

    if container.node_type() == TEXT_NODE {
        return container.parent_element().into_iter().collect();
    }
    if container.node_type() != ELEMENT_NODE {
        return Vec::new();
    }

    let mut elements = Vec::new();
    {
        let range = range.clone();
        let accept = Closure::<dyn FnMut(Node) -> u32>::new(move |node: Node| {
            // intersectsNode can throw on foreign nodes; treat as reject.
            match range.intersects_node(&node) {
                Ok(true) => FILTER_ACCEPT,
                _ => FILTER_REJECT,
            }
        });
        let filter = NodeFilter::new();
        filter.set_accept_node(accept.as_ref().unchecked_ref());

        if let Ok(walker) = document.create_tree_walker_with_what_to_show_and_filter(
            &container,
            SHOW_ELEMENT,
            Some(&filter),
        ) {
            while let Ok(Some(node)) = walker.next_node() {
                if let Ok(element) = node.dyn_into::<Element>() {
                    elements.push(element);
                }
            }
        }
        // `accept` stays alive for the duration of the walk and is dropped
        // here with it.
    }

    if elements.is_empty() {
        if let Ok(element) = container.dyn_into::<Element>() {
            elements.push(element);
        }
    }
    elements
}

/// Unwraps a mark element back into its parent and normalizes the
/// surrounding text nodes, restoring the pre-highlight DOM exactly.
fn unwrap_mark(mark: &Element) {
    let Some(parent) = mark.parent_node() else {
        return;
    };
    while let Some(child) = mark.first_child() {
        if parent.insert_before(&child, Some(mark.as_ref())).is_err() {
            break;
        }
    }
    let _ = parent.remove_child(mark);
    parent.normalize();
}
