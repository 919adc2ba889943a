//! Pure string helpers for tooltips, selection reports, and the mode
//! indicator. Kept free of DOM types so they are testable on any target.

use hilite_protocol::{HighlighterMode, DETAIL_CURSOR_CLASS, ELEMENT_CURSOR_CLASS};

/// Longest outer-HTML excerpt included in a selection report.
const OUTER_HTML_EXCERPT: usize = 200;

/// Splits a raw `class` attribute and drops the agent's own vocabulary:
/// anything containing "highlight" or "cursor" would be self-referential
/// noise in a tooltip.
pub(crate) fn filtered_classes(raw: &str) -> Vec<String> {
    raw.split_whitespace()
        .filter(|class| !class.contains("highlight") && !class.contains("cursor"))
        .map(str::to_string)
        .collect()
}

/// Builds the hover tooltip text: `tag#id.class1.class2 WxH`.
pub(crate) fn tooltip_label(
    tag: &str,
    id: &str,
    classes: &[String],
    width: f64,
    height: f64,
) -> String {
    let mut label = tag.to_lowercase();
    if !id.is_empty() {
        label.push('#');
        label.push_str(id);
    }
    for class in classes {
        label.push('.');
        label.push_str(class);
    }
    label.push_str(&format!(
        " {}\u{d7}{}",
        width.round() as i64,
        height.round() as i64
    ));
    label
}

/// Builds the console report for a clicked element in element mode.
pub(crate) fn element_description(
    tag: &str,
    id: &str,
    classes: &str,
    width: f64,
    height: f64,
    outer_html: &str,
) -> String {
    format!(
        "hilite: selected element\n  tag: {}\n  id: {}\n  classes: {}\n  size: {}\u{d7}{}\n  html: {}",
        tag.to_lowercase(),
        if id.is_empty() { "none" } else { id },
        if classes.is_empty() { "none" } else { classes },
        width.round() as i64,
        height.round() as i64,
        truncate_excerpt(outer_html, OUTER_HTML_EXCERPT),
    )
}

/// Truncates at a char boundary and appends an ellipsis when shortened.
pub(crate) fn truncate_excerpt(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// Body cursor class for `mode`; [`None`] restores the default cursor.
pub(crate) fn cursor_class(mode: HighlighterMode) -> Option<&'static str> {
    match mode {
        HighlighterMode::Element => Some(ELEMENT_CURSOR_CLASS),
        HighlighterMode::Detail => Some(DETAIL_CURSOR_CLASS),
        HighlighterMode::Off => None,
    }
}

/// Mode indicator text.
pub(crate) fn mode_label(mode: HighlighterMode) -> &'static str {
    match mode {
        HighlighterMode::Element => "element select (clicks disabled)",
        HighlighterMode::Detail => "detail select (enter confirms, esc clears)",
        HighlighterMode::Off => "highlighter off",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tooltip_label_matches_expected_shape() {
        let label = tooltip_label("DIV", "x", &["card".to_string()], 100.0, 50.0);
        assert_eq!(label, "div#x.card 100\u{d7}50");
    }

    #[test]
    fn tooltip_label_without_id_or_classes() {
        assert_eq!(tooltip_label("SPAN", "", &[], 12.4, 7.6), "span 12\u{d7}8");
    }

    #[test]
    fn filtered_classes_drop_agent_vocabulary() {
        let classes = filtered_classes("card hilite-detail-highlight element-mode-cursor promo");
        assert_eq!(classes, vec!["card".to_string(), "promo".to_string()]);
    }

    #[test]
    fn cursor_classes_are_mutually_exclusive() {
        let element = cursor_class(HighlighterMode::Element).unwrap();
        let detail = cursor_class(HighlighterMode::Detail).unwrap();
        assert_ne!(element, detail);
        assert_eq!(cursor_class(HighlighterMode::Off), None);
    }

    #[test]
    fn excerpt_truncates_on_char_boundaries() {
        assert_eq!(truncate_excerpt("short", 10), "short");
        assert_eq!(truncate_excerpt("abcdef", 3), "abc...");
        // 2-byte char straddling the limit moves the cut back.
        let s = "aé";
        assert_eq!(truncate_excerpt(s, 2), "a...");
    }

    #[test]
    fn element_description_includes_all_fields() {
        let description =
            element_description("A", "", "nav-link", 80.0, 20.0, "<a href=\"/\">home</a>");
        assert!(description.contains("tag: a"));
        assert!(description.contains("id: none"));
        assert!(description.contains("classes: nav-link"));
        assert!(description.contains("size: 80\u{d7}20"));
        assert!(description.contains("<a href=\"/\">home</a>"));
    }

    #[test]
    fn mode_labels_are_distinct() {
        let labels = [
            mode_label(HighlighterMode::Off),
            mode_label(HighlighterMode::Element),
            mode_label(HighlighterMode::Detail),
        ];
        assert_ne!(labels[0], labels[1]);
        assert_ne!(labels[1], labels[2]);
    }
}
