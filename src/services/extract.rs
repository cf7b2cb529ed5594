// src/services/extract.rs

//! HTML to normalized text.
//!
//! Both fetch strategies funnel their HTML through [`html_to_text`] so that the
//! digest only moves when the readable content does.

use scraper::{ElementRef, Html, Node};

/// Elements whose subtrees never count as page content.
pub const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "header", "footer", "aside",
];

/// Extract normalized text from an HTML document.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut buffer = String::new();
    collect_text(document.root_element(), &mut buffer);
    normalize_text(&buffer)
}

/// Trim every line and drop blank ones.
pub fn normalize_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(element: ElementRef<'_>, buffer: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                buffer.push_str(text);
                buffer.push('\n');
            }
            Node::Element(el) if is_skipped(el.name()) => {}
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, buffer);
                }
            }
            _ => {}
        }
    }
}

fn is_skipped(name: &str) -> bool {
    SKIPPED_ELEMENTS
        .iter()
        .any(|skipped| skipped.eq_ignore_ascii_case(name))
}
