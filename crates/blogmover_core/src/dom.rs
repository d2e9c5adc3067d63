//! Selector helpers over `scraper` documents plus an edit-aware serializer.
//!
//! The parsed tree is never mutated. Cleanup steps (dropping caption lines,
//! retargeting image links, turning `<br>` into paragraph breaks) are recorded
//! in an [`Edits`] set and applied while the subtree is written back out as
//! HTML or text.

use std::collections::{HashMap, HashSet};

use ego_tree::{NodeId, NodeRef};
use scraper::node::Node;
use scraper::{ElementRef, Selector};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// All elements under `scope` matching `css`, in document order.
pub fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    selector(css)
        .map(|sel| scope.select(&sel).collect())
        .unwrap_or_default()
}

pub fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    selector(css).and_then(|sel| scope.select(&sel).next())
}

/// The n-th match; negative indices count from the end (`-1` is the last match).
pub fn nth<'a>(scope: ElementRef<'a>, css: &str, index: isize) -> Option<ElementRef<'a>> {
    let matches = select_all(scope, css);
    let index = if index < 0 {
        matches.len().checked_sub(index.unsigned_abs())?
    } else {
        index as usize
    };
    matches.get(index).copied()
}

/// Concatenated text of every match, the way a multi-element selection reads.
pub fn text_of(scope: ElementRef<'_>, css: &str) -> String {
    select_all(scope, css)
        .into_iter()
        .map(element_text)
        .collect()
}

/// Attribute of the first match, if both the element and the attribute exist.
pub fn attr_of(scope: ElementRef<'_>, css: &str, name: &str) -> Option<String> {
    select_first(scope, css)
        .and_then(|el| el.value().attr(name))
        .map(str::to_string)
}

pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

pub fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

pub fn parent_element(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.parent().and_then(ElementRef::wrap)
}

/// Whether an ancestor of `element` strictly below `scope` carries `class`.
pub fn has_ancestor_with_class(element: ElementRef<'_>, class: &str, scope: ElementRef<'_>) -> bool {
    for ancestor in element.ancestors() {
        if ancestor.id() == scope.id() {
            return false;
        }
        if let Some(ancestor) = ElementRef::wrap(ancestor) {
            if has_class(ancestor, class) {
                return true;
            }
        }
    }
    false
}

/// Pending modifications applied while serializing a subtree.
#[derive(Debug, Clone, Default)]
pub struct Edits {
    removed: HashSet<NodeId>,
    attrs: HashMap<NodeId, Vec<(String, String)>>,
    br_as_paragraph: bool,
}

impl Edits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the element (and everything under it) from the output.
    pub fn remove(&mut self, element: ElementRef<'_>) {
        self.removed.insert(element.id());
    }

    pub fn set_attr(&mut self, element: ElementRef<'_>, name: &str, value: &str) {
        let overrides = self.attrs.entry(element.id()).or_default();
        match overrides.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => overrides.push((name.to_string(), value.to_string())),
        }
    }

    /// Current value of an attribute, taking earlier overrides into account.
    pub fn attr(&self, element: ElementRef<'_>, name: &str) -> Option<String> {
        self.override_for(element.id(), name)
            .map(str::to_string)
            .or_else(|| element.value().attr(name).map(str::to_string))
    }

    /// Emit an empty paragraph in place of every `<br>`.
    pub fn replace_line_breaks(&mut self) {
        self.br_as_paragraph = true;
    }

    fn override_for(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs
            .get(&id)?
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// The element itself and its children, with `edits` applied.
pub fn outer_html(element: ElementRef<'_>, edits: &Edits) -> String {
    let mut out = String::new();
    write_node(*element, edits, &mut out);
    out
}

/// Only the children of the element, with `edits` applied.
pub fn inner_html(element: ElementRef<'_>, edits: &Edits) -> String {
    let mut out = String::new();
    for child in element.children() {
        write_node(child, edits, &mut out);
    }
    out
}

/// Text content of the element, skipping removed nodes.
pub fn text_with(element: ElementRef<'_>, edits: &Edits) -> String {
    let mut out = String::new();
    collect_text(*element, edits, &mut out);
    out
}

fn collect_text(node: NodeRef<'_, Node>, edits: &Edits, out: &mut String) {
    if edits.removed.contains(&node.id()) {
        return;
    }
    match node.value() {
        Node::Text(text) => out.push_str(text),
        _ => {
            for child in node.children() {
                collect_text(child, edits, out);
            }
        }
    }
}

fn write_node(node: NodeRef<'_, Node>, edits: &Edits, out: &mut String) {
    if edits.removed.contains(&node.id()) {
        return;
    }
    match node.value() {
        Node::Text(text) => escape_text(text, out),
        Node::Element(element) => {
            let name = element.name();
            if edits.br_as_paragraph && name.eq_ignore_ascii_case("br") {
                out.push_str("<p></p>");
                return;
            }
            out.push('<');
            out.push_str(name);
            for (key, value) in element.attrs() {
                let value = edits.override_for(node.id(), key).unwrap_or(value);
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                escape_attr(value, out);
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&name) {
                return;
            }
            for child in node.children() {
                write_node(child, edits, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        Node::Comment(_) | Node::Doctype(_) | Node::ProcessingInstruction(_) => {}
        _ => {
            for child in node.children() {
                write_node(child, edits, out);
            }
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}
