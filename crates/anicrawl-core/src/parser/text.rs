//! Text helpers shared by the listing and detail parsers

use std::sync::LazyLock;

use regex_lite::Regex;
use scraper::{ElementRef, Node, Selector};

/// Elements that start a new line in [`block_text`]
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "h1", "h2", "h3",
    "h4", "h5", "h6", "header", "footer", "hr", "li", "ol", "p", "section", "table", "td", "th",
    "tr", "ul",
];

static COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d \u{a0}\u{202f}]*").unwrap());

/// Image attributes checked for a picture URL, lazy-loading ones last
pub const IMAGE_ATTRS: &[&str] = &["src", "data-src", "data-original"];

/// Whether an element of this name starts a new line of text
pub fn is_block_tag(name: &str) -> bool {
    BLOCK_TAGS.contains(&name)
}

/// Visible text of an element with whitespace collapsed to single spaces.
pub fn element_text(element: &ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Collapse runs of whitespace (including non-breaking spaces) to one space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Visible text of an element, one line per block-level element.
///
/// Line breaks inside text nodes are treated as spaces, so a label and its
/// value stay on one line as long as they share a block. Script and style
/// contents are skipped.
pub fn block_text(element: &ElementRef) -> String {
    let mut out = String::new();

    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => {
                let hidden = node
                    .parent()
                    .and_then(|p| p.value().as_element().map(|e| e.name()))
                    .is_some_and(|name| name == "script" || name == "style");
                if !hidden {
                    out.push_str(&text.replace(|c: char| c == '\n' || c == '\r', " "));
                }
            }
            Node::Element(el) if is_block_tag(el.name()) => out.push('\n'),
            _ => {}
        }
    }

    out.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text of the first element matching any selector, in selector order.
///
/// Elements whose text is blank are skipped.
pub fn first_text(scope: &ElementRef, selectors: &[String]) -> Option<String> {
    for selector_str in selectors {
        if let Ok(selector) = Selector::parse(selector_str) {
            for el in scope.select(&selector) {
                let text = element_text(&el);
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
    }

    None
}

/// Texts of every element matched by the first selector that matches anything.
pub fn all_texts(scope: &ElementRef, selectors: &[String]) -> Vec<String> {
    let mut texts = Vec::new();

    for selector_str in selectors {
        if let Ok(selector) = Selector::parse(selector_str) {
            for el in scope.select(&selector) {
                let text = element_text(&el);
                if !text.is_empty() && !texts.contains(&text) {
                    texts.push(text);
                }
            }
            if !texts.is_empty() {
                break;
            }
        }
    }

    texts
}

/// First non-blank value among `attrs` on an element.
///
/// Inline `data:` placeholders used by lazy-loading scripts are ignored.
pub fn first_attr<'a>(element: &ElementRef<'a>, attrs: &[&str]) -> Option<&'a str> {
    attrs
        .iter()
        .filter_map(|name| element.value().attr(name))
        .map(str::trim)
        .find(|value| !value.is_empty() && !value.starts_with("data:"))
}

/// Value following a label such as "Год выхода:" on the same line.
///
/// Labels are tried in order; the first one with a non-empty value wins.
///
/// # Examples
/// ```
/// use anicrawl_core::parser::label_value;
///
/// let text = "Год выхода: 2019\nЖанр: комедия, драма";
/// assert_eq!(label_value(text, &["Жанр:"]), Some("комедия, драма".to_string()));
/// assert_eq!(label_value(text, &["Тип:"]), None);
/// ```
pub fn label_value<S: AsRef<str>>(text: &str, labels: &[S]) -> Option<String> {
    labels.iter().find_map(|label| {
        let label = label.as_ref();
        text.lines()
            .filter_map(|line| line.find(label).map(|idx| line[idx + label.len()..].trim()))
            .find(|value| !value.is_empty())
            .map(str::to_string)
    })
}

/// Remove a leading label (e.g. "Описание:") from a text.
pub fn strip_label<S: AsRef<str>>(text: &str, labels: &[S]) -> String {
    let trimmed = text.trim();
    for label in labels {
        if let Some(rest) = trimmed.strip_prefix(label.as_ref()) {
            return rest.trim().to_string();
        }
    }
    trimmed.to_string()
}

/// Split a comma-separated value into trimmed, de-duplicated items.
pub fn split_list(value: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();

    for part in value.split([',', ';']) {
        let item = part.trim().trim_end_matches('.').trim();
        if !item.is_empty() && !items.iter().any(|i| i == item) {
            items.push(item.to_string());
        }
    }

    items
}

/// First run of ASCII digits in a text.
pub fn first_number(text: &str) -> Option<u64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Parse a counter like "12 345" or "1\u{a0}024" into a number.
pub fn parse_count(text: &str) -> Option<u64> {
    let found = COUNT_RE.find(text)?;
    let digits: String = found.as_str().chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
