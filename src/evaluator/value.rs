//! Value extraction from a resolved element
//!
//! Accessors:
//! - `text` - trimmed text content, whitespace runs collapsed
//! - `href` - link target made absolute against the page's origin
//! - `html` - inner markup
//! - `tag` - outer markup with the children emptied
//! - anything else - the raw attribute, `null` when absent

use scraper::ElementRef;
use serde_json::Value;
use url::Url;

use crate::error::ScrapeError;

/// Page a document was loaded from, used to absolutize links
#[derive(Debug, Clone)]
pub(crate) struct Page {
    pub url: Url,
    /// `host[:port]`, matched against raw hrefs
    host: String,
    /// `scheme://host[:port]/`
    origin: Url,
}

impl Page {
    pub fn new(url: &str) -> Result<Self, ScrapeError> {
        let parsed = Url::parse(url)
            .map_err(|e| ScrapeError::config(format!("Invalid url '{}': {}", url, e)))?;

        let host = match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        };
        let origin = Url::parse(&parsed.origin().ascii_serialization()).unwrap_or_else(|_| parsed.clone());

        Ok(Page {
            url: parsed,
            host,
            origin,
        })
    }

    /// Absolute form of `href`.
    ///
    /// Hrefs that already name this page's host are kept as they are; the
    /// rest are resolved against the origin, not the page path.
    pub fn resolve_href(&self, href: &str) -> String {
        let href = href.trim();
        if !self.host.is_empty() && href.contains(&self.host) {
            return href.to_string();
        }
        match self.origin.join(href) {
            Ok(absolute) => absolute.to_string(),
            Err(_) => href.to_string(),
        }
    }
}

/// Value of an element when no accessor is named
pub(crate) fn default_value(element: ElementRef<'_>, page: &Page) -> Value {
    match element.value().name() {
        "a" | "link" => attribute_value(element, "href", page),
        "img" => raw_attribute(element, "src"),
        _ => attribute_value(element, "text", page),
    }
}

pub(crate) fn attribute_value(element: ElementRef<'_>, accessor: &str, page: &Page) -> Value {
    match accessor {
        "text" => Value::String(element_text(element)),
        "href" => match element.value().attr("href") {
            Some(href) => Value::String(page.resolve_href(href)),
            None => Value::Null,
        },
        "html" => Value::String(element.inner_html()),
        "tag" => Value::String(empty_tag(element)),
        attr => raw_attribute(element, attr),
    }
}

/// Absolute link target of an element, if it carries one
pub(crate) fn link_target(element: ElementRef<'_>, page: &Page) -> Option<String> {
    element
        .value()
        .attr("href")
        .filter(|href| !href.trim().is_empty())
        .map(|href| page.resolve_href(href))
}

fn raw_attribute(element: ElementRef<'_>, name: &str) -> Value {
    element
        .value()
        .attr(name)
        .map(|v| Value::String(v.to_string()))
        .unwrap_or(Value::Null)
}

fn element_text(element: ElementRef<'_>) -> String {
    // `split_whitespace` also covers non-breaking spaces
    let text = element.text().collect::<String>();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

fn empty_tag(element: ElementRef<'_>) -> String {
    let el = element.value();
    let mut tag = format!("<{}", el.name());
    for (name, value) in el.attrs() {
        tag.push_str(&format!(" {}=\"{}\"", name, escape_attr(value)));
    }
    tag.push('>');
    if !VOID_ELEMENTS.contains(&el.name()) {
        tag.push_str(&format!("</{}>", el.name()));
    }
    tag
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
