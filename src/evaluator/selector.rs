//! Selector resolution
//!
//! Selectors are matched against the descendants of the element in scope,
//! or against the whole document when nothing is in scope.

use scraper::{ElementRef, Html, Selector};

use crate::config::ScrapeConfig;
use crate::error::ScrapeError;

pub(crate) const MISSING_SELECTOR: &str =
    "An object was specified without an `_elem`, which is required.";

/// Element currently in scope during evaluation
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scope<'a> {
    pub element: Option<ElementRef<'a>>,
    /// Selector that produced `element`, named in diagnostics
    pub selector: Option<&'a str>,
}

impl<'a> Scope<'a> {
    pub fn document() -> Self {
        Scope {
            element: None,
            selector: None,
        }
    }

    pub fn narrowed(element: ElementRef<'a>, selector: Option<&'a str>) -> Self {
        Scope {
            element: Some(element),
            selector,
        }
    }
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(selector).map_err(|e| ScrapeError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Resolve `selector` in `scope`.
///
/// No selector means the element in scope itself. An empty match is a
/// recoverable miss, reported through the config's diagnostics.
pub(crate) fn select_all<'a>(
    document: &'a Html,
    selector: Option<&str>,
    scope: Scope<'a>,
    config: &ScrapeConfig,
) -> Result<Vec<ElementRef<'a>>, ScrapeError> {
    let Some(selector) = selector else {
        return match scope.element {
            Some(element) => Ok(vec![element]),
            None => Err(ScrapeError::config(MISSING_SELECTOR)),
        };
    };

    let parsed = parse_selector(selector)?;
    let matches: Vec<ElementRef<'a>> = match scope.element {
        Some(element) => element.select(&parsed).collect(),
        None => document.select(&parsed).collect(),
    };

    if matches.is_empty() {
        let message = match scope.selector {
            Some(context) => format!("Couldn't find '{}' in '{}'", selector, context),
            None => format!("Couldn't find '{}'", selector),
        };
        config.log(&message);
        return Err(ScrapeError::SelectorNotFound {
            selector: selector.to_string(),
            context: scope.selector.map(String::from),
        });
    }

    tracing::trace!(selector, count = matches.len(), "selector matched");
    Ok(matches)
}

/// Resolve `selector` to a single element, the first match
pub(crate) fn select_first<'a>(
    document: &'a Html,
    selector: Option<&str>,
    scope: Scope<'a>,
    config: &ScrapeConfig,
) -> Result<ElementRef<'a>, ScrapeError> {
    let Some(selector) = selector else {
        return scope.element.ok_or_else(|| ScrapeError::config(MISSING_SELECTOR));
    };
    let parsed = parse_selector(selector)?;
    let first = match scope.element {
        Some(element) => element.select(&parsed).next(),
        None => document.select(&parsed).next(),
    };
    match first {
        Some(element) => Ok(element),
        // Report the miss the same way as a multi-element lookup
        None => select_all(document, Some(selector), scope, config).map(|mut all| all.remove(0)),
    }
}
