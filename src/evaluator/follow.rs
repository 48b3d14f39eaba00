//! `_follow` navigation
//!
//! Loads the page a link points to, evaluates the follow spec there and
//! folds the result into what was extracted so far.

use serde_json::Value;

use super::selector::{self, Scope, MISSING_SELECTOR};
use super::value::link_target;
use super::Evaluator;
use crate::error::ScrapeError;
use crate::fetch::PageRequest;
use crate::scrape::scrape_page;
use crate::spec::Follow;

/// Follow the link for `follow` and merge the linked page's result into `partial`.
///
/// The link is the follow's own `_elem` resolved in `scope`, or the element
/// in scope. Session cookies are not carried over to the linked page.
pub(super) async fn follow<'a>(
    evaluator: &'a Evaluator<'a>,
    follow: &'a Follow,
    scope: Scope<'a>,
    partial: Value,
) -> Result<Value, ScrapeError> {
    let link = match follow.elem.as_deref() {
        Some(elem) => selector::select_first(evaluator.document, Some(elem), scope, evaluator.config)?,
        None => scope
            .element
            .ok_or_else(|| ScrapeError::config(MISSING_SELECTOR))?,
    };

    let url = link_target(link, evaluator.page).ok_or_else(|| ScrapeError::MissingLink {
        selector: follow
            .elem
            .as_deref()
            .or(scope.selector)
            .unwrap_or_default()
            .to_string(),
    })?;

    let limit = evaluator.config.max_follow_depth;
    if evaluator.depth >= limit {
        return Err(ScrapeError::FollowDepth { url, limit });
    }

    tracing::debug!(from = %evaluator.page.url, to = %url, depth = evaluator.depth + 1, "following link");
    let html = evaluator.fetcher.fetch(&PageRequest::get(&url)).await?;
    let result = scrape_page(
        evaluator.fetcher,
        evaluator.config,
        &url,
        &html,
        &follow.spec,
        evaluator.depth + 1,
    )
    .await?;

    Ok(merge(partial, result))
}

/// Mapping results extend the partial result; anything else replaces it
fn merge(partial: Value, result: Value) -> Value {
    match (partial, result) {
        (Value::Object(mut base), Value::Object(extra)) => {
            base.extend(extra);
            Value::Object(base)
        }
        (_, result) => result,
    }
}
