//! Spec tree evaluation
//!
//! Walks a normalized [`Node`] tree against a parsed document. Sibling
//! fields of a mapping and the elements of a list are evaluated as
//! separate futures joined before their parent is assembled; results keep
//! declared key order and matched-element order.
//!
//! Failures of named fields are handled where their mapping is assembled,
//! following the [`ScrapeConfig`] policy. Everything else propagates.

pub(crate) mod filter;
mod follow;
mod selector;
mod value;

use futures::future::{join_all, FutureExt, LocalBoxFuture};
use scraper::Html;
use serde_json::{Map, Value};

use crate::config::ScrapeConfig;
use crate::error::ScrapeError;
use crate::fetch::Fetch;
use crate::spec::{Directive, Node};

pub(crate) use selector::Scope;
pub(crate) use value::Page;

/// Key of the sibling mapping holding isolated error messages
pub const ERRORS_KEY: &str = "errors";

/// Evaluation state for one parsed page
pub(crate) struct Evaluator<'a> {
    pub document: &'a Html,
    pub page: &'a Page,
    pub fetcher: &'a dyn Fetch,
    pub config: &'a ScrapeConfig,
    /// Number of follows that led to this page
    pub depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn eval(
        &'a self,
        node: &'a Node,
        scope: Scope<'a>,
    ) -> LocalBoxFuture<'a, Result<Value, ScrapeError>> {
        async move {
            match node {
                Node::Select(selector) => self.eval_select(selector.as_deref(), scope),
                Node::Each { elem, item } => self.eval_each(elem.as_deref(), item, scope).await,
                Node::Directive(directive) => self.eval_directive(directive, scope).await,
                Node::Fields(fields) => self.eval_fields(fields, scope).await.map(Value::Object),
                Node::Malformed(message) => Err(ScrapeError::config(message.clone())),
            }
        }
        .boxed_local()
    }

    fn eval_select(&self, selector: Option<&str>, scope: Scope<'a>) -> Result<Value, ScrapeError> {
        let element = selector::select_first(self.document, selector, scope, self.config)?;
        Ok(value::default_value(element, self.page))
    }

    async fn eval_each(
        &'a self,
        elem: Option<&'a str>,
        item: &'a Node,
        scope: Scope<'a>,
    ) -> Result<Value, ScrapeError> {
        let elements = selector::select_all(self.document, elem, scope, self.config)?;
        let context = elem.or(scope.selector);

        let results = join_all(
            elements
                .into_iter()
                .map(|element| self.eval(item, Scope::narrowed(element, context))),
        )
        .await;

        let mut items = Vec::with_capacity(results.len());
        for result in results {
            match result? {
                // Dropped by a filter
                Value::Null => {}
                value => items.push(value),
            }
        }
        Ok(Value::Array(items))
    }

    async fn eval_directive(
        &'a self,
        directive: &'a Directive,
        scope: Scope<'a>,
    ) -> Result<Value, ScrapeError> {
        let inner = match directive.elem.as_deref() {
            Some(elem) => Scope::narrowed(
                selector::select_first(self.document, Some(elem), scope, self.config)?,
                Some(elem),
            ),
            None if scope.element.is_none() => {
                return Err(ScrapeError::config(selector::MISSING_SELECTOR));
            }
            None => scope,
        };

        let value = match (directive.value.as_deref(), &directive.follow) {
            (Some(accessor), _) => {
                let element = selector::select_first(self.document, None, inner, self.config)?;
                value::attribute_value(element, accessor, self.page)
            }
            // A bare follow has nothing to filter yet
            (None, Some(follow)) if directive.fields.is_empty() => {
                return follow::follow(self, follow, inner, Value::Object(Map::new())).await;
            }
            (None, _) => Value::Object(self.eval_fields(&directive.fields, inner).await?),
        };

        if let Some(filter) = &directive.filter {
            if !filter.passes(&value, self.config) {
                tracing::trace!(selector = ?directive.elem, "value dropped by filter");
                return Ok(Value::Null);
            }
        }

        match &directive.follow {
            Some(follow) => follow::follow(self, follow, inner, value).await,
            None => Ok(value),
        }
    }

    async fn eval_fields(
        &'a self,
        fields: &'a [(String, Node)],
        scope: Scope<'a>,
    ) -> Result<Map<String, Value>, ScrapeError> {
        let results = join_all(fields.iter().map(move |(_, node)| self.eval(node, scope))).await;

        let mut object = Map::new();
        let mut errors = Map::new();
        for ((key, node), result) in fields.iter().zip(results) {
            let value = match result {
                Ok(value) => value,
                Err(err) => self.isolate(key, node, err, &mut errors)?,
            };
            object.insert(key.clone(), value);
        }

        if !errors.is_empty() {
            object.insert(ERRORS_KEY.to_string(), Value::Object(errors));
        }
        Ok(object)
    }

    /// Convert a failed field per the isolation policy, or hand the error back
    fn isolate(
        &self,
        key: &str,
        node: &Node,
        err: ScrapeError,
        errors: &mut Map<String, Value>,
    ) -> Result<Value, ScrapeError> {
        if !err.is_recoverable() || !self.config.allow_errors() {
            return Err(err);
        }

        let message = err.to_string();
        tracing::debug!(field = key, error = %message, "isolating field error");
        if self.config.separate_errors {
            errors.insert(key.to_string(), Value::String(message.clone()));
        }
        Ok(if self.config.testing {
            Value::String(message)
        } else {
            node.fallback_value()
        })
    }
}
