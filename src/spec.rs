//! Extraction specs
//!
//! A spec is a tree of selector strings, one-element lists and mappings.
//! Mappings may carry directive keys (`_elem`, `_value`, `_filter`,
//! `_follow`) that control evaluation instead of naming output fields.
//!
//! Specs are usually built from JSON:
//!
//! ```
//! use serde_json::json;
//! use spec_scraper::Spec;
//!
//! let spec = Spec::from(json!({
//!     "title": ".title",
//!     "cast": [".cast li"],
//!     "poster": { "_elem": ".poster img", "_value": "src" },
//! }));
//! assert!(spec.get("cast").is_some());
//! ```
//!
//! Regular expressions and predicates have no JSON form; they are placed
//! with [`Spec::with`] or injected through parameters.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::evaluator::filter::Filter;

pub const ELEM: &str = "_elem";
pub const VALUE: &str = "_value";
pub const FILTER: &str = "_filter";
pub const FOLLOW: &str = "_follow";

const DIRECTIVES: [&str; 4] = [ELEM, VALUE, FILTER, FOLLOW];

/// Boolean test over an extracted value, usable as `_filter`
#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(&Value) -> bool + Send + Sync>);

impl Predicate {
    pub fn new(f: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Predicate(Arc::new(f))
    }

    pub fn test(&self, value: &Value) -> bool {
        (self.0)(value)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// A declarative extraction spec
#[derive(Debug, Clone)]
pub enum Spec {
    /// Nothing, e.g. a placeholder whose parameter doesn't exist
    Missing,
    Selector(String),
    /// Per-item template; must hold exactly one element
    List(Vec<Spec>),
    /// Named fields and directives, in declared order
    Map(Vec<(String, Spec)>),
    /// Numbers and booleans
    Literal(Value),
    Pattern(Regex),
    Predicate(Predicate),
}

impl Spec {
    pub fn list(template: impl Into<Spec>) -> Spec {
        Spec::List(vec![template.into()])
    }

    pub fn map<K, S>(entries: impl IntoIterator<Item = (K, S)>) -> Spec
    where
        K: Into<String>,
        S: Into<Spec>,
    {
        Spec::Map(
            entries
                .into_iter()
                .map(|(k, s)| (k.into(), s.into()))
                .collect(),
        )
    }

    pub fn pattern(pattern: &str) -> Result<Spec, regex::Error> {
        Regex::new(pattern).map(Spec::Pattern)
    }

    pub fn predicate(f: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Spec {
        Spec::Predicate(Predicate::new(f))
    }

    /// Set `key` on a mapping spec, replacing an existing entry.
    ///
    /// A non-mapping spec is replaced by a mapping holding only `key`.
    pub fn with(self, key: impl Into<String>, spec: impl Into<Spec>) -> Spec {
        let key = key.into();
        let spec = spec.into();
        let mut entries = match self {
            Spec::Map(entries) => entries,
            _ => Vec::new(),
        };
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = spec,
            None => entries.push((key, spec)),
        }
        Spec::Map(entries)
    }

    pub fn get(&self, key: &str) -> Option<&Spec> {
        match self {
            Spec::Map(entries) => lookup(entries, key),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Spec::Missing)
    }

    /// Plain JSON view, used when a mapping is compared against extracted data
    pub(crate) fn to_value(&self) -> Value {
        match self {
            Spec::Missing | Spec::Predicate(_) => Value::Null,
            Spec::Selector(s) => Value::String(s.clone()),
            Spec::List(items) => Value::Array(items.iter().map(Spec::to_value).collect()),
            Spec::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_value()))
                    .collect(),
            ),
            Spec::Literal(v) => v.clone(),
            Spec::Pattern(re) => Value::String(re.as_str().to_string()),
        }
    }
}

impl From<&str> for Spec {
    fn from(s: &str) -> Self {
        Spec::Selector(s.to_string())
    }
}

impl From<String> for Spec {
    fn from(s: String) -> Self {
        Spec::Selector(s)
    }
}

impl From<Regex> for Spec {
    fn from(re: Regex) -> Self {
        Spec::Pattern(re)
    }
}

impl From<Predicate> for Spec {
    fn from(p: Predicate) -> Self {
        Spec::Predicate(p)
    }
}

impl From<Value> for Spec {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Spec::Missing,
            Value::String(s) => Spec::Selector(s),
            Value::Array(items) => Spec::List(items.into_iter().map(Spec::from).collect()),
            Value::Object(map) => Spec::from(map),
            other => Spec::Literal(other),
        }
    }
}

impl From<Map<String, Value>> for Spec {
    fn from(map: Map<String, Value>) -> Self {
        Spec::Map(map.into_iter().map(|(k, v)| (k, Spec::from(v))).collect())
    }
}

impl<'de> Deserialize<'de> for Spec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Spec::from)
    }
}

impl Default for Spec {
    fn default() -> Self {
        Spec::Missing
    }
}

fn lookup<'s>(entries: &'s [(String, Spec)], key: &str) -> Option<&'s Spec> {
    entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

fn is_directive(key: &str) -> bool {
    DIRECTIVES.contains(&key)
}

fn non_empty(selector: &str) -> Option<String> {
    if selector.trim().is_empty() {
        None
    } else {
        Some(selector.to_string())
    }
}

/// Read a directive that must be a string; absent or empty means `None`
fn string_directive(entries: &[(String, Spec)], key: &str) -> Result<Option<String>, String> {
    match lookup(entries, key) {
        None | Some(Spec::Missing) => Ok(None),
        Some(Spec::Selector(s)) => Ok(non_empty(s)),
        Some(other) => Err(format!("`{}` must be a string, found {:?}", key, other)),
    }
}

/// Normalized spec, dispatched on by the evaluator
#[derive(Debug, Clone)]
pub(crate) enum Node {
    /// Select one element and take its default value; `None` means the
    /// element in scope
    Select(Option<String>),
    /// Evaluate `item` once per element matched by `elem`
    Each { elem: Option<String>, item: Box<Node> },
    Directive(Box<Directive>),
    Fields(Vec<(String, Node)>),
    /// Shape that can't be evaluated; fails when reached
    Malformed(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Directive {
    pub elem: Option<String>,
    pub value: Option<String>,
    pub filter: Option<Filter>,
    pub follow: Option<Follow>,
    pub fields: Vec<(String, Node)>,
}

#[derive(Debug, Clone)]
pub(crate) struct Follow {
    /// Link to follow; `None` follows the element in scope
    pub elem: Option<String>,
    /// Spec evaluated on the linked page
    pub spec: Node,
}

impl Node {
    pub(crate) fn from_spec(spec: &Spec) -> Node {
        match spec {
            Spec::Missing => Node::Select(None),
            Spec::Selector(s) => Node::Select(non_empty(s)),
            Spec::List(items) => match items.as_slice() {
                [template] => Node::each(template),
                _ => Node::Malformed(format!(
                    "A list spec must hold exactly one template, found {}",
                    items.len()
                )),
            },
            Spec::Map(entries) => Node::mapping(entries),
            Spec::Literal(v) => {
                Node::Malformed(format!("Expected a selector, list or mapping, found {}", v))
            }
            Spec::Pattern(re) => Node::Malformed(format!(
                "The pattern /{}/ can only be used as `_filter`",
                re.as_str()
            )),
            Spec::Predicate(_) => {
                Node::Malformed("A predicate can only be used as `_filter`".to_string())
            }
        }
    }

    fn each(template: &Spec) -> Node {
        match template {
            Spec::Missing => Node::Each {
                elem: None,
                item: Box::new(Node::Select(None)),
            },
            Spec::Selector(s) => Node::Each {
                elem: non_empty(s),
                item: Box::new(Node::Select(None)),
            },
            Spec::Map(entries) => {
                let elem = match string_directive(entries, ELEM) {
                    Ok(elem) => elem,
                    Err(message) => return Node::Malformed(message),
                };
                // Without `_elem` the rest of the template applies to each match
                let rest: Vec<(String, Spec)> = entries
                    .iter()
                    .filter(|(k, _)| k != ELEM)
                    .cloned()
                    .collect();
                Node::Each {
                    elem,
                    item: Box::new(Node::mapping(&rest)),
                }
            }
            other => Node::Malformed(format!(
                "A list template must be a selector or a mapping, found {:?}",
                other
            )),
        }
    }

    fn mapping(entries: &[(String, Spec)]) -> Node {
        let fields: Vec<(String, Node)> = entries
            .iter()
            .filter(|(k, _)| !is_directive(k))
            .map(|(k, v)| (k.clone(), Node::from_spec(v)))
            .collect();

        let has_directive = entries
            .iter()
            .any(|(k, v)| is_directive(k) && !v.is_missing());
        if !has_directive {
            return Node::Fields(fields);
        }

        match directive(entries, fields) {
            Ok(directive) => Node::Directive(Box::new(directive)),
            Err(message) => Node::Malformed(message),
        }
    }

    /// Value a failed field takes when errors are reported separately
    pub(crate) fn fallback_value(&self) -> Value {
        match self {
            Node::Each { .. } => Value::Array(Vec::new()),
            Node::Fields(_) => Value::Object(Map::new()),
            Node::Directive(d) => match (&d.value, &d.follow) {
                (Some(_), _) => Value::String(String::new()),
                // A mapping follow merges into the partial result, a scalar one replaces it
                (None, Some(follow)) => follow.spec.fallback_value(),
                (None, None) => Value::Object(Map::new()),
            },
            _ => Value::String(String::new()),
        }
    }
}

fn directive(entries: &[(String, Spec)], fields: Vec<(String, Node)>) -> Result<Directive, String> {
    let follow = match lookup(entries, FOLLOW) {
        None | Some(Spec::Missing) => None,
        Some(spec) => Some(Follow::from_spec(spec)?),
    };
    Ok(Directive {
        elem: string_directive(entries, ELEM)?,
        value: string_directive(entries, VALUE)?,
        filter: lookup(entries, FILTER)
            .filter(|s| !s.is_missing())
            .map(Filter::from_spec),
        follow,
        fields,
    })
}

impl Follow {
    fn from_spec(spec: &Spec) -> Result<Follow, String> {
        match spec {
            Spec::Map(entries) => {
                let elem = string_directive(entries, ELEM)?;
                let rest: Vec<(String, Spec)> = entries
                    .iter()
                    .filter(|(k, _)| k != ELEM)
                    .cloned()
                    .collect();
                Ok(Follow {
                    elem,
                    spec: Node::mapping(&rest),
                })
            }
            other => Ok(Follow {
                elem: None,
                spec: Node::from_spec(other),
            }),
        }
    }
}
