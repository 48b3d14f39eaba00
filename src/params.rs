//! Placeholder substitution
//!
//! Strings in a spec may contain `{{dotted.path}}` tokens resolved against
//! [`Params`]. A string that is exactly one token is replaced by the
//! parameter itself, keeping its kind, so predicates, patterns and whole
//! sub-specs can be injected. Any other string gets each token replaced
//! by the parameter's text.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::spec::{Predicate, Spec};

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"\{\{(.*?)\}\}").expect("valid placeholder regex"))
}

/// A single parameter value
#[derive(Debug, Clone)]
pub enum Param {
    Value(Value),
    Pattern(Regex),
    Predicate(Predicate),
    Spec(Spec),
    Group(Params),
}

impl From<&str> for Param {
    fn from(s: &str) -> Self {
        Param::Value(Value::String(s.to_string()))
    }
}

impl From<String> for Param {
    fn from(s: String) -> Self {
        Param::Value(Value::String(s))
    }
}

impl From<Value> for Param {
    fn from(v: Value) -> Self {
        Param::Value(v)
    }
}

impl From<Regex> for Param {
    fn from(re: Regex) -> Self {
        Param::Pattern(re)
    }
}

impl From<Predicate> for Param {
    fn from(p: Predicate) -> Self {
        Param::Predicate(p)
    }
}

impl From<Spec> for Param {
    fn from(s: Spec) -> Self {
        Param::Spec(s)
    }
}

impl From<Params> for Param {
    fn from(p: Params) -> Self {
        Param::Group(p)
    }
}

/// Parameter mapping consumed by placeholder substitution
#[derive(Debug, Clone, Default)]
pub struct Params(BTreeMap<String, Param>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, param: impl Into<Param>) -> Self {
        self.insert(key, param);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, param: impl Into<Param>) {
        self.0.insert(key.into(), param.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolve a dotted path such as `shows.title`.
    ///
    /// Paths walk nested groups and, inside JSON values, objects and
    /// arrays (numeric segments index arrays).
    pub fn lookup(&self, path: &str) -> Option<Spec> {
        let mut segments = path.split('.').map(str::trim);
        let first = segments.next()?;
        let mut current = Found::Param(self.0.get(first)?);

        for segment in segments {
            current = match current {
                Found::Param(Param::Group(group)) => Found::Param(group.0.get(segment)?),
                Found::Param(Param::Value(value)) => Found::Json(json_child(value, segment)?),
                Found::Json(value) => Found::Json(json_child(value, segment)?),
                Found::Param(Param::Spec(spec)) => Found::Spec(spec.get(segment)?),
                Found::Spec(spec) => Found::Spec(spec.get(segment)?),
                Found::Param(_) => return None,
            };
        }

        Some(current.to_spec())
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Params(map.into_iter().map(|(k, v)| (k, Param::Value(v))).collect())
    }
}

impl<'de> Deserialize<'de> for Params {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::<String, Value>::deserialize(deserializer).map(Params::from)
    }
}

enum Found<'p> {
    Param(&'p Param),
    Json(&'p Value),
    Spec(&'p Spec),
}

impl Found<'_> {
    fn to_spec(&self) -> Spec {
        match *self {
            Found::Json(value) => Spec::from(value.clone()),
            Found::Spec(spec) => spec.clone(),
            Found::Param(Param::Value(value)) => Spec::from(value.clone()),
            Found::Param(Param::Pattern(re)) => Spec::Pattern(re.clone()),
            Found::Param(Param::Predicate(p)) => Spec::Predicate(p.clone()),
            Found::Param(Param::Spec(spec)) => spec.clone(),
            Found::Param(Param::Group(group)) => Spec::Map(
                group
                    .0
                    .iter()
                    .map(|(k, p)| (k.clone(), Found::Param(p).to_spec()))
                    .collect(),
            ),
        }
    }
}

fn json_child<'v>(value: &'v Value, segment: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

/// Text form of a substituted parameter, for tokens embedded in text
fn spec_text(spec: &Spec) -> Option<String> {
    match spec {
        Spec::Selector(s) => Some(s.clone()),
        Spec::Literal(v) => Some(v.to_string()),
        Spec::Pattern(re) => Some(re.as_str().to_string()),
        _ => None,
    }
}

/// Substitute placeholders throughout a spec.
///
/// Returns a new spec; mapping keys are left untouched.
pub fn substitute(spec: &Spec, params: &Params) -> Spec {
    match spec {
        Spec::Selector(s) => substitute_str(s, params),
        Spec::List(items) => Spec::List(items.iter().map(|s| substitute(s, params)).collect()),
        Spec::Map(entries) => Spec::Map(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), substitute(v, params)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn substitute_str(s: &str, params: &Params) -> Spec {
    let tokens = token_regex();
    let mut matches = tokens.captures_iter(s);

    let Some(first) = matches.next() else {
        return Spec::Selector(s.to_string());
    };

    // A lone token keeps the parameter's own kind
    if matches.next().is_none() && first[0].len() == s.len() {
        return params.lookup(&first[1]).unwrap_or_else(|| {
            tracing::debug!(path = &first[1], "placeholder has no parameter");
            Spec::Missing
        });
    }

    let text = tokens.replace_all(s, |caps: &Captures<'_>| {
        match params.lookup(&caps[1]).as_ref().and_then(spec_text) {
            Some(text) => text,
            None => {
                tracing::warn!(path = &caps[1], "placeholder has no text value, inserting nothing");
                String::new()
            }
        }
    });
    Spec::Selector(text.into_owned())
}
