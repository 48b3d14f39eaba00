//! `_filter` evaluation
//!
//! A filter runs after a mapping's fields are extracted and decides
//! whether the result is kept. Unsupported filter/value combinations are
//! logged and let the value through.

use regex::Regex;
use serde_json::{Map, Value};

use crate::config::ScrapeConfig;
use crate::spec::{Predicate, Spec};

#[derive(Debug, Clone)]
pub(crate) enum Filter {
    /// Substring test against a scalar
    Contains(String),
    Pattern(Regex),
    /// Every pair must be present and equal in the value
    Subset(Map<String, Value>),
    Predicate(Predicate),
    Unsupported(String),
}

impl Filter {
    pub(crate) fn from_spec(spec: &Spec) -> Filter {
        match spec {
            Spec::Selector(s) => Filter::Contains(s.clone()),
            Spec::Pattern(re) => Filter::Pattern(re.clone()),
            Spec::Predicate(p) => Filter::Predicate(p.clone()),
            Spec::Map(_) => match spec.to_value() {
                Value::Object(map) => Filter::Subset(map),
                other => Filter::Unsupported(other.to_string()),
            },
            other => Filter::Unsupported(format!("{:?}", other)),
        }
    }

    /// Whether `value` is kept
    pub(crate) fn passes(&self, value: &Value, config: &ScrapeConfig) -> bool {
        match (self, value) {
            (Filter::Predicate(p), _) => p.test(value),
            (Filter::Subset(expected), Value::Object(actual)) => is_subset(expected, actual),
            (Filter::Contains(needle), Value::String(s)) => s.contains(needle.as_str()),
            (Filter::Pattern(re), Value::String(s)) => re.is_match(s),
            // Any string field of a mapping may satisfy a pattern
            (Filter::Pattern(re), Value::Object(fields)) => fields
                .values()
                .any(|v| matches!(v, Value::String(s) if re.is_match(s))),
            (filter, value) => {
                config.log(&format!(
                    "Unsupported filter {} for {} value, ignoring it",
                    filter.describe(),
                    kind(value)
                ));
                true
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            Filter::Contains(s) => format!("'{}'", s),
            Filter::Pattern(re) => format!("/{}/", re.as_str()),
            Filter::Subset(map) => Value::Object(map.clone()).to_string(),
            Filter::Predicate(_) => "predicate".to_string(),
            Filter::Unsupported(s) => s.clone(),
        }
    }
}

fn is_subset(expected: &Map<String, Value>, actual: &Map<String, Value>) -> bool {
    expected.iter().all(|(key, want)| match (want, actual.get(key)) {
        (Value::Object(want), Some(Value::Object(have))) => is_subset(want, have),
        (want, Some(have)) => want == have,
        (_, None) => false,
    })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn config() -> ScrapeConfig {
        ScrapeConfig::default()
    }

    #[test]
    fn test_string_filter() {
        let filter = Filter::from_spec(&Spec::from("Iron"));
        assert!(filter.passes(&json!("Iron Man 2"), &config()));
        assert!(!filter.passes(&json!("Thor"), &config()));
    }

    #[test]
    fn test_pattern_filter() {
        let filter = Filter::from_spec(&Spec::pattern("^Iron Man($| )").unwrap());
        assert!(filter.passes(&json!("Iron Man"), &config()));
        assert!(!filter.passes(&json!("Iron Mania"), &config()));
        assert!(filter.passes(&json!({ "title": "Iron Man 3", "year": 2013 }), &config()));
        assert!(!filter.passes(&json!({ "title": "Thor" }), &config()));
    }

    #[test]
    fn test_subset_filter() {
        let filter = Filter::from_spec(&Spec::from(json!({ "title": "Game of Thrones" })));
        assert!(filter.passes(&json!({ "title": "Game of Thrones", "year": "2011" }), &config()));
        assert!(!filter.passes(&json!({ "title": "Westworld" }), &config()));
        assert!(!filter.passes(&json!({ "year": "2011" }), &config()));

        let nested = Filter::from_spec(&Spec::from(json!({ "cast": { "lead": "Sean Bean" } })));
        assert!(nested.passes(
            &json!({ "cast": { "lead": "Sean Bean", "support": "Emilia Clarke" } }),
            &config()
        ));
    }

    #[test]
    fn test_predicate_filter() {
        let filter = Filter::from_spec(&Spec::predicate(|v| v["year"] == "2008"));
        assert!(filter.passes(&json!({ "year": "2008" }), &config()));
        assert!(!filter.passes(&json!({ "year": "2010" }), &config()));
    }

    #[test]
    fn test_mismatch_passes_and_logs() {
        let logs = Arc::new(Mutex::new(Vec::new()));
        let sink = logs.clone();
        let config = config().logger(move |m| sink.lock().unwrap().push(m.to_string()));

        let numeric = Filter::from_spec(&Spec::from(json!(5)));
        assert!(numeric.passes(&json!("five"), &config));

        let string = Filter::from_spec(&Spec::from("Iron"));
        assert!(string.passes(&json!({ "title": "Thor" }), &config));

        let logs = logs.lock().unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[1], "Unsupported filter 'Iron' for object value, ignoring it");
    }
}
