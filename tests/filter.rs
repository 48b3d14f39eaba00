mod common;

use common::{collecting_config, request, scraper, url};
use regex::Regex;
use serde_json::{json, Value};
use spec_scraper::{Params, Predicate, ScrapeConfig, ScrapeRequest, Spec};

fn titles(result: &Value, key: &str) -> Vec<String> {
    result[key]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_pattern_filter_on_mappings() {
    let (_, scraper) = scraper();
    let template = Spec::from(json!({ "_elem": ".card", "title": ".t" }))
        .with("_filter", Spec::pattern("^Iron").unwrap());
    let spec = Spec::map([("shows", Spec::list(template))]);

    let result = scraper.scrape(ScrapeRequest::new(url("/search"), spec)).await.unwrap();
    assert_eq!(titles(&result, "shows"), vec!["Iron Man", "Iron Man 2", "Iron Man 3"]);
}

#[tokio::test]
async fn test_string_filter_on_scalars() {
    let (_, scraper) = scraper();
    let spec = json!({
        "titles": [{ "_elem": ".card .t", "_value": "text", "_filter": "Man" }],
    });
    let result = scraper.scrape(request("/search", spec)).await.unwrap();
    assert_eq!(result, json!({ "titles": ["Iron Man", "Iron Man 2", "Iron Man 3"] }));
}

#[tokio::test]
async fn test_subset_filter() {
    let (_, scraper) = scraper();
    let spec = json!({
        "shows": [{ "_elem": ".card", "title": ".t", "year": ".y", "_filter": { "year": "2011" } }],
    });
    let config = ScrapeConfig::default().separate_errors(true);
    let result = scraper
        .scrape(request("/search", spec).config(config))
        .await
        .unwrap();
    assert_eq!(
        result,
        json!({
            "shows": [
                { "title": "Thor", "year": "2011" },
                { "title": "Captain America", "year": "2011" },
            ]
        })
    );
}

#[tokio::test]
async fn test_predicate_from_params() {
    let (_, scraper) = scraper();
    let params = Params::new().with(
        "shows",
        Params::new()
            .with("title", ".t")
            .with("filter", Predicate::new(|show| show["title"] == "Thor")),
    );
    let spec = json!({
        "shows": [{ "_elem": ".card", "title": "{{shows.title}}", "_filter": "{{shows.filter}}" }],
    });
    let result = scraper
        .scrape(request("/search", spec).params(params))
        .await
        .unwrap();
    assert_eq!(result, json!({ "shows": [{ "title": "Thor" }] }));
}

#[tokio::test]
async fn test_compaction_and_refiltering() {
    let (_, scraper) = scraper();
    let is_iron = |show: &Value| show["title"].as_str().is_some_and(|t| t.starts_with("Iron"));
    let params = Params::new().with("iron", Predicate::new(is_iron));
    let spec = json!({
        "all": [{ "_elem": ".card", "title": ".t" }],
        "iron": [{ "_elem": ".card", "title": ".t", "_filter": "{{iron}}" }],
    });
    let result = scraper
        .scrape(request("/search", spec).params(params))
        .await
        .unwrap();

    let all = result["all"].as_array().unwrap();
    let iron = result["iron"].as_array().unwrap();
    let dropped = all.iter().filter(|show| !is_iron(show)).count();
    assert_eq!(iron.len(), all.len() - dropped);

    // Filtering again keeps everything, in matched order
    let again: Vec<&Value> = iron.iter().filter(|show| is_iron(show)).collect();
    assert_eq!(again, iron.iter().collect::<Vec<_>>());
    assert_eq!(titles(&result, "iron"), vec!["Iron Man", "Iron Man 2", "Iron Man 3"]);
}

#[tokio::test]
async fn test_filtered_mapping_is_null() {
    let (_, scraper) = scraper();
    let spec = Spec::map([(
        "first",
        Spec::from(json!({ "_elem": ".card", "title": ".t" }))
            .with("_filter", Regex::new("Thor").unwrap()),
    )]);
    let result = scraper
        .scrape(ScrapeRequest::new(url("/search"), spec))
        .await
        .unwrap();
    assert_eq!(result, json!({ "first": null }));
}

#[tokio::test]
async fn test_unsupported_filter_passes() {
    let (_, scraper) = scraper();
    let (logs, config) = collecting_config();
    let spec = json!({
        "shows": [{ "_elem": ".card", "title": ".t", "_filter": 5 }],
    });
    let result = scraper
        .scrape(request("/search", spec).config(config))
        .await
        .unwrap();

    assert_eq!(result["shows"].as_array().unwrap().len(), 5);
    let logs = logs.lock().unwrap();
    assert_eq!(logs.len(), 5);
    assert!(logs[0].starts_with("Unsupported filter"));
}
