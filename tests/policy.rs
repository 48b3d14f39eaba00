mod common;

use common::{collecting_config, request, scraper};
use serde_json::json;
use spec_scraper::{ScrapeConfig, ScrapeError};

const MOVIE_PATH: &str = "/title/tt0371746/";

#[tokio::test]
async fn test_inline_errors_in_list() {
    let (_, scraper) = scraper();
    let spec = json!({
        "shows": [{ "_elem": ".card", "title": ".t", "year": ".y" }],
    });
    let config = ScrapeConfig::default().testing(true);
    let result = scraper
        .scrape(request("/search", spec).config(config))
        .await
        .unwrap();

    assert_eq!(result["shows"][0], json!({ "title": "Iron Man", "year": "2008" }));
    assert_eq!(
        result["shows"][4],
        json!({ "title": "Iron Man 3", "year": "Couldn't find '.y'" })
    );
}

#[tokio::test]
async fn test_separate_errors_defaults() {
    let (_, scraper) = scraper();
    let spec = json!({
        "title": ".title",
        "budget": ".budget",
        "crew": [".crew li"],
        "box": { "_elem": ".box_office", "gross": ".gross" },
    });
    let config = ScrapeConfig::default().separate_errors(true);
    let result = scraper
        .scrape(request(MOVIE_PATH, spec).config(config))
        .await
        .unwrap();

    assert_eq!(
        result,
        json!({
            "title": "Iron Man (2008)",
            "budget": "",
            "crew": [],
            "box": {},
            "errors": {
                "budget": "Couldn't find '.budget'",
                "crew": "Couldn't find '.crew li'",
                "box": "Couldn't find '.box_office'",
            },
        })
    );
}

#[tokio::test]
async fn test_separate_errors_nested() {
    let (_, scraper) = scraper();
    let spec = json!({
        "movie": { "_elem": ".title_wrapper", "title": "h1", "rating": ".rating" },
    });
    let config = ScrapeConfig::default().separate_errors(true);
    let result = scraper
        .scrape(request(MOVIE_PATH, spec).config(config))
        .await
        .unwrap();

    assert_eq!(
        result,
        json!({
            "movie": {
                "title": "Iron Man (2008)",
                "rating": "",
                "errors": { "rating": "Couldn't find '.rating'" },
            },
        })
    );
}

#[tokio::test]
async fn test_separate_errors_and_testing() {
    let (_, scraper) = scraper();
    let spec = json!({ "title": ".title", "budget": ".budget" });
    let config = ScrapeConfig::default().separate_errors(true).testing(true);
    let result = scraper
        .scrape(request(MOVIE_PATH, spec).config(config))
        .await
        .unwrap();

    assert_eq!(
        result,
        json!({
            "title": "Iron Man (2008)",
            "budget": "Couldn't find '.budget'",
            "errors": { "budget": "Couldn't find '.budget'" },
        })
    );
}

#[tokio::test]
async fn test_top_level_testing() {
    let (_, scraper) = scraper();
    let config = ScrapeConfig::default().testing(true);
    let result = scraper
        .scrape(request(MOVIE_PATH, json!(".missing")).config(config))
        .await
        .unwrap();
    assert_eq!(result, json!("Couldn't find '.missing'"));
}

#[tokio::test]
async fn test_top_level_separate_errors_propagates() {
    let (_, scraper) = scraper();
    let config = ScrapeConfig::default().separate_errors(true);
    let err = scraper
        .scrape(request(MOVIE_PATH, json!(".missing")).config(config))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Couldn't find '.missing'");
}

#[tokio::test]
async fn test_configuration_errors_are_not_isolated() {
    let (_, scraper) = scraper();
    let spec = json!({ "title": ".title", "rating": { "_value": "data-rating" } });
    let config = ScrapeConfig::default().separate_errors(true).testing(true);
    let err = scraper
        .scrape(request(MOVIE_PATH, spec).config(config))
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::Configuration(_)));
}

#[tokio::test]
async fn test_logger_names_nesting_selector() {
    let (_, scraper) = scraper();
    let (logs, config) = collecting_config();
    let spec = json!({
        "cast": [{ "_elem": ".cast_list tr", "character": ".character" }],
        "budget": ".budget",
    });
    let result = scraper
        .scrape(request(MOVIE_PATH, spec).config(config.separate_errors(true)))
        .await
        .unwrap();

    assert_eq!(result["cast"][2], json!({ "character": "", "errors": { "character": "Couldn't find '.character'" } }));
    let mut logs = logs.lock().unwrap().clone();
    logs.sort();
    assert_eq!(
        logs,
        vec![
            "Couldn't find '.budget'".to_string(),
            "Couldn't find '.character' in '.cast_list tr'".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_enable_logging_keeps_results() {
    let (_, scraper) = scraper();
    let config = ScrapeConfig::default().enable_logging(true).testing(true);
    let result = scraper
        .scrape(request(MOVIE_PATH, json!({ "budget": ".budget" })).config(config))
        .await
        .unwrap();
    assert_eq!(result, json!({ "budget": "Couldn't find '.budget'" }));
}
