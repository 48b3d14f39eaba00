//! Declarative HTML scraping
//!
//! Evaluates a JSON-like extraction spec against an HTML page:
//! - selector strings extract one value
//! - one-element lists extract one value per matched element
//! - mappings build objects, or with `_elem`/`_value`/`_filter`/`_follow`
//!   directives narrow, filter and follow links to other pages
//!
//! ```no_run
//! use serde_json::json;
//! use spec_scraper::{scrape, ScrapeConfig, ScrapeRequest};
//!
//! # async fn run() -> Result<(), spec_scraper::ScrapeError> {
//! let request = ScrapeRequest::new(
//!     "http://www.imdb.com/title/tt0371746/",
//!     json!({
//!         "title": ".title_wrapper h1",
//!         "cast": [{ "_elem": ".cast_list tr", "actor": ".itemprop" }],
//!     }),
//! )
//! .config(ScrapeConfig::default().separate_errors(true));
//!
//! let movie = scrape(request).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
mod evaluator;
pub mod fetch;
pub mod ffi;
pub mod params;
pub mod scrape;
pub mod session;
pub mod spec;

pub use config::{LogSink, ScrapeConfig};
pub use error::{AuthError, FetchError, ScrapeError};
pub use evaluator::ERRORS_KEY;
pub use fetch::{CookieJar, Fetch, FetchOptions, HttpConfig, HttpFetcher, PageRequest};
pub use params::{substitute, Param, Params};
pub use scrape::{scrape, ScrapeRequest, Scraper};
pub use session::{AuthOptions, SessionStore};
pub use spec::{Predicate, Spec};
