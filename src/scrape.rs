//! Scrape entry point
//!
//! A [`ScrapeRequest`] names a page (or carries its HTML), a [`Spec`] and the
//! parameters substituted into it. [`Scraper`] loads the page, evaluates
//! it and owns the login sessions shared between requests.

use std::fmt;
use std::sync::Arc;

use scraper::Html;
use serde::Deserialize;
use serde_json::Value;

use crate::config::ScrapeConfig;
use crate::error::ScrapeError;
use crate::evaluator::{Evaluator, Page, Scope};
use crate::fetch::{Fetch, FetchOptions, HttpConfig, HttpFetcher, PageRequest};
use crate::params::{substitute, Params};
use crate::session::{AuthOptions, SessionStore};
use crate::spec::{Node, Spec};

const MISSING_URL: &str = "Please specify the `url`. Even when passing in HTML, it's still \
                           necessary to make relative paths absolute.";

/// One top-level scrape
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScrapeRequest {
    /// Page to load; required even with `html`, to resolve relative links
    pub url: Option<String>,
    /// Pre-fetched markup, skips loading `url`
    pub html: Option<String>,
    pub data: Spec,
    #[serde(alias = "parameters")]
    pub params: Params,
    pub config: ScrapeConfig,
    pub fetch: FetchOptions,
    pub auth: Option<AuthOptions>,
}

impl ScrapeRequest {
    pub fn new(url: impl Into<String>, data: impl Into<Spec>) -> Self {
        Self {
            url: Some(url.into()),
            data: data.into(),
            ..Self::default()
        }
    }

    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn config(mut self, config: ScrapeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn fetch(mut self, options: FetchOptions) -> Self {
        self.fetch = options;
        self
    }

    pub fn auth(mut self, auth: AuthOptions) -> Self {
        self.auth = Some(auth);
        self
    }
}

/// Scrapes pages through a [`Fetch`] implementation
pub struct Scraper {
    fetcher: Arc<dyn Fetch>,
    sessions: SessionStore,
}

impl fmt::Debug for Scraper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scraper")
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

impl Scraper {
    /// Scraper over HTTP with the default client settings
    pub fn new() -> Result<Self, ScrapeError> {
        Self::with_http_config(HttpConfig::default())
    }

    pub fn with_http_config(config: HttpConfig) -> Result<Self, ScrapeError> {
        Ok(Self::with_fetcher(Arc::new(HttpFetcher::new(config)?)))
    }

    pub fn with_fetcher(fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            fetcher,
            sessions: SessionStore::new(),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Run one scrape.
    ///
    /// Fails on configuration problems, on failure to load the page, and
    /// on evaluation errors the request's [`ScrapeConfig`] doesn't isolate.
    pub async fn scrape(&self, request: ScrapeRequest) -> Result<Value, ScrapeError> {
        let ScrapeRequest {
            url,
            html,
            data,
            params,
            config,
            fetch,
            auth,
        } = request;

        let url = url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ScrapeError::config(MISSING_URL))?;
        let jar = self
            .sessions
            .authenticate(self.fetcher.as_ref(), auth.as_ref())
            .await?;

        let spec = substitute(&data, &params);
        let node = Node::from_spec(&spec);

        let html = match html {
            Some(html) => html,
            None => {
                let request = PageRequest::get(&url).options(&fetch).session(jar.as_ref());
                self.fetcher.fetch(&request).await?
            }
        };

        match scrape_page(self.fetcher.as_ref(), &config, &url, &html, &node, 0).await {
            // Nothing encloses a top-level spec, so only `testing` can absorb its failure
            Err(err) if config.testing && err.is_recoverable() => {
                tracing::debug!(error = %err, "returning top-level error message");
                Ok(Value::String(err.to_string()))
            }
            result => result,
        }
    }
}

/// Parse `html` as the page at `url` and evaluate `node` against it
pub(crate) async fn scrape_page(
    fetcher: &dyn Fetch,
    config: &ScrapeConfig,
    url: &str,
    html: &str,
    node: &Node,
    depth: usize,
) -> Result<Value, ScrapeError> {
    let page = Page::new(url)?;
    let document = Html::parse_document(html);
    tracing::debug!(url, depth, "evaluating spec");

    let evaluator = Evaluator {
        document: &document,
        page: &page,
        fetcher,
        config,
        depth,
    };
    evaluator.eval(node, Scope::document()).await
}

/// Scrape with a fresh HTTP [`Scraper`]
pub async fn scrape(request: ScrapeRequest) -> Result<Value, ScrapeError> {
    Scraper::new()?.scrape(request).await
}
