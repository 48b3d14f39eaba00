//! Page loading
//!
//! [`Fetch`] turns a URL into HTML. [`HttpFetcher`] is the `reqwest`
//! implementation; tests and embedders can supply their own.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;

use crate::error::FetchError;
use crate::session::AuthOptions;

/// Cookie store shared by the requests of one session
pub type CookieJar = Arc<Jar>;

/// Request options passed through to the fetch layer
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    /// Defaults to `GET`
    pub method: Option<String>,
    pub headers: BTreeMap<String, String>,
    /// Sent url-encoded as the request body
    pub form: Option<BTreeMap<String, String>>,
}

/// A single page load
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'r> {
    pub url: &'r str,
    pub options: Option<&'r FetchOptions>,
    pub session: Option<&'r CookieJar>,
}

impl<'r> PageRequest<'r> {
    /// Plain GET without options or session
    pub fn get(url: &'r str) -> Self {
        PageRequest {
            url,
            options: None,
            session: None,
        }
    }

    pub fn options(mut self, options: &'r FetchOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn session(mut self, jar: Option<&'r CookieJar>) -> Self {
        self.session = jar;
        self
    }
}

#[async_trait]
pub trait Fetch: Send + Sync {
    /// Load the body of a page; non-success statuses are errors
    async fn fetch(&self, request: &PageRequest<'_>) -> Result<String, FetchError>;

    /// Log in with `auth`, storing the session cookies in `jar`
    async fn login(&self, auth: &AuthOptions, jar: &CookieJar) -> Result<(), FetchError> {
        let _ = (auth, jar);
        Err(FetchError::LoginUnsupported)
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("spec-scraper/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_seconds: 30,
            max_redirects: 10,
        }
    }
}

/// [`Fetch`] over `reqwest`
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    config: HttpConfig,
}

impl HttpFetcher {
    pub fn new(config: HttpConfig) -> Result<Self, FetchError> {
        let client = Self::builder(&config, true).build().map_err(FetchError::Client)?;
        Ok(Self { client, config })
    }

    fn builder(config: &HttpConfig, follow_redirects: bool) -> reqwest::ClientBuilder {
        Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.as_str())
            .redirect(if follow_redirects {
                reqwest::redirect::Policy::limited(config.max_redirects)
            } else {
                reqwest::redirect::Policy::none()
            })
    }

    /// Client bound to a session's cookie jar
    fn session_client(&self, jar: &CookieJar, follow_redirects: bool) -> Result<Client, FetchError> {
        Self::builder(&self.config, follow_redirects)
            .cookie_provider(Arc::clone(jar))
            .build()
            .map_err(FetchError::Client)
    }

    async fn send(builder: RequestBuilder, url: &str) -> Result<reqwest::Response, FetchError> {
        builder.send().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })
    }
}

fn parse_method(method: Option<&str>, default: Method) -> Result<Method, FetchError> {
    match method {
        None => Ok(default),
        Some(m) => Method::from_bytes(m.to_uppercase().as_bytes())
            .map_err(|_| FetchError::InvalidMethod(m.to_string())),
    }
}

fn apply_options(
    mut builder: RequestBuilder,
    headers: &BTreeMap<String, String>,
    form: Option<&BTreeMap<String, String>>,
) -> RequestBuilder {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(form) = form {
        builder = builder.form(form);
    }
    builder
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, request: &PageRequest<'_>) -> Result<String, FetchError> {
        let client = match request.session {
            Some(jar) => self.session_client(jar, true)?,
            None => self.client.clone(),
        };
        let options = request.options.cloned().unwrap_or_default();
        let method = parse_method(options.method.as_deref(), Method::GET)?;

        tracing::info!("Fetching URL: {}", request.url);
        let builder = apply_options(
            client.request(method, request.url),
            &options.headers,
            options.form.as_ref(),
        );
        let response = Self::send(builder, request.url).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: request.url.to_string(),
                status: status.as_u16(),
            });
        }
        tracing::debug!("Fetched {} ({})", request.url, status);

        response.text().await.map_err(|source| FetchError::Request {
            url: request.url.to_string(),
            source,
        })
    }

    async fn login(&self, auth: &AuthOptions, jar: &CookieJar) -> Result<(), FetchError> {
        let url = auth.url.as_deref().unwrap_or_default();
        // Redirects after a login are expected; cookies are set on the 3xx itself
        let client = self.session_client(jar, false)?;
        let method = parse_method(auth.method.as_deref(), Method::POST)?;

        tracing::info!("Logging in at {}", url);
        let builder = apply_options(client.request(method, url), &auth.headers, auth.form.as_ref());
        let response = Self::send(builder, url).await?;

        let status = response.status();
        if status.is_success() || status.is_redirection() {
            Ok(())
        } else {
            Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
    }
}
