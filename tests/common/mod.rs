#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use spec_scraper::{
    AuthOptions, CookieJar, Fetch, FetchError, PageRequest, ScrapeConfig, ScrapeRequest, Scraper,
};

pub const BASE: &str = "http://localhost:8888";

pub const MOVIE: &str = r#"
<html>
<head><title>Iron Man (2008)</title></head>
<body>
    <div class="title_wrapper">
        <h1 class="title">Iron Man&nbsp;<span id="titleYear">(2008)</span></h1>
        <a class="director" href="/name/nm0269463/">Jon Favreau</a>
        <a class="sequel" href="http://localhost:8888/title/tt1228705/">Iron Man 2</a>
    </div>
    <img class="poster" src="/images/poster.jpg" alt="Poster">
    <div class="summary" data-rating="7.9"><p>Tony <b>Stark</b> builds a suit.</p></div>
    <table class="cast_list">
        <tr><td class="actor">Robert Downey Jr.</td><td class="character">Tony Stark</td></tr>
        <tr><td class="actor">Terrence Howard</td><td class="character">Rhodey</td></tr>
        <tr><td class="actor">Jeff Bridges</td></tr>
    </table>
</body>
</html>
"#;

pub const SEARCH: &str = r#"
<html>
<body>
    <div class="card"><span class="t">Iron Man</span><span class="y">2008</span><a class="more" href="/title/tt0371746/">more</a></div>
    <div class="card"><span class="t">Thor</span><span class="y">2011</span><a class="more" href="/title/tt0800369/">more</a></div>
    <div class="card"><span class="t">Iron Man 2</span><span class="y">2010</span><a class="more" href="/title/tt1228705/">more</a></div>
    <div class="card"><span class="t">Captain America</span><span class="y">2011</span><a class="more" href="/title/tt0458339/">more</a></div>
    <div class="card"><span class="t">Iron Man 3</span><a class="more">more</a></div>
</body>
</html>
"#;

pub const THOR: &str = r#"
<html><body>
    <h1 class="title">Thor (2011)</h1>
    <a class="director" href="/name/nm0000110/">Kenneth Branagh</a>
</body></html>
"#;

pub const IRON_MAN_2: &str = r#"
<html><body>
    <h1 class="title">Iron Man 2 (2010)</h1>
    <a class="director" href="/name/nm0269463/">Jon Favreau</a>
</body></html>
"#;

pub const FAVREAU: &str = r#"
<html><body><h1 class="d">Jon Favreau</h1><span class="born">1966</span></body></html>
"#;

pub const BRANAGH: &str = r#"
<html><body><h1 class="d">Kenneth Branagh</h1><span class="born">1960</span></body></html>
"#;

pub const LOOP: &str = r#"
<html><body><a class="next" href="/loop">again</a></body></html>
"#;

/// Serves fixed pages and accepts one login form
#[derive(Default)]
pub struct MemoryFetcher {
    pages: HashMap<String, String>,
    pub fetched: Mutex<Vec<String>>,
    pub logins: AtomicUsize,
    /// Session cookies seen on fetches
    pub session_fetches: AtomicUsize,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
            .page("/title/tt0371746/", MOVIE)
            .page("/title/tt0800369/", THOR)
            .page("/title/tt1228705/", IRON_MAN_2)
            .page("/name/nm0269463/", FAVREAU)
            .page("/name/nm0000110/", BRANAGH)
            .page("/search", SEARCH)
            .page("/loop", LOOP)
    }

    pub fn page(mut self, path: &str, html: &str) -> Self {
        self.pages.insert(format!("{}{}", BASE, path), html.to_string());
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetch for MemoryFetcher {
    async fn fetch(&self, request: &PageRequest<'_>) -> Result<String, FetchError> {
        self.fetched.lock().unwrap().push(request.url.to_string());
        if request.session.is_some() {
            self.session_fetches.fetch_add(1, Ordering::SeqCst);
        }
        match self.pages.get(request.url) {
            Some(html) => Ok(html.clone()),
            None => Err(FetchError::Status {
                url: request.url.to_string(),
                status: 404,
            }),
        }
    }

    async fn login(&self, auth: &AuthOptions, _jar: &CookieJar) -> Result<(), FetchError> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        let user = auth.form.as_ref().and_then(|form| form.get("username"));
        match user.map(String::as_str) {
            Some("admin") => Ok(()),
            _ => Err(FetchError::Status {
                url: auth.url.clone().unwrap_or_default(),
                status: 401,
            }),
        }
    }
}

pub fn scraper() -> (Arc<MemoryFetcher>, Scraper) {
    let fetcher = Arc::new(MemoryFetcher::new());
    let scraper = Scraper::with_fetcher(fetcher.clone());
    (fetcher, scraper)
}

pub fn url(path: &str) -> String {
    format!("{}{}", BASE, path)
}

pub fn request(path: &str, data: serde_json::Value) -> ScrapeRequest {
    ScrapeRequest::new(url(path), data)
}

/// Config whose logger collects every message
pub fn collecting_config() -> (Arc<Mutex<Vec<String>>>, ScrapeConfig) {
    let logs = Arc::new(Mutex::new(Vec::new()));
    let sink = logs.clone();
    let config = ScrapeConfig::default().logger(move |m| sink.lock().unwrap().push(m.to_string()));
    (logs, config)
}
