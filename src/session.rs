//! Login sessions
//!
//! A session is a cookie jar established by logging in once and reused by
//! later scrapes that name the same `sessionId`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::RwLock;

use serde::Deserialize;

use crate::error::AuthError;
use crate::fetch::{CookieJar, Fetch};

/// Login request for a session
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuthOptions {
    pub session_id: Option<String>,
    /// Login endpoint
    pub url: Option<String>,
    /// Defaults to `POST`
    pub method: Option<String>,
    pub form: Option<BTreeMap<String, String>>,
    pub headers: BTreeMap<String, String>,
}

impl AuthOptions {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            ..Self::default()
        }
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }
}

/// Cookie jars keyed by session id
#[derive(Default)]
pub struct SessionStore {
    jars: RwLock<HashMap<String, CookieJar>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, session_id: &str) -> Option<CookieJar> {
        if let Ok(jars) = self.jars.read() {
            return jars.get(session_id).cloned();
        }
        None
    }

    pub fn put(&self, session_id: impl Into<String>, jar: CookieJar) {
        if let Ok(mut jars) = self.jars.write() {
            jars.insert(session_id.into(), jar);
        }
    }

    pub fn remove(&self, session_id: &str) -> Option<CookieJar> {
        self.jars.write().ok().and_then(|mut jars| jars.remove(session_id))
    }

    pub fn len(&self) -> usize {
        self.jars.read().map(|jars| jars.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Jar for the session described by `auth`, logging in when the
    /// session is new.
    ///
    /// No `auth` means no session. A failed login forgets the session so
    /// the next attempt logs in again.
    pub async fn authenticate(
        &self,
        fetcher: &dyn Fetch,
        auth: Option<&AuthOptions>,
    ) -> Result<Option<CookieJar>, AuthError> {
        let Some(auth) = auth else {
            return Ok(None);
        };
        let session_id = auth
            .session_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(AuthError::MissingSessionId)?;

        if let Some(jar) = self.get(session_id) {
            tracing::debug!(session_id, "reusing session");
            return Ok(Some(jar));
        }
        if auth.url.as_deref().map_or(true, str::is_empty) {
            return Err(AuthError::MissingUrl);
        }

        let jar = CookieJar::default();
        self.put(session_id, jar.clone());

        match fetcher.login(auth, &jar).await {
            Ok(()) => {
                tracing::info!(session_id, "logged in");
                Ok(Some(jar))
            }
            Err(err) => {
                self.remove(session_id);
                Err(AuthError::Login(err))
            }
        }
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.len())
            .finish()
    }
}
