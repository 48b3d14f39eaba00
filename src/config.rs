//! Scrape policy and diagnostics
//!
//! Controls how per-field failures are reported and where diagnostic
//! messages go.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

/// Default bound on chained `_follow` directives
pub const DEFAULT_MAX_FOLLOW_DEPTH: usize = 8;

/// Callback receiving every diagnostic message
#[derive(Clone)]
pub struct LogSink(Arc<dyn Fn(&str) + Send + Sync>);

impl LogSink {
    pub fn new(f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        LogSink(Arc::new(f))
    }

    fn emit(&self, message: &str) {
        (self.0)(message)
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LogSink(..)")
    }
}

/// Error reporting policy for one scrape.
///
/// With neither `testing` nor `separate_errors` set, a selector miss
/// fails the whole call. `testing` writes the error message in place of
/// the failed field. `separate_errors` puts a type-appropriate default in
/// place of the field and records the message under a sibling `errors`
/// mapping. The two can be combined.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScrapeConfig {
    pub testing: bool,
    pub separate_errors: bool,
    /// Mirror diagnostics to stderr
    pub enable_logging: bool,
    #[serde(skip)]
    pub logger: Option<LogSink>,
    pub max_follow_depth: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            testing: false,
            separate_errors: false,
            enable_logging: false,
            logger: None,
            max_follow_depth: DEFAULT_MAX_FOLLOW_DEPTH,
        }
    }
}

impl ScrapeConfig {
    pub fn testing(mut self, enabled: bool) -> Self {
        self.testing = enabled;
        self
    }

    pub fn separate_errors(mut self, enabled: bool) -> Self {
        self.separate_errors = enabled;
        self
    }

    pub fn enable_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }

    pub fn logger(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.logger = Some(LogSink::new(f));
        self
    }

    pub fn max_follow_depth(mut self, depth: usize) -> Self {
        self.max_follow_depth = depth;
        self
    }

    /// Whether recoverable field errors are converted instead of propagated
    pub fn allow_errors(&self) -> bool {
        self.separate_errors || self.testing
    }

    /// Report a diagnostic message
    pub(crate) fn log(&self, message: &str) {
        tracing::warn!("{}", message);
        if let Some(sink) = &self.logger {
            sink.emit(message);
        }
        if self.enable_logging {
            eprintln!("{}", message);
        }
    }
}
