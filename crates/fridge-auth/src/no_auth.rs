//! Endpoints that must never carry a bearer token

use crate::constants::DEFAULT_NO_AUTH_PATHS;

/// Path patterns exempt from credential injection and renewal.
///
/// A path matches a pattern when, ignoring any query string and trailing
/// slash, it equals the pattern or lies beneath it (`pattern/...`).
/// `/api/auth/login` matches `/api/auth/login?x=1` and `/api/auth/login/`
/// but not `/api/auth/loginx`.
#[derive(Debug, Clone)]
pub struct NoAuthPaths {
    patterns: Vec<String>,
}

impl NoAuthPaths {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| normalize(&p.into()).to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Add extra patterns on top of the current set.
    pub fn extend<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for pattern in extra {
            let pattern = normalize(&pattern.into()).to_string();
            if !pattern.is_empty() && !self.patterns.contains(&pattern) {
                self.patterns.push(pattern);
            }
        }
        self
    }

    pub fn matches(&self, path: &str) -> bool {
        let path = normalize(path);
        self.patterns.iter().any(|pattern| {
            path == pattern.as_str()
                || path
                    .strip_prefix(pattern.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Default for NoAuthPaths {
    fn default() -> Self {
        Self::new(DEFAULT_NO_AUTH_PATHS.iter().copied())
    }
}

/// Strip query string and trailing slash.
fn normalize(path: &str) -> &str {
    let path = path.split_once('?').map_or(path, |(p, _)| p);
    path.trim_end_matches('/')
}
