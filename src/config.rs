//! Runtime configuration.
//!
//! All configuration is driven by environment variables:
//!
//! | Variable | Field | Default |
//! |---|---|---|
//! | `TRELLIS_LISTEN` | `listen` | `0.0.0.0:8080` |
//! | `TRELLIS_EXPOSE_BACKTRACE` | `expose_backtrace` | `false` |
//! | `TRELLIS_SESSION_TIMEOUT_MS` | `session_timeout_ms` | unset |
//! | `TRELLIS_LOG` | `log_level` | `info` |

use std::time::Duration;

use tracing::warn;

/// Server and dispatch configuration.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Bind address.
    pub listen: String,
    /// Include the error message and a call-stack listing in `500` pages.
    pub expose_backtrace: bool,
    /// Upper bound handed to every opened session.
    pub session_timeout_ms: Option<u64>,
    /// Default log filter for binaries that initialize tracing from it.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_owned(),
            expose_backtrace: false,
            session_timeout_ms: None,
            log_level: "info".to_owned(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("TRELLIS_LISTEN") {
            config.listen = v;
        }
        if let Some(v) = lookup("TRELLIS_EXPOSE_BACKTRACE") {
            config.expose_backtrace = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Some(v) = lookup("TRELLIS_SESSION_TIMEOUT_MS") {
            match v.parse() {
                Ok(ms) => config.session_timeout_ms = Some(ms),
                Err(_) => warn!(value = %v, "ignoring invalid TRELLIS_SESSION_TIMEOUT_MS"),
            }
        }
        if let Some(v) = lookup("TRELLIS_LOG") {
            config.log_level = v;
        }

        config
    }

    pub fn session_timeout(&self) -> Option<Duration> {
        self.session_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        Config::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let c = lookup(&[]);
        assert_eq!(c, Config::default());
        assert_eq!(c.session_timeout(), None);
    }

    #[test]
    fn overrides() {
        let c = lookup(&[
            ("TRELLIS_LISTEN", "127.0.0.1:3000"),
            ("TRELLIS_EXPOSE_BACKTRACE", "TRUE"),
            ("TRELLIS_SESSION_TIMEOUT_MS", "1500"),
        ]);
        assert_eq!(c.listen, "127.0.0.1:3000");
        assert!(c.expose_backtrace);
        assert_eq!(c.session_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn invalid_timeout_is_ignored() {
        let c = lookup(&[("TRELLIS_SESSION_TIMEOUT_MS", "soon")]);
        assert_eq!(c.session_timeout_ms, None);
    }

    #[test]
    fn deserializes_partial_documents() {
        let c: Config = serde_json::from_str(r#"{"exposeBacktrace":true}"#).unwrap();
        assert!(c.expose_backtrace);
        assert_eq!(c.listen, "0.0.0.0:8080");
    }
}
