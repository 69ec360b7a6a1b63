use std::collections::BTreeMap;
use std::fmt;
use std::io::{ErrorKind, Read};
use std::path::Path;

use tracing::debug;

use super::ConfigError;

/// Variables parsed from a `.env`-style file.
///
/// Nothing here touches the process environment: values are handed to
/// [`Settings`](super::Settings) explicitly and dropped with it.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct EnvVars {
    vars: BTreeMap<String, String>,
}

impl EnvVars {
    /// Reads `KEY=VALUE` lines from `path`. `#` comments and blank lines are
    /// skipped; a line that is neither is rejected rather than passed through.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let iter = dotenvy::from_path_iter(path).map_err(|e| match e {
            dotenvy::Error::Io(io) if io.kind() == ErrorKind::NotFound => {
                ConfigError::EnvFileNotFound {
                    path: path.to_path_buf(),
                }
            }
            other => ConfigError::EnvFileUnreadable {
                reason: other.to_string(),
            },
        })?;

        let vars = Self::collect(iter)?;
        debug!("Loaded {} variables from {}", vars.len(), path.display());
        Ok(vars)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Self::collect(dotenvy::from_read_iter(contents.as_bytes()))
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    fn collect<R: Read>(iter: dotenvy::Iter<R>) -> Result<Self, ConfigError> {
        let mut vars = BTreeMap::new();

        for item in iter {
            let (key, value) = item.map_err(|e| match e {
                dotenvy::Error::LineParse(line, column) => ConfigError::MalformedLine {
                    // Only the key half is echoed back; the value may be a secret.
                    key: line
                        .split_once('=')
                        .map(|(k, _)| k.trim().to_string())
                        .unwrap_or_else(|| "<no key>".to_string()),
                    column,
                },
                other => ConfigError::EnvFileUnreadable {
                    reason: other.to_string(),
                },
            })?;
            vars.insert(key, value);
        }

        Ok(Self { vars })
    }

    /// Fills keys absent from the file with inherited process variables.
    /// File values win, as they would after `export $(cat .env)`.
    pub fn with_process_fallback(mut self) -> Self {
        for (key, value) in std::env::vars_os() {
            if let (Ok(key), Ok(value)) = (key.into_string(), value.into_string()) {
                self.vars.entry(key).or_insert(value);
            }
        }
        self
    }

    /// Trimmed value of `key`; empty values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl fmt::Debug for EnvVars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvVars")
            .field("keys", &self.vars.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_skips_comments_and_blank_lines() {
        let vars = EnvVars::parse(
            "# exchange credentials\n\nBTCMARKETS_API_KEY=abc\n  # indented comment\nDRY_RUN=1\n",
        )
        .unwrap();

        assert_eq!(vars.len(), 2);
        assert_eq!(vars.get("BTCMARKETS_API_KEY"), Some("abc"));
        assert_eq!(vars.get("DRY_RUN"), Some("1"));
    }

    #[test]
    fn test_parse_handles_quotes_and_export_prefix() {
        let vars = EnvVars::parse("export BASE_WEEKLY_AMOUNT=\"750\"\nMIN_WEEKLY_AMOUNT='50'\n")
            .unwrap();

        assert_eq!(vars.get("BASE_WEEKLY_AMOUNT"), Some("750"));
        assert_eq!(vars.get("MIN_WEEKLY_AMOUNT"), Some("50"));
    }

    #[test]
    fn test_empty_value_counts_as_absent() {
        let vars = EnvVars::parse("BTCMARKETS_API_KEY=\nBTCMARKETS_PRIVATE_KEY=   \n").unwrap();

        assert!(!vars.contains("BTCMARKETS_API_KEY"));
        assert!(!vars.contains("BTCMARKETS_PRIVATE_KEY"));
        assert_eq!(vars.len(), 2);
    }

    #[test]
    fn test_malformed_line_is_rejected() {
        let err = EnvVars::parse("GOOD=1\nthis line is not an assignment\n").unwrap_err();
        assert!(matches!(err, ConfigError::MalformedLine { .. }));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");

        let err = EnvVars::from_file(&path).unwrap_err();
        match err {
            ConfigError::EnvFileNotFound { path: reported } => assert_eq!(reported, path),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment\nBTCMARKETS_API_KEY=key\nBTCMARKETS_PRIVATE_KEY=c2VjcmV0").unwrap();

        let vars = EnvVars::from_file(file.path()).unwrap();
        assert_eq!(vars.get("BTCMARKETS_API_KEY"), Some("key"));
        assert_eq!(vars.get("BTCMARKETS_PRIVATE_KEY"), Some("c2VjcmV0"));
    }

    #[test]
    fn test_file_values_win_over_process_env() {
        std::env::set_var("BTC_ACCUMULATOR_TEST_FALLBACK_A", "from-process");
        std::env::set_var("BTC_ACCUMULATOR_TEST_FALLBACK_B", "from-process");

        let vars = EnvVars::from_pairs([("BTC_ACCUMULATOR_TEST_FALLBACK_A", "from-file")])
            .with_process_fallback();

        assert_eq!(vars.get("BTC_ACCUMULATOR_TEST_FALLBACK_A"), Some("from-file"));
        assert_eq!(vars.get("BTC_ACCUMULATOR_TEST_FALLBACK_B"), Some("from-process"));

        std::env::remove_var("BTC_ACCUMULATOR_TEST_FALLBACK_A");
        std::env::remove_var("BTC_ACCUMULATOR_TEST_FALLBACK_B");
    }

    #[test]
    fn test_debug_hides_values() {
        let vars = EnvVars::from_pairs([("BTCMARKETS_PRIVATE_KEY", "super-secret")]);
        let rendered = format!("{vars:?}");

        assert!(rendered.contains("BTCMARKETS_PRIVATE_KEY"));
        assert!(!rendered.contains("super-secret"));
    }
}
