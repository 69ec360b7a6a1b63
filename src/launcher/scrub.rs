use tracing::debug;

/// Removes the named variables from the process environment when dropped.
///
/// Held for the whole launch so the removal happens on every exit path,
/// errors and early returns included.
#[derive(Debug)]
pub struct CredentialScrubber {
    names: Vec<String>,
}

impl CredentialScrubber {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl Drop for CredentialScrubber {
    fn drop(&mut self) {
        for name in &self.names {
            if std::env::var_os(name).is_some() {
                std::env::remove_var(name);
                debug!("Scrubbed {} from process environment", name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrubs_on_drop() {
        std::env::set_var("BTC_ACCUMULATOR_SCRUB_TEST_KEY", "abc");

        {
            let _scrubber = CredentialScrubber::new(["BTC_ACCUMULATOR_SCRUB_TEST_KEY"]);
            assert!(std::env::var_os("BTC_ACCUMULATOR_SCRUB_TEST_KEY").is_some());
        }

        assert!(std::env::var_os("BTC_ACCUMULATOR_SCRUB_TEST_KEY").is_none());
    }

    #[test]
    fn test_scrubs_during_unwind() {
        std::env::set_var("BTC_ACCUMULATOR_SCRUB_TEST_PANIC", "abc");

        let result = std::panic::catch_unwind(|| {
            let _scrubber = CredentialScrubber::new(["BTC_ACCUMULATOR_SCRUB_TEST_PANIC"]);
            panic!("bot blew up");
        });

        assert!(result.is_err());
        assert!(std::env::var_os("BTC_ACCUMULATOR_SCRUB_TEST_PANIC").is_none());
    }

    #[test]
    fn test_absent_variables_are_ignored() {
        let scrubber = CredentialScrubber::new(["BTC_ACCUMULATOR_SCRUB_TEST_NEVER_SET"]);
        assert_eq!(scrubber.names().len(), 1);
        drop(scrubber);
    }
}
