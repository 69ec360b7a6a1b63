use base64::{engine::general_purpose::STANDARD, Engine as _};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt;
use std::str::FromStr;

use super::{ConfigError, EnvVars};

pub const API_KEY_VAR: &str = "BTCMARKETS_API_KEY";
pub const PRIVATE_KEY_VAR: &str = "BTCMARKETS_PRIVATE_KEY";
/// Older launchers named the secret this way; accepted as an alias.
pub const API_SECRET_VAR: &str = "BTCMARKETS_API_SECRET";
pub const DRY_RUN_VAR: &str = "DRY_RUN";
pub const BASE_AMOUNT_VAR: &str = "BASE_WEEKLY_AMOUNT";
pub const MAX_AMOUNT_VAR: &str = "MAX_WEEKLY_AMOUNT";
pub const MIN_AMOUNT_VAR: &str = "MIN_WEEKLY_AMOUNT";

/// Variables removed from the process environment when a launch ends.
pub const SENSITIVE_VARS: [&str; 3] = [API_KEY_VAR, API_SECRET_VAR, PRIVATE_KEY_VAR];

/// Decoded HMAC key. Overwritten when dropped and never printed.
#[derive(Clone)]
pub struct SecretKey {
    bytes: Vec<u8>,
}

impl SecretKey {
    pub fn from_base64(encoded: &str) -> Result<Self, ConfigError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ConfigError::invalid(PRIVATE_KEY_VAR, format!("not valid base64: {e}")))?;

        if bytes.is_empty() {
            return Err(ConfigError::invalid(PRIVATE_KEY_VAR, "decodes to zero bytes"));
        }

        Ok(Self { bytes })
    }

    pub fn expose(&self) -> &[u8] {
        &self.bytes
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.bytes.iter_mut().for_each(|b| *b = 0);
        std::hint::black_box(&self.bytes);
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

#[derive(Clone)]
pub struct ExchangeCredentials {
    pub api_key: String,
    pub private_key: SecretKey,
}

impl fmt::Debug for ExchangeCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visible: String = self.api_key.chars().take(4).collect();
        f.debug_struct("ExchangeCredentials")
            .field("api_key", &format!("{visible}…"))
            .field("private_key", &self.private_key)
            .finish()
    }
}

/// Weekly purchase bounds in quote currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DcaAmounts {
    pub base: Decimal,
    pub max: Decimal,
    pub min: Decimal,
}

impl Default for DcaAmounts {
    fn default() -> Self {
        Self {
            base: dec!(500),
            max: dec!(2000),
            min: dec!(100),
        }
    }
}

/// Everything a bot needs from the environment, validated once and passed
/// by value into the bot constructor.
#[derive(Debug, Clone)]
pub struct Settings {
    pub credentials: ExchangeCredentials,
    pub amounts: DcaAmounts,
    pub dry_run: bool,
}

impl Settings {
    /// Validates `vars`, reporting every missing credential at once rather
    /// than stopping at the first.
    pub fn from_env(vars: &EnvVars) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();

        let api_key = vars.get(API_KEY_VAR);
        if api_key.is_none() {
            missing.push(API_KEY_VAR.to_string());
        }

        let (private_key, api_secret) = (vars.get(PRIVATE_KEY_VAR), vars.get(API_SECRET_VAR));
        let conflicting = matches!((private_key, api_secret), (Some(a), Some(b)) if a != b);
        let secret = private_key.or(api_secret);
        if secret.is_none() {
            missing.push(format!("{PRIVATE_KEY_VAR} (or {API_SECRET_VAR})"));
        }

        // Missing variables are reported ahead of a secret conflict
        let (Some(api_key), Some(secret)) = (api_key, secret) else {
            return Err(ConfigError::MissingVariables(missing));
        };
        if conflicting {
            return Err(ConfigError::ConflictingSecrets);
        }

        let credentials = ExchangeCredentials {
            api_key: api_key.to_string(),
            private_key: SecretKey::from_base64(secret)?,
        };

        let defaults = DcaAmounts::default();
        let amounts = DcaAmounts {
            base: parse_amount(vars, BASE_AMOUNT_VAR, defaults.base)?,
            max: parse_amount(vars, MAX_AMOUNT_VAR, defaults.max)?,
            min: parse_amount(vars, MIN_AMOUNT_VAR, defaults.min)?,
        };

        if amounts.min > amounts.max {
            return Err(ConfigError::invalid(
                MIN_AMOUNT_VAR,
                format!("{} exceeds {MAX_AMOUNT_VAR} {}", amounts.min, amounts.max),
            ));
        }

        Ok(Self {
            credentials,
            amounts,
            dry_run: vars.get(DRY_RUN_VAR) == Some("1"),
        })
    }
}

fn parse_amount(vars: &EnvVars, name: &str, default: Decimal) -> Result<Decimal, ConfigError> {
    let Some(raw) = vars.get(name) else {
        return Ok(default);
    };

    let value = Decimal::from_str(raw)
        .map_err(|e| ConfigError::invalid(name, format!("'{raw}' is not a number: {e}")))?;

    if value.is_sign_negative() {
        return Err(ConfigError::invalid(name, "must not be negative"));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    // base64("secret")
    const SECRET: &str = "c2VjcmV0";

    fn vars(pairs: &[(&str, &str)]) -> EnvVars {
        EnvVars::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_all_missing_variables_reported() {
        let err = Settings::from_env(&vars(&[])).unwrap_err();

        match err {
            ConfigError::MissingVariables(missing) => {
                assert_eq!(missing.len(), 2);
                assert_eq!(missing[0], API_KEY_VAR);
                assert!(missing[1].contains(PRIVATE_KEY_VAR));
                assert!(missing[1].contains(API_SECRET_VAR));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_secret_named() {
        let err = Settings::from_env(&vars(&[(API_KEY_VAR, "abc")])).unwrap_err();

        match err {
            ConfigError::MissingVariables(missing) => {
                assert_eq!(missing.len(), 1);
                assert!(missing[0].starts_with(PRIVATE_KEY_VAR));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_secret_alias_accepted() {
        let settings =
            Settings::from_env(&vars(&[(API_KEY_VAR, "abc"), (API_SECRET_VAR, SECRET)])).unwrap();

        assert_eq!(settings.credentials.api_key, "abc");
        assert_eq!(settings.credentials.private_key.expose(), b"secret");
    }

    #[test]
    fn test_conflicting_secret_aliases() {
        let err = Settings::from_env(&vars(&[
            (API_KEY_VAR, "abc"),
            (PRIVATE_KEY_VAR, SECRET),
            (API_SECRET_VAR, "b3RoZXI="),
        ]))
        .unwrap_err();

        assert!(matches!(err, ConfigError::ConflictingSecrets));
    }

    #[test]
    fn test_missing_api_key_reported_despite_conflicting_secrets() {
        let err = Settings::from_env(&vars(&[
            (PRIVATE_KEY_VAR, SECRET),
            (API_SECRET_VAR, "b3RoZXI="),
        ]))
        .unwrap_err();

        match err {
            ConfigError::MissingVariables(missing) => {
                assert_eq!(missing, vec![API_KEY_VAR.to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_identical_secret_aliases_accepted() {
        let settings = Settings::from_env(&vars(&[
            (API_KEY_VAR, "abc"),
            (PRIVATE_KEY_VAR, SECRET),
            (API_SECRET_VAR, SECRET),
        ]));

        assert!(settings.is_ok());
    }

    #[test]
    fn test_secret_must_be_base64() {
        let err = Settings::from_env(&vars(&[(API_KEY_VAR, "abc"), (PRIVATE_KEY_VAR, "%%%")]))
            .unwrap_err();

        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == PRIVATE_KEY_VAR));
    }

    #[test]
    fn test_amount_defaults() {
        let settings =
            Settings::from_env(&vars(&[(API_KEY_VAR, "abc"), (PRIVATE_KEY_VAR, SECRET)])).unwrap();

        assert_eq!(settings.amounts.base, dec!(500));
        assert_eq!(settings.amounts.max, dec!(2000));
        assert_eq!(settings.amounts.min, dec!(100));
        assert!(!settings.dry_run);
    }

    #[test]
    fn test_amount_overrides_and_validation() {
        let settings = Settings::from_env(&vars(&[
            (API_KEY_VAR, "abc"),
            (PRIVATE_KEY_VAR, SECRET),
            (BASE_AMOUNT_VAR, "250.50"),
            (MIN_AMOUNT_VAR, "25"),
        ]))
        .unwrap();
        assert_eq!(settings.amounts.base, dec!(250.50));
        assert_eq!(settings.amounts.min, dec!(25));

        let err = Settings::from_env(&vars(&[
            (API_KEY_VAR, "abc"),
            (PRIVATE_KEY_VAR, SECRET),
            (MAX_AMOUNT_VAR, "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == MAX_AMOUNT_VAR));

        let err = Settings::from_env(&vars(&[
            (API_KEY_VAR, "abc"),
            (PRIVATE_KEY_VAR, SECRET),
            (MIN_AMOUNT_VAR, "3000"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == MIN_AMOUNT_VAR));
    }

    #[test]
    fn test_dry_run_only_for_exact_one() {
        for (value, expected) in [("1", true), ("0", false), ("true", false), ("yes", false)] {
            let settings = Settings::from_env(&vars(&[
                (API_KEY_VAR, "abc"),
                (PRIVATE_KEY_VAR, SECRET),
                (DRY_RUN_VAR, value),
            ]))
            .unwrap();
            assert_eq!(settings.dry_run, expected, "DRY_RUN={value}");
        }
    }

    #[test]
    fn test_debug_redacts_secret() {
        let settings = Settings::from_env(&vars(&[
            (API_KEY_VAR, "abcdefgh"),
            (PRIVATE_KEY_VAR, SECRET),
        ]))
        .unwrap();
        let rendered = format!("{settings:?}");

        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("abcdefgh"));
        assert!(!rendered.contains(SECRET));
    }
}
