use std::{
    env::{self, VarError},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use rust_decimal::Decimal;
use tracing::Level;

use crate::{error::Error, persistence::DEFAULT_NAMESPACE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory for the JSON state file. `None` keeps state in memory.
    pub storage_dir: Option<PathBuf>,
    pub namespace: String,
    pub initial_cash_balance: Decimal,
    pub stage_delay: Duration,
    pub step_timeout: Duration,
    pub diligence_stage_delay: Duration,
    pub catalog_path: Option<PathBuf>,
    pub log_level: Level,
    /// Discard any stored state and reseed from the catalog on startup.
    pub reset_on_start: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            initial_cash_balance: Decimal::from(250_000_000u64),
            stage_delay: Duration::from_millis(1500),
            step_timeout: Duration::from_millis(10_000),
            diligence_stage_delay: Duration::from_millis(800),
            catalog_path: None,
            log_level: Level::INFO,
            reset_on_start: false,
        }
    }
}

pub fn get_configuration() -> Result<Config, Error> {
    from_lookup(|key| env::var(key))
}

/// Build a config from any key lookup; unset keys fall back to defaults.
pub fn from_lookup<F>(lookup: F) -> Result<Config, Error>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let defaults = Config::default();

    let storage_dir = var("LEDGER_STORAGE_DIR", &lookup)?.map(PathBuf::from);
    let namespace = var("LEDGER_NAMESPACE", &lookup)?.unwrap_or(defaults.namespace);
    let initial_cash_balance = match var("INITIAL_CASH_BALANCE", &lookup)? {
        Some(value) => Decimal::from_str(value.trim())?,
        None => defaults.initial_cash_balance,
    };
    if initial_cash_balance < Decimal::ZERO {
        return Err(Error::ConfigurationError(format!(
            "INITIAL_CASH_BALANCE must not be negative, got {initial_cash_balance}"
        )));
    }

    let stage_delay = millis("STAGE_DELAY_MS", &lookup, defaults.stage_delay)?;
    let step_timeout = millis("STEP_TIMEOUT_MS", &lookup, defaults.step_timeout)?;
    let diligence_stage_delay =
        millis("DILIGENCE_STAGE_DELAY_MS", &lookup, defaults.diligence_stage_delay)?;
    let catalog_path = var("CATALOG_PATH", &lookup)?.map(PathBuf::from);
    let log_level = parse_or("LOG_LEVEL", &lookup, defaults.log_level)?;
    let reset_on_start = parse_or("RESET_ON_START", &lookup, defaults.reset_on_start)?;

    Ok(Config {
        storage_dir,
        namespace,
        initial_cash_balance,
        stage_delay,
        step_timeout,
        diligence_stage_delay,
        catalog_path,
        log_level,
        reset_on_start,
    })
}

/// An unset key is `None`; any other lookup failure is an error.
fn var<F>(key: &str, lookup: &F) -> Result<Option<String>, Error>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    match lookup(key) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> Result<T, Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Result<String, VarError>,
{
    match var(key, lookup)? {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| Error::ConfigurationError(format!("{key}: {e}"))),
        None => Ok(default),
    }
}

fn millis<F>(key: &str, lookup: &F, default: Duration) -> Result<Duration, Error>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let ms: u64 = parse_or(key, lookup, default.as_millis() as u64)?;
    Ok(Duration::from_millis(ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Result<String, VarError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned().ok_or(VarError::NotPresent)
    }

    #[test]
    fn defaults_when_unset() {
        let config = from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.initial_cash_balance, dec!(250000000));
    }

    #[test]
    fn overrides() {
        let config = from_lookup(lookup(&[
            ("LEDGER_STORAGE_DIR", "/tmp/ledger"),
            ("INITIAL_CASH_BALANCE", "1000.50"),
            ("STAGE_DELAY_MS", "10"),
            ("LOG_LEVEL", "debug"),
            ("RESET_ON_START", "true"),
        ]))
        .unwrap();
        assert_eq!(config.storage_dir, Some(PathBuf::from("/tmp/ledger")));
        assert_eq!(config.initial_cash_balance, dec!(1000.50));
        assert_eq!(config.stage_delay, Duration::from_millis(10));
        assert_eq!(config.log_level, Level::DEBUG);
        assert!(config.reset_on_start);
    }

    #[test]
    fn malformed_values_are_configuration_errors() {
        assert!(matches!(
            from_lookup(lookup(&[("STEP_TIMEOUT_MS", "soon")])),
            Err(Error::ConfigurationError(_))
        ));
        assert!(matches!(
            from_lookup(lookup(&[("INITIAL_CASH_BALANCE", "-1")])),
            Err(Error::ConfigurationError(_))
        ));
        assert!(matches!(
            from_lookup(lookup(&[("RESET_ON_START", "sometimes")])),
            Err(Error::ConfigurationError(_))
        ));
    }

    #[test]
    fn unparsable_cash_is_a_decimal_error() {
        assert!(matches!(
            from_lookup(lookup(&[("INITIAL_CASH_BALANCE", "a lot")])),
            Err(Error::Decimal(_))
        ));
    }

    #[test]
    fn non_unicode_values_are_var_errors() {
        let config = from_lookup(|key| match key {
            "LEDGER_NAMESPACE" => Err(VarError::NotUnicode("\u{fffd}".into())),
            _ => Err(VarError::NotPresent),
        });
        assert!(matches!(config, Err(Error::Var(VarError::NotUnicode(_)))));
    }
}
