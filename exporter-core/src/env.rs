//! convenience fns for parsing env vars
use anyhow::Context;

use std::{env, str};

/// Returns the value of the environment variable with the given key. If it
/// doesn't exist, returns `default` Casts the value to the type of `default`
/// # Examples
/// ```
/// # use std::io;
/// let val: String = exporter_core::env::parse_var("KEA_EXPORTER_DOC_KEY", "default_value").unwrap();
/// assert_eq!(val, "default_value");
/// # Ok::<(), io::Error>(())
/// ```
pub fn parse_var<T, S>(name: &str, default: S) -> Result<T, <T as str::FromStr>::Err>
where
    T: str::FromStr,
    S: ToString,
{
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse::<T>()
}

/// Calls [`parse_var`] but gives a default error message with the environment
/// variable name in it
///
/// [`parse_var`]: crate::env::parse_var
pub fn parse_var_with_err<T, S>(name: &str, default: S) -> anyhow::Result<T>
where
    T: str::FromStr,
    <T as str::FromStr>::Err: std::error::Error + Send + Sync + 'static,
    S: ToString + Send,
{
    parse_var::<T, S>(name, default).with_context(|| format!("error parsing env var {name}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_used_when_unset() {
        let val: u16 = parse_var("KEA_EXPORTER_TEST_UNSET_PORT", 9547).unwrap();
        assert_eq!(val, 9547);
        let err = parse_var_with_err::<u16, _>("KEA_EXPORTER_TEST_UNSET_PORT", "nope").unwrap_err();
        assert!(err.to_string().contains("KEA_EXPORTER_TEST_UNSET_PORT"));
    }
}
