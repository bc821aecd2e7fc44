// ABOUTME: Shared command context and output helpers for kubedev subcommands
// ABOUTME: Commands print colored text by default and JSON with --json

pub mod exec;
pub mod sandbox;

use anyhow::Result;
use kubedev_sandbox::SandboxService;
use serde::Serialize;

pub struct Context {
    pub service: SandboxService,
    pub namespace: Option<String>,
    pub json: bool,
}

impl Context {
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Print `value` as JSON when requested, otherwise run `human`.
    pub fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human(value);
        }
        Ok(())
    }
}

/// Parse a `KEY=VALUE` argument.
pub fn parse_env_pair(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing variable name in '{}'", raw));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("A=1", Some(("A", "1")))]
    #[case("URL=http://x?a=b", Some(("URL", "http://x?a=b")))]
    #[case("EMPTY=", Some(("EMPTY", "")))]
    #[case("novalue", None)]
    #[case("=1", None)]
    fn test_parse_env_pair(#[case] raw: &str, #[case] expected: Option<(&str, &str)>) {
        let parsed = parse_env_pair(raw).ok();
        let expected = expected.map(|(k, v)| (k.to_string(), v.to_string()));
        assert_eq!(parsed, expected);
    }
}
