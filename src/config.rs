//! Configuration handling for the Tether driver including loading and defaults.

use anyhow::{Context, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tether_core::{Rewrite, VmConfig};

/// Default configuration file inside `<config_dir>/tether/`.
const CONFIG_FILE: &str = "config.toml";

/// Driver configuration loaded from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Limits handed to every VM the driver creates.
    pub vm: VmConfig,
    /// Token substitutions applied before parsing.
    pub rewrites: Vec<RewriteRule>,
}

/// One `[[rewrites]]` table: tokens spelled `from` are parsed as `to`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RewriteRule {
    pub from: String,
    pub to: String,
}

impl Config {
    /// Load `explicit` if given, else the per-user file when it exists, else
    /// defaults. Only an explicit path is required to exist.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::read(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::read(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tether").join(CONFIG_FILE))
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("parsing configuration")
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading configuration from {}", path.display()))?;
        toml::from_str(&data).with_context(|| format!("parsing configuration {}", path.display()))
    }

    /// Scan every rule into a scanner rewrite.
    pub fn rewrites(&self) -> anyhow::Result<Vec<Rewrite>> {
        self.rewrites
            .iter()
            .map(|rule| {
                Rewrite::new(&rule.from, &rule.to).ok_or_else(|| {
                    anyhow!("rewrite '{}' -> '{}' does not name two tokens", rule.from, rule.to)
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_yields_defaults() {
        let config = Config::from_toml("").expect("parses");
        assert_eq!(config.vm, VmConfig::default());
        assert!(config.rewrites.is_empty());
    }

    #[test]
    fn reads_limits_and_rewrites() {
        let config = Config::from_toml(
            r#"
            [vm]
            stack_max = 64
            trace = true

            [[rewrites]]
            from = "show"
            to = "print"
            "#,
        )
        .expect("parses");
        assert_eq!(config.vm.stack_max, 64);
        assert_eq!(config.vm.arena_capacity, tether_core::config::ARENA_CAPACITY);
        assert!(config.vm.trace);
        assert_eq!(
            config.rewrites,
            vec![RewriteRule {
                from: "show".into(),
                to: "print".into()
            }]
        );
        assert_eq!(config.rewrites().expect("valid").len(), 1);
    }

    #[test]
    fn invalid_rewrite_is_an_error() {
        let config = Config {
            rewrites: vec![RewriteRule {
                from: "@".into(),
                to: "print".into(),
            }],
            ..Config::default()
        };
        assert!(config.rewrites().is_err());
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent.toml");
        assert!(Config::load(Some(&missing)).is_err());

        let present = dir.path().join("tether.toml");
        let mut file = fs::File::create(&present).expect("create");
        writeln!(file, "[vm]\narena_capacity = 8").expect("write");
        let config = Config::load(Some(&present)).expect("loads");
        assert_eq!(config.vm.arena_capacity, 8);
    }
}
