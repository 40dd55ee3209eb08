//! `$HOME/.hblogrc` JSON config loading, the same "explicit path wins, else
//! walk default locations" shape as the teacher's
//! `config::resolve_config_path`, adapted from YAML/`~/.config/noil/` to
//! JSON/`$HOME/.hblogrc`. CLI flags always win over whatever this loads.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Every field is optional: a config file supplies defaults, and only the
/// fields actually present override a flag's built-in default.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub level: Option<String>,
    pub sample: Option<f64>,
    pub fp: Option<Vec<String>>,
    pub fp_exclude: Option<Vec<String>>,
    pub re: Option<Vec<String>>,
    pub re_exclude: Option<Vec<String>>,
    pub nowrap: Option<bool>,
    pub verbose: Option<bool>,
}

/// Resolves the config path: an explicit path always wins; otherwise
/// `$HOME/.hblogrc` if it exists.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let home = dirs::home_dir()?;
    let default_path = home.join(".hblogrc");
    default_path.exists().then_some(default_path)
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Fills in any of `cli`'s option-like fields that were left unset, from the
/// config. CLI wins on every field where both are present.
impl Config {
    pub fn merge_into(&self, cli: &mut crate::cli::Cli) {
        if cli.level.is_none() {
            cli.level = self.level.clone();
        }
        if cli.sample.is_none() {
            cli.sample = self.sample;
        }
        if cli.fp.is_empty() {
            if let Some(fp) = &self.fp {
                cli.fp = fp.clone();
            }
        }
        if cli.fp_exclude.is_empty() {
            if let Some(fp_exclude) = &self.fp_exclude {
                cli.fp_exclude = fp_exclude.clone();
            }
        }
        if cli.re.is_empty() {
            if let Some(re) = &self.re {
                cli.re = re.clone();
            }
        }
        if cli.re_exclude.is_empty() {
            if let Some(re_exclude) = &self.re_exclude {
                cli.re_exclude = re_exclude.clone();
            }
        }
        if !cli.nowrap {
            cli.nowrap = self.nowrap.unwrap_or(false);
        }
        if !cli.verbose {
            cli.verbose = self.verbose.unwrap_or(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn resolve_config_path_prefers_an_explicit_path_even_if_it_does_not_exist() {
        let explicit = PathBuf::from("/nonexistent/explicit.json");
        assert_eq!(resolve_config_path(Some(&explicit)), Some(explicit));
    }

    #[test]
    fn load_config_parses_a_minimal_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".hblogrc");
        std::fs::write(&path, r#"{"level": "WARN", "sample": 0.1}"#).unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.level.as_deref(), Some("WARN"));
        assert_eq!(cfg.sample, Some(0.1));
    }

    #[test]
    fn load_config_reports_a_parse_error_on_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".hblogrc");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn merge_into_only_fills_unset_fields() {
        let cfg = Config {
            level: Some("WARN".to_string()),
            fp: Some(vec!["aaaa1111".to_string()]),
            ..Default::default()
        };
        let mut cli = crate::cli::Cli::parse_from(["hblog", "--level", "ERROR", "cluster1-dfs-nn"]);
        cfg.merge_into(&mut cli);
        assert_eq!(cli.level.as_deref(), Some("ERROR"));
        assert_eq!(cli.fp, vec!["aaaa1111".to_string()]);
    }
}
