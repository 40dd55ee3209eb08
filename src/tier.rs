//! Tier resolution: maps a fleet tier name to a host list (by shelling out
//! to an external script) and to a log glob pattern (from a static table),
//! grounded on `original_source/bin/hblog.py`'s `list_hosts_of_tier` and its
//! `if logtier.endswith(...)` chain.

use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum TierError {
    #[error("failed to run list_hosts_of_tier.sh: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("unknown tier {0:?}")]
    UnknownTier(String),
    #[error("list_hosts_of_tier.sh exited with status {status} for tier {tier:?}: {stderr}")]
    ExternalError {
        tier: String,
        status: i32,
        stderr: String,
    },
    #[error("could not recognize the application type from tier name {0:?}")]
    NoGlobForTier(String),
}

/// Longest-suffix-wins table mapping a tier's naming convention to the log
/// glob its hosts expose. Entries are ordered longest-suffix-first so a
/// linear scan picks the most specific match.
const TIER_GLOBS: &[(&str, &str)] = &[
    ("-hbase-regionservers", "/var/log/hadoop/*-HBASE/hbase-hadoop-regionserver*"),
    ("-hbase-zookeepers", "/var/log/hadoop/*-HBASE/hbase-hadoop-zookeeper*"),
    ("-hbase-secondary", "/var/log/hadoop/*-HBASE/hbase-hadoop-master*"),
    ("-hbase-thrift", "/var/log/hadoop/*-HBASE/hbase-hadoop-thrift*"),
    ("-hbase-master", "/var/log/hadoop/*-HBASE/hbase-hadoop-master*"),
    ("-dfs-slaves", "/var/log/hadoop/*-DFS/hadoop-hadoop-avatardatanode*"),
    ("-zookeepers", "/var/log/hadoop/*-ZK/hbase-hadoop-zookeeper*"),
    ("-mr-slaves", "/var/log/hadoop/*-MR/hadoop-hadoop-tasktracker*"),
    ("-dfs-nn", "/var/log/hadoop/*-DFS/hadoop-hadoop-avatarnode*"),
    ("-dfs-sn", "/var/log/hadoop/*-DFS/hadoop-hadoop-avatarnode*"),
    ("-mr-jt", "/var/log/hadoop/*-MR/hadoop-hadoop-jobtracker*"),
];

/// Redirects a handful of short-form tier aliases to the canonical suffix
/// before the glob lookup runs. `original_source` has no such table to
/// ground this on; it is a best-effort filled-in detail (see DESIGN.md).
const TIER_ALIASES: &[(&str, &str)] = &[("-zk", "-zookeepers"), ("-nn", "-dfs-nn"), ("-rs", "-hbase-regionservers")];

pub fn resolve_glob(tier: &str) -> Result<&'static str, TierError> {
    let canonical = TIER_ALIASES
        .iter()
        .find(|(alias, _)| tier.ends_with(alias))
        .map(|(alias, canonical)| {
            let prefix = &tier[..tier.len() - alias.len()];
            format!("{prefix}{canonical}")
        });
    let lookup = canonical.as_deref().unwrap_or(tier);

    TIER_GLOBS
        .iter()
        .find(|(suffix, _)| lookup.ends_with(suffix))
        .map(|(_, glob)| *glob)
        .ok_or_else(|| TierError::NoGlobForTier(tier.to_string()))
}

pub async fn list_hosts_of_tier(tier: &str) -> Result<Vec<String>, TierError> {
    let output = Command::new("list_hosts_of_tier.sh")
        .arg(tier)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    match output.status.code() {
        Some(0) => Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()),
        Some(2) => Err(TierError::UnknownTier(tier.to_string())),
        other => Err(TierError::ExternalError {
            tier: tier.to_string(),
            status: other.unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }),
    }
}
