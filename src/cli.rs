//! Client command-line surface, built with `clap` derive the way the
//! teacher's `main.rs` builds its `Cli`/`Commands` structs, covering the flag
//! set `original_source/bin/hblog.py`'s `OptionParser` registers.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "hblog")]
#[command(about = "Fan out to a fleet of hblog agents and merge their log output", long_about = None)]
pub struct Cli {
    /// Print one aggregated fingerprint/count table instead of a detail stream.
    #[arg(long, conflicts_with_all = ["details", "follow"])]
    pub summary: bool,

    /// Print every matching record, globally sorted by timestamp.
    #[arg(long, conflicts_with_all = ["summary", "follow"])]
    pub details: bool,

    /// Keep polling every host, carrying each host's cursor forward.
    #[arg(long, conflicts_with_all = ["summary", "details"])]
    pub follow: bool,

    /// Only consider records at or after this time (`YYYY-MM-DD HH:MM:SS`).
    #[arg(long)]
    pub start: Option<String>,

    /// Stop considering records at or after this time.
    #[arg(long)]
    pub end: Option<String>,

    /// Shorthand for `--start` expressed as a duration before now, e.g. `1h`, `30m`.
    #[arg(long, conflicts_with = "start")]
    pub tail: Option<String>,

    /// Shorthand for `--end` expressed as a duration before now.
    #[arg(long, conflicts_with = "end")]
    pub tail_end: Option<String>,

    /// Minimum level to report; every level at or above it is included.
    #[arg(long)]
    pub level: Option<String>,

    /// Fraction of unmatched records to keep (0.0-1.0); recognized records
    /// that also match --fp are always kept.
    #[arg(long)]
    pub sample: Option<f64>,

    /// Only emit records whose fingerprint is in this comma-separated list.
    #[arg(long, value_delimiter = ',')]
    pub fp: Vec<String>,

    /// Drop records whose fingerprint is in this comma-separated list.
    #[arg(long = "fp-exclude", value_delimiter = ',')]
    pub fp_exclude: Vec<String>,

    /// Only emit records whose text matches one of these regexes (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub re: Vec<String>,

    /// Drop records whose text matches one of these regexes (comma-separated).
    #[arg(long = "re-exclude", value_delimiter = ',')]
    pub re_exclude: Vec<String>,

    /// Disable line wrapping in the rendered output (presentation only).
    #[arg(long)]
    pub nowrap: bool,

    /// Print extra diagnostic detail about what each agent is doing.
    #[arg(long)]
    pub verbose: bool,

    /// Explicit path to a JSON config file, overriding $HOME/.hblogrc.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// TIER or TIER:host,host,... arguments naming the fleet to query.
    #[arg(required = true)]
    pub tiers: Vec<String>,
}

/// One positional `TIER[:host,host,...]` argument, split into the tier name
/// used for glob resolution and an optional explicit host override that
/// bypasses `list_hosts_of_tier.sh`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierSpec {
    pub tier: String,
    pub hosts: Option<Vec<String>>,
}

pub fn parse_tier_spec(arg: &str) -> TierSpec {
    match arg.split_once(':') {
        Some((tier, hosts)) if !hosts.is_empty() => TierSpec {
            tier: tier.to_string(),
            hosts: Some(hosts.split(',').map(str::to_string).collect()),
        },
        _ => TierSpec {
            tier: arg.to_string(),
            hosts: None,
        },
    }
}

impl Cli {
    pub fn mode(&self) -> crate::client::Mode {
        if self.summary {
            crate::client::Mode::Summary
        } else if self.follow {
            crate::client::Mode::Follow
        } else {
            crate::client::Mode::Details
        }
    }

    pub fn tier_specs(&self) -> Vec<TierSpec> {
        self.tiers.iter().map(|t| parse_tier_spec(t)).collect()
    }
}
