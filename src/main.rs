use clap::Parser;
use hblog::cli::Cli;
use hblog::client::{FanoutClient, Mode, RoundRequest};
use hblog::model::Level;
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// `hblog agent`: the per-host HTTP server read by the fan-out client.
/// Kept as a hidden subcommand rather than a separate binary so the fleet
/// only has one artifact to deploy, the way the teacher ships one `noil`
/// binary that dispatches on its first subcommand.
#[derive(Parser, Debug)]
struct AgentArgs {
    #[arg(long, default_value = "0.0.0.0:6957")]
    listen: SocketAddr,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hblog=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let mut raw_args: Vec<String> = std::env::args().collect();
    if raw_args.get(1).map(String::as_str) == Some("agent") {
        raw_args.remove(1);
        let agent_args = AgentArgs::parse_from(raw_args);
        if let Err(e) = hblog::agent::run_agent(agent_args.listen).await {
            tracing::error!("ERROR: {e}");
            std::process::exit(1);
        }
        return;
    }

    let cli = Cli::parse();
    match run_client(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::error!("ERROR: {e}");
            std::process::exit(1);
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum ClientError {
    #[error("invalid --level {0:?}")]
    InvalidLevel(String),
    #[error("invalid duration {0:?} for --tail/--tail-end (expected e.g. \"1h\", \"30m\")")]
    InvalidDuration(String),
    #[error(transparent)]
    Config(#[from] hblog::config::ConfigError),
    #[error("failed to resolve tier {tier:?}: {source}")]
    Tier {
        tier: String,
        #[source]
        source: hblog::tier::TierError,
    },
    #[error(transparent)]
    Fanout(#[from] hblog::client::FanoutError),
}

/// Runs one fan-out invocation and returns the process exit code.
async fn run_client(mut cli: Cli) -> Result<i32, ClientError> {
    if let Some(path) = hblog::config::resolve_config_path(cli.config.as_deref()) {
        let config = hblog::config::load_config(&path)?;
        config.merge_into(&mut cli);
    }

    let levels = match &cli.level {
        Some(raw) => levels_at_or_above(raw)?,
        None => Level::ORDER.to_vec(),
    };
    let start = match &cli.tail {
        Some(d) => Some(time_before_now(d)?),
        None => cli.start.clone(),
    };
    let end = match &cli.tail_end {
        Some(d) => Some(time_before_now(d)?),
        None => cli.end.clone(),
    };

    let mut targets = Vec::new();
    for spec in cli.tier_specs() {
        let glob = hblog::tier::resolve_glob(&spec.tier).map_err(|source| ClientError::Tier {
            tier: spec.tier.clone(),
            source,
        })?;
        let hosts = match spec.hosts {
            Some(hosts) => hosts,
            None => hblog::tier::list_hosts_of_tier(&spec.tier)
                .await
                .map_err(|source| ClientError::Tier {
                    tier: spec.tier.clone(),
                    source,
                })?,
        };
        for host in hosts {
            targets.push((host, glob.to_string()));
        }
    }

    let mode = cli.mode();
    let request = RoundRequest {
        sampling_rate: cli.sample,
        levels,
        fp: cli.fp.clone(),
        fp_exclude: cli.fp_exclude.clone(),
        re: cli.re.clone(),
        re_exclude: cli.re_exclude.clone(),
        start,
        end,
    };
    let mut fanout = FanoutClient::new(targets, mode, request)?;

    loop {
        let outcome = fanout.run_round().await;
        match &outcome.blacklisted_message {
            Some(msg) => eprintln!("{msg}"),
            None => match mode {
                Mode::Summary => print!("{}", hblog::client::report::render_summary(&outcome.summaries)),
                Mode::Details | Mode::Follow => {
                    print!("{}", hblog::client::report::render_details(&outcome.records))
                }
            },
        }
        if let Some(report) =
            hblog::client::report::render_blacklist_report(fanout.initial_hosts(), fanout.blacklisted_hosts())
        {
            eprint!("{report}");
        }

        if mode != Mode::Follow || outcome.all_hosts_blacklisted || !fanout.has_live_hosts() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    Ok(0)
}

fn levels_at_or_above(raw: &str) -> Result<Vec<Level>, ClientError> {
    let min: Level = raw.parse().map_err(|_| ClientError::InvalidLevel(raw.to_string()))?;
    Ok(Level::ORDER.iter().copied().filter(|l| l.rank() >= min.rank()).collect())
}

/// Parses a `--tail`/`--tail-end` duration like `1h`, `30m`, `2d` and renders
/// "now minus that duration" in the wire timestamp format.
fn time_before_now(raw: &str) -> Result<String, ClientError> {
    if raw.is_empty() {
        return Err(ClientError::InvalidDuration(raw.to_string()));
    }
    let (digits, unit) = raw.split_at(raw.len() - 1);
    let amount: i64 = digits.parse().map_err(|_| ClientError::InvalidDuration(raw.to_string()))?;
    let seconds = match unit {
        "s" => amount,
        "m" => amount * 60,
        "h" => amount * 3600,
        "d" => amount * 86400,
        "w" => amount * 604800,
        _ => return Err(ClientError::InvalidDuration(raw.to_string())),
    };
    let when = chrono::Local::now().naive_local() - chrono::Duration::seconds(seconds);
    Ok(hblog::source::timestamp::format_ts(&when))
}
