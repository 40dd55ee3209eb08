//! Component F: runs one round of requests against every still-live host,
//! folding results through a channel the way the teacher's
//! `parent::runner::spawn_collector_tasks` fans work out across
//! `tokio::spawn` tasks and reduces it through an `mpsc` channel — but one
//! round at a time rather than a long-lived polling loop, since there is no
//! persistent daemon here to keep draining.

use crate::client::http::AgentClient;
use crate::model::{Envelope, Level, LogRecord, Summary, UniversalOffset};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Summary,
    Details,
    Follow,
}

impl Mode {
    fn path(self) -> &'static str {
        match self {
            Mode::Summary => "/log/summary",
            Mode::Details | Mode::Follow => "/log/stream",
        }
    }
}

/// The filter/time parameters that are the same for every host in a round.
#[derive(Debug, Clone, Default)]
pub struct RoundRequest {
    pub sampling_rate: Option<f64>,
    pub levels: Vec<Level>,
    pub fp: Vec<String>,
    pub fp_exclude: Vec<String>,
    pub re: Vec<String>,
    pub re_exclude: Vec<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Error)]
pub enum FanoutError {
    #[error("empty host list")]
    EmptyHostList,
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

pub struct RoundOutcome {
    pub records: Vec<LogRecord>,
    /// One entry per host that answered in Summary mode, keeping the host
    /// identity so `render_summary` can build the host×fingerprint matrix
    /// alongside the folded global table.
    pub summaries: Vec<(String, Summary)>,
    pub all_hosts_blacklisted: bool,
    /// The BLACKL02 message for this round, set whenever every host in this
    /// session just became blacklisted. Mode-independent: the original stops
    /// its ioloop and prints this instead of a details/summary render, so
    /// callers should print it unconditionally and skip the per-mode render
    /// for a round where this is `Some`.
    pub blacklisted_message: Option<String>,
}

/// State described in spec.md §4.F: a frozen `initial_hosts`, a shrinking
/// working set, and a per-host universal-offset carried across rounds for
/// follow mode.
#[derive(Debug)]
pub struct FanoutClient {
    initial_hosts: Vec<String>,
    targets: Vec<(String, String)>,
    blacklisted: Vec<String>,
    client: AgentClient,
    mode: Mode,
    request: RoundRequest,
    universal_offsets: HashMap<String, UniversalOffset>,
}

impl FanoutClient {
    pub fn new(
        targets: Vec<(String, String)>,
        mode: Mode,
        request: RoundRequest,
    ) -> Result<Self, FanoutError> {
        if targets.is_empty() {
            return Err(FanoutError::EmptyHostList);
        }
        Ok(FanoutClient {
            initial_hosts: targets.iter().map(|(h, _)| h.clone()).collect(),
            targets,
            blacklisted: Vec::new(),
            client: AgentClient::new()?,
            mode,
            request,
            universal_offsets: HashMap::new(),
        })
    }

    pub fn initial_hosts(&self) -> &[String] {
        &self.initial_hosts
    }

    pub fn blacklisted_hosts(&self) -> &[String] {
        &self.blacklisted
    }

    pub fn has_live_hosts(&self) -> bool {
        !self.targets.is_empty()
    }

    fn blacklist(&mut self, host: &str) {
        if self.targets.iter().any(|(h, _)| h == host) {
            self.targets.retain(|(h, _)| h != host);
            self.blacklisted.push(host.to_string());
        }
    }

    fn build_params(&self, glob: &str, host: &str) -> Vec<(String, String)> {
        let mut params = vec![("glob".to_string(), glob.to_string())];
        params.push((
            "sampling-rate".to_string(),
            self.request
                .sampling_rate
                .map(|r| r.to_string())
                .unwrap_or_else(|| "None".to_string()),
        ));
        if !self.request.levels.is_empty() {
            params.push((
                "levels-list".to_string(),
                self.request
                    .levels
                    .iter()
                    .map(|l| l.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
            ));
        }
        if !self.request.fp.is_empty() {
            params.push(("fp".to_string(), self.request.fp.join(",")));
        }
        if !self.request.fp_exclude.is_empty() {
            params.push(("fp-exclude".to_string(), self.request.fp_exclude.join(",")));
        }
        if !self.request.re.is_empty() {
            params.push(("re".to_string(), self.request.re.join(",")));
        }
        if !self.request.re_exclude.is_empty() {
            params.push(("re-exclude".to_string(), self.request.re_exclude.join(",")));
        }
        match self.universal_offsets.get(host) {
            Some(uo) => params.push(("universal-offset".to_string(), uo.to_string())),
            None => {
                if let Some(start) = &self.request.start {
                    params.push(("start".to_string(), start.clone()));
                }
                if let Some(end) = &self.request.end {
                    params.push(("end".to_string(), end.clone()));
                }
            }
        }
        params
    }

    /// Run one round: issue a request to every live host concurrently,
    /// reduce results through a channel, blacklist hosts on transport
    /// failure or a missing exit-status record.
    pub async fn run_round(&mut self) -> RoundOutcome {
        let started = self.targets.len();
        let (tx, mut rx) = mpsc::channel(started.max(1));

        for (host, glob) in self.targets.clone() {
            let tx = tx.clone();
            let client = self.client.clone();
            let path = self.mode.path();
            let params = self.build_params(&glob, &host);
            tokio::spawn(async move {
                let result = client.fetch(&host, path, &params).await;
                let _ = tx.send((host, result)).await;
            });
        }
        drop(tx);

        let mut finished = 0;
        let mut records = Vec::new();
        let mut summaries = Vec::new();
        let mut failed_hosts = Vec::new();

        while let Some((host, result)) = rx.recv().await {
            finished += 1;
            match result {
                Ok(envelopes) => {
                    let mut saw_exit_status = false;
                    for env in envelopes {
                        match env {
                            Envelope::LogAccessorLine(value) => match self.mode {
                                Mode::Summary => {
                                    if let Ok(s) = serde_json::from_value::<Summary>(value) {
                                        summaries.push((host.clone(), s));
                                    }
                                }
                                Mode::Details | Mode::Follow => {
                                    if let Ok(mut rec) = serde_json::from_value::<LogRecord>(value) {
                                        rec.host = Some(host.clone());
                                        records.push(rec);
                                    }
                                }
                            },
                            Envelope::ExitStatus(status) => {
                                saw_exit_status = true;
                                if let Some(uo) = status.universal_offset {
                                    self.universal_offsets.insert(host.clone(), uo);
                                }
                            }
                        }
                    }
                    if !saw_exit_status {
                        warn!(host = %host, "response closed without an exit-status record");
                        failed_hosts.push(host);
                    }
                }
                Err(e) => {
                    warn!(host = %host, error = %e, "blacklisting host after transport failure");
                    failed_hosts.push(host);
                }
            }
            if finished >= started {
                break;
            }
        }

        for host in &failed_hosts {
            self.blacklist(host);
        }

        if self.targets.is_empty() {
            return RoundOutcome {
                records,
                summaries,
                all_hosts_blacklisted: true,
                blacklisted_message: Some(blackl02_message(&self.blacklisted)),
            };
        }

        RoundOutcome {
            records,
            summaries,
            all_hosts_blacklisted: false,
            blacklisted_message: None,
        }
    }
}

fn blackl02_message(blacklisted: &[String]) -> String {
    format!(
        "BLACKL02 ERROR - All {} hosts got blacklisted: {}",
        blacklisted.len(),
        blacklisted.join(", ")
    )
}
