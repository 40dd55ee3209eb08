//! Thin reqwest wrapper around one agent's three routes, grounded on the
//! teacher's `parent::collector_client::CollectorClient` (client struct
//! shape, `thiserror`-derived error enum) but adapted to NDJSON envelope
//! parsing instead of single-shot JSON responses.

use crate::model::Envelope;
use std::time::Duration;
use thiserror::Error;

const AGENT_PORT: u16 = 6957;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum AgentClientError {
    #[error("request to {host} failed: {source}")]
    Request {
        host: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{host} returned HTTP {status}")]
    Status { host: String, status: u16 },
    #[error("failed to parse line {line} of the response from {host}: {source}")]
    Envelope {
        host: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone, Debug)]
pub struct AgentClient {
    client: reqwest::Client,
    port: u16,
}

impl AgentClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_port(AGENT_PORT)
    }

    pub fn with_port(port: u16) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(AgentClient { client, port })
    }

    /// GET `path` on `host`, parsing the NDJSON response into envelopes.
    /// The agent never retries and neither does this method — retry only
    /// happens at the fan-out round level, via blacklisting and follow-up
    /// rounds.
    pub async fn fetch(
        &self,
        host: &str,
        path: &str,
        params: &[(String, String)],
    ) -> Result<Vec<Envelope>, AgentClientError> {
        let url = format!("http://{host}:{}{path}", self.port);
        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|source| AgentClientError::Request {
                host: host.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(AgentClientError::Status {
                host: host.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| AgentClientError::Request {
                host: host.to_string(),
                source,
            })?;

        body.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|source| AgentClientError::Envelope {
                    host: host.to_string(),
                    line: i + 1,
                    source,
                })
            })
            .collect()
    }
}
