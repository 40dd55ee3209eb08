//! Handlers for the three routes `original_source/sbin/hblogd.py` exposes,
//! plus an ambient `/healthz`.

use crate::filter::{compile_pattern, Decision, FilterRequest};
use crate::model::{Envelope, ExitStatus, Level, LogRecord, Summary, UniversalOffset};
use crate::source::multi::{MultiFileError, MultiFileReader};
use axum::extract::Query;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum AgentApiError {
    #[error("missing required query parameter {0:?}")]
    MissingParam(&'static str),
    #[error("invalid value for query parameter {0:?}")]
    BadParam(&'static str),
    #[error("reader task panicked")]
    TaskPanicked,
}

impl IntoResponse for AgentApiError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

struct ParsedRequest {
    glob: String,
    sampling_rate: Option<f64>,
    universal_offset: Option<UniversalOffset>,
    start_time: Option<String>,
    filter: FilterRequest,
}

fn multivalued(params: &HashMap<String, String>, key: &str) -> Vec<String> {
    params
        .get(key)
        .map(|v| v.split(',').map(|s| s.to_string()).collect())
        .unwrap_or_default()
}

fn singleton(params: &HashMap<String, String>, key: &str) -> Option<String> {
    params.get(key).and_then(|v| v.split(',').next()).map(str::to_string)
}

fn parse_request(params: &HashMap<String, String>) -> Result<ParsedRequest, AgentApiError> {
    let glob = params
        .get("glob")
        .cloned()
        .ok_or(AgentApiError::MissingParam("glob"))?;

    let sampling_rate = match singleton(params, "sampling-rate") {
        None => None,
        Some(s) if s == "None" => None,
        Some(s) => Some(s.parse::<f64>().map_err(|_| AgentApiError::BadParam("sampling-rate"))?),
    };

    let universal_offset = match params.get("universal-offset") {
        Some(raw) => Some(
            UniversalOffset::from_str(raw).map_err(|_| AgentApiError::BadParam("universal-offset"))?,
        ),
        None => None,
    };

    let levels = multivalued(params, "levels-list")
        .into_iter()
        .filter_map(|s| s.parse::<Level>().ok())
        .collect();

    let re_include = multivalued(params, "re")
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(|p| compile_pattern(&p))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| AgentApiError::BadParam("re"))?;
    let re_exclude = multivalued(params, "re-exclude")
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(|p| compile_pattern(&p))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| AgentApiError::BadParam("re-exclude"))?;

    let end_time = singleton(params, "end");
    let start_time = singleton(params, "start");

    Ok(ParsedRequest {
        glob,
        sampling_rate,
        filter: FilterRequest {
            levels,
            fp: multivalued(params, "fp"),
            fp_exclude: multivalued(params, "fp-exclude"),
            re_include,
            re_exclude,
            end_time,
            has_universal_offset: universal_offset.is_some(),
        },
        universal_offset,
        start_time,
    })
}

/// Open the glob, seek, and collect every record the filter chain keeps.
/// Blocking: run on a `spawn_blocking` task.
fn fetch_records(
    req: ParsedRequest,
    max_klines: u64,
) -> Result<(Vec<LogRecord>, Option<UniversalOffset>), MultiFileError> {
    let mut reader = MultiFileReader::open(&req.glob, max_klines, req.sampling_rate, false, false)?;

    if let Some(uo) = &req.universal_offset {
        reader.seek_offset(uo)?;
    } else if let Some(start) = &req.start_time {
        let seek_ts = start.split('.').next().unwrap_or(start);
        reader.seek_time(seek_ts)?;
    }

    let mut out = Vec::new();
    while let Some(rec) = reader.next()? {
        match req.filter.apply(&rec) {
            Decision::Emit => out.push(rec),
            Decision::Drop => {}
            Decision::Stop => break,
        }
    }
    let cursor = reader.universal_offset().cloned();
    reader.close();
    Ok((out, cursor))
}

fn envelope_line(env: &Envelope) -> String {
    let mut s = serde_json::to_string(env).expect("Envelope always serializes");
    s.push('\n');
    s
}

pub async fn index() -> Html<&'static str> {
    Html(
        "<pre>\nExamples:\n\
         <a href=\"/log/stream\">/log/stream</a>\n\
         <a href=\"/log/summary\">/log/summary</a>\n\
         </pre>\n",
    )
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn log_stream(
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, AgentApiError> {
    let parsed = parse_request(&params)?;
    let max_klines = if parsed.universal_offset.is_some() { 3 } else { 20_000 };
    let glob = parsed.glob.clone();

    let result = tokio::task::spawn_blocking(move || fetch_records(parsed, max_klines))
        .await
        .map_err(|_| AgentApiError::TaskPanicked)?;

    let mut body = String::new();
    match result {
        Ok((records, cursor)) => {
            for rec in &records {
                let value = serde_json::to_value(rec).expect("LogRecord always serializes");
                body.push_str(&envelope_line(&Envelope::LogAccessorLine(value)));
            }
            body.push_str(&envelope_line(&Envelope::ExitStatus(ExitStatus::success(cursor))));
        }
        Err(e) => {
            warn!("log/stream failed for glob {glob:?}: {e}");
            // No exit-status record: the client treats its absence as an error.
        }
    }

    Ok(([(header::CONTENT_TYPE, "text/plain")], body).into_response())
}

pub async fn log_summary(
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, AgentApiError> {
    let parsed = parse_request(&params)?;
    let glob = parsed.glob.clone();

    let result = tokio::task::spawn_blocking(move || fetch_records(parsed, 20_000))
        .await
        .map_err(|_| AgentApiError::TaskPanicked)?;

    let mut body = String::new();
    match result {
        Ok((records, _cursor)) => {
            let mut summary = Summary::empty();
            for rec in &records {
                summary.record(rec);
            }
            let value = serde_json::to_value(&summary).expect("Summary always serializes");
            body.push_str(&envelope_line(&Envelope::LogAccessorLine(value)));
            body.push_str(&envelope_line(&Envelope::ExitStatus(ExitStatus::success(None))));
        }
        Err(e) => {
            warn!("log/summary failed for glob {glob:?}: {e}");
        }
    }

    Ok(([(header::CONTENT_TYPE, "text/plain")], body).into_response())
}
