//! `dispatch` command implementation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bytes::Bytes;
use contracts::{Protocol, Request, Response};
use dispatcher::{DispatchContext, DispatchError, DispatchOutput};
use observability::{DispatchSample, DispatchStatsAggregator, DispatchStatus};
use protocols::{HttpRequest, RpcRequest};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::DispatchArgs;
use crate::error::{self, CliError};

/// One dispatch result for JSON output
#[derive(Serialize)]
struct DispatchReport {
    ok: bool,
    protocol: String,
    status: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    backend: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    latency_ms: f64,
}

impl DispatchReport {
    fn new(protocol: Protocol, output: &DispatchOutput, latency_ms: f64) -> Self {
        match output {
            Ok(response) => Self {
                ok: response.is_success(),
                protocol: protocol.to_string(),
                status: response.status_code(),
                backend: Some(response.backend_name()),
                payload: Some(String::from_utf8_lossy(response.payload()).into_owned()),
                error: None,
                latency_ms,
            },
            Err(e) => Self {
                ok: false,
                protocol: protocol.to_string(),
                status: e.status_code(),
                backend: None,
                payload: None,
                error: Some(e.to_string()),
                latency_ms,
            },
        }
    }

    fn sample(&self, output: &DispatchOutput) -> DispatchSample {
        let status = match output {
            Ok(_) => DispatchStatus::Success,
            Err(DispatchError::ServiceUnavailable { .. }) => DispatchStatus::Unavailable,
            Err(DispatchError::Cancelled { .. }) => DispatchStatus::Cancelled,
            Err(_) => DispatchStatus::Error,
        };
        DispatchSample {
            status,
            backend: self.backend.clone(),
            latency_ms: self.latency_ms,
        }
    }
}

/// Execute the `dispatch` command
pub async fn run_dispatch(args: &DispatchArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }
    if args.repeat == 0 {
        return Err(CliError::InvalidRepeat.into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let dispatcher =
        dispatcher::create_dispatcher(&blueprint).context("Failed to build dispatcher")?;

    let protocol = blueprint.router.protocol;
    let payload = load_payload(args)?;
    let headers = parse_headers(&args.headers)?;
    let request = build_request(protocol, payload, &headers);

    info!(
        router = %dispatcher.id(),
        protocol = %protocol,
        routes = dispatcher.routes().len(),
        strategy = dispatcher.strategy_name(),
        repeat = args.repeat,
        "Dispatching"
    );

    let mut stats = DispatchStatsAggregator::new();
    let mut last_error = None;

    for _ in 0..args.repeat {
        let ctx = match args.deadline_ms {
            0 => DispatchContext::new(),
            ms => DispatchContext::with_timeout(Duration::from_millis(ms)),
        };

        let started = Instant::now();
        let result = dispatcher.dispatch(&ctx, Arc::clone(&request));
        let recv = result.recv();
        tokio::pin!(recv);

        let mut interrupted = false;
        let output = tokio::select! {
            output = &mut recv => output,
            _ = tokio::signal::ctrl_c() => {
                warn!("Received Ctrl+C, cancelling dispatch");
                interrupted = true;
                ctx.cancel();
                recv.await
            }
        };

        let report = DispatchReport::new(protocol, &output, started.elapsed().as_secs_f64() * 1000.0);
        stats.update(&report.sample(&output));
        print_report(&report, args.json)?;

        if let Err(e) = output {
            last_error = Some(e);
        }
        if interrupted {
            break;
        }
    }

    if args.repeat > 1 {
        if args.json {
            eprintln!("{}", stats.summary());
        } else {
            println!("\n{}", stats.summary());
        }
        return Ok(());
    }

    match last_error {
        Some(e) => Err(e).context("Dispatch failed"),
        None => Ok(()),
    }
}

/// Payload from `--data`, `--data-file`, or empty
fn load_payload(args: &DispatchArgs) -> error::Result<Bytes> {
    if let Some(data) = &args.data {
        return Ok(Bytes::from(data.clone()));
    }
    match &args.data_file {
        Some(path) => Ok(Bytes::from(std::fs::read(path)?)),
        None => Ok(Bytes::new()),
    }
}

/// Parse repeated `KEY=VALUE` arguments
fn parse_headers(raw: &[String]) -> error::Result<Vec<(String, String)>> {
    raw.iter()
        .map(|h| match h.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(CliError::invalid_header(h)),
        })
        .collect()
}

fn build_request(protocol: Protocol, payload: Bytes, headers: &[(String, String)]) -> Arc<dyn Request> {
    match protocol {
        Protocol::Http => {
            let request = headers
                .iter()
                .fold(HttpRequest::post(payload), |r, (k, v)| r.with_header(k, v.as_str()));
            Arc::new(request)
        }
        Protocol::Rpc => {
            let request = headers
                .iter()
                .fold(RpcRequest::new(payload), |r, (k, v)| r.with_metadata(k, v.as_str()));
            Arc::new(request)
        }
    }
}

fn print_report(report: &DispatchReport, json: bool) -> Result<()> {
    if json {
        let line = serde_json::to_string(report).context("Failed to serialize dispatch result")?;
        println!("{}", line);
        return Ok(());
    }

    match (&report.backend, &report.error) {
        (Some(backend), _) => {
            let mark = if report.ok { "✓" } else { "⚠" };
            println!(
                "{} {} {} from '{}' in {:.1}ms",
                mark, report.protocol, report.status, backend, report.latency_ms
            );
            if let Some(payload) = &report.payload {
                if !payload.is_empty() {
                    println!("{}", payload);
                }
            }
        }
        (None, Some(error)) => {
            println!(
                "✗ {} (status {}) after {:.1}ms",
                error, report.status, report.latency_ms
            );
        }
        (None, None) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocols::HttpResponse;
    use std::io::Write;
    use std::path::PathBuf;

    fn args() -> DispatchArgs {
        DispatchArgs {
            config: PathBuf::from("switchyard.toml"),
            data: None,
            data_file: None,
            headers: Vec::new(),
            deadline_ms: 0,
            repeat: 1,
            json: false,
            metrics_port: 0,
        }
    }

    #[test]
    fn test_parse_headers() {
        let parsed = parse_headers(&["x-trace = 1".into(), "empty=".into()]).unwrap();
        assert_eq!(
            parsed,
            vec![
                ("x-trace".to_string(), "1".to_string()),
                ("empty".to_string(), String::new())
            ]
        );

        let err = parse_headers(&["no-separator".into()]).unwrap_err();
        assert!(matches!(err, CliError::InvalidHeader { raw } if raw == "no-separator"));
        assert!(parse_headers(&["=value".into()]).is_err());
    }

    #[test]
    fn test_load_payload_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"from file").unwrap();

        let mut a = args();
        assert!(load_payload(&a).unwrap().is_empty());

        a.data_file = Some(file.path().to_path_buf());
        assert_eq!(load_payload(&a).unwrap().as_ref(), b"from file");

        a.data = Some("inline".into());
        assert_eq!(load_payload(&a).unwrap().as_ref(), b"inline");
    }

    #[test]
    fn test_build_request_follows_protocol() {
        let headers = vec![("X-User".to_string(), "alice".to_string())];

        let http = build_request(Protocol::Http, Bytes::from_static(b"p"), &headers);
        assert_eq!(http.protocol(), Protocol::Http);
        assert_eq!(http.metadata().get("x-user"), ["alice".to_string()]);

        let rpc = build_request(Protocol::Rpc, Bytes::from_static(b"p"), &headers);
        assert_eq!(rpc.protocol(), Protocol::Rpc);
        assert_eq!(rpc.payload().as_ref(), b"p");
    }

    #[test]
    fn test_report() {
        let mut response = HttpResponse::new(200, "hi");
        response.set_backend_name("route1");
        let output: DispatchOutput = Ok(Box::new(response));
        let report = DispatchReport::new(Protocol::Http, &output, 12.0);
        assert!(report.ok);
        assert_eq!(report.backend.as_deref(), Some("route1"));
        assert_eq!(report.sample(&output).status, DispatchStatus::Success);

        let output: DispatchOutput = Err(DispatchError::unavailable(Protocol::Rpc));
        let report = DispatchReport::new(Protocol::Rpc, &output, 3.0);
        assert!(!report.ok);
        assert_eq!(report.status, 14);
        assert_eq!(report.sample(&output).status, DispatchStatus::Unavailable);
    }
}
