//! Optional OTLP trace export.
//!
//! Export is off unless `WEBHOOKD_OTEL_ENABLED` is true or an OTLP endpoint
//! variable is set. When on, spans recorded through `tracing` are batched
//! and sent over OTLP/HTTP.

use std::{collections::HashMap, time::Duration};

use anyhow::{bail, Context, Result};
use opentelemetry::{
    global,
    propagation::TextMapCompositePropagator,
    trace::TracerProvider as _,
    KeyValue,
};
use opentelemetry_otlp::{SpanExporter, WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::{
    propagation::{BaggagePropagator, TraceContextPropagator},
    runtime,
    trace::{Sampler, Tracer, TracerProvider},
    Resource,
};
use tracing::warn;

const DEFAULT_ENDPOINT: &str = "http://localhost:4318";
const TRACES_PATH: &str = "/v1/traces";
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Endpoint variables, first non-empty wins.
const ENDPOINT_VARS: [&str; 4] = [
    "WEBHOOKD_OTEL_EXPORTER_OTLP_ENDPOINT",
    "WEBHOOKD_OTEL_EXPORTER_OTLP_TRACES_ENDPOINT",
    "OTEL_EXPORTER_OTLP_TRACES_ENDPOINT",
    "OTEL_EXPORTER_OTLP_ENDPOINT",
];

/// Exporter settings read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct OtelSettings {
    /// Full OTLP/HTTP traces URL.
    pub endpoint: String,
    /// Extra headers sent with every export request.
    pub headers: HashMap<String, String>,
    /// Ratio of root traces sampled, `0.0..=1.0`.
    pub sample_ratio: f64,
    pub service_name: String,
    /// Value of `deployment.environment.name`; may be empty.
    pub environment: String,
}

impl OtelSettings {
    /// Reads settings from the process environment. `Ok(None)` means export
    /// is disabled.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        let var = |name: &str| {
            lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        };
        let first = |names: &[&str]| names.iter().find_map(|name| var(name));

        let flag = |name: &str| -> Result<bool> {
            var(name).map_or(Ok(false), |value| parse_bool(name, &value))
        };

        let endpoint = first(&ENDPOINT_VARS);
        if !flag("WEBHOOKD_OTEL_ENABLED")? && endpoint.is_none() {
            return Ok(None);
        }

        let insecure = flag("WEBHOOKD_OTEL_EXPORTER_OTLP_INSECURE")?
            || flag("OTEL_EXPORTER_OTLP_INSECURE").unwrap_or(false);

        let sample_ratio = match var("WEBHOOKD_OTEL_TRACES_SAMPLER_RATIO") {
            Some(value) => value.parse::<f64>().with_context(|| {
                format!("WEBHOOKD_OTEL_TRACES_SAMPLER_RATIO: invalid number {value:?}")
            })?,
            None => 1.0,
        };

        let headers =
            match first(&["WEBHOOKD_OTEL_EXPORTER_OTLP_HEADERS", "OTEL_EXPORTER_OTLP_HEADERS"]) {
                Some(value) => parse_headers(&value)?,
                None => HashMap::new(),
            };

        Ok(Some(Self {
            endpoint: normalize_endpoint(endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT), insecure),
            headers,
            sample_ratio: if sample_ratio.is_nan() { 1.0 } else { sample_ratio.clamp(0.0, 1.0) },
            service_name: first(&["WEBHOOKD_OTEL_SERVICE_NAME", "OTEL_SERVICE_NAME"])
                .unwrap_or_else(|| "webhookd".to_string()),
            environment: first(&["WEBHOOKD_ENV", "ENV", "OTEL_ENVIRONMENT"]).unwrap_or_default(),
        }))
    }
}

/// Owns the tracer provider so pending spans can be flushed on exit.
#[derive(Default)]
pub struct Telemetry {
    provider: Option<TracerProvider>,
}

impl Telemetry {
    /// Builds the exporter and installs the global provider and propagator.
    /// `None` yields a disabled handle.
    pub fn init(settings: Option<&OtelSettings>) -> Result<Self> {
        let Some(settings) = settings else {
            return Ok(Self::default());
        };

        let exporter = SpanExporter::builder()
            .with_http()
            .with_endpoint(settings.endpoint.clone())
            .with_headers(settings.headers.clone())
            .build()
            .context("Failed to create OTLP span exporter")?;

        let resource = Resource::default().merge(&Resource::new(vec![
            KeyValue::new("service.name", settings.service_name.clone()),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            KeyValue::new("deployment.environment.name", settings.environment.clone()),
        ]));

        let provider = TracerProvider::builder()
            .with_batch_exporter(exporter, runtime::Tokio)
            .with_sampler(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
                settings.sample_ratio,
            ))))
            .with_resource(resource)
            .build();

        global::set_tracer_provider(provider.clone());
        global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
            Box::new(TraceContextPropagator::new()),
            Box::new(BaggagePropagator::new()),
        ]));

        Ok(Self { provider: Some(provider) })
    }

    /// Tracer for the `tracing-opentelemetry` layer, if export is enabled.
    pub fn tracer(&self) -> Option<Tracer> {
        self.provider.as_ref().map(|provider| provider.tracer("webhookd"))
    }

    /// Flushes pending spans and shuts the provider down.
    pub async fn shutdown(self) {
        let Some(provider) = self.provider else {
            return;
        };

        // Shutdown blocks on the batch processor.
        let flush = tokio::task::spawn_blocking(move || provider.shutdown());
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, flush).await {
            Ok(Ok(Ok(()))) => {},
            Ok(Ok(Err(e))) => warn!(error = %e, "Failed to flush trace exporter"),
            Ok(Err(e)) => warn!(error = %e, "Trace exporter shutdown task failed"),
            Err(_) => warn!(timeout = ?SHUTDOWN_TIMEOUT, "Trace exporter shutdown timed out"),
        }
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => bail!("{name}: invalid boolean {value:?}"),
    }
}

/// Parses `k1=v1,k2=v2`.
fn parse_headers(value: &str) -> Result<HashMap<String, String>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .with_context(|| format!("invalid OTLP header {pair:?} (expected key=value)"))?;
            let key = key.trim();
            if key.is_empty() {
                bail!("invalid OTLP header {pair:?}: empty key");
            }
            Ok((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Adds a scheme when missing and the traces path when the URL has none.
fn normalize_endpoint(endpoint: &str, insecure: bool) -> String {
    let url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else if insecure {
        format!("http://{endpoint}")
    } else {
        format!("https://{endpoint}")
    };

    let authority_start = url.find("://").map_or(0, |i| i + 3);
    match url[authority_start..].find('/') {
        Some(path_start) if url.len() > authority_start + path_start + 1 => url,
        _ => format!("{}{TRACES_PATH}", url.trim_end_matches('/')),
    }
}
