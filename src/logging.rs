use axum::{
    extract::{MatchedPath, Request},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use opentelemetry::{KeyValue, global, trace::TraceError};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    propagation::TraceContextPropagator,
    runtime,
    trace::{RandomIdGenerator, Sampler, Tracer},
};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use std::time::Instant;
use tracing::{Instrument, error, info, info_span, warn};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_DIR: &str = "storage/logs";

const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// The caller's `X-Request-Id` when it looks sane, else a fresh UUID.
fn request_id(req: &Request) -> String {
    req.headers()
        .get(&REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map(str::to_owned)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Logs one line per request inside a span carrying the request id, and
/// echoes the id back in `X-Request-Id`.
pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let request_id = request_id(&req);
    let method = req.method().clone();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());

    let span = info_span!("request", %request_id, %method, %route);
    let started = Instant::now();
    let mut response = next.run(req).instrument(span.clone()).await;
    let latency_ms = started.elapsed().as_millis();

    let _entered = span.enter();
    let status = response.status();
    if status.is_server_error() {
        error!(status = status.as_u16(), latency_ms, "Request failed");
    } else if status.is_client_error() {
        warn!(status = status.as_u16(), latency_ms, "Request rejected");
    } else {
        info!(status = status.as_u16(), latency_ms, "Request completed");
    }

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID.clone(), value);
    }
    response
}

/// `OTEL_TRACES_SAMPLE_RATIO` in `[0, 1]`; anything else samples every trace.
fn sampler() -> Sampler {
    match std::env::var("OTEL_TRACES_SAMPLE_RATIO")
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
    {
        Some(ratio) if (0.0..1.0).contains(&ratio) => {
            Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(ratio)))
        }
        _ => Sampler::AlwaysOn,
    }
}

fn init_tracer(otlp_endpoint: String) -> Result<Tracer, TraceError> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let deployment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
    let resource = Resource::new([
        KeyValue::new(SERVICE_NAME, "classmark-auth"),
        KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
        KeyValue::new("deployment.environment", deployment),
    ]);

    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(otlp_endpoint),
        )
        .with_trace_config(
            opentelemetry_sdk::trace::Config::default()
                .with_sampler(sampler())
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(resource),
        )
        .install_batch(runtime::Tokio)
}

/// Installs the global subscriber: console, daily rolling error and JSON
/// files under `storage/logs`, and OTLP export when
/// `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
pub fn init_tracing() {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::fmt;

    let console_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{}=info,classmark_auth=info,tower_http=warn,hyper=info,tonic=info",
            env!("CARGO_CRATE_NAME")
        ))
    });

    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .compact()
        .with_filter(console_filter);

    let log_dir_ready = match std::fs::create_dir_all(LOG_DIR) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("Failed to create {LOG_DIR}: {e}. Logging to console only.");
            false
        }
    };

    let file_layer = log_dir_ready.then(|| {
        fmt::layer()
            .with_writer(RollingFileAppender::new(Rotation::DAILY, LOG_DIR, "classmark.log"))
            .with_target(false)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_filter(EnvFilter::new("error"))
    });

    let json_layer = log_dir_ready.then(|| {
        fmt::layer()
            .json()
            .with_writer(RollingFileAppender::new(Rotation::DAILY, LOG_DIR, "classmark.json"))
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(EnvFilter::new("info"))
    });

    let tracer = match std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        Ok(endpoint) => match init_tracer(endpoint) {
            Ok(tracer) => Some(tracer),
            Err(e) => {
                eprintln!("Failed to initialize OpenTelemetry: {e}. Continuing without it.");
                None
            }
        },
        Err(_) => None,
    };
    let otel_enabled = tracer.is_some();
    let otel_layer = tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(json_layer)
        .with(otel_layer)
        .init();

    if otel_enabled {
        info!("Tracing initialized with OpenTelemetry export");
    } else {
        info!("Tracing initialized without OpenTelemetry");
    }
}

/// Flushes pending spans. Safe to call when no exporter was installed.
pub async fn shutdown_tracer() {
    global::shutdown_tracer_provider();
}
