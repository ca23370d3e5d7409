//! Prometheus metrics: per-request HTTP series and auth flow counters.
//!
//! Token-level counters (`auth_tokens_issued_total`,
//! `auth_token_validation_failures_total`, `auth_tokens_swept_total`) are
//! emitted from `classmark-auth`; this module installs the recorder that
//! collects them.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
    routing::get,
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tracing::warn;

static OBSERVABILITY_ENABLED: OnceLock<bool> = OnceLock::new();

/// Upper buckets cover bcrypt-bound login requests.
const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0];

/// `OBSERVABILITY_ENABLED`, read once. Anything but `false`/`0` enables it.
pub fn is_observability_enabled() -> bool {
    *OBSERVABILITY_ENABLED.get_or_init(|| {
        std::env::var("OBSERVABILITY_ENABLED")
            .map(|v| !matches!(v.to_lowercase().as_str(), "false" | "0"))
            .unwrap_or(true)
    })
}

/// Installs the global Prometheus recorder and its upkeep task.
///
/// Returns `None` when observability is off or a recorder is already
/// installed, in which case `/metrics` is not mounted.
pub fn init_metrics() -> Option<PrometheusHandle> {
    if !is_observability_enabled() {
        return None;
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            LATENCY_BUCKETS,
        )
        .and_then(|builder| builder.install_recorder())
        .map_err(|e| warn!(error = %e, "Prometheus recorder not installed"))
        .ok()?;

    let upkeep = handle.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(5));
        loop {
            ticker.tick().await;
            upkeep.run_upkeep();
        }
    });

    Some(handle)
}

fn status_class(status: u16) -> &'static str {
    match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

/// Decrements `http_requests_active` on drop, cancelled requests included.
struct InFlight;

impl InFlight {
    fn enter() -> Self {
        gauge!("http_requests_active").increment(1.0);
        InFlight
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        gauge!("http_requests_active").decrement(1.0);
    }
}

pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    if !is_observability_enabled() {
        return next.run(req).await;
    }

    let method = req.method().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let _in_flight = InFlight::enter();
    let started = Instant::now();
    let response = next.run(req).await;
    let elapsed = started.elapsed().as_secs_f64();

    let status = response.status().as_u16();
    counter!(
        "http_requests_total",
        "method" => method.clone(),
        "route" => route.clone(),
        "status" => status_class(status)
    )
    .increment(1);
    histogram!("http_request_duration_seconds", "method" => method, "route" => route)
        .record(elapsed);

    response
}

/// Router serving the scrape endpoint.
pub fn metrics_app(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || async move { handle.render() }))
}

pub fn track_login_success(kind: &'static str) {
    if is_observability_enabled() {
        counter!("auth_logins_total", "kind" => kind, "outcome" => "success").increment(1);
    }
}

pub fn track_login_failure(kind: &'static str, reason: &'static str) {
    if is_observability_enabled() {
        counter!(
            "auth_logins_total",
            "kind" => kind,
            "outcome" => "failure",
            "reason" => reason
        )
        .increment(1);
    }
}

pub fn track_session_refreshed(kind: &'static str) {
    if is_observability_enabled() {
        counter!("auth_sessions_refreshed_total", "kind" => kind).increment(1);
    }
}

/// The email queue was full and a message was discarded.
pub fn track_email_dropped() {
    if is_observability_enabled() {
        counter!("auth_emails_dropped_total").increment(1);
    }
}

pub fn track_self_sign_submitted() {
    if is_observability_enabled() {
        counter!("attendance_self_signs_total").increment(1);
    }
}
