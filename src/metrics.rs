//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry, core::Collector};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Login Flow Metrics
    pub static ref LOGIN_REDIRECTS_TOTAL: IntCounter = IntCounter::new(
        "github_signin_login_redirects_total",
        "Total number of redirects to the authorization endpoint"
    ).expect("metric can be created");
    pub static ref CALLBACKS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("github_signin_callbacks_total", "Total number of OAuth callbacks by outcome"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref LOGOUTS_TOTAL: IntCounter = IntCounter::new(
        "github_signin_logouts_total",
        "Total number of logouts"
    ).expect("metric can be created");

    // Upstream Metrics
    pub static ref UPSTREAM_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("github_signin_upstream_requests_total", "Total number of identity provider requests"),
        &["endpoint", "status"]
    ).expect("metric can be created");
    pub static ref UPSTREAM_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        prometheus::HistogramOpts::new(
            "github_signin_upstream_request_duration_seconds",
            "Identity provider request duration in seconds"
        ).buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["endpoint"]
    ).expect("metric can be created");

    // Session Metrics
    pub static ref SESSIONS_ACTIVE: IntGauge = IntGauge::new(
        "github_signin_sessions_active",
        "Current number of sessions held by the session store"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("github_signin_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
///
/// Safe to call more than once; collectors that are already registered
/// are skipped.
pub fn init_metrics() {
    let collectors: [(&str, Box<dyn Collector>); 7] = [
        ("LOGIN_REDIRECTS_TOTAL", Box::new(LOGIN_REDIRECTS_TOTAL.clone())),
        ("CALLBACKS_TOTAL", Box::new(CALLBACKS_TOTAL.clone())),
        ("LOGOUTS_TOTAL", Box::new(LOGOUTS_TOTAL.clone())),
        ("UPSTREAM_REQUESTS_TOTAL", Box::new(UPSTREAM_REQUESTS_TOTAL.clone())),
        (
            "UPSTREAM_REQUEST_DURATION_SECONDS",
            Box::new(UPSTREAM_REQUEST_DURATION_SECONDS.clone()),
        ),
        ("SESSIONS_ACTIVE", Box::new(SESSIONS_ACTIVE.clone())),
        ("ERRORS_TOTAL", Box::new(ERRORS_TOTAL.clone())),
    ];

    for (name, collector) in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(error) => tracing::warn!(metric = name, %error, "Failed to register metric"),
        }
    }

    tracing::info!("Metrics registry initialized");
}
