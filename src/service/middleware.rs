//! Service middleware for request metrics.
//!
//! ## Metrics Emitted
//!
//! - `request_metric` - one event per request with path pattern, method, status, latency
//! - `import_metric` - one event per committed import with citizen count and latency

use axum::{extract::Request, middleware::Next, response::Response};
use regex_lite::Regex;
use std::sync::OnceLock;
use std::time::Instant;
use tracing::info;

use crate::types::ImportId;

/// Metrics middleware that records request counts and latency.
///
/// Uses tracing; events can be aggregated from logs.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = normalize_path(request.uri().path());

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();

    info!(
        target: "citizen_registry::metrics",
        metric_type = "request",
        path = %path,
        method = %method,
        status = status,
        latency_ms = latency.as_millis() as u64,
        "request_metric"
    );

    response
}

fn id_segment() -> Option<&'static Regex> {
    static ID_SEGMENT: OnceLock<Option<Regex>> = OnceLock::new();
    ID_SEGMENT
        .get_or_init(|| Regex::new(r"/-?[0-9]+(/|$)").ok())
        .as_ref()
}

/// Normalize path for metrics to avoid high cardinality.
///
/// Replaces numeric path segments (import and citizen ids) with `:id`.
fn normalize_path(path: &str) -> String {
    let Some(re) = id_segment() else {
        return path.to_string();
    };
    // Adjacent id segments share a slash, so a single pass can miss every
    // second one.
    let mut current = path.to_string();
    loop {
        let next = re.replace_all(&current, "/:id$1").into_owned();
        if next == current {
            return next;
        }
        current = next;
    }
}

/// Record import commit metrics.
pub fn record_import_metrics(import_id: ImportId, citizens: usize, latency_ms: u64) {
    info!(
        target: "citizen_registry::metrics",
        metric_type = "import",
        import_id = import_id.get(),
        citizens = citizens,
        latency_ms = latency_ms,
        "import_metric"
    );
}
