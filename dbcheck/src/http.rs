/**
 * API HTTP DBCHECK - Serveur de métriques du mode exporter
 *
 * RÔLE :
 * Expose le dernier snapshot publié par le prober périodique.
 *
 * ROUTES :
 * - GET /metrics : format texte Prometheus (gauges disponibilité + durée)
 * - GET /targets : même snapshot en JSON (debug / dashboards)
 * - GET /health  : "ok", liveness du process
 *
 * Aucune route ne déclenche de probe : un scrape ne fait que copier le
 * snapshot courant, il n'attend jamais un cycle en cours.
 */

use crate::publisher::{ResultsPublisher, ResultsSnapshot, TargetStatus};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::{routing::get, Json, Router};
use prometheus::{Encoder, Registry, TextEncoder};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub registry: Registry,
    pub publisher: ResultsPublisher,
}

#[derive(Debug, Serialize)]
struct TargetView {
    host: String,
    port: u16,
    database: String,
    #[serde(rename = "type")]
    kind: &'static str,
    available: bool,
    duration_seconds: f64,
}

#[derive(Debug, Serialize)]
struct SnapshotView {
    cycle: u64,
    checked_at: String, // RFC3339
    available: usize,
    targets: Vec<TargetView>,
}

fn to_view(s: &TargetStatus) -> TargetView {
    TargetView {
        host: s.target.host.clone(),
        port: s.target.port,
        database: s.target.name.clone(),
        kind: s.kind.as_str(),
        available: s.available,
        duration_seconds: s.last_check_duration.as_secs_f64(),
    }
}

fn to_snapshot_view(snapshot: &ResultsSnapshot) -> SnapshotView {
    SnapshotView {
        cycle: snapshot.cycle,
        checked_at: snapshot.checked_at.format(&Rfc3339).unwrap_or_default(),
        available: snapshot.available_count(),
        targets: snapshot.entries.iter().map(to_view).collect(),
    }
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/metrics", get(metrics))
        .route("/targets", get(targets))
        .with_state(app_state)
}

// GET /metrics
async fn metrics(State(app): State<AppState>) -> Result<([(header::HeaderName, String); 1], String), StatusCode> {
    let encoder = TextEncoder::new();
    let families = app.registry.gather();
    let mut buf = Vec::new();
    encoder.encode(&families, &mut buf).map_err(|e| {
        error!("[http] cannot encode metrics: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    let body = String::from_utf8(buf).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(([(header::CONTENT_TYPE, encoder.format_type().to_string())], body))
}

// GET /targets
async fn targets(State(app): State<AppState>) -> Json<serde_json::Value> {
    let snapshot = app.publisher.snapshot();
    Json(serde_json::to_value(to_snapshot_view(&snapshot)).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::ResultsSnapshot;
    use crate::target::{DatabaseKind, TargetId};
    use std::time::Duration;

    fn app_state() -> AppState {
        let publisher = ResultsPublisher::new().unwrap();
        let registry = Registry::new();
        registry.register(Box::new(publisher.clone())).unwrap();
        publisher.publish(ResultsSnapshot::new(
            3,
            vec![TargetStatus {
                target: TargetId { host: "db".into(), port: 3306, name: "app".into() },
                kind: DatabaseKind::MySql,
                available: true,
                last_check_duration: Duration::from_millis(120),
            }],
        ));
        AppState { registry, publisher }
    }

    #[tokio::test]
    async fn test_metrics_renders_text_format() {
        let (headers, body) = metrics(State(app_state())).await.unwrap();
        assert!(headers[0].1.starts_with("text/plain"));
        assert!(body.contains("# TYPE db_connection_available gauge"));
        assert!(body.contains(r#"db_connection_available{database="app",host="db",port="3306",type="mysql"} 1"#));
    }

    #[tokio::test]
    async fn test_targets_returns_snapshot_json() {
        let Json(value) = targets(State(app_state())).await;
        assert_eq!(value["cycle"], 3);
        assert_eq!(value["available"], 1);
        assert_eq!(value["targets"][0]["type"], "mysql");
        assert_eq!(value["targets"][0]["database"], "app");
    }
}
