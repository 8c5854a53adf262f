use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use confetti_core::catalog::Catalog;
use confetti_store::Store;
use serde::Serialize;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    store: Store,
    catalog: Arc<Catalog>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: HealthCheck,
    pub catalog: HealthCheck,
    pub checked_at: String,
}

pub fn router(store: Store, catalog: Arc<Catalog>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { store, catalog })
}

pub async fn spawn(
    bind_address: &str,
    port: u16,
    store: Store,
    catalog: Arc<Catalog>,
) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(bind_address = %address, "health endpoint started");

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(store, catalog)).await {
            error!(error = %error, "health endpoint server terminated unexpectedly");
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let summary = state.store.summary().await;
    let store_check = HealthCheck {
        status: "ready",
        detail: format!(
            "{} posted items, {} engagement events, {} pending reveals",
            summary.posted_content, summary.engagement_events, summary.pending_reveals
        ),
    };

    let catalog_ready = !state.catalog.is_empty();
    let catalog_check = if catalog_ready {
        let sizes = state
            .catalog
            .bucket_sizes()
            .map(|(bucket, size)| format!("{bucket}={size}"))
            .collect::<Vec<_>>()
            .join(" ");
        HealthCheck { status: "ready", detail: sizes }
    } else {
        HealthCheck { status: "degraded", detail: "catalog has no content".to_string() }
    };

    let ready = catalog_ready;
    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        store: store_check,
        catalog: catalog_check,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}
