/**
 * DBCHECK - Point d'entrée
 *
 * RÔLE : lit la configuration (env + .env), puis :
 * - mode one-shot (défaut) : attend que toutes les cibles répondent,
 *   code de sortie 0 / 1 (config) / 2 (cible injoignable)
 * - mode exporter (EXPORTER=true) : prober périodique + serveur /metrics
 */

use anyhow::{Context, Result};
use dbcheck::exit;
use dbcheck::http::{self, AppState};
use dbcheck::{check_all, DriverProbe, OsFileReader, PeriodicProber, ResultsPublisher, RetryPolicy, Settings};
use prometheus::Registry;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let settings = match Settings::from_env(&OsFileReader) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Error: {}", e);
            std::process::exit(exit::CONFIG_ERROR);
        }
    };

    let code = if settings.exporter {
        match run_exporter(settings).await {
            Ok(()) => exit::SUCCESS,
            Err(e) => {
                error!("Error: {:#}", e);
                exit::CONFIG_ERROR
            }
        }
    } else {
        run_once(settings).await
    };
    std::process::exit(code);
}

async fn run_once(settings: Settings) -> i32 {
    let policy = match RetryPolicy::new(settings.tries) {
        Ok(policy) => policy,
        Err(e) => {
            error!("Error: {}", e);
            return exit::CONFIG_ERROR;
        }
    };
    let probe = Arc::new(DriverProbe::new().with_timeout(settings.probe_timeout));

    match check_all(probe, &settings.targets, policy).await {
        Ok(()) => {
            info!("All {} targets reachable", settings.targets.len());
            exit::SUCCESS
        }
        Err(failure) if failure.is_config_error() => {
            error!("Error: {}", failure);
            exit::CONFIG_ERROR
        }
        Err(failure) => {
            error!("Error: {}", failure);
            exit::UNREACHABLE
        }
    }
}

async fn run_exporter(settings: Settings) -> Result<()> {
    let publisher = ResultsPublisher::new().context("Failed to create connection gauges")?;
    let registry = Registry::new();
    registry
        .register(Box::new(publisher.clone()))
        .context("Failed to register connection gauges")?;

    let probe = Arc::new(DriverProbe::new().with_timeout(settings.probe_timeout));
    let mut prober = PeriodicProber::new(settings.targets, probe, settings.check_interval, publisher.clone());
    prober.start().await;

    let app = http::build_router(AppState { registry, publisher });
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.exporter_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Error starting HTTP server on {}", addr))?;

    info!("Starting metrics exporter on {}/metrics", addr);
    info!("Check interval: {:?}", prober.interval());

    let stop = prober.stop_handle();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("shutdown requested"),
                _ = stop.cancelled() => {}
            }
        })
        .await
        .context("HTTP server failed");

    prober.shutdown().await;
    served
}
