use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use camino::Utf8PathBuf;
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;

use crate::{
    config::{Config, QcThresholds},
    db::{Store, model::WriteContext},
};

mod api;

/// # Errors
pub async fn serve(config: Config, log_dir: Option<Utf8PathBuf>) -> anyhow::Result<()> {
    initialize_logging(log_dir);

    let app_addr = config.app_address();

    let app_state = AppState::new(config);
    tracing::info!("initialized app state");

    let app = app(app_state);

    let listener = TcpListener::bind(&app_addr)
        .await
        .context(format!("failed to listen on {app_addr}"))?;
    tracing::info!("gennext listening on {app_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("failed to serve app")?;

    Ok(())
}

fn initialize_logging(log_dir: Option<Utf8PathBuf>) {
    use tracing::Level;
    use tracing_subscriber::{filter::Targets, prelude::*};

    let log_layer = tracing_subscriber::fmt::layer();

    match log_dir {
        None => {
            let dev_test_log_filter = Targets::new()
                .with_target("gennext_backend", Level::DEBUG)
                .with_target("tower_http", Level::TRACE);
            let log_layer = log_layer.pretty().with_filter(dev_test_log_filter);

            tracing_subscriber::registry().with(log_layer).try_init().ok();
        }
        Some(path) => {
            let log_writer = tracing_appender::rolling::daily(path, "gennext.log");
            let prod_log_filter = Targets::new().with_target("gennext_backend", Level::INFO);
            let log_layer = log_layer
                .json()
                .with_writer(log_writer)
                .with_filter(prod_log_filter);

            tracing_subscriber::registry().with(log_layer).try_init().ok();
        }
    }
}

#[derive(Clone)]
pub(crate) struct AppState {
    db: Store,
    config: Arc<Config>,
}

impl AppState {
    fn new(config: Config) -> Self {
        Self {
            db: Store::default(),
            config: Arc::new(config),
        }
    }

    pub(crate) fn db(&self) -> &Store {
        &self.db
    }

    pub(crate) fn thresholds(&self) -> &QcThresholds {
        self.config.thresholds()
    }

    pub(crate) fn write_context(&self) -> WriteContext<'_> {
        WriteContext {
            thresholds: self.config.thresholds(),
            prs_output_dir: self.config.prs_output_dir(),
        }
    }
}

fn app(app_state: AppState) -> Router {
    api::router()
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
