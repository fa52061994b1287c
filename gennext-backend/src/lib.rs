use camino::Utf8PathBuf;

pub mod config;
pub mod db;
pub mod export;
pub mod lifecycle;

mod server;

pub async fn serve_app(config: config::Config, log_dir: Option<Utf8PathBuf>) -> anyhow::Result<()> {
    server::serve(config, log_dir).await
}
