use clap::Parser;
use gennext_backend::{config::Cli, serve_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().unwrap_or_default();
    let Cli { config, log_dir } = Cli::parse();

    serve_app(config, log_dir).await
}
