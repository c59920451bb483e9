use anyhow::Result;
use clap::Parser;
use idlforge_cli::{args, cmd};
use tracing::subscriber::set_global_default;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // logs go to stderr so --json output stays clean
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .finish();
    set_global_default(subscriber)?;

    let cli = args::Cli::parse();
    cmd::dispatch(cli).await
}
