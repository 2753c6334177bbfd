use clap::Parser;
use sitewatch_cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sitewatch_cli::init_tracing();
    sitewatch_cli::run(Cli::parse()).await
}
