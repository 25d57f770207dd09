use clap::Parser;

use bruxlog_lib::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bruxlog_lib::run(Cli::parse()).await
}
