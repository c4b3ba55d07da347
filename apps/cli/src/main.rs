//! promptkit CLI: small LLM and web-search pipelines for research,
//! outreach, lead collection and data generation.

mod commands;
mod prompt;

use clap::Parser;
use color_eyre::eyre::Result;
use promptkit_shared::RunId;
use tracing::Instrument;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);

    let span = tracing::info_span!("promptkit", run_id = %RunId::new());
    commands::run(cli).instrument(span).await
}
