use clap::Parser;
use guidance_gateway::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::Tiers => cli::tiers::run(),
        Command::Chat(args) => cli::chat::run(args).await,
    }
}
