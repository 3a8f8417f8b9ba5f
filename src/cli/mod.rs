//! CLI for the guidance gateway
//!
//! - `serve`: run the HTTP service
//! - `tiers`: print the effective policy table
//! - `chat`: terminal chat client that keeps its own guest counter

pub mod chat;
pub mod serve;
pub mod tiers;

use clap::{Parser, Subcommand};

/// Guidance gateway - tiered chat quotas in front of the guide
#[derive(Parser)]
#[command(name = "guidance-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Print the effective tier policy table as JSON
    Tiers,

    /// Chat with a running gateway from the terminal
    Chat(chat::ChatArgs),
}
