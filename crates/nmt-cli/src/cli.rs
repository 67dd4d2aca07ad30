//! Command-line surface for the translation service.

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "nmt", version, about = "Neural machine translation HTTP service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP server.
    Serve {
        /// Address to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on.
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
    /// Print the resolved configuration snapshot and exit, without
    /// starting the server. Useful for verifying environment wiring.
    PrintConfig,
}
