pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "rasoi")]
#[command(about = "Rasoi - Hybrid recipe search engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long, env = "HOST")]
        host: Option<String>,
    },

    /// Run database migrations
    Migrate,

    /// Import recipes from a scraper JSON export
    Import {
        /// Path to the JSON export file
        file: String,
    },

    /// Rebuild the vector index from every stored recipe
    Reindex,

    /// Search recipes on a running server
    Search {
        /// Natural-language query
        query: String,

        /// Number of results to show
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: i64,
    },
}
