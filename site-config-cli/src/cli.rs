use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "site-config")]
#[command(version)]
#[command(about = "Serve and edit schema-driven site configuration")]
#[command(long_about = "
site-config reads site configuration entries declared as YAML field schemas,
resolves their stored values (including references to other content), and
serves them over JSON:API and REST endpoints.

Settings come from site-config.{toml,yaml,json} in the working directory,
or the file given with --config, and SITE_CONFIG_* environment variables.

Example usage:
  site-config serve                          # Start the HTTP server
  site-config list                           # Print every entry as JSON
  site-config get footer copyright           # Print one value
  site-config set footer copyright '\"© 2024\"'
  site-config --lang fr form footer          # Settings form in French
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file to use instead of discovering site-config.* files
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Language to read and write values in
    #[arg(short, long, global = true)]
    pub lang: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Start the HTTP server with the JSON:API and REST resources
    Serve {
        /// Address to listen on, overriding the `bind` setting
        #[arg(long)]
        bind: Option<String>,
    },
    /// Print the normalized values of every entry
    List,
    /// Print an entry, or a single field of it
    Get {
        entry: String,
        field: Option<String>,
    },
    /// Store a field value. VALUE is parsed as JSON, falling back to a plain string
    Set {
        entry: String,
        field: String,
        value: String,
    },
    /// Print the settings form schema of one entry, or of all entries
    Form { entry: Option<String> },
}
