//! CLI module for docstore.
//!
//! Subcommands:
//! - `ping`: Initialise the client and print cluster identity
//! - `get`: Fetch one document by id
//! - `count`: Count documents matching filters
//! - `search`: List documents matching filters

mod document;
mod ping;
mod search;

use clap::{Parser, Subcommand};
use color_eyre::Result;

use crate::config::{Config, ElasticsearchConfig};
use crate::store::{Connector, SharedClient};

pub use search::FilterArgs;

/// docstore - document repository over Elasticsearch
#[derive(Parser)]
#[command(name = "docstore")]
#[command(about = "Inspect documents in an Elasticsearch cluster")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check connectivity and print cluster name and version
    Ping,

    /// Fetch a document by id
    Get {
        /// Index to read from
        #[arg(long)]
        index: String,

        /// Document id
        #[arg(long)]
        id: String,
    },

    /// Count documents matching the filters
    Count {
        #[arg(long)]
        index: String,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// List documents matching the filters
    Search {
        #[arg(long)]
        index: String,

        #[command(flatten)]
        filters: FilterArgs,

        /// Sort key as FIELD or FIELD:desc (repeatable)
        #[arg(long = "sort")]
        sort: Vec<String>,

        /// Maximum number of hits
        #[arg(long, default_value_t = 10)]
        size: usize,
    },
}

impl App {
    /// Run the CLI application.
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Ping => self.run_ping().await,
            Command::Get { ref index, ref id } => self.run_get(index, id).await,
            Command::Count {
                ref index,
                ref filters,
            } => self.run_count(index, filters).await,
            Command::Search {
                ref index,
                ref filters,
                ref sort,
                size,
            } => self.run_search(index, filters, sort, size).await,
        }
    }

    /// Loads configuration into an uninitialised connector.
    fn connector(&self) -> Result<Connector<ElasticsearchConfig>> {
        let config = Config::load()?;
        tracing::debug!(addresses = ?config.elasticsearch.addresses, "Loaded configuration");
        Ok(Connector::new(config.elasticsearch))
    }

    /// Loads configuration and initialises the client once.
    async fn connect(&self) -> Result<SharedClient> {
        let client = self
            .connector()?
            .initialize()
            .await
            .map_err(|e| color_eyre::eyre::eyre!("Failed to connect: {}", e))?;
        Ok(client)
    }
}
