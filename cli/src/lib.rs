//! Command-line access to a docstore root.
//!
//! Every command runs as one session: it waits its turn on the database,
//! does its work and releases the lock before returning.

use clap::{Parser, Subcommand};
use docstore::{DocstoreError, Identifier, Registry, StoreConfig};
use futures::FutureExt;
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(name = "docstore-cli", version, about = "Inspect and edit docstore databases")]
pub struct Cli {
    /// Storage root (default: $DOCSTORE_ROOT or ./data)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the current document
    Get {
        /// Database identifier, e.g. `app.users`
        id: Identifier,
    },
    /// Replace the document with a JSON value and save it
    Set { id: Identifier, json: String },
    /// Append a JSON value to a list document and save it
    Push { id: Identifier, json: String },
    /// Print the primary file location of a database
    Path { id: Identifier },
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Store(#[from] DocstoreError),

    #[error("invalid JSON argument: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("document `{0}` is not a list")]
    NotAList(Identifier),
}

impl Cli {
    pub fn config(&self) -> StoreConfig {
        match &self.root {
            Some(root) => StoreConfig::new(root),
            None => StoreConfig::from_env(),
        }
    }
}

/// Runs one command and returns the text to print.
pub async fn run(cli: Cli) -> Result<String, CliError> {
    let registry = Registry::new(cli.config());
    execute(&registry, cli.command).await
}

pub async fn execute(registry: &Registry, command: Command) -> Result<String, CliError> {
    match command {
        Command::Get { id } => {
            let mut handle = registry.open(&id, &Value::Null).await?;
            let document = handle.read_only_view().to_value();
            handle.close()?;
            debug!(id = %id, "document read");
            serde_json::to_string_pretty(&document).map_err(|e| DocstoreError::from(e).into())
        }
        Command::Set { id, json } => {
            let value = parse_json(&json)?;
            registry
                .with_database(&id, &Value::Null, |db| {
                    async move {
                        db.set_data(value)?;
                        Ok::<_, CliError>(())
                    }
                    .boxed()
                })
                .await?;
            info!(id = %id, "document replaced");
            Ok(String::new())
        }
        Command::Push { id, json } => {
            let value = parse_json(&json)?;
            let target = id.clone();
            let len = registry
                .with_database(&id, &json!([]), |db| {
                    async move {
                        let document = db.data()?;
                        match document.as_array_mut() {
                            Some(list) => {
                                list.push(value);
                                Ok(list.len())
                            }
                            None => Err(CliError::NotAList(target)),
                        }
                    }
                    .boxed()
                })
                .await?;
            info!(id = %id, len, "value appended");
            Ok(format!("{len} items"))
        }
        Command::Path { id } => Ok(registry.store().primary_path(&id).display().to_string()),
    }
}

fn parse_json(text: &str) -> Result<Value, CliError> {
    serde_json::from_str(text).map_err(CliError::InvalidJson)
}
