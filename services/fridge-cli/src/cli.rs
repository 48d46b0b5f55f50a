//! Command-line interface

use clap::{Parser, Subcommand};
use serde_json::Value;

use crate::error::{Error, Result};

#[derive(Debug, Parser)]
#[command(name = "fridge")]
#[command(about = "Fridge API client with automatic session renewal")]
#[command(version)]
pub struct Cli {
    /// Config file (falls back to CONFIG_PATH, then ./fridge.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, PartialEq, Subcommand)]
pub enum Command {
    /// Sign in (password read from FRIDGE_PASSWORD)
    Login { email: String },
    /// Drop the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Send a GET request
    Get {
        #[arg(value_parser = parse_path)]
        path: String,
    },
    /// Send a DELETE request
    Delete {
        #[arg(value_parser = parse_path)]
        path: String,
    },
    /// Send a POST request with an optional JSON body
    Post {
        #[arg(value_parser = parse_path)]
        path: String,
        #[arg(value_parser = parse_body)]
        body: Option<Value>,
    },
    /// Send a PATCH request with an optional JSON body
    Patch {
        #[arg(value_parser = parse_path)]
        path: String,
        #[arg(value_parser = parse_body)]
        body: Option<Value>,
    },
}

/// API paths are relative to the configured base URL and start with `/`.
fn parse_path(path: &str) -> Result<String> {
    if path.starts_with('/') {
        Ok(path.to_string())
    } else {
        Err(Error::InvalidPath(path.to_string()))
    }
}

fn parse_body(body: &str) -> Result<Value> {
    serde_json::from_str(body).map_err(|e| Error::InvalidBody(e.to_string()))
}
