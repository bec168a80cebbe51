use clap::{Parser, Subcommand};

use std::path::PathBuf;

use crate::data::sql::Backend;

use super::constants::{ENV_CONFIG, ENV_DIALECT, ENV_MAX_FILTER_DEPTH, ENV_TIMEZONE};

#[derive(Parser)]
#[command(name = "sieve")]
#[command(version, about = "Compile JSON filter requests into parameterized SQL", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// SQL dialect (postgres, sqlite or duckdb)
    #[arg(long, short = 'd', global = true, env = ENV_DIALECT, value_parser = parse_dialect)]
    pub dialect: Option<Backend>,

    /// Default timezone for catalogs that do not declare one (IANA name)
    #[arg(long, global = true, env = ENV_TIMEZONE)]
    pub timezone: Option<String>,

    /// Maximum combinator nesting depth
    #[arg(long, global = true, env = ENV_MAX_FILTER_DEPTH)]
    pub max_depth: Option<usize>,
}

/// Parse SQL dialect from CLI/env string
fn parse_dialect(s: &str) -> Result<Backend, String> {
    s.parse()
}

#[derive(Subcommand, Clone, Debug, PartialEq)]
pub enum Commands {
    /// Compile a filter request and print the SQL with its parameters
    Compile {
        /// Resource whose catalog validates the request
        resource: String,
        /// Request JSON file, or `-` for stdin
        #[arg(default_value = "-")]
        request: PathBuf,
        /// Convenience parameter as `name=value` (repeatable)
        #[arg(long = "param", short = 'p', value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// Describe the fields of a resource catalog
    Catalog {
        /// Resource name
        resource: String,
    },
    /// List registered resources
    Resources,
}

/// Parse a `name=value` convenience parameter
fn parse_param(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("Invalid parameter '{}'. Expected name=value", s)),
    }
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub dialect: Option<Backend>,
    pub timezone: Option<String>,
    pub max_depth: Option<usize>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Commands) {
    let cli = Cli::parse();
    let config = CliConfig {
        config: cli.config,
        dialect: cli.dialect,
        timezone: cli.timezone,
        max_depth: cli.max_depth,
    };
    (config, cli.command)
}
