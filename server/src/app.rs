//! Core application

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::api::ApiError;
use crate::core::cli::{self, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME, APP_NAME_LOWER, ENV_LOG};
use crate::data::filters::{
    BaseQuery, CatalogRegistry, CompiledQuery, FieldCatalog, FilterError, compile_parsed,
    parse_filters,
};
use crate::utils::file::read_input;

pub struct CoreApp {
    pub config: AppConfig,
    pub registry: CatalogRegistry,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        let config = AppConfig::load(&cli_config)?;
        let app = Self::init(config)?;

        match command {
            Commands::Compile {
                resource,
                request,
                params,
            } => {
                let input = read_input(&request)?;
                let params: Map<String, Value> = params
                    .into_iter()
                    .map(|(name, value)| (name, Value::String(value)))
                    .collect();
                let query = app.compile(&resource, &input, &params).map_err(rejected)?;
                println!("{}", app.render(&query)?);
            }
            Commands::Catalog { resource } => {
                let catalog = app.registry.catalog(&resource)?;
                print!("{}", describe_catalog(catalog));
            }
            Commands::Resources => {
                for resource in app.registry.resources() {
                    println!("{}", resource);
                }
            }
        }

        Ok(())
    }

    /// Validate every declared catalog and register it
    pub fn init(config: AppConfig) -> Result<Self> {
        let catalogs = config
            .catalogs
            .iter()
            .cloned()
            .map(|decl| decl.into_catalog(&config.defaults))
            .collect::<Result<Vec<_>, _>>()
            .context("Invalid catalog declaration")?;
        let registry = CatalogRegistry::build(catalogs)?;

        tracing::info!(
            resources = registry.resources().len(),
            dialect = %config.dialect,
            "{} ready",
            APP_NAME
        );

        Ok(Self { config, registry })
    }

    /// Compile a raw JSON request for `resource` against its whole table
    pub fn compile(
        &self,
        resource: &str,
        input: &str,
        params: &Map<String, Value>,
    ) -> Result<CompiledQuery, FilterError> {
        let catalog = self.registry.catalog(resource)?;
        let request = parse_filters(input, catalog, &self.config.limits)?;
        compile_parsed(catalog, BaseQuery::from_table(catalog.table()), request, params)
    }

    /// Render a compiled query as `{"sql": ..., "params": [...]}`
    pub fn render(&self, query: &CompiledQuery) -> Result<String> {
        let (sql, params) = query
            .to_sql(self.config.dialect.dialect())
            .map_err(rejected)?;
        let output = serde_json::json!({
            "sql": sql,
            "params": params.values,
        });
        serde_json::to_string_pretty(&output).context("Failed to serialize query")
    }

    fn init_logging() {
        let default_filter = format!("warn,{}_server=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }
}

/// A rejected request as `message [CODE]`
fn rejected(e: FilterError) -> anyhow::Error {
    let body = ApiError::from(e).body();
    anyhow::anyhow!("{} [{}]", body.message, body.code)
}

/// One line per field: name, type, column, flags and operators
fn describe_catalog(catalog: &FieldCatalog) -> String {
    let mut out = format!("{} (table {})\n", catalog.resource(), catalog.table());
    for field in catalog.fields() {
        let mut flags = Vec::new();
        if field.is_partial_match() {
            flags.push("partial_match".to_string());
        }
        if !field.is_sortable() {
            flags.push("unsortable".to_string());
        }
        if let Some(association) = field.association() {
            flags.push(format!("via {}", association));
        }
        if !field.values().is_empty() {
            flags.push(format!("values {}", field.values().join("|")));
        }
        let operators: Vec<&str> = field.operators().iter().map(|op| op.as_str()).collect();

        out.push_str(&format!(
            "  {:<20} {:<9} {:<24} {}{}\n",
            field.name(),
            field.value_type().as_str(),
            field.column(),
            operators.join(","),
            if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join("; "))
            }
        ));
    }
    out
}
