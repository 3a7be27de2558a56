//! CLI subcommands: init, validate, metadata, get, schema, completions.

use crate::catalog::{self, definition, ServiceDefinition};
use crate::service::{Service, ServiceResponse};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use flexi_logger::{Logger, LoggerHandle};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "odata4rs",
    version,
    about = "OData v4 query options and CSDL metadata over YAML-defined entity sets"
)]
pub struct Cli {
    /// Log level or flexi_logger spec (RUST_LOG overrides)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a demo service.yaml
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate a service definition
    Validate {
        /// Path to service.yaml
        #[arg(short, long, default_value = "service.yaml")]
        file: PathBuf,
    },

    /// Print the CSDL metadata document
    Metadata {
        /// Path to service.yaml
        #[arg(short, long, default_value = "service.yaml")]
        file: PathBuf,

        /// Print only the document's ETag
        #[arg(long)]
        etag: bool,
    },

    /// Answer one request, e.g. "Products?$top=2&$expand=Category"
    Get {
        /// Path to service.yaml
        #[arg(short, long, default_value = "service.yaml")]
        file: PathBuf,

        /// Resource path with optional query string
        url: String,
    },

    /// Print the JSON Schema of the service definition format
    Schema,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Start logging to stderr at `level`.
pub fn init_logging(level: &str) -> Result<LoggerHandle, String> {
    Logger::try_with_env_or_str(level)
        .map_err(|e| format!("invalid log level '{}': {}", level, e))?
        .log_to_stderr()
        .start()
        .map_err(|e| format!("cannot start logger: {}", e))
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Metadata { file, etag } => cmd_metadata(&file, etag),
        Commands::Get { file, url } => cmd_get(&file, &url),
        Commands::Schema => cmd_schema(),
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "odata4rs", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn cmd_init(path: &Path) -> Result<(), String> {
    let definition_path = path.join("service.yaml");
    if definition_path.exists() {
        return Err(format!("{} already exists", definition_path.display()));
    }
    std::fs::create_dir_all(path).map_err(|e| format!("cannot create {}: {}", path.display(), e))?;
    std::fs::write(&definition_path, catalog::DEMO_DEFINITION)
        .map_err(|e| format!("cannot write {}: {}", definition_path.display(), e))?;

    println!("Initialized odata4rs service at {}", path.display());
    println!("  Created: {}", definition_path.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let def = definition::parse_definition_file(file)?;
    let errors = definition::validate_definition(&def);

    if errors.is_empty() {
        println!(
            "OK: {} ({} entity sets, {} relationships)",
            def.namespace,
            def.entity_sets.len(),
            def.relationships.len()
        );
        Ok(())
    } else {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        Err(format!("{} validation error(s)", errors.len()))
    }
}

/// Parse, validate and freeze a definition into a service.
fn load_service(file: &Path) -> Result<Service, String> {
    let def: ServiceDefinition = definition::parse_definition_file(file)?;
    let registry = catalog::build_registry(&def)?;
    Ok(Service::new(registry))
}

fn cmd_metadata(file: &Path, etag: bool) -> Result<(), String> {
    let service = load_service(file)?;
    if etag {
        println!("{}", service.metadata().etag);
    } else {
        print!("{}", service.metadata().xml);
    }
    Ok(())
}

/// Split `url` into path and query and answer it.
fn run_get(file: &Path, url: &str) -> Result<ServiceResponse, String> {
    let service = load_service(file)?;
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    Ok(service.handle(path, query))
}

fn cmd_get(file: &Path, url: &str) -> Result<(), String> {
    let response = run_get(file, url)?;
    if response.status >= 400 {
        return Err(format!("{}: {}", response.status, response.body));
    }
    println!("{}", response.body);
    Ok(())
}

fn cmd_schema() -> Result<(), String> {
    println!("{}", definition::definition_schema()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_file(dir: &Path) -> PathBuf {
        cmd_init(dir).unwrap();
        dir.join("service.yaml")
    }

    #[test]
    fn test_init() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("svc");
        cmd_init(&sub).unwrap();
        assert!(sub.join("service.yaml").exists());
    }

    #[test]
    fn test_init_already_exists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("service.yaml"), "exists").unwrap();
        assert!(cmd_init(dir.path()).is_err());
    }

    #[test]
    fn test_validate_demo() {
        let dir = tempfile::tempdir().unwrap();
        cmd_validate(&demo_file(dir.path())).unwrap();
    }

    #[test]
    fn test_validate_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("service.yaml");
        std::fs::write(&file, "version: \"2.0\"\nnamespace: \"\"\n").unwrap();
        let err = cmd_validate(&file).unwrap_err();
        assert_eq!(err, "2 validation error(s)");
    }

    #[test]
    fn test_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let file = demo_file(dir.path());
        cmd_metadata(&file, false).unwrap();
        cmd_metadata(&file, true).unwrap();
    }

    #[test]
    fn test_get_collection() {
        let dir = tempfile::tempdir().unwrap();
        let file = demo_file(dir.path());
        let r = run_get(&file, "Products?$top=1&$expand=Supplier").unwrap();
        assert_eq!(r.status, 200);
        let body: serde_json::Value = serde_json::from_str(&r.body).unwrap();
        assert_eq!(body["value"][0]["Supplier"]["Country"], "USA");
        cmd_get(&file, "/odata/v4/Categories('2')?$expand=Products").unwrap();
    }

    #[test]
    fn test_get_errors() {
        let dir = tempfile::tempdir().unwrap();
        let file = demo_file(dir.path());
        let err = cmd_get(&file, "Customers").unwrap_err();
        assert!(err.starts_with("501"));
        let err = cmd_get(&file, "Nope").unwrap_err();
        assert!(err.starts_with("404"));
        assert!(cmd_get(&dir.path().join("missing.yaml"), "Products").is_err());
    }

    #[test]
    fn test_schema() {
        cmd_schema().unwrap();
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["odata4rs", "--log-level", "debug", "get", "Products"]).unwrap();
        assert_eq!(cli.log_level, "debug");
        assert!(matches!(cli.command, Commands::Get { ref url, .. } if url == "Products"));
        Cli::command().debug_assert();
    }
}
