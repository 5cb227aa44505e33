//! OpenAPI Type Model CLI
//!
//! Command-line interface for listing resources, printing their type model,
//! and validating or filtering payloads against it.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use openapi_typemodel::{
    load_payload, Catalog, CatalogOptions, ConvertOptions, DirectorySource, ResourceDefinition,
    ResourceType, TypeId, DEFAULT_DISCRIMINATOR,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "openapi-typemodel")]
#[command(about = "Build type models from OpenAPI request schemas and check payloads against them")]
#[command(version)]
struct Cli {
    /// Directory holding one `<api-version>/openapi.yaml` per API version
    #[arg(long, global = true, default_value = "schemas")]
    schema_dir: PathBuf,

    /// API version to read
    #[arg(long, global = true, default_value = "v1.0")]
    api_version: String,

    /// Discriminator property understood by the converter
    #[arg(long, global = true, default_value = DEFAULT_DISCRIMINATOR)]
    discriminator: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the API versions that are served
    Versions,

    /// List resources of an API version
    List {
        /// List every readable (GET) path instead of creatable resources
        #[arg(long)]
        readable: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the type model of a resource's request body
    Show {
        /// Resource URL, e.g. /groups
        url: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Validate a payload against a resource's request body
    Validate {
        /// Resource URL, e.g. /groups
        url: String,

        /// Payload file to validate
        payload: PathBuf,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Project a payload onto its read-only or configurable fields
    Filter {
        /// Resource URL, e.g. /groups
        url: String,

        /// Payload file to filter
        payload: PathBuf,

        /// Keep server-populated fields
        #[arg(
            long,
            conflicts_with = "configurable",
            required_unless_present = "configurable"
        )]
        read_only: bool,

        /// Keep client-settable fields
        #[arg(long, conflicts_with = "read_only", required_unless_present = "read_only")]
        configurable: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let options = CatalogOptions::new()
        .convert(ConvertOptions::new().discriminator(cli.discriminator.clone()));
    let catalog = Catalog::with_options(DirectorySource::new(&cli.schema_dir), options);
    let api_version = cli.api_version.as_str();

    let result = match cli.command {
        Commands::Versions => {
            for version in catalog.list_api_versions() {
                println!("{}", version);
            }
            Ok(())
        }
        Commands::List { readable, json } => run_list(&catalog, api_version, readable, json),
        Commands::Show {
            url,
            output,
            pretty,
        } => run_show(&catalog, api_version, &url, output, pretty),
        Commands::Validate { url, payload, json } => {
            run_validate(&catalog, api_version, &url, &payload, json)
        }
        Commands::Filter {
            url,
            payload,
            read_only,
            configurable: _,
            pretty,
        } => run_filter(&catalog, api_version, &url, &payload, read_only, pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

type DirectoryCatalog = Catalog<DirectorySource>;

fn run_list(
    catalog: &DirectoryCatalog,
    api_version: &str,
    readable: bool,
    json: bool,
) -> Result<(), u8> {
    let resources = if readable {
        catalog.list_readable_resources(api_version)
    } else {
        catalog.list_resources(api_version)
    }
    .map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    if json {
        println!("{}", to_json(&resources, false)?);
    } else {
        for ResourceType { name, url, .. } in &resources {
            println!("{}\t{}", url, name);
        }
    }
    Ok(())
}

fn run_show(
    catalog: &DirectoryCatalog,
    api_version: &str,
    url: &str,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let definition = load_definition(catalog, api_version, url, false)?;
    let json_output = to_json(&definition, pretty)?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

fn run_validate(
    catalog: &DirectoryCatalog,
    api_version: &str,
    url: &str,
    payload_path: &std::path::Path,
    json_output: bool,
) -> Result<(), u8> {
    let payload = load_payload(payload_path).map_err(|e| {
        report_error(json_output, &format!("loading payload: {}", e));
        e.exit_code() as u8
    })?;
    let definition = load_definition(catalog, api_version, url, json_output)?;
    let body = body_id(&definition, url, json_output)?;

    let errors = definition.types.validate(body, &payload);
    if errors.is_empty() {
        if json_output {
            println!(r#"{{"valid":true}}"#);
        } else {
            println!("Valid");
        }
        return Ok(());
    }

    if json_output {
        let output = serde_json::json!({
            "valid": false,
            "errors": errors
        });
        println!("{}", output);
    } else {
        eprintln!("Validation failed:");
        for error in errors {
            eprintln!("  {}", error);
        }
    }
    Err(1)
}

fn run_filter(
    catalog: &DirectoryCatalog,
    api_version: &str,
    url: &str,
    payload_path: &std::path::Path,
    read_only: bool,
    pretty: bool,
) -> Result<(), u8> {
    let payload = load_payload(payload_path).map_err(|e| {
        eprintln!("Error: loading payload: {}", e);
        e.exit_code() as u8
    })?;
    let definition = load_definition(catalog, api_version, url, false)?;
    let body = body_id(&definition, url, false)?;

    let filtered = if read_only {
        definition.types.filter_read_only(body, &payload)
    } else {
        definition.types.filter_configurable(body, &payload)
    };
    println!("{}", to_json(&filtered, pretty)?);
    Ok(())
}

fn load_definition(
    catalog: &DirectoryCatalog,
    api_version: &str,
    url: &str,
    json_output: bool,
) -> Result<ResourceDefinition, u8> {
    match catalog.resource_definition(api_version, url) {
        Ok(Some(definition)) => Ok(definition),
        Ok(None) => {
            report_error(
                json_output,
                &format!("no JSON request body for POST {} in {}", url, api_version),
            );
            Err(2)
        }
        Err(e) => {
            report_error(json_output, &e.to_string());
            Err(e.exit_code() as u8)
        }
    }
}

/// Slot of the converted request body.
fn body_id(definition: &ResourceDefinition, url: &str, json_output: bool) -> Result<TypeId, u8> {
    match definition.resource.body.as_ref().and_then(|body| body.id()) {
        Some(id) => Ok(id),
        None => {
            let details: String = definition
                .warnings
                .iter()
                .map(|warning| format!("\n  {}", warning))
                .collect();
            report_error(
                json_output,
                &format!("request body schema for POST {} cannot be converted{}", url, details),
            );
            Err(2)
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String, u8> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", serde_json::json!({ "valid": false, "error": msg }));
    } else {
        eprintln!("Error: {}", msg);
    }
}
