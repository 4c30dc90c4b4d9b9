use clap::{Parser, Subcommand};
use serde_json::Value;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use pos_api_client::config::{resolve_config, ClientConfig};
use pos_api_client::error::{classify, Failure};
use pos_api_client::http::{Method, RequestConfig};
use pos_api_client::observability::{logging, metrics};
use pos_api_client::ApiClient;

#[derive(Parser)]
#[command(name = "api-cli")]
#[command(about = "Management CLI for the POS admin API", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides `api.base_url` from the configuration
    #[arg(short, long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct RequestArgs {
    /// Path under the API root, e.g. `products/12`
    path: String,

    /// Query parameter as `key=value`; repeatable
    #[arg(short, long = "query", value_parser = parse_key_value)]
    query: Vec<(String, String)>,

    /// JSON request body
    #[arg(short, long)]
    data: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a resource
    Get(RequestArgs),
    /// Create a resource
    Post(RequestArgs),
    /// Replace a resource
    Put(RequestArgs),
    /// Update part of a resource
    Patch(RequestArgs),
    /// Delete a resource
    Delete(RequestArgs),
    /// Force a CSRF token refresh and print the token
    Csrf,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

fn build_request(method: Method, args: RequestArgs) -> Result<RequestConfig, Failure> {
    let mut request = RequestConfig::path(method, args.path);
    for (key, value) in args.query {
        request = request.param(key, value);
    }
    if let Some(data) = args.data {
        let body: Value = serde_json::from_str(&data).map_err(|e| Failure::from(format!("Invalid --data JSON: {}", e)))?;
        request = request.json(body);
    }
    Ok(request)
}

async fn execute(client: &ApiClient, command: Commands) -> Result<Value, Failure> {
    let (method, args) = match command {
        Commands::Csrf => {
            let token = client.csrf().refresh_token().await?;
            return Ok(serde_json::json!({ "token": token }));
        }
        Commands::Get(args) => (Method::Get, args),
        Commands::Post(args) => (Method::Post, args),
        Commands::Put(args) => (Method::Put, args),
        Commands::Patch(args) => (Method::Patch, args),
        Commands::Delete(args) => (Method::Delete, args),
    };
    let request = build_request(method, args)?;
    Ok(client.send(request).await?)
}

fn load(cli: &Cli) -> Result<ClientConfig, Box<dyn std::error::Error>> {
    Ok(resolve_config(cli.config.as_deref(), cli.base_url.as_deref())?)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_logging(&config.observability.log_level);
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::warn!(error = %e, "Invalid metrics address, exporter disabled"),
        }
    }

    let client = match ApiClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {}", classify(&e.into()).message);
            return ExitCode::FAILURE;
        }
    };

    match execute(&client, cli.command).await {
        Ok(value) => {
            match serde_json::to_string_pretty(&value) {
                Ok(pretty) => println!("{}", pretty),
                Err(_) => println!("{}", value),
            }
            ExitCode::SUCCESS
        }
        Err(failure) => {
            eprintln!("Error: {}", classify(&failure).message);
            ExitCode::FAILURE
        }
    }
}
