use clap::{Parser, Subcommand};
use secure_client::config::{config_from_env, load_config, API_BASE_URL_ENV};
use secure_client::http::FilePart;
use secure_client::observability::{logging, metrics};
use secure_client::{ApiError, ApiResponse, Payload, Platform, ResilientClient, SecurityGate};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "api-cli")]
#[command(about = "Call the learning platform API through the secure client", long_about = None)]
struct Cli {
    /// API base URL (overrides the config file)
    #[arg(short, long, env = API_BASE_URL_ENV)]
    base_url: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bearer token stored before the call
    #[arg(short, long)]
    token: Option<String>,

    /// JSON file backing secure storage (overrides the config file)
    #[arg(short, long)]
    storage: Option<String>,

    /// CSRF token to send instead of a generated one
    #[arg(long)]
    csrf_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// GET an endpoint
    Get {
        endpoint: String,
        /// Serve from and populate the response cache
        #[arg(long)]
        cache: bool,
    },
    /// POST a JSON body
    Post {
        endpoint: String,
        #[arg(short, long)]
        data: String,
    },
    /// PUT a JSON body
    Put {
        endpoint: String,
        #[arg(short, long)]
        data: String,
    },
    /// PATCH a JSON body
    Patch {
        endpoint: String,
        #[arg(short, long)]
        data: String,
    },
    /// DELETE an endpoint
    Delete { endpoint: String },
    /// Upload a file as multipart form data
    Upload {
        endpoint: String,
        file: PathBuf,
        /// Extra form field as key=value (repeatable)
        #[arg(short, long, value_parser = parse_field)]
        field: Vec<(String, String)>,
    },
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => config_from_env()?,
    };
    if let Some(base_url) = &cli.base_url {
        config.api.base_url = base_url.clone();
    }
    if let Some(path) = &cli.storage {
        config.storage.path = Some(path.clone());
    }

    logging::init_logging(&config.observability);
    metrics::describe_metrics();

    let platform = Platform {
        embedded_csrf_token: cli.csrf_token.clone(),
        ..Platform::default()
    };
    let gate = Arc::new(SecurityGate::from_config(&config, platform)?);
    let client = ResilientClient::new(&config, gate)?;

    if let Some(token) = &cli.token {
        client.set_auth_token(token)?;
    }

    tracing::debug!(base_url = %client.base_url(), "api-cli starting");

    let result = match cli.command {
        Commands::Get { endpoint, cache } => {
            if cache {
                client.get_cached(&endpoint).await
            } else {
                client.get(&endpoint).await
            }
        }
        Commands::Post { endpoint, data } => {
            client.post(&endpoint, serde_json::from_str(&data)?).await
        }
        Commands::Put { endpoint, data } => {
            client.put(&endpoint, serde_json::from_str(&data)?).await
        }
        Commands::Patch { endpoint, data } => {
            client.patch(&endpoint, serde_json::from_str(&data)?).await
        }
        Commands::Delete { endpoint } => client.delete(&endpoint).await,
        Commands::Upload { endpoint, file, field } => {
            let bytes = tokio::fs::read(&file).await?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let part = FilePart {
                file_name,
                bytes,
                content_type: None,
            };
            client.upload_file(&endpoint, part, field).await
        }
    };

    match result {
        Ok(response) => print_response(response),
        Err(error) => {
            print_error(&error);
            std::process::exit(1);
        }
    }
}

fn print_response(response: ApiResponse) -> Result<(), Box<dyn std::error::Error>> {
    if response.cached {
        eprintln!("(cached)");
    }
    match response.data {
        Payload::Json(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Payload::Text(text) => println!("{text}"),
        Payload::Binary(bytes) => eprintln!("<{} bytes of binary data>", bytes.len()),
        Payload::Empty => eprintln!("Status {} (no content)", response.status),
    }
    Ok(())
}

fn print_error(error: &ApiError) {
    eprintln!("Error: {} (status {}): {}", error.code, error.status, error.message);
    if let Some(details) = &error.details {
        let rendered =
            serde_json::to_string_pretty(details).unwrap_or_else(|_| Value::Null.to_string());
        eprintln!("Details: {rendered}");
    }
}
