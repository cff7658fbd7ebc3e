use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use fire_buckets::core::{InputError, ProjectionRequest, check_request, run_projection};

#[derive(Parser, Debug)]
#[command(
    name = "fire_buckets",
    about = "Deterministic freedom-age projection over pension and savings buckets"
)]
struct Cli {
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the projection API over HTTP.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Run one projection from a JSON request and print the result.
    Project {
        /// Request file; reads stdin when omitted.
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Command::Serve { port } => {
            if let Err(e) = fire_buckets::api::run_http_server(port).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Project { input, pretty } => match project(input, pretty) {
            Ok(output) => println!("{output}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        },
    }
}

fn init_logging(level: &str) {
    let default_filter = format!("fire_buckets={level}");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(true))
        .init();
}

fn project(input: Option<PathBuf>, pretty: bool) -> Result<String, String> {
    let raw = match input {
        Some(path) => fs::read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("failed to read stdin: {e}"))?;
            buf
        }
    };

    let request = parse_request(&raw).map_err(|e| e.to_string())?;
    let result = run_projection(&request);
    let output = if pretty {
        serde_json::to_string_pretty(&result)
    } else {
        serde_json::to_string(&result)
    };
    output.map_err(|e| format!("failed to serialize result: {e}"))
}

fn parse_request(raw: &str) -> Result<ProjectionRequest, InputError> {
    let request: ProjectionRequest = serde_json::from_str(raw)?;
    check_request(&request)?;
    Ok(request)
}
