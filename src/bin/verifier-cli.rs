use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;

use payment_verifier::config::{load_config, VerifierConfig};
use payment_verifier::http::{build_tracker, SessionView};
use payment_verifier::observability::logging;
use payment_verifier::verification::{Resolution, SessionState, SessionStore};

#[derive(Parser)]
#[command(name = "verifier-cli")]
#[command(about = "Verify payments and manage verification sessions", long_about = None)]
struct Cli {
    /// Base URL of a running payment-verifier service.
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a transaction in-process and stream its status
    Verify {
        transaction_id: String,
        network: String,
        /// Configuration file for networks and polling; defaults if omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Start a session on the service
    Start {
        transaction_id: String,
        network: String,
    },
    /// Show a session
    Status { id: String },
    /// Cancel a session
    Cancel { id: String },
    /// List supported networks
    Networks,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Verify {
            transaction_id,
            network,
            config,
        } => {
            let config = match config {
                Some(path) => load_config(&path)?,
                None => VerifierConfig::default(),
            };
            logging::init_logging("warn");
            return verify(&config, transaction_id, network).await;
        }
        Commands::Start {
            transaction_id,
            network,
        } => {
            let res = client
                .post(format!("{}/api/v1/verifications", cli.url))
                .json(&serde_json::json!({
                    "transaction_id": transaction_id,
                    "network": network,
                }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Status { id } => {
            let res = client
                .get(format!("{}/api/v1/verifications/{}", cli.url, id))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Cancel { id } => {
            let res = client
                .delete(format!("{}/api/v1/verifications/{}", cli.url, id))
                .send()
                .await?;
            if res.status().is_success() {
                println!("Cancelled {}", id);
            } else {
                print_response(res).await?;
            }
        }
        Commands::Networks => {
            let res = client
                .get(format!("{}/api/v1/networks", cli.url))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Run one session locally, printing every state change until it halts.
async fn verify(
    config: &VerifierConfig,
    transaction_id: String,
    network: String,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let tracker = build_tracker(config)?;
    let handle = tracker.start(transaction_id, network, |_| {}, |_| {});

    // Ctrl+C tears the session down like a host would.
    let store = SessionStore::new();
    store.insert(handle.clone());
    let teardown = store.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            teardown.cancel_all();
        }
    });

    let mut updates = handle.subscribe();
    loop {
        let view = SessionView::new(&handle);
        println!("{}", serde_json::to_string(&view)?);
        if handle.snapshot().state().is_halted() {
            break;
        }
        if updates.changed().await.is_err() {
            break;
        }
    }

    let session = handle.snapshot();
    if session.state() == SessionState::Resolved(Resolution::Succeeded) {
        Ok(ExitCode::SUCCESS)
    } else {
        if let Some(detail) = &session.last_status().error_detail {
            eprintln!("Error: {}", detail);
        }
        Ok(ExitCode::FAILURE)
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
