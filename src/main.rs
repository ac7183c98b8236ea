//! Graph Console - device-code sign-in and a Microsoft Graph send-mail sample.

#![deny(clippy::all)]

use std::io;
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use graph_console::auth::acquire_session;
use graph_console::config::Config;
use graph_console::error::{ApiError, AppError};
use graph_console::graph::{EndpointResolver, GraphClient};
use graph_console::sample::{SampleOutcome, SampleRunner};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env file (if present) before anything else
    if let Err(e) = dotenvy::dotenv() {
        // .env file is optional - only warn if it exists but can't be read
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            let err = AppError::config(&e);
            eprintln!("ERROR: {} ({})", err.user_message(), err);
            eprintln!("\nSet GRAPH_CLIENT_ID=<your-application-id> or edit config.toml.");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.logging.level);
    info!("Starting {} v{}", config.app.name, config.app.version);

    let mut stdout = io::stdout();
    let session = match acquire_session(&config, config.auth.auto_open, &mut stdout).await {
        Ok(session) => session,
        Err(e) => {
            error!("Sign-in failed: {}", e);
            let err = AppError::from(e);
            eprintln!("ERROR: {} ({})", err.user_message(), err);
            return ExitCode::FAILURE;
        }
    };

    info!("Token expires at {}", session.expires_at().to_rfc3339());

    let graph = GraphClient::new(session, EndpointResolver::from_config(&config.api));
    let stdin = io::stdin();
    let mut runner = SampleRunner::new(&graph, &config.sample, stdin.lock(), stdout.lock());

    match runner.run().await {
        Ok(outcome) if outcome.is_success() => ExitCode::SUCCESS,
        Ok(outcome) => {
            if let SampleOutcome::Aborted { stage, status } = outcome {
                error!("Sample stopped at '{}' (HTTP {})", stage, status);
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Sample failed: {:#}", e);
            match e.downcast::<ApiError>() {
                Ok(api) => {
                    let err = AppError::from(api);
                    eprintln!("ERROR: {}", err.user_message());
                    if err.requires_sign_in() {
                        eprintln!("Run the sample again to get a new token.");
                    }
                }
                Err(e) => eprintln!("ERROR: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr so console output stays readable. `RUST_LOG` wins over the
/// configured level.
fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .init();
}
