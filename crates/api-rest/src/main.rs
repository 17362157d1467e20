//! Patient record management REST API server binary.
//!
//! Resolves configuration from the environment, checks that the backing data
//! file exists, and serves the router built in the library crate.

use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{app, AppState};
use prms_core::{PatientService, RecordStore, DEFAULT_DATA_FILE};

/// Main entry point for the patient record REST API server
///
/// Starts the REST API server on the configured address (default:
/// 0.0.0.0:3000).
///
/// # Environment Variables
/// - `PRMS_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `PRMS_DATA_FILE`: Backing JSON file for the patient collection
///   (default: "patients.json")
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the backing data file does not exist,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("PRMS_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let data_file = std::env::var("PRMS_DATA_FILE").unwrap_or_else(|_| DEFAULT_DATA_FILE.into());

    let data_path = Path::new(&data_file);
    if !data_path.exists() {
        anyhow::bail!(
            "patient data file does not exist: {} (seed it with an empty JSON object: {{}})",
            data_path.display()
        );
    }

    tracing::info!("-- Starting patient record REST API on {}", addr);

    let state = AppState {
        patient_service: Arc::new(PatientService::new(RecordStore::new(data_path))),
    };

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
