//! # Guidebook - Localized Guide Renderer
//!
//! The main binary for the Guidebook content resolution engine.
//!
//! This application provides:
//! - HTTP REST API serving resolved page contexts (axum-based)
//! - CLI interface for rendering, tracing and coverage reports
//!
//! Both front ends read the same [`guidebook::catalog::Catalog`] (bundles
//! plus page declarations) and render through `guidebook-core`.
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! guidebook server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! guidebook pages
//! guidebook render positanoBeaches --lang it
//! guidebook resolve positanoBeaches intro --lang it --trace
//! guidebook coverage --lang it
//! ```

use clap::Parser;
use guidebook::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // GUIDEBOOK_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("GUIDEBOOK_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "guidebook=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Guidebook startup banner.
fn print_banner() {
    println!(
        r#"
   ██████╗ ██╗   ██╗██╗██████╗ ███████╗
  ██╔════╝ ██║   ██║██║██╔══██╗██╔════╝
  ██║  ███╗██║   ██║██║██║  ██║█████╗
  ██║   ██║██║   ██║██║██║  ██║██╔══╝
  ╚██████╔╝╚██████╔╝██║██████╔╝███████╗
   ╚═════╝  ╚═════╝ ╚═╝╚═════╝ ╚══════╝

  Guidebook Renderer v{}

  Localized • Cascading • Traceable
"#,
        env!("CARGO_PKG_VERSION")
    );
}
