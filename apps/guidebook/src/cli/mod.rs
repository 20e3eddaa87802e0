//! # Guidebook CLI Module
//!
//! This module implements the CLI interface for Guidebook.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `pages` - List declared pages
//! - `render` - Render a page context for a locale
//! - `resolve` - Resolve one field, optionally with its cascade trace
//! - `coverage` - Report localization coverage
//! - `check` - Validate configuration, bundles and page policies

mod commands;

use crate::config::{DEFAULT_CONFIG_FILE, GuidebookConfig};
use clap::{Parser, Subcommand};
use guidebook_core::GuideError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Guidebook - Localized Guide Renderer
///
/// Resolves every content field of a travel guide page through a fixed
/// locale fallback cascade and reports where each value came from.
#[derive(Parser, Debug)]
#[command(name = "guidebook")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (per-field cascade traces)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the configuration file
    #[arg(short = 'c', long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides the config file)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List declared pages
    Pages,

    /// Render a page context
    Render {
        /// Page content key or slug
        page: String,

        /// Requested locale
        #[arg(short, long)]
        lang: Option<String>,
    },

    /// Resolve one field of a page
    Resolve {
        /// Page content key or slug
        page: String,

        /// Field name (intro, sections, faqs, toc, title, description, ...)
        field: String,

        /// Requested locale
        #[arg(short, long)]
        lang: Option<String>,

        /// Show every tier the cascade visited
        #[arg(short, long)]
        trace: bool,
    },

    /// Report localization coverage
    Coverage {
        /// Restrict the report to one locale
        #[arg(short, long)]
        lang: Option<String>,
    },

    /// Validate configuration, bundles and page policies
    Check {
        /// Fail when any bundle file was skipped
        #[arg(long)]
        strict: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), GuideError> {
    let config = GuidebookConfig::load(&cli.config)?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port }) => cmd_server(config, host, port).await,
        Some(Commands::Pages) => cmd_pages(config, json_mode),
        Some(Commands::Render { page, lang }) => {
            cmd_render(config, &page, lang, json_mode, cli.verbose)
        }
        Some(Commands::Resolve {
            page,
            field,
            lang,
            trace,
        }) => cmd_resolve(config, &page, &field, lang, trace || cli.verbose, json_mode),
        Some(Commands::Coverage { lang }) => cmd_coverage(config, lang.as_deref(), json_mode),
        Some(Commands::Check { strict }) => cmd_check(config, strict, json_mode),
        None => cmd_pages(config, json_mode),
    }
}

// =============================================================================
// TESTS
// =============================================================================
