//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod analyze;
mod import;
mod init;
mod query;
mod serve;
mod user;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "evidence")]
#[command(about = "Building energy evidence database")]
#[command(version)]
pub struct Cli {
    /// Data directory or database file (overrides config file).
    /// Can be a directory containing evidence.db or a .db file directly.
    #[arg(long, short = 't', global = true)]
    data: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Start the JSON API server
    Serve {
        /// Address to bind: a port, a host, or host:port
        #[arg(long, default_value = "127.0.0.1:3030")]
        bind: String,
    },

    /// Faceted query over approved records
    Query {
        /// Determinant (exact match)
        #[arg(long)]
        criteria: Option<String>,
        /// Energy output (exact match)
        #[arg(long)]
        energy_method: Option<String>,
        /// Increase or Decrease
        #[arg(long)]
        direction: Option<String>,
        /// Scale (repeatable)
        #[arg(long = "scale")]
        scales: Vec<String>,
        /// Climate code (repeatable)
        #[arg(long = "climate")]
        climates: Vec<String>,
        /// Location (repeatable)
        #[arg(long = "location")]
        locations: Vec<String>,
        /// Building use (repeatable)
        #[arg(long = "building-use")]
        building_uses: Vec<String>,
        /// Approach (repeatable)
        #[arg(long = "approach")]
        approaches: Vec<String>,
        /// Print option counts for every facet
        #[arg(long)]
        facets: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Free-text search across record text fields
    Search {
        /// Search text, or a record id
        query: String,
        /// Maximum number of hits
        #[arg(short, long)]
        limit: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Match a spreadsheet against record paragraphs and propagate its metadata
    Import {
        /// Spreadsheet (xlsx, xls, ods) or CSV file
        file: PathBuf,
        /// Write the matched rows (default: report only)
        #[arg(long)]
        apply: bool,
    },

    /// Build a moderator analysis chart for a determinant
    Analyze {
        /// Determinant (criteria) to analyze
        #[arg(long)]
        determinant: String,
        /// Moderator: climate, scale, building_use or approach
        #[arg(long)]
        moderator: String,
        /// Energy output for the increase half, or "all" (omit to leave it empty)
        #[arg(long)]
        top: Option<String>,
        /// Energy output for the decrease half, or "all" (omit to leave it empty)
        #[arg(long)]
        bottom: Option<String>,
        /// Write the chart as SVG to this path
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Export a saved analysis as SVG
    Export {
        /// Saved analysis id
        id: i64,
        /// Output file
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Manage user accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Register a user
    Add {
        username: String,
        #[arg(long)]
        email: Option<String>,
        /// admin or user
        #[arg(long, default_value = "user")]
        role: String,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
        data: cli.data,
    };
    let (settings, _config) = load_settings_with_options(options).await;

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Serve { bind } => serve::cmd_serve(&settings, &bind).await,
        Commands::Query {
            criteria,
            energy_method,
            direction,
            scales,
            climates,
            locations,
            building_uses,
            approaches,
            facets,
            json,
        } => {
            let filter = crate::filter::FilterSet {
                criteria,
                energy_method,
                direction,
                scales,
                climates,
                locations,
                building_uses,
                approaches,
            };
            query::cmd_query(&settings, &filter, facets, json).await
        }
        Commands::Search { query, limit, json } => {
            query::cmd_search(&settings, &query, limit, json).await
        }
        Commands::Import { file, apply } => import::cmd_import(&settings, &file, apply).await,
        Commands::Analyze {
            determinant,
            moderator,
            top,
            bottom,
            out,
        } => {
            analyze::cmd_analyze(
                &settings,
                &determinant,
                &moderator,
                top,
                bottom,
                out.as_deref(),
            )
            .await
        }
        Commands::Export { id, out } => analyze::cmd_export(&settings, id, &out).await,
        Commands::User { command } => match command {
            UserCommands::Add {
                username,
                email,
                role,
            } => user::cmd_user_add(&settings, &username, email, &role).await,
        },
    }
}
