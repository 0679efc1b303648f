//! Hostbridge CLI
//!
//! Command-line client for a hostbridge host, plus a reference host serving
//! an in-memory document.
//!
//! # Commands
//!
//! - `serve` - Run a host over TCP
//! - `ping` - Check that a host answers
//! - `push` - Push objects read from a JSON file
//! - `pull` - Read objects matching a filter
//! - `delete` - Delete objects matching a filter
//! - `update-property` - Set one property on objects matching a filter

mod commands;

use clap::{Parser, Subcommand};
use commands::FilterArgs;
use hostbridge_link::{ConnectionSettings, DEFAULT_PULL_PORT, DEFAULT_PUSH_PORT};
use hostbridge_protocol::PushType;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Hostbridge command-line tools.
#[derive(Parser)]
#[command(name = "hostbridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Host address
    #[arg(global = true, long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    host: IpAddr,

    /// Port carrying commands to the host
    #[arg(global = true, long, default_value_t = DEFAULT_PUSH_PORT)]
    push_port: u16,

    /// Port carrying results back to the client
    #[arg(global = true, long, default_value_t = DEFAULT_PULL_PORT)]
    pull_port: u16,

    /// Minutes to wait for a command before giving up
    #[arg(global = true, long)]
    timeout_minutes: Option<f64>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve an in-memory document over TCP
    Serve {
        /// JSON file of objects to create before serving
        #[arg(short, long)]
        seed: Option<PathBuf>,
    },

    /// Check that the host answers
    Ping,

    /// Push objects read from a JSON file
    Push {
        /// JSON file holding an array of objects
        file: PathBuf,

        /// How existing objects are treated
        #[arg(short = 't', long, default_value = "AdapterDefault")]
        push_type: PushType,

        /// Tag added to every pushed object
        #[arg(long, default_value = "")]
        tag: String,

        /// Do not copy custom data onto host entities
        #[arg(long)]
        no_custom_data: bool,

        /// Let host validation prompts through
        #[arg(long)]
        show_failures: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Read objects matching a filter
    Pull {
        #[command(flatten)]
        filter: FilterArgs,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Delete objects matching a filter
    Delete {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Set one property on objects matching a filter
    UpdateProperty {
        /// Property name
        property: String,

        /// New value as JSON; `null` removes the property
        value: String,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut settings = ConnectionSettings::new()
        .with_host(cli.host)
        .with_push_port(cli.push_port)
        .with_pull_port(cli.pull_port);
    if let Some(minutes) = cli.timeout_minutes {
        settings = settings.with_max_minutes_to_wait(minutes);
    }

    match cli.command {
        Commands::Serve { seed } => {
            commands::serve::run(&settings, seed.as_deref())?;
        }
        Commands::Ping => {
            commands::ping::run(&settings)?;
        }
        Commands::Push {
            file,
            push_type,
            tag,
            no_custom_data,
            show_failures,
            format,
        } => {
            let options = commands::push::PushOptions {
                push_type,
                tag,
                copy_custom_data: !no_custom_data,
                suppress_failure_messages: !show_failures,
            };
            commands::push::run(&settings, &file, &options, &format)?;
        }
        Commands::Pull { filter, format } => {
            commands::pull::run(&settings, &filter.to_query()?, &format)?;
        }
        Commands::Delete { filter } => {
            commands::delete::run(&settings, &filter.to_query()?)?;
        }
        Commands::UpdateProperty {
            property,
            value,
            filter,
        } => {
            let value = commands::json::parse_value(&value);
            commands::update_property::run(&settings, &filter.to_query()?, &property, value)?;
        }
        Commands::Version => {
            println!("Hostbridge CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Wire frame version {}", hostbridge_protocol::FRAME_VERSION);
        }
    }

    Ok(())
}
