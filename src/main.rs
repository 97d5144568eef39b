use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parcel_glance::{
    Config, LocalPackageStore, StdoutNavigator, Tracker, UpsClient, decode_track_body,
    parse_shipping_data,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "parcel-glance")]
#[command(about = "Track packages and show their latest location")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start tracking a package
    Add {
        package_name: String,
        tracking_number: String,
    },
    /// Stop tracking a package
    Remove { package_name: String },
    /// Show every tracked package
    List,
    /// Print the activity log of a package
    Logs { package_name: String },
    /// Print the maps link for a package's latest location
    Map { package_name: String },
    /// Summarize a saved carrier response without going to the network
    Parse {
        file: PathBuf,
        package_name: String,
        tracking_number: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("Failed to read configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parcel_glance=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Add {
            package_name,
            tracking_number,
        } => {
            let tracker = build_tracker(&config)?;
            tracker
                .add_package(&package_name, &tracking_number)
                .await
                .with_context(|| format!("Failed to add {}", package_name))?;
            print!("{}", tracker.view().render().await);
        }
        Commands::Remove { package_name } => {
            build_tracker(&config)?.remove_package(&package_name).await?;
            println!("Removed {}", package_name);
        }
        Commands::List => {
            let tracker = build_tracker(&config)?;
            let report = tracker.restore().await?;
            if tracker.view().cards().await.is_empty() {
                println!("No packages tracked");
            } else {
                print!("{}", tracker.view().render().await);
                for name in &report.unavailable {
                    eprintln!("{}: status unavailable", name);
                }
            }
        }
        Commands::Logs { package_name } => {
            for line in build_tracker(&config)?.show_logs(&package_name).await? {
                println!("{}", line);
            }
        }
        Commands::Map { package_name } => {
            let location = build_tracker(&config)?
                .show_location(&package_name)
                .await?;
            eprintln!("{}", location.full_location);
        }
        Commands::Parse {
            file,
            package_name,
            tracking_number,
        } => {
            let body = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let raw = decode_track_body(&body, &tracking_number)
                .with_context(|| format!("Failed to parse {}", file.display()))?;
            let summary = parse_shipping_data(&package_name, &tracking_number, &raw);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

fn build_tracker(config: &Config) -> Result<Tracker> {
    let client = UpsClient::new(&config.client).context("Failed to build HTTP client")?;
    Ok(Tracker::new(
        Arc::new(client),
        Arc::new(LocalPackageStore::new(&config.store_path)),
        Arc::new(StdoutNavigator),
    )
    .with_view_wait(config.view_wait))
}
