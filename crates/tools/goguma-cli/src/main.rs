use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::{ColoredString, Colorize};
use goguma_reputation::{
    backend::postgrest::DEFAULT_BACKEND_TIMEOUT_SECS,
    config::{ENV_BACKEND_ANON_KEY, ENV_BACKEND_URL},
    marketplace::{ProfileSummary, SellerCard},
    MarketBackend, Marketplace, PostgrestBackend, ReputationProvider, ReputationService,
};
use goguma_types::{Listing, ListingId, ScoreReport, ScoreSource, SellerId, UserId, BASE_SCORE};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Command-line interface for 고구마마켓 charm temperatures
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// Hosted backend project URL
    #[clap(long, global = true, env = ENV_BACKEND_URL)]
    url: Option<String>,

    /// Anonymous API key of the backend
    #[clap(long, global = true, env = ENV_BACKEND_ANON_KEY, hide_env_values = true)]
    key: Option<String>,

    /// Request timeout in seconds
    #[clap(long, global = true, default_value_t = DEFAULT_BACKEND_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Print machine-readable JSON instead of text
    #[clap(long, global = true)]
    json: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a seller's charm temperature
    Temperature {
        /// Seller (user) id
        seller_id: String,
    },

    /// Show the seller card of a listing
    Seller {
        /// Listing id
        listing_id: ListingId,
    },

    /// Show a user's profile summary
    Profile {
        /// User id
        user_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let url = cli
        .url
        .clone()
        .filter(|u| !u.trim().is_empty())
        .with_context(|| format!("Backend URL missing: pass --url or set {}", ENV_BACKEND_URL))?;
    let key = cli
        .key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .with_context(|| format!("API key missing: pass --key or set {}", ENV_BACKEND_ANON_KEY))?;

    let backend: Arc<dyn MarketBackend> = Arc::new(
        PostgrestBackend::new(url, key, Duration::from_secs(cli.timeout_secs))
            .context("Failed to build backend client")?,
    );
    let marketplace = Marketplace::new(
        backend.clone(),
        Arc::new(ReputationService::new(backend)),
    );

    match cli.command {
        Commands::Temperature { seller_id } => {
            let report = marketplace
                .reputation()
                .temperature(&SellerId::new(seller_id))
                .await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_temperature(&report);
            }
        }
        Commands::Seller { listing_id } => {
            let card = marketplace.seller_card(listing_id).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&card)?);
            } else {
                print_seller_card(&card);
            }
        }
        Commands::Profile { user_id } => {
            let summary = marketplace.profile_summary(&UserId::new(user_id)).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_profile(&summary);
            }
        }
    }

    Ok(())
}

fn colored_temperature(value: f64, display: &str) -> ColoredString {
    if value > BASE_SCORE {
        display.yellow().bold()
    } else if value < BASE_SCORE {
        display.blue()
    } else {
        display.normal()
    }
}

fn source_label(source: ScoreSource) -> ColoredString {
    match source {
        ScoreSource::Aggregate => "aggregate".green(),
        ScoreSource::Fallback => "fallback".cyan(),
        ScoreSource::Base => "base (backend unavailable or invalid id)".red(),
    }
}

fn print_temperature(report: &ScoreReport) {
    println!("Seller:      {}", report.seller_id);
    println!(
        "Temperature: {}",
        colored_temperature(report.temperature.value(), &report.display())
    );
    println!("Source:      {}", source_label(report.source));
}

fn print_seller_card(card: &SellerCard) {
    println!("Listing:     {}", card.listing_id);
    println!("Seller:      {} ({})", card.display_name.bold(), card.seller_id);
    println!(
        "Temperature: {}",
        colored_temperature(card.temperature, &card.display)
    );
    println!("Source:      {}", source_label(card.source));
}

fn print_profile(summary: &ProfileSummary) {
    println!("User:        {} ({})", summary.display_name.bold(), summary.user_id);
    if let Some(email) = &summary.email {
        println!("Email:       {}", email);
    }
    println!(
        "Temperature: {}",
        colored_temperature(summary.temperature, &summary.display)
    );
    println!(
        "Tabs:        selling {} | reserved {} | sold {} | favorites {}",
        summary.counts.selling, summary.counts.reserved, summary.counts.sold, summary.counts.favorites
    );

    print_listings("Listings", &summary.listings);
    print_listings("Favorites", &summary.favorites);
}

fn print_listings(heading: &str, listings: &[Listing]) {
    if listings.is_empty() {
        println!("\n{}: none", heading);
        return;
    }
    println!("\n{} (newest first):", heading);
    for listing in listings {
        println!(
            "  #{:<6} {:<9} {:>10}원  {}",
            listing.id.to_string(),
            listing.status.as_str(),
            listing.price,
            listing.title
        );
    }
}
