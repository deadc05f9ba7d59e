//! Checkout CLI
//!
//! Operator tooling for the manual reconciliation paths: poll the invoicing
//! provider for an invoice status, test connectivity/configuration, and run
//! rate diagnostics.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use checkout_types::{InvoicingGateway, Money};
use exchange_rates::{Converter, Currency, FixedRates};
use invoicing_client::{InvoicingClient, InvoicingConfig};

#[derive(Parser)]
#[command(name = "checkout")]
#[command(author, version, about = "Checkout service operator CLI", long_about = None)]
struct Cli {
    /// Base URL of the invoicing provider
    #[arg(long, env = "INVOICING_BASE_URL")]
    invoicing_base_url: String,

    /// Provider OAuth client id
    #[arg(long, env = "INVOICING_CLIENT_ID", default_value = "")]
    client_id: String,

    /// Provider OAuth client secret
    #[arg(long, env = "INVOICING_CLIENT_SECRET", default_value = "")]
    client_secret: String,

    /// Provider refresh token
    #[arg(long, env = "INVOICING_REFRESH_TOKEN", default_value = "")]
    refresh_token: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Invoice operations against the provider
    Invoice {
        #[command(subcommand)]
        action: InvoiceCommands,
    },
    /// Check provider connectivity and configuration
    Ping,
    /// Convert an amount between supported currencies (hard-fails on a
    /// rate-source outage instead of degrading)
    Convert {
        /// Amount in minor units (cents, paise)
        amount: i64,
        /// Source currency (USD, EUR, INR)
        from: String,
        /// Target currency (USD, EUR, INR)
        to: String,
    },
}

#[derive(Subcommand)]
enum InvoiceCommands {
    /// Poll the provider for an invoice's status
    Status {
        /// Provider invoice ID
        id: String,
    },
}

fn parse_currency(s: &str) -> Result<Currency> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("Unknown currency: {}. Supported: USD, EUR, INR", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let client = InvoicingClient::new(InvoicingConfig {
        base_url: cli.invoicing_base_url.clone(),
        client_id: cli.client_id.clone(),
        client_secret: cli.client_secret.clone(),
        refresh_token: cli.refresh_token.clone(),
    });

    match cli.command {
        Commands::Ping => match client.ping().await {
            Ok(()) => println!("✓ Invoicing provider is reachable"),
            Err(e) => {
                println!("✗ Invoicing provider check failed: {}", e);
                std::process::exit(1);
            }
        },

        Commands::Invoice { action } => match action {
            InvoiceCommands::Status { id } => {
                let snapshot = client.invoice_status(&id).await?;
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            }
        },

        Commands::Convert { amount, from, to } => {
            let from = parse_currency(&from)?;
            let to = parse_currency(&to)?;
            let converter = Converter::new(Arc::new(FixedRates::new()));
            let converted = converter.convert_checked(amount, from, to)?;
            match (Money::new(amount, from), Money::new(converted, to)) {
                (Ok(source), Ok(target)) => println!("{} -> {}", source, target),
                _ => println!("{} {} -> {} {}", amount, from.code(), converted, to.code()),
            }
        }
    }

    Ok(())
}
