use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pay_verifier::{verify_callback, VerifierConfig};

/// Confirm a payment gateway callback and print where the customer goes next.
#[derive(Debug, Parser)]
#[command(name = "pay-verifier", version)]
struct Cli {
    /// Callback URL (or query string) carrying the gateway `reference`
    #[arg(env = "PAYMENT_CALLBACK_URL")]
    callback_url: String,

    /// Print Prometheus counters after the flow finishes
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = VerifierConfig::from_env()?;
    tracing::info!(api_url = %config.api_url, "payment verifier starting");

    let destination = verify_callback(&config, &cli.callback_url).await?;
    println!("{}", destination.to_path());

    if cli.metrics {
        print!("{}", storefront_pay::metrics::metrics_output());
    }

    Ok(())
}
