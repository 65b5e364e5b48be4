//! Runs one stablecoin-funded merchant QR payment.
//!
//! # Usage
//!
//! ```bash
//! # Credentials from the environment (or a .env file)
//! API_KEY=... BASE_URL=https://api.example.com USER_ID=... qrpay
//!
//! # Skip the balance wait on the next poll
//! echo "waitForBalance=false" > config.txt
//!
//! # Configure logging level
//! RUST_LOG=debug qrpay
//! ```
//!
//! Exits with 0 once the payment completes or is cancelled, 1 on any failure.

use clap::Parser;
use qrpay::wait::FileWaitControl;
use qrpay::{BalanceOutcome, FlowReport, PaymentFlow};
use qrpay_cli::util::SigDown;
use qrpay_cli::{Cli, RunError};
use qrpay_http::PaymentApiClient;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    match run(cli).await {
        Ok(report) => {
            tracing::info!(
                id = %report.payment_id,
                outcome = ?report.outcome,
                "Payment flow finished"
            );
        }
        Err(e) => {
            if let Some(payload) = e.payload() {
                tracing::error!(%payload, "Payment flow failed: {e}");
            } else {
                tracing::error!("Payment flow failed: {e}");
            }
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<FlowReport, RunError> {
    let config = cli.into_config()?;
    tracing::info!(
        base_url = %config.credentials.base_url,
        user = %config.settings.user_id,
        symbol = %config.settings.symbol,
        network = %config.settings.network,
        wait_control = %config.wait_control_file.display(),
        "Loaded configuration"
    );

    let mut client = PaymentApiClient::from_credentials(&config.credentials)?;
    if let Some(timeout) = config.request_timeout {
        client = client.with_timeout(timeout);
    }

    let sig_down = SigDown::try_new().map_err(RunError::Signal)?;
    let flow = PaymentFlow::new(
        client,
        FileWaitControl::new(config.wait_control_file),
        config.settings,
    )
    .with_cancellation(sig_down.cancellation_token());

    let result = flow.run().await;
    sig_down.shutdown().await;
    let report = result?;

    if report.balance == BalanceOutcome::Skipped {
        tracing::warn!("Payment was submitted without waiting for funds");
    }
    Ok(report)
}
