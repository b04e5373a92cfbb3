//! Storefront demo binary
//!
//! Runs one scripted shopper against a file-backed catalog and a local order
//! gateway.
//!
//! # Usage
//!
//! ```bash
//! STOREFRONT_PICKS=3 RUST_LOG=debug cargo run --bin storefront
//! ```

use storefront_demo::{Config, FileShopApi};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_filter))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    tracing::info!(
        catalog = %config.catalog.path.display(),
        api = %config.gateway.api_url,
        picks = config.session.picks,
        "Configuration loaded"
    );

    let api = FileShopApi::from_config(&config);
    let report = storefront_demo::run(&api, &config.session).await?;

    println!("=== Storefront session ===");
    println!("Catalog entries: {}", report.catalog_len);
    println!("Events on the bus: {}", report.events);
    match &report.order {
        Some(order) => println!("Order {} accepted, total {}", order.id, order.total),
        None => println!("No order was placed"),
    }
    println!("Basket left with {} item(s)", report.basket.len());
    println!("Checkout step: {}", report.step);

    Ok(())
}
