//! # PayPal-Checkout RS
//!
//! Redirect checkout server for PayPal REST payments.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export PAYPAL_CLIENT_ID=A21AA...
//! export PAYPAL_CLIENT_SECRET=EC-...
//! export PAYPAL_SANDBOX=true
//!
//! # Run the server
//! paypal-checkout
//! ```

use checkout_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Print banner
    print_banner();

    // Initialize application state
    let state = AppState::new()?;

    let addr = state.config.socket_addr();
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!(
        "PayPal host: {} (sandbox: {})",
        state.paypal.api_base_url, state.paypal.sandbox
    );
    info!("Immediate capture: {}", state.paypal.immediate_capture);

    // Create router
    let app = routes::create_router(state);

    // Start server
    info!("🚀 PayPal-Checkout starting on http://{}", addr);

    if !is_prod {
        info!("📝 Health: http://{}/health", addr);
        info!("💳 Start checkout: GET http://{}/checkout/paypal/start?cart_id=...", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  💳 PayPal-Checkout RS 💳
  ━━━━━━━━━━━━━━━━━━━━━━━━
  Redirect checkout engine
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
