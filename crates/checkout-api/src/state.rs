//! # Application State
//!
//! Shared state for the Axum application: the checkout flow wired to the
//! provider gateway, the platform stores, and server configuration.

use crate::flow::CheckoutFlow;
use checkout_core::{
    AddressStore, CartItem, CartSnapshot, CartStore, Currency, CustomerStore, LoginTokenStore,
    MemoryAddressStore, MemoryCartStore, MemoryCustomerStore, MemoryLoginTokenStore,
    MemoryOrderValidator, MemoryPayPalCustomerStore, OrderValidator, PayPalCustomerStore,
    SessionStore,
};
use checkout_paypal::{PayPalApi, PayPalConfig, PayPalGateway};
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> std::net::SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Invalid socket address")
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The checkout flow controller
    pub flow: CheckoutFlow,
    /// Direct gateway access for the in-context validation and login paths
    pub gateway: Arc<dyn PayPalApi>,
    pub carts: Arc<dyn CartStore>,
    pub customers: Arc<dyn CustomerStore>,
    pub addresses: Arc<dyn AddressStore>,
    pub paypal_customers: Arc<dyn PayPalCustomerStore>,
    pub login_tokens: Arc<dyn LoginTokenStore>,
    pub orders: Arc<dyn OrderValidator>,
    pub sessions: Arc<SessionStore>,
    /// Provider configuration
    pub paypal: PayPalConfig,
    /// Server configuration
    pub config: AppConfig,
}

impl AppState {
    /// Create a new AppState with the gateway configured from the
    /// environment and in-memory platform stores.
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        let gateway = PayPalGateway::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize PayPal gateway: {}", e))?;
        let paypal = gateway.config().clone();

        // The in-memory cart store starts empty; seed the development
        // fixture so the binary can serve a checkout out of the box.
        let carts = Arc::new(MemoryCartStore::new());
        match demo_cart(&config) {
            Some(cart) => {
                tracing::info!(cart_id = cart.id, "Seeded demo cart");
                carts.put(cart);
            }
            None => {
                tracing::warn!("No carts seeded; /checkout/paypal/start will return 404")
            }
        }

        Ok(Self::with_carts(Arc::new(gateway), carts, paypal, config))
    }

    /// Wire the state around an explicit gateway (used by tests)
    pub fn with_gateway(
        gateway: Arc<dyn PayPalApi>,
        paypal: PayPalConfig,
        config: AppConfig,
    ) -> Self {
        Self::with_carts(gateway, Arc::new(MemoryCartStore::new()), paypal, config)
    }

    /// Wire the state around an explicit gateway and cart store
    pub fn with_carts(
        gateway: Arc<dyn PayPalApi>,
        carts: Arc<dyn CartStore>,
        paypal: PayPalConfig,
        config: AppConfig,
    ) -> Self {
        let customers: Arc<dyn CustomerStore> = Arc::new(MemoryCustomerStore::new());
        let addresses: Arc<dyn AddressStore> = Arc::new(MemoryAddressStore::new());
        let paypal_customers: Arc<dyn PayPalCustomerStore> =
            Arc::new(MemoryPayPalCustomerStore::new());
        let login_tokens: Arc<dyn LoginTokenStore> = Arc::new(MemoryLoginTokenStore::new());
        let orders: Arc<dyn OrderValidator> = Arc::new(MemoryOrderValidator::new());
        let sessions = Arc::new(SessionStore::new());

        let flow = CheckoutFlow::new(
            gateway.clone(),
            carts.clone(),
            customers.clone(),
            addresses.clone(),
            paypal_customers.clone(),
            orders.clone(),
            sessions.clone(),
            paypal.clone(),
        );

        Self {
            flow,
            gateway,
            carts,
            customers,
            addresses,
            paypal_customers,
            login_tokens,
            orders,
            sessions,
            paypal,
            config,
        }
    }
}

/// Development cart fixture.
///
/// Enabled by default outside production; set `DEMO_CART=1` to force it on
/// or `DEMO_CART=0` to disable it.
fn demo_cart(config: &AppConfig) -> Option<CartSnapshot> {
    let enabled = match std::env::var("DEMO_CART") {
        Ok(value) => value == "1" || value.eq_ignore_ascii_case("true"),
        Err(_) => !config.is_production(),
    };
    if !enabled {
        return None;
    }

    Some(CartSnapshot {
        id: 1,
        customer_id: None,
        currency: Currency::USD,
        items: vec![
            CartItem::new("Demo widget", 2, 18.0, 19.8),
            CartItem::new("Demo gadget", 1, 9.0, 9.9),
        ],
        total_with_tax: 54.0,
        total_without_tax: 49.5,
        shipping_without_tax: 3.5,
        gift_wrap_without_tax: 1.0,
        delivery_address_id: None,
        invoice_address_id: None,
        carrier_id: Some(1),
        delivery_options: vec![1],
        secure_key: uuid::Uuid::new_v4().to_string(),
    })
}
