//! # Collaborator Stores
//!
//! Narrow interfaces to the merchant platform's domain records: carts,
//! customers, addresses, the customer-to-PayPal-email mapping, stored login
//! tokens, and order validation. The platform owns these records; the
//! checkout flow consumes them through these traits.
//!
//! In-memory implementations back the server binary defaults and the tests.

use crate::cart::CartSnapshot;
use crate::error::{CheckoutError, CheckoutResult};
use crate::order::NewOrder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

// =============================================================================
// Records
// =============================================================================

/// A platform customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: u64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Guest accounts get the guest confirmation view after checkout
    pub is_guest: bool,
    pub secure_key: String,
}

/// Fields for creating a customer from provider payer data
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_guest: bool,
    /// Random unsecured-login password; the account is PayPal-authenticated
    pub password: String,
}

/// A platform address record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressRecord {
    pub id: u64,
    pub customer_id: u64,
    /// Well-known alias tagging provider-created addresses
    pub alias: String,
    pub first_name: String,
    pub last_name: String,
    pub line1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Fields for creating an address from provider shipping data
#[derive(Debug, Clone)]
pub struct NewAddress {
    pub customer_id: u64,
    pub alias: String,
    pub first_name: String,
    pub last_name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country_code: String,
    pub state_code: Option<String>,
    pub phone: Option<String>,
}

/// Local-customer-to-PayPal-email mapping.
///
/// Created once per unique (customer, email) pair; never updated in place,
/// never deleted by this flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayPalCustomer {
    pub customer_id: u64,
    pub paypal_email: String,
}

/// A stored login-token record for the popup login callback
#[derive(Debug, Clone)]
pub struct LoginRecord {
    pub token: String,
    pub customer_id: u64,
    /// Provider access token re-verified against the identity endpoint
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

// =============================================================================
// Traits
// =============================================================================

pub trait CartStore: Send + Sync {
    fn get(&self, cart_id: u64) -> Option<CartSnapshot>;
    fn update(&self, cart: &CartSnapshot) -> CheckoutResult<()>;
}

pub trait CustomerStore: Send + Sync {
    fn get(&self, customer_id: u64) -> Option<CustomerRecord>;
    fn find_by_email(&self, email: &str) -> Option<CustomerRecord>;
    fn create(&self, customer: NewCustomer) -> CheckoutResult<CustomerRecord>;
}

pub trait AddressStore: Send + Sync {
    fn get(&self, address_id: u64) -> Option<AddressRecord>;
    fn for_customer(&self, customer_id: u64) -> Vec<AddressRecord>;
    fn create(&self, address: NewAddress) -> CheckoutResult<AddressRecord>;
}

pub trait PayPalCustomerStore: Send + Sync {
    fn find_by_email(&self, email: &str) -> Option<PayPalCustomer>;
    fn insert(&self, customer_id: u64, email: &str) -> CheckoutResult<PayPalCustomer>;
}

pub trait LoginTokenStore: Send + Sync {
    fn find(&self, token: &str) -> Option<LoginRecord>;
    fn insert(&self, record: LoginRecord) -> CheckoutResult<()>;
}

/// Order validation collaborator: records the order against the cart,
/// currency and secure customer key, returning the new order id.
pub trait OrderValidator: Send + Sync {
    fn validate_order(&self, order: NewOrder) -> CheckoutResult<u64>;
}

// =============================================================================
// In-memory implementations
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryCartStore {
    carts: Mutex<HashMap<u64, CartSnapshot>>,
}

impl MemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, cart: CartSnapshot) {
        self.carts.lock().expect("cart store poisoned").insert(cart.id, cart);
    }
}

impl CartStore for MemoryCartStore {
    fn get(&self, cart_id: u64) -> Option<CartSnapshot> {
        self.carts.lock().expect("cart store poisoned").get(&cart_id).cloned()
    }

    fn update(&self, cart: &CartSnapshot) -> CheckoutResult<()> {
        let mut carts = self.carts.lock().expect("cart store poisoned");
        if !carts.contains_key(&cart.id) {
            return Err(CheckoutError::NotFound(format!("cart {}", cart.id)));
        }
        carts.insert(cart.id, cart.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryCustomerStore {
    customers: Mutex<HashMap<u64, CustomerRecord>>,
    next_id: Mutex<u64>,
}

impl MemoryCustomerStore {
    pub fn new() -> Self {
        Self {
            customers: Mutex::new(HashMap::new()),
            next_id: Mutex::new(1),
        }
    }

    pub fn put(&self, customer: CustomerRecord) {
        self.customers
            .lock()
            .expect("customer store poisoned")
            .insert(customer.id, customer);
    }
}

impl CustomerStore for MemoryCustomerStore {
    fn get(&self, customer_id: u64) -> Option<CustomerRecord> {
        self.customers
            .lock()
            .expect("customer store poisoned")
            .get(&customer_id)
            .cloned()
    }

    fn find_by_email(&self, email: &str) -> Option<CustomerRecord> {
        self.customers
            .lock()
            .expect("customer store poisoned")
            .values()
            .find(|c| c.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    fn create(&self, customer: NewCustomer) -> CheckoutResult<CustomerRecord> {
        let mut next = self.next_id.lock().expect("customer store poisoned");
        let id = *next;
        *next += 1;
        let record = CustomerRecord {
            id,
            email: customer.email,
            first_name: customer.first_name,
            last_name: customer.last_name,
            is_guest: customer.is_guest,
            secure_key: uuid::Uuid::new_v4().to_string(),
        };
        self.customers
            .lock()
            .expect("customer store poisoned")
            .insert(id, record.clone());
        Ok(record)
    }
}

#[derive(Debug, Default)]
pub struct MemoryAddressStore {
    addresses: Mutex<HashMap<u64, AddressRecord>>,
    next_id: Mutex<u64>,
}

impl MemoryAddressStore {
    pub fn new() -> Self {
        Self {
            addresses: Mutex::new(HashMap::new()),
            next_id: Mutex::new(1),
        }
    }

    pub fn put(&self, address: AddressRecord) {
        self.addresses
            .lock()
            .expect("address store poisoned")
            .insert(address.id, address);
    }
}

impl AddressStore for MemoryAddressStore {
    fn get(&self, address_id: u64) -> Option<AddressRecord> {
        self.addresses
            .lock()
            .expect("address store poisoned")
            .get(&address_id)
            .cloned()
    }

    fn for_customer(&self, customer_id: u64) -> Vec<AddressRecord> {
        let mut found: Vec<AddressRecord> = self
            .addresses
            .lock()
            .expect("address store poisoned")
            .values()
            .filter(|a| a.customer_id == customer_id)
            .cloned()
            .collect();
        found.sort_by_key(|a| a.id);
        found
    }

    fn create(&self, address: NewAddress) -> CheckoutResult<AddressRecord> {
        let mut next = self.next_id.lock().expect("address store poisoned");
        let id = *next;
        *next += 1;
        let record = AddressRecord {
            id,
            customer_id: address.customer_id,
            alias: address.alias,
            first_name: address.first_name,
            last_name: address.last_name,
            line1: address.line1,
            line2: address.line2,
            city: address.city,
            postal_code: address.postal_code,
            country_code: address.country_code,
            state_code: address.state_code,
            phone: address.phone,
        };
        self.addresses
            .lock()
            .expect("address store poisoned")
            .insert(id, record.clone());
        Ok(record)
    }
}

#[derive(Debug, Default)]
pub struct MemoryPayPalCustomerStore {
    mappings: Mutex<Vec<PayPalCustomer>>,
}

impl MemoryPayPalCustomerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PayPalCustomerStore for MemoryPayPalCustomerStore {
    fn find_by_email(&self, email: &str) -> Option<PayPalCustomer> {
        self.mappings
            .lock()
            .expect("mapping store poisoned")
            .iter()
            .find(|m| m.paypal_email.eq_ignore_ascii_case(email))
            .cloned()
    }

    fn insert(&self, customer_id: u64, email: &str) -> CheckoutResult<PayPalCustomer> {
        let mut mappings = self.mappings.lock().expect("mapping store poisoned");
        // Insert-once per (customer, email) pair
        if let Some(existing) = mappings
            .iter()
            .find(|m| m.customer_id == customer_id && m.paypal_email.eq_ignore_ascii_case(email))
        {
            return Ok(existing.clone());
        }
        let mapping = PayPalCustomer {
            customer_id,
            paypal_email: email.to_string(),
        };
        mappings.push(mapping.clone());
        Ok(mapping)
    }
}

#[derive(Debug, Default)]
pub struct MemoryLoginTokenStore {
    records: Mutex<HashMap<String, LoginRecord>>,
}

impl MemoryLoginTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoginTokenStore for MemoryLoginTokenStore {
    fn find(&self, token: &str) -> Option<LoginRecord> {
        self.records
            .lock()
            .expect("login store poisoned")
            .get(token)
            .cloned()
    }

    fn insert(&self, record: LoginRecord) -> CheckoutResult<()> {
        self.records
            .lock()
            .expect("login store poisoned")
            .insert(record.token.clone(), record);
        Ok(())
    }
}

/// Recorded order, kept for inspection by the confirmation views and tests
#[derive(Debug, Clone)]
pub struct RecordedOrder {
    pub id: u64,
    pub order: NewOrder,
}

#[derive(Debug, Default)]
pub struct MemoryOrderValidator {
    orders: Mutex<Vec<RecordedOrder>>,
    next_id: Mutex<u64>,
}

impl MemoryOrderValidator {
    pub fn new() -> Self {
        Self {
            orders: Mutex::new(Vec::new()),
            next_id: Mutex::new(1),
        }
    }

    pub fn orders(&self) -> Vec<RecordedOrder> {
        self.orders.lock().expect("order store poisoned").clone()
    }
}

impl OrderValidator for MemoryOrderValidator {
    fn validate_order(&self, order: NewOrder) -> CheckoutResult<u64> {
        let mut next = self.next_id.lock().expect("order store poisoned");
        let id = *next;
        *next += 1;
        self.orders
            .lock()
            .expect("order store poisoned")
            .push(RecordedOrder { id, order });
        Ok(id)
    }
}
