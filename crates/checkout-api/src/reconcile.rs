//! # Customer and Address Reconciliation
//!
//! Maps the payer identity and shipping address the provider reports onto
//! local customer and address records. Reconciliation is conservative:
//! customers are matched by email before any account is created, provider
//! addresses are tagged with a well-known alias and reused when their fields
//! match, and an address missing a required field aborts into the manual
//! order path instead of guessing.

use checkout_core::{
    AddressRecord, AddressStore, CheckoutError, CheckoutResult, CustomerRecord, CustomerStore,
    NewAddress, NewCustomer, PayPalCustomerStore, Session,
};
use checkout_paypal::{PayerInfo, ShippingAddress};
use tracing::info;

/// Alias tagging every address record created from provider shipping data
pub const PAYPAL_ADDRESS_ALIAS: &str = "PayPal address";

/// Resolve the local customer for a payer.
///
/// A logged-in session keeps its customer; otherwise the payer email is
/// matched against existing accounts, and only if no account exists a new
/// guest account is created with a random password. In every case the
/// (customer, email) mapping is recorded once.
pub fn reconcile_customer(
    session: &Session,
    payer: &PayerInfo,
    customers: &dyn CustomerStore,
    mappings: &dyn PayPalCustomerStore,
) -> CheckoutResult<CustomerRecord> {
    let email = payer
        .email
        .as_deref()
        .filter(|e| !e.is_empty())
        .ok_or_else(|| CheckoutError::Validation("payer has no email".to_string()))?;

    if session.logged_in {
        if let Some(customer_id) = session.customer_id {
            let customer = customers.get(customer_id).ok_or_else(|| {
                CheckoutError::NotFound(format!("customer {}", customer_id))
            })?;
            mappings.insert(customer.id, email)?;
            return Ok(customer);
        }
    }

    if let Some(customer) = customers.find_by_email(email) {
        mappings.insert(customer.id, email)?;
        return Ok(customer);
    }

    let (first_name, last_name) = payer_name(payer);
    let customer = customers.create(NewCustomer {
        email: email.to_string(),
        first_name,
        last_name,
        is_guest: true,
        password: uuid::Uuid::new_v4().to_string(),
    })?;
    info!("Created guest account {} for payer", customer.id);
    mappings.insert(customer.id, email)?;
    Ok(customer)
}

/// Resolve the local address record for a provider shipping address.
///
/// An existing address of this customer with the same street, city, postal
/// code and country is reused; otherwise a new record tagged with
/// [`PAYPAL_ADDRESS_ALIAS`] is created. A shipping address missing any of
/// the required fields fails validation and the buyer completes the order
/// through the manual address step.
pub fn reconcile_address(
    customer: &CustomerRecord,
    shipping: &ShippingAddress,
    payer: &PayerInfo,
    addresses: &dyn AddressStore,
) -> CheckoutResult<AddressRecord> {
    let line1 = required_field(&shipping.line1, "line1")?;
    let city = required_field(&shipping.city, "city")?;
    let postal_code = required_field(&shipping.postal_code, "postal_code")?;
    let country_code = required_field(&shipping.country_code, "country_code")?;

    if let Some(existing) = addresses
        .for_customer(customer.id)
        .into_iter()
        .find(|a| address_matches(a, &line1, &city, &postal_code, &country_code))
    {
        return Ok(existing);
    }

    let (first_name, last_name) = recipient_name(shipping, payer);
    let address = addresses.create(NewAddress {
        customer_id: customer.id,
        alias: PAYPAL_ADDRESS_ALIAS.to_string(),
        first_name,
        last_name,
        line1,
        line2: shipping.line2.clone(),
        city,
        postal_code,
        country_code,
        state_code: shipping.state.clone(),
        phone: shipping.phone.clone(),
    })?;
    info!(
        "Created address {} for customer {} from shipping data",
        address.id, customer.id
    );
    Ok(address)
}

/// True if the provider shipping address differs from the stored record.
///
/// `None` for the stored side always differs: a cart without a delivery
/// address must pick one up from the provider.
pub fn address_differs(shipping: &ShippingAddress, stored: Option<&AddressRecord>) -> bool {
    let stored = match stored {
        Some(stored) => stored,
        None => return true,
    };
    !(field_eq(&shipping.line1, &stored.line1)
        && field_eq(&shipping.city, &stored.city)
        && field_eq(&shipping.postal_code, &stored.postal_code)
        && field_eq(&shipping.country_code, &stored.country_code))
}

/// Split `recipient_name` into (first, last) on the first space; falls back
/// to the payer's own name fields when the recipient name is absent.
pub fn recipient_name(shipping: &ShippingAddress, payer: &PayerInfo) -> (String, String) {
    if let Some(name) = shipping.recipient_name.as_deref() {
        let name = name.trim();
        if !name.is_empty() {
            return match name.split_once(' ') {
                Some((first, last)) => (first.to_string(), last.trim().to_string()),
                None => (name.to_string(), String::new()),
            };
        }
    }
    payer_name(payer)
}

fn payer_name(payer: &PayerInfo) -> (String, String) {
    (
        payer.first_name.clone().unwrap_or_default(),
        payer.last_name.clone().unwrap_or_default(),
    )
}

fn required_field(value: &Option<String>, name: &str) -> CheckoutResult<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .ok_or_else(|| {
            CheckoutError::Validation(format!("shipping address missing {}", name))
        })
}

fn address_matches(
    record: &AddressRecord,
    line1: &str,
    city: &str,
    postal_code: &str,
    country_code: &str,
) -> bool {
    str_eq(&record.line1, line1)
        && str_eq(&record.city, city)
        && str_eq(&record.postal_code, postal_code)
        && str_eq(&record.country_code, country_code)
}

fn field_eq(provider: &Option<String>, stored: &str) -> bool {
    provider
        .as_deref()
        .map(|v| str_eq(v, stored))
        .unwrap_or(false)
}

fn str_eq(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
