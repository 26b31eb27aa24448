//! # checkout-core
//!
//! Core types and collaborator traits for the paypal-checkout-rs engine.
//!
//! This crate provides:
//! - `Money` and `Currency` with exact minor-unit arithmetic
//! - `CheckoutError` for typed error handling
//! - `Session` / `SessionStore` for the per-buyer token cache
//! - `CartSnapshot` and the platform collaborator traits
//!   (`CartStore`, `CustomerStore`, `AddressStore`, `PayPalCustomerStore`,
//!   `LoginTokenStore`, `OrderValidator`) with in-memory implementations
//! - `OrderStatus` and `TransactionDetails` for order finalization

pub mod cart;
pub mod error;
pub mod money;
pub mod order;
pub mod session;
pub mod store;

// Re-exports for convenience
pub use cart::{CartItem, CartSnapshot};
pub use error::{CheckoutError, CheckoutResult};
pub use money::{Currency, Money};
pub use order::{NewOrder, OrderStatus, TransactionDetails};
pub use session::{AccessToken, Session, SessionStore};
pub use store::{
    AddressRecord, AddressStore, CartStore, CustomerRecord, CustomerStore, LoginRecord,
    LoginTokenStore, MemoryAddressStore, MemoryCartStore, MemoryCustomerStore,
    MemoryLoginTokenStore, MemoryOrderValidator, MemoryPayPalCustomerStore, NewAddress,
    NewCustomer, OrderValidator, PayPalCustomer, PayPalCustomerStore, RecordedOrder,
};
