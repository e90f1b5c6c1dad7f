//! Test data helpers
//!
//! Catalog, store profile and order backend doubles, plus builders that put
//! a conversation directly at a given checkpoint.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;

use OrderBuddy::handlers::StoreProfile;
use OrderBuddy::models::{Category, OrderReceipt, PaymentDestination, PaymentMethod, Product, ProductOption};
use OrderBuddy::services::{OrderService, OrderStatus, StaticCatalog, TenantCatalog};
use OrderBuddy::state::{ConversationSnapshot, ConversationState};
use OrderBuddy::{Conversation, OrderBuddyError, Result};

pub const TEST_TENANT: &str = "pizzeria";
pub const OTHER_TENANT: &str = "cafeteria";

pub fn test_pizza() -> Product {
    Product {
        id: "margherita".to_string(),
        category_id: "pizzas".to_string(),
        name: "Margherita".to_string(),
        price: Decimal::new(100, 0),
        description: Some("Tomate, mozzarella y albahaca".to_string()),
        options: vec![
            ProductOption { id: "big".to_string(), name: "Grande".to_string(), price_modifier: Decimal::new(20, 0) },
            ProductOption { id: "cheese".to_string(), name: "Extra queso".to_string(), price_modifier: Decimal::new(5, 0) },
        ],
    }
}

pub fn test_drink() -> Product {
    Product {
        id: "cola".to_string(),
        category_id: "drinks".to_string(),
        name: "Cola".to_string(),
        price: Decimal::new(15, 0),
        description: None,
        options: vec![],
    }
}

fn tenant_catalog() -> TenantCatalog {
    TenantCatalog {
        categories: vec![
            Category { id: "pizzas".to_string(), name: "Pizzas".to_string() },
            Category { id: "drinks".to_string(), name: "Bebidas".to_string() },
        ],
        products: vec![test_pizza(), test_drink()],
    }
}

/// Two tenants with the same menu
pub fn test_catalog() -> StaticCatalog {
    let mut catalog = StaticCatalog::new();
    catalog.insert_tenant(TEST_TENANT, tenant_catalog());
    catalog.insert_tenant(OTHER_TENANT, tenant_catalog());
    catalog
}

pub fn test_store() -> StoreProfile {
    StoreProfile {
        currency_symbol: "$".to_string(),
        delivery_fee: Decimal::new(10, 0),
        payment_destination: PaymentDestination {
            bank_name: "Banco de Prueba".to_string(),
            account_holder: "Pizzería Test".to_string(),
            account_number: "0001-0002-0003".to_string(),
            alias: Some("pizzeria.test".to_string()),
        },
        min_address_length: 10,
        estimated_delivery_minutes: 40,
    }
}

/// Order backend double: counts calls, can be switched to fail
#[derive(Default)]
pub struct FakeOrderService {
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl FakeOrderService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderService for FakeOrderService {
    async fn create_order(&self, conversation: &Conversation) -> Result<OrderReceipt> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail.load(Ordering::SeqCst) {
            return Err(OrderBuddyError::OrderCreation("order backend unavailable".to_string()));
        }
        Ok(OrderReceipt {
            order_id: format!("order-{}", n),
            order_number: format!("#{:05}", n),
            total: conversation.cart().subtotal() + Decimal::new(10, 0),
        })
    }

    async fn order_status(&self, _order_id: &str) -> Result<Option<OrderStatus>> {
        Ok(Some(OrderStatus::AwaitingPayment))
    }
}

/// Snapshot of a conversation at `state` with a two-line cart and the
/// checkout data that state requires
pub fn snapshot_at(user_id: &str, state: ConversationState, method: PaymentMethod) -> ConversationSnapshot {
    let mut snapshot = Conversation::new(TEST_TENANT, user_id).export();
    snapshot.state = state;

    let mut cart = snapshot.cart.clone();
    let pizza = test_pizza();
    cart.add(&pizza, 1, vec![]);
    cart.add(&pizza, 2, vec![(&pizza.options[0]).into()]);
    snapshot.cart = cart;

    if state.requires_address() {
        snapshot.address = Some("Av. Siempre Viva 742".to_string());
    }
    if state.requires_payment_method() {
        snapshot.payment_method = Some(method);
    }
    if state == ConversationState::WaitingExternalPayment {
        snapshot.pending_order_id = Some("order-42".to_string());
    }
    snapshot
}
