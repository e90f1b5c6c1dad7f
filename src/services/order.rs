//! Order service
//!
//! Order persistence and payment processing live outside this crate. The
//! checkout handler talks to them through [`OrderService`].
//! [`InMemoryOrderBook`] is the bundled implementation used when no backend
//! is wired in.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{CartLine, OrderReceipt, OrderSummary, PaymentMethod};
use crate::state::Conversation;
use crate::utils::errors::{OrderBuddyError, Result};

/// Lifecycle of an order as far as the customer can see it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    AwaitingPayment,
    Confirmed,
    PaymentRejected,
}

impl OrderStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::AwaitingPayment => "esperando pago",
            OrderStatus::Confirmed => "confirmado, en preparación",
            OrderStatus::PaymentRejected => "pago rechazado",
        }
    }
}

/// Order creation backend
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Create an order from a conversation at `CheckoutConfirm`
    async fn create_order(&self, conversation: &Conversation) -> Result<OrderReceipt>;

    /// Current status of an order, when the backend tracks it
    async fn order_status(&self, _order_id: &str) -> Result<Option<OrderStatus>> {
        Ok(None)
    }
}

/// An order held by [`InMemoryOrderBook`]
#[derive(Debug, Clone, Serialize)]
pub struct StoredOrder {
    pub receipt: OrderReceipt,
    pub tenant_id: String,
    pub user_id: String,
    pub lines: Vec<CartLine>,
    pub address: String,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// Process-local order book
#[derive(Debug)]
pub struct InMemoryOrderBook {
    delivery_fee: Decimal,
    next_number: AtomicU64,
    orders: DashMap<String, StoredOrder>,
}

impl InMemoryOrderBook {
    pub fn new(delivery_fee: Decimal) -> Self {
        Self {
            delivery_fee,
            next_number: AtomicU64::new(1),
            orders: DashMap::new(),
        }
    }

    /// Look up a stored order
    pub fn get(&self, order_id: &str) -> Option<StoredOrder> {
        self.orders.get(order_id).map(|o| o.clone())
    }

    /// Record the outcome of an external payment
    pub fn record_payment(&self, order_id: &str, approved: bool) -> Result<()> {
        let mut order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| OrderBuddyError::InvalidInput(format!("unknown order {}", order_id)))?;
        order.status = if approved { OrderStatus::Confirmed } else { OrderStatus::PaymentRejected };
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[async_trait]
impl OrderService for InMemoryOrderBook {
    async fn create_order(&self, conversation: &Conversation) -> Result<OrderReceipt> {
        if conversation.cart().is_empty() {
            return Err(OrderBuddyError::OrderCreation("cart is empty".to_string()));
        }
        let address = conversation
            .address()
            .ok_or_else(|| OrderBuddyError::OrderCreation("missing delivery address".to_string()))?;
        let payment_method = conversation
            .payment_method()
            .ok_or_else(|| OrderBuddyError::OrderCreation("missing payment method".to_string()))?;

        let summary = OrderSummary::compute(conversation.cart(), self.delivery_fee);
        let number = self.next_number.fetch_add(1, Ordering::SeqCst);
        let receipt = OrderReceipt {
            order_id: uuid::Uuid::new_v4().to_string(),
            order_number: format!("#{:05}", number),
            total: summary.total,
        };

        let status = if payment_method.requires_external_confirmation() {
            OrderStatus::AwaitingPayment
        } else {
            OrderStatus::Confirmed
        };

        self.orders.insert(
            receipt.order_id.clone(),
            StoredOrder {
                receipt: receipt.clone(),
                tenant_id: conversation.tenant_id().to_string(),
                user_id: conversation.user_id().to_string(),
                lines: conversation.cart().lines().to_vec(),
                address: address.to_string(),
                payment_method,
                status,
                created_at: Utc::now(),
            },
        );

        debug!(order_id = %receipt.order_id, order_number = %receipt.order_number, "Order stored");
        Ok(receipt)
    }

    async fn order_status(&self, order_id: &str) -> Result<Option<OrderStatus>> {
        Ok(self.orders.get(order_id).map(|o| o.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Product;
    use crate::state::{ConversationState, TransitionData};
    use assert_matches::assert_matches;

    fn confirmable_conversation(method: PaymentMethod) -> Conversation {
        let mut conversation = Conversation::new("shop", "1");
        let product = Product {
            id: "p1".to_string(),
            category_id: "c1".to_string(),
            name: "Pizza".to_string(),
            price: Decimal::new(100, 0),
            description: None,
            options: vec![],
        };
        conversation.cart.add(&product, 2, vec![]);
        conversation.force_transition(
            ConversationState::CheckoutConfirm,
            TransitionData::none().with_address("Calle Falsa 123").with_payment_method(method),
        );
        conversation
    }

    #[tokio::test]
    async fn test_create_order_assigns_sequential_numbers() {
        let book = InMemoryOrderBook::new(Decimal::new(10, 0));
        let conversation = confirmable_conversation(PaymentMethod::Cash);

        let first = book.create_order(&conversation).await.unwrap();
        let second = book.create_order(&conversation).await.unwrap();

        assert_eq!(first.order_number, "#00001");
        assert_eq!(second.order_number, "#00002");
        assert_ne!(first.order_id, second.order_id);
        assert_eq!(first.total, Decimal::new(210, 0));
        assert_eq!(book.len(), 2);
    }

    #[tokio::test]
    async fn test_bank_transfer_orders_await_payment() {
        let book = InMemoryOrderBook::new(Decimal::ZERO);
        let receipt = book
            .create_order(&confirmable_conversation(PaymentMethod::BankTransfer))
            .await
            .unwrap();

        assert_eq!(book.order_status(&receipt.order_id).await.unwrap(), Some(OrderStatus::AwaitingPayment));
        book.record_payment(&receipt.order_id, true).unwrap();
        assert_eq!(book.order_status(&receipt.order_id).await.unwrap(), Some(OrderStatus::Confirmed));
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let book = InMemoryOrderBook::new(Decimal::ZERO);
        let conversation = Conversation::new("shop", "1");
        assert_matches!(book.create_order(&conversation).await, Err(OrderBuddyError::OrderCreation(_)));
        assert!(book.is_empty());
    }
}
