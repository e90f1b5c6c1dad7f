//! Conversation context management
//!
//! This module holds the per-(tenant, user) conversation record: current
//! state, cart, checkout data and an append-only transition log. State only
//! changes through [`Conversation::transition`], which consults the
//! transition table, or [`Conversation::force_transition`], which is
//! reserved for session expiry.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Cart, Category, OrderReceipt, PaymentMethod, Product};
use crate::utils::errors::{OrderBuddyError, Result};
use crate::utils::logging;
use super::machine::ConversationState;

/// Composite identity of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationKey {
    pub tenant_id: String,
    pub user_id: String,
}

impl ConversationKey {
    pub fn new(tenant_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
        }
    }
}

impl std::fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.tenant_id, self.user_id)
    }
}

/// One entry of the diagnostics log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: ConversationState,
    pub to: ConversationState,
    pub at: DateTime<Utc>,
    pub forced: bool,
}

/// Data merged into the conversation together with a transition.
///
/// Only the fields that are `Some` are written.
#[derive(Debug, Clone, Default)]
pub struct TransitionData {
    pub category: Option<Category>,
    pub product: Option<Product>,
    pub address: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub pending_order_id: Option<String>,
}

impl TransitionData {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_product(mut self, product: Product) -> Self {
        self.product = Some(product);
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    pub fn with_pending_order(mut self, order_id: impl Into<String>) -> Self {
        self.pending_order_id = Some(order_id.into());
        self
    }
}

/// The per-(tenant, user) state record driving one ordering session
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    key: ConversationKey,
    state: ConversationState,
    pub(crate) cart: Cart,
    pub(crate) selected_category: Option<Category>,
    pub(crate) selected_product: Option<Product>,
    address: Option<String>,
    payment_method: Option<PaymentMethod>,
    pending_order_id: Option<String>,
    pub(crate) last_order: Option<OrderReceipt>,
    last_activity: DateTime<Utc>,
    transition_log: Vec<TransitionRecord>,
}

impl Conversation {
    /// Create a fresh conversation in `Idle`
    pub fn new(tenant_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            key: ConversationKey::new(tenant_id, user_id),
            state: ConversationState::Idle,
            cart: Cart::new(),
            selected_category: None,
            selected_product: None,
            address: None,
            payment_method: None,
            pending_order_id: None,
            last_order: None,
            last_activity: Utc::now(),
            transition_log: Vec::new(),
        }
    }

    pub fn key(&self) -> &ConversationKey {
        &self.key
    }

    pub fn tenant_id(&self) -> &str {
        &self.key.tenant_id
    }

    pub fn user_id(&self) -> &str {
        &self.key.user_id
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn selected_category(&self) -> Option<&Category> {
        self.selected_category.as_ref()
    }

    pub fn selected_product(&self) -> Option<&Product> {
        self.selected_product.as_ref()
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    pub fn pending_order_id(&self) -> Option<&str> {
        self.pending_order_id.as_deref()
    }

    pub fn last_order(&self) -> Option<&OrderReceipt> {
        self.last_order.as_ref()
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn transition_log(&self) -> &[TransitionRecord] {
        &self.transition_log
    }

    /// Move to `target` if the transition table allows it.
    ///
    /// On success the data is merged, the log is appended and the activity
    /// timestamp is refreshed. On rejection nothing changes.
    pub fn transition(&mut self, target: ConversationState, data: TransitionData) -> Result<()> {
        if !self.state.can_transition_to(target) {
            return Err(OrderBuddyError::InvalidTransition {
                from: self.state.to_string(),
                to: target.to_string(),
            });
        }

        self.apply(target, data, false);
        Ok(())
    }

    /// Move to `target` bypassing the table; the log entry is marked forced
    pub fn force_transition(&mut self, target: ConversationState, data: TransitionData) {
        self.apply(target, data, true);
    }

    fn apply(&mut self, target: ConversationState, data: TransitionData, forced: bool) {
        let now = Utc::now();
        let from = self.state;

        if let Some(category) = data.category {
            self.selected_category = Some(category);
        }
        if let Some(product) = data.product {
            self.selected_product = Some(product);
        }
        if let Some(address) = data.address {
            self.address = Some(address);
        }
        if let Some(method) = data.payment_method {
            self.payment_method = Some(method);
        }
        if let Some(order_id) = data.pending_order_id {
            self.pending_order_id = Some(order_id);
        }

        self.state = target;
        self.transition_log.push(TransitionRecord {
            from,
            to: target,
            at: now,
            forced,
        });
        self.last_activity = now;

        logging::log_transition(self.tenant_id(), self.user_id(), from.as_str(), target.as_str(), forced);
    }

    /// Refresh the activity timestamp after an in-place mutation
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Drop the product picked in `SelectingProduct`
    pub fn clear_selection(&mut self) {
        self.selected_product = None;
        self.touch();
    }

    /// Empty the cart without changing state
    pub fn clear_cart(&mut self) {
        self.cart.clear();
        self.touch();
    }

    /// Remember the most recent order for tracking
    pub(crate) fn record_order(&mut self, receipt: OrderReceipt) {
        self.last_order = Some(receipt);
        self.touch();
    }

    /// Forget cart and checkout data once an order has been settled.
    /// `last_order` survives.
    pub(crate) fn settle_order(&mut self) {
        self.cart.clear();
        self.selected_category = None;
        self.selected_product = None;
        self.address = None;
        self.payment_method = None;
        self.pending_order_id = None;
        self.touch();
    }

    /// Forget the pending order after a rejected payment, keeping the cart
    pub(crate) fn abandon_pending_order(&mut self) {
        self.pending_order_id = None;
        self.payment_method = None;
        self.touch();
    }

    /// True iff more than `timeout` has passed since the last activity
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.is_expired_at(Utc::now(), timeout)
    }

    /// Same as [`Conversation::is_expired`] against an explicit clock
    pub fn is_expired_at(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now.signed_duration_since(self.last_activity) > timeout
    }

    /// Clear every business field and return to `Idle` in place.
    ///
    /// The transition log is kept and receives a forced entry.
    pub fn reset_expired(&mut self) {
        self.cart.clear();
        self.selected_category = None;
        self.selected_product = None;
        self.address = None;
        self.payment_method = None;
        self.pending_order_id = None;
        self.last_order = None;
        self.force_transition(ConversationState::Idle, TransitionData::none());
    }

    /// Export every field into a serializable snapshot
    pub fn export(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            version: ConversationSnapshot::CURRENT_VERSION,
            tenant_id: self.key.tenant_id.clone(),
            user_id: self.key.user_id.clone(),
            state: self.state,
            cart: self.cart.clone(),
            selected_category: self.selected_category.clone(),
            selected_product: self.selected_product.clone(),
            address: self.address.clone(),
            payment_method: self.payment_method,
            pending_order_id: self.pending_order_id.clone(),
            last_order: self.last_order.clone(),
            last_activity: self.last_activity,
            transition_log: self.transition_log.clone(),
        }
    }

    /// Rebuild a conversation from a snapshot, checking checkpoint invariants
    pub fn import(snapshot: ConversationSnapshot) -> Result<Self> {
        snapshot.validate()?;

        Ok(Self {
            key: ConversationKey::new(snapshot.tenant_id, snapshot.user_id),
            state: snapshot.state,
            cart: snapshot.cart,
            selected_category: snapshot.selected_category,
            selected_product: snapshot.selected_product,
            address: snapshot.address,
            payment_method: snapshot.payment_method,
            pending_order_id: snapshot.pending_order_id,
            last_order: snapshot.last_order,
            last_activity: snapshot.last_activity,
            transition_log: snapshot.transition_log,
        })
    }

    /// Short summary for logging and debugging
    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            tenant_id: self.key.tenant_id.clone(),
            user_id: self.key.user_id.clone(),
            state: self.state,
            cart_lines: self.cart.len(),
            pending_order_id: self.pending_order_id.clone(),
            last_activity: self.last_activity,
        }
    }
}

/// Lossless export/import representation of a [`Conversation`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    pub version: u32,
    pub tenant_id: String,
    pub user_id: String,
    pub state: ConversationState,
    pub cart: Cart,
    #[serde(default)]
    pub selected_category: Option<Category>,
    #[serde(default)]
    pub selected_product: Option<Product>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub pending_order_id: Option<String>,
    #[serde(default)]
    pub last_order: Option<OrderReceipt>,
    pub last_activity: DateTime<Utc>,
    #[serde(default)]
    pub transition_log: Vec<TransitionRecord>,
}

impl ConversationSnapshot {
    pub const CURRENT_VERSION: u32 = 1;

    /// Reject snapshots that break the checkpoint invariants
    pub fn validate(&self) -> Result<()> {
        if self.version != Self::CURRENT_VERSION {
            return Err(OrderBuddyError::Snapshot(format!(
                "unsupported snapshot version {}", self.version
            )));
        }
        if self.tenant_id.is_empty() || self.user_id.is_empty() {
            return Err(OrderBuddyError::Snapshot("tenant id and user id are required".to_string()));
        }
        if self.cart.lines().iter().any(|line| line.quantity == 0) {
            return Err(OrderBuddyError::Snapshot("cart line with zero quantity".to_string()));
        }
        if self.state.requires_address() && self.address.as_deref().map_or(true, str::is_empty) {
            return Err(OrderBuddyError::Snapshot(format!("state {} requires an address", self.state)));
        }
        if self.state.requires_payment_method() && self.payment_method.is_none() {
            return Err(OrderBuddyError::Snapshot(format!("state {} requires a payment method", self.state)));
        }
        if self.state == ConversationState::WaitingExternalPayment && self.pending_order_id.is_none() {
            return Err(OrderBuddyError::Snapshot("waiting for payment without a pending order".to_string()));
        }
        if self.state == ConversationState::AddingToCart && self.selected_product.is_none() {
            return Err(OrderBuddyError::Snapshot("adding to cart without a selected product".to_string()));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Conversation summary for logging and debugging
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub tenant_id: String,
    pub user_id: String,
    pub state: ConversationState,
    pub cart_lines: usize,
    pub pending_order_id: Option<String>,
    pub last_activity: DateTime<Utc>,
}
