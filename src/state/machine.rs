//! Ordering flow states and the transition table
//!
//! The set of states and the moves between them are fixed at build time.
//! `Idle` doubles as the universal return-to-start target.

use serde::{Deserialize, Serialize};

/// One stage of the ordering flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    #[default]
    Idle,
    Greeting,
    BrowsingMenu,
    SelectingCategory,
    SelectingProduct,
    AddingToCart,
    ViewingCart,
    CheckoutAddress,
    CheckoutPayment,
    CheckoutConfirm,
    WaitingExternalPayment,
    OrderPlaced,
    TrackingOrder,
    Support,
    AdminCommand,
}

impl ConversationState {
    /// Every state, in declaration order
    pub const ALL: [ConversationState; 15] = [
        ConversationState::Idle,
        ConversationState::Greeting,
        ConversationState::BrowsingMenu,
        ConversationState::SelectingCategory,
        ConversationState::SelectingProduct,
        ConversationState::AddingToCart,
        ConversationState::ViewingCart,
        ConversationState::CheckoutAddress,
        ConversationState::CheckoutPayment,
        ConversationState::CheckoutConfirm,
        ConversationState::WaitingExternalPayment,
        ConversationState::OrderPlaced,
        ConversationState::TrackingOrder,
        ConversationState::Support,
        ConversationState::AdminCommand,
    ];

    /// States this state may move to
    pub fn allowed_targets(&self) -> &'static [ConversationState] {
        use ConversationState::*;
        match self {
            Idle => &[Greeting, BrowsingMenu, ViewingCart, TrackingOrder, Support, AdminCommand],
            Greeting => &[Idle, BrowsingMenu, ViewingCart, TrackingOrder, Support],
            BrowsingMenu => &[Idle, SelectingCategory, ViewingCart],
            SelectingCategory => &[Idle, BrowsingMenu, SelectingProduct, ViewingCart],
            SelectingProduct => &[Idle, BrowsingMenu, AddingToCart, ViewingCart],
            AddingToCart => &[Idle, BrowsingMenu, ViewingCart],
            ViewingCart => &[Idle, BrowsingMenu, CheckoutAddress],
            CheckoutAddress => &[Idle, ViewingCart, CheckoutPayment],
            CheckoutPayment => &[Idle, CheckoutAddress, CheckoutConfirm],
            CheckoutConfirm => &[Idle, ViewingCart, WaitingExternalPayment, OrderPlaced],
            WaitingExternalPayment => &[Idle, OrderPlaced],
            OrderPlaced | TrackingOrder | Support | AdminCommand => &[Idle],
        }
    }

    /// Whether the table allows `self -> target`
    pub fn can_transition_to(&self, target: ConversationState) -> bool {
        self.allowed_targets().contains(&target)
    }

    /// Dead-end states that only lead back to `Idle`
    pub fn is_informational(&self) -> bool {
        matches!(
            self,
            ConversationState::OrderPlaced
                | ConversationState::TrackingOrder
                | ConversationState::Support
                | ConversationState::AdminCommand
        )
    }

    /// States at or beyond the address checkpoint, which must carry an address
    pub fn requires_address(&self) -> bool {
        matches!(
            self,
            ConversationState::CheckoutPayment
                | ConversationState::CheckoutConfirm
                | ConversationState::WaitingExternalPayment
        )
    }

    /// States at or beyond the payment checkpoint, which must carry a payment method
    pub fn requires_payment_method(&self) -> bool {
        matches!(
            self,
            ConversationState::CheckoutConfirm | ConversationState::WaitingExternalPayment
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationState::Idle => "idle",
            ConversationState::Greeting => "greeting",
            ConversationState::BrowsingMenu => "browsing_menu",
            ConversationState::SelectingCategory => "selecting_category",
            ConversationState::SelectingProduct => "selecting_product",
            ConversationState::AddingToCart => "adding_to_cart",
            ConversationState::ViewingCart => "viewing_cart",
            ConversationState::CheckoutAddress => "checkout_address",
            ConversationState::CheckoutPayment => "checkout_payment",
            ConversationState::CheckoutConfirm => "checkout_confirm",
            ConversationState::WaitingExternalPayment => "waiting_external_payment",
            ConversationState::OrderPlaced => "order_placed",
            ConversationState::TrackingOrder => "tracking_order",
            ConversationState::Support => "support",
            ConversationState::AdminCommand => "admin_command",
        }
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
