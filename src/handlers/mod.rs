//! Conversation handlers
//!
//! One handler per group of states. Incoming text is classified once, then
//! routed on the conversation's current state. A handler either returns a
//! [`Reply`] after making its state changes through
//! [`Conversation::transition`], or fails; on failure [`dispatch`] restores
//! the conversation as it was before the message arrived.

pub mod intent;
pub mod messages;
pub mod render;
pub mod states;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::config::Settings;
use crate::models::PaymentDestination;
use crate::services::{CatalogProvider, OrderService};
use crate::state::{Conversation, ConversationState, TransitionData};
use crate::utils::errors::{OrderBuddyError, Result};
use crate::utils::logging;

pub use intent::{Intent, IntentClassifier, KeywordClassifier, KeywordRule, MatchMode};
pub use messages::{notify_payment_result, process_message};

/// Text sent back to the user plus optional suggested answers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub text: String,
    pub quick_replies: Vec<String>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quick_replies: Vec::new(),
        }
    }

    pub fn with_quick_replies<I, S>(mut self, quick_replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.quick_replies = quick_replies.into_iter().map(Into::into).collect();
        self
    }
}

/// Per-store values the handlers need
#[derive(Debug, Clone)]
pub struct StoreProfile {
    pub currency_symbol: String,
    pub delivery_fee: Decimal,
    pub payment_destination: PaymentDestination,
    pub min_address_length: usize,
    pub estimated_delivery_minutes: u32,
}

impl StoreProfile {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            currency_symbol: settings.store.currency_symbol.clone(),
            delivery_fee: settings.store.delivery_fee,
            payment_destination: settings.payment.clone(),
            min_address_length: settings.store.min_address_length,
            estimated_delivery_minutes: settings.store.estimated_delivery_minutes,
        }
    }
}

/// Everything a handler may use besides the conversation itself
#[derive(Clone, Copy)]
pub struct ExecutionContext<'a> {
    pub catalog: &'a dyn CatalogProvider,
    pub orders: &'a dyn OrderService,
    pub classifier: &'a dyn IntentClassifier,
    pub store: &'a StoreProfile,
    /// Whether the sender may open the admin panel
    pub sender_is_admin: bool,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        catalog: &'a dyn CatalogProvider,
        orders: &'a dyn OrderService,
        classifier: &'a dyn IntentClassifier,
        store: &'a StoreProfile,
    ) -> Self {
        Self {
            catalog,
            orders,
            classifier,
            store,
            sender_is_admin: false,
        }
    }

    pub fn as_admin(mut self, is_admin: bool) -> Self {
        self.sender_is_admin = is_admin;
        self
    }

    pub fn currency(&self) -> &str {
        &self.store.currency_symbol
    }
}

/// Route one message to the handler of the conversation's current state.
///
/// Never fails: handler errors are logged, the conversation is restored to
/// its pre-message value and the user receives an apology.
pub async fn dispatch(text: &str, conversation: &mut Conversation, ctx: &ExecutionContext<'_>) -> Reply {
    let intent = ctx.classifier.classify(text);
    dispatch_intent(text, intent, conversation, ctx).await
}

pub(crate) async fn dispatch_intent(
    text: &str,
    intent: Intent,
    conversation: &mut Conversation,
    ctx: &ExecutionContext<'_>,
) -> Reply {
    let before = conversation.clone();
    let state = conversation.state();

    debug!(
        tenant_id = conversation.tenant_id(),
        user_id = conversation.user_id(),
        state = %state,
        intent = ?intent,
        "Dispatching message"
    );

    let result = if intent == Intent::Cancel && is_cancellable(state) {
        cancel(conversation)
    } else {
        route(text, intent, conversation, ctx).await
    };

    match result {
        Ok(reply) => {
            conversation.touch();
            reply
        }
        Err(e) => {
            logging::log_handler_error(conversation.tenant_id(), conversation.user_id(), state.as_str(), &e);
            *conversation = before;
            match e {
                OrderBuddyError::InvalidTransition { .. } => Reply::text(render::help()),
                _ => Reply::text(render::apology()),
            }
        }
    }
}

async fn route(
    text: &str,
    intent: Intent,
    conversation: &mut Conversation,
    ctx: &ExecutionContext<'_>,
) -> Result<Reply> {
    use ConversationState::*;

    match conversation.state() {
        Idle | Greeting => states::greeting::handle(intent, conversation, ctx).await,
        BrowsingMenu | SelectingCategory => states::menu::handle_category_choice(intent, conversation, ctx).await,
        SelectingProduct => states::menu::handle_product_choice(intent, conversation, ctx).await,
        AddingToCart => states::menu::handle_add_to_cart(text, intent, conversation, ctx).await,
        ViewingCart => states::cart::handle(intent, conversation, ctx).await,
        CheckoutAddress => states::checkout::handle_address(text, intent, conversation, ctx).await,
        CheckoutPayment => states::checkout::handle_payment(text, intent, conversation, ctx).await,
        CheckoutConfirm => states::checkout::handle_confirm(intent, conversation, ctx).await,
        WaitingExternalPayment => states::checkout::handle_waiting(conversation, ctx),
        OrderPlaced | TrackingOrder | Support | AdminCommand => {
            states::info::handle(intent, conversation, ctx).await
        }
    }
}

/// States the universal cancel applies to. A pending external payment can
/// only be resolved by the payment notification.
fn is_cancellable(state: ConversationState) -> bool {
    !matches!(state, ConversationState::Idle | ConversationState::WaitingExternalPayment)
}

fn cancel(conversation: &mut Conversation) -> Result<Reply> {
    conversation.clear_selection();
    conversation.transition(ConversationState::Idle, TransitionData::none())?;
    Ok(Reply::text(render::cancelled()).with_quick_replies(states::greeting::main_quick_replies()))
}
